//! End-to-end pipeline tests: source text in, generated C++ out.

use std::collections::HashMap;

use bishop_lang::{
    codegen,
    lexer::Lexer,
    parser,
    project::{Module, ModuleMap},
    typechecker,
};

fn compile_with(src: &str, modules: &[(&str, &str)], test_mode: bool) -> String {
    let mut available = ModuleMap::new();

    for (name, module_src) in modules {
        let module_program =
            parser::parse(Lexer::new(module_src).lex()).expect("module source should parse");
        available.insert((*name).to_owned(), Module::new(*name, module_program));
    }

    let program = parser::parse(Lexer::new(src).lex()).expect("source should parse");
    let (resolved, missing) = bishop_lang::project::resolve(&program, &available);
    assert!(missing.is_empty(), "unresolved imports: {missing:?}");

    let outcome = typechecker::check(&program, &resolved, "test.bi", test_mode);
    assert!(
        outcome.errors.is_empty(),
        "unexpected type errors: {:?}",
        outcome.errors
    );

    codegen::generate(&program, &resolved, &outcome.annotations, test_mode)
}

fn compile(src: &str) -> String {
    compile_with(src, &[], false)
}

fn check_errors(src: &str) -> Vec<typechecker::TypeError> {
    let program = parser::parse(Lexer::new(src).lex()).expect("source should parse");
    let modules = HashMap::new();
    typechecker::check(&program, &modules, "test.bi", false).errors
}

#[test]
fn hello_world_generates_wrapped_main() {
    let out = compile("fn main() { print(\"hi\"); }");

    assert!(out.contains("#include <bishop/std.hpp>"));
    assert!(out.contains("void _bishop_main() {"));
    assert!(out.contains("std::cout << std::string(\"hi\") << std::endl;"));
    assert!(out.contains("bishop::rt::run(_bishop_main);"));
    assert!(out.contains("return 0;"));
}

#[test]
fn literal_forms_emit_their_values() {
    let out = compile(
        r#"
        fn main() {
            a := 42;
            b := 3.14;
            c := "hi";
            d := true;
            e := false;
            str? f = none;
            print(a, b, c, d, e, f is none);
        }
        "#,
    );

    assert!(out.contains("auto a = 42;"));
    assert!(out.contains("auto b = 3.14;"));
    assert!(out.contains("auto c = std::string(\"hi\");"));
    assert!(out.contains("auto d = true;"));
    assert!(out.contains("auto e = false;"));
    assert!(out.contains("std::optional<std::string> f = std::nullopt;"));
    assert!(out.contains("!f.has_value()"));
}

#[test]
fn or_lowering_evaluates_input_exactly_once() {
    let out = compile(
        r#"
        fn fetch_value() -> int or err { return 1; }

        fn main() {
            x := fetch_value() or return;
            print(x);
        }
        "#,
    );

    // One occurrence is the definition, one is the single lowered call.
    assert_eq!(out.matches("fetch_value()").count(), 2, "output:\n{out}");
    assert!(out.contains("auto _or_tmp1 = fetch_value();"));
    assert!(out.contains("if (bishop::is_or_falsy(_or_tmp1)) { return; }"));
    assert!(out.contains("auto x = bishop::or_value(_or_tmp1);"));
}

#[test]
fn fallible_divide_lowers_fail_and_result() {
    let out = compile(
        r#"
        fn divide(int a, int b) -> int or err {
            if b == 0 fail "zero";
            return a / b;
        }

        fn main() {
            v := divide(10, 2) or return;
            print(v);
        }
        "#,
    );

    assert!(out.contains("bishop::rt::Result<int> divide(int a, int b) {"));
    assert!(out.contains(
        "return std::make_shared<bishop::rt::Error>(std::string(\"zero\"));"
    ));
}

#[test]
fn fallible_void_function_gets_implicit_success_return() {
    let out = compile("fn ping() or err { print(\"pong\"); }\nfn main() { ping() or return; }");

    assert!(out.contains("bishop::rt::Result<void> ping() {"));
    assert!(out.contains("return {};"));
}

#[test]
fn reserved_keywords_get_exactly_one_underscore() {
    let out = compile("fn main() { class := 5; print(class); }");

    assert!(out.contains("auto class_ = 5;"));
    assert!(out.contains("std::cout << class_ << std::endl;"));
    assert!(!out.contains("class__"));
}

#[test]
fn pointer_receivers_rewrite_to_arrow_access() {
    let out = compile(
        r#"
        Point :: struct { x int }

        Point :: get_x(self) -> int { return self.x; }

        fn main() {
            p := Point { x: 3 };
            a := p.get_x();
            b := (&p).get_x();
            print(a, b, p.x);
        }
        "#,
    );

    assert!(out.contains("auto a = p.get_x();"));
    assert!(out.contains("auto b = (&p)->get_x();"));
    assert!(out.contains("int get_x() {"));
    assert!(out.contains("return this->x;"));
}

#[test]
fn struct_literal_uses_declaration_order() {
    let out = compile(
        r#"
        Person :: struct {
            name str,
            age int
        }

        fn main() {
            p := Person { age: 36, name: "ada" };
            print(p.name);
        }
        "#,
    );

    assert!(out.contains("Person{.name = std::string(\"ada\"), .age = 36}"));
}

#[test]
fn error_definition_gets_both_constructors() {
    let out = compile(
        r#"
        IOError :: err {
            code int,
            path str
        }

        fn read_file(str path) -> str or err {
            if path.empty() fail IOError;
            return path;
        }

        fn main() {
            content := read_file("a.txt") or return;
            print(content);
        }
        "#,
    );

    assert!(out.contains("struct IOError : public bishop::rt::Error {"));
    assert!(out.contains(
        "IOError(const std::string& msg, int code_, std::string path_, std::shared_ptr<bishop::rt::Error> cause_ = nullptr)"
    ));
    assert!(out.contains("explicit IOError(const std::string& msg)"));
    assert!(out.contains("code(0), path(\"\")"));
    // Bare error literal constructs with defaulted fields.
    assert!(out.contains("std::make_shared<IOError>(\"IOError\")"));
}

#[test]
fn channel_ping_pong_generates_runtime_calls() {
    let out = compile(
        r#"
        fn producer(Channel<int> ch) {
            for i in 1..4 {
                await ch.send(i);
            }
        }

        fn main() {
            ch := Channel<int>();
            go producer(ch);
            for i in 0..3 {
                v := await ch.recv();
                print(v);
            }
        }
        "#,
    );

    assert!(out.contains("#include <bishop/channel.hpp>"));
    assert!(out.contains("void producer(bishop::rt::Channel<int>& ch) {"));
    assert!(out.contains("auto ch = bishop::rt::Channel<int>();"));
    assert!(out.contains("bishop::rt::go([&]() { producer(ch); });"));
    assert!(out.contains("ch.send(i);"));
    assert!(out.contains("auto v = ch.recv();"));
    assert!(out.contains("for (int i = 1; i < 4; i++) {"));
}

#[test]
fn select_lowers_to_polling_loop_in_source_order() {
    let out = compile(
        r#"
        fn pump(Channel<int> a, Channel<int> b) {
            select {
                v := a.recv() => { print(v); }
                w := b.recv() => { print(w); }
            }
        }
        "#,
    );

    assert!(out.contains("if (auto _recv2 = a.try_recv()) {"));
    assert!(out.contains("else if (auto _recv3 = b.try_recv()) {"));
    assert!(out.contains("bishop::rt::yield_now();"));

    let a_pos = out.find("a.try_recv()").expect("first arm present");
    let b_pos = out.find("b.try_recv()").expect("second arm present");
    assert!(a_pos < b_pos, "arms must poll in source order");
}

#[test]
fn map_iteration_via_items() {
    let out = compile(
        r#"
        fn main() {
            ages := {"a": 1, "b": 2};
            for item in ages.items() {
                print(item.key, item.value);
            }
        }
        "#,
    );

    assert!(out.contains(
        "std::unordered_map{std::make_pair(std::string(\"a\"), 1), std::make_pair(std::string(\"b\"), 2)}"
    ));
    assert!(out.contains("for (const auto& item :"));
    assert!(out.contains("items.push_back({k, v});"));
    assert!(out.contains("item.key"));
    assert!(out.contains("item.value"));
}

#[test]
fn with_statement_closes_on_every_exit() {
    let out = compile_with(
        r#"
        import filekit;

        fn main() {
            with filekit.open("a.txt") as file {
                print(file.size);
            }
        }
        "#,
        &[(
            "filekit",
            r#"
            pub Handle :: struct { size int }

            pub fn open(str path) -> Handle {
                return Handle { size: 0 };
            }
            "#,
        )],
        false,
    );

    assert!(out.contains("auto file = filekit::open(std::string(\"a.txt\"));"));
    assert!(out.contains("bishop::rt::ScopeGuard _close_file([&]() { file.close(); });"));
}

#[test]
fn user_module_emits_namespace_and_qualified_calls() {
    let out = compile_with(
        r#"
        import mathx;

        fn main() {
            v := mathx.double(21);
            print(v);
        }
        "#,
        &[(
            "mathx",
            "pub fn double(int x) -> int { return x * 2; }",
        )],
        false,
    );

    assert!(out.contains("namespace mathx {"));
    // `double` collides with a C++ keyword and gets escaped everywhere.
    assert!(out.contains("int double_(int x) {"));
    assert!(out.contains("auto v = mathx::double_(21);"));
}

#[test]
fn builtin_module_contributes_include_and_remapped_namespace() {
    let out = compile_with(
        r#"
        import log;
        using log.info;

        fn main() {
            info("hello");
        }
        "#,
        &[("log", "pub fn info(str message) { print(message); }")],
        false,
    );

    assert!(out.contains("#include <bishop/log.hpp>"));
    // The log namespace collides with std::log and is remapped.
    assert!(out.contains("bishop_log::info(std::string(\"hello\"));"));
    assert!(!out.contains("namespace log {"));
}

#[test]
fn default_on_pair_get_is_bounds_checked() {
    let out = compile(
        r#"
        fn main() {
            p := Pair<int>(1, 2);
            v := p.get(0) default 0;
            print(v);
        }
        "#,
    );

    assert!(out.contains("((0) == 0 ? p.first : ((0) == 1 ? p.second : 0))"));
}

#[test]
fn default_on_plain_expression_evaluates_once() {
    let out = compile(
        r#"
        fn main() {
            ages := {"a": 1};
            v := ages.get("a") default 7;
            print(v);
        }
        "#,
    );

    assert!(out.contains("[&]() { auto _v ="));
    assert!(out.contains("bishop::is_or_falsy(_v) ? 7 : bishop::or_value(_v); }()"));
}

#[test]
fn or_match_lowers_to_dynamic_cast_chain() {
    let out = compile(
        r#"
        NotFound :: err { code int }

        fn lookup() -> int or err { return 1; }

        fn main() {
            v := lookup() or match err {
                NotFound => 0,
                _ => 1
            };
            print(v);
        }
        "#,
    );

    assert!(out.contains("if (_or_tmp1.is_error()) {"));
    assert!(out.contains("auto err = _or_tmp1.error();"));
    assert!(out.contains("if (dynamic_cast<NotFound*>(err.get())) { v = 0; }"));
    assert!(out.contains("else { v = 1; }"));
    assert!(out.contains("v = _or_tmp1.value();"));
}

#[test]
fn or_fail_bare_error_preserves_cause_chain() {
    let out = compile(
        r#"
        ParseFailure :: err { line int }

        fn inner() -> int or err { return 1; }

        fn outer() -> int or err {
            v := inner() or fail ParseFailure;
            return v;
        }

        fn main() {
            v := outer() or return;
            print(v);
        }
        "#,
    );

    assert!(out.contains("auto err = bishop::or_error(_or_tmp1);"));
    assert!(out.contains(
        "std::static_pointer_cast<bishop::rt::Error>(std::make_shared<ParseFailure>(\"ParseFailure\", err))"
    ));
}

#[test]
fn test_mode_emits_harness_and_failure_count() {
    let out = compile_with(
        r#"
        fn test_add() {
            assert_eq(4, 2 + 2);
        }

        fn test_fail() {
            assert_eq(1, 2);
        }

        fn helper() -> int { return 1; }
        "#,
        &[],
        true,
    );

    assert!(out.contains("int _failures = 0;"));
    assert!(out.contains("void _assert_eq(T a, U b, int line) {"));
    assert!(out.contains("_assert_eq(4, 2 + 2, 3);"));
    assert!(out.contains("bishop::rt::init_runtime();"));
    assert!(out.contains("bishop::rt::run_in_fiber(test_add);"));
    assert!(out.contains("bishop::rt::run_in_fiber(test_fail);"));
    assert!(!out.contains("run_in_fiber(helper)"));
    assert!(out.contains("return _failures;"));
}

#[test]
fn fallible_test_reports_error_message() {
    let out = compile_with(
        r#"
        fn test_io() or err {
            fail "boom";
        }
        "#,
        &[],
        true,
    );

    assert!(out.contains("auto result = test_io();"));
    assert!(out.contains("if (result.is_error()) {"));
    assert!(out.contains("test_io: FAIL: "));
}

#[test]
fn string_methods_emit_inline_lambdas() {
    let out = compile(
        r#"
        fn main() {
            s := "  Hello World  ";
            print(s.trim(), s.upper(), s.replace_all("l", "L"));
            parts := s.split(" ");
            print(parts.length());
        }
        "#,
    );

    assert!(out.contains("find_first_not_of"));
    assert!(out.contains("::toupper"));
    assert!(out.contains("while ((pos = s.find(from, pos)) != std::string::npos)"));
    assert!(out.contains("std::vector<std::string> result;"));
    assert!(out.contains("parts.size()"));
}

#[test]
fn lambda_emits_capture_by_reference() {
    let out = compile(
        r#"
        fn main() {
            base := 10;
            add := fn(int x) -> int { return x + base; };
            print(add(5));
        }
        "#,
    );

    assert!(out.contains("auto add = [&](int x) -> int {"));
    assert!(out.contains("return x + base;"));
    assert!(out.contains("add(5)"));
}

#[test]
fn function_typed_values_emit_std_function() {
    let out = compile(
        r#"
        fn apply(fn(int) -> int op, int x) -> int {
            return op(x);
        }

        fn double_it(int x) -> int { return x * 2; }

        fn main() {
            print(apply(double_it, 4));
        }
        "#,
    );

    assert!(out.contains("int apply(std::function<int(int)> op, int x) {"));
    assert!(out.contains("apply(double_it, 4)"));
}

#[test]
fn diagnostics_render_as_file_line_message() {
    let errors = check_errors("fn main() {\n    x := 1;\n    x := 2;\n}");

    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "test.bi:3: variable 'x' is already defined in this scope"
    );
}

#[test]
fn priority_queue_selects_heap_at_construction() {
    let out = compile(
        r#"
        fn main() {
            max_heap := PriorityQueue<int>();
            min_heap := PriorityQueue<int>.min();
            max_heap.push(3);
            min_heap.push(3);
            print(max_heap.top(), min_heap.top());
        }
        "#,
    );

    assert!(out.contains("auto max_heap = bishop::MaxPriorityQueue<int>();"));
    assert!(out.contains("auto min_heap = bishop::MinPriorityQueue<int>();"));
    assert!(out.contains("max_heap.push(3);"));
}

#[test]
fn set_operations_emit_copying_lambdas() {
    let out = compile(
        r#"
        fn main() {
            a := {1, 2, 3};
            b := {3, 4};
            u := a.union(b);
            i := a.intersection(b);
            print(u.length(), i.length(), a.is_subset(b));
        }
        "#,
    );

    assert!(out.contains("std::unordered_set{1, 2, 3}"));
    assert!(out.contains("[&]() { auto result = a; for (const auto& e : b) result.insert(e); return result; }()"));
    assert!(out.contains("std::remove_cvref_t<decltype(a)> result;"));
    assert!(out.contains("u.size()"));
}

#[test]
fn deque_and_stack_pops_return_the_value() {
    let out = compile(
        r#"
        fn main() {
            d := Deque<int>();
            d.push_back(1);
            d.push_front(0);
            front := d.pop_front();

            s := Stack<int>();
            s.push(7);
            top := s.pop();

            print(front, top);
        }
        "#,
    );

    assert!(out.contains("auto d = std::deque<int>{};"));
    assert!(out.contains("d.push_front(0);"));
    assert!(out.contains(
        "[](auto& d) { auto tmp = d.front(); d.pop_front(); return tmp; }(d)"
    ));
    assert!(out.contains(
        "[](auto& s) { auto tmp = s.top(); s.pop(); return tmp; }(s)"
    ));
}

#[test]
fn tuple_get_with_default_is_bounds_checked() {
    let out = compile(
        r#"
        fn main() {
            t := Tuple<int>(1, 2, 3);
            v := t.get(1) default 0;
            print(v);
        }
        "#,
    );

    assert!(out.contains("auto t = std::vector<int>{1, 2, 3};"));
    assert!(out.contains(
        "(static_cast<size_t>(1) < t.size() && (1) >= 0 ? t[1] : 0)"
    ));
}

#[test]
fn statement_level_or_fail_lowers_without_binding() {
    let out = compile(
        r#"
        fn guard(bool ready) -> int or err {
            ready or fail "not ready";
            return 1;
        }

        fn main() {
            v := guard(true) or return;
            print(v);
        }
        "#,
    );

    assert!(out.contains("auto _or_stmt_tmp1 = ready;"));
    assert!(out.contains(
        "if (bishop::is_or_falsy(_or_stmt_tmp1)) { return std::make_shared<bishop::rt::Error>(std::string(\"not ready\")); }"
    ));
}

#[test]
fn or_block_binds_err_and_transfers() {
    let out = compile(
        r#"
        fn fetch() -> int or err { return 2; }

        fn main() {
            v := fetch() or {
                print("failed");
                return;
            };
            print(v);
        }
        "#,
    );

    assert!(out.contains("auto err = bishop::or_error(_or_tmp1);"));
    assert!(out.contains("std::cout << std::string(\"failed\") << std::endl;"));
    assert!(out.contains("auto v = bishop::or_value(_or_tmp1);"));
}

#[test]
fn or_continue_inside_loop() {
    let out = compile(
        r#"
        fn attempt(int i) -> int or err { return i; }

        fn main() {
            for i in 0..3 {
                v := attempt(i) or continue;
                print(v);
            }
        }
        "#,
    );

    assert!(out.contains("if (bishop::is_or_falsy(_or_tmp1)) { continue; }"));
}

#[test]
fn module_constants_emit_in_namespace_and_resolve_qualified() {
    let out = compile_with(
        r#"
        import limits;

        fn main() {
            print(limits.MAX_DEPTH);
        }
        "#,
        &[("limits", "const int MAX_DEPTH = 8;")],
        false,
    );

    assert!(out.contains("namespace limits {"));
    assert!(out.contains("const int MAX_DEPTH = 8;"));
    assert!(out.contains("std::cout << limits::MAX_DEPTH << std::endl;"));
}

#[test]
fn wildcard_using_qualifies_struct_literals_and_calls() {
    let out = compile_with(
        r#"
        import shapes;
        using shapes.*;

        fn main() {
            c := Circle { radius: 2 };
            print(area(c));
        }
        "#,
        &[(
            "shapes",
            r#"
            pub Circle :: struct { radius int }

            pub fn area(Circle c) -> int { return c.radius * c.radius * 3; }
            "#,
        )],
        false,
    );

    assert!(out.contains("auto c = shapes::Circle{.radius = 2};"));
    assert!(out.contains("shapes::area(c)"));
}

#[test]
fn str_at_wraps_char_into_string() {
    let out = compile(
        r#"
        fn main() {
            s := "hello";
            first := s.at(0);
            n := s.to_int() default 0;
            print(first, n);
        }
        "#,
    );

    assert!(out.contains("std::string(1, s.at(0))"));
    assert!(out.contains("std::stoi(s)"));
}

#[test]
fn while_loop_and_assignment_emit_plainly() {
    let out = compile(
        r#"
        fn main() {
            i := 0;
            while i < 3 {
                i = i + 1;
            }
            print(i);
        }
        "#,
    );

    assert!(out.contains("while (i < 3) {"));
    assert!(out.contains("i = i + 1;"));
}

#[test]
fn extern_functions_declare_and_convert_cstr() {
    let out = compile(
        r#"
        @extern("c")
        fn puts(cstr message) -> cint;

        fn main() {
            puts("hi");
        }
        "#,
    );

    assert!(out.contains("extern \"C\" {"));
    assert!(out.contains("int puts(const char* message);"));
    assert!(out.contains("puts(std::string(\"hi\").c_str());"));
}
