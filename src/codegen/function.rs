//! Function, method, struct, error and test-harness emission.

use crate::parser::ast::{
    ErrorDef, FunctionDef, MethodDef, Node, Param, Program, StructDef,
};

use super::{
    expression::{default_field_value, emit},
    names::escape_reserved_name,
    statement::generate_statement,
    types::{map_type, map_type_for_decl},
    CodeGenState,
};

/// The C++ return type of a function, accounting for fallibility:
/// fallible functions return `bishop::rt::Result<T>`.
fn cpp_return_type(return_type: &str, error_type: &str) -> String {
    if error_type.is_empty() {
        return if return_type.is_empty() {
            "void".to_owned()
        } else {
            map_type(return_type)
        };
    }

    if return_type.is_empty() {
        return "bishop::rt::Result<void>".to_owned();
    }

    format!("bishop::rt::Result<{}>", map_type(return_type))
}

fn param_list(params: &[Param]) -> String {
    params
        .iter()
        .map(|p| format!("{} {}", map_type(&p.type_name), escape_reserved_name(&p.name)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn body_ends_in_return(body: &[Node]) -> bool {
    matches!(
        body.last(),
        Some(Node::ReturnStmt { .. }) | Some(Node::FailStmt { .. })
    )
}

/// Generates a C++ function from a FunctionDef. A non-test `main` is
/// renamed and called from a real `main` that initialises the runtime and
/// runs the user main in a fiber. Fallible void functions get an implicit
/// empty-success return when the body does not already end on one.
pub fn generate_function(state: &mut CodeGenState, func: &FunctionDef) -> String {
    let is_main = func.name == "main" && !state.test_mode;
    let is_fallible = !func.error_type.is_empty();

    let prev_fallible = state.in_fallible_function;
    state.in_fallible_function = is_fallible;

    let mut body: Vec<String> = func
        .body
        .iter()
        .map(|stmt| generate_statement(state, stmt))
        .collect();

    if is_fallible && func.return_type.is_empty() && !body_ends_in_return(&func.body) {
        body.push("return {};".to_owned());
    }

    state.in_fallible_function = prev_fallible;

    if is_main {
        let mut out = String::from("void _bishop_main() {\n");

        for stmt in &body {
            out += &format!("\t{stmt}\n");
        }

        out += "}\n";
        out += "\nint main() {\n";
        out += "\tbishop::rt::run(_bishop_main);\n";
        out += "\treturn 0;\n";
        out += "}\n";
        return out;
    }

    let rt = cpp_return_type(&func.return_type, &func.error_type);
    let mut out = format!(
        "{rt} {}({}) {{\n",
        escape_reserved_name(&func.name),
        param_list(&func.params)
    );

    for stmt in &body {
        out += &format!("\t{stmt}\n");
    }

    out += "}\n";
    out
}

/// Emits a method as a member function; `self` becomes the implicit
/// object, static methods drop it entirely.
fn generate_method(state: &mut CodeGenState, method: &MethodDef) -> String {
    let is_fallible = !method.error_type.is_empty();

    let prev_fallible = state.in_fallible_function;
    let prev_struct = std::mem::replace(&mut state.current_struct, method.struct_name.clone());
    state.in_fallible_function = is_fallible;

    let params: Vec<Param> = if method.is_static {
        method.params.clone()
    } else {
        method.params[1..].to_vec()
    };

    let body: Vec<String> = method
        .body
        .iter()
        .map(|stmt| generate_statement(state, stmt))
        .collect();

    state.in_fallible_function = prev_fallible;
    state.current_struct = prev_struct;

    let rt = cpp_return_type(&method.return_type, &method.error_type);
    let static_prefix = if method.is_static { "static " } else { "" };

    let mut out = format!(
        "\t{static_prefix}{rt} {}({}) {{\n",
        escape_reserved_name(&method.name),
        param_list(&params)
    );

    for stmt in &body {
        out += &format!("\t\t{stmt}\n");
    }

    if is_fallible && method.return_type.is_empty() && !body_ends_in_return(&method.body) {
        out += "\t\treturn {};\n";
    }

    out += "\t}\n";
    out
}

/// A struct becomes a record with its fields in declaration order followed
/// by its methods.
pub fn generate_struct(state: &mut CodeGenState, def: &StructDef) -> String {
    let mut out = format!("struct {} {{\n", def.name);

    for field in &def.fields {
        out += &format!(
            "\t{} {};\n",
            map_type_for_decl(&field.type_name),
            escape_reserved_name(&field.name)
        );
    }

    let methods: Vec<&MethodDef> = state
        .current_program
        .methods
        .iter()
        .filter(|m| m.struct_name == def.name)
        .collect();

    if !methods.is_empty() {
        out += "\n";
    }

    for method in methods {
        out += &generate_method(state, method);
    }

    out += "};";
    out
}

/// Error definitions extend the runtime error base and get two
/// constructors: the full one taking (message, field..., cause) and, when
/// the error has fields, a message-only convenience constructor that
/// default-initialises each field.
pub fn generate_error(def: &ErrorDef) -> String {
    let mut out = format!("struct {} : public bishop::rt::Error {{\n", def.name);

    for field in &def.fields {
        out += &format!(
            "\t{} {};\n",
            map_type_for_decl(&field.type_name),
            escape_reserved_name(&field.name)
        );
    }

    let mut params = vec!["const std::string& msg".to_owned()];
    let mut inits = vec![];

    for field in &def.fields {
        let name = escape_reserved_name(&field.name);
        params.push(format!("{} {name}_", map_type_for_decl(&field.type_name)));
        inits.push(format!("{name}({name}_)"));
    }

    params.push("std::shared_ptr<bishop::rt::Error> cause_ = nullptr".to_owned());

    out += &format!(
        "\n\t{}({}) : bishop::rt::Error(msg, cause_)",
        def.name,
        params.join(", ")
    );

    if !inits.is_empty() {
        out += &format!(", {}", inits.join(", "));
    }

    out += " {}\n";

    if !def.fields.is_empty() {
        let default_inits: Vec<String> = def
            .fields
            .iter()
            .map(|field| {
                format!(
                    "{}({})",
                    escape_reserved_name(&field.name),
                    default_field_value(&field.type_name)
                )
            })
            .collect();

        out += &format!(
            "\texplicit {}(const std::string& msg) : bishop::rt::Error(msg, nullptr), {} {{}}\n",
            def.name,
            default_inits.join(", ")
        );
    }

    out += "};\n";
    out
}

/// Module-level const declarations.
pub fn generate_module_constant(state: &mut CodeGenState, node: &Node) -> String {
    let Node::VariableDecl {
        type_name,
        name,
        value,
        ..
    } = node
    else {
        return String::new();
    };

    let t = if type_name.is_empty() {
        "auto".to_owned()
    } else {
        map_type_for_decl(type_name)
    };

    format!(
        "const {t} {} = {};\n",
        escape_reserved_name(name),
        emit(state, value)
    )
}

/// `extern "C"` declarations for FFI functions.
pub fn generate_extern_declarations(program: &Program) -> String {
    if program.externs.is_empty() {
        return String::new();
    }

    let mut out = String::from("extern \"C\" {\n");

    for ext in &program.externs {
        let rt = if ext.return_type.is_empty() {
            "void".to_owned()
        } else {
            map_type(&ext.return_type)
        };

        let params: Vec<String> = ext
            .params
            .iter()
            .map(|p| format!("{} {}", map_type(&p.type_name), escape_reserved_name(&p.name)))
            .collect();

        out += &format!("\t{rt} {}({});\n", ext.name, params.join(", "));
    }

    out += "}\n\n";
    out
}

/// Whether any reachable construct needs the channel header.
pub fn uses_channels(program: &Program) -> bool {
    let param_uses = |params: &[Param]| {
        params
            .iter()
            .any(|p| p.type_name.starts_with("Channel<"))
    };

    program
        .functions
        .iter()
        .any(|f| f.is_async || param_uses(&f.params))
        || program
            .methods
            .iter()
            .any(|m| m.is_async || param_uses(&m.params))
}

/// The assertion helper definitions emitted once at the top of test-mode
/// output, with the file-local failure counter.
pub fn test_helper_block() -> String {
    let mut out = String::from("#include <cmath>\n\n");
    out += "int _failures = 0;\n\n";

    out += "template<typename T, typename U>\n";
    out += "void _assert_eq(T a, U b, int line) {\n";
    out += "\tif (a != b) {\n";
    out += "\t\tstd::cerr << \"line \" << line << \": FAIL: \" << a << \" != \" << b << std::endl;\n";
    out += "\t\t_failures++;\n";
    out += "\t}\n";
    out += "}\n\n";

    out += "template<typename T, typename U>\n";
    out += "void _assert_ne(T a, U b, int line) {\n";
    out += "\tif (a == b) {\n";
    out += "\t\tstd::cerr << \"line \" << line << \": FAIL: expected not equal, but both are \" << a << std::endl;\n";
    out += "\t\t_failures++;\n";
    out += "\t}\n";
    out += "}\n\n";

    out += "void _assert_true(bool condition, int line) {\n";
    out += "\tif (!condition) {\n";
    out += "\t\tstd::cerr << \"line \" << line << \": FAIL: expected true, got false\" << std::endl;\n";
    out += "\t\t_failures++;\n";
    out += "\t}\n";
    out += "}\n\n";

    out += "void _assert_false(bool condition, int line) {\n";
    out += "\tif (condition) {\n";
    out += "\t\tstd::cerr << \"line \" << line << \": FAIL: expected false, got true\" << std::endl;\n";
    out += "\t\t_failures++;\n";
    out += "\t}\n";
    out += "}\n\n";

    out += "template<typename T, typename U>\n";
    out += "void _assert_gt(T a, U b, int line) {\n";
    out += "\tif (!(a > b)) {\n";
    out += "\t\tstd::cerr << \"line \" << line << \": FAIL: expected \" << a << \" > \" << b << std::endl;\n";
    out += "\t\t_failures++;\n";
    out += "\t}\n";
    out += "}\n\n";

    out += "template<typename T, typename U>\n";
    out += "void _assert_gte(T a, U b, int line) {\n";
    out += "\tif (!(a >= b)) {\n";
    out += "\t\tstd::cerr << \"line \" << line << \": FAIL: expected \" << a << \" >= \" << b << std::endl;\n";
    out += "\t\t_failures++;\n";
    out += "\t}\n";
    out += "}\n\n";

    out += "template<typename T, typename U>\n";
    out += "void _assert_lt(T a, U b, int line) {\n";
    out += "\tif (!(a < b)) {\n";
    out += "\t\tstd::cerr << \"line \" << line << \": FAIL: expected \" << a << \" < \" << b << std::endl;\n";
    out += "\t\t_failures++;\n";
    out += "\t}\n";
    out += "}\n\n";

    out += "template<typename T, typename U>\n";
    out += "void _assert_lte(T a, U b, int line) {\n";
    out += "\tif (!(a <= b)) {\n";
    out += "\t\tstd::cerr << \"line \" << line << \": FAIL: expected \" << a << \" <= \" << b << std::endl;\n";
    out += "\t\t_failures++;\n";
    out += "\t}\n";
    out += "}\n\n";

    out += "template<typename T, typename C>\n";
    out += "void _assert_contains(T item, C& collection, int line) {\n";
    out += "\tbool found = false;\n";
    out += "\tfor (const auto& elem : collection) {\n";
    out += "\t\tif (elem == item) {\n";
    out += "\t\t\tfound = true;\n";
    out += "\t\t\tbreak;\n";
    out += "\t\t}\n";
    out += "\t}\n";
    out += "\tif (!found) {\n";
    out += "\t\tstd::cerr << \"line \" << line << \": FAIL: collection does not contain \" << item << std::endl;\n";
    out += "\t\t_failures++;\n";
    out += "\t}\n";
    out += "}\n\n";

    out += "void _assert_starts_with(const std::string& prefix, const std::string& str, int line) {\n";
    out += "\tif (str.rfind(prefix, 0) != 0) {\n";
    out += "\t\tstd::cerr << \"line \" << line << \": FAIL: \\\"\" << str << \"\\\" does not start with \\\"\" << prefix << \"\\\"\" << std::endl;\n";
    out += "\t\t_failures++;\n";
    out += "\t}\n";
    out += "}\n\n";

    out += "void _assert_ends_with(const std::string& suffix, const std::string& str, int line) {\n";
    out += "\tif (str.length() < suffix.length() || str.compare(str.length() - suffix.length(), suffix.length(), suffix) != 0) {\n";
    out += "\t\tstd::cerr << \"line \" << line << \": FAIL: \\\"\" << str << \"\\\" does not end with \\\"\" << suffix << \"\\\"\" << std::endl;\n";
    out += "\t\t_failures++;\n";
    out += "\t}\n";
    out += "}\n\n";

    out += "template<typename T, typename U, typename E>\n";
    out += "void _assert_near(T actual, U expected, E epsilon, int line) {\n";
    out += "\tif (std::abs(static_cast<double>(actual) - static_cast<double>(expected)) > static_cast<double>(epsilon)) {\n";
    out += "\t\tstd::cerr << \"line \" << line << \": FAIL: \" << actual << \" is not within \" << epsilon << \" of \" << expected << std::endl;\n";
    out += "\t\t_failures++;\n";
    out += "\t}\n";
    out += "}\n\n";

    out
}

/// The generated test main: every `test_*` function runs in a fiber, with
/// error reporting for fallible tests, and the accumulated failure count
/// becomes the exit status.
pub fn generate_test_harness(program: &Program) -> String {
    let mut out = String::from("\nint main() {\n");
    out += "\tbishop::rt::init_runtime();\n\n";

    for func in &program.functions {
        if !func.name.starts_with("test_") {
            continue;
        }

        if func.error_type.is_empty() {
            out += &format!("\tbishop::rt::run_in_fiber({});\n", func.name);
        } else {
            out += "\tbishop::rt::run_in_fiber([]() {\n";
            out += &format!("\t\tauto result = {}();\n", func.name);
            out += "\t\tif (result.is_error()) {\n";
            out += &format!(
                "\t\t\tstd::cerr << \"{}: FAIL: \" << result.error()->message << std::endl;\n",
                func.name
            );
            out += "\t\t\t_failures++;\n";
            out += "\t\t}\n";
            out += "\t});\n";
        }
    }

    out += "\treturn _failures;\n";
    out += "}\n";
    out
}
