//! Recursive-descent parser for Bishop.
//!
//! Parsing happens in two passes: a pre-scan collects all top-level function
//! and struct/error names so forward references parse correctly, then the
//! real pass builds the [`ast::Program`]. The grammar mixes C-like statements
//! with inferred `:=` declarations, `Name :: struct/err/method` definitions,
//! fallible functions, or-expressions and a module system with selective and
//! wildcard imports; identifier-headed statements are discriminated with
//! bounded lookahead.
//!
//! A token mismatch aborts the parse with a [`ParseError`] naming the
//! offending lexeme and line. There is no recovery.

pub mod ast;
mod definition;
mod expression;
mod state;
mod statement;
mod types;

pub use state::*;

use std::{error::Error, fmt::Display};

use crate::lexer::Token;

use self::ast::Program;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }

    pub fn unexpected(token: &Token) -> Self {
        let message = if token.lexeme.is_empty() {
            format!("unexpected token at line {}", token.line)
        } else {
            format!("unexpected token '{}' at line {}", token.lexeme, token.line)
        };

        Self {
            message,
            line: token.line,
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for ParseError {}

/// Parses a complete token stream into a [`Program`].
pub fn parse(tokens: Vec<Token>) -> Result<Program, ParseError> {
    let mut state = ParserState::new(tokens);
    definition::parse_program(&mut state)
}

#[cfg(test)]
mod tests {
    use crate::lexer::Lexer;

    use super::{ast::*, parse};

    fn parse_source(src: &str) -> Program {
        parse(Lexer::new(src).lex()).expect("parse failed")
    }

    #[test]
    fn test_parse_empty_main() {
        let program = parse_source("fn main() { }");

        assert_eq!(program.functions.len(), 1);
        assert_eq!(program.functions[0].name, "main");
        assert!(program.functions[0].body.is_empty());
        assert!(program.functions[0].error_type.is_empty());
    }

    #[test]
    fn test_parse_forward_reference() {
        // `later` and `Point` are referenced before their definitions; the
        // pre-scan pass makes this parse.
        let program = parse_source(
            r#"
            fn main() {
                p := Point { x: 1, y: 2 };
                later();
            }

            fn later() { }

            Point :: struct {
                x int,
                y int
            }
            "#,
        );

        assert_eq!(program.functions.len(), 2);
        assert_eq!(program.structs.len(), 1);

        let Node::VariableDecl { value, .. } = &program.functions[0].body[0] else {
            panic!("expected declaration");
        };
        assert!(matches!(**value, Node::StructLiteral { .. }));
    }

    #[test]
    fn test_parse_fallible_function() {
        let program = parse_source(
            "fn divide(int a, int b) -> int or err { if b == 0 fail \"zero\"; return a / b; }",
        );

        let f = &program.functions[0];
        assert_eq!(f.return_type, "int");
        assert_eq!(f.error_type, "err");
        assert_eq!(f.params.len(), 2);
    }

    #[test]
    fn test_parse_or_return() {
        let program = parse_source("fn main() { v := work() or return; print(v); }");

        let Node::VariableDecl { value, .. } = &program.functions[0].body[0] else {
            panic!("expected declaration");
        };
        let Node::OrExpr { handler, .. } = &**value else {
            panic!("expected or expression");
        };
        assert_eq!(*handler, OrHandler::Return(None));
    }

    #[test]
    fn test_parse_or_match() {
        let program = parse_source(
            r#"
            NotFound :: err { code int }

            fn main() {
                v := work() or match err {
                    NotFound => 0,
                    _ => 1
                };
                print(v);
            }
            "#,
        );

        let Node::VariableDecl { value, .. } = &program.functions[0].body[0] else {
            panic!("expected declaration");
        };
        let Node::OrExpr {
            handler: OrHandler::Match(arms),
            ..
        } = &**value
        else {
            panic!("expected or match");
        };
        assert_eq!(arms.len(), 2);
        assert_eq!(arms[0].error_type, "NotFound");
        assert_eq!(arms[1].error_type, "_");
    }

    #[test]
    fn test_parse_method_and_static() {
        let program = parse_source(
            r#"
            Counter :: struct { value int }

            Counter :: bump(self) -> int {
                return self.value + 1;
            }

            @static
            Counter :: zero() -> int {
                return 0;
            }
            "#,
        );

        assert_eq!(program.methods.len(), 2);
        assert_eq!(program.methods[0].params[0].name, "self");
        assert!(!program.methods[0].is_static);
        assert!(program.methods[1].is_static);
        assert!(program.methods[1].params.is_empty());
    }

    #[test]
    fn test_parse_imports_and_usings() {
        let program = parse_source(
            r#"
            import http;
            import log;
            using log.info, log.warn;

            fn main() { info("hi"); }
            "#,
        );

        assert_eq!(program.imports.len(), 2);
        assert_eq!(program.imports[0].alias, "http");
        assert_eq!(program.usings[0].members.len(), 2);
    }

    #[test]
    fn test_parse_wildcard_using_struct_literal() {
        // Under a wildcard using, a PascalCase identifier followed by `{`
        // conservatively parses as a struct literal.
        let program = parse_source(
            r#"
            import shapes;
            using shapes.*;

            fn main() {
                c := Circle { radius: 2 };
                print(c);
            }
            "#,
        );

        let Node::VariableDecl { value, .. } = &program.functions[0].body[0] else {
            panic!("expected declaration");
        };
        assert!(matches!(**value, Node::StructLiteral { .. }));
    }

    #[test]
    fn test_parse_for_range_and_each() {
        let program = parse_source(
            r#"
            fn main() {
                for i in 0..3 { print(i); }
                for x in names { print(x); }
            }
            "#,
        );

        let body = &program.functions[0].body;
        assert!(matches!(
            body[0],
            Node::ForStmt {
                kind: ForKind::Range,
                ..
            }
        ));
        assert!(matches!(
            body[1],
            Node::ForStmt {
                kind: ForKind::Each,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_postfix_chain() {
        // a.b.c().d(x)(y) parses in the natural sense.
        let program = parse_source("fn main() { v := a.b.c().d(x)(y); print(v); }");

        let Node::VariableDecl { value, .. } = &program.functions[0].body[0] else {
            panic!("expected declaration");
        };
        let Node::LambdaCall { callee, .. } = &**value else {
            panic!("expected immediate invocation");
        };
        assert!(matches!(**callee, Node::MethodCall { .. }));
    }

    #[test]
    fn test_parse_bare_error_fail() {
        let program = parse_source(
            r#"
            NotFound :: err { code int }

            fn lookup() -> int or err {
                fail NotFound;
            }
            "#,
        );

        let Node::FailStmt { value, .. } = &program.functions[0].body[0] else {
            panic!("expected fail");
        };
        let Node::StructLiteral {
            struct_name,
            field_values,
            ..
        } = &**value
        else {
            panic!("expected bare error literal");
        };
        assert_eq!(struct_name, "NotFound");
        assert!(field_values.is_empty());
    }

    #[test]
    fn test_parse_unary_minus_vs_subtraction() {
        let program = parse_source("fn main() { a := -x; b := a - x; print(a, b); }");

        let body = &program.functions[0].body;
        let Node::VariableDecl { value, .. } = &body[0] else {
            panic!("expected declaration");
        };
        assert!(matches!(**value, Node::NegateExpr { .. }));

        let Node::VariableDecl { value, .. } = &body[1] else {
            panic!("expected declaration");
        };
        assert!(matches!(**value, Node::BinaryExpr { .. }));
    }

    #[test]
    fn test_parse_select() {
        let program = parse_source(
            r#"
            fn pump(Channel<int> a, Channel<int> b) {
                select {
                    v := a.recv() => { print(v); }
                    w := b.recv() => { print(w); }
                }
            }
            "#,
        );

        let Node::SelectStmt { arms, .. } = &program.functions[0].body[0] else {
            panic!("expected select");
        };
        assert_eq!(arms.len(), 2);
        assert_eq!(arms[0].binding.as_deref(), Some("v"));
    }

    #[test]
    fn test_parse_with_statement() {
        let program = parse_source(
            r#"
            import fs;

            fn main() {
                with fs.open("a.txt") as file {
                    print(file);
                }
            }
            "#,
        );

        let Node::WithStmt { binding, body, .. } = &program.functions[0].body[0] else {
            panic!("expected with");
        };
        assert_eq!(binding, "file");
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn test_parse_lambda() {
        let program = parse_source(
            "fn main() { add := fn(int a, int b) -> int { return a + b; }; print(add(1, 2)); }",
        );

        let Node::VariableDecl { value, .. } = &program.functions[0].body[0] else {
            panic!("expected declaration");
        };
        let Node::LambdaExpr {
            params,
            return_type,
            ..
        } = &**value
        else {
            panic!("expected lambda");
        };
        assert_eq!(params.len(), 2);
        assert_eq!(return_type, "int");
    }

    #[test]
    fn test_parse_extern_function() {
        let program = parse_source("@extern(\"m\") fn sqrt(f64 x) -> f64;");

        assert_eq!(program.externs.len(), 1);
        assert_eq!(program.externs[0].library, "m");
        assert_eq!(program.externs[0].return_type, "f64");
    }

    #[test]
    fn test_parse_unexpected_token_reports_lexeme_and_line() {
        let result = parse(crate::lexer::Lexer::new("fn main( {").lex());

        let err = result.expect_err("expected parse failure");
        assert!(err.message.contains('{'), "message: {}", err.message);
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_parse_doc_comments_attach_to_definition() {
        // Doc comments at the very top of the file belong to no definition;
        // runs before a later definition attach to it.
        let program = parse_source(
            r#"
            /// File-level comment, dropped.
            fn first() { }

            /// Adds two numbers.
            /// Really.
            fn add(int a, int b) -> int { return a + b; }
            "#,
        );

        assert_eq!(program.functions[0].doc_comment, "");
        assert_eq!(
            program.functions[1].doc_comment,
            "Adds two numbers.\nReally."
        );
    }

    #[test]
    fn test_parse_channel_with_capacity() {
        let program = parse_source("fn main() { ch := Channel<int>(8); print(ch); }");

        let Node::VariableDecl { value, .. } = &program.functions[0].body[0] else {
            panic!("expected declaration");
        };
        let Node::ChannelCreate {
            element_type,
            capacity,
            ..
        } = &**value
        else {
            panic!("expected channel");
        };
        assert_eq!(element_type, "int");
        assert!(capacity.is_some());
    }

    #[test]
    fn test_parse_map_literal_and_set_literal() {
        let program = parse_source(
            r#"
            fn main() {
                ages := {"a": 1, "b": 2};
                seen := {1, 2, 3};
                print(ages, seen);
            }
            "#,
        );

        let body = &program.functions[0].body;
        let Node::VariableDecl { value, .. } = &body[0] else {
            panic!()
        };
        assert!(matches!(**value, Node::MapLiteral { .. }));

        let Node::VariableDecl { value, .. } = &body[1] else {
            panic!()
        };
        assert!(matches!(**value, Node::SetLiteral { .. }));
    }

    #[test]
    fn test_parse_pointer_declaration() {
        let program = parse_source(
            r#"
            Node :: struct { value int }

            fn main() {
                n := Node { value: 1 };
                Node* p = &n;
                print(p.value);
            }
            "#,
        );

        let Node::VariableDecl { type_name, value, .. } = &program.functions[0].body[1] else {
            panic!("expected pointer declaration");
        };
        assert_eq!(type_name, "Node*");
        assert!(matches!(**value, Node::AddressOf { .. }));
    }

    #[test]
    fn test_parse_container_typed_declaration() {
        let program = parse_source(
            r#"
            fn main() {
                List<int> nums = [1, 2, 3];
                Map<str, List<int>> table = Map<str, List<int>>();
                print(nums, table);
            }
            "#,
        );

        let Node::VariableDecl { type_name, .. } = &program.functions[0].body[0] else {
            panic!("expected declaration");
        };
        assert_eq!(type_name, "List<int>");

        let Node::VariableDecl { type_name, .. } = &program.functions[0].body[1] else {
            panic!("expected declaration");
        };
        assert_eq!(type_name, "Map<str, List<int>>");
    }

    #[test]
    fn test_parse_qualified_type_declaration() {
        let program = parse_source(
            r#"
            import net;

            fn main() {
                net.TcpStream stream = net.connect("localhost");
                print(stream);
            }
            "#,
        );

        let Node::VariableDecl { type_name, .. } = &program.functions[0].body[0] else {
            panic!("expected declaration");
        };
        assert_eq!(type_name, "net.TcpStream");
    }

    #[test]
    fn test_parse_or_block_and_statement_level_or() {
        let program = parse_source(
            r#"
            fn check(bool ready) -> int or err {
                ready or fail "not ready";
                v := probe() or {
                    print("boom");
                    return 0;
                };
                return v;
            }

            fn probe() -> int or err { return 1; }
            "#,
        );

        let body = &program.functions[0].body;
        let Node::OrExpr { handler, .. } = &body[0] else {
            panic!("expected statement-level or");
        };
        assert!(matches!(handler, OrHandler::Fail(_)));

        let Node::VariableDecl { value, .. } = &body[1] else {
            panic!("expected declaration");
        };
        let Node::OrExpr {
            handler: OrHandler::Block(block),
            ..
        } = &**value
        else {
            panic!("expected or block");
        };
        assert_eq!(block.len(), 2);
    }

    #[test]
    fn test_parse_default_and_is_none() {
        let program = parse_source(
            r#"
            fn main() {
                ages := {"a": 1};
                v := ages.get("a") default 0;
                missing := ages.get("b") is none;
                print(v, missing);
            }
            "#,
        );

        let body = &program.functions[0].body;
        let Node::VariableDecl { value, .. } = &body[1] else {
            panic!("expected declaration");
        };
        assert!(matches!(**value, Node::DefaultExpr { .. }));

        let Node::VariableDecl { value, .. } = &body[2] else {
            panic!("expected declaration");
        };
        assert!(matches!(**value, Node::IsNone { .. }));
    }

    #[test]
    fn test_parse_priority_queue_min_selector() {
        let program = parse_source(
            "fn main() { pq := PriorityQueue<int>.min(); pq.push(1); print(pq.top()); }",
        );

        let Node::VariableDecl { value, .. } = &program.functions[0].body[0] else {
            panic!("expected declaration");
        };
        let Node::PriorityQueueCreate { is_min_heap, .. } = &**value else {
            panic!("expected priority queue creation");
        };
        assert!(*is_min_heap);
    }

    #[test]
    fn test_parse_while_and_braceless_else() {
        let program = parse_source(
            r#"
            fn classify(int x) -> str {
                while x > 10 {
                    x = x - 1;
                }
                if x < 0 return "negative";
                else return "small";
            }
            "#,
        );

        let body = &program.functions[0].body;
        assert!(matches!(body[0], Node::WhileStmt { .. }));

        let Node::IfStmt {
            then_body,
            else_body,
            ..
        } = &body[1]
        else {
            panic!("expected if");
        };
        assert_eq!(then_body.len(), 1);
        assert_eq!(else_body.len(), 1);
    }

    #[test]
    fn test_parse_module_constant() {
        let program = parse_source("const int MAX = 100;\nfn main() { print(MAX); }");

        assert_eq!(program.constants.len(), 1);
        let Node::VariableDecl { name, is_const, .. } = &program.constants[0] else {
            panic!("expected const declaration");
        };
        assert_eq!(name, "MAX");
        assert!(is_const);
    }
}
