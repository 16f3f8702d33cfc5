//! Or-expression and default-expression lowering.
//!
//! Or-expressions generate statements, not just expressions: a fresh
//! temporary captures the input once, `bishop::is_or_falsy` tests it (error
//! state for fallible values, the runtime truthy test for falsy values), the
//! handler runs on the failure path and `bishop::or_value` extracts the
//! payload on the fall-through path.

use crate::parser::ast::{Node, OrHandler, OrMatchArm};

use super::{
    expression::{emit, string_literal, struct_cpp_name},
    statement::generate_statement,
    CodeGenState,
};

/// Pieces of a lowered or-expression, assembled by the statement emitter.
pub struct OrEmit {
    pub preamble: String,
    pub check: String,
    /// Fall-through initializer; empty for match (arms assign directly).
    pub value_expr: String,
    pub is_match: bool,
    pub temp_var: String,
}

/// Emits the error-return of a `fail`: a string message wraps into the
/// runtime error type, `err` re-raises, a bare error literal constructs the
/// error with its type name as message (and `err` as cause when one is in
/// flight).
pub fn emit_fail_value(state: &mut CodeGenState, value: &Node, err_in_scope: bool) -> String {
    match value {
        Node::StringLiteral { value, .. } => format!(
            "return std::make_shared<bishop::rt::Error>({})",
            string_literal(value)
        ),
        Node::VariableRef { name, .. } if name == "err" => "return err".to_owned(),
        Node::StructLiteral {
            struct_name,
            field_values,
            ..
        } if field_values.is_empty() => {
            let cpp_name = struct_cpp_name(state, struct_name);

            if err_in_scope {
                format!(
                    "return std::static_pointer_cast<bishop::rt::Error>(std::make_shared<{cpp_name}>(\"{struct_name}\", err))"
                )
            } else {
                format!(
                    "return std::static_pointer_cast<bishop::rt::Error>(std::make_shared<{cpp_name}>(\"{struct_name}\"))"
                )
            }
        }
        other => format!("return {}", emit(state, other)),
    }
}

fn emit_handler_transfer(state: &mut CodeGenState, handler: &OrHandler, temp: &str) -> String {
    match handler {
        OrHandler::Return(Some(value)) => format!("return {};", emit(state, value)),
        OrHandler::Return(None) => {
            if state.in_fallible_function {
                "return {};".to_owned()
            } else {
                "return;".to_owned()
            }
        }
        OrHandler::Continue => "continue;".to_owned(),
        OrHandler::Break => "break;".to_owned(),
        OrHandler::Fail(value) => {
            // `or fail err` extracts the inner error; a bare error type
            // chains it as the cause.
            let needs_err = matches!(&**value, Node::VariableRef { name, .. } if name == "err")
                || matches!(
                    &**value,
                    Node::StructLiteral { field_values, .. } if field_values.is_empty()
                );

            if needs_err {
                format!(
                    "auto err = bishop::or_error({temp}); {};",
                    emit_fail_value(state, value, true)
                )
            } else {
                format!("{};", emit_fail_value(state, value, false))
            }
        }
        OrHandler::Block(body) => {
            let mut out = format!("auto err = bishop::or_error({temp}); ");

            for stmt in body {
                out += &generate_statement(state, stmt);
                out += " ";
            }

            out.trim_end().to_owned()
        }
        OrHandler::Match(_) => unreachable!("match handlers lower separately"),
    }
}

/// Lowers `var := expr or HANDLER` (or the assignment form) into
/// preamble/check/value pieces.
pub fn emit_or_for_binding(
    state: &mut CodeGenState,
    expr: &Node,
    handler: &OrHandler,
    var_name: &str,
) -> OrEmit {
    let temp = state.next_temp("_or_tmp");
    let preamble = format!("auto {temp} = {};", emit(state, expr));

    if let OrHandler::Match(arms) = handler {
        let match_code = emit_or_match_arms(state, arms, var_name);

        let check = format!(
            "if ({temp}.is_error()) {{\n\t\tauto err = {temp}.error();\n\t\t{match_code}\n\t}} else {{\n\t\t{var_name} = {temp}.value();\n\t}}"
        );

        return OrEmit {
            preamble,
            check,
            value_expr: String::new(),
            is_match: true,
            temp_var: temp,
        };
    }

    let handler_code = emit_handler_transfer(state, handler, &temp);

    OrEmit {
        preamble,
        check: format!("if (bishop::is_or_falsy({temp})) {{ {handler_code} }}"),
        value_expr: format!("bishop::or_value({temp})"),
        is_match: false,
        temp_var: temp,
    }
}

/// Match arms lower to chained `dynamic_cast` tests on the extracted error;
/// value arms assign to the binding, fail arms propagate.
fn emit_or_match_arms(state: &mut CodeGenState, arms: &[OrMatchArm], var_name: &str) -> String {
    let mut out = String::new();
    let mut first = true;

    for arm in arms {
        let body = if let Node::FailStmt { value, .. } = &*arm.body {
            format!("{};", emit_fail_value(state, value, true))
        } else {
            format!("{var_name} = {};", emit(state, &arm.body))
        };

        if arm.error_type == "_" {
            if first {
                out += &format!("{{ {body} }}");
            } else {
                out += &format!(" else {{ {body} }}");
            }
        } else {
            let check = if first { "if" } else { " else if" };
            let cpp_name = struct_cpp_name(state, &arm.error_type);
            out += &format!("{check} (dynamic_cast<{cpp_name}*>(err.get())) {{ {body} }}");
        }

        first = false;
    }

    // Without a default arm, unmatched errors re-raise.
    if !arms.iter().any(|arm| arm.error_type == "_") {
        out += " else { return err; }";
    }

    out
}

/// Lowers a top-level or-expression statement (`cond or fail "...";`).
pub fn emit_or_statement(state: &mut CodeGenState, expr: &Node, handler: &OrHandler) -> String {
    let temp = state.next_temp("_or_stmt_tmp");
    let preamble = format!("auto {temp} = {};", emit(state, expr));

    if let OrHandler::Match(arms) = handler {
        // A standalone match has no binding; every arm must transfer.
        let mut match_code = String::new();
        let mut first = true;

        for arm in arms {
            let body = if let Node::FailStmt { value, .. } = &*arm.body {
                format!("{};", emit_fail_value(state, value, true))
            } else {
                format!("return {};", emit(state, &arm.body))
            };

            if arm.error_type == "_" {
                if first {
                    match_code += &format!("{{ {body} }}");
                } else {
                    match_code += &format!(" else {{ {body} }}");
                }
            } else {
                let check = if first { "if" } else { " else if" };
                let cpp_name = struct_cpp_name(state, &arm.error_type);
                match_code +=
                    &format!("{check} (dynamic_cast<{cpp_name}*>(err.get())) {{ {body} }}");
            }

            first = false;
        }

        let handler_code = format!("auto err = {temp}.error(); {match_code}");
        return format!("{preamble}\n\tif ({temp}.is_error()) {{ {handler_code} }}");
    }

    let handler_code = emit_handler_transfer(state, handler, &temp);
    format!("{preamble}\n\tif (bishop::is_or_falsy({temp})) {{ {handler_code} }}")
}

/// Default-expression lowering. `pair.get(i) default f` and
/// `tuple.get(i) default f` generate bounds-checked conditionals; the
/// general form evaluates the input once inside a lambda and tests
/// `is_or_falsy`.
pub fn emit_default_expr(state: &mut CodeGenState, expr: &Node, fallback: &Node) -> String {
    let fallback_str = emit(state, fallback);

    if let Node::MethodCall {
        id,
        object,
        method,
        args,
        ..
    } = expr
    {
        if method == "get" {
            let receiver = state.receiver_type(*id).to_owned();

            if receiver.starts_with("Pair<") {
                let obj_str = emit(state, object);
                let idx = emit(state, &args[0]);

                return format!(
                    "(({idx}) == 0 ? {obj_str}.first : (({idx}) == 1 ? {obj_str}.second : {fallback_str}))"
                );
            }

            if receiver.starts_with("Tuple<") {
                let obj_str = emit(state, object);
                let idx = emit(state, &args[0]);

                return format!(
                    "(static_cast<size_t>({idx}) < {obj_str}.size() && ({idx}) >= 0 ? {obj_str}[{idx}] : {fallback_str})"
                );
            }
        }
    }

    let expr_str = emit(state, expr);

    format!(
        "[&]() {{ auto _v = {expr_str}; return bishop::is_or_falsy(_v) ? {fallback_str} : bishop::or_value(_v); }}()"
    )
}
