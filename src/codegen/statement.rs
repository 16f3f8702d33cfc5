//! Statement emission.

use crate::parser::ast::{ForKind, Node, SelectArm};

use super::{
    expression::{emit, emit_function_call},
    names::escape_reserved_name,
    or_expr::{emit_fail_value, emit_or_for_binding, emit_or_statement},
    types::map_type_for_decl,
    CodeGenState,
};

/// Generates C++ for a statement node. Print, the assertion builtins (test
/// mode) and sleep are intercepted here; everything else dispatches through
/// the expression emitter plus the dedicated control-flow forms.
pub fn generate_statement(state: &mut CodeGenState, node: &Node) -> String {
    match node {
        Node::FunctionCall { name, args, line } => {
            if name == "print" {
                return print_multi(state, args);
            }

            if state.test_mode {
                if let Some(call) = assertion_call(state, name, args, *line) {
                    return call;
                }
            }

            if name == "sleep" && args.len() == 1 {
                return format!("bishop::rt::sleep({});", emit(state, &args[0]));
            }

            format!("{};", emit_function_call(state, name, args))
        }

        Node::IfStmt {
            condition,
            then_body,
            else_body,
            ..
        } => {
            let cond = emit(state, condition);
            let mut out = format!("if ({cond}) {{\n");

            for stmt in then_body {
                out += "\t\t";
                out += &generate_statement(state, stmt);
                out += "\n";
            }

            out += "\t}";

            if !else_body.is_empty() {
                out += " else {\n";

                for stmt in else_body {
                    out += "\t\t";
                    out += &generate_statement(state, stmt);
                    out += "\n";
                }

                out += "\t}";
            }

            out
        }

        Node::WhileStmt {
            condition, body, ..
        } => {
            let cond = emit(state, condition);
            let mut out = format!("while ({cond}) {{\n");

            for stmt in body {
                out += "\t\t";
                out += &generate_statement(state, stmt);
                out += "\n";
            }

            out += "\t}";
            out
        }

        Node::ForStmt {
            kind,
            loop_var,
            range_start,
            range_end,
            iterable,
            body,
            ..
        } => {
            let var = escape_reserved_name(loop_var);

            let mut out = match kind {
                ForKind::Range => {
                    let start = emit(
                        state,
                        range_start.as_deref().expect("range loop has a start"),
                    );
                    let end = emit(state, range_end.as_deref().expect("range loop has an end"));
                    format!("for (int {var} = {start}; {var} < {end}; {var}++) {{\n")
                }
                ForKind::Each => {
                    let iter = emit(
                        state,
                        iterable.as_deref().expect("each loop has an iterable"),
                    );
                    format!("for (const auto& {var} : {iter}) {{\n")
                }
            };

            for stmt in body {
                out += "\t\t";
                out += &generate_statement(state, stmt);
                out += "\n";
            }

            out += "\t}";
            out
        }

        Node::SelectStmt { arms, .. } => generate_select(state, arms),

        Node::GoSpawn { .. } => format!("{};", emit(state, node)),

        Node::WithStmt {
            resource,
            binding,
            body,
            ..
        } => generate_with(state, resource, binding, body),

        Node::MethodCall { .. } | Node::FieldAssignment { .. } | Node::LambdaCall { .. } => {
            format!("{};", emit(state, node))
        }

        Node::FailStmt { value, .. } => {
            let err_in_scope = matches!(&**value, Node::VariableRef { name, .. } if name == "err");
            format!("{};", emit_fail_value(state, value, err_in_scope))
        }

        Node::ContinueStmt { .. } => "continue;".to_owned(),
        Node::BreakStmt { .. } => "break;".to_owned(),

        Node::ReturnStmt { value, .. } => match value {
            Some(value) => format!("return {};", emit(state, value)),
            None => {
                if state.in_fallible_function {
                    "return {};".to_owned()
                } else {
                    "return;".to_owned()
                }
            }
        },

        Node::VariableDecl {
            type_name,
            name,
            value,
            is_optional,
            is_const,
            ..
        } => generate_variable_decl(state, type_name, name, value, *is_optional, *is_const),

        Node::Assignment { name, value, .. } => {
            let target = escape_reserved_name(name);

            if let Node::OrExpr { expr, handler, .. } = &**value {
                let lowered = emit_or_for_binding(state, expr, handler, &target);

                if lowered.is_match {
                    return format!("{}\n\t{}", lowered.preamble, lowered.check);
                }

                return format!(
                    "{}\n\t{}\n\t{target} = {};",
                    lowered.preamble, lowered.check, lowered.value_expr
                );
            }

            format!("{target} = {};", emit(state, value))
        }

        Node::OrExpr { expr, handler, .. } => emit_or_statement(state, expr, handler),

        other => format!("{};", emit(state, other)),
    }
}

/// Print becomes a space-separated stream-out terminated by a newline.
fn print_multi(state: &mut CodeGenState, args: &[Node]) -> String {
    if args.is_empty() {
        return "std::cout << std::endl;".to_owned();
    }

    let mut out = String::from("std::cout");

    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out += " << \" \"";
        }

        out += &format!(" << {}", emit(state, arg));
    }

    out += " << std::endl;";
    out
}

/// Assertions emit into the generated test-harness helpers, carrying the
/// source line for the failure report.
fn assertion_call(
    state: &mut CodeGenState,
    name: &str,
    args: &[Node],
    line: usize,
) -> Option<String> {
    fn two_arg(state: &mut CodeGenState, helper: &str, args: &[Node], line: usize) -> String {
        format!(
            "{helper}({}, {}, {line});",
            emit(state, &args[0]),
            emit(state, &args[1])
        )
    }

    match name {
        "assert_eq" if args.len() >= 2 => Some(two_arg(state, "_assert_eq", args, line)),
        "assert_ne" if args.len() >= 2 => Some(two_arg(state, "_assert_ne", args, line)),
        "assert_gt" if args.len() >= 2 => Some(two_arg(state, "_assert_gt", args, line)),
        "assert_gte" if args.len() >= 2 => Some(two_arg(state, "_assert_gte", args, line)),
        "assert_lt" if args.len() >= 2 => Some(two_arg(state, "_assert_lt", args, line)),
        "assert_lte" if args.len() >= 2 => Some(two_arg(state, "_assert_lte", args, line)),
        "assert_contains" if args.len() >= 2 => {
            Some(two_arg(state, "_assert_contains", args, line))
        }
        "assert_starts_with" if args.len() >= 2 => {
            Some(two_arg(state, "_assert_starts_with", args, line))
        }
        "assert_ends_with" if args.len() >= 2 => {
            Some(two_arg(state, "_assert_ends_with", args, line))
        }
        "assert_true" if !args.is_empty() => Some(format!(
            "_assert_true({}, {line});",
            emit(state, &args[0])
        )),
        "assert_false" if !args.is_empty() => Some(format!(
            "_assert_false({}, {line});",
            emit(state, &args[0])
        )),
        "assert_near" if args.len() >= 3 => Some(format!(
            "_assert_near({}, {}, {}, {line});",
            emit(state, &args[0]),
            emit(state, &args[1]),
            emit(state, &args[2])
        )),
        _ => None,
    }
}

/// Declarations: `auto` for inferred types, `std::optional<T>` for
/// optionals, `const` for constants. Or-expression initializers lower to
/// the temporary/check/extract sequence first.
fn generate_variable_decl(
    state: &mut CodeGenState,
    type_name: &str,
    name: &str,
    value: &Node,
    is_optional: bool,
    is_const: bool,
) -> String {
    let var = escape_reserved_name(name);

    if let Node::OrExpr { expr, handler, .. } = value {
        let lowered = emit_or_for_binding(state, expr, handler, &var);

        if lowered.is_match {
            // Declare first so the match arms can assign.
            let decl = if type_name.is_empty() {
                format!(
                    "std::decay_t<decltype(bishop::or_value({}))> {var};",
                    lowered.temp_var
                )
            } else {
                format!("{} {var};", map_type_for_decl(type_name))
            };

            return format!("{}\n\t{decl}\n\t{}", lowered.preamble, lowered.check);
        }

        let decl = decl_text(type_name, &var, &lowered.value_expr, is_optional, is_const);
        return format!("{}\n\t{}\n\t{decl}", lowered.preamble, lowered.check);
    }

    let value_str = emit(state, value);
    decl_text(type_name, &var, &value_str, is_optional, is_const)
}

fn decl_text(
    type_name: &str,
    var: &str,
    value: &str,
    is_optional: bool,
    is_const: bool,
) -> String {
    let t = if type_name.is_empty() {
        "auto".to_owned()
    } else {
        map_type_for_decl(type_name)
    };

    let const_prefix = if is_const { "const " } else { "" };

    if is_optional {
        return format!("{const_prefix}std::optional<{t}> {var} = {value};");
    }

    format!("{const_prefix}{t} {var} = {value};")
}

/// `with expr as name { body }`: scoped acquisition with a runtime scope
/// guard, so close() runs on every exit path (normal, return, fail,
/// continue, break or unwound error).
fn generate_with(
    state: &mut CodeGenState,
    resource: &Node,
    binding: &str,
    body: &[Node],
) -> String {
    let var = escape_reserved_name(binding);
    let resource_str = emit(state, resource);

    let mut out = format!("{{\n\t\tauto {var} = {resource_str};\n");
    out += &format!(
        "\t\tbishop::rt::ScopeGuard _close_{var}([&]() {{ {var}.close(); }});\n"
    );

    for stmt in body {
        out += "\t\t";
        out += &generate_statement(state, stmt);
        out += "\n";
    }

    out += "\t}";
    out
}

/// Select lowers to a polling loop over the arms' channels in source order,
/// yielding to the scheduler between rounds. Ordering among simultaneously
/// ready arms is therefore runtime-defined.
fn generate_select(state: &mut CodeGenState, arms: &[SelectArm]) -> String {
    let done = state.next_temp("_select_done");
    let mut out = format!("{{\n\tbool {done} = false;\n\twhile (!{done}) {{\n");

    for (i, arm) in arms.iter().enumerate() {
        let recv_tmp = state.next_temp("_recv");

        // The arm's channel expression is `ch.recv()` (optionally awaited);
        // polling uses try_recv on the receiver itself.
        let channel = select_channel_object(&arm.channel);
        let channel_str = emit(state, channel);

        let keyword = if i == 0 { "\t\tif" } else { " else if" };
        out += &format!("{keyword} (auto {recv_tmp} = {channel_str}.try_recv()) {{\n");

        if let Some(binding) = &arm.binding {
            out += &format!(
                "\t\t\tauto {} = *{recv_tmp};\n",
                escape_reserved_name(binding)
            );
        }

        for stmt in &arm.body {
            out += "\t\t\t";
            out += &generate_statement(state, stmt);
            out += "\n";
        }

        out += &format!("\t\t\t{done} = true;\n\t\t}}");
    }

    out += " else {\n\t\t\tbishop::rt::yield_now();\n\t\t}\n\t}\n\t}";
    out
}

/// Unwraps `await ch.recv()` / `ch.recv()` down to the channel expression.
fn select_channel_object(channel: &Node) -> &Node {
    let inner = match channel {
        Node::AwaitExpr { value, .. } => value,
        other => other,
    };

    match inner {
        Node::MethodCall { object, method, .. } if method == "recv" => object,
        other => other,
    }
}
