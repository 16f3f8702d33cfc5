//! Expression emission.

use crate::{parser::ast::Node, typechecker::MODULE_ACCESS};

use super::{
    names::{escape_reserved_name, remap_module},
    or_expr::emit_default_expr,
    types::map_type,
    CodeGenState,
};

/// Escapes special characters for a C++ string literal.
pub fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() * 2);

    for c in value.chars() {
        match c {
            '"' => out += "\\\"",
            '\\' => out += "\\\\",
            '\n' => out += "\\n",
            '\t' => out += "\\t",
            '\r' => out += "\\r",
            other => out.push(other),
        }
    }

    out
}

/// String literals are wrapped in the std::string constructor so operator
/// overloads resolve against the library type.
pub fn string_literal(value: &str) -> String {
    format!("std::string(\"{}\")", escape_string(value))
}

/// Emits C++ for an expression node.
pub fn emit(state: &mut CodeGenState, node: &Node) -> String {
    match node {
        Node::StringLiteral { value, .. } => string_literal(value),
        Node::NumberLiteral { value, .. } => value.clone(),
        Node::FloatLiteral { value, .. } => value.clone(),
        Node::BoolLiteral { value, .. } => if *value { "true" } else { "false" }.to_owned(),
        Node::NoneLiteral { .. } => "std::nullopt".to_owned(),

        Node::VariableRef { name, .. } => escape_reserved_name(name),

        Node::FunctionRef { name, .. } => match name.split_once('.') {
            Some((module, func)) => format!(
                "{}::{}",
                remap_module(module),
                escape_reserved_name(func)
            ),
            None => match state.using_alias(name) {
                Some((module, member)) => {
                    let qualified =
                        format!("{}::{}", remap_module(module), escape_reserved_name(member));
                    qualified
                }
                None => escape_reserved_name(name),
            },
        },

        Node::QualifiedRef { module, name, .. } => {
            format!("{}::{}", remap_module(module), escape_reserved_name(name))
        }

        Node::FieldAccess {
            id, object, field, ..
        } => {
            if let Node::VariableRef { name, .. } = &**object {
                if name == "self" {
                    return format!("this->{}", escape_reserved_name(field));
                }
            }

            let receiver = state.receiver_type(*id).to_owned();

            if receiver == MODULE_ACCESS {
                if let Node::VariableRef { name, .. } = &**object {
                    return format!(
                        "{}::{}",
                        remap_module(name),
                        escape_reserved_name(field)
                    );
                }
            }

            let obj = emit(state, object);

            // Pointer receivers use arrow-style access.
            if receiver.ends_with('*') {
                format!("{obj}->{}", escape_reserved_name(field))
            } else {
                format!("{obj}.{}", escape_reserved_name(field))
            }
        }

        Node::FieldAssignment {
            id,
            object,
            field,
            value,
            ..
        } => {
            let value_str = emit(state, value);

            if let Node::VariableRef { name, .. } = &**object {
                if name == "self" {
                    return format!("this->{} = {value_str}", escape_reserved_name(field));
                }
            }

            let receiver = state.receiver_type(*id).to_owned();
            let obj = emit(state, object);

            if receiver.ends_with('*') {
                format!("{obj}->{} = {value_str}", escape_reserved_name(field))
            } else {
                format!("{obj}.{} = {value_str}", escape_reserved_name(field))
            }
        }

        Node::AddressOf { value, .. } => format!("&{}", emit(state, value)),

        Node::FunctionCall { name, args, .. } => emit_function_call(state, name, args),

        Node::MethodCall { .. } => super::method_call::emit_method_call(state, node),

        Node::LambdaCall { callee, args, .. } => {
            let callee_str = emit(state, callee);
            let args: Vec<String> = args.iter().map(|a| emit(state, a)).collect();
            format!("{callee_str}({})", args.join(", "))
        }

        Node::BinaryExpr {
            op, left, right, ..
        } => {
            format!("{} {op} {}", emit(state, left), emit(state, right))
        }

        Node::NotExpr { value, .. } => format!("!{}", emit(state, value)),
        Node::NegateExpr { value, .. } => format!("-{}", emit(state, value)),
        Node::ParenExpr { value, .. } => format!("({})", emit(state, value)),
        Node::IsNone { value, .. } => format!("!{}.has_value()", emit(state, value)),

        // In the fiber runtime the channel operations themselves suspend;
        // await marks the suspension point in the source only.
        Node::AwaitExpr { value, .. } => emit(state, value),

        Node::ChannelCreate {
            element_type,
            capacity,
            ..
        } => {
            let cpp_type = map_type(element_type);

            match capacity {
                Some(capacity) => {
                    let cap = emit(state, capacity);
                    format!("bishop::rt::Channel<{cpp_type}>({cap})")
                }
                None => format!("bishop::rt::Channel<{cpp_type}>()"),
            }
        }

        Node::GoSpawn { call, .. } => {
            // Route through statement emission so builtins like print keep
            // their rewrites inside the spawned body.
            let call_stmt = super::statement::generate_statement(state, call);
            format!("bishop::rt::go([&]() {{ {call_stmt} }})")
        }

        Node::ListCreate { element_type, .. } => {
            format!("std::vector<{}>{{}}", map_type(element_type))
        }

        Node::ListLiteral { elements, .. } => {
            let elements: Vec<String> = elements.iter().map(|e| emit(state, e)).collect();
            format!("std::vector{{{}}}", elements.join(", "))
        }

        Node::MapCreate {
            key_type,
            value_type,
            ..
        } => format!(
            "std::unordered_map<{}, {}>{{}}",
            map_type(key_type),
            map_type(value_type)
        ),

        Node::MapLiteral { entries, .. } => {
            // std::make_pair per entry helps CTAD infer the map types.
            let entries: Vec<String> = entries
                .iter()
                .map(|(key, value)| {
                    format!(
                        "std::make_pair({}, {})",
                        emit(state, key),
                        emit(state, value)
                    )
                })
                .collect();

            format!("std::unordered_map{{{}}}", entries.join(", "))
        }

        Node::SetCreate { element_type, .. } => {
            format!("std::unordered_set<{}>{{}}", map_type(element_type))
        }

        Node::SetLiteral { elements, .. } => {
            let elements: Vec<String> = elements.iter().map(|e| emit(state, e)).collect();
            format!("std::unordered_set{{{}}}", elements.join(", "))
        }

        Node::PairCreate { first, second, .. } => {
            format!(
                "std::make_pair({}, {})",
                emit(state, first),
                emit(state, second)
            )
        }

        Node::TupleCreate {
            element_type,
            elements,
            ..
        } => {
            let elements: Vec<String> = elements.iter().map(|e| emit(state, e)).collect();
            format!(
                "std::vector<{}>{{{}}}",
                map_type(element_type),
                elements.join(", ")
            )
        }

        Node::DequeCreate { element_type, .. } => {
            format!("std::deque<{}>{{}}", map_type(element_type))
        }

        Node::StackCreate { element_type, .. } => {
            format!("std::stack<{}>{{}}", map_type(element_type))
        }

        Node::QueueCreate { element_type, .. } => {
            format!("std::queue<{}>{{}}", map_type(element_type))
        }

        Node::PriorityQueueCreate {
            element_type,
            is_min_heap,
            ..
        } => {
            let cpp_type = map_type(element_type);

            if *is_min_heap {
                format!("bishop::MinPriorityQueue<{cpp_type}>()")
            } else {
                format!("bishop::MaxPriorityQueue<{cpp_type}>()")
            }
        }

        Node::LambdaExpr {
            params,
            return_type,
            body,
            ..
        } => {
            let mut out = String::from("[&](");

            for (i, param) in params.iter().enumerate() {
                if i > 0 {
                    out += ", ";
                }

                out += &format!(
                    "{} {}",
                    map_type(&param.type_name),
                    escape_reserved_name(&param.name)
                );
            }

            out += ")";

            if !return_type.is_empty() {
                out += &format!(" -> {}", map_type(return_type));
            }

            out += " {\n";

            for stmt in body {
                out += "\t\t";
                out += &super::statement::generate_statement(state, stmt);
                out += "\n";
            }

            out += "\t}";
            out
        }

        Node::StructLiteral {
            struct_name,
            field_values,
            ..
        } => emit_struct_literal(state, struct_name, field_values),

        // A bare or-expression in value position emits its inner
        // expression; the statement layer performs the real lowering.
        Node::OrExpr { expr, .. } => emit(state, expr),

        Node::DefaultExpr {
            expr, fallback, ..
        } => emit_default_expr(state, expr, fallback),

        // Statement forms are handled by generate_statement.
        other => {
            debug_assert!(false, "statement node in expression position: {other:?}");
            String::new()
        }
    }
}

/// The C++ spelling of a struct name: qualified names pick up their
/// namespace, using-aliased names resolve to their home module.
pub fn struct_cpp_name(state: &CodeGenState, name: &str) -> String {
    if let Some((module, type_name)) = name.split_once('.') {
        return format!("{}::{type_name}", remap_module(module));
    }

    if state
        .current_program
        .structs
        .iter()
        .any(|s| s.name == name)
        || state.current_program.errors.iter().any(|e| e.name == name)
    {
        return name.to_owned();
    }

    if let Some((module, member)) = state.using_alias(name) {
        return format!("{}::{member}", remap_module(module));
    }

    name.to_owned()
}

/// Default initializer for an omitted field, based on its declared type.
pub fn default_field_value(type_name: &str) -> &'static str {
    match type_name {
        "int" | "u32" | "u64" | "cint" => "0",
        "f32" | "f64" => "0.0",
        "bool" => "false",
        "str" => "\"\"",
        _ => "{}",
    }
}

fn emit_struct_literal(
    state: &mut CodeGenState,
    struct_name: &str,
    field_values: &[(String, Node)],
) -> String {
    let cpp_name = struct_cpp_name(state, struct_name);

    // Error literals construct a shared error value: the full constructor
    // takes (message, field..., cause) with the type name as message.
    if state.is_error_type(struct_name) {
        let mut args = vec![format!("\"{struct_name}\"")];

        if let Some(fields) = state.struct_fields(struct_name) {
            let fields = fields.to_vec();

            for field in &fields {
                let value = field_values
                    .iter()
                    .find(|(name, _)| *name == field.name)
                    .map(|(_, value)| emit(state, value))
                    .unwrap_or_else(|| default_field_value(&field.type_name).to_owned());
                args.push(value);
            }
        } else {
            for (_, value) in field_values {
                args.push(emit(state, value));
            }
        }

        return format!("std::make_shared<{cpp_name}>({})", args.join(", "));
    }

    // Plain structs use designated initializers in declaration order.
    let mut ordered: Vec<(String, String)> = vec![];

    match state.struct_fields(struct_name) {
        Some(fields) => {
            for field in fields {
                if let Some((name, value)) =
                    field_values.iter().find(|(name, _)| *name == field.name)
                {
                    let emitted = emit(state, value);
                    ordered.push((name.clone(), emitted));
                }
            }
        }
        None => {
            for (name, value) in field_values {
                let emitted = emit(state, value);
                ordered.push((name.clone(), emitted));
            }
        }
    }

    let inits: Vec<String> = ordered
        .iter()
        .map(|(name, value)| format!(".{} = {value}", escape_reserved_name(name)))
        .collect();

    format!("{cpp_name}{{{}}}", inits.join(", "))
}

/// Emits a function call with qualified-name handling, using-alias
/// resolution and extern `cstr` argument conversion.
pub fn emit_function_call(state: &mut CodeGenState, name: &str, args: &[Node]) -> String {
    // Extern functions take C strings; std::string arguments convert via
    // .c_str().
    let extern_params: Option<Vec<String>> = state
        .current_program
        .externs
        .iter()
        .find(|e| e.name == name)
        .map(|e| e.params.iter().map(|p| p.type_name.clone()).collect());

    let mut emitted: Vec<String> = vec![];

    for (i, arg) in args.iter().enumerate() {
        let code = emit(state, arg);

        let is_cstr_param = extern_params
            .as_ref()
            .and_then(|params| params.get(i))
            .is_some_and(|t| t == "cstr");

        if is_cstr_param {
            if matches!(arg, Node::StringLiteral { .. }) {
                emitted.push(format!("{code}.c_str()"));
            } else {
                emitted.push(format!("({code}).c_str()"));
            }
        } else {
            emitted.push(code);
        }
    }

    let func_name = if let Some((module, func)) = name.split_once('.') {
        format!("{}::{}", remap_module(module), escape_reserved_name(func))
    } else if state.is_local_callable(name) {
        escape_reserved_name(name)
    } else if let Some((module, member)) = state.using_alias(name) {
        format!("{}::{}", remap_module(module), escape_reserved_name(member))
    } else {
        escape_reserved_name(name)
    };

    format!("{func_name}({})", emitted.join(", "))
}
