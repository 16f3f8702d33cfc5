//! Method call emission.
//!
//! Dispatches on the receiver type the checker annotated: each container
//! kind and the str/char primitives get a dedicated rewrite; user structs
//! default to `receiver.method(args)` with static methods routed through
//! `Type::method(args)` and pointer receivers through arrow access.

use crate::parser::ast::Node;

use super::{
    expression::{emit, struct_cpp_name},
    names::escape_reserved_name,
    strings::{emit_char_method_call, emit_str_method_call},
    CodeGenState,
};

pub fn emit_method_call(state: &mut CodeGenState, node: &Node) -> String {
    let Node::MethodCall {
        id,
        object,
        method,
        args,
        ..
    } = node
    else {
        unreachable!("emit_method_call takes a MethodCall node");
    };

    let args: Vec<String> = args.iter().map(|a| emit(state, a)).collect();
    let receiver = state.receiver_type(*id).to_owned();

    // Static calls: TypeName.method(...) and self.static_method(...).
    if let Node::VariableRef { name, .. } = &**object {
        if name == "self" {
            let current_struct = state.current_struct.clone();

            if !current_struct.is_empty() && state.is_static_method(&current_struct, method) {
                return format!(
                    "{current_struct}::{}({})",
                    escape_reserved_name(method),
                    args.join(", ")
                );
            }

            return format!("this->{}({})", escape_reserved_name(method), args.join(", "));
        }

    }

    // Static dispatch: the annotation equals the written type name and the
    // resolved method is @static (covers local, qualified and aliased
    // struct names).
    if receiver == receiver_as_type_name(object)
        && state.is_static_method_resolved(&receiver, method)
    {
        return format!(
            "{}::{}({})",
            struct_cpp_name(state, &receiver),
            escape_reserved_name(method),
            args.join(", ")
        );
    }

    let obj_str = emit(state, object);

    // Channel operations call straight into the runtime channel.
    if receiver.starts_with("Channel<") {
        return match method.as_str() {
            "send" => format!("{obj_str}.send({})", args.first().cloned().unwrap_or_default()),
            "recv" => format!("{obj_str}.recv()"),
            other => format!("{obj_str}.{other}()"),
        };
    }

    if receiver.trim_end_matches('*').starts_with("List<") {
        return emit_list_method(&obj_str, method, &args);
    }

    if receiver.trim_end_matches('*').starts_with("Map<") {
        return emit_map_method(&obj_str, method, &args);
    }

    if receiver.trim_end_matches('*').starts_with("Set<") {
        return emit_set_method(&obj_str, method, &args);
    }

    if receiver.trim_end_matches('*').starts_with("Pair<") {
        return emit_pair_method(&obj_str, method, &args);
    }

    if receiver.trim_end_matches('*').starts_with("Tuple<") {
        return emit_tuple_method(&obj_str, method, &args);
    }

    if receiver.trim_end_matches('*').starts_with("Deque<") {
        return emit_deque_method(&obj_str, method, &args);
    }

    if receiver.trim_end_matches('*').starts_with("Stack<") {
        return emit_stack_method(&obj_str, method, &args);
    }

    if receiver.trim_end_matches('*').starts_with("Queue<") {
        return emit_queue_method(&obj_str, method, &args);
    }

    if receiver.trim_end_matches('*').starts_with("PriorityQueue<") {
        return emit_priority_queue_method(&obj_str, method, &args);
    }

    if receiver == "str" {
        // at() yields a char; wrap it back into the string type.
        if method == "at" {
            return format!("std::string(1, {obj_str}.at({}))", args[0]);
        }

        if let Some(rewritten) = emit_str_method_call(method, &obj_str, &args) {
            return rewritten;
        }

        return format!("{obj_str}.{method}({})", args.join(", "));
    }

    if receiver == "char" {
        if let Some(rewritten) = emit_char_method_call(method, &obj_str) {
            return rewritten;
        }
    }

    // Pointer receivers auto-dereference with arrow access.
    if receiver.ends_with('*') {
        return format!(
            "{obj_str}->{}({})",
            escape_reserved_name(method),
            args.join(", ")
        );
    }

    format!(
        "{obj_str}.{}({})",
        escape_reserved_name(method),
        args.join(", ")
    )
}

/// The receiver annotation for a static call equals the written type name
/// (`Counter.zero()` annotates `Counter`); for instance calls it is the
/// value's type. Used to distinguish the two when the object is a name.
fn receiver_as_type_name(object: &Node) -> &str {
    match object {
        Node::VariableRef { name, .. } => name,
        _ => "",
    }
}

fn emit_list_method(obj_str: &str, method: &str, args: &[String]) -> String {
    match method {
        "length" => format!("{obj_str}.size()"),
        "is_empty" => format!("{obj_str}.empty()"),
        "append" => format!("{obj_str}.push_back({})", args[0]),
        "pop" => format!("{obj_str}.pop_back()"),
        "get" => format!("{obj_str}.at({})", args[0]),
        "set" => format!("{obj_str}[{}] = {}", args[0], args[1]),
        "clear" => format!("{obj_str}.clear()"),
        "first" => format!("{obj_str}.front()"),
        "last" => format!("{obj_str}.back()"),
        "insert" => format!(
            "{obj_str}.insert({obj_str}.begin() + {}, {})",
            args[0], args[1]
        ),
        "remove" => format!("{obj_str}.erase({obj_str}.begin() + {})", args[0]),
        "contains" => format!(
            "(std::find({obj_str}.begin(), {obj_str}.end(), {}) != {obj_str}.end())",
            args[0]
        ),
        other => format!("{obj_str}.{other}({})", args.join(", ")),
    }
}

fn emit_map_method(obj_str: &str, method: &str, args: &[String]) -> String {
    match method {
        "length" => format!("{obj_str}.size()"),
        "is_empty" => format!("{obj_str}.empty()"),
        "contains" => format!("({obj_str}.find({}) != {obj_str}.end())", args[0]),
        "get" => format!(
            "[](const auto& m, const auto& key) -> std::optional<std::decay_t<decltype(m.begin()->second)>> {{ auto it = m.find(key); if (it != m.end()) return it->second; return std::nullopt; }}({obj_str}, {})",
            args[0]
        ),
        "set" => format!("{obj_str}[{}] = {}", args[0], args[1]),
        "remove" => format!("{obj_str}.erase({})", args[0]),
        "clear" => format!("{obj_str}.clear()"),
        "keys" => format!(
            "[](const auto& m) {{ std::vector<std::decay_t<decltype(m.begin()->first)>> keys; keys.reserve(m.size()); for (const auto& [k, v] : m) keys.push_back(k); return keys; }}({obj_str})"
        ),
        "values" => format!(
            "[](const auto& m) {{ std::vector<std::decay_t<decltype(m.begin()->second)>> values; values.reserve(m.size()); for (const auto& [k, v] : m) values.push_back(v); return values; }}({obj_str})"
        ),
        "items" => format!(
            "[](const auto& m) {{ struct MapItem {{ std::decay_t<decltype(m.begin()->first)> key; std::decay_t<decltype(m.begin()->second)> value; }}; std::vector<MapItem> items; items.reserve(m.size()); for (const auto& [k, v] : m) items.push_back({{k, v}}); return items; }}({obj_str})"
        ),
        other => format!("{obj_str}.{other}({})", args.join(", ")),
    }
}

fn emit_set_method(obj_str: &str, method: &str, args: &[String]) -> String {
    match method {
        "length" => format!("{obj_str}.size()"),
        "is_empty" => format!("{obj_str}.empty()"),
        "contains" => format!("{obj_str}.count({}) > 0", args[0]),
        "add" => format!("{obj_str}.insert({})", args[0]),
        "remove" => format!("{obj_str}.erase({}) > 0", args[0]),
        "clear" => format!("{obj_str}.clear()"),
        "union" => format!(
            "[&]() {{ auto result = {obj_str}; for (const auto& e : {}) result.insert(e); return result; }}()",
            args[0]
        ),
        "intersection" => format!(
            "[&]() {{ std::remove_cvref_t<decltype({obj_str})> result; for (const auto& e : {obj_str}) if ({}.count(e)) result.insert(e); return result; }}()",
            args[0]
        ),
        "difference" => format!(
            "[&]() {{ std::remove_cvref_t<decltype({obj_str})> result; for (const auto& e : {obj_str}) if (!{}.count(e)) result.insert(e); return result; }}()",
            args[0]
        ),
        "symmetric_difference" => format!(
            "[&]() {{ std::remove_cvref_t<decltype({obj_str})> result; for (const auto& e : {obj_str}) if (!{arg}.count(e)) result.insert(e); for (const auto& e : {arg}) if (!{obj_str}.count(e)) result.insert(e); return result; }}()",
            arg = args[0]
        ),
        "is_subset" => format!(
            "[&]() {{ for (const auto& e : {obj_str}) if (!{}.count(e)) return false; return true; }}()",
            args[0]
        ),
        "is_superset" => format!(
            "[&]() {{ for (const auto& e : {}) if (!{obj_str}.count(e)) return false; return true; }}()",
            args[0]
        ),
        other => format!("{obj_str}.{other}({})", args.join(", ")),
    }
}

fn emit_pair_method(obj_str: &str, method: &str, args: &[String]) -> String {
    match method {
        // Used under `default`; the wrapper handles out-of-bounds.
        "get" => format!(
            "(({}) == 0 ? {obj_str}.first : {obj_str}.second)",
            args[0]
        ),
        other => format!("{obj_str}.{other}({})", args.join(", ")),
    }
}

fn emit_tuple_method(obj_str: &str, method: &str, args: &[String]) -> String {
    match method {
        "get" => format!(
            "(static_cast<size_t>({idx}) < {obj_str}.size() && {idx} >= 0 ? {obj_str}[{idx}] : {obj_str}[0])",
            idx = args[0]
        ),
        other => format!("{obj_str}.{other}({})", args.join(", ")),
    }
}

fn emit_deque_method(obj_str: &str, method: &str, args: &[String]) -> String {
    match method {
        "length" => format!("{obj_str}.size()"),
        "is_empty" => format!("{obj_str}.empty()"),
        "push_front" => format!("{obj_str}.push_front({})", args[0]),
        "push_back" => format!("{obj_str}.push_back({})", args[0]),
        "pop_front" => format!(
            "[](auto& d) {{ auto tmp = d.front(); d.pop_front(); return tmp; }}({obj_str})"
        ),
        "pop_back" => format!(
            "[](auto& d) {{ auto tmp = d.back(); d.pop_back(); return tmp; }}({obj_str})"
        ),
        "front" => format!("{obj_str}.front()"),
        "back" => format!("{obj_str}.back()"),
        "get" => format!("{obj_str}.at({})", args[0]),
        "clear" => format!("{obj_str}.clear()"),
        other => format!("{obj_str}.{other}({})", args.join(", ")),
    }
}

fn emit_stack_method(obj_str: &str, method: &str, args: &[String]) -> String {
    match method {
        "length" => format!("{obj_str}.size()"),
        "is_empty" => format!("{obj_str}.empty()"),
        "push" => format!("{obj_str}.push({})", args[0]),
        "pop" => format!("[](auto& s) {{ auto tmp = s.top(); s.pop(); return tmp; }}({obj_str})"),
        "top" => format!("{obj_str}.top()"),
        other => format!("{obj_str}.{other}({})", args.join(", ")),
    }
}

fn emit_queue_method(obj_str: &str, method: &str, args: &[String]) -> String {
    match method {
        "length" => format!("{obj_str}.size()"),
        "is_empty" => format!("{obj_str}.empty()"),
        "push" => format!("{obj_str}.push({})", args[0]),
        "pop" => format!(
            "[](auto& q) {{ auto tmp = q.front(); q.pop(); return tmp; }}({obj_str})"
        ),
        "front" => format!("{obj_str}.front()"),
        "back" => format!("{obj_str}.back()"),
        other => format!("{obj_str}.{other}({})", args.join(", ")),
    }
}

fn emit_priority_queue_method(obj_str: &str, method: &str, args: &[String]) -> String {
    match method {
        "length" => format!("{obj_str}.size()"),
        "is_empty" => format!("{obj_str}.empty()"),
        "push" => format!("{obj_str}.push({})", args[0]),
        "pop" => format!("{obj_str}.pop()"),
        "top" => format!("{obj_str}.top()"),
        other => format!("{obj_str}.{other}({})", args.join(", ")),
    }
}
