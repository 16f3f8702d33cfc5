//! Bishop-to-C++ type mapping.
//!
//! One function maps the source's type strings to C++ type strings.
//! Primitives map directly; parametric containers map to their standard
//! adapters; `Channel<T>` maps to a reference type for parameters (channels
//! are non-copyable) and [`map_type_for_decl`] strips the reference for
//! locals; function types become `std::function`; qualified `m.T` becomes
//! the namespace-qualified form.

use crate::types::{
    extract_element_type, extract_map_types, parse_function_type_params,
    parse_function_type_return,
};

use super::names::remap_module;

pub fn map_type(t: &str) -> String {
    match t {
        "int" => return "int".into(),
        "str" => return "std::string".into(),
        "bool" => return "bool".into(),
        "char" => return "char".into(),
        "f32" => return "float".into(),
        "f64" => return "double".into(),
        "u32" => return "uint32_t".into(),
        "u64" => return "uint64_t".into(),
        "cint" => return "int".into(),
        "cstr" => return "const char*".into(),
        "void" | "" => return "void".into(),
        _ => {}
    }

    if let Some(element) = extract_element_type(t, "Channel<") {
        return format!("bishop::rt::Channel<{}>&", map_type(element));
    }

    if let Some(element) = extract_element_type(t, "List<") {
        return format!("std::vector<{}>", map_type(element));
    }

    if let Some((key, value)) = extract_map_types(t) {
        return format!(
            "std::unordered_map<{}, {}>",
            map_type(key),
            map_type(value)
        );
    }

    // MapItem only shows up as an iteration element; the generated struct
    // is anonymous, so declarations fall back to auto.
    if t.starts_with("MapItem<") {
        return "auto".into();
    }

    if let Some(element) = extract_element_type(t, "Pair<") {
        let cpp = map_type(element);
        return format!("std::pair<{cpp}, {cpp}>");
    }

    // Homogeneous tuples are emitted as vectors.
    if let Some(element) = extract_element_type(t, "Tuple<") {
        return format!("std::vector<{}>", map_type(element));
    }

    if let Some(element) = extract_element_type(t, "Deque<") {
        return format!("std::deque<{}>", map_type(element));
    }

    if let Some(element) = extract_element_type(t, "Stack<") {
        return format!("std::stack<{}>", map_type(element));
    }

    if let Some(element) = extract_element_type(t, "Queue<") {
        return format!("std::queue<{}>", map_type(element));
    }

    // Min/max behavior is selected at construction; the declared type is
    // the common base.
    if let Some(element) = extract_element_type(t, "PriorityQueue<") {
        return format!("bishop::PriorityQueueBase<{}>", map_type(element));
    }

    if let Some(element) = extract_element_type(t, "Set<") {
        return format!("std::unordered_set<{}>", map_type(element));
    }

    if t.starts_with("fn(") {
        let params = parse_function_type_params(t).unwrap_or_default();
        let ret = parse_function_type_return(t).unwrap_or_default();

        let cpp_params: Vec<String> = params.iter().map(|p| map_type(p)).collect();
        let cpp_ret = if ret.is_empty() {
            "void".to_owned()
        } else {
            map_type(&ret)
        };

        return format!("std::function<{cpp_ret}({})>", cpp_params.join(", "));
    }

    if let Some((module, type_name)) = t.split_once('.') {
        return format!("{}::{type_name}", remap_module(module));
    }

    t.to_owned()
}

/// Like [`map_type`] but usable in variable declarations: strips the
/// reference suffix from channel types.
pub fn map_type_for_decl(t: &str) -> String {
    let mapped = map_type(t);

    match mapped.strip_suffix('&') {
        Some(stripped) => stripped.to_owned(),
        None => mapped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_mapping() {
        assert_eq!(map_type("int"), "int");
        assert_eq!(map_type("str"), "std::string");
        assert_eq!(map_type("f32"), "float");
        assert_eq!(map_type("u64"), "uint64_t");
        assert_eq!(map_type("cstr"), "const char*");
        assert_eq!(map_type(""), "void");
    }

    #[test]
    fn test_container_mapping() {
        assert_eq!(map_type("List<int>"), "std::vector<int>");
        assert_eq!(
            map_type("Map<str, List<int>>"),
            "std::unordered_map<std::string, std::vector<int>>"
        );
        assert_eq!(map_type("Set<str>"), "std::unordered_set<std::string>");
        assert_eq!(map_type("Pair<int>"), "std::pair<int, int>");
        assert_eq!(map_type("Tuple<f64>"), "std::vector<double>");
        assert_eq!(map_type("Deque<int>"), "std::deque<int>");
        assert_eq!(
            map_type("PriorityQueue<int>"),
            "bishop::PriorityQueueBase<int>"
        );
    }

    #[test]
    fn test_channel_is_reference_for_params_only() {
        assert_eq!(map_type("Channel<int>"), "bishop::rt::Channel<int>&");
        assert_eq!(map_type_for_decl("Channel<int>"), "bishop::rt::Channel<int>");
    }

    #[test]
    fn test_function_type_mapping() {
        assert_eq!(
            map_type("fn(int, str) -> bool"),
            "std::function<bool(int, std::string)>"
        );
        assert_eq!(map_type("fn()"), "std::function<void()>");
    }

    #[test]
    fn test_qualified_type_mapping() {
        assert_eq!(map_type("net.TcpStream"), "net::TcpStream");
        assert_eq!(map_type("time.Instant"), "bishop_time::Instant");
    }

    #[test]
    fn test_user_type_passes_through() {
        assert_eq!(map_type("Person"), "Person");
        assert_eq!(map_type("Person*"), "Person*");
    }
}
