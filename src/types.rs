//! Shared type-string utilities.
//!
//! Bishop represents types as structured strings (`List<int>`,
//! `Map<str, List<int>>`, `fn(int) -> bool`, `net.TcpStream`, `Person*`).
//! Both the type checker and the code generator need bracket-depth-aware
//! scanning over these strings; the helpers live here so there is exactly one
//! implementation.

/// The inferred type of an expression or variable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeInfo {
    pub base_type: String,
    pub is_optional: bool,
    pub is_void: bool,
    pub is_fallible: bool,
    pub is_const: bool,
}

impl TypeInfo {
    pub fn of(base_type: impl Into<String>) -> Self {
        Self {
            base_type: base_type.into(),
            ..Self::default()
        }
    }

    pub fn void() -> Self {
        Self {
            base_type: "void".into(),
            is_void: true,
            ..Self::default()
        }
    }

    pub fn unknown() -> Self {
        Self::of("unknown")
    }

    pub fn optional(base_type: impl Into<String>) -> Self {
        Self {
            base_type: base_type.into(),
            is_optional: true,
            ..Self::default()
        }
    }

    pub fn fallible(mut self) -> Self {
        self.is_fallible = true;
        self
    }

    pub fn is_unknown(&self) -> bool {
        self.base_type == "unknown"
    }
}

/// Formats a type for error messages, including the optional marker.
pub fn format_type(info: &TypeInfo) -> String {
    if info.is_optional && info.base_type != "none" {
        format!("{}?", info.base_type)
    } else {
        info.base_type.clone()
    }
}

/// Extracts the element type from a generic type string using proper bracket
/// matching.
///
/// `extract_element_type("Pair<List<int>>", "Pair<")` returns `List<int>`;
/// a string that does not match the prefix (or is malformed) returns `None`.
pub fn extract_element_type<'a>(generic_type: &'a str, prefix: &str) -> Option<&'a str> {
    if !generic_type.starts_with(prefix) || !generic_type.ends_with('>') {
        return None;
    }

    let inner = &generic_type[prefix.len()..];
    let mut depth = 1usize;

    for (i, c) in inner.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => {
                depth -= 1;

                if depth == 0 {
                    return Some(&inner[..i]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Splits a two-parameter generic like `Map<str, List<int>>` into its key and
/// value types, honouring nesting. The prefix must include the opening
/// bracket (`"Map<"`, `"MapItem<"`).
pub fn extract_pair_types<'a>(generic_type: &'a str, prefix: &str) -> Option<(&'a str, &'a str)> {
    let inner = extract_element_type(generic_type, prefix)?;
    let mut depth = 0usize;

    for (i, c) in inner.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                let key = inner[..i].trim();
                let value = inner[i + 1..].trim();

                if key.is_empty() || value.is_empty() {
                    return None;
                }

                return Some((key, value));
            }
            _ => {}
        }
    }

    None
}

/// Splits the key and value types out of a `Map<K, V>` type string.
pub fn extract_map_types(map_type: &str) -> Option<(&str, &str)> {
    extract_pair_types(map_type, "Map<")
}

/// Parses the parameter types out of a function type string
/// `fn(type1, type2) -> return_type`. Returns `None` when the string is not
/// a function type.
pub fn parse_function_type_params(fn_type: &str) -> Option<Vec<String>> {
    let inner = fn_type.strip_prefix("fn(")?;
    let close = find_closing_paren(inner)?;
    let params_str = &inner[..close];

    let mut params = vec![];
    let mut depth = 0usize;
    let mut start = 0usize;

    for (i, c) in params_str.char_indices() {
        match c {
            '(' | '<' => depth += 1,
            ')' | '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                let param = params_str[start..i].trim();

                if !param.is_empty() {
                    params.push(param.to_owned());
                }

                start = i + 1;
            }
            _ => {}
        }
    }

    let last = params_str[start..].trim();

    if !last.is_empty() {
        params.push(last.to_owned());
    }

    Some(params)
}

/// Parses the return type out of a function type string. `None` means the
/// string is not a function type; a function type without an arrow is void.
pub fn parse_function_type_return(fn_type: &str) -> Option<String> {
    let inner = fn_type.strip_prefix("fn(")?;
    let close = find_closing_paren(inner)?;

    match inner[close..].find(" -> ") {
        Some(pos) => Some(inner[close + pos + 4..].trim().to_owned()),
        None => Some(String::new()),
    }
}

fn find_closing_paren(s: &str) -> Option<usize> {
    let mut depth = 1usize;

    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;

                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_element_type() {
        assert_eq!(extract_element_type("List<int>", "List<"), Some("int"));
        assert_eq!(
            extract_element_type("Pair<List<int>>", "Pair<"),
            Some("List<int>")
        );
        assert_eq!(
            extract_element_type("Channel<Pair<str>>", "Channel<"),
            Some("Pair<str>")
        );
        assert_eq!(extract_element_type("List<int>", "Set<"), None);
        assert_eq!(extract_element_type("List<int", "List<"), None);
    }

    #[test]
    fn test_extract_map_types() {
        assert_eq!(extract_map_types("Map<str, int>"), Some(("str", "int")));
        assert_eq!(
            extract_map_types("Map<str, List<int>>"),
            Some(("str", "List<int>"))
        );
        assert_eq!(
            extract_map_types("Map<Pair<int>, Map<str, int>>"),
            Some(("Pair<int>", "Map<str, int>"))
        );
        assert_eq!(extract_map_types("Map<str>"), None);
        assert_eq!(extract_map_types("List<int>"), None);
    }

    #[test]
    fn test_parse_function_type_params() {
        assert_eq!(
            parse_function_type_params("fn(int, str) -> bool"),
            Some(vec!["int".to_owned(), "str".to_owned()])
        );
        assert_eq!(parse_function_type_params("fn()"), Some(vec![]));
        assert_eq!(
            parse_function_type_params("fn(fn(int) -> int, int) -> int"),
            Some(vec!["fn(int) -> int".to_owned(), "int".to_owned()])
        );
        assert_eq!(parse_function_type_params("List<int>"), None);
    }

    #[test]
    fn test_parse_function_type_return() {
        assert_eq!(
            parse_function_type_return("fn(int) -> bool"),
            Some("bool".to_owned())
        );
        assert_eq!(parse_function_type_return("fn(int)"), Some(String::new()));
        assert_eq!(
            parse_function_type_return("fn(fn(int) -> int) -> List<str>"),
            Some("List<str>".to_owned())
        );
    }

    #[test]
    fn test_format_type() {
        assert_eq!(format_type(&TypeInfo::of("int")), "int");
        assert_eq!(format_type(&TypeInfo::optional("str")), "str?");
        assert_eq!(format_type(&TypeInfo::optional("none")), "none");
    }
}
