//! Identifier utilities for the C++ emitter.
//!
//! Bishop users can use any valid Bishop identifier without worrying about
//! C++ keyword conflicts: colliding names get a trailing underscore appended
//! at emission time only. The AST keeps the original names.

use std::collections::HashSet;

use once_cell::sync::Lazy;

static CPP_RESERVED_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "int", "float", "double", "bool", "char", "void", "long", "short",
        "signed", "unsigned", "const", "volatile", "static", "extern",
        "class", "struct", "union", "enum", "template", "typename",
        "namespace", "using", "operator", "new", "delete", "this",
        "if", "else", "switch", "case", "default", "while", "do", "for",
        "break", "continue", "return", "goto", "try", "catch", "throw",
        "true", "false", "nullptr", "auto", "register", "inline", "virtual",
        "explicit", "friend", "mutable", "public", "private", "protected",
        "sizeof", "typedef", "export", "asm", "alignas", "alignof",
        "decltype", "noexcept", "static_assert", "thread_local", "constexpr",
        "consteval", "constinit", "concept", "requires",
        "co_await", "co_return", "co_yield",
    ])
});

/// Appends exactly one underscore to identifiers that collide with a C++
/// reserved keyword.
pub fn escape_reserved_name(name: &str) -> String {
    if CPP_RESERVED_KEYWORDS.contains(name) {
        return format!("{name}_");
    }

    name.to_owned()
}

/// Remaps module names that collide with C/C++ standard identifiers to a
/// non-colliding namespace name.
pub fn remap_module(name: &str) -> &str {
    match name {
        "time" => "bishop_time",
        "log" => "bishop_log",
        "random" => "bishop_random",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_names_get_one_underscore() {
        assert_eq!(escape_reserved_name("default"), "default_");
        assert_eq!(escape_reserved_name("class"), "class_");
        assert_eq!(escape_reserved_name("operator"), "operator_");
    }

    #[test]
    fn test_ordinary_names_untouched() {
        assert_eq!(escape_reserved_name("value"), "value");
        assert_eq!(escape_reserved_name("default_"), "default_");
    }

    #[test]
    fn test_module_remaps() {
        assert_eq!(remap_module("time"), "bishop_time");
        assert_eq!(remap_module("log"), "bishop_log");
        assert_eq!(remap_module("random"), "bishop_random");
        assert_eq!(remap_module("http"), "http");
    }
}
