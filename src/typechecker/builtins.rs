//! Built-in method signature tables.
//!
//! These tables are the single source of truth for the methods of the
//! built-in containers, the `str` primitive and the `char` primitive. The
//! placeholders `T`, `K` and `V` stand for the container's actual type
//! parameters and are substituted at check time.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Parameter and return type schema of a built-in method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSig {
    pub params: &'static [&'static str],
    pub ret: &'static str,
}

macro_rules! sig {
    ($params:expr, $ret:expr) => {
        MethodSig {
            params: &$params,
            ret: $ret,
        }
    };
}

pub static LIST_METHODS: Lazy<HashMap<&'static str, MethodSig>> = Lazy::new(|| {
    HashMap::from([
        ("length", sig!([], "int")),
        ("is_empty", sig!([], "bool")),
        ("append", sig!(["T"], "void")),
        ("pop", sig!([], "void")),
        ("get", sig!(["int"], "T")),
        ("set", sig!(["int", "T"], "void")),
        ("clear", sig!([], "void")),
        ("first", sig!([], "T")),
        ("last", sig!([], "T")),
        ("insert", sig!(["int", "T"], "void")),
        ("remove", sig!(["int"], "void")),
        ("contains", sig!(["T"], "bool")),
    ])
});

pub static MAP_METHODS: Lazy<HashMap<&'static str, MethodSig>> = Lazy::new(|| {
    HashMap::from([
        ("length", sig!([], "int")),
        ("is_empty", sig!([], "bool")),
        ("contains", sig!(["K"], "bool")),
        ("get", sig!(["K"], "V?")),
        ("set", sig!(["K", "V"], "void")),
        ("remove", sig!(["K"], "void")),
        ("clear", sig!([], "void")),
        ("keys", sig!([], "List<K>")),
        ("values", sig!([], "List<V>")),
        ("items", sig!([], "List<MapItem<K, V>>")),
    ])
});

pub static SET_METHODS: Lazy<HashMap<&'static str, MethodSig>> = Lazy::new(|| {
    HashMap::from([
        ("length", sig!([], "int")),
        ("is_empty", sig!([], "bool")),
        ("contains", sig!(["T"], "bool")),
        ("add", sig!(["T"], "void")),
        ("remove", sig!(["T"], "bool")),
        ("clear", sig!([], "void")),
        ("union", sig!(["Set<T>"], "Set<T>")),
        ("intersection", sig!(["Set<T>"], "Set<T>")),
        ("difference", sig!(["Set<T>"], "Set<T>")),
        ("symmetric_difference", sig!(["Set<T>"], "Set<T>")),
        ("is_subset", sig!(["Set<T>"], "bool")),
        ("is_superset", sig!(["Set<T>"], "bool")),
    ])
});

pub static PAIR_METHODS: Lazy<HashMap<&'static str, MethodSig>> =
    Lazy::new(|| HashMap::from([("get", sig!(["int"], "T"))]));

pub static TUPLE_METHODS: Lazy<HashMap<&'static str, MethodSig>> =
    Lazy::new(|| HashMap::from([("get", sig!(["int"], "T"))]));

pub static DEQUE_METHODS: Lazy<HashMap<&'static str, MethodSig>> = Lazy::new(|| {
    HashMap::from([
        ("length", sig!([], "int")),
        ("is_empty", sig!([], "bool")),
        ("push_front", sig!(["T"], "void")),
        ("push_back", sig!(["T"], "void")),
        ("pop_front", sig!([], "T")),
        ("pop_back", sig!([], "T")),
        ("front", sig!([], "T")),
        ("back", sig!([], "T")),
        ("get", sig!(["int"], "T")),
        ("clear", sig!([], "void")),
    ])
});

pub static STACK_METHODS: Lazy<HashMap<&'static str, MethodSig>> = Lazy::new(|| {
    HashMap::from([
        ("length", sig!([], "int")),
        ("is_empty", sig!([], "bool")),
        ("push", sig!(["T"], "void")),
        ("pop", sig!([], "T")),
        ("top", sig!([], "T")),
    ])
});

pub static QUEUE_METHODS: Lazy<HashMap<&'static str, MethodSig>> = Lazy::new(|| {
    HashMap::from([
        ("push", sig!(["T"], "void")),
        ("pop", sig!([], "T")),
        ("front", sig!([], "T")),
        ("back", sig!([], "T")),
        ("length", sig!([], "int")),
        ("is_empty", sig!([], "bool")),
    ])
});

pub static PRIORITY_QUEUE_METHODS: Lazy<HashMap<&'static str, MethodSig>> = Lazy::new(|| {
    HashMap::from([
        ("length", sig!([], "int")),
        ("is_empty", sig!([], "bool")),
        ("top", sig!([], "T")),
        ("push", sig!(["T"], "void")),
        ("pop", sig!([], "T")),
    ])
});

pub static STR_METHODS: Lazy<HashMap<&'static str, MethodSig>> = Lazy::new(|| {
    HashMap::from([
        ("length", sig!([], "int")),
        ("empty", sig!([], "bool")),
        ("contains", sig!(["str"], "bool")),
        ("starts_with", sig!(["str"], "bool")),
        ("ends_with", sig!(["str"], "bool")),
        ("find", sig!(["str"], "int")),
        ("substr", sig!(["int", "int"], "str")),
        ("at", sig!(["int"], "char")),
        ("upper", sig!([], "str")),
        ("lower", sig!([], "str")),
        ("capitalize", sig!([], "str")),
        ("title", sig!([], "str")),
        ("trim", sig!([], "str")),
        ("trim_left", sig!([], "str")),
        ("trim_right", sig!([], "str")),
        ("replace", sig!(["str", "str"], "str")),
        ("replace_all", sig!(["str", "str"], "str")),
        ("reverse", sig!([], "str")),
        ("repeat", sig!(["int"], "str")),
        ("split", sig!(["str"], "List<str>")),
        ("split_lines", sig!([], "List<str>")),
        // The padding trio tolerates an optional second fill argument;
        // the checker special-cases the arity.
        ("pad_left", sig!(["int"], "str")),
        ("pad_right", sig!(["int"], "str")),
        ("center", sig!(["int"], "str")),
        ("to_int", sig!([], "int")),
        ("to_float", sig!([], "f64")),
    ])
});

pub static CHAR_METHODS: Lazy<HashMap<&'static str, MethodSig>> = Lazy::new(|| {
    HashMap::from([
        ("is_alpha", sig!([], "bool")),
        ("is_digit", sig!([], "bool")),
        ("is_whitespace", sig!([], "bool")),
        ("is_upper", sig!([], "bool")),
        ("is_lower", sig!([], "bool")),
        ("to_upper", sig!([], "char")),
        ("to_lower", sig!([], "char")),
    ])
});

/// Substitutes the `T`/`K`/`V` placeholders of a schema type with the
/// container's actual parameters.
pub fn substitute(schema: &str, element: &str, key: Option<&str>, value: Option<&str>) -> String {
    match schema {
        "T" => element.to_owned(),
        "K" => key.unwrap_or(element).to_owned(),
        "V" => value.unwrap_or(element).to_owned(),
        "V?" => value.unwrap_or(element).to_owned(),
        "Set<T>" => format!("Set<{element}>"),
        "List<K>" => format!("List<{}>", key.unwrap_or(element)),
        "List<V>" => format!("List<{}>", value.unwrap_or(element)),
        "List<MapItem<K, V>>" => format!(
            "List<MapItem<{}, {}>>",
            key.unwrap_or(element),
            value.unwrap_or(element)
        ),
        other => other.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_append_schema() {
        let sig = LIST_METHODS.get("append").expect("append exists");
        assert_eq!(sig.params, ["T"]);
        assert_eq!(sig.ret, "void");
    }

    #[test]
    fn test_map_get_returns_optional_value() {
        let sig = MAP_METHODS.get("get").expect("get exists");
        assert_eq!(sig.ret, "V?");
    }

    #[test]
    fn test_substitute_placeholders() {
        assert_eq!(substitute("T", "int", None, None), "int");
        assert_eq!(substitute("Set<T>", "str", None, None), "Set<str>");
        assert_eq!(
            substitute("List<MapItem<K, V>>", "", Some("str"), Some("int")),
            "List<MapItem<str, int>>"
        );
        assert_eq!(substitute("bool", "int", None, None), "bool");
    }

    #[test]
    fn test_unknown_method_is_absent() {
        assert!(LIST_METHODS.get("shuffle").is_none());
        assert!(STR_METHODS.get("explode").is_none());
    }
}
