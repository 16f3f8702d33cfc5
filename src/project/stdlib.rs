//! Built-in standard-library module registry.
//!
//! The AST factories for these modules live outside this crate; each one
//! hands the driver a ready-made [`super::Module`]. What the compiler itself
//! needs to know is limited to which module names are built in and which
//! runtime include line each contributes to the generated C++.

/// Names of the built-in standard-library modules.
pub const BUILTIN_MODULES: &[&str] = &[
    "crypto", "fs", "http", "net", "process", "regex", "time", "math", "random", "json", "yaml",
    "markdown", "log", "sync", "algo",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_MODULES.contains(&name)
}

/// The runtime include a built-in module contributes to the preamble.
/// `http` and `net` supersede the base runtime header (they include it
/// themselves); everything else is additive.
pub fn runtime_include(name: &str) -> Option<&'static str> {
    match name {
        "crypto" => Some("#include <bishop/crypto.hpp>"),
        "fs" => Some("#include <bishop/fs.hpp>"),
        "http" => Some("#include <bishop/http.hpp>"),
        "net" => Some("#include <bishop/net.hpp>"),
        "process" => Some("#include <bishop/process.hpp>"),
        "regex" => Some("#include <bishop/regex.hpp>"),
        "time" => Some("#include <bishop/time.hpp>"),
        "math" => Some("#include <bishop/math.hpp>"),
        "random" => Some("#include <bishop/random.hpp>"),
        "json" => Some("#include <bishop/json.hpp>"),
        "yaml" => Some("#include <bishop/yaml.hpp>"),
        "markdown" => Some("#include <bishop/markdown.hpp>"),
        "log" => Some("#include <bishop/log.hpp>"),
        "sync" => Some("#include <bishop/sync.hpp>"),
        "algo" => Some("#include <bishop/algo.hpp>"),
        _ => None,
    }
}

/// Whether a built-in module's include replaces the base `std.hpp` include
/// instead of being emitted alongside it.
pub fn replaces_base_include(name: &str) -> bool {
    matches!(name, "http" | "net")
}
