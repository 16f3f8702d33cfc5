//! Module objects and import resolution.
//!
//! A [`Module`] wraps a parsed [`Program`] together with precomputed indices
//! over its public surface. The public-surface queries are hot paths during
//! checking and emission, so they are computed once at construction.
//!
//! The standard-library module factories themselves live outside this crate;
//! [`stdlib`] only knows the built-in module names and the runtime include
//! each one contributes to the generated C++.

pub mod stdlib;

use std::collections::HashMap;

use log::debug;

use crate::parser::ast::{
    ErrorDef, ExternFunctionDef, FunctionDef, MethodDef, Node, Program, StructDef, Visibility,
};

/// A resolved module: its parsed program plus cached public-surface indices.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub name: String,
    pub program: Program,

    public_functions: Vec<usize>,
    public_structs: Vec<usize>,
    public_errors: Vec<usize>,
    public_externs: Vec<usize>,
    public_methods: HashMap<String, Vec<usize>>,
}

impl Module {
    pub fn new(name: impl Into<String>, program: Program) -> Self {
        let name = name.into();
        debug!("caching public surface for module '{name}'");

        let public_functions = program
            .functions
            .iter()
            .enumerate()
            .filter(|(_, f)| f.visibility == Visibility::Public)
            .map(|(i, _)| i)
            .collect();

        let public_structs = program
            .structs
            .iter()
            .enumerate()
            .filter(|(_, s)| s.visibility == Visibility::Public)
            .map(|(i, _)| i)
            .collect();

        let public_errors = program
            .errors
            .iter()
            .enumerate()
            .filter(|(_, e)| e.visibility == Visibility::Public)
            .map(|(i, _)| i)
            .collect();

        let public_externs = program
            .externs
            .iter()
            .enumerate()
            .filter(|(_, e)| e.visibility == Visibility::Public)
            .map(|(i, _)| i)
            .collect();

        let mut public_methods: HashMap<String, Vec<usize>> = HashMap::new();

        for (i, m) in program.methods.iter().enumerate() {
            if m.visibility == Visibility::Public {
                public_methods
                    .entry(m.struct_name.clone())
                    .or_default()
                    .push(i);
            }
        }

        Self {
            name,
            program,
            public_functions,
            public_structs,
            public_errors,
            public_externs,
            public_methods,
        }
    }

    pub fn public_functions(&self) -> impl Iterator<Item = &FunctionDef> {
        self.public_functions
            .iter()
            .map(|&i| &self.program.functions[i])
    }

    pub fn public_structs(&self) -> impl Iterator<Item = &StructDef> {
        self.public_structs
            .iter()
            .map(|&i| &self.program.structs[i])
    }

    pub fn public_errors(&self) -> impl Iterator<Item = &ErrorDef> {
        self.public_errors.iter().map(|&i| &self.program.errors[i])
    }

    pub fn public_externs(&self) -> impl Iterator<Item = &ExternFunctionDef> {
        self.public_externs
            .iter()
            .map(|&i| &self.program.externs[i])
    }

    pub fn public_methods(&self, struct_name: &str) -> impl Iterator<Item = &MethodDef> {
        self.public_methods
            .get(struct_name)
            .into_iter()
            .flatten()
            .map(|&i| &self.program.methods[i])
    }

    /// Module-level constants are part of the public surface.
    pub fn constants(&self) -> &[Node] {
        &self.program.constants
    }
}

/// All modules available to a compile, keyed by import alias.
pub type ModuleMap = HashMap<String, Module>;

/// Maps a program's imports onto the available modules. Returns the
/// alias-to-module map used by the checker and emitter, and the list of
/// import paths that could not be resolved (the driver decides how loud to
/// be about those).
pub fn resolve<'a>(
    program: &Program,
    available: &'a ModuleMap,
) -> (HashMap<String, &'a Module>, Vec<String>) {
    let mut resolved = HashMap::new();
    let mut missing = vec![];

    for import in &program.imports {
        let module = available
            .get(&import.alias)
            .or_else(|| available.get(&import.module_path));

        match module {
            Some(module) => {
                debug!("resolved import '{}' as '{}'", import.module_path, import.alias);
                resolved.insert(import.alias.clone(), module);
            }
            None => missing.push(import.module_path.clone()),
        }
    }

    (resolved, missing)
}

#[cfg(test)]
mod tests {
    use crate::lexer::Lexer;
    use crate::parser;

    use super::Module;

    fn module(src: &str) -> Module {
        let program = parser::parse(Lexer::new(src).lex()).expect("module source should parse");
        Module::new("m", program)
    }

    #[test]
    fn test_private_declarations_are_not_exposed() {
        let m = module(
            r#"
            pub fn visible() { }
            fn hidden() { }

            pub Point :: struct { x int }
            Secret :: struct { y int }
            "#,
        );

        let functions: Vec<_> = m.public_functions().map(|f| f.name.as_str()).collect();
        assert_eq!(functions, vec!["visible"]);

        let structs: Vec<_> = m.public_structs().map(|s| s.name.as_str()).collect();
        assert_eq!(structs, vec!["Point"]);
    }

    #[test]
    fn test_public_methods_grouped_by_struct() {
        let m = module(
            r#"
            pub Point :: struct { x int }

            pub Point :: norm(self) -> int { return self.x; }
            Point :: hidden(self) -> int { return 0; }
            "#,
        );

        let methods: Vec<_> = m.public_methods("Point").map(|m| m.name.as_str()).collect();
        assert_eq!(methods, vec!["norm"]);
        assert_eq!(m.public_methods("Other").count(), 0);
    }
}
