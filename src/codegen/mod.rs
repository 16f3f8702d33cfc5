//! C++ code generation for Bishop.
//!
//! One pass over the type-checked AST producing target text. The emitter
//! assumes checking succeeded: it reads the receiver-type annotations the
//! checker produced and does not report user errors; internal invariants are
//! enforced with assertions.

mod expression;
mod function;
mod method_call;
mod names;
mod or_expr;
mod statement;
mod strings;
mod types;

pub use names::escape_reserved_name;
pub use types::{map_type, map_type_for_decl};

use std::collections::HashMap;

use log::debug;

use crate::{
    parser::ast::{Node, NodeId, Program, StructField, UsingStmt},
    project::{stdlib, Module},
    typechecker::Annotations,
};

use self::function::{
    generate_error, generate_extern_declarations, generate_function, generate_module_constant,
    generate_struct, generate_test_harness, uses_channels,
};

/// A using alias as the emitter needs it: local name to qualified member.
#[derive(Debug, Clone)]
struct UsingAliasEntry {
    local_name: String,
    module_alias: String,
    member_name: String,
}

/// Code generator state, passed explicitly through every emission function.
pub struct CodeGenState<'a> {
    current_program: &'a Program,
    modules: &'a HashMap<String, &'a Module>,
    annotations: &'a Annotations,
    test_mode: bool,
    in_fallible_function: bool,
    current_struct: String,
    using_aliases: Vec<UsingAliasEntry>,
    temp_counter: u32,
}

impl<'a> CodeGenState<'a> {
    fn new(
        program: &'a Program,
        modules: &'a HashMap<String, &'a Module>,
        annotations: &'a Annotations,
        test_mode: bool,
    ) -> Self {
        let mut state = Self {
            current_program: program,
            modules,
            annotations,
            test_mode,
            in_fallible_function: false,
            current_struct: String::new(),
            using_aliases: vec![],
            temp_counter: 0,
        };

        state.collect_using_aliases(&program.usings);
        state
    }

    /// Expands the program's using statements into local-name aliases; for
    /// wildcards the whole public surface is aliased.
    fn collect_using_aliases(&mut self, usings: &[UsingStmt]) {
        for using in usings {
            if using.is_wildcard {
                let module_alias = &using.wildcard_module;

                let Some(module) = self.modules.get(module_alias.as_str()) else {
                    continue;
                };

                for func in module.public_functions() {
                    self.using_aliases.push(UsingAliasEntry {
                        local_name: func.name.clone(),
                        module_alias: module_alias.clone(),
                        member_name: func.name.clone(),
                    });
                }

                for s in module.public_structs() {
                    self.using_aliases.push(UsingAliasEntry {
                        local_name: s.name.clone(),
                        module_alias: module_alias.clone(),
                        member_name: s.name.clone(),
                    });
                }

                for e in module.public_errors() {
                    self.using_aliases.push(UsingAliasEntry {
                        local_name: e.name.clone(),
                        module_alias: module_alias.clone(),
                        member_name: e.name.clone(),
                    });
                }

                for c in module.constants() {
                    if let Node::VariableDecl { name, .. } = c {
                        self.using_aliases.push(UsingAliasEntry {
                            local_name: name.clone(),
                            module_alias: module_alias.clone(),
                            member_name: name.clone(),
                        });
                    }
                }

                for e in module.public_externs() {
                    self.using_aliases.push(UsingAliasEntry {
                        local_name: e.name.clone(),
                        module_alias: module_alias.clone(),
                        member_name: e.name.clone(),
                    });
                }

                continue;
            }

            for member in &using.members {
                self.using_aliases.push(UsingAliasEntry {
                    local_name: member.member_name.clone(),
                    module_alias: member.module_alias.clone(),
                    member_name: member.member_name.clone(),
                });
            }
        }
    }

    fn receiver_type(&self, id: NodeId) -> &str {
        self.annotations.receiver_type(id)
    }

    fn next_temp(&mut self, prefix: &str) -> String {
        self.temp_counter += 1;
        format!("{prefix}{}", self.temp_counter)
    }

    /// Last-declared binding wins, matching the checker.
    fn using_alias(&self, name: &str) -> Option<(&str, &str)> {
        self.using_aliases
            .iter()
            .rev()
            .find(|alias| alias.local_name == name)
            .map(|alias| (alias.module_alias.as_str(), alias.member_name.as_str()))
    }

    /// Looks up struct fields for literal reordering: local structs and
    /// errors first, then module-qualified and using-aliased names.
    fn struct_fields(&self, name: &str) -> Option<&'a [StructField]> {
        if let Some(s) = self.current_program.structs.iter().find(|s| s.name == name) {
            return Some(&s.fields);
        }

        if let Some(e) = self.current_program.errors.iter().find(|e| e.name == name) {
            return Some(&e.fields);
        }

        if let Some((module, type_name)) = name.split_once('.') {
            let module = self.modules.get(module).copied()?;

            if let Some(s) = module.public_structs().find(|s| s.name == type_name) {
                return Some(&s.fields);
            }

            return module
                .public_errors()
                .find(|e| e.name == type_name)
                .map(|e| &e.fields[..]);
        }

        let (module_alias, member) = self.using_alias(name)?;
        let module = self.modules.get(module_alias).copied()?;

        if let Some(s) = module.public_structs().find(|s| s.name == member) {
            return Some(&s.fields);
        }

        module
            .public_errors()
            .find(|e| e.name == member)
            .map(|e| &e.fields[..])
    }

    /// Whether a struct literal names an error type (those construct a
    /// shared error value instead of an aggregate).
    fn is_error_type(&self, name: &str) -> bool {
        if self.current_program.errors.iter().any(|e| e.name == name) {
            return true;
        }

        if let Some((module, type_name)) = name.split_once('.') {
            return self
                .modules
                .get(module)
                .is_some_and(|m| m.public_errors().any(|e| e.name == type_name));
        }

        if let Some((module_alias, member)) = self.using_alias(name) {
            return self
                .modules
                .get(module_alias)
                .is_some_and(|m| m.public_errors().any(|e| e.name == member));
        }

        false
    }

    fn is_static_method(&self, struct_name: &str, method_name: &str) -> bool {
        self.current_program
            .methods
            .iter()
            .find(|m| m.struct_name == struct_name && m.name == method_name)
            .map(|m| m.is_static)
            .unwrap_or(false)
    }

    /// Static-method lookup that also follows qualified and using-aliased
    /// struct names into their home modules.
    fn is_static_method_resolved(&self, struct_name: &str, method_name: &str) -> bool {
        if self.is_static_method(struct_name, method_name) {
            return true;
        }

        if let Some((module, type_name)) = struct_name.split_once('.') {
            return self.modules.get(module).is_some_and(|m| {
                m.public_methods(type_name)
                    .any(|def| def.name == method_name && def.is_static)
            });
        }

        if let Some((module_alias, member)) = self.using_alias(struct_name) {
            return self.modules.get(module_alias).is_some_and(|m| {
                m.public_methods(member)
                    .any(|def| def.name == method_name && def.is_static)
            });
        }

        false
    }

    fn is_local_callable(&self, name: &str) -> bool {
        self.current_program.functions.iter().any(|f| f.name == name)
            || self.current_program.externs.iter().any(|e| e.name == name)
    }
}

/// Generates complete C++ source for a program and its resolved modules.
pub fn generate(
    program: &Program,
    modules: &HashMap<String, &Module>,
    annotations: &Annotations,
    test_mode: bool,
) -> String {
    debug!("generating C++ (test_mode: {test_mode})");

    let mut state = CodeGenState::new(program, modules, annotations, test_mode);
    let mut out = String::new();

    // Base runtime include; http and net bring their own superset header.
    let mut base_replaced = false;

    for import in &program.imports {
        if stdlib::is_builtin(&import.alias) && stdlib::replaces_base_include(&import.alias) {
            if let Some(include) = stdlib::runtime_include(&import.alias) {
                out += include;
                out += "\n";
                base_replaced = true;
                break;
            }
        }
    }

    if !base_replaced {
        out += "#include <bishop/std.hpp>\n";
    }

    for import in &program.imports {
        if stdlib::is_builtin(&import.alias) && !stdlib::replaces_base_include(&import.alias) {
            if let Some(include) = stdlib::runtime_include(&import.alias) {
                out += include;
                out += "\n";
            }
        }
    }

    if uses_channels(program) {
        out += "#include <bishop/channel.hpp>\n";
    }

    out += "\n";

    out += &generate_extern_declarations(program);

    if test_mode {
        out += &function::test_helper_block();
    }

    // Non-built-in imported modules are emitted as namespaces.
    let mut namespaced: Vec<_> = program
        .imports
        .iter()
        .filter(|import| !stdlib::is_builtin(&import.alias))
        .collect();
    namespaced.sort_by(|a, b| a.alias.cmp(&b.alias));

    for import in namespaced {
        if let Some(module) = modules.get(&import.alias).copied() {
            out += &generate_module_namespace(&mut state, &import.alias, module);
        }
    }

    for s in &program.structs {
        out += &generate_struct(&mut state, s);
        out += "\n\n";
    }

    for e in &program.errors {
        out += &generate_error(e);
        out += "\n";
    }

    for c in &program.constants {
        out += &generate_module_constant(&mut state, c);
    }

    if !program.constants.is_empty() {
        out += "\n";
    }

    for f in &program.functions {
        out += &generate_function(&mut state, f);
    }

    if test_mode {
        out += &generate_test_harness(program);
    }

    out
}

/// Emits a non-built-in module as a C++ namespace holding its public
/// surface.
fn generate_module_namespace<'a>(
    state: &mut CodeGenState<'a>,
    alias: &str,
    module: &'a Module,
) -> String {
    let mut out = format!("namespace {} {{\n\n", names::remap_module(alias));

    let saved_program = state.current_program;
    state.current_program = &module.program;

    let structs: Vec<_> = module.public_structs().collect();

    for s in structs {
        out += &generate_struct(state, s);
        out += "\n\n";
    }

    for e in module.public_errors() {
        out += &generate_error(e);
        out += "\n";
    }

    let constants: Vec<_> = module.constants().to_vec();

    for c in &constants {
        out += &generate_module_constant(state, c);
    }

    if !constants.is_empty() {
        out += "\n";
    }

    let functions: Vec<_> = module.public_functions().collect();

    for f in functions {
        out += &generate_function(state, f);
    }

    state.current_program = saved_program;

    out += &format!("}} // namespace {}\n\n", names::remap_module(alias));
    out
}
