//! Static type checker for Bishop.
//!
//! A bidirectional checker over the AST: it populates symbol tables from the
//! program's declarations, resolves identifiers through the lexical scope
//! stack, imported modules, using aliases and module constants, and checks
//! every function and method body. Errors accumulate into a list so a single
//! pass reports all of them.
//!
//! The one piece of information the emitter needs from checking (the
//! inferred receiver type of method calls, field accesses and field
//! assignments) is written into an [`Annotations`] side table keyed by the
//! parser-assigned node id. The AST itself is never mutated.

mod builtins;
mod error;
mod expression;
mod method_call;
mod statement;

pub use error::TypeError;

use std::collections::HashMap;

use log::debug;

use crate::{
    parser::ast::{
        ExternFunctionDef, FunctionDef, MethodDef, Node, NodeId, Program, StructField,
    },
    project::Module,
    types::{extract_element_type, extract_map_types, format_type, TypeInfo},
};

/// Receiver-type annotations produced by the checker, keyed by node id.
/// Written exactly once per annotatable node; the emitter only reads.
#[derive(Debug, Clone, Default)]
pub struct Annotations {
    receiver_types: HashMap<NodeId, String>,
}

impl Annotations {
    pub fn receiver_type(&self, id: NodeId) -> &str {
        self.receiver_types.get(&id).map(String::as_str).unwrap_or("")
    }

    fn record(&mut self, id: NodeId, receiver: impl Into<String>) {
        self.receiver_types.insert(id, receiver.into());
    }
}

/// Marker receiver type for `module.CONSTANT` field accesses.
pub const MODULE_ACCESS: &str = "__module__";

/// A unified view over struct and error definitions; errors are structs
/// that extend the runtime error base.
#[derive(Debug, Clone, Copy)]
pub struct StructView<'a> {
    pub name: &'a str,
    pub fields: &'a [StructField],
    pub is_error: bool,
}

/// What a using alias resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsingKind {
    Function,
    Struct,
    Constant,
    Extern,
}

#[derive(Debug, Clone)]
pub struct ResolvedUsingAlias {
    pub local_name: String,
    pub module_alias: String,
    pub member_name: String,
    pub kind: UsingKind,
    pub type_info: Option<TypeInfo>,
}

/// Result of checking one program.
#[derive(Debug, Default)]
pub struct CheckOutcome {
    pub errors: Vec<TypeError>,
    pub annotations: Annotations,
}

/// Type checker state, passed explicitly through every checking function.
pub struct TypeCheckerState<'a> {
    program: &'a Program,
    modules: &'a HashMap<String, &'a Module>,
    filename: String,
    test_mode: bool,

    structs: HashMap<&'a str, StructView<'a>>,
    methods: HashMap<&'a str, Vec<&'a MethodDef>>,
    functions: HashMap<&'a str, &'a FunctionDef>,
    extern_functions: HashMap<&'a str, &'a ExternFunctionDef>,
    module_constants: HashMap<String, TypeInfo>,
    using_aliases: Vec<ResolvedUsingAlias>,

    local_scopes: Vec<HashMap<String, TypeInfo>>,
    current_struct: String,
    current_return: TypeInfo,
    current_function_is_fallible: bool,
    loop_depth: usize,

    errors: Vec<TypeError>,
    annotations: Annotations,
}

/// Checks a program against its resolved modules. Returns every error found
/// plus the receiver-type annotations the emitter consumes.
pub fn check<'a>(
    program: &'a Program,
    modules: &'a HashMap<String, &'a Module>,
    filename: &str,
    test_mode: bool,
) -> CheckOutcome {
    debug!("type checking '{filename}'");

    let mut state = TypeCheckerState {
        program,
        modules,
        filename: filename.to_owned(),
        test_mode,
        structs: HashMap::new(),
        methods: HashMap::new(),
        functions: HashMap::new(),
        extern_functions: HashMap::new(),
        module_constants: HashMap::new(),
        using_aliases: vec![],
        local_scopes: vec![],
        current_struct: String::new(),
        current_return: TypeInfo::void(),
        current_function_is_fallible: false,
        loop_depth: 0,
        errors: vec![],
        annotations: Annotations::default(),
    };

    state.collect_structs();
    state.collect_methods();
    state.collect_functions();
    state.collect_extern_functions();
    state.collect_constants();
    state.collect_using_aliases();

    for method in &program.methods {
        state.check_method(method);
    }

    for func in &program.functions {
        state.check_function(func);
    }

    CheckOutcome {
        errors: state.errors,
        annotations: state.annotations,
    }
}

impl<'a> TypeCheckerState<'a> {
    pub(crate) fn error(&mut self, message: impl Into<String>, line: usize) {
        self.errors.push(TypeError {
            message: message.into(),
            line,
            filename: self.filename.clone(),
        });
    }

    pub(crate) fn annotate(&mut self, id: NodeId, receiver: impl Into<String>) {
        self.annotations.record(id, receiver);
    }

    pub(crate) fn test_mode(&self) -> bool {
        self.test_mode
    }

    pub(crate) fn program(&self) -> &'a Program {
        self.program
    }

    // ------------------------------------------------------------------
    // local scopes
    // ------------------------------------------------------------------

    pub(crate) fn push_scope(&mut self) {
        self.local_scopes.push(HashMap::new());
    }

    pub(crate) fn pop_scope(&mut self) {
        self.local_scopes.pop();
    }

    /// Declares a local in the innermost scope. Redeclaring a name within
    /// the same scope is an error; shadowing an outer scope is not.
    pub(crate) fn declare_local(&mut self, name: &str, type_info: TypeInfo, line: usize) {
        if self.local_scopes.is_empty() {
            self.push_scope();
        }

        let current = self.local_scopes.last_mut().expect("scope pushed above");

        if current.contains_key(name) {
            self.error(
                format!("variable '{name}' is already defined in this scope"),
                line,
            );
            return;
        }

        current.insert(name.to_owned(), type_info);
    }

    pub(crate) fn lookup_local(&self, name: &str) -> Option<&TypeInfo> {
        self.local_scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
    }

    pub(crate) fn in_loop(&self) -> bool {
        self.loop_depth > 0
    }

    pub(crate) fn enter_loop(&mut self) {
        self.loop_depth += 1;
    }

    pub(crate) fn exit_loop(&mut self) {
        self.loop_depth -= 1;
    }

    pub(crate) fn current_return(&self) -> TypeInfo {
        self.current_return.clone()
    }

    pub(crate) fn set_current_return(&mut self, info: TypeInfo) -> TypeInfo {
        std::mem::replace(&mut self.current_return, info)
    }

    pub(crate) fn current_function_is_fallible(&self) -> bool {
        self.current_function_is_fallible
    }

    pub(crate) fn set_current_fallible(&mut self, fallible: bool) -> bool {
        std::mem::replace(&mut self.current_function_is_fallible, fallible)
    }

    pub(crate) fn current_struct(&self) -> &str {
        &self.current_struct
    }

    pub(crate) fn set_current_struct(&mut self, name: impl Into<String>) -> String {
        std::mem::replace(&mut self.current_struct, name.into())
    }

    // ------------------------------------------------------------------
    // collection
    // ------------------------------------------------------------------

    fn collect_structs(&mut self) {
        for s in &self.program.structs {
            self.structs.insert(
                s.name.as_str(),
                StructView {
                    name: &s.name,
                    fields: &s.fields,
                    is_error: false,
                },
            );
        }

        for e in &self.program.errors {
            self.structs.insert(
                e.name.as_str(),
                StructView {
                    name: &e.name,
                    fields: &e.fields,
                    is_error: true,
                },
            );
        }
    }

    fn collect_methods(&mut self) {
        let mut pending = vec![];

        for m in &self.program.methods {
            if !self.structs.contains_key(m.struct_name.as_str()) {
                pending.push((
                    format!(
                        "method '{}' defined on unknown struct '{}'",
                        m.name, m.struct_name
                    ),
                    m.line,
                ));
                continue;
            }

            let struct_methods = self.methods.entry(m.struct_name.as_str()).or_default();

            if struct_methods.iter().any(|existing| existing.name == m.name) {
                pending.push((
                    format!(
                        "duplicate method '{}' on struct '{}'",
                        m.name, m.struct_name
                    ),
                    m.line,
                ));
                continue;
            }

            struct_methods.push(m);
        }

        for (message, line) in pending {
            self.error(message, line);
        }
    }

    fn collect_functions(&mut self) {
        for f in &self.program.functions {
            self.functions.insert(f.name.as_str(), f);
        }
    }

    fn collect_extern_functions(&mut self) {
        for e in &self.program.externs {
            self.extern_functions.insert(e.name.as_str(), e);
        }
    }

    /// Collects module-level constants, validating each initializer.
    fn collect_constants(&mut self) {
        for c in &self.program.constants {
            let Node::VariableDecl {
                type_name,
                name,
                value,
                is_optional,
                line,
                ..
            } = c
            else {
                continue;
            };

            if self.module_constants.contains_key(name) {
                self.error(format!("duplicate module-level const '{name}'"), *line);
                continue;
            }

            let init_type = self.infer_type(value);

            let mut info = if type_name.is_empty() {
                init_type
            } else {
                let expected = TypeInfo {
                    base_type: type_name.clone(),
                    is_optional: *is_optional,
                    ..TypeInfo::default()
                };

                if !types_compatible(&expected, &init_type) {
                    self.error(
                        format!(
                            "cannot assign '{}' to const of type '{}'",
                            format_type(&init_type),
                            format_type(&expected)
                        ),
                        *line,
                    );
                }

                expected
            };

            info.is_const = true;
            self.module_constants.insert(name.clone(), info);
        }
    }

    /// Resolves every using statement against the imported modules.
    /// Wildcards expand to the module's full public surface; on collision
    /// the last-declared binding wins.
    fn collect_using_aliases(&mut self) {
        for using in &self.program.usings {
            if using.is_wildcard {
                let module_alias = using.wildcard_module.clone();

                let Some(module) = self.modules.get(module_alias.as_str()).copied() else {
                    self.error(
                        format!("using: module '{module_alias}' is not imported"),
                        using.line,
                    );
                    continue;
                };

                for func in module.public_functions() {
                    self.using_aliases.push(ResolvedUsingAlias {
                        local_name: func.name.clone(),
                        module_alias: module_alias.clone(),
                        member_name: func.name.clone(),
                        kind: UsingKind::Function,
                        type_info: None,
                    });
                }

                for s in module.public_structs() {
                    self.using_aliases.push(ResolvedUsingAlias {
                        local_name: s.name.clone(),
                        module_alias: module_alias.clone(),
                        member_name: s.name.clone(),
                        kind: UsingKind::Struct,
                        type_info: None,
                    });
                }

                for e in module.public_errors() {
                    self.using_aliases.push(ResolvedUsingAlias {
                        local_name: e.name.clone(),
                        module_alias: module_alias.clone(),
                        member_name: e.name.clone(),
                        kind: UsingKind::Struct,
                        type_info: None,
                    });
                }

                for c in module.constants() {
                    let Node::VariableDecl { type_name, name, .. } = c else {
                        continue;
                    };

                    let mut info = TypeInfo::of(type_name.clone());
                    info.is_const = true;

                    self.using_aliases.push(ResolvedUsingAlias {
                        local_name: name.clone(),
                        module_alias: module_alias.clone(),
                        member_name: name.clone(),
                        kind: UsingKind::Constant,
                        type_info: Some(info),
                    });
                }

                for e in module.public_externs() {
                    self.using_aliases.push(ResolvedUsingAlias {
                        local_name: e.name.clone(),
                        module_alias: module_alias.clone(),
                        member_name: e.name.clone(),
                        kind: UsingKind::Extern,
                        type_info: None,
                    });
                }

                continue;
            }

            for member in &using.members {
                let module_alias = member.module_alias.clone();
                let member_name = member.member_name.clone();

                let Some(module) = self.modules.get(module_alias.as_str()).copied() else {
                    self.error(
                        format!("using: module '{module_alias}' is not imported"),
                        using.line,
                    );
                    continue;
                };

                let alias = if module.public_functions().any(|f| f.name == member_name) {
                    Some((UsingKind::Function, None))
                } else if module.public_structs().any(|s| s.name == member_name)
                    || module.public_errors().any(|e| e.name == member_name)
                {
                    Some((UsingKind::Struct, None))
                } else if let Some(info) = module.constants().iter().find_map(|c| match c {
                    Node::VariableDecl { type_name, name, .. } if *name == member_name => {
                        let mut info = TypeInfo::of(type_name.clone());
                        info.is_const = true;
                        Some(info)
                    }
                    _ => None,
                }) {
                    Some((UsingKind::Constant, Some(info)))
                } else if module.public_externs().any(|e| e.name == member_name) {
                    Some((UsingKind::Extern, None))
                } else {
                    None
                };

                match alias {
                    Some((kind, type_info)) => self.using_aliases.push(ResolvedUsingAlias {
                        local_name: member_name.clone(),
                        module_alias,
                        member_name,
                        kind,
                        type_info,
                    }),
                    None => self.error(
                        format!(
                            "using: member '{member_name}' not found in module '{module_alias}'"
                        ),
                        using.line,
                    ),
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // lookups
    // ------------------------------------------------------------------

    /// Looks up a struct (or error) definition. Handles both local names
    /// and qualified `module.Type` names.
    pub(crate) fn get_struct(&self, name: &str) -> Option<StructView<'a>> {
        if let Some(view) = self.structs.get(name) {
            return Some(*view);
        }

        // using-aliased struct names resolve through their module
        if let Some(alias) = self.get_using_alias(name) {
            if alias.kind == UsingKind::Struct {
                return self.get_qualified_struct(&alias.module_alias, &alias.member_name);
            }
        }

        if let Some((module, type_name)) = name.split_once('.') {
            return self.get_qualified_struct(module, type_name);
        }

        None
    }

    pub(crate) fn get_method(&self, struct_name: &str, method_name: &str) -> Option<&'a MethodDef> {
        self.methods
            .get(struct_name)?
            .iter()
            .find(|m| m.name == method_name)
            .copied()
    }

    pub(crate) fn get_function(&self, name: &str) -> Option<&'a FunctionDef> {
        self.functions.get(name).copied()
    }

    pub(crate) fn get_extern_function(&self, name: &str) -> Option<&'a ExternFunctionDef> {
        self.extern_functions.get(name).copied()
    }

    pub(crate) fn get_module_constant(&self, name: &str) -> Option<TypeInfo> {
        self.module_constants.get(name).cloned()
    }

    pub(crate) fn is_imported_module(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub(crate) fn get_qualified_function(
        &self,
        module: &str,
        name: &str,
    ) -> Option<&'a FunctionDef> {
        self.modules
            .get(module)
            .copied()?
            .public_functions()
            .find(|f| f.name == name)
    }

    pub(crate) fn get_qualified_struct(&self, module: &str, name: &str) -> Option<StructView<'a>> {
        let module = self.modules.get(module).copied()?;

        if let Some(s) = module.public_structs().find(|s| s.name == name) {
            return Some(StructView {
                name: &s.name,
                fields: &s.fields,
                is_error: false,
            });
        }

        module.public_errors().find(|e| e.name == name).map(|e| StructView {
            name: &e.name,
            fields: &e.fields,
            is_error: true,
        })
    }

    pub(crate) fn get_qualified_method(
        &self,
        module: &str,
        struct_name: &str,
        method_name: &str,
    ) -> Option<&'a MethodDef> {
        self.modules
            .get(module)
            .copied()?
            .public_methods(struct_name)
            .find(|m| m.name == method_name)
    }

    pub(crate) fn get_qualified_constant(&self, module: &str, name: &str) -> Option<TypeInfo> {
        self.modules
            .get(module)
            .copied()?
            .constants()
            .iter()
            .find_map(|c| match c {
                Node::VariableDecl {
                    type_name,
                    name: const_name,
                    ..
                } if const_name == name => {
                    let mut info = TypeInfo::of(type_name.clone());
                    info.is_const = true;
                    Some(info)
                }
                _ => None,
            })
    }

    pub(crate) fn get_qualified_extern(
        &self,
        module: &str,
        name: &str,
    ) -> Option<&'a ExternFunctionDef> {
        self.modules
            .get(module)
            .copied()?
            .public_externs()
            .find(|e| e.name == name)
    }

    /// Qualifies a struct type that came out of a module's surface: a
    /// module function returning its own `Handle` hands importers the type
    /// `module.Handle`, so later field and method lookups resolve.
    pub(crate) fn qualify_from_module(&self, module: &str, mut info: TypeInfo) -> TypeInfo {
        let base = info.base_type.trim_end_matches('*');

        if base.is_empty()
            || info.base_type.contains('.')
            || info.base_type.contains('<')
            || info.base_type.starts_with("fn")
            || is_primitive_type(base)
            || base == "char"
            || self.structs.contains_key(base)
        {
            return info;
        }

        if self.get_qualified_struct(module, base).is_some() {
            info.base_type = format!("{module}.{}", info.base_type);
        }

        info
    }

    /// The module a struct name resolves through, if any: the explicit
    /// qualifier of a dotted name, or the home module of a using alias.
    pub(crate) fn struct_home_module(&self, struct_name: &str) -> Option<String> {
        if let Some((module, _)) = struct_name.split_once('.') {
            return Some(module.to_owned());
        }

        if self.structs.contains_key(struct_name) {
            return None;
        }

        self.get_using_alias(struct_name)
            .filter(|alias| alias.kind == UsingKind::Struct)
            .map(|alias| alias.module_alias.clone())
    }

    /// Last-declared binding wins across wildcard usings.
    pub(crate) fn get_using_alias(&self, name: &str) -> Option<&ResolvedUsingAlias> {
        self.using_aliases
            .iter()
            .rev()
            .find(|alias| alias.local_name == name)
    }

    // ------------------------------------------------------------------
    // type validity
    // ------------------------------------------------------------------

    /// Whether a type string names a valid type: a primitive, a known
    /// struct or error, a parametric container over valid types, a function
    /// type, a struct pointer or a qualified module type.
    pub(crate) fn is_valid_type(&self, type_name: &str) -> bool {
        if is_primitive_type(type_name) || type_name == "char" {
            return true;
        }

        if self.structs.contains_key(type_name) {
            return true;
        }

        if self.get_using_alias(type_name).is_some_and(|a| a.kind == UsingKind::Struct) {
            return true;
        }

        if type_name.starts_with("fn:") || type_name.starts_with("fn(") {
            return true;
        }

        for prefix in [
            "Channel<",
            "List<",
            "Set<",
            "Pair<",
            "Tuple<",
            "Deque<",
            "Stack<",
            "Queue<",
            "PriorityQueue<",
        ] {
            if type_name.starts_with(prefix) {
                return extract_element_type(type_name, prefix)
                    .is_some_and(|element| self.is_valid_type(element));
            }
        }

        if type_name.starts_with("Map<") {
            return extract_map_types(type_name)
                .is_some_and(|(k, v)| self.is_valid_type(k) && self.is_valid_type(v));
        }

        if type_name.starts_with("MapItem<") {
            return extract_pair_valid(self, type_name);
        }

        // Pointer type: only struct pointers are allowed.
        if let Some(pointee) = type_name.strip_suffix('*') {
            return self.structs.contains_key(pointee);
        }

        if let Some((module, name)) = type_name.split_once('.') {
            return self.get_qualified_struct(module, name).is_some();
        }

        false
    }
}

fn extract_pair_valid(state: &TypeCheckerState, type_name: &str) -> bool {
    crate::types::extract_pair_types(type_name, "MapItem<")
        .is_some_and(|(k, v)| state.is_valid_type(k) && state.is_valid_type(v))
}

/// Whether a type is one of the built-in primitives.
pub fn is_primitive_type(type_name: &str) -> bool {
    matches!(
        type_name,
        "int" | "str" | "bool" | "f32" | "f64" | "u32" | "u64" | "cint" | "cstr" | "void"
    )
}

/// Whether `actual` can be assigned where `expected` is required. Covers
/// `none` into optionals, the `fn:`-reference to `fn(`-type adaptation, and
/// the original's numeric and C-interop widenings.
pub fn types_compatible(expected: &TypeInfo, actual: &TypeInfo) -> bool {
    if actual.base_type == "none" && expected.is_optional {
        return true;
    }

    if actual.is_unknown() || expected.is_unknown() {
        return true;
    }

    if actual.base_type.starts_with("fn:") && expected.base_type.starts_with("fn(") {
        return true;
    }

    match (expected.base_type.as_str(), actual.base_type.as_str()) {
        ("cstr", "str")
        | ("cint", "int")
        | ("u32", "int")
        | ("u64", "int")
        | ("f32", "f64")
        | ("str", "char") => true,
        (e, a) => e == a,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::lexer::Lexer;
    use crate::parser;
    use crate::project::{Module, ModuleMap};

    use super::{check, CheckOutcome};

    fn check_source(src: &str) -> CheckOutcome {
        check_source_in_mode(src, false)
    }

    fn check_source_in_mode(src: &str, test_mode: bool) -> CheckOutcome {
        let program = parser::parse(Lexer::new(src).lex()).expect("source should parse");
        let modules = HashMap::new();
        check(&program, &modules, "test.bi", test_mode)
    }

    fn check_with_module(src: &str, module_name: &str, module_src: &str) -> CheckOutcome {
        let module_program =
            parser::parse(Lexer::new(module_src).lex()).expect("module should parse");
        let mut available = ModuleMap::new();
        available.insert(
            module_name.to_owned(),
            Module::new(module_name, module_program),
        );

        let program = parser::parse(Lexer::new(src).lex()).expect("source should parse");
        let (resolved, missing) = crate::project::resolve(&program, &available);
        assert!(missing.is_empty(), "unresolved imports: {missing:?}");

        check(&program, &resolved, "test.bi", false)
    }

    fn assert_clean(outcome: &CheckOutcome) {
        assert!(
            outcome.errors.is_empty(),
            "unexpected errors: {:?}",
            outcome.errors
        );
    }

    fn assert_error_containing(outcome: &CheckOutcome, needle: &str) {
        assert!(
            outcome.errors.iter().any(|e| e.message.contains(needle)),
            "expected an error containing '{needle}', got: {:?}",
            outcome.errors
        );
    }

    #[test]
    fn test_hello_world_checks() {
        assert_clean(&check_source("fn main() { print(\"hi\"); }"));
    }

    #[test]
    fn test_undefined_variable() {
        let outcome = check_source("fn main() { print(x); }");
        assert_error_containing(&outcome, "undefined variable 'x'");
    }

    #[test]
    fn test_duplicate_in_same_scope_rejected() {
        let outcome = check_source("fn main() { x := 1; x := 2; }");
        assert_error_containing(&outcome, "already defined in this scope");
    }

    #[test]
    fn test_shadowing_in_nested_scope_allowed() {
        assert_clean(&check_source(
            "fn main() { x := 1; if x == 1 { x := 2; print(x); } print(x); }",
        ));
    }

    #[test]
    fn test_binary_type_mismatch() {
        let outcome = check_source("fn main() { x := 1 + \"two\"; print(x); }");
        assert_error_containing(&outcome, "type mismatch");
    }

    #[test]
    fn test_function_arity_error() {
        let outcome = check_source(
            "fn add(int a, int b) -> int { return a + b; } fn main() { v := add(1) or return; print(v); }",
        );
        assert_error_containing(&outcome, "expects 2 arguments");
    }

    #[test]
    fn test_fallible_divide_checks() {
        assert_clean(&check_source(
            r#"
            fn divide(int a, int b) -> int or err {
                if b == 0 fail "zero";
                return a / b;
            }

            fn main() {
                v := divide(10, 2) or return;
                print(v);
            }
            "#,
        ));
    }

    #[test]
    fn test_fail_outside_fallible_function_rejected() {
        let outcome = check_source("fn main() { fail \"nope\"; }");
        assert_error_containing(&outcome, "fallible");
    }

    #[test]
    fn test_or_fail_requires_fallible_inner() {
        // `or fail err` is only legal on a fallible value, since `err` is
        // otherwise unbound.
        let outcome = check_source(
            r#"
            fn outer() -> int or err {
                x := "value" or fail err;
                return x.length();
            }
            "#,
        );
        assert_error_containing(&outcome, "or fail err");
    }

    #[test]
    fn test_method_call_annotation_written() {
        let program = parser::parse(Lexer::new(
            "fn main() { xs := List<int>(); xs.append(1); }",
        ).lex())
        .expect("parse");
        let modules = HashMap::new();
        let outcome = check(&program, &modules, "test.bi", false);
        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);

        let crate::parser::ast::Node::MethodCall { id, .. } = &program.functions[0].body[1] else {
            panic!("expected method call statement");
        };
        assert_eq!(outcome.annotations.receiver_type(*id), "List<int>");
    }

    #[test]
    fn test_container_method_arity_and_types() {
        let outcome = check_source("fn main() { xs := List<int>(); xs.append(1, 2); }");
        assert_error_containing(&outcome, "expects 1 arguments");

        let outcome = check_source("fn main() { xs := List<int>(); xs.append(\"one\"); }");
        assert_error_containing(&outcome, "expects 'int'");

        let outcome = check_source("fn main() { xs := List<int>(); xs.shuffle(); }");
        assert_error_containing(&outcome, "no method 'shuffle'");
    }

    #[test]
    fn test_map_get_is_optional() {
        assert_clean(&check_source(
            r#"
            fn main() {
                ages := {"a": 1};
                v := ages.get("a") default 0;
                print(v);
            }
            "#,
        ));
    }

    #[test]
    fn test_pointer_auto_deref_method_call() {
        // s.m() and (&s).m() type-check to the same result.
        assert_clean(&check_source(
            r#"
            Point :: struct { x int }

            Point :: get_x(self) -> int { return self.x; }

            fn main() {
                p := Point { x: 3 };
                a := p.get_x();
                b := (&p).get_x();
                print(a, b);
            }
            "#,
        ));
    }

    #[test]
    fn test_static_method_dispatch() {
        assert_clean(&check_source(
            r#"
            Counter :: struct { value int }

            @static
            Counter :: zero() -> int { return 0; }

            fn main() {
                v := Counter.zero();
                print(v);
            }
            "#,
        ));
    }

    #[test]
    fn test_static_method_wrong_arity() {
        let outcome = check_source(
            r#"
            Counter :: struct { value int }

            @static
            Counter :: zero() -> int { return 0; }

            fn main() {
                v := Counter.zero(1);
                print(v);
            }
            "#,
        );
        assert_error_containing(&outcome, "expects 0 arguments");
    }

    #[test]
    fn test_or_match_requires_known_error_or_default() {
        let outcome = check_source(
            r#"
            fn work() -> int or err { return 1; }

            fn main() {
                v := work() or match err {
                    Mystery => 0,
                    _ => 1
                };
                print(v);
            }
            "#,
        );
        assert_error_containing(&outcome, "unknown error type 'Mystery'");
    }

    #[test]
    fn test_or_match_without_default_must_transfer() {
        let outcome = check_source(
            r#"
            NotFound :: err { code int }

            fn work() -> int or err { return 1; }

            fn main() -> int or err {
                v := work() or match err {
                    NotFound => 0
                };
                return v;
            }
            "#,
        );
        assert_error_containing(&outcome, "'_' arm");
    }

    #[test]
    fn test_assertions_only_in_test_mode() {
        let outcome = check_source("fn test_add() { assert_eq(4, 2 + 2); }");
        assert_error_containing(&outcome, "test mode");

        assert_clean(&check_source_in_mode(
            "fn test_add() { assert_eq(4, 2 + 2); }",
            true,
        ));
    }

    #[test]
    fn test_assert_near_arity() {
        let outcome = check_source_in_mode("fn test_pi() { assert_near(3.14, 3.1); }", true);
        assert_error_containing(&outcome, "assert_near expects 3 arguments");
    }

    #[test]
    fn test_qualified_function_call() {
        let outcome = check_with_module(
            r#"
            import mathx;

            fn main() {
                v := mathx.double(21);
                print(v);
            }
            "#,
            "mathx",
            "pub fn double(int x) -> int { return x * 2; }",
        );
        assert_clean(&outcome);
    }

    #[test]
    fn test_private_module_member_not_visible() {
        let outcome = check_with_module(
            r#"
            import mathx;

            fn main() {
                v := mathx.hidden(21);
                print(v);
            }
            "#,
            "mathx",
            "fn hidden(int x) -> int { return x; }",
        );
        assert_error_containing(&outcome, "undefined function 'mathx.hidden'");
    }

    #[test]
    fn test_using_selective_member() {
        let outcome = check_with_module(
            r#"
            import logx;
            using logx.info;

            fn main() {
                info("hi");
            }
            "#,
            "logx",
            "pub fn info(str message) { print(message); }",
        );
        assert_clean(&outcome);
    }

    #[test]
    fn test_using_unknown_member() {
        let outcome = check_with_module(
            "import logx;\nusing logx.wat;\nfn main() { }",
            "logx",
            "pub fn info(str message) { print(message); }",
        );
        assert_error_containing(&outcome, "member 'wat' not found");
    }

    #[test]
    fn test_wildcard_using_expands_surface() {
        let outcome = check_with_module(
            r#"
            import shapes;
            using shapes.*;

            fn main() {
                c := Circle { radius: 2 };
                print(area(c));
            }
            "#,
            "shapes",
            r#"
            pub Circle :: struct { radius int }

            pub fn area(Circle c) -> int { return c.radius * c.radius * 3; }
            "#,
        );
        assert_clean(&outcome);
    }

    #[test]
    fn test_missing_return_in_value_function() {
        let outcome = check_source("fn f() -> int { print(1); }");
        assert_error_containing(&outcome, "must return");
    }

    #[test]
    fn test_break_outside_loop() {
        let outcome = check_source("fn main() { break; }");
        assert_error_containing(&outcome, "outside");
    }

    #[test]
    fn test_lambda_closure_scope() {
        assert_clean(&check_source(
            r#"
            fn main() {
                base := 10;
                add := fn(int x) -> int { return x + base; };
                print(add(5));
            }
            "#,
        ));
    }

    #[test]
    fn test_lambda_parameters_scoped_to_lambda() {
        let outcome = check_source(
            r#"
            fn main() {
                add := fn(int x) -> int { return x; };
                print(x);
            }
            "#,
        );
        assert_error_containing(&outcome, "undefined variable 'x'");
    }

    #[test]
    fn test_empty_list_literal_rejected() {
        let outcome = check_source("fn main() { xs := []; print(xs); }");
        assert_error_containing(&outcome, "empty list literal");
    }

    #[test]
    fn test_channel_send_recv_types() {
        let outcome = check_source(
            r#"
            fn worker(Channel<int> ch) {
                await ch.send("nope");
            }
            "#,
        );
        assert_error_containing(&outcome, "Channel.send expects 'int'");
    }

    #[test]
    fn test_numeric_widenings() {
        assert_clean(&check_source(
            r#"
            fn main() {
                u32 small = 1;
                u64 big = 2;
                f32 narrow = 1.5;
                cint code = 3;
                print(small, big, narrow, code);
            }
            "#,
        ));
    }

    #[test]
    fn test_widening_is_one_way() {
        let outcome = check_source("fn main() { int x = 1.5; print(x); }");
        assert_error_containing(&outcome, "cannot assign 'f64'");
    }

    #[test]
    fn test_deque_stack_queue_methods() {
        assert_clean(&check_source(
            r#"
            fn main() {
                d := Deque<int>();
                d.push_back(1);
                d.push_front(0);
                a := d.pop_front();

                s := Stack<str>();
                s.push("x");
                b := s.pop();

                q := Queue<int>();
                q.push(9);
                c := q.pop();

                print(a, b, c);
            }
            "#,
        ));

        let outcome = check_source("fn main() { s := Stack<int>(); s.push_front(1); }");
        assert_error_containing(&outcome, "Stack has no method 'push_front'");
    }

    #[test]
    fn test_tuple_element_count() {
        let outcome = check_source("fn main() { t := Tuple<int>(1); print(t.get(0) default 0); }");
        assert_error_containing(&outcome, "Tuple takes 2 to 5 elements");
    }

    #[test]
    fn test_map_iteration_yields_map_items() {
        assert_clean(&check_source(
            r#"
            fn main() {
                ages := {"a": 1};
                for item in ages.items() {
                    print(item.key, item.value);
                }
            }
            "#,
        ));

        let outcome = check_source(
            r#"
            fn main() {
                ages := {"a": 1};
                for item in ages.items() {
                    print(item.missing);
                }
            }
            "#,
        );
        assert_error_containing(&outcome, "MapItem has no field 'missing'");
    }

    #[test]
    fn test_const_reassignment_rejected() {
        let outcome = check_source("fn main() { const x := 1; x = 2; }");
        assert_error_containing(&outcome, "cannot reassign const 'x'");

        let outcome = check_source("const int MAX = 1;\nfn main() { MAX = 2; }");
        assert_error_containing(&outcome, "cannot reassign const 'MAX'");
    }

    #[test]
    fn test_assignment_to_undefined_variable() {
        let outcome = check_source("fn main() { x = 1; }");
        assert_error_containing(&outcome, "undefined variable 'x'");
    }

    #[test]
    fn test_unhandled_fallible_binding_rejected() {
        let outcome = check_source(
            r#"
            fn risky() -> int or err { return 1; }

            fn main() {
                v := risky();
                print(v);
            }
            "#,
        );
        assert_error_containing(&outcome, "unhandled fallible value");
    }

    #[test]
    fn test_module_constant_resolves_unqualified() {
        assert_clean(&check_source(
            "const int LIMIT = 10;\nfn main() { print(LIMIT); }",
        ));
    }

    #[test]
    fn test_unknown_module_constant() {
        let outcome = check_with_module(
            "import limits;\nfn main() { print(limits.NOPE); }",
            "limits",
            "const int MAX_DEPTH = 8;",
        );
        assert_error_containing(&outcome, "undefined reference 'limits.NOPE'");
    }

    #[test]
    fn test_module_struct_round_trips_through_surface() {
        // A struct returned by a module function resolves for field access
        // and method calls in the importing file.
        let outcome = check_with_module(
            r#"
            import filekit;

            fn main() {
                h := filekit.open("a.txt");
                print(h.size, h.describe());
            }
            "#,
            "filekit",
            r#"
            pub Handle :: struct { size int }

            pub Handle :: describe(self) -> str { return "handle"; }

            pub fn open(str path) -> Handle {
                return Handle { size: 0 };
            }
            "#,
        );
        assert_clean(&outcome);
    }

    #[test]
    fn test_select_binds_received_value() {
        assert_clean(&check_source(
            r#"
            fn pump(Channel<int> a) {
                select {
                    v := a.recv() => { print(v); }
                }
            }
            "#,
        ));
    }
}
