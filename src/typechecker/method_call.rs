//! Method call type inference.
//!
//! On `obj.method(args)` the checker infers the receiver's base type, writes
//! it into the annotation table, auto-dereferences a trailing `*` so `obj`
//! and `&obj` share a method set, then dispatches: built-in containers and
//! the `str`/`char` primitives resolve against the closed tables in
//! `builtins`; user structs resolve against the per-struct method table,
//! possibly through module qualification; `TypeName.method(...)` and
//! `self.method(...)` route static methods separately.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::{
    parser::ast::{MethodDef, Node, NodeId, Param},
    types::{extract_element_type, extract_map_types, format_type, TypeInfo},
};

use super::{
    builtins::{self, MethodSig},
    expression::function_return_type,
    types_compatible, TypeCheckerState,
};

struct ContainerDispatch {
    prefix: &'static str,
    label: &'static str,
    table: &'static Lazy<HashMap<&'static str, MethodSig>>,
}

static CONTAINERS: &[ContainerDispatch] = &[
    ContainerDispatch {
        prefix: "List<",
        label: "List",
        table: &builtins::LIST_METHODS,
    },
    ContainerDispatch {
        prefix: "Set<",
        label: "Set",
        table: &builtins::SET_METHODS,
    },
    ContainerDispatch {
        prefix: "Pair<",
        label: "Pair",
        table: &builtins::PAIR_METHODS,
    },
    ContainerDispatch {
        prefix: "Tuple<",
        label: "Tuple",
        table: &builtins::TUPLE_METHODS,
    },
    ContainerDispatch {
        prefix: "Deque<",
        label: "Deque",
        table: &builtins::DEQUE_METHODS,
    },
    ContainerDispatch {
        prefix: "Stack<",
        label: "Stack",
        table: &builtins::STACK_METHODS,
    },
    ContainerDispatch {
        prefix: "Queue<",
        label: "Queue",
        table: &builtins::QUEUE_METHODS,
    },
    ContainerDispatch {
        prefix: "PriorityQueue<",
        label: "PriorityQueue",
        table: &builtins::PRIORITY_QUEUE_METHODS,
    },
];

impl<'a> TypeCheckerState<'a> {
    pub(crate) fn check_method_call(
        &mut self,
        id: NodeId,
        object: &Node,
        method: &str,
        args: &[Node],
        line: usize,
    ) -> TypeInfo {
        // Static method call: TypeName.method(...). Only when the name is
        // not shadowed by a local.
        if let Node::VariableRef { name, .. } = object {
            if self.lookup_local(name).is_none() && self.get_struct(name).is_some() {
                self.annotate(id, name.clone());
                return self.check_static_method(name, method, args, line);
            }
        }

        let obj_type = self.infer_type(object);
        self.annotate(id, obj_type.base_type.clone());

        if obj_type.is_unknown() {
            for arg in args {
                self.infer_type(arg);
            }

            return TypeInfo::unknown();
        }

        // Auto-dereference pointers so s.m() and (&s).m() agree.
        let base = obj_type.base_type.trim_end_matches('*').to_owned();

        if base.starts_with("Channel<") {
            let Some(element) = extract_element_type(&base, "Channel<") else {
                self.error(format!("malformed Channel type '{base}'"), line);
                return TypeInfo::unknown();
            };

            return self.check_channel_method(method, args, &element.to_owned(), line);
        }

        if base.starts_with("Map<") {
            let Some((key, value)) = extract_map_types(&base) else {
                self.error(format!("malformed Map type '{base}'"), line);
                return TypeInfo::unknown();
            };

            let (key, value) = (key.to_owned(), value.to_owned());
            return self.check_builtin_method(
                "Map",
                method,
                args,
                &builtins::MAP_METHODS,
                "",
                Some(&key),
                Some(&value),
                line,
            );
        }

        for dispatch in CONTAINERS {
            if base.starts_with(dispatch.prefix) {
                let Some(element) = extract_element_type(&base, dispatch.prefix) else {
                    self.error(
                        format!("malformed {} type '{base}'", dispatch.label),
                        line,
                    );
                    return TypeInfo::unknown();
                };

                let element = element.to_owned();
                return self.check_builtin_method(
                    dispatch.label,
                    method,
                    args,
                    dispatch.table,
                    &element,
                    None,
                    None,
                    line,
                );
            }
        }

        if base == "str" {
            return self.check_str_method(method, args, line);
        }

        if base == "char" {
            return self.check_builtin_method(
                "char",
                method,
                args,
                &builtins::CHAR_METHODS,
                "",
                None,
                None,
                line,
            );
        }

        self.check_struct_method(&base, &obj_type, method, args, line)
    }

    fn check_channel_method(
        &mut self,
        method: &str,
        args: &[Node],
        element: &str,
        line: usize,
    ) -> TypeInfo {
        match method {
            "send" => {
                if args.len() != 1 {
                    self.error(
                        format!("Channel.send expects 1 argument, got {}", args.len()),
                        line,
                    );
                }

                if let Some(arg) = args.first() {
                    let arg_type = self.infer_type(arg);
                    let expected = TypeInfo::of(element);

                    if !types_compatible(&expected, &arg_type) {
                        self.error(
                            format!(
                                "Channel.send expects '{element}', got '{}'",
                                format_type(&arg_type)
                            ),
                            line,
                        );
                    }
                }

                TypeInfo::void()
            }
            "recv" => {
                if !args.is_empty() {
                    self.error(
                        format!("Channel.recv expects 0 arguments, got {}", args.len()),
                        line,
                    );
                }

                TypeInfo::of(element)
            }
            other => {
                self.error(format!("Channel has no method '{other}'"), line);
                TypeInfo::unknown()
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn check_builtin_method(
        &mut self,
        container: &str,
        method: &str,
        args: &[Node],
        table: &Lazy<HashMap<&'static str, MethodSig>>,
        element: &str,
        key: Option<&str>,
        value: Option<&str>,
        line: usize,
    ) -> TypeInfo {
        let Some(sig) = table.get(method) else {
            self.error(format!("{container} has no method '{method}'"), line);

            for arg in args {
                self.infer_type(arg);
            }

            return TypeInfo::unknown();
        };

        let expected: Vec<String> = sig
            .params
            .iter()
            .map(|p| builtins::substitute(p, element, key, value))
            .collect();

        self.check_args(&format!("method '{method}'"), args, &expected, line);

        if sig.ret == "V?" {
            return TypeInfo::optional(value.unwrap_or(element));
        }

        let ret = builtins::substitute(sig.ret, element, key, value);

        if ret == "void" {
            return TypeInfo::void();
        }

        TypeInfo::of(ret)
    }

    /// The padding trio tolerates an optional second fill argument; every
    /// other str method checks against the table as-is.
    fn check_str_method(&mut self, method: &str, args: &[Node], line: usize) -> TypeInfo {
        let is_padding = matches!(method, "pad_left" | "pad_right" | "center");

        if is_padding {
            if args.is_empty() || args.len() > 2 {
                self.error(
                    format!(
                        "method '{method}' expects 1 or 2 arguments, got {}",
                        args.len()
                    ),
                    line,
                );
            }

            for (i, (arg, expected)) in args.iter().zip(["int", "str"]).enumerate() {
                let arg_type = self.infer_type(arg);

                if !types_compatible(&TypeInfo::of(expected), &arg_type) {
                    self.error(
                        format!(
                            "argument {} of method '{method}' expects '{expected}', got '{}'",
                            i + 1,
                            format_type(&arg_type)
                        ),
                        line,
                    );
                }
            }

            return TypeInfo::of("str");
        }

        self.check_builtin_method(
            "str",
            method,
            args,
            &builtins::STR_METHODS,
            "",
            None,
            None,
            line,
        )
    }

    fn check_static_method(
        &mut self,
        struct_name: &str,
        method: &str,
        args: &[Node],
        line: usize,
    ) -> TypeInfo {
        let Some(def) = self.resolve_method(struct_name, method) else {
            self.error(
                format!("static method '{method}' not found on struct '{struct_name}'"),
                line,
            );

            for arg in args {
                self.infer_type(arg);
            }

            return TypeInfo::unknown();
        };

        if !def.is_static {
            self.error(
                format!("method '{method}' is not static; use an instance to call it"),
                line,
            );
            return TypeInfo::unknown();
        }

        let params: Vec<String> = def.params.iter().map(|p: &Param| p.type_name.clone()).collect();
        let (return_type, error_type) = (def.return_type.clone(), def.error_type.clone());
        self.check_args(&format!("static method '{method}'"), args, &params, line);

        let info = function_return_type(&return_type, &error_type);

        match self.struct_home_module(struct_name) {
            Some(module) => self.qualify_from_module(&module, info),
            None => info,
        }
    }

    fn check_struct_method(
        &mut self,
        base: &str,
        obj_type: &TypeInfo,
        method: &str,
        args: &[Node],
        line: usize,
    ) -> TypeInfo {
        if self.get_struct(base).is_none() {
            self.error(
                format!(
                    "cannot call method on non-struct type '{}'",
                    format_type(obj_type)
                ),
                line,
            );

            for arg in args {
                self.infer_type(arg);
            }

            return TypeInfo::unknown();
        }

        let Some(def) = self.resolve_method(base, method) else {
            self.error(
                format!("method '{method}' not found on struct '{base}'"),
                line,
            );

            for arg in args {
                self.infer_type(arg);
            }

            return TypeInfo::unknown();
        };

        // self.static_method(...) routes like TypeName.static_method(...).
        if def.is_static {
            return self.check_static_method(base, method, args, line);
        }

        // Instance call: the self parameter is implicit.
        let params: Vec<String> = def.params[1..]
            .iter()
            .map(|p| p.type_name.clone())
            .collect();
        let (return_type, error_type) = (def.return_type.clone(), def.error_type.clone());
        self.check_args(&format!("method '{method}'"), args, &params, line);

        let info = function_return_type(&return_type, &error_type);

        match self.struct_home_module(base) {
            Some(module) => self.qualify_from_module(&module, info),
            None => info,
        }
    }

    /// Finds a method definition, following module qualification and using
    /// aliases on the struct name.
    fn resolve_method(&self, struct_name: &str, method: &str) -> Option<&'a MethodDef> {
        if let Some((module, name)) = struct_name.split_once('.') {
            return self.get_qualified_method(module, name, method);
        }

        if let Some(def) = self.get_method(struct_name, method) {
            return Some(def);
        }

        // using-aliased struct: resolve against its home module
        let alias = self.get_using_alias(struct_name)?;
        self.get_qualified_method(&alias.module_alias, &alias.member_name, method)
    }
}
