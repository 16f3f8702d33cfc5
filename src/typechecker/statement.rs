//! Statement checking plus function and method body validation.

use crate::{
    parser::ast::{ForKind, FunctionDef, MethodDef, Node, Param},
    types::{format_type, TypeInfo},
};

use super::{expression::is_numeric, types_compatible, TypeCheckerState};

impl<'a> TypeCheckerState<'a> {
    pub(crate) fn check_statement(&mut self, stmt: &Node) {
        match stmt {
            Node::VariableDecl {
                type_name,
                name,
                value,
                is_optional,
                is_const,
                line,
            } => {
                let value_type = self.infer_type(value);

                if value_type.is_fallible
                    && !matches!(**value, Node::OrExpr { .. } | Node::DefaultExpr { .. })
                {
                    self.error(
                        format!("unhandled fallible value bound to '{name}'; handle it with 'or'"),
                        *line,
                    );
                }

                let mut declared = if type_name.is_empty() {
                    if value_type.is_void {
                        self.error(
                            format!("cannot declare '{name}' from a void expression"),
                            *line,
                        );
                    }

                    TypeInfo {
                        is_fallible: false,
                        is_const: false,
                        ..value_type
                    }
                } else {
                    if !self.is_valid_type(type_name) {
                        self.error(format!("unknown type '{type_name}'"), *line);
                    }

                    let expected = TypeInfo {
                        base_type: type_name.clone(),
                        is_optional: *is_optional,
                        ..TypeInfo::default()
                    };

                    if !types_compatible(&expected, &value_type) {
                        self.error(
                            format!(
                                "cannot assign '{}' to variable of type '{}'",
                                format_type(&value_type),
                                format_type(&expected)
                            ),
                            *line,
                        );
                    }

                    expected
                };

                declared.is_const = *is_const;
                self.declare_local(name, declared, *line);
            }

            Node::Assignment { name, value, line } => {
                let value_type = self.infer_type(value);

                if value_type.is_fallible
                    && !matches!(**value, Node::OrExpr { .. } | Node::DefaultExpr { .. })
                {
                    self.error(
                        format!("unhandled fallible value assigned to '{name}'; handle it with 'or'"),
                        *line,
                    );
                }

                if let Some(local) = self.lookup_local(name).cloned() {
                    if local.is_const {
                        self.error(format!("cannot reassign const '{name}'"), *line);
                    } else if !types_compatible(&local, &value_type) {
                        self.error(
                            format!(
                                "cannot assign '{}' to '{name}' of type '{}'",
                                format_type(&value_type),
                                format_type(&local)
                            ),
                            *line,
                        );
                    }
                } else if self.get_module_constant(name).is_some() {
                    self.error(format!("cannot reassign const '{name}'"), *line);
                } else {
                    self.error(format!("undefined variable '{name}'"), *line);
                }
            }

            Node::ReturnStmt { value, line } => {
                let current = self.current_return();

                match value {
                    Some(value) => {
                        let value_type = self.infer_type(value);

                        if !types_compatible(&current, &value_type) {
                            self.error(
                                format!(
                                    "return type mismatch: expected '{}', got '{}'",
                                    format_type(&current),
                                    format_type(&value_type)
                                ),
                                *line,
                            );
                        }
                    }
                    None => {
                        if !current.is_void && !self.current_function_is_fallible() {
                            self.error(
                                format!(
                                    "return needs a value in a function returning '{}'",
                                    format_type(&current)
                                ),
                                *line,
                            );
                        }
                    }
                }
            }

            Node::FailStmt { value, line } => {
                if !self.current_function_is_fallible() {
                    self.error("'fail' requires a fallible function", *line);
                }

                self.check_fail_value(value, *line);
            }

            Node::IfStmt {
                condition,
                then_body,
                else_body,
                ..
            } => {
                let cond_type = self.infer_type(condition);
                self.check_condition(&cond_type, condition.line());

                self.push_scope();

                for s in then_body {
                    self.check_statement(s);
                }

                self.pop_scope();
                self.push_scope();

                for s in else_body {
                    self.check_statement(s);
                }

                self.pop_scope();
            }

            Node::WhileStmt {
                condition, body, ..
            } => {
                let cond_type = self.infer_type(condition);
                self.check_condition(&cond_type, condition.line());

                self.push_scope();
                self.enter_loop();

                for s in body {
                    self.check_statement(s);
                }

                self.exit_loop();
                self.pop_scope();
            }

            Node::ForStmt {
                kind,
                loop_var,
                range_start,
                range_end,
                iterable,
                body,
                line,
            } => {
                let element_type = match kind {
                    ForKind::Range => {
                        for bound in [range_start, range_end].into_iter().flatten() {
                            let bound_type = self.infer_type(bound);

                            if bound_type.base_type != "int" && !bound_type.is_unknown() {
                                self.error(
                                    format!(
                                        "range bound must be int, got '{}'",
                                        format_type(&bound_type)
                                    ),
                                    *line,
                                );
                            }
                        }

                        TypeInfo::of("int")
                    }
                    ForKind::Each => {
                        let iterable = iterable.as_deref().expect("each-loop has an iterable");
                        let iterable_type = self.infer_type(iterable);
                        self.element_type_of(&iterable_type, *line)
                    }
                };

                self.push_scope();
                self.declare_local(loop_var, element_type, *line);
                self.enter_loop();

                for s in body {
                    self.check_statement(s);
                }

                self.exit_loop();
                self.pop_scope();
            }

            Node::BreakStmt { line } => {
                if !self.in_loop() {
                    self.error("'break' outside of a loop", *line);
                }
            }

            Node::ContinueStmt { line } => {
                if !self.in_loop() {
                    self.error("'continue' outside of a loop", *line);
                }
            }

            Node::WithStmt {
                resource,
                binding,
                body,
                line,
            } => {
                let resource_type = self.infer_type(resource);

                self.push_scope();
                self.declare_local(
                    binding,
                    TypeInfo {
                        is_fallible: false,
                        ..resource_type
                    },
                    *line,
                );

                for s in body {
                    self.check_statement(s);
                }

                self.pop_scope();
            }

            Node::SelectStmt { arms, .. } => {
                for arm in arms {
                    let is_recv = matches!(
                        &*arm.channel,
                        Node::MethodCall { method, .. } if method == "recv"
                    ) || matches!(
                        &*arm.channel,
                        Node::AwaitExpr { value, .. }
                            if matches!(&**value, Node::MethodCall { method, .. } if method == "recv")
                    );

                    if !is_recv {
                        self.error("select arms must receive from a channel", arm.line);
                    }

                    let received = self.infer_type(&arm.channel);

                    self.push_scope();

                    if let Some(binding) = &arm.binding {
                        self.declare_local(binding, received, arm.line);
                    }

                    for s in &arm.body {
                        self.check_statement(s);
                    }

                    self.pop_scope();
                }
            }

            Node::GoSpawn { call, line } => {
                if !matches!(
                    **call,
                    Node::FunctionCall { .. } | Node::MethodCall { .. } | Node::LambdaCall { .. }
                ) {
                    self.error("'go' requires a function or method call", *line);
                }

                self.infer_type(call);
            }

            other => {
                self.infer_type(other);
            }
        }
    }

    /// Conditions must convert to bool in the target: bools, numerics,
    /// optionals and pointers do; strings, containers and plain structs are
    /// rejected.
    fn check_condition(&mut self, cond_type: &TypeInfo, line: usize) {
        if cond_type.is_optional || cond_type.is_unknown() {
            return;
        }

        let base = &cond_type.base_type;

        if base == "bool" || base == "char" || is_numeric(base) || base.ends_with('*') {
            return;
        }

        self.error(
            format!("condition must be testable as bool, got '{}'", format_type(cond_type)),
            line,
        );
    }

    /// Element type produced by iterating a value with `for x in ...`.
    fn element_type_of(&mut self, iterable: &TypeInfo, line: usize) -> TypeInfo {
        let base = iterable.base_type.as_str();

        for prefix in ["List<", "Set<", "Deque<", "Tuple<"] {
            if let Some(element) = crate::types::extract_element_type(base, prefix) {
                return TypeInfo::of(element);
            }
        }

        if let Some((key, value)) = crate::types::extract_map_types(base) {
            return TypeInfo::of(format!("MapItem<{key}, {value}>"));
        }

        if base == "str" {
            return TypeInfo::of("str");
        }

        if !iterable.is_unknown() {
            self.error(
                format!("'{}' is not iterable", format_type(iterable)),
                line,
            );
        }

        TypeInfo::unknown()
    }

    fn check_params(&mut self, params: &[Param], line: usize) {
        for param in params {
            if !self.is_valid_type(&param.type_name) {
                self.error(
                    format!(
                        "unknown type '{}' for parameter '{}'",
                        param.type_name, param.name
                    ),
                    line,
                );
            }
        }
    }

    fn check_signature(&mut self, return_type: &str, error_type: &str, line: usize) {
        if !return_type.is_empty() && !self.is_valid_type(return_type) {
            self.error(format!("unknown return type '{return_type}'"), line);
        }

        if !error_type.is_empty() && error_type != "err" {
            match self.get_struct(error_type) {
                Some(view) if view.is_error => {}
                _ => self.error(format!("unknown error type '{error_type}'"), line),
            }
        }
    }

    pub(crate) fn check_function(&mut self, func: &FunctionDef) {
        self.check_signature(&func.return_type, &func.error_type, func.line);
        self.check_params(&func.params, func.line);

        self.push_scope();

        for param in &func.params {
            self.declare_local(&param.name, TypeInfo::of(param.type_name.clone()), func.line);
        }

        let saved_return = self.set_current_return(if func.return_type.is_empty() {
            TypeInfo::void()
        } else {
            TypeInfo::of(func.return_type.clone())
        });
        let saved_fallible = self.set_current_fallible(!func.error_type.is_empty());
        let saved_struct = self.set_current_struct("");

        for stmt in &func.body {
            self.check_statement(stmt);
        }

        if !func.return_type.is_empty() && !guarantees_return(&func.body) {
            self.error(
                format!(
                    "function '{}' must return a value of type '{}'",
                    func.name, func.return_type
                ),
                func.line,
            );
        }

        self.set_current_return(saved_return);
        self.set_current_fallible(saved_fallible);
        self.set_current_struct(saved_struct);
        self.pop_scope();
    }

    pub(crate) fn check_method(&mut self, method: &MethodDef) {
        self.check_signature(&method.return_type, &method.error_type, method.line);
        self.check_params(&method.params, method.line);

        self.push_scope();

        for param in &method.params {
            self.declare_local(
                &param.name,
                TypeInfo::of(param.type_name.clone()),
                method.line,
            );
        }

        let saved_return = self.set_current_return(if method.return_type.is_empty() {
            TypeInfo::void()
        } else {
            TypeInfo::of(method.return_type.clone())
        });
        let saved_fallible = self.set_current_fallible(!method.error_type.is_empty());
        let saved_struct = self.set_current_struct(method.struct_name.clone());

        for stmt in &method.body {
            self.check_statement(stmt);
        }

        if !method.return_type.is_empty() && !guarantees_return(&method.body) {
            self.error(
                format!(
                    "method '{}' must return a value of type '{}'",
                    method.name, method.return_type
                ),
                method.line,
            );
        }

        self.set_current_return(saved_return);
        self.set_current_fallible(saved_fallible);
        self.set_current_struct(saved_struct);
        self.pop_scope();
    }
}

/// Whether a body is guaranteed to end on a return or fail along every
/// path. Loops never count; an if counts when both branches do.
fn guarantees_return(body: &[Node]) -> bool {
    body.last().is_some_and(stmt_guarantees_return)
}

fn stmt_guarantees_return(stmt: &Node) -> bool {
    match stmt {
        Node::ReturnStmt { .. } | Node::FailStmt { .. } => true,
        Node::IfStmt {
            then_body,
            else_body,
            ..
        } => {
            !else_body.is_empty() && guarantees_return(then_body) && guarantees_return(else_body)
        }
        _ => false,
    }
}
