//! Expression type inference.
//!
//! `infer_type` recursively infers the type of every expression form:
//! literals, references, calls, arithmetic, container constructors, lambdas
//! and the or/default error-handling forms.

use crate::{
    parser::ast::{Node, NodeId, OrHandler, OrMatchArm, Param},
    types::{extract_element_type, format_type, parse_function_type_params,
        parse_function_type_return, TypeInfo},
};

use super::{types_compatible, TypeCheckerState, UsingKind, MODULE_ACCESS};

impl<'a> TypeCheckerState<'a> {
    pub(crate) fn infer_type(&mut self, expr: &Node) -> TypeInfo {
        match expr {
            Node::NumberLiteral { .. } => TypeInfo::of("int"),
            Node::FloatLiteral { .. } => TypeInfo::of("f64"),
            Node::StringLiteral { .. } => TypeInfo::of("str"),
            Node::BoolLiteral { .. } => TypeInfo::of("bool"),
            Node::NoneLiteral { .. } => TypeInfo::optional("none"),

            Node::ListLiteral { elements, line } => self.check_list_literal(elements, *line),
            Node::MapLiteral { entries, line } => self.check_map_literal(entries, *line),
            Node::SetLiteral { elements, line } => self.check_set_literal(elements, *line),

            Node::VariableRef { name, line } => self.check_variable_ref(name, *line),
            Node::FunctionRef { name, line } => self.check_function_ref(name, *line),
            Node::QualifiedRef { module, name, line } => {
                self.check_qualified_ref(module, name, *line)
            }
            Node::FieldAccess {
                id,
                object,
                field,
                line,
            } => self.check_field_access(*id, object, field, *line),
            Node::FieldAssignment {
                id,
                object,
                field,
                value,
                line,
            } => self.check_field_assignment(*id, object, field, value, *line),
            Node::AddressOf { value, line } => {
                let inner = self.infer_type(value);

                if inner.is_unknown() {
                    return inner;
                }

                if self.get_struct(&inner.base_type).is_none() {
                    self.error(
                        format!("cannot take the address of '{}'", format_type(&inner)),
                        *line,
                    );
                    return TypeInfo::unknown();
                }

                TypeInfo::of(format!("{}*", inner.base_type))
            }

            Node::FunctionCall { name, args, line } => {
                self.check_function_call(name, args, *line)
            }
            Node::MethodCall {
                id,
                object,
                method,
                args,
                line,
            } => self.check_method_call(*id, object, method, args, *line),
            Node::LambdaCall { callee, args, line } => self.check_lambda_call(callee, args, *line),

            Node::BinaryExpr {
                op,
                left,
                right,
                line,
            } => self.check_binary_expr(op, left, right, *line),
            Node::NotExpr { value, line } => {
                let inner = self.infer_type(value);

                if inner.base_type != "bool" && !inner.is_unknown() {
                    self.error(
                        format!("'!' operator requires bool, got '{}'", format_type(&inner)),
                        *line,
                    );
                }

                TypeInfo::of("bool")
            }
            Node::NegateExpr { value, line } => {
                let inner = self.infer_type(value);

                if !is_numeric(&inner.base_type) && !inner.is_unknown() {
                    self.error(
                        format!("unary '-' requires a numeric value, got '{}'", format_type(&inner)),
                        *line,
                    );
                }

                inner
            }
            Node::ParenExpr { value, .. } => self.infer_type(value),
            Node::IsNone { value, .. } => {
                self.infer_type(value);
                TypeInfo::of("bool")
            }

            Node::AwaitExpr { value, .. } => self.infer_type(value),
            Node::ChannelCreate {
                element_type,
                capacity,
                line,
            } => {
                if !self.is_valid_type(element_type) {
                    self.error(format!("unknown type '{element_type}'"), *line);
                }

                if let Some(capacity) = capacity {
                    let cap_type = self.infer_type(capacity);

                    if cap_type.base_type != "int" && !cap_type.is_unknown() {
                        self.error(
                            format!(
                                "channel capacity must be int, got '{}'",
                                format_type(&cap_type)
                            ),
                            *line,
                        );
                    }
                }

                TypeInfo::of(format!("Channel<{element_type}>"))
            }

            Node::ListCreate { element_type, line } => {
                self.check_element_type(element_type, *line);
                TypeInfo::of(format!("List<{element_type}>"))
            }
            Node::SetCreate { element_type, line } => {
                self.check_element_type(element_type, *line);
                TypeInfo::of(format!("Set<{element_type}>"))
            }
            Node::DequeCreate { element_type, line } => {
                self.check_element_type(element_type, *line);
                TypeInfo::of(format!("Deque<{element_type}>"))
            }
            Node::StackCreate { element_type, line } => {
                self.check_element_type(element_type, *line);
                TypeInfo::of(format!("Stack<{element_type}>"))
            }
            Node::QueueCreate { element_type, line } => {
                self.check_element_type(element_type, *line);
                TypeInfo::of(format!("Queue<{element_type}>"))
            }
            Node::PriorityQueueCreate {
                element_type, line, ..
            } => {
                self.check_element_type(element_type, *line);
                TypeInfo::of(format!("PriorityQueue<{element_type}>"))
            }
            Node::MapCreate {
                key_type,
                value_type,
                line,
            } => {
                self.check_element_type(key_type, *line);
                self.check_element_type(value_type, *line);
                TypeInfo::of(format!("Map<{key_type}, {value_type}>"))
            }
            Node::PairCreate {
                element_type,
                first,
                second,
                line,
            } => {
                self.check_element_type(element_type, *line);

                let expected = TypeInfo::of(element_type.clone());

                for value in [first, second] {
                    let actual = self.infer_type(value);

                    if !types_compatible(&expected, &actual) {
                        self.error(
                            format!(
                                "Pair element expects '{element_type}', got '{}'",
                                format_type(&actual)
                            ),
                            *line,
                        );
                    }
                }

                TypeInfo::of(format!("Pair<{element_type}>"))
            }
            Node::TupleCreate {
                element_type,
                elements,
                line,
            } => {
                self.check_element_type(element_type, *line);

                if elements.len() < 2 || elements.len() > 5 {
                    self.error(
                        format!("Tuple takes 2 to 5 elements, got {}", elements.len()),
                        *line,
                    );
                }

                let expected = TypeInfo::of(element_type.clone());

                for value in elements {
                    let actual = self.infer_type(value);

                    if !types_compatible(&expected, &actual) {
                        self.error(
                            format!(
                                "Tuple element expects '{element_type}', got '{}'",
                                format_type(&actual)
                            ),
                            *line,
                        );
                    }
                }

                TypeInfo::of(format!("Tuple<{element_type}>"))
            }

            Node::LambdaExpr {
                params,
                return_type,
                body,
                line,
            } => self.check_lambda_expr(params, return_type, body, *line),

            Node::OrExpr {
                expr,
                handler,
                line,
            } => self.check_or_expr(expr, handler, *line),
            Node::DefaultExpr {
                expr,
                fallback,
                line,
            } => self.check_default_expr(expr, fallback, *line),

            Node::StructLiteral {
                struct_name,
                field_values,
                line,
            } => self.check_struct_literal(struct_name, field_values, *line),

            // Statement forms never reach expression inference.
            _ => TypeInfo::unknown(),
        }
    }

    fn check_element_type(&mut self, element_type: &str, line: usize) {
        if !self.is_valid_type(element_type) {
            self.error(format!("unknown type '{element_type}'"), line);
        }
    }

    fn check_list_literal(&mut self, elements: &[Node], line: usize) -> TypeInfo {
        if elements.is_empty() {
            self.error(
                "cannot infer type of empty list literal, use List<T>() instead",
                line,
            );
            return TypeInfo::unknown();
        }

        let first = self.infer_type(&elements[0]);

        for element in &elements[1..] {
            let actual = self.infer_type(element);

            if actual.base_type != first.base_type {
                self.error(
                    format!(
                        "list literal has mixed types: '{}' and '{}'",
                        format_type(&first),
                        format_type(&actual)
                    ),
                    line,
                );
            }
        }

        TypeInfo::of(format!("List<{}>", first.base_type))
    }

    fn check_map_literal(&mut self, entries: &[(Node, Node)], line: usize) -> TypeInfo {
        if entries.is_empty() {
            self.error(
                "cannot infer type of empty map literal, use Map<K, V>() instead",
                line,
            );
            return TypeInfo::unknown();
        }

        let first_key = self.infer_type(&entries[0].0);
        let first_value = self.infer_type(&entries[0].1);

        for (key, value) in &entries[1..] {
            let key_type = self.infer_type(key);
            let value_type = self.infer_type(value);

            if key_type.base_type != first_key.base_type {
                self.error(
                    format!(
                        "map literal has mixed key types: '{}' and '{}'",
                        format_type(&first_key),
                        format_type(&key_type)
                    ),
                    line,
                );
            }

            if value_type.base_type != first_value.base_type {
                self.error(
                    format!(
                        "map literal has mixed value types: '{}' and '{}'",
                        format_type(&first_value),
                        format_type(&value_type)
                    ),
                    line,
                );
            }
        }

        TypeInfo::of(format!(
            "Map<{}, {}>",
            first_key.base_type, first_value.base_type
        ))
    }

    fn check_set_literal(&mut self, elements: &[Node], line: usize) -> TypeInfo {
        if elements.is_empty() {
            self.error(
                "cannot infer type of empty set literal, use Set<T>() instead",
                line,
            );
            return TypeInfo::unknown();
        }

        let first = self.infer_type(&elements[0]);

        for element in &elements[1..] {
            let actual = self.infer_type(element);

            if actual.base_type != first.base_type {
                self.error(
                    format!(
                        "set literal has mixed types: '{}' and '{}'",
                        format_type(&first),
                        format_type(&actual)
                    ),
                    line,
                );
            }
        }

        TypeInfo::of(format!("Set<{}>", first.base_type))
    }

    /// Resolution order: local scopes innermost first, module constants,
    /// using aliases.
    fn check_variable_ref(&mut self, name: &str, line: usize) -> TypeInfo {
        if let Some(local) = self.lookup_local(name) {
            return local.clone();
        }

        if let Some(constant) = self.get_module_constant(name) {
            return constant;
        }

        if let Some(alias) = self.get_using_alias(name) {
            match alias.kind {
                UsingKind::Constant => {
                    if let Some(info) = alias.type_info.clone() {
                        return info;
                    }
                }
                UsingKind::Function | UsingKind::Extern => {
                    return TypeInfo::of(format!(
                        "fn:{}.{}",
                        alias.module_alias, alias.member_name
                    ));
                }
                UsingKind::Struct => {}
            }
        }

        self.error(format!("undefined variable '{name}'"), line);
        TypeInfo::unknown()
    }

    fn check_function_ref(&mut self, name: &str, line: usize) -> TypeInfo {
        if let Some((module, func_name)) = name.split_once('.') {
            if self.get_qualified_function(module, func_name).is_none() {
                self.error(format!("undefined function '{name}'"), line);
                return TypeInfo::unknown();
            }

            return TypeInfo::of(format!("fn:{name}"));
        }

        if self.get_function(name).is_none() {
            self.error(format!("undefined function '{name}'"), line);
            return TypeInfo::unknown();
        }

        TypeInfo::of(format!("fn:{name}"))
    }

    fn check_qualified_ref(&mut self, module: &str, name: &str, line: usize) -> TypeInfo {
        if self.get_qualified_struct(module, name).is_some() {
            return TypeInfo::of(format!("{module}.{name}"));
        }

        if let Some(constant) = self.get_qualified_constant(module, name) {
            return constant;
        }

        if self.get_qualified_function(module, name).is_some() {
            return TypeInfo::of(format!("fn:{module}.{name}"));
        }

        self.error(format!("undefined reference '{module}.{name}'"), line);
        TypeInfo::unknown()
    }

    /// Field access: module constants, Pair fields, MapItem fields and
    /// struct fields, with pointer auto-dereference.
    fn check_field_access(
        &mut self,
        id: NodeId,
        object: &Node,
        field: &str,
        line: usize,
    ) -> TypeInfo {
        if let Node::VariableRef { name, .. } = object {
            if self.is_imported_module(name) && self.lookup_local(name).is_none() {
                if let Some(constant) = self.get_qualified_constant(name, field) {
                    self.annotate(id, MODULE_ACCESS);
                    return constant;
                }

                self.error(
                    format!("module '{name}' has no constant '{field}'"),
                    line,
                );
                return TypeInfo::unknown();
            }
        }

        let obj_type = self.infer_type(object);
        self.annotate(id, obj_type.base_type.clone());

        if obj_type.is_unknown() {
            return TypeInfo::unknown();
        }

        let base = obj_type.base_type.trim_end_matches('*');

        if let Some(element) = extract_element_type(base, "Pair<") {
            return match field {
                "first" | "second" => TypeInfo::of(element),
                _ => {
                    self.error(format!("Pair has no field '{field}'"), line);
                    TypeInfo::unknown()
                }
            };
        }

        if let Some((key, value)) = crate::types::extract_pair_types(base, "MapItem<") {
            return match field {
                "key" => TypeInfo::of(key),
                "value" => TypeInfo::of(value),
                _ => {
                    self.error(format!("MapItem has no field '{field}'"), line);
                    TypeInfo::unknown()
                }
            };
        }

        let Some(view) = self.get_struct(base) else {
            self.error(
                format!(
                    "cannot access field on non-struct type '{}'",
                    format_type(&obj_type)
                ),
                line,
            );
            return TypeInfo::unknown();
        };

        // Error structs carry the runtime-provided message field.
        if view.is_error && field == "message" {
            return TypeInfo::of("str");
        }

        match view.fields.iter().find(|f| f.name == field) {
            Some(f) => TypeInfo::of(f.type_name.clone()),
            None => {
                self.error(format!("struct '{base}' has no field '{field}'"), line);
                TypeInfo::unknown()
            }
        }
    }

    fn check_field_assignment(
        &mut self,
        id: NodeId,
        object: &Node,
        field: &str,
        value: &Node,
        line: usize,
    ) -> TypeInfo {
        let obj_type = self.infer_type(object);
        self.annotate(id, obj_type.base_type.clone());

        let value_type = self.infer_type(value);

        if obj_type.is_unknown() {
            return TypeInfo::void();
        }

        let base = obj_type.base_type.trim_end_matches('*');

        let Some(view) = self.get_struct(base) else {
            self.error(
                format!(
                    "cannot assign field on non-struct type '{}'",
                    format_type(&obj_type)
                ),
                line,
            );
            return TypeInfo::void();
        };

        let Some(field_def) = view.fields.iter().find(|f| f.name == field) else {
            self.error(format!("struct '{base}' has no field '{field}'"), line);
            return TypeInfo::void();
        };

        let expected = TypeInfo::of(field_def.type_name.clone());

        if !types_compatible(&expected, &value_type) {
            self.error(
                format!(
                    "field '{field}' expects '{}', got '{}'",
                    field_def.type_name,
                    format_type(&value_type)
                ),
                line,
            );
        }

        TypeInfo::void()
    }

    fn check_binary_expr(&mut self, op: &str, left: &Node, right: &Node, line: usize) -> TypeInfo {
        let left_type = self.infer_type(left);
        let right_type = self.infer_type(right);

        if matches!(op, "==" | "!=" | "<" | ">" | "<=" | ">=") {
            return TypeInfo::of("bool");
        }

        if op == "+" && left_type.base_type == "str" {
            return TypeInfo::of("str");
        }

        if left_type.base_type != right_type.base_type
            && !left_type.is_unknown()
            && !right_type.is_unknown()
        {
            self.error(
                format!(
                    "type mismatch in binary expression: '{}' {op} '{}'",
                    format_type(&left_type),
                    format_type(&right_type)
                ),
                line,
            );
        }

        left_type
    }

    fn check_lambda_call(&mut self, callee: &Node, args: &[Node], line: usize) -> TypeInfo {
        let callee_type = self.infer_type(callee);

        if callee_type.is_unknown() {
            for arg in args {
                self.infer_type(arg);
            }

            return TypeInfo::unknown();
        }

        if let Some(params) = parse_function_type_params(&callee_type.base_type) {
            self.check_args("function value", args, &params, line);

            let ret = parse_function_type_return(&callee_type.base_type).unwrap_or_default();

            if ret.is_empty() {
                return TypeInfo::void();
            }

            return TypeInfo::of(ret);
        }

        if let Some(target) = callee_type.base_type.strip_prefix("fn:") {
            let target = target.to_owned();
            return self.check_function_call(&target, args, line);
        }

        self.error(
            format!(
                "cannot call non-function value of type '{}'",
                format_type(&callee_type)
            ),
            line,
        );
        TypeInfo::unknown()
    }

    /// Checks arguments against a list of expected type strings, reporting
    /// arity and per-argument mismatches.
    pub(crate) fn check_args(
        &mut self,
        label: &str,
        args: &[Node],
        param_types: &[String],
        line: usize,
    ) {
        if args.len() != param_types.len() {
            self.error(
                format!(
                    "{label} expects {} arguments, got {}",
                    param_types.len(),
                    args.len()
                ),
                line,
            );
        }

        for (i, (arg, param_type)) in args.iter().zip(param_types).enumerate() {
            let arg_type = self.infer_type(arg);
            let expected = TypeInfo::of(param_type.clone());

            if !types_compatible(&expected, &arg_type) {
                self.error(
                    format!(
                        "argument {} of {label} expects '{param_type}', got '{}'",
                        i + 1,
                        format_type(&arg_type)
                    ),
                    line,
                );
            }
        }

        // Arguments past the declared parameter list still get inferred so
        // nested method calls receive their annotations.
        for arg in args.iter().skip(param_types.len()) {
            self.infer_type(arg);
        }
    }

    fn param_types(params: &[Param]) -> Vec<String> {
        params.iter().map(|p| p.type_name.clone()).collect()
    }

    pub(crate) fn check_function_call(
        &mut self,
        name: &str,
        args: &[Node],
        line: usize,
    ) -> TypeInfo {
        if is_assertion_function(name) {
            if !self.test_mode() {
                self.error(
                    format!("'{name}' is only available in test mode"),
                    line,
                );

                for arg in args {
                    self.infer_type(arg);
                }
            } else {
                self.check_assertion_call(name, args, line);
            }

            return TypeInfo::void();
        }

        if name == "print" {
            // Still infer argument types so nested calls get annotated.
            for arg in args {
                self.infer_type(arg);
            }

            return TypeInfo::void();
        }

        if name == "sleep" {
            if args.len() != 1 {
                self.error(
                    format!("sleep expects 1 argument (milliseconds), got {}", args.len()),
                    line,
                );
            }

            for arg in args {
                let arg_type = self.infer_type(arg);

                if arg_type.base_type != "int" && !arg_type.is_unknown() {
                    self.error(
                        format!("sleep expects int argument, got '{}'", format_type(&arg_type)),
                        line,
                    );
                }
            }

            return TypeInfo::void();
        }

        if let Some((module, func_name)) = name.split_once('.') {
            let Some(func) = self.get_qualified_function(module, func_name) else {
                self.error(format!("undefined function '{name}'"), line);

                for arg in args {
                    self.infer_type(arg);
                }

                return TypeInfo::unknown();
            };

            let params = Self::param_types(&func.params);
            let (return_type, error_type) = (func.return_type.clone(), func.error_type.clone());
            self.check_args(&format!("function '{name}'"), args, &params, line);

            let info = function_return_type(&return_type, &error_type);
            return self.qualify_from_module(module, info);
        }

        // Function-typed local: op(1, 2) where op: fn(int, int) -> int.
        if let Some(local) = self.lookup_local(name).cloned() {
            if let Some(params) = parse_function_type_params(&local.base_type) {
                self.check_args(&format!("function '{name}'"), args, &params, line);

                let ret = parse_function_type_return(&local.base_type).unwrap_or_default();

                if ret.is_empty() {
                    return TypeInfo::void();
                }

                return TypeInfo::of(ret);
            }

            if let Some(target) = local.base_type.strip_prefix("fn:") {
                let target = target.to_owned();
                return self.check_function_call(&target, args, line);
            }
        }

        if let Some(func) = self.get_function(name) {
            let params = Self::param_types(&func.params);
            let (return_type, error_type) = (func.return_type.clone(), func.error_type.clone());
            self.check_args(&format!("function '{name}'"), args, &params, line);

            return function_return_type(&return_type, &error_type);
        }

        if let Some(ext) = self.get_extern_function(name) {
            let params = Self::param_types(&ext.params);
            let return_type = ext.return_type.clone();
            self.check_args(&format!("function '{name}'"), args, &params, line);

            if return_type.is_empty() || return_type == "void" {
                return TypeInfo::void();
            }

            return TypeInfo::of(return_type);
        }

        // using-aliased module members
        if let Some(alias) = self.get_using_alias(name).cloned() {
            match alias.kind {
                UsingKind::Function => {
                    if let Some(func) = self.get_qualified_function(&alias.module_alias, &alias.member_name) {
                        let params = Self::param_types(&func.params);
                        let (return_type, error_type) =
                            (func.return_type.clone(), func.error_type.clone());
                        self.check_args(&format!("function '{name}'"), args, &params, line);

                        let info = function_return_type(&return_type, &error_type);
                        return self.qualify_from_module(&alias.module_alias, info);
                    }
                }
                UsingKind::Extern => {
                    if let Some(ext) = self.get_qualified_extern(&alias.module_alias, &alias.member_name) {
                        let params = Self::param_types(&ext.params);
                        let return_type = ext.return_type.clone();
                        self.check_args(&format!("function '{name}'"), args, &params, line);

                        if return_type.is_empty() || return_type == "void" {
                            return TypeInfo::void();
                        }

                        return TypeInfo::of(return_type);
                    }
                }
                UsingKind::Struct | UsingKind::Constant => {}
            }
        }

        self.error(format!("undefined function '{name}'"), line);

        for arg in args {
            self.infer_type(arg);
        }

        TypeInfo::unknown()
    }

    fn check_assertion_call(&mut self, name: &str, args: &[Node], line: usize) {
        match name {
            "assert_eq" | "assert_ne" | "assert_gt" | "assert_gte" | "assert_lt"
            | "assert_lte" => {
                if args.len() != 2 {
                    self.error(
                        format!("{name} expects 2 arguments, got {}", args.len()),
                        line,
                    );
                    return;
                }

                let type_a = self.infer_type(&args[0]);
                let type_b = self.infer_type(&args[1]);

                if !types_compatible(&type_a, &type_b) && !types_compatible(&type_b, &type_a) {
                    self.error(
                        format!(
                            "{name} arguments must have compatible types, got '{}' and '{}'",
                            format_type(&type_a),
                            format_type(&type_b)
                        ),
                        line,
                    );
                }
            }

            "assert_true" | "assert_false" => {
                if args.len() != 1 {
                    self.error(
                        format!("{name} expects 1 argument, got {}", args.len()),
                        line,
                    );
                    return;
                }

                let arg_type = self.infer_type(&args[0]);

                if arg_type.base_type != "bool" && !arg_type.is_unknown() {
                    self.error(
                        format!("{name} expects bool argument, got '{}'", format_type(&arg_type)),
                        line,
                    );
                }
            }

            "assert_contains" => {
                if args.len() != 2 {
                    self.error(
                        format!("assert_contains expects 2 arguments, got {}", args.len()),
                        line,
                    );
                    return;
                }

                let item_type = self.infer_type(&args[0]);
                let list_type = self.infer_type(&args[1]);

                let Some(element) = extract_element_type(&list_type.base_type, "List<") else {
                    if !list_type.is_unknown() {
                        self.error(
                            format!(
                                "assert_contains second argument must be a List, got '{}'",
                                format_type(&list_type)
                            ),
                            line,
                        );
                    }
                    return;
                };

                let expected = TypeInfo::of(element);

                if !types_compatible(&expected, &item_type) {
                    self.error(
                        format!(
                            "assert_contains item type '{}' doesn't match list element type '{element}'",
                            format_type(&item_type)
                        ),
                        line,
                    );
                }
            }

            "assert_starts_with" | "assert_ends_with" => {
                if args.len() != 2 {
                    self.error(
                        format!("{name} expects 2 arguments, got {}", args.len()),
                        line,
                    );
                    return;
                }

                for (i, arg) in args.iter().enumerate() {
                    let arg_type = self.infer_type(arg);

                    if arg_type.base_type != "str" && !arg_type.is_unknown() {
                        let position = if i == 0 { "first" } else { "second" };
                        self.error(
                            format!(
                                "{name} {position} argument must be str, got '{}'",
                                format_type(&arg_type)
                            ),
                            line,
                        );
                    }
                }
            }

            "assert_near" => {
                if args.len() != 3 {
                    self.error(
                        format!(
                            "assert_near expects 3 arguments (actual, expected, epsilon), got {}",
                            args.len()
                        ),
                        line,
                    );
                    return;
                }

                for (arg, label) in args.iter().zip(["first", "second", "third"]) {
                    let arg_type = self.infer_type(arg);

                    if !is_numeric(&arg_type.base_type) && !arg_type.is_unknown() {
                        self.error(
                            format!(
                                "assert_near {label} argument must be numeric, got '{}'",
                                format_type(&arg_type)
                            ),
                            line,
                        );
                    }
                }
            }

            _ => {}
        }
    }

    /// Lambda bodies type-check in a fresh scope containing the parameters
    /// plus the enclosing scope chain (lexical closure).
    fn check_lambda_expr(
        &mut self,
        params: &[Param],
        return_type: &str,
        body: &[Node],
        line: usize,
    ) -> TypeInfo {
        let mut fn_type = String::from("fn(");

        for (i, param) in params.iter().enumerate() {
            if !self.is_valid_type(&param.type_name) {
                self.error(
                    format!(
                        "unknown type '{}' for parameter '{}'",
                        param.type_name, param.name
                    ),
                    line,
                );
            }

            if i > 0 {
                fn_type += ", ";
            }

            fn_type += &param.type_name;
        }

        fn_type += ")";

        if !return_type.is_empty() {
            if !self.is_valid_type(return_type) {
                self.error(format!("unknown return type '{return_type}'"), line);
            }

            fn_type += " -> ";
            fn_type += return_type;
        }

        self.push_scope();

        for param in params {
            self.declare_local(&param.name, TypeInfo::of(param.type_name.clone()), line);
        }

        let saved_return = self.set_current_return(if return_type.is_empty() {
            TypeInfo::void()
        } else {
            TypeInfo::of(return_type)
        });
        let saved_fallible = self.set_current_fallible(false);

        for stmt in body {
            self.check_statement(stmt);
        }

        self.set_current_return(saved_return);
        self.set_current_fallible(saved_fallible);
        self.pop_scope();

        TypeInfo::of(fn_type)
    }

    /// Or-expression typing: the value expression must be fallible or of a
    /// falsy-testable type; the handler either transfers control or (for
    /// match) supplies a value of the same type; the result drops both the
    /// fallibility and the optional marker.
    fn check_or_expr(&mut self, expr: &Node, handler: &OrHandler, line: usize) -> TypeInfo {
        let inner = self.infer_type(expr);

        if !inner.is_fallible && !is_falsy_capable(&inner) {
            self.error(
                format!(
                    "'or' requires a fallible or falsy-testable value, got '{}'",
                    format_type(&inner)
                ),
                line,
            );
        }

        match handler {
            OrHandler::Return(None) => {
                let current = self.current_return();

                if !current.is_void && !self.current_function_is_fallible() {
                    self.error(
                        format!(
                            "'or return' needs a value in a function returning '{}'",
                            format_type(&current)
                        ),
                        line,
                    );
                }
            }
            OrHandler::Return(Some(value)) => {
                let value_type = self.infer_type(value);
                let current = self.current_return();

                if !types_compatible(&current, &value_type) {
                    self.error(
                        format!(
                            "'or return' value is '{}', expected '{}'",
                            format_type(&value_type),
                            format_type(&current)
                        ),
                        line,
                    );
                }
            }
            OrHandler::Fail(value) => {
                if !self.current_function_is_fallible() {
                    self.error("'or fail' requires a fallible function", line);
                }

                // `or fail err` re-raises the inner error; the lowering
                // itself binds `err`, so it only needs a fallible input.
                if matches!(&**value, Node::VariableRef { name, .. } if name == "err") {
                    if !inner.is_fallible {
                        self.error("'or fail err' requires a fallible value", line);
                    }
                } else {
                    self.check_fail_value(value, line);
                }
            }
            OrHandler::Continue => {
                if !self.in_loop() {
                    self.error("'or continue' outside of a loop", line);
                }
            }
            OrHandler::Break => {
                if !self.in_loop() {
                    self.error("'or break' outside of a loop", line);
                }
            }
            OrHandler::Block(body) => {
                self.push_scope();
                self.declare_local("err", TypeInfo::of("err"), line);

                for stmt in body {
                    self.check_statement(stmt);
                }

                if !body.last().is_some_and(is_control_transfer) {
                    self.error(
                        "'or' block must end in return, fail, break, or continue",
                        line,
                    );
                }

                self.pop_scope();
            }
            OrHandler::Match(arms) => {
                if !inner.is_fallible {
                    self.error("'or match' requires a fallible value", line);
                }

                self.check_or_match_arms(arms, &inner, line);
            }
        }

        TypeInfo {
            base_type: inner.base_type,
            is_void: inner.is_void,
            ..TypeInfo::default()
        }
    }

    fn check_or_match_arms(&mut self, arms: &[OrMatchArm], inner: &TypeInfo, line: usize) {
        let has_default = arms.iter().any(|arm| arm.error_type == "_");
        let mut all_transfer = true;

        for arm in arms {
            if arm.error_type != "_" {
                match self.get_struct(&arm.error_type) {
                    Some(view) if view.is_error => {}
                    _ => {
                        self.error(
                            format!("unknown error type '{}' in or match", arm.error_type),
                            line,
                        );
                    }
                }
            }

            self.push_scope();
            self.declare_local("err", TypeInfo::of("err"), line);

            if let Node::FailStmt { value, line } = &*arm.body {
                if !self.current_function_is_fallible() {
                    self.error("'fail' requires a fallible function", *line);
                }

                self.check_fail_value(value, *line);
            } else {
                all_transfer = false;

                let arm_type = self.infer_type(&arm.body);
                let expected = TypeInfo::of(inner.base_type.clone());

                if !inner.is_void && !types_compatible(&expected, &arm_type) {
                    self.error(
                        format!(
                            "or match arm yields '{}', expected '{}'",
                            format_type(&arm_type),
                            format_type(&expected)
                        ),
                        line,
                    );
                }
            }

            self.pop_scope();
        }

        if !has_default && !all_transfer {
            self.error(
                "or match needs a '_' arm unless every arm transfers control",
                line,
            );
        }
    }

    /// Validates the error value of a `fail`: a string message, a known
    /// error literal (possibly bare), or the bound `err`.
    pub(crate) fn check_fail_value(&mut self, value: &Node, line: usize) {
        match value {
            Node::StringLiteral { .. } => {}
            Node::VariableRef { name, .. } if name == "err" => {
                if self.lookup_local("err").is_none() {
                    self.error("'err' is not bound here", line);
                }
            }
            Node::StructLiteral {
                struct_name,
                field_values,
                line: lit_line,
            } => {
                match self.get_struct(struct_name) {
                    Some(view) if view.is_error => {}
                    Some(_) => {
                        self.error(
                            format!("'{struct_name}' is not an error type"),
                            *lit_line,
                        );
                    }
                    None => {
                        self.error(format!("unknown error type '{struct_name}'"), *lit_line);
                    }
                }

                self.check_struct_literal(struct_name, field_values, *lit_line);
            }
            other => {
                let value_type = self.infer_type(other);

                if value_type.base_type != "str"
                    && value_type.base_type != "err"
                    && !value_type.is_unknown()
                    && self.get_struct(&value_type.base_type).map(|v| v.is_error) != Some(true)
                {
                    self.error(
                        format!(
                            "fail expects a message or error value, got '{}'",
                            format_type(&value_type)
                        ),
                        line,
                    );
                }
            }
        }
    }

    fn check_default_expr(&mut self, expr: &Node, fallback: &Node, line: usize) -> TypeInfo {
        let inner = self.infer_type(expr);
        let fallback_type = self.infer_type(fallback);

        let result = TypeInfo::of(inner.base_type.clone());

        if !types_compatible(&result, &fallback_type) {
            self.error(
                format!(
                    "default value is '{}', expected '{}'",
                    format_type(&fallback_type),
                    format_type(&result)
                ),
                line,
            );
        }

        result
    }

    pub(crate) fn check_struct_literal(
        &mut self,
        struct_name: &str,
        field_values: &[(String, Node)],
        line: usize,
    ) -> TypeInfo {
        let Some(view) = self.get_struct(struct_name) else {
            self.error(format!("unknown struct '{struct_name}'"), line);

            for (_, value) in field_values {
                self.infer_type(value);
            }

            return TypeInfo::unknown();
        };

        let fields = view.fields;

        for (field_name, field_value) in field_values {
            let Some(field) = fields.iter().find(|f| f.name == *field_name) else {
                self.error(
                    format!("struct '{struct_name}' has no field '{field_name}'"),
                    line,
                );
                self.infer_type(field_value);
                continue;
            };

            let expected = TypeInfo::of(field.type_name.clone());
            let value_type = self.infer_type(field_value);

            if !types_compatible(&expected, &value_type) {
                self.error(
                    format!(
                        "field '{field_name}' expects '{}', got '{}'",
                        field.type_name,
                        format_type(&value_type)
                    ),
                    line,
                );
            }
        }

        TypeInfo::of(struct_name)
    }
}

/// Builds the TypeInfo of a call result from a declared return and error
/// type.
pub(crate) fn function_return_type(return_type: &str, error_type: &str) -> TypeInfo {
    let fallible = !error_type.is_empty();

    let mut info = if return_type.is_empty() {
        TypeInfo::void()
    } else {
        TypeInfo::of(return_type)
    };

    info.is_fallible = fallible;
    info
}

pub(crate) fn is_numeric(base_type: &str) -> bool {
    matches!(base_type, "int" | "f32" | "f64" | "u32" | "u64" | "cint")
}

/// The types `or` accepts without fallibility: strings, containers,
/// numerics, bools and optionals.
fn is_falsy_capable(info: &TypeInfo) -> bool {
    if info.is_optional || info.is_unknown() {
        return true;
    }

    if matches!(info.base_type.as_str(), "str" | "bool" | "char") || is_numeric(&info.base_type) {
        return true;
    }

    [
        "List<", "Map<", "Set<", "Deque<", "Stack<", "Queue<", "PriorityQueue<",
    ]
    .iter()
    .any(|prefix| info.base_type.starts_with(prefix))
}

fn is_assertion_function(name: &str) -> bool {
    matches!(
        name,
        "assert_eq"
            | "assert_ne"
            | "assert_true"
            | "assert_false"
            | "assert_gt"
            | "assert_gte"
            | "assert_lt"
            | "assert_lte"
            | "assert_contains"
            | "assert_starts_with"
            | "assert_ends_with"
            | "assert_near"
    )
}

pub(crate) fn is_control_transfer(node: &Node) -> bool {
    matches!(
        node,
        Node::ReturnStmt { .. }
            | Node::FailStmt { .. }
            | Node::BreakStmt { .. }
            | Node::ContinueStmt { .. }
    )
}
