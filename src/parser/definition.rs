//! Top-level definition parsing: the pre-scan pass, imports and usings,
//! functions, structs, errors, methods, extern declarations and module
//! constants. Doc comments accumulate into a buffer consumed by the next
//! definition.

use crate::lexer::TokenKind;

use super::{
    ast::*,
    statement::{parse_block, parse_const_decl},
    types::parse_type,
    ParseError, ParserState, UsingAlias,
};

/// Pre-scans the token stream to collect the names of all top-level `fn`
/// definitions and all `Name :: struct` / `Name :: err` definitions. This is
/// what makes forward references parse; no AST is built here.
fn prescan_definitions(state: &mut ParserState) {
    let saved = state.get_pos();

    while !state.check(TokenKind::Eof) {
        if state.check(TokenKind::Fn) {
            state.advance();

            if state.check(TokenKind::Ident) {
                let name = state.current().lexeme.clone();
                state.function_names.insert(name);
            }

            continue;
        }

        if state.check(TokenKind::Ident) {
            let name = state.current().lexeme.clone();
            state.advance();

            if state.check(TokenKind::DoubleColon) {
                state.advance();

                if state.check(TokenKind::Struct) || state.check(TokenKind::Err) {
                    state.struct_names.insert(name);
                }
            }

            continue;
        }

        state.advance();
    }

    state.set_pos(saved);
}

fn collect_doc_comments(state: &mut ParserState) -> String {
    let mut doc = String::new();

    while state.check(TokenKind::DocComment) {
        if !doc.is_empty() {
            doc.push('\n');
        }

        doc += &state.current().lexeme;
        state.advance();
    }

    doc
}

fn parse_visibility(state: &mut ParserState) -> Visibility {
    if state.check(TokenKind::Pub) {
        state.advance();
        return Visibility::Public;
    }

    Visibility::Private
}

/// Main parsing entry point: pre-scan, imports, usings, then a free mixture
/// of constants, functions, structs, errors and methods.
pub fn parse_program(state: &mut ParserState) -> Result<Program, ParseError> {
    let mut program = Program::default();

    prescan_definitions(state);

    // Doc comments at the very top of the file belong to no definition.
    while state.check(TokenKind::DocComment) {
        state.advance();
    }

    while state.check(TokenKind::Import) {
        program.imports.push(parse_import(state)?);
    }

    while state.check(TokenKind::Using) {
        program.usings.push(parse_using(state)?);
    }

    while !state.check(TokenKind::Eof) {
        let doc = collect_doc_comments(state);

        // @extern("lib") annotation
        if state.check(TokenKind::At) {
            let at_pos = state.get_pos();
            state.advance();

            if state.check(TokenKind::Extern) {
                state.advance();
                state.consume(TokenKind::LParen)?;
                let library = state.consume(TokenKind::String)?.lexeme;
                state.consume(TokenKind::RParen)?;

                let mut ext = parse_extern_function(state, library)?;
                ext.doc_comment = doc;
                program.externs.push(ext);
                continue;
            }

            state.set_pos(at_pos);
        }

        // @static annotation (methods only, before visibility)
        let mut is_static = false;

        if state.check(TokenKind::At) {
            let at_pos = state.get_pos();
            state.advance();

            if state.check(TokenKind::Static) {
                state.advance();
                is_static = true;
            } else {
                state.set_pos(at_pos);
            }
        }

        let visibility = parse_visibility(state);

        if state.check(TokenKind::Fn) {
            let mut func = parse_function(state, visibility)?;
            func.doc_comment = doc;
            program.functions.push(func);
            continue;
        }

        if state.check(TokenKind::Const) {
            program.constants.push(parse_const_decl(state)?);
            continue;
        }

        if !state.check(TokenKind::Ident) {
            if state.check(TokenKind::Eof) {
                break;
            }

            state.advance();
            continue;
        }

        // Name :: struct { ... } / Name :: err { ... } / Name :: method(...)
        let saved = state.get_pos();
        let name = state.current().lexeme.clone();
        state.advance();

        if !state.check(TokenKind::DoubleColon) {
            state.set_pos(saved);
            state.advance();
            continue;
        }

        state.advance();

        if state.check(TokenKind::Struct) {
            let mut def = parse_struct_def(state, name, visibility)?;
            def.doc_comment = doc;
            program.structs.push(def);
            continue;
        }

        if state.check(TokenKind::Err) {
            let mut def = parse_error_def(state, name, visibility)?;
            def.doc_comment = doc;
            program.errors.push(def);
            continue;
        }

        if state.check(TokenKind::Ident) {
            let mut def = parse_method_def(state, name, visibility, is_static)?;
            def.doc_comment = doc;
            program.methods.push(def);
            continue;
        }

        state.set_pos(saved);
        state.advance();
    }

    Ok(program)
}

/// `import path.to.module;`; the last path segment becomes the alias.
fn parse_import(state: &mut ParserState) -> Result<ImportStmt, ParseError> {
    let import_tok = state.consume(TokenKind::Import)?;

    let mut module_path = state.consume(TokenKind::Ident)?.lexeme;

    while state.check(TokenKind::Dot) {
        state.advance();
        module_path += ".";
        module_path += &state.consume(TokenKind::Ident)?.lexeme;
    }

    state.consume(TokenKind::Semicolon)?;

    let alias = module_path
        .rsplit('.')
        .next()
        .unwrap_or(module_path.as_str())
        .to_owned();

    state.imported_modules.insert(alias.clone());

    Ok(ImportStmt {
        module_path,
        alias,
        line: import_tok.line,
    })
}

/// `using module.member, module.member2;` or `using module.*;`.
fn parse_using(state: &mut ParserState) -> Result<UsingStmt, ParseError> {
    let using_tok = state.consume(TokenKind::Using)?;

    let mut stmt = UsingStmt {
        line: using_tok.line,
        ..UsingStmt::default()
    };

    let module_alias = state.consume(TokenKind::Ident)?.lexeme;
    state.consume(TokenKind::Dot)?;

    if state.check(TokenKind::Star) {
        state.advance();
        stmt.is_wildcard = true;
        stmt.wildcard_module = module_alias;
        state.has_wildcard_using = true;
        state.consume(TokenKind::Semicolon)?;
        return Ok(stmt);
    }

    let member_name = state.consume(TokenKind::Ident)?.lexeme;

    state.using_aliases.push(UsingAlias {
        local_name: member_name.clone(),
        module_alias: module_alias.clone(),
        member_name: member_name.clone(),
    });
    stmt.members.push(UsingMember {
        module_alias,
        member_name,
    });

    while state.check(TokenKind::Comma) {
        state.advance();

        let module_alias = state.consume(TokenKind::Ident)?.lexeme;
        state.consume(TokenKind::Dot)?;
        let member_name = state.consume(TokenKind::Ident)?.lexeme;

        state.using_aliases.push(UsingAlias {
            local_name: member_name.clone(),
            module_alias: module_alias.clone(),
            member_name: member_name.clone(),
        });
        stmt.members.push(UsingMember {
            module_alias,
            member_name,
        });
    }

    state.consume(TokenKind::Semicolon)?;
    Ok(stmt)
}

/// Parameter list. Function parameters are type-first (`int a, str b`);
/// methods take a bare `self` first parameter whose type is the struct.
fn parse_params(state: &mut ParserState) -> Result<Vec<Param>, ParseError> {
    state.consume(TokenKind::LParen)?;

    let mut params = vec![];

    while !state.check(TokenKind::RParen) && !state.check(TokenKind::Eof) {
        if state.check(TokenKind::Ident)
            && state.current().lexeme == "self"
            && (state.check_ahead(1, TokenKind::Comma) || state.check_ahead(1, TokenKind::RParen))
        {
            state.advance();
            params.push(Param {
                type_name: String::new(),
                name: "self".into(),
            });
        } else {
            let type_name = parse_type(state)?;
            let name = state.consume(TokenKind::Ident)?.lexeme;
            params.push(Param { type_name, name });
        }

        if state.check(TokenKind::Comma) {
            state.advance();
        }
    }

    state.consume(TokenKind::RParen)?;
    Ok(params)
}

/// `-> T` and the fallibility clause `or err` / `or ErrorType`.
fn parse_signature_suffix(state: &mut ParserState) -> Result<(String, String), ParseError> {
    let mut return_type = String::new();
    let mut error_type = String::new();

    if state.check(TokenKind::Arrow) {
        state.advance();
        return_type = parse_type(state)?;
    }

    if state.check(TokenKind::Or) {
        state.advance();

        if state.check(TokenKind::Err) {
            state.advance();
            error_type = "err".into();
        } else {
            error_type = state.consume(TokenKind::Ident)?.lexeme;
        }
    }

    Ok((return_type, error_type))
}

fn parse_function(state: &mut ParserState, visibility: Visibility) -> Result<FunctionDef, ParseError> {
    let fn_tok = state.consume(TokenKind::Fn)?;
    let name = state.consume(TokenKind::Ident)?.lexeme;
    let params = parse_params(state)?;
    let (return_type, error_type) = parse_signature_suffix(state)?;
    let body = parse_block(state)?;
    let is_async = body_uses_async(&body);

    Ok(FunctionDef {
        name,
        params,
        return_type,
        error_type,
        is_async,
        visibility,
        doc_comment: String::new(),
        body,
        line: fn_tok.line,
    })
}

fn parse_fields(state: &mut ParserState) -> Result<Vec<StructField>, ParseError> {
    state.consume(TokenKind::LBrace)?;

    let mut fields = vec![];

    while !state.check(TokenKind::RBrace) && !state.check(TokenKind::Eof) {
        let doc_comment = collect_doc_comments(state);
        let name = state.consume(TokenKind::Ident)?.lexeme;
        let type_name = parse_type(state)?;

        fields.push(StructField {
            name,
            type_name,
            doc_comment,
        });

        if state.check(TokenKind::Comma) {
            state.advance();
        }
    }

    state.consume(TokenKind::RBrace)?;
    Ok(fields)
}

fn parse_struct_def(
    state: &mut ParserState,
    name: String,
    visibility: Visibility,
) -> Result<StructDef, ParseError> {
    let struct_tok = state.consume(TokenKind::Struct)?;
    state.struct_names.insert(name.clone());
    let fields = parse_fields(state)?;

    Ok(StructDef {
        name,
        fields,
        visibility,
        doc_comment: String::new(),
        line: struct_tok.line,
    })
}

fn parse_error_def(
    state: &mut ParserState,
    name: String,
    visibility: Visibility,
) -> Result<ErrorDef, ParseError> {
    let err_tok = state.consume(TokenKind::Err)?;
    state.struct_names.insert(name.clone());
    let fields = parse_fields(state)?;

    Ok(ErrorDef {
        name,
        fields,
        visibility,
        doc_comment: String::new(),
        line: err_tok.line,
    })
}

fn parse_method_def(
    state: &mut ParserState,
    struct_name: String,
    visibility: Visibility,
    is_static: bool,
) -> Result<MethodDef, ParseError> {
    let name_tok = state.consume(TokenKind::Ident)?;
    let mut params = parse_params(state)?;

    // The bare `self` parameter carries the struct type.
    for param in &mut params {
        if param.name == "self" && param.type_name.is_empty() {
            param.type_name = struct_name.clone();
        }
    }

    let (return_type, error_type) = parse_signature_suffix(state)?;
    let body = parse_block(state)?;
    let is_async = body_uses_async(&body);

    Ok(MethodDef {
        struct_name,
        name: name_tok.lexeme,
        params,
        return_type,
        error_type,
        is_static,
        is_async,
        visibility,
        doc_comment: String::new(),
        body,
        line: name_tok.line,
    })
}

/// `@extern("lib") fn name(params) -> T;`. Externs are part of the module
/// surface, so they default to public.
fn parse_extern_function(
    state: &mut ParserState,
    library: String,
) -> Result<ExternFunctionDef, ParseError> {
    let fn_tok = state.consume(TokenKind::Fn)?;
    let name = state.consume(TokenKind::Ident)?.lexeme;
    let params = parse_params(state)?;

    let mut return_type = String::new();

    if state.check(TokenKind::Arrow) {
        state.advance();
        return_type = parse_type(state)?;
    }

    state.consume(TokenKind::Semicolon)?;

    Ok(ExternFunctionDef {
        name,
        params,
        return_type,
        library,
        visibility: Visibility::Public,
        doc_comment: String::new(),
        line: fn_tok.line,
    })
}

/// Whether a body syntactically uses the cooperative-task constructs
/// (await, channel creation, go, select). Recorded on the definition for
/// the module surface contract.
fn body_uses_async(body: &[Node]) -> bool {
    body.iter().any(node_uses_async)
}

fn node_uses_async(node: &Node) -> bool {
    match node {
        Node::AwaitExpr { .. }
        | Node::ChannelCreate { .. }
        | Node::GoSpawn { .. }
        | Node::SelectStmt { .. } => true,

        Node::ListLiteral { elements, line: _ }
        | Node::SetLiteral { elements, line: _ }
        | Node::TupleCreate { elements, .. } => elements.iter().any(node_uses_async),

        Node::MapLiteral { entries, .. } => entries
            .iter()
            .any(|(k, v)| node_uses_async(k) || node_uses_async(v)),

        Node::FieldAccess { object, .. } => node_uses_async(object),
        Node::FieldAssignment { object, value, .. } => {
            node_uses_async(object) || node_uses_async(value)
        }
        Node::AddressOf { value, .. }
        | Node::NotExpr { value, .. }
        | Node::NegateExpr { value, .. }
        | Node::ParenExpr { value, .. }
        | Node::IsNone { value, .. }
        | Node::FailStmt { value, .. }
        | Node::Assignment { value, .. } => node_uses_async(value),

        Node::FunctionCall { args, .. } => args.iter().any(node_uses_async),
        Node::MethodCall { object, args, .. } => {
            node_uses_async(object) || args.iter().any(node_uses_async)
        }
        Node::LambdaCall { callee, args, .. } => {
            node_uses_async(callee) || args.iter().any(node_uses_async)
        }

        Node::BinaryExpr { left, right, .. } => node_uses_async(left) || node_uses_async(right),

        Node::PairCreate { first, second, .. } => {
            node_uses_async(first) || node_uses_async(second)
        }

        Node::VariableDecl { value, .. } => node_uses_async(value),
        Node::ReturnStmt { value, .. } => value.as_deref().is_some_and(node_uses_async),

        Node::IfStmt {
            condition,
            then_body,
            else_body,
            ..
        } => {
            node_uses_async(condition)
                || then_body.iter().any(node_uses_async)
                || else_body.iter().any(node_uses_async)
        }
        Node::WhileStmt {
            condition, body, ..
        } => node_uses_async(condition) || body.iter().any(node_uses_async),
        Node::ForStmt {
            range_start,
            range_end,
            iterable,
            body,
            ..
        } => {
            range_start.as_deref().is_some_and(node_uses_async)
                || range_end.as_deref().is_some_and(node_uses_async)
                || iterable.as_deref().is_some_and(node_uses_async)
                || body.iter().any(node_uses_async)
        }
        Node::WithStmt { resource, body, .. } => {
            node_uses_async(resource) || body.iter().any(node_uses_async)
        }
        Node::LambdaExpr { body, .. } => body.iter().any(node_uses_async),

        Node::OrExpr { expr, handler, .. } => {
            node_uses_async(expr)
                || match handler {
                    OrHandler::Return(value) => value.as_deref().is_some_and(node_uses_async),
                    OrHandler::Fail(value) => node_uses_async(value),
                    OrHandler::Block(body) => body.iter().any(node_uses_async),
                    OrHandler::Match(arms) => arms.iter().any(|arm| node_uses_async(&arm.body)),
                    OrHandler::Continue | OrHandler::Break => false,
                }
        }
        Node::DefaultExpr { expr, fallback, .. } => {
            node_uses_async(expr) || node_uses_async(fallback)
        }

        Node::StructLiteral { field_values, .. } => {
            field_values.iter().any(|(_, v)| node_uses_async(v))
        }

        _ => false,
    }
}
