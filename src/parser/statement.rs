//! Statement parsing.
//!
//! Statements dispatch on their first token. Assignments, qualified calls,
//! field assignments, method-call statements, declarations and bare
//! or-expression statements all start with an identifier; those are
//! discriminated with bounded lookahead before falling back to an
//! expression statement.

use crate::lexer::TokenKind;

use super::{
    ast::*,
    expression::{parse_comparison, parse_expression},
    types::{is_type_token, parse_type},
    ParseError, ParserState,
};

pub fn parse_statement(state: &mut ParserState) -> Result<Node, ParseError> {
    match state.current().kind {
        TokenKind::Return => parse_return(state),
        TokenKind::Fail => parse_fail(state),
        TokenKind::Continue => {
            let line = state.current().line;
            state.advance();
            state.consume(TokenKind::Semicolon)?;
            Ok(Node::ContinueStmt { line })
        }
        TokenKind::Break => {
            let line = state.current().line;
            state.advance();
            state.consume(TokenKind::Semicolon)?;
            Ok(Node::BreakStmt { line })
        }
        TokenKind::If => parse_if(state),
        TokenKind::While => parse_while(state),
        TokenKind::For => parse_for(state),
        TokenKind::Select => parse_select(state),
        TokenKind::With => parse_with(state),
        TokenKind::Go => parse_go_spawn(state),
        TokenKind::Const => parse_const_decl(state),

        _ if is_type_token(state) => parse_primitive_decl(state, false),

        // Function-type variable: fn(int, int) -> int op = ...;
        TokenKind::Fn if state.check_ahead(1, TokenKind::LParen) => {
            parse_prefixed_type_decl(state)
        }

        // Container-typed variable: List<int> nums = [1, 2, 3]; etc.
        TokenKind::Channel
        | TokenKind::List
        | TokenKind::Map
        | TokenKind::Set
        | TokenKind::Pair
        | TokenKind::Tuple
        | TokenKind::Deque
        | TokenKind::Stack
        | TokenKind::Queue
        | TokenKind::PriorityQueue => parse_prefixed_type_decl(state),

        TokenKind::Ident => parse_identifier_statement(state),

        _ => parse_expression_statement(state),
    }
}

/// Braced statement list: `{ stmt* }`.
pub fn parse_block(state: &mut ParserState) -> Result<Vec<Node>, ParseError> {
    state.consume(TokenKind::LBrace)?;

    let mut body = vec![];

    while !state.check(TokenKind::RBrace) && !state.check(TokenKind::Eof) {
        body.push(parse_statement(state)?);
    }

    state.consume(TokenKind::RBrace)?;
    Ok(body)
}

fn parse_expression_statement(state: &mut ParserState) -> Result<Node, ParseError> {
    let expr = parse_expression(state)?;
    state.consume(TokenKind::Semicolon)?;
    Ok(expr)
}

fn parse_return(state: &mut ParserState) -> Result<Node, ParseError> {
    let return_tok = state.consume(TokenKind::Return)?;

    let value = if state.check(TokenKind::Semicolon) {
        None
    } else {
        Some(Box::new(parse_expression(state)?))
    };

    state.consume(TokenKind::Semicolon)?;

    Ok(Node::ReturnStmt {
        value,
        line: return_tok.line,
    })
}

/// The error value of a `fail`. `fail err` re-raises the bound error;
/// `fail Name` with `Name` a known error type and no following `{` is a
/// bare-error literal with defaulted fields.
pub fn parse_fail_value(state: &mut ParserState) -> Result<Node, ParseError> {
    if state.check(TokenKind::Err) {
        let line = state.current().line;
        state.advance();

        return Ok(Node::VariableRef {
            name: "err".into(),
            line,
        });
    }

    if state.check(TokenKind::Ident) {
        let tok = state.current();

        if state.is_struct_type(&tok.lexeme) && !state.check_ahead(1, TokenKind::LBrace) {
            state.advance();

            return Ok(Node::StructLiteral {
                struct_name: tok.lexeme,
                field_values: vec![],
                line: tok.line,
            });
        }
    }

    parse_comparison(state)
}

fn parse_fail(state: &mut ParserState) -> Result<Node, ParseError> {
    let fail_tok = state.consume(TokenKind::Fail)?;
    let value = parse_fail_value(state)?;
    state.consume(TokenKind::Semicolon)?;

    Ok(Node::FailStmt {
        value: Box::new(value),
        line: fail_tok.line,
    })
}

/// `if cond { ... } else { ... }`, including the braceless single-statement
/// form and `else if` chaining.
fn parse_if(state: &mut ParserState) -> Result<Node, ParseError> {
    let if_tok = state.consume(TokenKind::If)?;
    let condition = parse_expression(state)?;

    let then_body = if state.check(TokenKind::LBrace) {
        parse_block(state)?
    } else {
        vec![parse_statement(state)?]
    };

    let mut else_body = vec![];

    if state.check(TokenKind::Else) {
        state.advance();

        if state.check(TokenKind::LBrace) {
            else_body = parse_block(state)?;
        } else if state.check(TokenKind::If) {
            else_body.push(parse_if(state)?);
        } else {
            else_body.push(parse_statement(state)?);
        }
    }

    Ok(Node::IfStmt {
        condition: Box::new(condition),
        then_body,
        else_body,
        line: if_tok.line,
    })
}

fn parse_while(state: &mut ParserState) -> Result<Node, ParseError> {
    let while_tok = state.consume(TokenKind::While)?;
    let condition = parse_expression(state)?;
    let body = parse_block(state)?;

    Ok(Node::WhileStmt {
        condition: Box::new(condition),
        body,
        line: while_tok.line,
    })
}

/// `for i in a..b { ... }` (numeric range) or `for x in expr { ... }`
/// (iterable).
fn parse_for(state: &mut ParserState) -> Result<Node, ParseError> {
    let for_tok = state.consume(TokenKind::For)?;
    let loop_var = state.consume(TokenKind::Ident)?.lexeme;
    state.consume(TokenKind::In)?;

    let first = parse_expression(state)?;

    if state.check(TokenKind::DotDot) {
        state.advance();
        let end = parse_expression(state)?;
        let body = parse_block(state)?;

        return Ok(Node::ForStmt {
            kind: ForKind::Range,
            loop_var,
            range_start: Some(Box::new(first)),
            range_end: Some(Box::new(end)),
            iterable: None,
            body,
            line: for_tok.line,
        });
    }

    let body = parse_block(state)?;

    Ok(Node::ForStmt {
        kind: ForKind::Each,
        loop_var,
        range_start: None,
        range_end: None,
        iterable: Some(Box::new(first)),
        body,
        line: for_tok.line,
    })
}

/// `select { v := ch.recv() => { ... } ... }` over channel receives.
fn parse_select(state: &mut ParserState) -> Result<Node, ParseError> {
    let select_tok = state.consume(TokenKind::Select)?;
    state.consume(TokenKind::LBrace)?;

    let mut arms = vec![];

    while !state.check(TokenKind::RBrace) && !state.check(TokenKind::Eof) {
        let line = state.current().line;

        let binding = if state.check(TokenKind::Ident)
            && state.check_ahead(1, TokenKind::ColonAssign)
        {
            let name = state.consume(TokenKind::Ident)?.lexeme;
            state.advance();
            Some(name)
        } else {
            None
        };

        let channel = parse_expression(state)?;
        state.consume(TokenKind::FatArrow)?;
        let body = parse_block(state)?;

        arms.push(SelectArm {
            binding,
            channel: Box::new(channel),
            body,
            line,
        });
    }

    state.consume(TokenKind::RBrace)?;

    Ok(Node::SelectStmt {
        arms,
        line: select_tok.line,
    })
}

/// `with expr as name { body }` scoped resource acquisition.
fn parse_with(state: &mut ParserState) -> Result<Node, ParseError> {
    let with_tok = state.consume(TokenKind::With)?;
    let resource = parse_expression(state)?;
    state.consume(TokenKind::As)?;
    let binding = state.consume(TokenKind::Ident)?.lexeme;
    let body = parse_block(state)?;

    Ok(Node::WithStmt {
        resource: Box::new(resource),
        binding,
        body,
        line: with_tok.line,
    })
}

fn parse_go_spawn(state: &mut ParserState) -> Result<Node, ParseError> {
    let go_tok = state.consume(TokenKind::Go)?;
    let call = parse_expression(state)?;
    state.consume(TokenKind::Semicolon)?;

    Ok(Node::GoSpawn {
        call: Box::new(call),
        line: go_tok.line,
    })
}

/// Typed declaration starting with a primitive type keyword:
/// `int x = 5;` or `str? name = maybe();`.
fn parse_primitive_decl(state: &mut ParserState, is_const: bool) -> Result<Node, ParseError> {
    let tok = state.current();
    let type_name = tok
        .kind
        .type_name()
        .expect("caller checked for a type token")
        .to_owned();
    state.advance();

    finish_typed_decl(state, type_name, is_const, tok.line)
}

/// Declaration whose type is written with a container or function-type
/// prefix (`List<int> xs = ...`, `fn(int) -> int op = ...`). When no
/// variable name follows the parsed type this was actually an expression
/// statement (e.g. `Channel<int>();`) and the cursor is rewound.
fn parse_prefixed_type_decl(state: &mut ParserState) -> Result<Node, ParseError> {
    let saved = state.get_pos();
    let line = state.current().line;
    let type_name = parse_type(state)?;

    if state.check(TokenKind::Ident) || state.check(TokenKind::Optional) {
        return finish_typed_decl(state, type_name, false, line);
    }

    state.set_pos(saved);
    parse_expression_statement(state)
}

fn finish_typed_decl(
    state: &mut ParserState,
    type_name: String,
    is_const: bool,
    line: usize,
) -> Result<Node, ParseError> {
    let mut is_optional = false;

    if state.check(TokenKind::Optional) {
        is_optional = true;
        state.advance();
    }

    let name = state.consume(TokenKind::Ident)?.lexeme;
    state.consume(TokenKind::Assign)?;
    let value = parse_expression(state)?;
    state.consume(TokenKind::Semicolon)?;

    Ok(Node::VariableDecl {
        type_name,
        name,
        value: Box::new(value),
        is_optional,
        is_const,
        line,
    })
}

/// `name := expr;`
fn parse_inferred_decl(state: &mut ParserState, is_const: bool) -> Result<Node, ParseError> {
    let name_tok = state.consume(TokenKind::Ident)?;
    state.consume(TokenKind::ColonAssign)?;
    let value = parse_expression(state)?;
    state.consume(TokenKind::Semicolon)?;

    Ok(Node::VariableDecl {
        type_name: String::new(),
        name: name_tok.lexeme,
        value: Box::new(value),
        is_optional: false,
        is_const,
        line: name_tok.line,
    })
}

/// `const int x = 5;` or `const x := 5;`
pub fn parse_const_decl(state: &mut ParserState) -> Result<Node, ParseError> {
    let const_tok = state.consume(TokenKind::Const)?;

    if is_type_token(state) {
        return parse_primitive_decl(state, true);
    }

    if state.check(TokenKind::Ident) && state.check_ahead(1, TokenKind::ColonAssign) {
        return parse_inferred_decl(state, true);
    }

    Err(ParseError::new(
        format!(
            "expected type or identifier after 'const' at line {}",
            const_tok.line
        ),
        const_tok.line,
    ))
}

/// Identifier-headed statement dispatch: inferred declaration, struct-typed
/// declaration, qualified declaration, field assignment, plain assignment;
/// everything else (calls, bare or-expressions, postfix chains) falls
/// through to an expression statement.
fn parse_identifier_statement(state: &mut ParserState) -> Result<Node, ParseError> {
    let saved = state.get_pos();
    let ident_tok = state.current();
    let ident = ident_tok.lexeme.clone();
    state.advance();

    if state.check(TokenKind::ColonAssign) {
        state.set_pos(saved);
        return parse_inferred_decl(state, false);
    }

    // struct-typed variable: Person p = ..., Person? p = ..., Person* p = ...
    if state.is_struct_type(&ident) {
        let pointer = state.check(TokenKind::Star) && state.check_ahead(1, TokenKind::Ident);

        if state.check(TokenKind::Ident) || state.check(TokenKind::Optional) || pointer {
            let mut type_name = ident;

            if pointer {
                state.advance();
                type_name.push('*');
            }

            return finish_typed_decl(state, type_name, false, ident_tok.line);
        }
    }

    // qualified: module.Type var = ... (qualified calls fall through to the
    // expression statement below)
    if state.check(TokenKind::Dot)
        && state.is_imported_module(&ident)
        && state.check_ahead(1, TokenKind::Ident)
    {
        state.advance();
        let member = state.consume(TokenKind::Ident)?;

        let pointer = state.check(TokenKind::Star) && state.check_ahead(1, TokenKind::Ident);

        if state.check(TokenKind::Ident) || state.check(TokenKind::Optional) || pointer {
            let mut type_name = format!("{ident}.{}", member.lexeme);

            if pointer {
                state.advance();
                type_name.push('*');
            }

            return finish_typed_decl(state, type_name, false, ident_tok.line);
        }

        state.set_pos(saved);
        return parse_expression_statement(state);
    }

    // field assignment: obj.field = value;
    if state.check(TokenKind::Dot)
        && state.check_ahead(1, TokenKind::Ident)
        && state.check_ahead(2, TokenKind::Assign)
    {
        state.advance();
        let field_tok = state.consume(TokenKind::Ident)?;
        state.consume(TokenKind::Assign)?;
        let value = parse_expression(state)?;
        state.consume(TokenKind::Semicolon)?;

        return Ok(Node::FieldAssignment {
            id: state.next_id(),
            object: Box::new(Node::VariableRef {
                name: ident,
                line: ident_tok.line,
            }),
            field: field_tok.lexeme,
            value: Box::new(value),
            line: field_tok.line,
        });
    }

    // assignment: x = expr;
    if state.check(TokenKind::Assign) {
        state.advance();
        let value = parse_expression(state)?;
        state.consume(TokenKind::Semicolon)?;

        return Ok(Node::Assignment {
            name: ident,
            value: Box::new(value),
            line: ident_tok.line,
        });
    }

    state.set_pos(saved);
    parse_expression_statement(state)
}
