//! Expression parsing.
//!
//! Precedence climbing: or/default handlers bind loosest, then comparison,
//! additive, multiplicative, unary, primary. Postfix chains `.field`,
//! `.method(args)` and immediate invocation `expr(args)` in one loop, so
//! `a.b.c().d(x)(y)` parses in the natural sense.

use crate::lexer::TokenKind;

use super::{
    ast::*,
    statement,
    types::parse_type,
    ParseError, ParserState,
};

pub fn parse_expression(state: &mut ParserState) -> Result<Node, ParseError> {
    let expr = parse_comparison(state)?;

    if state.check(TokenKind::Or) {
        let line = state.current().line;
        state.advance();
        let handler = parse_or_handler(state)?;

        return Ok(Node::OrExpr {
            expr: Box::new(expr),
            handler,
            line,
        });
    }

    if state.check(TokenKind::Default) {
        let line = state.current().line;
        state.advance();
        let fallback = parse_comparison(state)?;

        return Ok(Node::DefaultExpr {
            expr: Box::new(expr),
            fallback: Box::new(fallback),
            line,
        });
    }

    Ok(expr)
}

/// Parses the handler after `or`: one of `return [v]`, `fail <e>`,
/// `continue`, `break`, `{ block }` or `match err { arms }`.
fn parse_or_handler(state: &mut ParserState) -> Result<OrHandler, ParseError> {
    if state.check(TokenKind::Return) {
        state.advance();

        let value = match state.current().kind {
            TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Comma | TokenKind::Eof => None,
            _ => Some(Box::new(parse_comparison(state)?)),
        };

        return Ok(OrHandler::Return(value));
    }

    if state.check(TokenKind::Fail) {
        state.advance();
        let value = statement::parse_fail_value(state)?;
        return Ok(OrHandler::Fail(Box::new(value)));
    }

    if state.check(TokenKind::Continue) {
        state.advance();
        return Ok(OrHandler::Continue);
    }

    if state.check(TokenKind::Break) {
        state.advance();
        return Ok(OrHandler::Break);
    }

    if state.check(TokenKind::LBrace) {
        let body = statement::parse_block(state)?;
        return Ok(OrHandler::Block(body));
    }

    if state.check(TokenKind::Match) {
        state.advance();
        state.consume(TokenKind::Err)?;
        state.consume(TokenKind::LBrace)?;

        let mut arms = vec![];

        while !state.check(TokenKind::RBrace) && !state.check(TokenKind::Eof) {
            let error_type = state.consume(TokenKind::Ident)?.lexeme;
            state.consume(TokenKind::FatArrow)?;

            let body = if state.check(TokenKind::Fail) {
                state.advance();
                let value = statement::parse_fail_value(state)?;
                let line = value.line();
                Node::FailStmt {
                    value: Box::new(value),
                    line,
                }
            } else {
                parse_comparison(state)?
            };

            arms.push(OrMatchArm {
                error_type,
                body: Box::new(body),
            });

            if state.check(TokenKind::Comma) {
                state.advance();
            }
        }

        state.consume(TokenKind::RBrace)?;
        return Ok(OrHandler::Match(arms));
    }

    Err(ParseError::unexpected(&state.current()))
}

/// Comparison level: `is none` and the chainable comparison operators.
pub fn parse_comparison(state: &mut ParserState) -> Result<Node, ParseError> {
    let mut left = parse_additive(state)?;

    if state.check(TokenKind::Is) {
        let line = state.current().line;
        state.advance();
        state.consume(TokenKind::None)?;

        return Ok(Node::IsNone {
            value: Box::new(left),
            line,
        });
    }

    while matches!(
        state.current().kind,
        TokenKind::EqEq
            | TokenKind::Ne
            | TokenKind::Lt
            | TokenKind::Gt
            | TokenKind::Le
            | TokenKind::Ge
    ) {
        let op_tok = state.current();
        state.advance();
        let right = parse_additive(state)?;

        left = Node::BinaryExpr {
            op: op_tok.lexeme,
            left: Box::new(left),
            right: Box::new(right),
            line: op_tok.line,
        };
    }

    Ok(left)
}

fn parse_additive(state: &mut ParserState) -> Result<Node, ParseError> {
    let mut left = parse_multiplicative(state)?;

    while matches!(state.current().kind, TokenKind::Plus | TokenKind::Minus) {
        let op_tok = state.current();
        state.advance();
        let right = parse_multiplicative(state)?;

        left = Node::BinaryExpr {
            op: op_tok.lexeme,
            left: Box::new(left),
            right: Box::new(right),
            line: op_tok.line,
        };
    }

    Ok(left)
}

fn parse_multiplicative(state: &mut ParserState) -> Result<Node, ParseError> {
    let mut left = parse_unary(state)?;

    while matches!(state.current().kind, TokenKind::Star | TokenKind::Slash) {
        let op_tok = state.current();
        state.advance();
        let right = parse_unary(state)?;

        left = Node::BinaryExpr {
            op: op_tok.lexeme,
            left: Box::new(left),
            right: Box::new(right),
            line: op_tok.line,
        };
    }

    Ok(left)
}

/// Unary level: `!expr`, `-expr` (always negation at the start of a
/// primary), `&expr` and `await expr`.
fn parse_unary(state: &mut ParserState) -> Result<Node, ParseError> {
    let tok = state.current();

    match tok.kind {
        TokenKind::Not => {
            state.advance();
            let value = parse_unary(state)?;

            Ok(Node::NotExpr {
                value: Box::new(value),
                line: tok.line,
            })
        }
        TokenKind::Minus => {
            state.advance();
            let value = parse_unary(state)?;

            Ok(Node::NegateExpr {
                value: Box::new(value),
                line: tok.line,
            })
        }
        TokenKind::Ampersand => {
            state.advance();
            let value = parse_unary(state)?;

            Ok(Node::AddressOf {
                value: Box::new(value),
                line: tok.line,
            })
        }
        TokenKind::Await => {
            state.advance();
            let inner = parse_primary(state)?;
            let value = parse_postfix(state, inner)?;

            Ok(Node::AwaitExpr {
                value: Box::new(value),
                line: tok.line,
            })
        }
        _ => {
            let primary = parse_primary(state)?;
            parse_postfix(state, primary)
        }
    }
}

/// Postfix chain: field access, method calls and immediate invocation.
pub fn parse_postfix(state: &mut ParserState, mut left: Node) -> Result<Node, ParseError> {
    loop {
        if state.check(TokenKind::Dot) && state.check_ahead(1, TokenKind::Ident) {
            state.advance();
            let member = state.consume(TokenKind::Ident)?;

            if state.check(TokenKind::LParen) {
                let args = parse_call_args(state)?;

                left = Node::MethodCall {
                    id: state.next_id(),
                    object: Box::new(left),
                    method: member.lexeme,
                    args,
                    line: member.line,
                };
            } else {
                left = Node::FieldAccess {
                    id: state.next_id(),
                    object: Box::new(left),
                    field: member.lexeme,
                    line: member.line,
                };
            }

            continue;
        }

        // Immediate invocation of an expression-valued function. Plain
        // `name(args)` is consumed by the primary parser, so this only
        // fires for chained calls like `make_adder(1)(2)`.
        if state.check(TokenKind::LParen) {
            let line = state.current().line;
            let args = parse_call_args(state)?;

            left = Node::LambdaCall {
                callee: Box::new(left),
                args,
                line,
            };

            continue;
        }

        return Ok(left);
    }
}

/// Parses a parenthesised, comma-separated argument list.
pub fn parse_call_args(state: &mut ParserState) -> Result<Vec<Node>, ParseError> {
    state.consume(TokenKind::LParen)?;

    let mut args = vec![];

    while !state.check(TokenKind::RParen) && !state.check(TokenKind::Eof) {
        args.push(parse_expression(state)?);

        if state.check(TokenKind::Comma) {
            state.advance();
        }
    }

    state.consume(TokenKind::RParen)?;
    Ok(args)
}

fn parse_primary(state: &mut ParserState) -> Result<Node, ParseError> {
    let tok = state.current();

    match tok.kind {
        TokenKind::LParen => {
            let lparen = state.consume(TokenKind::LParen)?;

            // Disallow empty parentheses so ')' is not swallowed as part of
            // an invalid expression.
            if state.check(TokenKind::RParen) {
                return Err(ParseError::new(
                    format!("expected expression after '(' at line {}", lparen.line),
                    lparen.line,
                ));
            }

            let value = parse_expression(state)?;
            state.consume(TokenKind::RParen)?;

            Ok(Node::ParenExpr {
                value: Box::new(value),
                line: lparen.line,
            })
        }

        TokenKind::Channel
        | TokenKind::List
        | TokenKind::Map
        | TokenKind::Set
        | TokenKind::Pair
        | TokenKind::Tuple
        | TokenKind::Deque
        | TokenKind::Stack
        | TokenKind::Queue
        | TokenKind::PriorityQueue => parse_container_create(state),

        TokenKind::LBracket => {
            state.advance();

            let mut elements = vec![];

            while !state.check(TokenKind::RBracket) && !state.check(TokenKind::Eof) {
                elements.push(parse_expression(state)?);

                if state.check(TokenKind::Comma) {
                    state.advance();
                }
            }

            state.consume(TokenKind::RBracket)?;

            Ok(Node::ListLiteral {
                elements,
                line: tok.line,
            })
        }

        TokenKind::LBrace => parse_brace_literal(state),

        TokenKind::Number => {
            state.advance();
            Ok(Node::NumberLiteral {
                value: tok.lexeme,
                line: tok.line,
            })
        }
        TokenKind::Float => {
            state.advance();
            Ok(Node::FloatLiteral {
                value: tok.lexeme,
                line: tok.line,
            })
        }
        TokenKind::String => {
            state.advance();
            Ok(Node::StringLiteral {
                value: tok.lexeme,
                line: tok.line,
            })
        }
        TokenKind::True => {
            state.advance();
            Ok(Node::BoolLiteral {
                value: true,
                line: tok.line,
            })
        }
        TokenKind::False => {
            state.advance();
            Ok(Node::BoolLiteral {
                value: false,
                line: tok.line,
            })
        }
        TokenKind::None => {
            state.advance();
            Ok(Node::NoneLiteral { line: tok.line })
        }

        // `err` is an ordinary value inside or-handler bodies; the type
        // checker validates the binding.
        TokenKind::Err => {
            state.advance();
            Ok(Node::VariableRef {
                name: "err".into(),
                line: tok.line,
            })
        }

        TokenKind::Fn => parse_lambda(state),

        TokenKind::Ident => parse_identifier_expression(state),

        _ => Err(ParseError::unexpected(&tok)),
    }
}

/// `{k: v, ...}` map literal or `{a, b, ...}` set literal. An empty brace
/// literal parses as a map literal; the type checker rejects it.
fn parse_brace_literal(state: &mut ParserState) -> Result<Node, ParseError> {
    let lbrace = state.consume(TokenKind::LBrace)?;

    if state.check(TokenKind::RBrace) {
        state.advance();
        return Ok(Node::MapLiteral {
            entries: vec![],
            line: lbrace.line,
        });
    }

    let first = parse_expression(state)?;

    if state.check(TokenKind::Colon) {
        state.advance();
        let first_value = parse_expression(state)?;
        let mut entries = vec![(first, first_value)];

        while state.check(TokenKind::Comma) {
            state.advance();

            if state.check(TokenKind::RBrace) {
                break;
            }

            let key = parse_expression(state)?;
            state.consume(TokenKind::Colon)?;
            let value = parse_expression(state)?;
            entries.push((key, value));
        }

        state.consume(TokenKind::RBrace)?;

        return Ok(Node::MapLiteral {
            entries,
            line: lbrace.line,
        });
    }

    let mut elements = vec![first];

    while state.check(TokenKind::Comma) {
        state.advance();

        if state.check(TokenKind::RBrace) {
            break;
        }

        elements.push(parse_expression(state)?);
    }

    state.consume(TokenKind::RBrace)?;

    Ok(Node::SetLiteral {
        elements,
        line: lbrace.line,
    })
}

fn parse_container_create(state: &mut ParserState) -> Result<Node, ParseError> {
    let tok = state.current();
    let line = tok.line;
    state.advance();
    state.consume(TokenKind::Lt)?;

    match tok.kind {
        TokenKind::Map => {
            let key_type = parse_type(state)?;
            state.consume(TokenKind::Comma)?;
            let value_type = parse_type(state)?;
            state.consume(TokenKind::Gt)?;
            state.consume(TokenKind::LParen)?;
            state.consume(TokenKind::RParen)?;

            Ok(Node::MapCreate {
                key_type,
                value_type,
                line,
            })
        }

        TokenKind::Channel => {
            let element_type = parse_type(state)?;
            state.consume(TokenKind::Gt)?;
            state.consume(TokenKind::LParen)?;

            let capacity = if state.check(TokenKind::RParen) {
                None
            } else {
                Some(Box::new(parse_expression(state)?))
            };

            state.consume(TokenKind::RParen)?;

            Ok(Node::ChannelCreate {
                element_type,
                capacity,
                line,
            })
        }

        TokenKind::Pair => {
            let element_type = parse_type(state)?;
            state.consume(TokenKind::Gt)?;
            state.consume(TokenKind::LParen)?;
            let first = parse_expression(state)?;
            state.consume(TokenKind::Comma)?;
            let second = parse_expression(state)?;
            state.consume(TokenKind::RParen)?;

            Ok(Node::PairCreate {
                element_type,
                first: Box::new(first),
                second: Box::new(second),
                line,
            })
        }

        TokenKind::Tuple => {
            let element_type = parse_type(state)?;
            state.consume(TokenKind::Gt)?;
            state.consume(TokenKind::LParen)?;

            let mut elements = vec![];

            while !state.check(TokenKind::RParen) && !state.check(TokenKind::Eof) {
                elements.push(parse_expression(state)?);

                if state.check(TokenKind::Comma) {
                    state.advance();
                }
            }

            state.consume(TokenKind::RParen)?;

            Ok(Node::TupleCreate {
                element_type,
                elements,
                line,
            })
        }

        TokenKind::PriorityQueue => {
            let element_type = parse_type(state)?;
            state.consume(TokenKind::Gt)?;

            // PriorityQueue<T>() is a max heap; PriorityQueue<T>.min()
            // selects min-heap behavior.
            let mut is_min_heap = false;

            if state.check(TokenKind::Dot) {
                state.advance();
                let selector = state.consume(TokenKind::Ident)?;

                if selector.lexeme != "min" {
                    return Err(ParseError::unexpected(&selector));
                }

                is_min_heap = true;
            }

            state.consume(TokenKind::LParen)?;
            state.consume(TokenKind::RParen)?;

            Ok(Node::PriorityQueueCreate {
                element_type,
                is_min_heap,
                line,
            })
        }

        _ => {
            let element_type = parse_type(state)?;
            state.consume(TokenKind::Gt)?;
            state.consume(TokenKind::LParen)?;
            state.consume(TokenKind::RParen)?;

            let node = match tok.kind {
                TokenKind::List => Node::ListCreate { element_type, line },
                TokenKind::Set => Node::SetCreate { element_type, line },
                TokenKind::Deque => Node::DequeCreate { element_type, line },
                TokenKind::Stack => Node::StackCreate { element_type, line },
                TokenKind::Queue => Node::QueueCreate { element_type, line },
                _ => unreachable!("container dispatch covers all kinds"),
            };

            Ok(node)
        }
    }
}

/// Lambda expression: `fn(int a, str b) -> T { body }`.
fn parse_lambda(state: &mut ParserState) -> Result<Node, ParseError> {
    let fn_tok = state.consume(TokenKind::Fn)?;
    state.consume(TokenKind::LParen)?;

    let mut params = vec![];

    while !state.check(TokenKind::RParen) && !state.check(TokenKind::Eof) {
        let type_name = parse_type(state)?;
        let name = state.consume(TokenKind::Ident)?.lexeme;
        params.push(Param { type_name, name });

        if state.check(TokenKind::Comma) {
            state.advance();
        }
    }

    state.consume(TokenKind::RParen)?;

    let mut return_type = String::new();

    if state.check(TokenKind::Arrow) {
        state.advance();
        return_type = parse_type(state)?;
    }

    let body = statement::parse_block(state)?;

    Ok(Node::LambdaExpr {
        params,
        return_type,
        body,
        line: fn_tok.line,
    })
}

/// Identifier-headed primary: qualified references, struct literals,
/// function calls, function references and plain variable references.
fn parse_identifier_expression(state: &mut ParserState) -> Result<Node, ParseError> {
    let tok = state.consume(TokenKind::Ident)?;

    // qualified reference: module.item
    if state.check(TokenKind::Dot)
        && state.is_imported_module(&tok.lexeme)
        && state.check_ahead(1, TokenKind::Ident)
    {
        state.advance();
        let item = state.consume(TokenKind::Ident)?;

        if state.check(TokenKind::LParen) {
            let args = parse_call_args(state)?;

            return Ok(Node::FunctionCall {
                name: format!("{}.{}", tok.lexeme, item.lexeme),
                args,
                line: tok.line,
            });
        }

        if state.check(TokenKind::LBrace) {
            return parse_struct_literal(state, format!("{}.{}", tok.lexeme, item.lexeme));
        }

        return Ok(Node::QualifiedRef {
            module: tok.lexeme,
            name: item.lexeme,
            line: tok.line,
        });
    }

    if state.check(TokenKind::LBrace) && state.is_struct_type(&tok.lexeme) {
        return parse_struct_literal(state, tok.lexeme);
    }

    if state.check(TokenKind::LParen) {
        let args = parse_call_args(state)?;

        return Ok(Node::FunctionCall {
            name: tok.lexeme,
            args,
            line: tok.line,
        });
    }

    if state.is_function_name(&tok.lexeme) {
        return Ok(Node::FunctionRef {
            name: tok.lexeme,
            line: tok.line,
        });
    }

    Ok(Node::VariableRef {
        name: tok.lexeme,
        line: tok.line,
    })
}

/// Struct literal body: `{ field: value, ... }`. The name (possibly
/// module-qualified) has already been consumed.
pub fn parse_struct_literal(
    state: &mut ParserState,
    struct_name: String,
) -> Result<Node, ParseError> {
    let lbrace = state.consume(TokenKind::LBrace)?;

    let mut field_values = vec![];

    while !state.check(TokenKind::RBrace) && !state.check(TokenKind::Eof) {
        let field_name = state.consume(TokenKind::Ident)?.lexeme;
        state.consume(TokenKind::Colon)?;
        let value = parse_expression(state)?;
        field_values.push((field_name, value));

        if state.check(TokenKind::Comma) {
            state.advance();
        }
    }

    state.consume(TokenKind::RBrace)?;

    Ok(Node::StructLiteral {
        struct_name,
        field_values,
        line: lbrace.line,
    })
}
