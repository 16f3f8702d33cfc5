//! Source-level type syntax parsing.
//!
//! Types are carried through the compiler as structured strings (see
//! `crate::types`), so parsing a type here means assembling that string:
//! `List < int >` becomes `"List<int>"`, `fn (int) -> int` becomes
//! `"fn(int) -> int"`, `net . TcpStream` becomes `"net.TcpStream"` and a
//! trailing `*` marks a struct pointer.

use crate::lexer::TokenKind;

use super::{ParseError, ParserState};

/// Whether the current token is a primitive type keyword.
pub fn is_type_token(state: &ParserState) -> bool {
    state.current().kind.type_name().is_some()
}

/// Parses a type and returns its canonical string form.
pub fn parse_type(state: &mut ParserState) -> Result<String, ParseError> {
    let tok = state.current();

    // primitive keyword
    if let Some(name) = tok.kind.type_name() {
        state.advance();
        return Ok(name.to_owned());
    }

    // parametric container
    if let Some(container) = tok.kind.container_name() {
        state.advance();
        state.consume(TokenKind::Lt)?;

        let mut params = vec![parse_type(state)?];

        while state.check(TokenKind::Comma) {
            state.advance();
            params.push(parse_type(state)?);
        }

        state.consume(TokenKind::Gt)?;
        return Ok(format!("{container}<{}>", params.join(", ")));
    }

    // function type: fn(T1, T2) -> R
    if tok.kind == TokenKind::Fn {
        state.advance();
        state.consume(TokenKind::LParen)?;

        let mut params = vec![];

        while !state.check(TokenKind::RParen) && !state.check(TokenKind::Eof) {
            params.push(parse_type(state)?);

            if state.check(TokenKind::Comma) {
                state.advance();
            }
        }

        state.consume(TokenKind::RParen)?;

        let mut fn_type = format!("fn({})", params.join(", "));

        if state.check(TokenKind::Arrow) {
            state.advance();
            fn_type += " -> ";
            fn_type += &parse_type(state)?;
        }

        return Ok(fn_type);
    }

    // struct name, optionally module-qualified, optionally a pointer
    let name = state.consume(TokenKind::Ident)?;
    let mut type_name = name.lexeme;

    if state.check(TokenKind::Dot) && state.check_ahead(1, TokenKind::Ident) {
        state.advance();
        let member = state.consume(TokenKind::Ident)?;
        type_name = format!("{type_name}.{}", member.lexeme);
    }

    if state.check(TokenKind::Star) {
        state.advance();
        type_name.push('*');
    }

    Ok(type_name)
}

#[cfg(test)]
mod tests {
    use crate::lexer::Lexer;
    use crate::parser::ParserState;

    use super::parse_type;

    fn parse(src: &str) -> String {
        let mut state = ParserState::new(Lexer::new(src).lex());
        parse_type(&mut state).expect("type should parse")
    }

    #[test]
    fn test_primitives() {
        assert_eq!(parse("int"), "int");
        assert_eq!(parse("f64"), "f64");
        assert_eq!(parse("cstr"), "cstr");
    }

    #[test]
    fn test_nested_containers() {
        assert_eq!(parse("List<int>"), "List<int>");
        assert_eq!(parse("Map<str, List<int>>"), "Map<str, List<int>>");
        assert_eq!(parse("Pair<Tuple<f64>>"), "Pair<Tuple<f64>>");
        assert_eq!(parse("Channel<List<str>>"), "Channel<List<str>>");
    }

    #[test]
    fn test_function_types() {
        assert_eq!(parse("fn(int, str) -> bool"), "fn(int, str) -> bool");
        assert_eq!(parse("fn()"), "fn()");
        assert_eq!(
            parse("fn(fn(int) -> int) -> int"),
            "fn(fn(int) -> int) -> int"
        );
    }

    #[test]
    fn test_qualified_and_pointer() {
        assert_eq!(parse("net.TcpStream"), "net.TcpStream");
        assert_eq!(parse("Person*"), "Person*");
    }
}
