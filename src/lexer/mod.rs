//! Lexer for Bishop.
//!
//! Transforms raw source text into a flat token stream with 1-based line
//! numbers. Multi-character punctuators are matched with maximal munch,
//! keywords take precedence over identifiers, and runs of `///` lines become
//! doc-comment tokens. Unknown characters are skipped; the parser surfaces
//! them as unexpected-token errors.

mod token;

pub use token::*;

use std::{collections::HashMap, iter::Peekable, str::Chars};

use once_cell::sync::Lazy;
use unescape::unescape;

static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    let mut m = HashMap::new();

    m.insert("int", TokenKind::Int);
    m.insert("str", TokenKind::Str);
    m.insert("bool", TokenKind::Bool);
    m.insert("f32", TokenKind::F32);
    m.insert("f64", TokenKind::F64);
    m.insert("u32", TokenKind::U32);
    m.insert("u64", TokenKind::U64);
    m.insert("cint", TokenKind::Cint);
    m.insert("cstr", TokenKind::Cstr);
    m.insert("void", TokenKind::Void);

    m.insert("fn", TokenKind::Fn);
    m.insert("struct", TokenKind::Struct);
    m.insert("err", TokenKind::Err);
    m.insert("return", TokenKind::Return);
    m.insert("fail", TokenKind::Fail);
    m.insert("if", TokenKind::If);
    m.insert("else", TokenKind::Else);
    m.insert("while", TokenKind::While);
    m.insert("for", TokenKind::For);
    m.insert("in", TokenKind::In);
    m.insert("select", TokenKind::Select);
    m.insert("with", TokenKind::With);
    m.insert("as", TokenKind::As);
    m.insert("go", TokenKind::Go);
    m.insert("const", TokenKind::Const);
    m.insert("import", TokenKind::Import);
    m.insert("using", TokenKind::Using);
    m.insert("await", TokenKind::Await);
    m.insert("is", TokenKind::Is);
    m.insert("none", TokenKind::None);
    m.insert("true", TokenKind::True);
    m.insert("false", TokenKind::False);
    m.insert("break", TokenKind::Break);
    m.insert("continue", TokenKind::Continue);
    m.insert("or", TokenKind::Or);
    m.insert("match", TokenKind::Match);
    m.insert("default", TokenKind::Default);
    m.insert("pub", TokenKind::Pub);
    m.insert("extern", TokenKind::Extern);
    m.insert("static", TokenKind::Static);

    m.insert("Channel", TokenKind::Channel);
    m.insert("List", TokenKind::List);
    m.insert("Map", TokenKind::Map);
    m.insert("Set", TokenKind::Set);
    m.insert("Pair", TokenKind::Pair);
    m.insert("Tuple", TokenKind::Tuple);
    m.insert("Deque", TokenKind::Deque);
    m.insert("Stack", TokenKind::Stack);
    m.insert("Queue", TokenKind::Queue);
    m.insert("PriorityQueue", TokenKind::PriorityQueue);

    m
});

pub struct Lexer<'a> {
    iterator: Peekable<Chars<'a>>,
    tokens: Vec<Token>,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            iterator: input.chars().peekable(),
            tokens: vec![],
            line: 1,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.iterator.peek().copied()
    }

    fn next(&mut self) -> Option<char> {
        let next = self.iterator.next();

        if next == Some('\n') {
            self.line += 1;
        }

        next
    }

    fn next_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.next();
            return true;
        }

        false
    }

    fn push(&mut self, kind: TokenKind, lexeme: impl Into<String>) {
        let line = self.line;
        self.tokens.push(Token::new(kind, lexeme, line));
    }

    /// Consumes the whole input and returns the token stream.
    pub fn lex(mut self) -> Vec<Token> {
        while let Some(next) = self.peek() {
            match next {
                c if c.is_whitespace() => {
                    self.next();
                }
                c if c.is_ascii_alphabetic() || c == '_' => self.lex_word(),
                c if c.is_ascii_digit() => self.lex_number(),
                '"' => self.lex_string(),
                '/' => self.lex_slash(),
                _ => self.lex_punctuator(),
            }
        }

        let line = self.line;
        self.tokens.push(Token::eof(line));
        self.tokens
    }

    fn lex_word(&mut self) {
        let mut word = String::new();

        while let Some(c) = self.peek() {
            if !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }

            word.push(c);
            self.next();
        }

        match KEYWORDS.get(word.as_str()) {
            Some(kind) => self.push(*kind, word),
            None => self.push(TokenKind::Ident, word),
        }
    }

    fn lex_number(&mut self) {
        let mut digits = String::new();

        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }

            digits.push(c);
            self.next();
        }

        // A '.' only turns this into a float literal when a digit follows;
        // "1..5" must stay Number DotDot Number.
        if self.peek() == Some('.') {
            let mut ahead = self.iterator.clone();
            ahead.next();

            if ahead.peek().is_some_and(|c| c.is_ascii_digit()) {
                digits.push('.');
                self.next();

                while let Some(c) = self.peek() {
                    if !c.is_ascii_digit() {
                        break;
                    }

                    digits.push(c);
                    self.next();
                }

                self.push(TokenKind::Float, digits);
                return;
            }
        }

        self.push(TokenKind::Number, digits);
    }

    fn lex_string(&mut self) {
        self.next();

        let mut raw = String::new();

        while let Some(c) = self.next() {
            if c == '"' {
                break;
            }

            if c == '\\' {
                raw.push(c);

                if let Some(escaped) = self.next() {
                    raw.push(escaped);
                }

                continue;
            }

            raw.push(c);
        }

        let value = unescape(&raw).unwrap_or(raw);
        self.push(TokenKind::String, value);
    }

    /// Disambiguates `/`, `//` line comments and `///` doc comments.
    fn lex_slash(&mut self) {
        self.next();

        if !self.next_if('/') {
            self.push(TokenKind::Slash, "/");
            return;
        }

        let is_doc = self.next_if('/');
        let mut text = String::new();

        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }

            text.push(c);
            self.next();
        }

        if is_doc {
            self.push(TokenKind::DocComment, text.trim().to_owned());
        }
    }

    fn lex_punctuator(&mut self) {
        let Some(c) = self.next() else {
            return;
        };

        match c {
            '(' => self.push(TokenKind::LParen, "("),
            ')' => self.push(TokenKind::RParen, ")"),
            '{' => self.push(TokenKind::LBrace, "{"),
            '}' => self.push(TokenKind::RBrace, "}"),
            '[' => self.push(TokenKind::LBracket, "["),
            ']' => self.push(TokenKind::RBracket, "]"),
            ';' => self.push(TokenKind::Semicolon, ";"),
            ',' => self.push(TokenKind::Comma, ","),
            '+' => self.push(TokenKind::Plus, "+"),
            '*' => self.push(TokenKind::Star, "*"),
            '&' => self.push(TokenKind::Ampersand, "&"),
            '?' => self.push(TokenKind::Optional, "?"),
            '@' => self.push(TokenKind::At, "@"),
            '.' => {
                if self.next_if('.') {
                    self.push(TokenKind::DotDot, "..");
                } else {
                    self.push(TokenKind::Dot, ".");
                }
            }
            ':' => {
                if self.next_if(':') {
                    self.push(TokenKind::DoubleColon, "::");
                } else if self.next_if('=') {
                    self.push(TokenKind::ColonAssign, ":=");
                } else {
                    self.push(TokenKind::Colon, ":");
                }
            }
            '-' => {
                if self.next_if('>') {
                    self.push(TokenKind::Arrow, "->");
                } else {
                    self.push(TokenKind::Minus, "-");
                }
            }
            '=' => {
                if self.next_if('=') {
                    self.push(TokenKind::EqEq, "==");
                } else if self.next_if('>') {
                    self.push(TokenKind::FatArrow, "=>");
                } else {
                    self.push(TokenKind::Assign, "=");
                }
            }
            '!' => {
                if self.next_if('=') {
                    self.push(TokenKind::Ne, "!=");
                } else {
                    self.push(TokenKind::Not, "!");
                }
            }
            '<' => {
                if self.next_if('=') {
                    self.push(TokenKind::Le, "<=");
                } else {
                    self.push(TokenKind::Lt, "<");
                }
            }
            '>' => {
                if self.next_if('=') {
                    self.push(TokenKind::Ge, ">=");
                } else {
                    self.push(TokenKind::Gt, ">");
                }
            }
            // Anything else is skipped; the parser reports the surrounding
            // construct as an unexpected token.
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input).lex().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_lex_identifier() {
        let tokens = Lexer::new("letter").lex();

        assert_eq!(
            tokens[0],
            Token::new(TokenKind::Ident, "letter", 1)
        );
    }

    #[test]
    fn test_lex_keywords_vs_idents() {
        assert_eq!(
            kinds("fn fnord"),
            vec![TokenKind::Fn, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn test_lex_numeric() {
        let tokens = Lexer::new("1337").lex();

        assert_eq!(tokens[0], Token::new(TokenKind::Number, "1337", 1));
    }

    #[test]
    fn test_lex_float() {
        let tokens = Lexer::new("3.14").lex();

        assert_eq!(tokens[0], Token::new(TokenKind::Float, "3.14", 1));
    }

    #[test]
    fn test_lex_range_is_not_float() {
        assert_eq!(
            kinds("1..5"),
            vec![
                TokenKind::Number,
                TokenKind::DotDot,
                TokenKind::Number,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_lex_walrus_and_double_colon() {
        assert_eq!(
            kinds("x := 1; P :: struct"),
            vec![
                TokenKind::Ident,
                TokenKind::ColonAssign,
                TokenKind::Number,
                TokenKind::Semicolon,
                TokenKind::Ident,
                TokenKind::DoubleColon,
                TokenKind::Struct,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_lex_maximal_munch() {
        assert_eq!(
            kinds("-> - == = != ! <= < >= >"),
            vec![
                TokenKind::Arrow,
                TokenKind::Minus,
                TokenKind::EqEq,
                TokenKind::Assign,
                TokenKind::Ne,
                TokenKind::Not,
                TokenKind::Le,
                TokenKind::Lt,
                TokenKind::Ge,
                TokenKind::Gt,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_lex_string_with_escapes() {
        let tokens = Lexer::new(r#""a\nb""#).lex();

        assert_eq!(tokens[0], Token::new(TokenKind::String, "a\nb", 1));
    }

    #[test]
    fn test_lex_line_numbers() {
        let tokens = Lexer::new("a\nb\n\nc").lex();

        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[2].line, 4);
    }

    #[test]
    fn test_lex_doc_comment() {
        let tokens = Lexer::new("/// adds things\nfn").lex();

        assert_eq!(
            tokens[0],
            Token::new(TokenKind::DocComment, "adds things", 1)
        );
        assert_eq!(tokens[1].kind, TokenKind::Fn);
    }

    #[test]
    fn test_lex_line_comment_is_skipped() {
        assert_eq!(
            kinds("a // nothing to see\nb"),
            vec![TokenKind::Ident, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn test_lex_unknown_characters_are_skipped() {
        assert_eq!(kinds("a $ b"), vec![TokenKind::Ident, TokenKind::Ident, TokenKind::Eof]);
    }
}
