use std::collections::HashSet;

use crate::lexer::{Token, TokenKind};

use super::{ast::NodeId, ParseError};

/// A `module.member` alias introduced by a using statement, as far as the
/// parser can resolve it (full resolution happens in the type checker).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsingAlias {
    pub local_name: String,
    pub module_alias: String,
    pub member_name: String,
}

/// Mutable parser state: token cursor, the name tables collected by the
/// pre-scan pass, and the import/using registry used for disambiguation.
#[derive(Debug, Clone, Default)]
pub struct ParserState {
    tokens: Vec<Token>,
    pos: usize,
    next_node_id: u32,

    /// Top-level `fn` names collected by the pre-scan.
    pub function_names: HashSet<String>,
    /// `Name :: struct` / `Name :: err` names collected by the pre-scan.
    pub struct_names: HashSet<String>,
    /// Import aliases seen so far.
    pub imported_modules: HashSet<String>,
    /// Selective using aliases seen so far.
    pub using_aliases: Vec<UsingAlias>,
    /// Whether any `using module.*;` occurred.
    pub has_wildcard_using: bool,
}

impl ParserState {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            ..Self::default()
        }
    }

    /// The current token, or EOF when past the end.
    pub fn current(&self) -> Token {
        self.tokens
            .get(self.pos)
            .cloned()
            .unwrap_or_else(|| Token::eof(self.last_line()))
    }

    /// One-token lookahead.
    pub fn peek(&self) -> Token {
        self.nth(1)
    }

    /// N-token lookahead.
    pub fn nth(&self, n: usize) -> Token {
        self.tokens
            .get(self.pos + n)
            .cloned()
            .unwrap_or_else(|| Token::eof(self.last_line()))
    }

    fn last_line(&self) -> usize {
        self.tokens.last().map(|t| t.line).unwrap_or(1)
    }

    pub fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    pub fn check_ahead(&self, n: usize, kind: TokenKind) -> bool {
        self.nth(n).kind == kind
    }

    pub fn advance(&mut self) {
        self.pos += 1;
    }

    /// Consumes the current token if it matches, otherwise reports an
    /// unexpected-token error with the offending lexeme and line.
    pub fn consume(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if !self.check(kind) {
            let tok = self.current();
            return Err(ParseError::unexpected(&tok));
        }

        let tok = self.current();
        self.advance();
        Ok(tok)
    }

    pub fn get_pos(&self) -> usize {
        self.pos
    }

    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Hands out the identity for an annotatable node.
    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    pub fn is_imported_module(&self, name: &str) -> bool {
        self.imported_modules.contains(name)
    }

    pub fn is_function_name(&self, name: &str) -> bool {
        self.function_names.contains(name)
    }

    /// Whether `name` can start a struct literal. Besides pre-scanned struct
    /// names this covers using aliases, and under a wildcard using any
    /// PascalCase identifier is conservatively accepted (the type checker
    /// validates).
    pub fn is_struct_type(&self, name: &str) -> bool {
        if self.struct_names.contains(name) {
            return true;
        }

        if self.using_aliases.iter().any(|a| a.local_name == name) {
            return true;
        }

        self.has_wildcard_using
            && name
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_uppercase())
    }
}
