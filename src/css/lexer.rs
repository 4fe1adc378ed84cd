//! CSS Selector Lexer
//!
//! Tokenizes selector text. Whitespace is a token of its own because it
//! doubles as the descendant combinator. The argument of `:nth-*()` is
//! returned raw so the `an+b` micro-grammar can be parsed separately.

use crate::error::{QueryError, Result};

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    /// `#name`
    Hash(String),
    String(String),
    /// `name(`
    Function(String),
    /// Unparsed argument of an `nth-*(` function
    Raw(String),

    Dot,
    Star,
    Pipe,
    Colon,
    Comma,
    Greater,
    Plus,
    Tilde,
    LeftBracket,
    RightBracket,
    RightParen,

    // Attribute operators
    Eq,          // =
    Includes,    // ~=
    DashMatch,   // |=
    PrefixMatch, // ^=
    SuffixMatch, // $=
    Substring,   // *=

    Whitespace,
    Eof,
}

/// Token with the 1-based position of its first character
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
    pub column: u32,
}

/// CSS lexer
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: u32,
    column: u32,
    raw_argument_pending: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            line: 1,
            column: 1,
            raw_argument_pending: false,
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.remaining().chars().nth(offset)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn bump_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        &self.input[start..self.pos]
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token> {
        let (line, column) = (self.line, self.column);

        if self.raw_argument_pending {
            self.raw_argument_pending = false;
            let raw = self.bump_while(|c| c != ')');
            return Ok(Token {
                kind: TokenKind::Raw(raw.trim().to_string()),
                line,
                column,
            });
        }

        let c = match self.peek() {
            Some(c) => c,
            None => {
                return Ok(Token {
                    kind: TokenKind::Eof,
                    line,
                    column,
                })
            }
        };

        let with_eq = |lexer: &mut Self, plain: TokenKind, eq: TokenKind| {
            lexer.bump();
            if lexer.peek() == Some('=') {
                lexer.bump();
                eq
            } else {
                plain
            }
        };

        let kind = match c {
            _ if c.is_whitespace() => {
                self.bump_while(char::is_whitespace);
                TokenKind::Whitespace
            }
            '.' => self.single(TokenKind::Dot),
            ':' => self.single(TokenKind::Colon),
            ',' => self.single(TokenKind::Comma),
            '>' => self.single(TokenKind::Greater),
            '+' => self.single(TokenKind::Plus),
            '[' => self.single(TokenKind::LeftBracket),
            ']' => self.single(TokenKind::RightBracket),
            ')' => self.single(TokenKind::RightParen),
            '=' => self.single(TokenKind::Eq),
            '*' => with_eq(self, TokenKind::Star, TokenKind::Substring),
            '|' => with_eq(self, TokenKind::Pipe, TokenKind::DashMatch),
            '~' => with_eq(self, TokenKind::Tilde, TokenKind::Includes),
            '^' if self.peek_at(1) == Some('=') => {
                self.bump();
                self.single(TokenKind::PrefixMatch)
            }
            '$' if self.peek_at(1) == Some('=') => {
                self.bump();
                self.single(TokenKind::SuffixMatch)
            }
            '#' => {
                self.bump();
                let name = self.bump_while(is_ident_char);
                if name.is_empty() {
                    return Err(QueryError::parse("expected name after '#'", line, column));
                }
                TokenKind::Hash(name.to_string())
            }
            '"' | '\'' => self.read_string(line, column)?,
            _ if is_ident_char(c) => {
                let name = self.bump_while(is_ident_char);
                if self.peek() == Some('(') {
                    self.bump();
                    self.raw_argument_pending = name.starts_with("nth-");
                    TokenKind::Function(name.to_string())
                } else {
                    TokenKind::Ident(name.to_string())
                }
            }
            _ => return Err(QueryError::parse(format!("unexpected character '{}'", c), line, column)),
        };

        Ok(Token { kind, line, column })
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.bump();
        kind
    }

    fn read_string(&mut self, line: u32, column: u32) -> Result<TokenKind> {
        let quote = self.bump().unwrap_or('"');
        let value = self.bump_while(|c| c != quote);
        if self.bump().is_none() {
            return Err(QueryError::parse("unterminated string literal", line, column));
        }
        Ok(TokenKind::String(value.to_string()))
    }

    /// Tokenize the whole input, ending with `Eof`
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }
}

/// Identifier characters; digits are accepted anywhere so bare numeric
/// attribute values lex as identifiers
fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}
