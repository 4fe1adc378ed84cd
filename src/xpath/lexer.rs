//! XPath Lexer
//!
//! Tokenizes XPath expressions into tokens. Operator names (`and`, `or`,
//! `mod`, `div`) are only recognised where an operator may appear, so
//! `//div` lexes as a name test. `*` is always [`TokenKind::Star`]; the
//! parser decides between wildcard and multiplication.

use crate::error::{QueryError, Result};

/// XPath token types
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Operators
    Slash,       // /
    DoubleSlash, // //
    Dot,         // .
    DoubleDot,   // ..
    At,          // @
    Pipe,        // |
    Plus,        // +
    Minus,       // -
    Star,        // *
    Eq,          // =
    NotEq,       // !=
    Lt,          // <
    LtEq,        // <=
    Gt,          // >
    GtEq,        // >=
    And,         // and
    Or,          // or
    Mod,         // mod
    Div,         // div

    // Brackets
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]

    // Literals
    Number(f64),
    String(String),

    // Names
    Name(String),             // NCName, also function names
    NameTest(String, String), // prefix:local, prefix:*, *:local, *:*
    NodeType(String),         // node, text, comment, cdata, processing-instruction
    Axis(String),             // child, descendant, ... (before ::)
    Variable(String),         // $name

    // Special
    DoubleColon, // ::
    Comma,       // ,

    // End of input
    Eof,
}

/// A token with its 1-based source position
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
    pub column: u32,
}

/// XPath lexer
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: u32,
    column: u32,
    /// Whether the previous token lets the next `*`/NCName be an operator
    operator_allowed: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            line: 1,
            column: 1,
            operator_allowed: false,
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

    /// Advance past one character, tracking line and column
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

    fn bump_n(&mut self, n: usize) {
        for _ in 0..n {
            self.bump();
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();
        let (line, column) = (self.line, self.column);
        let kind = self.next_kind(line, column)?;

        self.operator_allowed = !matches!(
            kind,
            TokenKind::At
                | TokenKind::DoubleColon
                | TokenKind::LeftParen
                | TokenKind::LeftBracket
                | TokenKind::Comma
                | TokenKind::Slash
                | TokenKind::DoubleSlash
                | TokenKind::Pipe
                | TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Eq
                | TokenKind::NotEq
                | TokenKind::Lt
                | TokenKind::LtEq
                | TokenKind::Gt
                | TokenKind::GtEq
                | TokenKind::And
                | TokenKind::Or
                | TokenKind::Mod
                | TokenKind::Div
                | TokenKind::Axis(_)
        ) || (kind == TokenKind::Star && !self.operator_allowed);

        Ok(Token { kind, line, column })
    }

    fn next_kind(&mut self, line: u32, column: u32) -> Result<TokenKind> {
        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(TokenKind::Eof),
        };

        let simple = |lexer: &mut Self, kind: TokenKind, len: usize| -> Result<TokenKind> {
            lexer.bump_n(len);
            Ok(kind)
        };

        match c {
            '/' if self.peek_at(1) == Some('/') => simple(self, TokenKind::DoubleSlash, 2),
            '/' => simple(self, TokenKind::Slash, 1),
            '.' if self.peek_at(1) == Some('.') => simple(self, TokenKind::DoubleDot, 2),
            '.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => Ok(self.read_number()),
            '.' => simple(self, TokenKind::Dot, 1),
            '@' => simple(self, TokenKind::At, 1),
            '|' => simple(self, TokenKind::Pipe, 1),
            '+' => simple(self, TokenKind::Plus, 1),
            '-' => simple(self, TokenKind::Minus, 1),
            '=' => simple(self, TokenKind::Eq, 1),
            '!' if self.peek_at(1) == Some('=') => simple(self, TokenKind::NotEq, 2),
            '<' if self.peek_at(1) == Some('=') => simple(self, TokenKind::LtEq, 2),
            '<' => simple(self, TokenKind::Lt, 1),
            '>' if self.peek_at(1) == Some('=') => simple(self, TokenKind::GtEq, 2),
            '>' => simple(self, TokenKind::Gt, 1),
            '(' => simple(self, TokenKind::LeftParen, 1),
            ')' => simple(self, TokenKind::RightParen, 1),
            '[' => simple(self, TokenKind::LeftBracket, 1),
            ']' => simple(self, TokenKind::RightBracket, 1),
            ',' => simple(self, TokenKind::Comma, 1),
            ':' if self.peek_at(1) == Some(':') => simple(self, TokenKind::DoubleColon, 2),
            '*' => {
                // `*:name` and `*:*` wildcards (only where a name test may appear)
                if !self.operator_allowed && self.peek_at(1) == Some(':') {
                    if let Some(local) = self.peek_at(2).filter(|&c| c == '*' || is_name_start_char(c)) {
                        self.bump_n(2);
                        let local = if local == '*' {
                            self.bump();
                            "*".to_string()
                        } else {
                            self.read_ncname().to_string()
                        };
                        return Ok(TokenKind::NameTest("*".to_string(), local));
                    }
                }
                simple(self, TokenKind::Star, 1)
            }
            '$' => {
                self.bump();
                if !self.peek().is_some_and(is_name_start_char) {
                    return Err(QueryError::parse("expected variable name after '$'", line, column));
                }
                Ok(TokenKind::Variable(self.read_ncname().to_string()))
            }
            '"' | '\'' => self.read_string(line, column),
            '0'..='9' => Ok(self.read_number()),
            _ if is_name_start_char(c) => Ok(self.read_name_or_keyword()),
            _ => Err(QueryError::parse(format!("unexpected character '{}'", c), line, column)),
        }
    }

    /// Read a number literal
    fn read_number(&mut self) -> TokenKind {
        let start = self.pos;

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some('.') && self.peek_at(1) != Some('.') {
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }

        let num_str = &self.input[start..self.pos];
        TokenKind::Number(num_str.parse().unwrap_or(f64::NAN))
    }

    /// Read a string literal
    fn read_string(&mut self, line: u32, column: u32) -> Result<TokenKind> {
        let quote = self.bump().unwrap_or('"');
        let start = self.pos;

        let end = match self.remaining().find(quote) {
            Some(offset) => start + offset,
            None => return Err(QueryError::parse("unterminated string literal", line, column)),
        };
        while self.pos < end {
            self.bump();
        }
        let value = self.input[start..end].to_string();
        self.bump();

        Ok(TokenKind::String(value))
    }

    fn read_ncname(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(is_name_char) {
            self.bump();
        }
        &self.input[start..self.pos]
    }

    /// Read a name, keyword, axis, node type or qualified name test
    fn read_name_or_keyword(&mut self) -> TokenKind {
        let name = self.read_ncname();

        if self.operator_allowed {
            match name {
                "and" => return TokenKind::And,
                "or" => return TokenKind::Or,
                "mod" => return TokenKind::Mod,
                "div" => return TokenKind::Div,
                _ => {}
            }
        }

        // prefix:local or prefix:*
        if self.peek() == Some(':') {
            match self.peek_at(1) {
                Some('*') => {
                    self.bump_n(2);
                    return TokenKind::NameTest(name.to_string(), "*".to_string());
                }
                Some(c) if is_name_start_char(c) => {
                    self.bump();
                    let local = self.read_ncname();
                    return TokenKind::NameTest(name.to_string(), local.to_string());
                }
                _ => {}
            }
        }

        // Look past whitespace for `::` or `(` without consuming it
        let rest = self.remaining().trim_start();
        if rest.starts_with("::") {
            TokenKind::Axis(name.to_string())
        } else if rest.starts_with('(') {
            match name {
                "node" | "text" | "comment" | "cdata" | "processing-instruction" => {
                    TokenKind::NodeType(name.to_string())
                }
                _ => TokenKind::Name(name.to_string()),
            }
        } else {
            TokenKind::Name(name.to_string())
        }
    }

    /// Tokenize entire input (Eof excluded)
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            if token.kind == TokenKind::Eof {
                break;
            }
            tokens.push(token);
        }
        Ok(tokens)
    }
}

fn is_name_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}
