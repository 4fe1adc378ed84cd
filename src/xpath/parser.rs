//! XPath Parser
//!
//! Recursive descent parser for XPath 1.0 expressions. Precedence, loosest
//! first: `or`, `and`, equality, relational, additive, multiplicative,
//! unary minus, union, path/primary.

use super::ast::{Axis, BinaryOp, Expr, ExprRef, NodeTest};
use super::lexer::{Lexer, Token, TokenKind};
use crate::error::{QueryError, Result};
use std::sync::Arc;

/// XPath parser
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    peeked: Option<Token>,
}

impl<'a> Parser<'a> {
    /// Create a new parser, reading the first token
    pub fn new(input: &'a str) -> Result<Self> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current,
            peeked: None,
        })
    }

    /// Parse a complete XPath expression
    pub fn parse(&mut self) -> Result<Expr> {
        let expr = self.parse_expr()?;
        if self.current.kind != TokenKind::Eof {
            return Err(self.unexpected());
        }
        Ok(expr)
    }

    fn advance(&mut self) -> Result<()> {
        self.current = match self.peeked.take() {
            Some(t) => t,
            None => self.lexer.next_token()?,
        };
        Ok(())
    }

    fn peek(&mut self) -> Result<&TokenKind> {
        if self.peeked.is_none() {
            self.peeked = Some(self.lexer.next_token()?);
        }
        Ok(self.peeked.as_ref().map_or(&TokenKind::Eof, |t| &t.kind))
    }

    fn error(&self, message: impl Into<String>) -> QueryError {
        QueryError::parse(message, self.current.line, self.current.column)
    }

    fn unexpected(&self) -> QueryError {
        match &self.current.kind {
            TokenKind::Eof => self.error("unexpected end of expression"),
            kind => self.error(format!("unexpected token {:?}", kind)),
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<()> {
        if self.current.kind != kind {
            return Err(self.error(format!("expected {}", what)));
        }
        self.advance()
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_or_expr()
    }

    /// Left-associative chain of one precedence level
    fn parse_binary_level(
        &mut self,
        next: fn(&mut Self) -> Result<Expr>,
        op_for: fn(&TokenKind) -> Option<BinaryOp>,
    ) -> Result<Expr> {
        let mut left = next(self)?;
        while let Some(op) = op_for(&self.current.kind) {
            self.advance()?;
            let right = next(self)?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_or_expr(&mut self) -> Result<Expr> {
        self.parse_binary_level(Self::parse_and_expr, |t| match t {
            TokenKind::Or => Some(BinaryOp::Or),
            _ => None,
        })
    }

    fn parse_and_expr(&mut self) -> Result<Expr> {
        self.parse_binary_level(Self::parse_equality_expr, |t| match t {
            TokenKind::And => Some(BinaryOp::And),
            _ => None,
        })
    }

    fn parse_equality_expr(&mut self) -> Result<Expr> {
        self.parse_binary_level(Self::parse_relational_expr, |t| match t {
            TokenKind::Eq => Some(BinaryOp::Eq),
            TokenKind::NotEq => Some(BinaryOp::NotEq),
            _ => None,
        })
    }

    fn parse_relational_expr(&mut self) -> Result<Expr> {
        self.parse_binary_level(Self::parse_additive_expr, |t| match t {
            TokenKind::Lt => Some(BinaryOp::Lt),
            TokenKind::LtEq => Some(BinaryOp::LtEq),
            TokenKind::Gt => Some(BinaryOp::Gt),
            TokenKind::GtEq => Some(BinaryOp::GtEq),
            _ => None,
        })
    }

    fn parse_additive_expr(&mut self) -> Result<Expr> {
        self.parse_binary_level(Self::parse_multiplicative_expr, |t| match t {
            TokenKind::Plus => Some(BinaryOp::Add),
            TokenKind::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    /// `*` after a complete operand is always multiplication
    fn parse_multiplicative_expr(&mut self) -> Result<Expr> {
        self.parse_binary_level(Self::parse_unary_expr, |t| match t {
            TokenKind::Star => Some(BinaryOp::Mul),
            TokenKind::Div => Some(BinaryOp::Div),
            TokenKind::Mod => Some(BinaryOp::Mod),
            _ => None,
        })
    }

    fn parse_unary_expr(&mut self) -> Result<Expr> {
        if self.current.kind == TokenKind::Minus {
            self.advance()?;
            let expr = self.parse_unary_expr()?;
            Ok(Expr::Negate(Arc::new(expr)))
        } else {
            self.parse_union_expr()
        }
    }

    fn parse_union_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_path_expr()?;

        while self.current.kind == TokenKind::Pipe {
            self.advance()?;
            let right = self.parse_path_expr()?;
            left = Expr::Union(Arc::new(left), Arc::new(right));
        }

        Ok(left)
    }

    /// Whether the current token begins a location step
    fn at_step_start(&mut self) -> Result<bool> {
        Ok(match &self.current.kind {
            TokenKind::Name(_) | TokenKind::NameTest(..) => {
                *self.peek()? != TokenKind::LeftParen
            }
            TokenKind::Star
            | TokenKind::At
            | TokenKind::Dot
            | TokenKind::DoubleDot
            | TokenKind::Axis(_)
            | TokenKind::NodeType(_) => true,
            _ => false,
        })
    }

    fn parse_path_expr(&mut self) -> Result<Expr> {
        match self.current.kind.clone() {
            TokenKind::Slash => {
                self.advance()?;
                if self.at_step_start()? {
                    Ok(Expr::AbsolutePath(self.parse_relative_steps(Vec::new())?))
                } else {
                    Ok(Expr::AbsolutePath(Vec::new()))
                }
            }
            TokenKind::DoubleSlash => {
                self.advance()?;
                let parts = vec![descendant_or_self_node()];
                Ok(Expr::AbsolutePath(self.parse_relative_steps(parts)?))
            }
            _ if self.at_step_start()? => Ok(Expr::RelativePath(self.parse_relative_steps(Vec::new())?)),
            _ => {
                let filter = self.parse_filter_expr()?;
                match self.current.kind {
                    TokenKind::Slash => {
                        self.advance()?;
                        let parts = vec![Arc::new(filter)];
                        Ok(Expr::RelativePath(self.parse_relative_steps(parts)?))
                    }
                    TokenKind::DoubleSlash => {
                        self.advance()?;
                        let parts = vec![Arc::new(filter), descendant_or_self_node()];
                        Ok(Expr::RelativePath(self.parse_relative_steps(parts)?))
                    }
                    _ => Ok(filter),
                }
            }
        }
    }

    /// `step ('/' step | '//' step)*`, appended to `parts`
    fn parse_relative_steps(&mut self, mut parts: Vec<ExprRef>) -> Result<Vec<ExprRef>> {
        parts.push(Arc::new(self.parse_step()?));
        loop {
            match self.current.kind {
                TokenKind::Slash => {
                    self.advance()?;
                }
                TokenKind::DoubleSlash => {
                    self.advance()?;
                    parts.push(descendant_or_self_node());
                }
                _ => break,
            }
            parts.push(Arc::new(self.parse_step()?));
        }
        Ok(parts)
    }

    /// Parse a location step
    fn parse_step(&mut self) -> Result<Expr> {
        let axis = match &self.current.kind {
            TokenKind::Dot => {
                self.advance()?;
                return Ok(Expr::step(Axis::Self_, NodeTest::Node));
            }
            TokenKind::DoubleDot => {
                self.advance()?;
                return Ok(Expr::step(Axis::Parent, NodeTest::Node));
            }
            TokenKind::At => {
                self.advance()?;
                Axis::Attribute
            }
            TokenKind::Axis(name) => {
                let axis = Axis::from_name(name)
                    .ok_or_else(|| QueryError::unsupported(format!("axis {}", name)))?;
                self.advance()?;
                self.expect(TokenKind::DoubleColon, "'::' after axis name")?;
                axis
            }
            _ => Axis::Child,
        };

        let test = self.parse_node_test()?;

        let mut predicates = Vec::new();
        while self.current.kind == TokenKind::LeftBracket {
            predicates.push(self.parse_predicate()?);
        }

        Ok(Expr::Step {
            axis,
            test,
            predicates,
        })
    }

    fn parse_node_test(&mut self) -> Result<NodeTest> {
        let test = match &self.current.kind {
            TokenKind::Star => NodeTest::Any,
            TokenKind::Name(name) => NodeTest::Name(name.clone()),
            TokenKind::NameTest(prefix, local) => match (prefix.as_str(), local.as_str()) {
                ("*", "*") => NodeTest::Any,
                ("*", local) => NodeTest::LocalWildcard(local.to_string()),
                (prefix, "*") => NodeTest::NamespaceWildcard(prefix.to_string()),
                (prefix, local) => NodeTest::QName(prefix.to_string(), local.to_string()),
            },
            TokenKind::NodeType(name) => {
                let name = name.clone();
                self.advance()?;
                self.expect(TokenKind::LeftParen, "'('")?;
                let target = match &self.current.kind {
                    TokenKind::String(s) if name == "processing-instruction" => {
                        let s = s.clone();
                        self.advance()?;
                        Some(s)
                    }
                    _ => None,
                };
                self.expect(TokenKind::RightParen, "')'")?;
                return Ok(match name.as_str() {
                    "node" => NodeTest::Node,
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    "cdata" => NodeTest::CData,
                    _ => NodeTest::ProcessingInstruction(target),
                });
            }
            _ => return Err(self.error(format!("expected node test, got {:?}", self.current.kind))),
        };
        self.advance()?;
        Ok(test)
    }

    fn parse_predicate(&mut self) -> Result<ExprRef> {
        self.advance()?;
        let pred = self.parse_expr()?;
        self.expect(TokenKind::RightBracket, "']'")?;
        Ok(Arc::new(pred))
    }

    fn parse_filter_expr(&mut self) -> Result<Expr> {
        let primary = self.parse_primary_expr()?;

        let mut predicates = Vec::new();
        while self.current.kind == TokenKind::LeftBracket {
            predicates.push(self.parse_predicate()?);
        }

        if predicates.is_empty() {
            Ok(primary)
        } else {
            Ok(Expr::Filter {
                primary: Arc::new(primary),
                predicates,
            })
        }
    }

    fn parse_primary_expr(&mut self) -> Result<Expr> {
        let expr = match &self.current.kind {
            TokenKind::Number(n) => Expr::Number(*n),
            TokenKind::String(s) => Expr::String(s.clone()),
            TokenKind::Variable(name) => Expr::Variable(name.clone()),
            TokenKind::LeftParen => {
                self.advance()?;
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RightParen, "')'")?;
                return Ok(expr);
            }
            TokenKind::Name(name) => {
                let name = name.clone();
                return self.parse_function_call(name);
            }
            TokenKind::NameTest(prefix, local) => {
                let name = format!("{}:{}", prefix, local);
                return self.parse_function_call(name);
            }
            _ => return Err(self.unexpected()),
        };
        self.advance()?;
        Ok(expr)
    }

    /// `name(arg, ...)`; the current token is the name
    fn parse_function_call(&mut self, name: String) -> Result<Expr> {
        self.advance()?;
        self.expect(TokenKind::LeftParen, "'(' after function name")?;

        let mut args = Vec::new();
        if self.current.kind != TokenKind::RightParen {
            args.push(Arc::new(self.parse_expr()?));
            while self.current.kind == TokenKind::Comma {
                self.advance()?;
                args.push(Arc::new(self.parse_expr()?));
            }
        }
        self.expect(TokenKind::RightParen, "')' after function arguments")?;

        Ok(Expr::Call { name, args })
    }
}

/// `//` expands to `descendant-or-self::node()/`
fn descendant_or_self_node() -> ExprRef {
    Arc::new(Expr::step(Axis::DescendantOrSelf, NodeTest::Node))
}

/// Parse an XPath expression string (uncached)
pub fn parse(input: &str) -> Result<Expr> {
    Parser::new(input)?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(axis: Axis, test: NodeTest) -> ExprRef {
        Arc::new(Expr::step(axis, test))
    }

    fn name(n: &str) -> NodeTest {
        NodeTest::Name(n.to_string())
    }

    #[test]
    fn test_absolute_path() {
        assert_eq!(
            parse("/root/child").unwrap(),
            Expr::AbsolutePath(vec![step(Axis::Child, name("root")), step(Axis::Child, name("child"))])
        );
        assert_eq!(parse("/").unwrap(), Expr::AbsolutePath(vec![]));
    }

    #[test]
    fn test_double_slash_expands() {
        assert_eq!(
            parse("//item").unwrap(),
            Expr::AbsolutePath(vec![
                step(Axis::DescendantOrSelf, NodeTest::Node),
                step(Axis::Child, name("item")),
            ])
        );
        assert_eq!(parse("a//b").unwrap(), parse("a/descendant-or-self::node()/b").unwrap());
    }

    #[test]
    fn test_abbreviations() {
        assert_eq!(parse("@id").unwrap(), parse("attribute::id").unwrap());
        assert_eq!(parse("..").unwrap(), parse("parent::node()").unwrap());
        assert_eq!(parse(".").unwrap(), parse("self::node()").unwrap());
    }

    #[test]
    fn test_predicates_attach_to_step() {
        let expr = parse("item[@id='test'][2]").unwrap();
        let Expr::RelativePath(parts) = expr else {
            panic!("expected relative path");
        };
        let Expr::Step { predicates, .. } = parts[0].as_ref() else {
            panic!("expected step");
        };
        assert_eq!(predicates.len(), 2);
        assert_eq!(*predicates[1], Expr::Number(2.0));
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            parse("1 + 2 * 3 = 7 or false()").unwrap(),
            Expr::binary(
                BinaryOp::Or,
                Expr::binary(
                    BinaryOp::Eq,
                    Expr::binary(
                        BinaryOp::Add,
                        Expr::Number(1.0),
                        Expr::binary(BinaryOp::Mul, Expr::Number(2.0), Expr::Number(3.0)),
                    ),
                    Expr::Number(7.0),
                ),
                Expr::call("false", vec![]),
            )
        );
    }

    #[test]
    fn test_star_as_wildcard_and_multiply() {
        assert_eq!(
            parse("* * 2").unwrap(),
            Expr::binary(
                BinaryOp::Mul,
                Expr::RelativePath(vec![step(Axis::Child, NodeTest::Any)]),
                Expr::Number(2.0),
            )
        );
    }

    #[test]
    fn test_wildcard_tests() {
        let only = |src: &str| match parse(src).unwrap() {
            Expr::RelativePath(parts) => match parts[0].as_ref() {
                Expr::Step { test, .. } => test.clone(),
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(only("ns:*"), NodeTest::NamespaceWildcard("ns".to_string()));
        assert_eq!(only("*:a"), NodeTest::LocalWildcard("a".to_string()));
        assert_eq!(only("*:*"), NodeTest::Any);
        assert_eq!(only("x:a"), NodeTest::QName("x".to_string(), "a".to_string()));
        assert_eq!(
            only("processing-instruction('php')"),
            NodeTest::ProcessingInstruction(Some("php".to_string()))
        );
        assert_eq!(only("cdata()"), NodeTest::CData);
    }

    #[test]
    fn test_filter_and_path_continuation() {
        let expr = parse("(a | b)[1]/c").unwrap();
        let Expr::RelativePath(parts) = expr else {
            panic!("expected relative path");
        };
        assert_eq!(parts.len(), 2);
        assert!(matches!(parts[0].as_ref(), Expr::Filter { .. }));
    }

    #[test]
    fn test_function_and_variable() {
        assert_eq!(
            parse("count($items)").unwrap(),
            Expr::call("count", vec![Expr::Variable("items".to_string())])
        );
        assert_eq!(parse("-$n").unwrap(), Expr::Negate(Arc::new(Expr::Variable("n".to_string()))));
    }

    #[test]
    fn test_unknown_axis_is_unsupported() {
        assert_eq!(
            parse("sideways::a"),
            Err(QueryError::UnsupportedFeature {
                name: "axis sideways".to_string()
            })
        );
    }

    #[test]
    fn test_errors_carry_position() {
        assert!(matches!(parse("a[1"), Err(QueryError::Parse { column: 4, .. })));
        assert!(matches!(parse("a b"), Err(QueryError::Parse { column: 3, .. })));
        assert!(matches!(parse("/a/"), Err(QueryError::Parse { .. })));
        assert!(matches!(parse("count(1,"), Err(QueryError::Parse { .. })));
    }
}
