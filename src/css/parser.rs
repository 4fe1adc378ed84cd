//! CSS Selector Parser
//!
//! Parses selector groups made of compound selectors joined by the
//! descendant (whitespace) and child (`>`) combinators.

use super::lexer::{Lexer, Token, TokenKind};
use crate::error::{QueryError, Result};

/// `a, b, ...`
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList(pub Vec<ComplexSelector>);

/// Compound selectors joined by combinators, left to right.
///
/// `div.nav > ul li` is `head: div.nav`, `tail: [(Child, ul), (Descendant, li)]`.
/// A leading `>` is accepted and parses like its absence: the head compound
/// is always matched on the child axis of the context node.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexSelector {
    pub head: CompoundSelector,
    pub tail: Vec<(Combinator, CompoundSelector)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Whitespace
    Descendant,
    /// `>`
    Child,
}

/// Conditions on a single element: an optional type selector followed by
/// class, id, attribute and pseudo-class selectors
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompoundSelector {
    pub element: Option<TypeSelector>,
    pub filters: Vec<SimpleSelector>,
}

/// Name or `*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamePart {
    Any,
    Name(String),
}

/// `name`, `*`, `ns|name`, `*|name`, `ns|*`, `*|*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSelector {
    pub namespace: Option<NamePart>,
    pub name: NamePart,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimpleSelector {
    /// `.name`
    Class(String),
    /// `#name`
    Id(String),
    Attribute(AttributeSelector),
    PseudoClass(PseudoClass),
}

/// `[name]`, `[ns|name op value]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelector {
    pub namespace: Option<NamePart>,
    pub name: String,
    pub matcher: Option<(AttributeOperator, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeOperator {
    /// `=`
    Equals,
    /// `~=`, whitespace-separated word
    Includes,
    /// `|=`, exact or followed by `-`
    DashMatch,
    /// `^=`
    Prefix,
    /// `$=`
    Suffix,
    /// `*=`
    Substring,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PseudoClass {
    Root,
    Empty,
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    OnlyOfType,
    NthChild(Nth),
    NthLastChild(Nth),
    NthOfType(Nth),
    NthLastOfType(Nth),
    Not(Box<CompoundSelector>),
}

/// `an+b`: positions `a*n + b` for n >= 0.
///
/// Both coefficients are limited to the `i32` range so that negating them
/// or forming the predicate arithmetic can never overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nth {
    pub a: i64,
    pub b: i64,
}

impl Nth {
    /// Parse the `an+b` micro-grammar: `odd`, `even`, `5`, `n`, `-n+3`, `2n - 1`, ...
    pub fn parse(text: &str) -> Option<Nth> {
        let text: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let text = text.to_ascii_lowercase();

        match text.as_str() {
            "odd" => return Some(Nth { a: 2, b: 1 }),
            "even" => return Some(Nth { a: 2, b: 0 }),
            _ => {}
        }

        let Some((a, b)) = text.split_once('n') else {
            return Some(Nth { a: 0, b: parse_signed(&text)? });
        };

        let a = match a {
            "" | "+" => 1,
            "-" => -1,
            _ => parse_signed(a)?,
        };
        let b = match b {
            "" => 0,
            _ if b.starts_with(['+', '-']) => parse_signed(b)?,
            _ => return None,
        };
        Some(Nth { a, b })
    }
}

fn parse_signed(text: &str) -> Option<i64> {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse::<i32>().ok().map(i64::from)
}

/// Parse a selector group
pub fn parse(input: &str) -> Result<SelectorList> {
    let tokens = Lexer::new(input).tokenize()?;
    Parser { tokens, pos: 0 }.parse_selector_list()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn current(&self) -> &Token {
        // tokenize() always ends with Eof, and pos never moves past it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while *self.kind() == TokenKind::Whitespace {
            self.advance();
        }
    }

    fn error(&self, message: impl Into<String>) -> QueryError {
        let token = self.current();
        QueryError::parse(message, token.line, token.column)
    }

    fn unexpected(&self) -> QueryError {
        match self.kind() {
            TokenKind::Eof => self.error("unexpected end of selector"),
            kind => self.error(format!("unexpected token {:?}", kind)),
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<()> {
        if *self.kind() != kind {
            return Err(self.error(format!("expected {}", what)));
        }
        self.advance();
        Ok(())
    }

    fn parse_selector_list(&mut self) -> Result<SelectorList> {
        let mut selectors = Vec::new();
        loop {
            self.skip_whitespace();
            selectors.push(self.parse_complex()?);
            self.skip_whitespace();
            match self.kind() {
                TokenKind::Comma => self.advance(),
                TokenKind::Eof => return Ok(SelectorList(selectors)),
                _ => return Err(self.unexpected()),
            }
        }
    }

    fn parse_complex(&mut self) -> Result<ComplexSelector> {
        if *self.kind() == TokenKind::Greater {
            self.advance();
            self.skip_whitespace();
        }
        let head = self.parse_compound()?;
        let mut tail = Vec::new();

        while let Some(combinator) = self.parse_combinator()? {
            tail.push((combinator, self.parse_compound()?));
        }

        Ok(ComplexSelector { head, tail })
    }

    /// Combinator between two compounds, `None` at the end of a selector
    fn parse_combinator(&mut self) -> Result<Option<Combinator>> {
        let had_whitespace = *self.kind() == TokenKind::Whitespace;
        self.skip_whitespace();

        let combinator = match self.kind() {
            TokenKind::Greater => {
                self.advance();
                Combinator::Child
            }
            TokenKind::Plus => return Err(QueryError::unsupported("combinator '+'")),
            TokenKind::Tilde => return Err(QueryError::unsupported("combinator '~'")),
            TokenKind::Comma | TokenKind::Eof => return Ok(None),
            _ if had_whitespace => Combinator::Descendant,
            _ => return Err(self.unexpected()),
        };
        self.skip_whitespace();
        Ok(Some(combinator))
    }

    fn parse_compound(&mut self) -> Result<CompoundSelector> {
        let mut compound = CompoundSelector {
            element: self.parse_type_selector()?,
            filters: Vec::new(),
        };

        loop {
            let filter = match self.kind().clone() {
                TokenKind::Dot => {
                    self.advance();
                    match self.kind().clone() {
                        TokenKind::Ident(name) => {
                            self.advance();
                            SimpleSelector::Class(name)
                        }
                        _ => return Err(self.error("expected class name after '.'")),
                    }
                }
                TokenKind::Hash(name) => {
                    self.advance();
                    SimpleSelector::Id(name)
                }
                TokenKind::LeftBracket => SimpleSelector::Attribute(self.parse_attribute()?),
                TokenKind::Colon => SimpleSelector::PseudoClass(self.parse_pseudo_class()?),
                _ => break,
            };
            compound.filters.push(filter);
        }

        if compound.element.is_none() && compound.filters.is_empty() {
            return Err(self.error("expected selector"));
        }
        Ok(compound)
    }

    /// `*` or an identifier, as a namespace prefix or a name
    fn parse_name_part(&mut self) -> Option<NamePart> {
        let part = match self.kind() {
            TokenKind::Star => NamePart::Any,
            TokenKind::Ident(name) => NamePart::Name(name.clone()),
            _ => return None,
        };
        self.advance();
        Some(part)
    }

    fn parse_type_selector(&mut self) -> Result<Option<TypeSelector>> {
        let Some(first) = self.parse_name_part() else {
            return Ok(None);
        };
        if *self.kind() != TokenKind::Pipe {
            return Ok(Some(TypeSelector {
                namespace: None,
                name: first,
            }));
        }
        self.advance();
        match self.parse_name_part() {
            Some(name) => Ok(Some(TypeSelector {
                namespace: Some(first),
                name,
            })),
            None => Err(self.error("expected element name after '|'")),
        }
    }

    fn parse_attribute(&mut self) -> Result<AttributeSelector> {
        self.advance();
        self.skip_whitespace();

        let first = self.parse_name_part();
        let (namespace, name) = if *self.kind() == TokenKind::Pipe {
            self.advance();
            match (first, self.kind().clone()) {
                (Some(prefix), TokenKind::Ident(name)) => {
                    self.advance();
                    (Some(prefix), name)
                }
                _ => return Err(self.error("expected attribute name after '|'")),
            }
        } else {
            match first {
                Some(NamePart::Name(name)) => (None, name),
                _ => return Err(self.error("expected attribute name")),
            }
        };
        self.skip_whitespace();

        let operator = match self.kind() {
            TokenKind::Eq => Some(AttributeOperator::Equals),
            TokenKind::Includes => Some(AttributeOperator::Includes),
            TokenKind::DashMatch => Some(AttributeOperator::DashMatch),
            TokenKind::PrefixMatch => Some(AttributeOperator::Prefix),
            TokenKind::SuffixMatch => Some(AttributeOperator::Suffix),
            TokenKind::Substring => Some(AttributeOperator::Substring),
            _ => None,
        };

        let matcher = match operator {
            Some(op) => {
                self.advance();
                self.skip_whitespace();
                let value = match self.kind().clone() {
                    TokenKind::String(value) | TokenKind::Ident(value) => value,
                    _ => return Err(self.error("expected attribute value")),
                };
                self.advance();
                self.skip_whitespace();
                Some((op, value))
            }
            None => None,
        };

        self.expect(TokenKind::RightBracket, "']'")?;
        Ok(AttributeSelector {
            namespace,
            name,
            matcher,
        })
    }

    fn parse_pseudo_class(&mut self) -> Result<PseudoClass> {
        self.advance();

        let pseudo = match self.kind().clone() {
            TokenKind::Ident(name) => {
                let pseudo = match name.as_str() {
                    "root" => PseudoClass::Root,
                    "empty" => PseudoClass::Empty,
                    "first-child" => PseudoClass::FirstChild,
                    "last-child" => PseudoClass::LastChild,
                    "only-child" => PseudoClass::OnlyChild,
                    "first-of-type" => PseudoClass::FirstOfType,
                    "last-of-type" => PseudoClass::LastOfType,
                    "only-of-type" => PseudoClass::OnlyOfType,
                    _ => return Err(QueryError::unsupported(format!("pseudo-class :{}", name))),
                };
                self.advance();
                pseudo
            }
            TokenKind::Function(name) if name.starts_with("nth-") => {
                self.advance();
                let nth = self.parse_nth_argument()?;
                let pseudo = match name.as_str() {
                    "nth-child" => PseudoClass::NthChild(nth),
                    "nth-last-child" => PseudoClass::NthLastChild(nth),
                    "nth-of-type" => PseudoClass::NthOfType(nth),
                    "nth-last-of-type" => PseudoClass::NthLastOfType(nth),
                    _ => return Err(QueryError::unsupported(format!("pseudo-class :{}()", name))),
                };
                self.expect(TokenKind::RightParen, "')'")?;
                pseudo
            }
            TokenKind::Function(name) if name == "not" => {
                self.advance();
                self.skip_whitespace();
                let inner = self.parse_compound()?;
                self.skip_whitespace();
                self.expect(TokenKind::RightParen, "')'")?;
                PseudoClass::Not(Box::new(inner))
            }
            TokenKind::Function(name) => {
                return Err(QueryError::unsupported(format!("pseudo-class :{}()", name)))
            }
            TokenKind::Colon => return Err(QueryError::unsupported("pseudo-elements")),
            _ => return Err(self.error("expected pseudo-class name after ':'")),
        };
        Ok(pseudo)
    }

    fn parse_nth_argument(&mut self) -> Result<Nth> {
        let TokenKind::Raw(text) = self.kind().clone() else {
            return Err(self.unexpected());
        };
        let nth = Nth::parse(&text).ok_or_else(|| self.error(format!("invalid nth expression '{}'", text)))?;
        self.advance();
        Ok(nth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(input: &str) -> ComplexSelector {
        let mut list = parse(input).unwrap();
        assert_eq!(list.0.len(), 1);
        list.0.remove(0)
    }

    fn named(name: &str) -> Option<TypeSelector> {
        Some(TypeSelector {
            namespace: None,
            name: NamePart::Name(name.to_string()),
        })
    }

    #[test]
    fn test_nth_grammar() {
        let nth = |a, b| Some(Nth { a, b });
        assert_eq!(Nth::parse("odd"), nth(2, 1));
        assert_eq!(Nth::parse("EVEN"), nth(2, 0));
        assert_eq!(Nth::parse("3"), nth(0, 3));
        assert_eq!(Nth::parse("-2"), nth(0, -2));
        assert_eq!(Nth::parse("n"), nth(1, 0));
        assert_eq!(Nth::parse("-n+2"), nth(-1, 2));
        assert_eq!(Nth::parse("+n"), nth(1, 0));
        assert_eq!(Nth::parse("2n+2"), nth(2, 2));
        assert_eq!(Nth::parse("2n - 1"), nth(2, -1));
        assert_eq!(Nth::parse("-3n"), nth(-3, 0));
        assert_eq!(Nth::parse("-2147483648n+2147483647"), nth(-2147483648, 2147483647));
        assert_eq!(Nth::parse("2n3"), None);
        assert_eq!(Nth::parse("x"), None);
        assert_eq!(Nth::parse(""), None);
        assert_eq!(Nth::parse("-9223372036854775808n"), None);
        assert_eq!(Nth::parse("n-9223372036854775808"), None);
        assert_eq!(Nth::parse("-9223372036854775808"), None);
        assert_eq!(Nth::parse("2147483648n"), None);
    }

    #[test]
    fn test_compound_with_filters() {
        let selector = single("li.item#first[data-x='1']:first-child");
        assert!(selector.tail.is_empty());
        assert_eq!(selector.head.element, named("li"));
        assert_eq!(
            selector.head.filters,
            vec![
                SimpleSelector::Class("item".to_string()),
                SimpleSelector::Id("first".to_string()),
                SimpleSelector::Attribute(AttributeSelector {
                    namespace: None,
                    name: "data-x".to_string(),
                    matcher: Some((AttributeOperator::Equals, "1".to_string())),
                }),
                SimpleSelector::PseudoClass(PseudoClass::FirstChild),
            ]
        );
    }

    #[test]
    fn test_combinators() {
        let selector = single("div.nav > ul  li");
        assert_eq!(selector.head.element, named("div"));
        let combinators: Vec<_> = selector.tail.iter().map(|(c, _)| *c).collect();
        assert_eq!(combinators, [Combinator::Child, Combinator::Descendant]);
        assert_eq!(selector.tail[1].1.element, named("li"));
    }

    #[test]
    fn test_leading_child_combinator() {
        let selector = single("> a");
        assert_eq!(selector.head.element, named("a"));
        assert!(selector.tail.is_empty());
        assert_eq!(single(">a > b"), single("a > b"));

        let list = parse("a, > b").unwrap();
        assert_eq!(list.0[1].head.element, named("b"));

        assert!(matches!(parse(">"), Err(QueryError::Parse { .. })));
        assert!(matches!(parse("> > a"), Err(QueryError::Parse { .. })));
        assert!(matches!(parse("a >"), Err(QueryError::Parse { .. })));
    }

    #[test]
    fn test_groups() {
        let list = parse(" a , b>c ").unwrap();
        assert_eq!(list.0.len(), 2);
        assert_eq!(list.0[1].tail[0].0, Combinator::Child);
    }

    #[test]
    fn test_namespaced_selectors() {
        let selector = single("ns|x *|y [ns|a]");
        assert_eq!(
            selector.head.element,
            Some(TypeSelector {
                namespace: Some(NamePart::Name("ns".to_string())),
                name: NamePart::Name("x".to_string()),
            })
        );
        assert_eq!(
            selector.tail[0].1.element,
            Some(TypeSelector {
                namespace: Some(NamePart::Any),
                name: NamePart::Name("y".to_string()),
            })
        );
        let SimpleSelector::Attribute(attr) = &selector.tail[1].1.filters[0] else {
            panic!("expected attribute selector");
        };
        assert_eq!(attr.namespace, Some(NamePart::Name("ns".to_string())));
        assert_eq!(attr.name, "a");
    }

    #[test]
    fn test_functional_pseudo_classes() {
        let selector = single("p:nth-last-child(2n+2):not(.skip)");
        assert_eq!(
            selector.head.filters[0],
            SimpleSelector::PseudoClass(PseudoClass::NthLastChild(Nth { a: 2, b: 2 }))
        );
        assert_eq!(
            selector.head.filters[1],
            SimpleSelector::PseudoClass(PseudoClass::Not(Box::new(CompoundSelector {
                element: None,
                filters: vec![SimpleSelector::Class("skip".to_string())],
            })))
        );
    }

    #[test]
    fn test_unsupported_features() {
        for input in ["a + b", "a ~ b", "a:hover", "a::before", "a:lang(en)"] {
            assert!(
                matches!(parse(input), Err(QueryError::UnsupportedFeature { .. })),
                "{} should be unsupported",
                input
            );
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse(""), Err(QueryError::Parse { .. })));
        assert!(matches!(parse("a,"), Err(QueryError::Parse { .. })));
        assert!(matches!(parse("a["), Err(QueryError::Parse { .. })));
        assert!(matches!(parse("a:nth-child(x)"), Err(QueryError::Parse { column: 13, .. })));
        assert!(matches!(parse("."), Err(QueryError::Parse { .. })));
        assert!(matches!(
            parse(":nth-child(-9223372036854775808n+1)"),
            Err(QueryError::Parse { .. })
        ));
        assert!(matches!(parse("li:nth-of-type(n-9223372036854775808)"), Err(QueryError::Parse { .. })));
    }
}
