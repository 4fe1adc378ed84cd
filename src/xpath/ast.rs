//! Query AST
//!
//! Immutable, reference-counted expression trees shared by both backends and
//! produced by both the XPath parser and the CSS transformer. Rewrites never
//! mutate a node: [`Expr::with_children`] builds a new node that shares every
//! untouched subtree with the original.

use std::fmt;
use std::sync::Arc;

/// Shared handle to an expression node
pub type ExprRef = Arc<Expr>;

/// Expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `/a/b`: steps applied starting from the document node. No steps means `/`.
    AbsolutePath(Vec<ExprRef>),
    /// `a/b`, `$x/a`, `(a|b)//c`: the first part is evaluated against the
    /// context, each following part is a [`Expr::Step`] applied to the result.
    RelativePath(Vec<ExprRef>),
    /// Location step
    Step {
        axis: Axis,
        test: NodeTest,
        predicates: Vec<ExprRef>,
    },
    /// `primary[pred]...`, predicates applied in document order
    Filter {
        primary: ExprRef,
        predicates: Vec<ExprRef>,
    },
    /// Binary operation
    Binary {
        op: BinaryOp,
        left: ExprRef,
        right: ExprRef,
    },
    /// `a | b`
    Union(ExprRef, ExprRef),
    /// Unary minus
    Negate(ExprRef),
    /// Literal string
    String(String),
    /// Literal number
    Number(f64),
    /// Function call
    Call { name: String, args: Vec<ExprRef> },
    /// Variable reference
    Variable(String),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "div",
            BinaryOp::Mod => "mod",
        }
    }
}

/// XPath axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
    Self_,
    Attribute,
    Namespace,
}

impl Axis {
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "child" => Some(Axis::Child),
            "descendant" => Some(Axis::Descendant),
            "descendant-or-self" => Some(Axis::DescendantOrSelf),
            "parent" => Some(Axis::Parent),
            "ancestor" => Some(Axis::Ancestor),
            "ancestor-or-self" => Some(Axis::AncestorOrSelf),
            "following-sibling" => Some(Axis::FollowingSibling),
            "preceding-sibling" => Some(Axis::PrecedingSibling),
            "following" => Some(Axis::Following),
            "preceding" => Some(Axis::Preceding),
            "self" => Some(Axis::Self_),
            "attribute" => Some(Axis::Attribute),
            "namespace" => Some(Axis::Namespace),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Axis::Child => "child",
            Axis::Descendant => "descendant",
            Axis::DescendantOrSelf => "descendant-or-self",
            Axis::Parent => "parent",
            Axis::Ancestor => "ancestor",
            Axis::AncestorOrSelf => "ancestor-or-self",
            Axis::FollowingSibling => "following-sibling",
            Axis::PrecedingSibling => "preceding-sibling",
            Axis::Following => "following",
            Axis::Preceding => "preceding",
            Axis::Self_ => "self",
            Axis::Attribute => "attribute",
            Axis::Namespace => "namespace",
        }
    }

    /// Reverse axes number their predicate positions from the context outward
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Axis::Parent
                | Axis::Ancestor
                | Axis::AncestorOrSelf
                | Axis::PrecedingSibling
                | Axis::Preceding
        )
    }
}

/// Node test in a location step
#[derive(Debug, Clone, PartialEq)]
pub enum NodeTest {
    /// `*` and `*:*`
    Any,
    /// `name`
    Name(String),
    /// `prefix:name`
    QName(String, String),
    /// `prefix:*`
    NamespaceWildcard(String),
    /// `*:name`
    LocalWildcard(String),
    /// `node()`
    Node,
    /// `text()`, matches text and CDATA
    Text,
    /// `comment()`
    Comment,
    /// `cdata()`
    CData,
    /// `processing-instruction()` with optional target literal
    ProcessingInstruction(Option<String>),
}

impl Expr {
    /// Ordered child expressions
    pub fn children(&self) -> Vec<&ExprRef> {
        match self {
            Expr::AbsolutePath(parts) | Expr::RelativePath(parts) => parts.iter().collect(),
            Expr::Step { predicates, .. } => predicates.iter().collect(),
            Expr::Filter { primary, predicates } => {
                std::iter::once(primary).chain(predicates.iter()).collect()
            }
            Expr::Binary { left, right, .. } | Expr::Union(left, right) => vec![left, right],
            Expr::Negate(inner) => vec![inner],
            Expr::Call { args, .. } => args.iter().collect(),
            Expr::String(_) | Expr::Number(_) | Expr::Variable(_) => Vec::new(),
        }
    }

    /// A copy of this node with its children replaced.
    ///
    /// `children` must have the shape [`Expr::children`] returns; missing
    /// operands of fixed-arity nodes keep the original subtree.
    pub fn with_children(&self, children: Vec<ExprRef>) -> Expr {
        let mut iter = children.into_iter();
        match self {
            Expr::AbsolutePath(_) => Expr::AbsolutePath(iter.collect()),
            Expr::RelativePath(_) => Expr::RelativePath(iter.collect()),
            Expr::Step { axis, test, .. } => Expr::Step {
                axis: *axis,
                test: test.clone(),
                predicates: iter.collect(),
            },
            Expr::Filter { primary, .. } => Expr::Filter {
                primary: iter.next().unwrap_or_else(|| Arc::clone(primary)),
                predicates: iter.collect(),
            },
            Expr::Binary { op, left, right } => Expr::Binary {
                op: *op,
                left: iter.next().unwrap_or_else(|| Arc::clone(left)),
                right: iter.next().unwrap_or_else(|| Arc::clone(right)),
            },
            Expr::Union(left, right) => Expr::Union(
                iter.next().unwrap_or_else(|| Arc::clone(left)),
                iter.next().unwrap_or_else(|| Arc::clone(right)),
            ),
            Expr::Negate(inner) => Expr::Negate(iter.next().unwrap_or_else(|| Arc::clone(inner))),
            Expr::Call { name, .. } => Expr::Call {
                name: name.clone(),
                args: iter.collect(),
            },
            Expr::String(_) | Expr::Number(_) | Expr::Variable(_) => self.clone(),
        }
    }

    /// A copy with one more trailing child (predicate, path part or argument)
    pub fn push_child(&self, child: ExprRef) -> Expr {
        let mut children: Vec<ExprRef> = self.children().into_iter().cloned().collect();
        children.push(child);
        self.with_children(children)
    }

    pub fn step(axis: Axis, test: NodeTest) -> Expr {
        Expr::Step {
            axis,
            test,
            predicates: Vec::new(),
        }
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Arc::new(left),
            right: Arc::new(right),
        }
    }

    pub fn call(name: &str, args: Vec<Expr>) -> Expr {
        Expr::Call {
            name: name.to_string(),
            args: args.into_iter().map(Arc::new).collect(),
        }
    }
}

impl fmt::Display for NodeTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeTest::Any => f.write_str("*"),
            NodeTest::Name(name) => f.write_str(name),
            NodeTest::QName(prefix, local) => write!(f, "{}:{}", prefix, local),
            NodeTest::NamespaceWildcard(prefix) => write!(f, "{}:*", prefix),
            NodeTest::LocalWildcard(local) => write!(f, "*:{}", local),
            NodeTest::Node => f.write_str("node()"),
            NodeTest::Text => f.write_str("text()"),
            NodeTest::Comment => f.write_str("comment()"),
            NodeTest::CData => f.write_str("cdata()"),
            NodeTest::ProcessingInstruction(None) => f.write_str("processing-instruction()"),
            NodeTest::ProcessingInstruction(Some(target)) => {
                write!(f, "processing-instruction('{}')", target)
            }
        }
    }
}

/// Renders expressions back to (fully parenthesised, unabbreviated) XPath.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, parts: &[ExprRef], sep: &str| -> fmt::Result {
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    f.write_str(sep)?;
                }
                write!(f, "{}", part)?;
            }
            Ok(())
        };
        match self {
            Expr::AbsolutePath(parts) => {
                f.write_str("/")?;
                join(f, parts, "/")
            }
            Expr::RelativePath(parts) => join(f, parts, "/"),
            Expr::Step {
                axis,
                test,
                predicates,
            } => {
                write!(f, "{}::{}", axis.as_str(), test)?;
                for pred in predicates {
                    write!(f, "[{}]", pred)?;
                }
                Ok(())
            }
            Expr::Filter { primary, predicates } => {
                write!(f, "({})", primary)?;
                for pred in predicates {
                    write!(f, "[{}]", pred)?;
                }
                Ok(())
            }
            Expr::Binary { op, left, right } => write!(f, "({} {} {})", left, op.as_str(), right),
            Expr::Union(left, right) => write!(f, "({} | {})", left, right),
            Expr::Negate(inner) => write!(f, "-({})", inner),
            Expr::String(s) if s.contains('"') => write!(f, "'{}'", s),
            Expr::String(s) => write!(f, "\"{}\"", s),
            Expr::Number(n) => f.write_str(&super::conversion::format_number(*n)),
            Expr::Call { name, args } => {
                write!(f, "{}(", name)?;
                join(f, args, ", ")?;
                f.write_str(")")
            }
            Expr::Variable(name) => write!(f, "${}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_child_shares_untouched_subtrees() {
        let pred = Arc::new(Expr::call("true", vec![]));
        let step = Expr::Step {
            axis: Axis::Child,
            test: NodeTest::Name("a".to_string()),
            predicates: vec![Arc::clone(&pred)],
        };
        let extra = Arc::new(Expr::Number(1.0));
        let updated = step.push_child(Arc::clone(&extra));

        let children = updated.children();
        assert_eq!(children.len(), 2);
        assert!(Arc::ptr_eq(children[0], &pred));
        assert!(Arc::ptr_eq(children[1], &extra));
        // original untouched
        assert_eq!(step.children().len(), 1);
    }

    #[test]
    fn test_with_children_keeps_fixed_operands() {
        let left = Arc::new(Expr::Number(1.0));
        let right = Arc::new(Expr::Number(2.0));
        let sum = Expr::Binary {
            op: BinaryOp::Add,
            left: Arc::clone(&left),
            right,
        };
        let replacement = Arc::new(Expr::Number(5.0));
        let updated = sum.with_children(vec![Arc::clone(&left), Arc::clone(&replacement)]);
        match &updated {
            Expr::Binary { left: l, right: r, .. } => {
                assert!(Arc::ptr_eq(l, &left));
                assert!(Arc::ptr_eq(r, &replacement));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_display_round_trips_shape() {
        let expr = Expr::RelativePath(vec![
            Arc::new(Expr::step(Axis::Child, NodeTest::Name("a".to_string()))),
            Arc::new(Expr::step(Axis::Attribute, NodeTest::Any)),
        ]);
        assert_eq!(expr.to_string(), "child::a/attribute::*");
    }

    #[test]
    fn test_reverse_axes() {
        assert!(Axis::PrecedingSibling.is_reverse());
        assert!(Axis::Ancestor.is_reverse());
        assert!(!Axis::FollowingSibling.is_reverse());
        assert_eq!(Axis::from_name("preceding"), Some(Axis::Preceding));
        assert_eq!(Axis::from_name("sideways"), None);
    }
}
