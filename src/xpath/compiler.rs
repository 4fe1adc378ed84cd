//! XPath Expression Compiler
//!
//! Lowers the AST into a flat stack-machine program. Function names, node
//! tests and principal node kinds are resolved once here instead of on every
//! visit, and the program can be run against any number of documents.

use super::ast::{Axis, BinaryOp, Expr};
use super::axes::CompiledNodeTest;
use super::conversion::{to_boolean, to_float};
use super::eval::{binary_op, filter_by_predicate, lookup_variable, select_step, union, EvalContext};
use super::functions::Function;
use super::value::XPathValue;
use crate::dom::{DocumentAccess, NodeId};
use crate::error::{QueryError, Result};
use crate::options::QueryOptions;
use std::fmt;
use std::sync::Arc;

/// Compiled XPath expression
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpr {
    pub ops: Vec<Op>,
}

/// Compiled operation
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Push the document node
    Root,
    /// Push the context node
    Context,
    /// Pop a node-set and apply location steps, stopping once it is empty
    Steps(Vec<CompiledStep>),
    /// Pop a node-set and filter it in document order
    Filter(Vec<CompiledExpr>),
    /// Union two node sets
    Union,
    /// Push literal number
    Number(f64),
    /// Push literal string
    String(String),
    /// Variable reference
    Variable(String),
    /// Negate
    Negate,
    /// Binary operation other than `and`/`or`
    Binary(BinaryOp),
    /// Pop left operand; run the right program only if it is true
    And(CompiledExpr),
    /// Pop left operand; run the right program only if it is false
    Or(CompiledExpr),
    /// Call function
    Call(Function, usize), // function, arg count
    /// Fails with UnsupportedFeature when reached
    Unsupported(String),
}

/// Location step with its node test already resolved
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStep {
    pub axis: Axis,
    pub test: CompiledNodeTest,
    pub predicates: Vec<CompiledExpr>,
}

impl CompiledExpr {
    /// Compile an XPath expression
    pub fn compile(expr: &Expr) -> Self {
        let mut ops = Vec::new();
        Self::compile_expr(expr, &mut ops);
        CompiledExpr { ops }
    }

    fn compile_expr(expr: &Expr, ops: &mut Vec<Op>) {
        match expr {
            Expr::AbsolutePath(steps) => {
                ops.push(Op::Root);
                Self::compile_steps(steps.iter().map(|s| &**s), ops);
            }
            Expr::RelativePath(parts) => match parts.split_first() {
                None => ops.push(Op::Context),
                Some((first, _)) if matches!(first.as_ref(), Expr::Step { .. }) => {
                    ops.push(Op::Context);
                    Self::compile_steps(parts.iter().map(|s| &**s), ops);
                }
                Some((first, rest)) => {
                    Self::compile_expr(first, ops);
                    Self::compile_steps(rest.iter().map(|s| &**s), ops);
                }
            },
            Expr::Step { .. } => {
                ops.push(Op::Context);
                Self::compile_steps(std::iter::once(expr), ops);
            }
            Expr::Filter { primary, predicates } => {
                Self::compile_expr(primary, ops);
                ops.push(Op::Filter(predicates.iter().map(|p| CompiledExpr::compile(p)).collect()));
            }
            Expr::Binary { op: BinaryOp::And, left, right } => {
                Self::compile_expr(left, ops);
                ops.push(Op::And(CompiledExpr::compile(right)));
            }
            Expr::Binary { op: BinaryOp::Or, left, right } => {
                Self::compile_expr(left, ops);
                ops.push(Op::Or(CompiledExpr::compile(right)));
            }
            Expr::Binary { op, left, right } => {
                Self::compile_expr(left, ops);
                Self::compile_expr(right, ops);
                ops.push(Op::Binary(*op));
            }
            Expr::Union(left, right) => {
                Self::compile_expr(left, ops);
                Self::compile_expr(right, ops);
                ops.push(Op::Union);
            }
            Expr::Negate(inner) => {
                Self::compile_expr(inner, ops);
                ops.push(Op::Negate);
            }
            Expr::String(s) => ops.push(Op::String(s.clone())),
            Expr::Number(n) => ops.push(Op::Number(*n)),
            Expr::Call { name, args } => match Function::from_name(name) {
                Some(function) => {
                    for arg in args {
                        Self::compile_expr(arg, ops);
                    }
                    ops.push(Op::Call(function, args.len()));
                }
                None => ops.push(Op::Unsupported(format!("function {}()", name))),
            },
            Expr::Variable(name) => ops.push(Op::Variable(name.clone())),
        }
    }

    fn compile_steps<'e>(steps: impl IntoIterator<Item = &'e Expr>, ops: &mut Vec<Op>) {
        let mut compiled = Vec::new();
        for step in steps {
            let Expr::Step { axis, test, predicates } = step else {
                ops.push(Op::Unsupported("expression as location step".to_string()));
                return;
            };
            compiled.push(CompiledStep {
                axis: *axis,
                test: CompiledNodeTest::new(test, *axis),
                predicates: predicates.iter().map(|p| CompiledExpr::compile(p)).collect(),
            });
        }
        if !compiled.is_empty() {
            ops.push(Op::Steps(compiled));
        }
    }

    /// Run the program
    pub fn execute<D: DocumentAccess + ?Sized>(
        &self,
        options: &QueryOptions,
        ctx: &EvalContext<'_, D>,
    ) -> Result<XPathValue> {
        let doc = ctx.doc;
        let mut stack: Vec<XPathValue> = Vec::new();

        for op in &self.ops {
            let value = match op {
                Op::Root => XPathValue::single_node(doc.document_node_id()),
                Op::Context => XPathValue::single_node(ctx.context_node),
                Op::Steps(steps) => {
                    let mut nodes = pop(&mut stack).into_nodeset()?;
                    for step in steps {
                        if nodes.is_empty() {
                            break;
                        }
                        nodes = select_step(
                            doc,
                            options,
                            &nodes,
                            step.axis,
                            &step.test,
                            step.predicates.len(),
                            |index, c| step.predicates[index].execute(options, c),
                        )?;
                    }
                    XPathValue::NodeSet(nodes)
                }
                Op::Filter(predicates) => {
                    let mut nodes = pop(&mut stack).into_nodeset()?;
                    for predicate in predicates {
                        if nodes.is_empty() {
                            break;
                        }
                        nodes = filter_by_predicate(doc, nodes, options.rounding, |c| {
                            predicate.execute(options, c)
                        })?;
                    }
                    XPathValue::NodeSet(nodes)
                }
                Op::Union => {
                    let right = pop(&mut stack);
                    let left = pop(&mut stack);
                    union(doc, left, right)?
                }
                Op::Number(n) => XPathValue::Number(*n),
                Op::String(s) => XPathValue::String(s.clone()),
                Op::Variable(name) => lookup_variable(options, name)?,
                Op::Negate => XPathValue::Number(-to_float(doc, &pop(&mut stack))),
                Op::Binary(op) => {
                    let right = pop(&mut stack);
                    let left = pop(&mut stack);
                    binary_op(doc, *op, left, right)
                }
                Op::And(right) => {
                    let left = to_boolean(&pop(&mut stack));
                    XPathValue::Boolean(left && to_boolean(&right.execute(options, ctx)?))
                }
                Op::Or(right) => {
                    let left = to_boolean(&pop(&mut stack));
                    XPathValue::Boolean(left || to_boolean(&right.execute(options, ctx)?))
                }
                Op::Call(function, arg_count) => {
                    let args = stack.split_off(stack.len().saturating_sub(*arg_count));
                    function.call(args, ctx)?
                }
                Op::Unsupported(name) => return Err(QueryError::unsupported(name.clone())),
            };
            stack.push(value);
        }

        Ok(pop(&mut stack))
    }
}

fn pop(stack: &mut Vec<XPathValue>) -> XPathValue {
    stack.pop().unwrap_or_default()
}

/// A compiled, reusable query.
///
/// Cheap to clone and safe to share between threads; holds no document
/// state, so one instance can be called against any number of documents.
#[derive(Clone)]
pub struct CompiledQuery {
    inner: Arc<CompiledQueryInner>,
}

struct CompiledQueryInner {
    source: String,
    program: CompiledExpr,
}

impl CompiledQuery {
    /// Compile an AST; `source` is kept for diagnostics
    pub fn new(source: &str, expr: &Expr) -> Self {
        log::debug!("compiling query {:?}", source);
        CompiledQuery {
            inner: Arc::new(CompiledQueryInner {
                source: source.to_string(),
                program: CompiledExpr::compile(expr),
            }),
        }
    }

    pub fn source(&self) -> &str {
        &self.inner.source
    }

    pub fn program(&self) -> &CompiledExpr {
        &self.inner.program
    }

    /// Evaluate against `doc` with `context` as the context node
    pub fn call<D: DocumentAccess + ?Sized>(
        &self,
        doc: &D,
        context: NodeId,
        options: &QueryOptions,
    ) -> Result<XPathValue> {
        self.inner.program.execute(options, &EvalContext::new(doc, context))
    }

    /// Whether both handles share one compiled program
    pub fn ptr_eq(&self, other: &CompiledQuery) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledQuery")
            .field("source", &self.inner.source)
            .field("ops", &self.inner.program.ops.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::fixture::parse;
    use crate::dom::XmlDocument;
    use crate::options::PositionRounding;
    use crate::xpath::eval::Evaluator;
    use crate::xpath::parser;

    fn compile(xpath: &str) -> CompiledQuery {
        CompiledQuery::new(xpath, &parser::parse(xpath).unwrap())
    }

    const DOC: &str = concat!(
        r#"<library xmlns:ns1="urn:one" xml:lang="en">"#,
        r#"<book id="b1" year="1999"><title>Alpha</title><price>10</price></book>"#,
        r#"<book id="b2" year="2005"><title>Beta</title><price>25.5</price><!--note--></book>"#,
        r#"<ns1:book id="b3"><title>Gamma</title><price>7</price></ns1:book>"#,
        r#"<shelf><book id="b4"><title>Delta</title></book></shelf>"#,
        r#"<?render fast?><![CDATA[raw]]>tail"#,
        r#"</library>"#
    );

    const CORPUS: &[&str] = &[
        "/library/book",
        "//book",
        "//title/text()",
        "book[2]/title",
        "book[last()]/@id",
        "//book[price > 9]/title",
        "//book[@year][1]",
        "count(//book)",
        "sum(book/price)",
        "string(//book[@id='b3']/title)",
        "//book/preceding-sibling::*[1]",
        "//title/ancestor::*",
        "//price/following::title",
        "//title/preceding::price",
        "shelf/book/ancestor-or-self::*[2]",
        "ns1:book/title",
        "*:book",
        "*[position() mod 2 = 1]",
        "(//title)[position() < 3]",
        "//book[title = 'Beta'] | //book[@id = 'b1']",
        "//node()[self::comment() or self::processing-instruction('render')]",
        "cdata()",
        "book[price * 2 > 30 or @year < 2000]/@id",
        "not(book[5]) and true()",
        "-(book[1]/price) + 1",
        "concat(name(*[3]), '-', local-name(*[3]), '-', namespace-uri(*[3]))",
        "substring-before(//book[2]/@year, '5')",
        "normalize-space(translate(' a-b ', '-', ' '))",
        "lang('EN')",
        "id('b2 b4')/title",
        "round(book[2]/price) = 26",
        "//book[title][price][1.5]",
        "book[$pos]",
        "$books/title",
        "/",
        ".//..",
        "namespace::*",
        "namespace::ns1",
        "ns1:book/namespace::*",
        "count(shelf/book/namespace::*)",
        "string(namespace::ns1)",
        "//namespace::*/..",
        "/namespace::*",
    ];

    fn options(doc: &XmlDocument) -> QueryOptions {
        let books = Evaluator::new(doc, &QueryOptions::default())
            .evaluate(&parser::parse("//book").unwrap(), 0)
            .unwrap();
        QueryOptions::new().with_variable("pos", 2.0).with_variable("books", books)
    }

    #[test]
    fn test_compiler_agrees_with_interpreter() {
        let doc = parse(DOC);
        let root = doc.root_element_id().unwrap();
        for rounding in [PositionRounding::Truncate, PositionRounding::HalfUp] {
            let options = options(&doc).with_rounding(rounding);
            for &xpath in CORPUS {
                let expr = parser::parse(xpath).unwrap();
                let interpreted = Evaluator::new(&doc, &options).evaluate(&expr, root);
                let compiled = compile(xpath).call(&doc, root, &options);
                assert_eq!(interpreted, compiled, "backends disagree on {}", xpath);
            }
        }
    }

    #[test]
    fn test_compiled_namespace_axis() {
        let doc = parse(DOC);
        let root = doc.root_element_id().unwrap();
        let options = QueryOptions::default();
        let run = |xpath: &str| compile(xpath).call(&doc, root, &options).unwrap();
        assert_eq!(run("count(namespace::*)"), XPathValue::Number(1.0));
        assert_eq!(run("count(//namespace::ns1)"), XPathValue::Number(13.0));
        assert_eq!(run("string(ns1:book/namespace::*)"), XPathValue::String("urn:one".to_string()));
        assert_eq!(run("count(/namespace::*)"), XPathValue::Number(0.0));
    }

    #[test]
    fn test_compiler_agrees_on_errors() {
        let doc = parse(DOC);
        let root = doc.root_element_id().unwrap();
        let options = QueryOptions::default();
        for xpath in ["$missing", "unknown()", "1 | book", "count('x')", "concat('a')"] {
            let expr = parser::parse(xpath).unwrap();
            let interpreted = Evaluator::new(&doc, &options).evaluate(&expr, root);
            let compiled = compile(xpath).call(&doc, root, &options);
            assert!(interpreted.is_err(), "{} should fail", xpath);
            assert_eq!(interpreted, compiled, "backends disagree on {}", xpath);
        }
    }

    #[test]
    fn test_compile_shapes() {
        let compiled = compile("/root");
        assert!(matches!(compiled.program().ops[0], Op::Root));
        assert!(matches!(compiled.program().ops[1], Op::Steps(ref steps) if steps.len() == 1));

        let compiled = compile("//item");
        let Op::Steps(steps) = &compiled.program().ops[1] else {
            panic!("expected steps");
        };
        assert_eq!(steps[0].axis, Axis::DescendantOrSelf);
        assert_eq!(steps[1].test, CompiledNodeTest::Name(crate::dom::NodeKind::Element, "item".into()));
    }

    #[test]
    fn test_unknown_function_fails_only_when_reached() {
        let doc = parse("<root/>");
        let options = QueryOptions::default();
        let compiled = compile("false() and unknown()");
        assert_eq!(compiled.call(&doc, 0, &options), Ok(XPathValue::Boolean(false)));
        assert!(matches!(
            compile("unknown()").program().ops[0],
            Op::Unsupported(ref name) if name == "function unknown()"
        ));
    }

    #[test]
    fn test_compiled_query_reusable_across_documents() {
        let query = compile("count(//item)");
        let first = parse("<r><item/></r>");
        let second = parse("<r><item/><item/><x><item/></x></r>");
        let options = QueryOptions::default();
        assert_eq!(query.call(&first, 0, &options), Ok(XPathValue::Number(1.0)));
        assert_eq!(query.call(&second, 0, &options), Ok(XPathValue::Number(3.0)));

        fn assert_send_sync<T: Send + Sync>(_: &T) {}
        assert_send_sync(&query);
        assert!(query.ptr_eq(&query.clone()));
        assert_eq!(query.source(), "count(//item)");
    }
}
