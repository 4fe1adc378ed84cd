//! XPath Evaluation Engine
//!
//! Tree-walking interpreter over the [`Expr`] AST. Every node-set it
//! produces is in document order without duplicates.
//!
//! The step and predicate helpers here are shared with the compiled backend
//! so both agree on positions, ordering and coercions.

use super::ast::{Axis, BinaryOp, Expr, ExprRef};
use super::axes::{navigate, CompiledNodeTest};
use super::conversion::{to_boolean, to_float, values_equal};
use super::functions::Function;
use super::value::XPathValue;
use crate::dom::{sort_document_order, DocumentAccess, NodeId};
use crate::error::{QueryError, Result};
use crate::options::{PositionRounding, QueryOptions};

/// Evaluation context: the document plus the context node, position and size
pub struct EvalContext<'a, D: ?Sized> {
    pub doc: &'a D,
    pub context_node: NodeId,
    pub context_position: usize,
    pub context_size: usize,
}

impl<'a, D: ?Sized> EvalContext<'a, D> {
    /// Singleton context: position 1 of 1
    pub fn new(doc: &'a D, context_node: NodeId) -> Self {
        EvalContext {
            doc,
            context_node,
            context_position: 1,
            context_size: 1,
        }
    }
}

impl<D: ?Sized> Clone for EvalContext<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: ?Sized> Copy for EvalContext<'_, D> {}

/// AST interpreter bound to one document and one set of options
pub struct Evaluator<'a, D: DocumentAccess + ?Sized> {
    doc: &'a D,
    options: &'a QueryOptions,
}

impl<'a, D: DocumentAccess + ?Sized> Evaluator<'a, D> {
    pub fn new(doc: &'a D, options: &'a QueryOptions) -> Self {
        Evaluator { doc, options }
    }

    /// Evaluate `expr` with `context` as the singleton context node
    pub fn evaluate(&self, expr: &Expr, context: NodeId) -> Result<XPathValue> {
        self.eval(expr, &EvalContext::new(self.doc, context))
    }

    fn eval(&self, expr: &Expr, ctx: &EvalContext<'_, D>) -> Result<XPathValue> {
        match expr {
            Expr::AbsolutePath(steps) => {
                let start = vec![self.doc.document_node_id()];
                self.eval_steps(start, steps).map(XPathValue::NodeSet)
            }
            Expr::RelativePath(parts) => {
                let Some((first, rest)) = parts.split_first() else {
                    return Ok(XPathValue::single_node(ctx.context_node));
                };
                let start = match first.as_ref() {
                    Expr::Step { .. } => self.apply_step(&[ctx.context_node], first)?,
                    other => self.eval(other, ctx)?.into_nodeset()?,
                };
                self.eval_steps(start, rest).map(XPathValue::NodeSet)
            }
            Expr::Step { .. } => self.apply_step(&[ctx.context_node], expr).map(XPathValue::NodeSet),
            Expr::Filter { primary, predicates } => {
                let mut nodes = self.eval(primary, ctx)?.into_nodeset()?;
                for predicate in predicates {
                    if nodes.is_empty() {
                        break;
                    }
                    nodes = filter_by_predicate(self.doc, nodes, self.options.rounding, |c| {
                        self.eval(predicate, c)
                    })?;
                }
                Ok(XPathValue::NodeSet(nodes))
            }
            Expr::Binary { op: BinaryOp::And, left, right } => {
                let result = to_boolean(&self.eval(left, ctx)?) && to_boolean(&self.eval(right, ctx)?);
                Ok(XPathValue::Boolean(result))
            }
            Expr::Binary { op: BinaryOp::Or, left, right } => {
                let result = to_boolean(&self.eval(left, ctx)?) || to_boolean(&self.eval(right, ctx)?);
                Ok(XPathValue::Boolean(result))
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left, ctx)?;
                let right = self.eval(right, ctx)?;
                Ok(binary_op(self.doc, *op, left, right))
            }
            Expr::Union(left, right) => {
                let left = self.eval(left, ctx)?;
                let right = self.eval(right, ctx)?;
                union(self.doc, left, right)
            }
            Expr::Negate(inner) => Ok(XPathValue::Number(-to_float(self.doc, &self.eval(inner, ctx)?))),
            Expr::String(s) => Ok(XPathValue::String(s.clone())),
            Expr::Number(n) => Ok(XPathValue::Number(*n)),
            Expr::Call { name, args } => {
                let function = Function::from_name(name)
                    .ok_or_else(|| QueryError::unsupported(format!("function {}()", name)))?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, ctx))
                    .collect::<Result<Vec<_>>>()?;
                function.call(args, ctx)
            }
            Expr::Variable(name) => lookup_variable(self.options, name),
        }
    }

    /// Apply location steps left to right, stopping as soon as the set is empty
    fn eval_steps(&self, mut nodes: Vec<NodeId>, steps: &[ExprRef]) -> Result<Vec<NodeId>> {
        for step in steps {
            if nodes.is_empty() {
                break;
            }
            nodes = self.apply_step(&nodes, step)?;
        }
        Ok(nodes)
    }

    fn apply_step(&self, input: &[NodeId], step: &Expr) -> Result<Vec<NodeId>> {
        let Expr::Step { axis, test, predicates } = step else {
            return Err(QueryError::unsupported("expression as location step"));
        };
        let test = CompiledNodeTest::new(test, *axis);
        select_step(self.doc, self.options, input, *axis, &test, predicates.len(), |index, c| {
            self.eval(&predicates[index], c)
        })
    }
}

/// One location step from every node of `input`.
///
/// Predicates see proximity positions per context node (reverse axes count
/// from the context outward); the union of all results is returned in
/// document order.
pub(crate) fn select_step<D, F>(
    doc: &D,
    options: &QueryOptions,
    input: &[NodeId],
    axis: Axis,
    test: &CompiledNodeTest,
    predicate_count: usize,
    mut predicate: F,
) -> Result<Vec<NodeId>>
where
    D: DocumentAccess + ?Sized,
    F: FnMut(usize, &EvalContext<'_, D>) -> Result<XPathValue>,
{
    let mut result = Vec::new();
    for &context in input {
        let mut candidates: Vec<NodeId> = navigate(doc, context, axis)
            .into_iter()
            .filter(|&node| test.matches(doc, node, &options.namespaces))
            .collect();
        for index in 0..predicate_count {
            if candidates.is_empty() {
                break;
            }
            candidates = filter_by_predicate(doc, candidates, options.rounding, |c| predicate(index, c))?;
        }
        result.extend(candidates);
    }
    sort_document_order(doc, &mut result);
    Ok(result)
}

/// Keep the nodes a predicate selects.
///
/// A numeric result selects the node at that position (see
/// [`PositionRounding`]); anything else is converted to a boolean.
pub(crate) fn filter_by_predicate<D, F>(
    doc: &D,
    nodes: Vec<NodeId>,
    rounding: PositionRounding,
    mut predicate: F,
) -> Result<Vec<NodeId>>
where
    D: DocumentAccess + ?Sized,
    F: FnMut(&EvalContext<'_, D>) -> Result<XPathValue>,
{
    let size = nodes.len();
    let mut kept = Vec::with_capacity(size);
    for (i, node) in nodes.into_iter().enumerate() {
        let ctx = EvalContext {
            doc,
            context_node: node,
            context_position: i + 1,
            context_size: size,
        };
        let keep = match predicate(&ctx)? {
            XPathValue::Number(n) => rounding.selects(i + 1, n),
            other => to_boolean(&other),
        };
        if keep {
            kept.push(node);
        }
    }
    Ok(kept)
}

/// Non-short-circuiting binary operators
pub(crate) fn binary_op<D: DocumentAccess + ?Sized>(
    doc: &D,
    op: BinaryOp,
    left: XPathValue,
    right: XPathValue,
) -> XPathValue {
    let numbers = |l: &XPathValue, r: &XPathValue| (to_float(doc, l), to_float(doc, r));
    match op {
        BinaryOp::Or => XPathValue::Boolean(to_boolean(&left) || to_boolean(&right)),
        BinaryOp::And => XPathValue::Boolean(to_boolean(&left) && to_boolean(&right)),
        BinaryOp::Eq => XPathValue::Boolean(values_equal(doc, left, right)),
        BinaryOp::NotEq => XPathValue::Boolean(!values_equal(doc, left, right)),
        BinaryOp::Lt => {
            let (a, b) = numbers(&left, &right);
            XPathValue::Boolean(a < b)
        }
        BinaryOp::LtEq => {
            let (a, b) = numbers(&left, &right);
            XPathValue::Boolean(a <= b)
        }
        BinaryOp::Gt => {
            let (a, b) = numbers(&left, &right);
            XPathValue::Boolean(a > b)
        }
        BinaryOp::GtEq => {
            let (a, b) = numbers(&left, &right);
            XPathValue::Boolean(a >= b)
        }
        BinaryOp::Add => {
            let (a, b) = numbers(&left, &right);
            XPathValue::Number(a + b)
        }
        BinaryOp::Sub => {
            let (a, b) = numbers(&left, &right);
            XPathValue::Number(a - b)
        }
        BinaryOp::Mul => {
            let (a, b) = numbers(&left, &right);
            XPathValue::Number(a * b)
        }
        BinaryOp::Div => {
            let (a, b) = numbers(&left, &right);
            XPathValue::Number(a / b)
        }
        BinaryOp::Mod => {
            let (a, b) = numbers(&left, &right);
            XPathValue::Number(a % b)
        }
    }
}

/// `|`: both sides must be node-sets
pub(crate) fn union<D: DocumentAccess + ?Sized>(
    doc: &D,
    left: XPathValue,
    right: XPathValue,
) -> Result<XPathValue> {
    let mut result = left.into_nodeset()?;
    result.extend(right.into_nodeset()?);
    sort_document_order(doc, &mut result);
    Ok(XPathValue::NodeSet(result))
}

pub(crate) fn lookup_variable(options: &QueryOptions, name: &str) -> Result<XPathValue> {
    options
        .variables
        .get(name)
        .cloned()
        .ok_or_else(|| QueryError::UnboundVariable { name: name.to_string() })
}
