//! XPath 1.0 Engine
//!
//! - Lexer and recursive descent parser producing a shared, immutable AST
//! - All 13 axes and the 27 core functions
//! - Two backends over the same AST: the [`Evaluator`] interpreter and the
//!   [`CompiledQuery`] stack machine
//! - Source-text keyed expression caching

pub mod ast;
pub mod axes;
pub mod cache;
pub mod compiler;
pub mod conversion;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod value;

pub use ast::{Axis, BinaryOp, Expr, ExprRef, NodeTest};
pub use cache::ExpressionCache;
pub use compiler::CompiledQuery;
pub use eval::{EvalContext, Evaluator};
pub use functions::Function;
pub use value::XPathValue;
