//! RustyQuery - XPath 1.0 and CSS selector queries over read-only trees
//!
//! Pipeline:
//! - XPath: lexer -> parser -> shared AST
//! - CSS: lexer -> selector parser -> transformer -> shared AST
//! - Backends: interpreter ([`xpath::Evaluator`]) or compiled program ([`CompiledQuery`])
//! - Batch: rayon-parallel evaluation ([`strategy::parallel`])
//!
//! Trees are read through [`DocumentAccess`]; [`XmlDocument`] is the arena
//! implementation shipped with the crate.

pub mod css;
pub mod dom;
pub mod engine;
pub mod error;
pub mod options;
pub mod strategy;
pub mod xpath;

use std::sync::OnceLock;

pub use dom::{DocumentAccess, DocumentBuilder, NodeId, NodeKind, XmlDocument};
pub use engine::QueryEngine;
pub use error::{QueryError, Result};
pub use options::{CachePolicy, EngineConfig, PositionRounding, QueryOptions};
pub use xpath::{CompiledQuery, XPathValue};

// ============================================================================
// Default Engine
// ============================================================================

static DEFAULT_ENGINE: OnceLock<QueryEngine> = OnceLock::new();

/// Process-wide engine with unbounded caches, created on first use
pub fn default_engine() -> &'static QueryEngine {
    DEFAULT_ENGINE.get_or_init(QueryEngine::default)
}

/// Evaluate an XPath expression from `context`
#[must_use = "XPath evaluation result should be used"]
pub fn evaluate<D: DocumentAccess + ?Sized>(
    doc: &D,
    context: NodeId,
    xpath: &str,
    options: &QueryOptions,
) -> Result<XPathValue> {
    default_engine().evaluate(doc, context, xpath, options)
}

/// Select the nodes matching a CSS selector group from `context`
#[must_use = "CSS selection result should be used"]
pub fn evaluate_css<D: DocumentAccess + ?Sized>(
    doc: &D,
    context: NodeId,
    selector: &str,
) -> Result<Vec<NodeId>> {
    default_engine().evaluate_css(doc, context, selector, &QueryOptions::default())
}

/// Compile an XPath expression into a reusable query
pub fn compile(xpath: &str) -> Result<CompiledQuery> {
    default_engine().compile(xpath)
}

/// Compile a CSS selector group into a reusable query
pub fn compile_css(selector: &str) -> Result<CompiledQuery> {
    default_engine().compile_css(selector)
}
