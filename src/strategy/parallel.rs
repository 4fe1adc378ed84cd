//! Parallel Query Evaluation
//!
//! Uses Rayon to fan independent evaluations out over the thread pool:
//! many expressions against one document, or one compiled query against
//! many documents. Parsed and compiled forms come from the shared caches,
//! so every worker evaluates the same immutable program.

use rayon::prelude::*;

use crate::dom::DocumentAccess;
use crate::engine::QueryEngine;
use crate::error::Result;
use crate::options::QueryOptions;
use crate::xpath::{CompiledQuery, XPathValue};

/// Evaluate multiple XPath expressions in parallel from the document node.
///
/// Results are returned in the order of `xpaths`; one failing expression
/// does not affect the others.
pub fn evaluate_parallel<D: DocumentAccess + Sync>(
    engine: &QueryEngine,
    doc: &D,
    xpaths: &[&str],
    options: &QueryOptions,
) -> Vec<Result<XPathValue>> {
    let context = doc.document_node_id();
    xpaths
        .par_iter()
        .map(|xpath| engine.evaluate(doc, context, xpath, options))
        .collect()
}

/// Run one compiled query against many documents, from each document node
pub fn evaluate_documents<D: DocumentAccess + Sync>(
    query: &CompiledQuery,
    docs: &[D],
    options: &QueryOptions,
) -> Vec<Result<XPathValue>> {
    docs.par_iter()
        .map(|doc| query.call(doc, doc.document_node_id(), options))
        .collect()
}

/// Parallel xmap - evaluate keyed XPath expressions and collect the results.
///
/// Fails if any expression fails; with several failures, which error is
/// reported is unspecified.
pub fn xmap<D: DocumentAccess + Sync>(
    engine: &QueryEngine,
    doc: &D,
    queries: &[(&str, &str)], // (key, xpath)
    options: &QueryOptions,
) -> Result<Vec<(String, XPathValue)>> {
    let context = doc.document_node_id();
    queries
        .par_iter()
        .map(|(key, xpath)| {
            engine
                .evaluate(doc, context, xpath, options)
                .map(|v| (key.to_string(), v))
        })
        .collect()
}
