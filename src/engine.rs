//! Query engine
//!
//! Owns the expression caches and routes selector text through parsing
//! (XPath) or parsing and translation (CSS) to one of the two backends.

use std::sync::Arc;

use crate::css;
use crate::dom::{DocumentAccess, NodeId};
use crate::error::Result;
use crate::options::{EngineConfig, QueryOptions};
use crate::xpath::{parser, CompiledQuery, Evaluator, ExprRef, ExpressionCache, XPathValue};

/// Parses, caches and evaluates XPath and CSS queries.
///
/// All methods take `&self`; the engine can be shared between threads and
/// used against any number of documents.
pub struct QueryEngine {
    xpath: ExpressionCache<ExprRef>,
    css: ExpressionCache<ExprRef>,
    compiled_xpath: ExpressionCache<CompiledQuery>,
    compiled_css: ExpressionCache<CompiledQuery>,
}

impl QueryEngine {
    pub fn new(config: EngineConfig) -> Self {
        QueryEngine {
            xpath: ExpressionCache::new("xpath", config.xpath_cache),
            css: ExpressionCache::new("css", config.css_cache),
            compiled_xpath: ExpressionCache::new("compiled xpath", config.compiled_cache),
            compiled_css: ExpressionCache::new("compiled css", config.compiled_cache),
        }
    }

    /// Parse XPath text, returning the cached AST when this exact text was seen before
    pub fn parse_xpath(&self, xpath: &str) -> Result<ExprRef> {
        self.xpath
            .get_or_try_insert_with(xpath, || parser::parse(xpath).map(Arc::new))
    }

    /// Parse a CSS selector group and translate it to an XPath AST, cached by text
    pub fn parse_css(&self, selector: &str) -> Result<ExprRef> {
        self.css
            .get_or_try_insert_with(selector, || css::to_xpath(selector).map(Arc::new))
    }

    /// Evaluate XPath with the interpreter
    #[must_use = "XPath evaluation result should be used"]
    pub fn evaluate<D: DocumentAccess + ?Sized>(
        &self,
        doc: &D,
        context: NodeId,
        xpath: &str,
        options: &QueryOptions,
    ) -> Result<XPathValue> {
        let expr = self.parse_xpath(xpath)?;
        Evaluator::new(doc, options).evaluate(&expr, context)
    }

    /// Select nodes matching a CSS selector, in document order
    #[must_use = "CSS selection result should be used"]
    pub fn evaluate_css<D: DocumentAccess + ?Sized>(
        &self,
        doc: &D,
        context: NodeId,
        selector: &str,
        options: &QueryOptions,
    ) -> Result<Vec<NodeId>> {
        let expr = self.parse_css(selector)?;
        Evaluator::new(doc, options)
            .evaluate(&expr, context)?
            .into_nodeset()
    }

    /// Compile XPath into a reusable query, cached by text
    pub fn compile(&self, xpath: &str) -> Result<CompiledQuery> {
        self.compiled_xpath.get_or_try_insert_with(xpath, || {
            let expr = self.parse_xpath(xpath)?;
            Ok(CompiledQuery::new(xpath, &expr))
        })
    }

    /// Compile a CSS selector group into a reusable query, cached by text
    pub fn compile_css(&self, selector: &str) -> Result<CompiledQuery> {
        self.compiled_css.get_or_try_insert_with(selector, || {
            let expr = self.parse_css(selector)?;
            Ok(CompiledQuery::new(selector, &expr))
        })
    }

    /// Drop every cached AST and compiled query
    pub fn clear_caches(&self) {
        self.xpath.clear();
        self.css.clear();
        self.compiled_xpath.clear();
        self.compiled_css.clear();
        log::debug!("query caches cleared");
    }

    /// Number of cached XPath ASTs, CSS ASTs and compiled queries
    pub fn cache_sizes(&self) -> (usize, usize, usize) {
        (
            self.xpath.len(),
            self.css.len(),
            self.compiled_xpath.len() + self.compiled_css.len(),
        )
    }
}

impl Default for QueryEngine {
    fn default() -> Self {
        QueryEngine::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::fixture::parse;
    use crate::error::QueryError;
    use crate::options::CachePolicy;
    use std::num::NonZeroUsize;

    const DOC: &str = concat!(
        r#"<shop><item id="i1" class="fruit"><name>apple</name><price>3</price></item>"#,
        r#"<item id="i2" class="veg"><name>leek</name><price>2</price></item>"#,
        r#"<item id="i3" class="fruit"><name>pear</name><price>4</price></item></shop>"#
    );

    #[test]
    fn test_parse_cache_identity() {
        let engine = QueryEngine::default();
        let first = engine.parse_xpath("//item[price > 2]").unwrap();
        let second = engine.parse_xpath("//item[price > 2]").unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        // keys are the raw text
        let spaced = engine.parse_xpath("//item[price>2]").unwrap();
        assert!(!Arc::ptr_eq(&first, &spaced));
        assert_eq!(first, spaced);

        let css_first = engine.parse_css("item.fruit").unwrap();
        let css_second = engine.parse_css("item.fruit").unwrap();
        assert!(Arc::ptr_eq(&css_first, &css_second));
        assert_eq!(engine.cache_sizes(), (2, 1, 0));
    }

    #[test]
    fn test_parse_failure_not_cached() {
        let engine = QueryEngine::default();
        assert!(matches!(
            engine.parse_xpath("//item["),
            Err(QueryError::Parse { .. })
        ));
        assert!(matches!(
            engine.compile_css("item >"),
            Err(QueryError::Parse { .. })
        ));
        assert_eq!(engine.cache_sizes(), (0, 0, 0));
    }

    #[test]
    fn test_compiled_cache_identity() {
        let engine = QueryEngine::default();
        let first = engine.compile("count(//item)").unwrap();
        let second = engine.compile("count(//item)").unwrap();
        assert!(first.ptr_eq(&second));

        // same text in the other language is a separate entry
        let xpath = engine.compile("item").unwrap();
        let css = engine.compile_css("item").unwrap();
        assert!(!xpath.ptr_eq(&css));
        assert_eq!(engine.cache_sizes(), (2, 1, 3));

        engine.clear_caches();
        assert_eq!(engine.cache_sizes(), (0, 0, 0));
        assert!(!engine.compile("count(//item)").unwrap().ptr_eq(&first));
    }

    #[test]
    fn test_bounded_caches_evict() {
        let engine = QueryEngine::new(EngineConfig::default().with_xpath_cache(CachePolicy::Bounded(
            NonZeroUsize::new(2).unwrap(),
        )));
        let first = engine.parse_xpath("a").unwrap();
        engine.parse_xpath("b").unwrap();
        engine.parse_xpath("c").unwrap();
        assert_eq!(engine.cache_sizes().0, 2);
        assert!(!Arc::ptr_eq(&first, &engine.parse_xpath("a").unwrap()));
    }

    #[test]
    fn test_backends_agree() {
        let doc = parse(DOC);
        let engine = QueryEngine::default();
        let options = QueryOptions::default();
        let root = doc.document_node_id();
        for xpath in [
            "//item[@class = 'fruit']/name",
            "sum(//price)",
            "//item[price > 2][last()]/@id",
            "string(//item[2]/name)",
            "count(//name) = 3",
        ] {
            let interpreted = engine.evaluate(&doc, root, xpath, &options).unwrap();
            let compiled = engine.compile(xpath).unwrap().call(&doc, root, &options).unwrap();
            assert_eq!(interpreted, compiled, "{}", xpath);
        }

        let selected = engine.evaluate_css(&doc, root, "shop > .fruit", &options).unwrap();
        let compiled = engine
            .compile_css("shop > .fruit")
            .unwrap()
            .call(&doc, root, &options)
            .unwrap();
        assert_eq!(selected.len(), 2);
        assert_eq!(XPathValue::NodeSet(selected), compiled);
    }

    #[test]
    fn test_evaluate_css_from_element() {
        let doc = parse(DOC);
        let engine = QueryEngine::default();
        let shop = doc.root_element_id().unwrap();
        let names: Vec<_> = engine
            .evaluate_css(&doc, shop, "item:nth-child(odd) name", &QueryOptions::default())
            .unwrap()
            .into_iter()
            .map(|n| crate::dom::node_string_value(&doc, n))
            .collect();
        assert_eq!(names, ["apple", "pear"]);

        let children = engine
            .evaluate_css(&doc, shop, "> item", &QueryOptions::default())
            .unwrap();
        assert_eq!(children.len(), 3);
    }

    #[test]
    fn test_out_of_range_nth_is_a_parse_error() {
        let doc = parse(DOC);
        let engine = QueryEngine::default();
        let root = doc.document_node_id();
        for selector in [
            ":nth-child(-9223372036854775808n+1)",
            "item:nth-last-child(n-9223372036854775808)",
            "item:nth-of-type(99999999999)",
        ] {
            assert!(
                matches!(
                    engine.evaluate_css(&doc, root, selector, &QueryOptions::default()),
                    Err(QueryError::Parse { .. })
                ),
                "{}",
                selector
            );
            assert!(matches!(engine.compile_css(selector), Err(QueryError::Parse { .. })));
        }
    }

    #[test]
    fn test_engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<QueryEngine>();
    }
}
