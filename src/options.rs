//! Engine and per-query configuration

use crate::xpath::XPathValue;
use std::collections::HashMap;
use std::num::NonZeroUsize;

/// Eviction policy of an expression cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Entries live as long as the engine
    #[default]
    Unbounded,
    /// Least-recently-used eviction beyond the given number of entries
    Bounded(NonZeroUsize),
}

/// Cache configuration of a [`QueryEngine`](crate::QueryEngine)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineConfig {
    /// XPath source text to AST
    pub xpath_cache: CachePolicy,
    /// CSS source text to translated AST
    pub css_cache: CachePolicy,
    /// Source text to compiled query, for both languages
    pub compiled_cache: CachePolicy,
}

impl EngineConfig {
    pub fn with_xpath_cache(mut self, policy: CachePolicy) -> Self {
        self.xpath_cache = policy;
        self
    }

    pub fn with_css_cache(mut self, policy: CachePolicy) -> Self {
        self.css_cache = policy;
        self
    }

    pub fn with_compiled_cache(mut self, policy: CachePolicy) -> Self {
        self.compiled_cache = policy;
        self
    }

    /// Same bound on every cache
    pub fn bounded(capacity: NonZeroUsize) -> Self {
        let policy = CachePolicy::Bounded(capacity);
        EngineConfig {
            xpath_cache: policy,
            css_cache: policy,
            compiled_cache: policy,
        }
    }
}

/// How a numeric predicate value is mapped to a position.
///
/// `Truncate` drops the fraction, so `[1.5]` selects the first node.
/// `HalfUp` rounds to the nearest integer with halves going up, so `[1.5]`
/// selects the second node. Non-finite values select nothing either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionRounding {
    #[default]
    Truncate,
    HalfUp,
}

impl PositionRounding {
    /// Whether the 1-based `position` is selected by predicate value `n`
    pub fn selects(self, position: usize, n: f64) -> bool {
        if !n.is_finite() {
            return false;
        }
        let target = match self {
            PositionRounding::Truncate => n.trunc(),
            PositionRounding::HalfUp => (n + 0.5).floor(),
        };
        target == position as f64
    }
}

/// Per-call evaluation options
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Caller-supplied prefix to namespace URI aliases
    pub namespaces: HashMap<String, String>,
    /// `$name` bindings
    pub variables: HashMap<String, XPathValue>,
    pub rounding: PositionRounding,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.insert(prefix.into(), uri.into());
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<XPathValue>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn with_rounding(mut self, rounding: PositionRounding) -> Self {
        self.rounding = rounding;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_selects_first_for_one_and_a_half() {
        assert!(PositionRounding::Truncate.selects(1, 1.5));
        assert!(!PositionRounding::Truncate.selects(2, 1.5));
        assert!(PositionRounding::Truncate.selects(2, 2.0));
    }

    #[test]
    fn test_half_up_selects_second_for_one_and_a_half() {
        assert!(PositionRounding::HalfUp.selects(2, 1.5));
        assert!(!PositionRounding::HalfUp.selects(1, 1.5));
        assert!(PositionRounding::HalfUp.selects(1, 1.4));
    }

    #[test]
    fn test_non_finite_selects_nothing() {
        for rounding in [PositionRounding::Truncate, PositionRounding::HalfUp] {
            assert!(!rounding.selects(1, f64::NAN));
            assert!(!rounding.selects(1, f64::INFINITY));
        }
    }

    #[test]
    fn test_option_builders() {
        let options = QueryOptions::new()
            .with_namespace("n", "urn:y")
            .with_variable("count", 10.0)
            .with_rounding(PositionRounding::HalfUp);
        assert_eq!(options.namespaces.get("n").map(String::as_str), Some("urn:y"));
        assert_eq!(options.variables.get("count"), Some(&XPathValue::Number(10.0)));
        assert_eq!(options.rounding, PositionRounding::HalfUp);

        let config = EngineConfig::default().with_css_cache(CachePolicy::Bounded(
            NonZeroUsize::new(4).unwrap(),
        ));
        assert_eq!(config.xpath_cache, CachePolicy::Unbounded);
        assert!(matches!(config.css_cache, CachePolicy::Bounded(_)));
    }
}
