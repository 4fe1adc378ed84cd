//! XPath Value Types
//!
//! XPath 1.0 has four data types: node-set, boolean, number, and string.

use crate::dom::NodeId;
use crate::error::{QueryError, Result};

/// XPath value types
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum XPathValue {
    /// A set of nodes in document order, no duplicates
    NodeSet(Vec<NodeId>),
    /// Boolean value
    Boolean(bool),
    /// Floating-point number
    Number(f64),
    /// String value
    String(String),
}

impl XPathValue {
    /// Create an empty node set
    pub fn empty_nodeset() -> Self {
        XPathValue::NodeSet(Vec::new())
    }

    /// Create a node set with a single node
    pub fn single_node(id: NodeId) -> Self {
        XPathValue::NodeSet(vec![id])
    }

    /// Name of the value's type, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            XPathValue::NodeSet(_) => "node-set",
            XPathValue::Boolean(_) => "boolean",
            XPathValue::Number(_) => "number",
            XPathValue::String(_) => "string",
        }
    }

    /// Check if this is a node set
    pub fn is_nodeset(&self) -> bool {
        matches!(self, XPathValue::NodeSet(_))
    }

    /// Get as node set, or None
    pub fn as_nodeset(&self) -> Option<&[NodeId]> {
        match self {
            XPathValue::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }

    /// Take the node set out, failing for scalars
    pub fn into_nodeset(self) -> Result<Vec<NodeId>> {
        match self {
            XPathValue::NodeSet(nodes) => Ok(nodes),
            other => Err(QueryError::TypeCoercion {
                expected: "node-set",
                found: other.type_name(),
            }),
        }
    }

    /// Get the number, if this is one
    pub fn as_number(&self) -> Option<f64> {
        match self {
            XPathValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl Default for XPathValue {
    fn default() -> Self {
        XPathValue::NodeSet(Vec::new())
    }
}

impl From<bool> for XPathValue {
    fn from(b: bool) -> Self {
        XPathValue::Boolean(b)
    }
}

impl From<f64> for XPathValue {
    fn from(n: f64) -> Self {
        XPathValue::Number(n)
    }
}

impl From<i64> for XPathValue {
    fn from(n: i64) -> Self {
        XPathValue::Number(n as f64)
    }
}

impl From<String> for XPathValue {
    fn from(s: String) -> Self {
        XPathValue::String(s)
    }
}

impl From<&str> for XPathValue {
    fn from(s: &str) -> Self {
        XPathValue::String(s.to_string())
    }
}

impl From<Vec<NodeId>> for XPathValue {
    fn from(nodes: Vec<NodeId>) -> Self {
        XPathValue::NodeSet(nodes)
    }
}
