//! DOM Module - read-only tree interface and arena reference tree
//!
//! The query engine never owns or mutates the tree it searches; it reads it
//! through [`DocumentAccess`]. [`XmlDocument`] is an arena implementation of
//! that trait built through [`DocumentBuilder`]:
//! - Arena allocation for nodes, attributes and namespace nodes included
//! - NodeId (u32) indices in document order
//! - String interning for names, URIs and content
//! - Namespace resolution stack while building

pub mod document;
pub mod namespace;
pub mod node;
pub mod strings;

#[cfg(test)]
pub(crate) mod fixture;

pub use document::{DocumentBuilder, XmlDocument};
pub use node::{NodeId, NodeKind, XmlNode};
pub use strings::StringPool;

use std::borrow::Cow;
use std::cmp::Ordering;

/// Read-only access to a node tree.
///
/// Implementors expose node kinds, names, namespaces, ordered attributes and
/// children, parent links and a total document order. Attribute and namespace
/// nodes report their owner element as parent but are never returned as
/// children.
pub trait DocumentAccess {
    /// Id of the document (root) node
    fn document_node_id(&self) -> NodeId {
        0
    }

    /// Kind of a node
    fn node_kind_of(&self, id: NodeId) -> NodeKind;

    /// Parent node; the owner element for attributes
    fn parent_of(&self, id: NodeId) -> Option<NodeId>;

    fn first_child_of(&self, id: NodeId) -> Option<NodeId>;

    fn next_sibling_of(&self, id: NodeId) -> Option<NodeId>;

    fn prev_sibling_of(&self, id: NodeId) -> Option<NodeId>;

    /// Attribute nodes of an element, in source order
    fn attributes_of(&self, id: NodeId) -> Vec<NodeId>;

    /// Namespace nodes of an element, one per in-scope prefix binding
    /// (the default namespace included). Trees that do not model namespace
    /// nodes keep this default and expose none.
    fn namespaces_of(&self, _id: NodeId) -> Vec<NodeId> {
        Vec::new()
    }

    /// Local name of an element or attribute, target of a processing
    /// instruction, prefix of a namespace node (empty for the default namespace)
    fn node_local_name(&self, id: NodeId) -> Option<&str>;

    /// Prefix as written in the source (`ns1` for `<ns1:a>`)
    fn node_prefix(&self, id: NodeId) -> Option<&str>;

    /// Namespace URI the prefix (or default namespace) resolved to
    fn node_namespace_uri(&self, id: NodeId) -> Option<&str>;

    /// Content of text, CDATA, comment and PI nodes; value of attributes; URI of namespace nodes
    fn node_value(&self, id: NodeId) -> Option<&str>;

    /// Total document order. Defaults to id order.
    fn compare_position(&self, a: NodeId, b: NodeId) -> Ordering {
        a.cmp(&b)
    }

    /// Qualified name (`prefix:local` or `local`)
    fn node_name(&self, id: NodeId) -> Option<Cow<'_, str>> {
        let local = self.node_local_name(id)?;
        match self.node_prefix(id) {
            Some(prefix) if !prefix.is_empty() => Some(Cow::Owned(format!("{}:{}", prefix, local))),
            _ => Some(Cow::Borrowed(local)),
        }
    }

    /// Children in order
    fn children_vec(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut child = self.first_child_of(id);
        while let Some(c) = child {
            result.push(c);
            child = self.next_sibling_of(c);
        }
        result
    }

    /// Descendants in pre-order (attributes excluded)
    fn descendants_vec(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children_vec(id).into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            result.push(node);
            stack.extend(self.children_vec(node).into_iter().rev());
        }
        result
    }

    /// Attribute value by qualified name
    fn get_attribute(&self, node_id: NodeId, name: &str) -> Option<&str> {
        self.attributes_of(node_id)
            .into_iter()
            .find(|&attr| self.node_name(attr).as_deref() == Some(name))
            .and_then(|attr| self.node_value(attr))
    }
}

/// XPath string-value of a node.
///
/// Documents and elements concatenate all descendant text and CDATA;
/// every other kind returns its own value.
pub fn node_string_value<D: DocumentAccess + ?Sized>(doc: &D, id: NodeId) -> String {
    match doc.node_kind_of(id) {
        NodeKind::Document | NodeKind::Element => {
            let mut text = String::new();
            for node in doc.descendants_vec(id) {
                if matches!(doc.node_kind_of(node), NodeKind::Text | NodeKind::CData) {
                    text.push_str(doc.node_value(node).unwrap_or(""));
                }
            }
            text
        }
        _ => doc.node_value(id).unwrap_or("").to_string(),
    }
}

/// Sort into document order and drop duplicates.
pub fn sort_document_order<D: DocumentAccess + ?Sized>(doc: &D, nodes: &mut Vec<NodeId>) {
    nodes.sort_unstable_by(|&a, &b| doc.compare_position(a, b));
    nodes.dedup();
}
