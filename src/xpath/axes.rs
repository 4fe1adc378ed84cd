//! XPath Axes Implementation
//!
//! All 13 XPath 1.0 axes:
//! - child, parent, self
//! - descendant, descendant-or-self
//! - ancestor, ancestor-or-self
//! - following, following-sibling
//! - preceding, preceding-sibling
//! - attribute, namespace
//!
//! Forward axes yield nodes in document order, reverse axes nearest first
//! (proximity order). Callers re-sort results into document order.
//!
//! Attribute and namespace nodes sit outside the child tree: they have a
//! parent but no children or siblings.

use super::ast::{Axis, NodeTest};
use crate::dom::{DocumentAccess, NodeId, NodeKind};
use std::collections::{HashMap, HashSet};

/// Navigate along an axis from a context node
pub fn navigate<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId, axis: Axis) -> Vec<NodeId> {
    match axis {
        Axis::Child => child_axis(doc, context),
        Axis::Descendant => doc.descendants_vec(context),
        Axis::DescendantOrSelf => descendant_or_self_axis(doc, context),
        Axis::Parent => doc.parent_of(context).into_iter().collect(),
        Axis::Ancestor => ancestor_axis(doc, context),
        Axis::AncestorOrSelf => {
            let mut result = vec![context];
            result.extend(ancestor_axis(doc, context));
            result
        }
        Axis::FollowingSibling => sibling_axis(doc, context, D::next_sibling_of),
        Axis::PrecedingSibling => sibling_axis(doc, context, D::prev_sibling_of),
        Axis::Following => following_axis(doc, context),
        Axis::Preceding => preceding_axis(doc, context),
        Axis::Self_ => vec![context],
        Axis::Attribute => doc.attributes_of(context),
        Axis::Namespace => doc.namespaces_of(context),
    }
}

/// Attribute or namespace node
fn is_owned<D: DocumentAccess + ?Sized>(doc: &D, id: NodeId) -> bool {
    matches!(doc.node_kind_of(id), NodeKind::Attribute | NodeKind::Namespace)
}

fn child_axis<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId) -> Vec<NodeId> {
    if is_owned(doc, context) {
        return Vec::new();
    }
    doc.children_vec(context)
}

fn descendant_or_self_axis<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = vec![context];
    if !is_owned(doc, context) {
        result.extend(doc.descendants_vec(context));
    }
    result
}

fn ancestor_axis<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut current = context;

    while let Some(parent) = doc.parent_of(current) {
        result.push(parent);
        current = parent;
    }

    result
}

/// Walk siblings in one direction
fn sibling_axis<D, F>(doc: &D, context: NodeId, step: F) -> Vec<NodeId>
where
    D: DocumentAccess + ?Sized,
    F: Fn(&D, NodeId) -> Option<NodeId>,
{
    let mut result = Vec::new();
    if is_owned(doc, context) {
        return result;
    }

    let mut sibling = step(doc, context);
    while let Some(sib_id) = sibling {
        result.push(sib_id);
        sibling = step(doc, sib_id);
    }

    result
}

/// following:: axis - all nodes after in document order (not descendants)
fn following_axis<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();

    // Attribute and namespace nodes are followed by their owner's content
    let start = if is_owned(doc, context) {
        match doc.parent_of(context) {
            Some(owner) => {
                result.extend(doc.descendants_vec(owner));
                owner
            }
            None => return result,
        }
    } else {
        context
    };

    let mut current = Some(start);
    while let Some(node) = current {
        let mut sibling = doc.next_sibling_of(node);
        while let Some(sib_id) = sibling {
            result.push(sib_id);
            result.extend(doc.descendants_vec(sib_id));
            sibling = doc.next_sibling_of(sib_id);
        }
        current = doc.parent_of(node);
    }

    result
}

/// preceding:: axis - all nodes before in document order (not ancestors)
fn preceding_axis<D: DocumentAccess + ?Sized>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let ancestors: HashSet<NodeId> = ancestor_axis(doc, context).into_iter().collect();

    // Pre-order walk from the document node until the context is reached
    let mut result = Vec::new();
    let mut stack = vec![doc.document_node_id()];
    while let Some(node) = stack.pop() {
        if doc.compare_position(node, context).is_ge() {
            break;
        }
        if !ancestors.contains(&node) {
            result.push(node);
        }
        stack.extend(doc.children_vec(node).into_iter().rev());
    }

    result.reverse();
    result
}

/// Node test with wildcard shape and principal node kind resolved.
///
/// The principal kind is `Attribute` on the attribute axis, `Namespace` on
/// the namespace axis and `Element` everywhere else; name tests and `*` only
/// match nodes of that kind.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledNodeTest {
    Any(NodeKind),
    Name(NodeKind, String),
    QName(NodeKind, String, String),
    NamespaceWildcard(NodeKind, String),
    LocalWildcard(NodeKind, String),
    Node,
    Text,
    Comment,
    CData,
    ProcessingInstruction(Option<String>),
}

impl CompiledNodeTest {
    /// Resolve a parsed node test for a given axis
    pub fn new(test: &NodeTest, axis: Axis) -> Self {
        let principal = match axis {
            Axis::Attribute => NodeKind::Attribute,
            Axis::Namespace => NodeKind::Namespace,
            _ => NodeKind::Element,
        };
        match test {
            NodeTest::Any => CompiledNodeTest::Any(principal),
            NodeTest::Name(name) => CompiledNodeTest::Name(principal, name.clone()),
            NodeTest::QName(prefix, local) => {
                CompiledNodeTest::QName(principal, prefix.clone(), local.clone())
            }
            NodeTest::NamespaceWildcard(prefix) => {
                CompiledNodeTest::NamespaceWildcard(principal, prefix.clone())
            }
            NodeTest::LocalWildcard(local) => CompiledNodeTest::LocalWildcard(principal, local.clone()),
            NodeTest::Node => CompiledNodeTest::Node,
            NodeTest::Text => CompiledNodeTest::Text,
            NodeTest::Comment => CompiledNodeTest::Comment,
            NodeTest::CData => CompiledNodeTest::CData,
            NodeTest::ProcessingInstruction(target) => {
                CompiledNodeTest::ProcessingInstruction(target.clone())
            }
        }
    }

    /// Check if a node matches.
    ///
    /// Prefixed tests resolve their prefix through `namespaces` and compare
    /// namespace URIs. A prefix missing from a non-empty alias map matches
    /// nothing. With no aliases at all, prefixes are compared as written in
    /// the source. Unprefixed name tests match nodes written without a prefix.
    pub fn matches<D: DocumentAccess + ?Sized>(
        &self,
        doc: &D,
        node_id: NodeId,
        namespaces: &HashMap<String, String>,
    ) -> bool {
        let kind = doc.node_kind_of(node_id);

        match self {
            CompiledNodeTest::Any(principal) => kind == *principal,
            CompiledNodeTest::Name(principal, name) => {
                kind == *principal
                    && doc.node_prefix(node_id).is_none()
                    && doc.node_local_name(node_id) == Some(name.as_str())
            }
            CompiledNodeTest::QName(principal, prefix, local) => {
                kind == *principal
                    && doc.node_local_name(node_id) == Some(local.as_str())
                    && prefix_matches(doc, node_id, prefix, namespaces)
            }
            CompiledNodeTest::NamespaceWildcard(principal, prefix) => {
                kind == *principal && prefix_matches(doc, node_id, prefix, namespaces)
            }
            CompiledNodeTest::LocalWildcard(principal, local) => {
                kind == *principal && doc.node_local_name(node_id) == Some(local.as_str())
            }
            CompiledNodeTest::Node => true,
            CompiledNodeTest::Text => kind == NodeKind::Text || kind == NodeKind::CData,
            CompiledNodeTest::Comment => kind == NodeKind::Comment,
            CompiledNodeTest::CData => kind == NodeKind::CData,
            CompiledNodeTest::ProcessingInstruction(target) => {
                if kind != NodeKind::ProcessingInstruction {
                    return false;
                }
                match target {
                    Some(expected_target) => doc.node_local_name(node_id) == Some(expected_target.as_str()),
                    None => true,
                }
            }
        }
    }
}

fn prefix_matches<D: DocumentAccess + ?Sized>(
    doc: &D,
    node_id: NodeId,
    prefix: &str,
    namespaces: &HashMap<String, String>,
) -> bool {
    if namespaces.is_empty() {
        return doc.node_prefix(node_id) == Some(prefix);
    }
    match namespaces.get(prefix) {
        Some(uri) => doc.node_namespace_uri(node_id) == Some(uri.as_str()),
        None => false,
    }
}
