//! XML Document - Arena-based tree
//!
//! Storage layout:
//! - One arena for every node kind, attribute and namespace nodes included
//! - Namespace nodes, then attribute nodes, are allocated right after their
//!   owner element, so NodeId order is document order
//! - String interning for names, URIs and content
//!
//! Documents are produced by [`DocumentBuilder`], which consumes parser
//! events (start/end element, text, comments...) from whatever tokenizer the
//! caller uses.

use super::namespace::NamespaceResolver;
use super::node::{NodeId, NodeKind, XmlNode};
use super::strings::StringPool;
use super::DocumentAccess;

/// A document stored in arena format
#[derive(Debug)]
pub struct XmlDocument {
    nodes: Vec<XmlNode>,
    /// Interned strings
    pub strings: StringPool,
    root_element: Option<NodeId>,
}

impl XmlDocument {
    /// Start building a document
    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::new()
    }

    /// Get the document root node (index 0)
    pub fn document_node(&self) -> &XmlNode {
        &self.nodes[0]
    }

    /// Get root element ID
    pub fn root_element_id(&self) -> Option<NodeId> {
        self.root_element
    }

    /// Get a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes.get(id as usize)
    }

    /// Get node count (document node, namespace and attribute nodes included)
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Iterate over children of a node
    pub fn children(&self, id: NodeId) -> ChildIter<'_> {
        ChildIter {
            doc: self,
            current: self.get_node(id).and_then(|n| n.first_child),
        }
    }
}

/// Iterator over child nodes
pub struct ChildIter<'a> {
    doc: &'a XmlDocument,
    current: Option<NodeId>,
}

impl Iterator for ChildIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.current?;
        self.current = self.doc.get_node(id).and_then(|n| n.next_sibling);
        Some(id)
    }
}

impl DocumentAccess for XmlDocument {
    fn node_kind_of(&self, id: NodeId) -> NodeKind {
        self.get_node(id).map_or(NodeKind::Document, |n| n.kind)
    }

    fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.parent
    }

    fn first_child_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.first_child
    }

    fn next_sibling_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.next_sibling
    }

    fn prev_sibling_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.prev_sibling
    }

    fn attributes_of(&self, id: NodeId) -> Vec<NodeId> {
        match self.get_node(id) {
            Some(node) if node.is_element() => {
                (node.attr_start..node.attr_start + node.attr_count as NodeId).collect()
            }
            _ => Vec::new(),
        }
    }

    fn namespaces_of(&self, id: NodeId) -> Vec<NodeId> {
        match self.get_node(id) {
            Some(node) if node.is_element() => (id + 1..id + 1 + node.ns_count as NodeId).collect(),
            _ => Vec::new(),
        }
    }

    fn node_local_name(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Element
            | NodeKind::Attribute
            | NodeKind::Namespace
            | NodeKind::ProcessingInstruction => {
                Some(self.strings.get(node.name_id))
            }
            _ => None,
        }
    }

    fn node_prefix(&self, id: NodeId) -> Option<&str> {
        self.strings.get_non_empty(self.get_node(id)?.prefix_id)
    }

    fn node_namespace_uri(&self, id: NodeId) -> Option<&str> {
        self.strings.get_non_empty(self.get_node(id)?.namespace_id)
    }

    fn node_value(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Document | NodeKind::Element => None,
            _ => Some(self.strings.get(node.value_id)),
        }
    }

    fn children_vec(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).collect()
    }
}

/// Event-driven document construction.
///
/// `xmlns` and `xmlns:p` attributes declare namespaces for the element and
/// its descendants; they are consumed by the builder and not stored as
/// attribute nodes. Instead every element gets one namespace node per binding
/// in scope at that element, its own declarations included. The implicit
/// `xml` binding gets no node. Unprefixed attributes never take the default
/// namespace.
pub struct DocumentBuilder {
    nodes: Vec<XmlNode>,
    strings: StringPool,
    namespaces: NamespaceResolver,
    stack: Vec<NodeId>,
    root_element: Option<NodeId>,
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentBuilder {
    pub fn new() -> Self {
        let mut strings = StringPool::new();
        let namespaces = NamespaceResolver::new(&mut strings);
        let mut nodes = Vec::with_capacity(64);
        nodes.push(XmlNode::document());
        DocumentBuilder {
            nodes,
            strings,
            namespaces,
            stack: vec![0],
            root_element: None,
        }
    }

    fn parent_and_depth(&self) -> (NodeId, u16) {
        (
            *self.stack.last().unwrap_or(&0),
            self.stack.len().min(u16::MAX as usize) as u16,
        )
    }

    /// Open an element. `qname` may carry a prefix (`svg:rect`).
    pub fn start_element(&mut self, qname: &str, attributes: &[(&str, &str)]) -> NodeId {
        let (parent_id, depth) = self.parent_and_depth();
        self.namespaces.push_scope();

        for &(name, value) in attributes {
            if name == "xmlns" {
                let uri_id = self.strings.intern(value);
                self.namespaces.declare_default(uri_id);
            } else if let Some(prefix) = name.strip_prefix("xmlns:") {
                let prefix_id = self.strings.intern(prefix);
                let uri_id = self.strings.intern(value);
                self.namespaces.declare(prefix_id, uri_id);
            }
        }

        let (prefix, local) = split_qname(qname);
        let mut node = XmlNode::element(self.strings.intern(local), parent_id, depth);
        node.prefix_id = self.strings.intern(prefix);
        node.namespace_id = if node.prefix_id != 0 {
            self.namespaces.resolve(node.prefix_id).unwrap_or(0)
        } else {
            self.namespaces.resolve_default().unwrap_or(0)
        };

        let node_id = self.nodes.len() as NodeId;
        self.nodes.push(node);

        let mut ns_count: u16 = 0;
        for (prefix_id, uri_id) in self.namespaces.in_scope() {
            if ns_count == u16::MAX {
                break;
            }
            self.nodes
                .push(XmlNode::namespace(prefix_id, uri_id, node_id, depth + 1));
            ns_count += 1;
        }
        let element = &mut self.nodes[node_id as usize];
        element.ns_count = ns_count;
        element.attr_start = node_id + 1 + ns_count as NodeId;

        let mut attr_count: u16 = 0;
        for &(name, value) in attributes {
            if name == "xmlns" || name.starts_with("xmlns:") || attr_count == u16::MAX {
                continue;
            }
            let (prefix, local) = split_qname(name);
            let mut attr = XmlNode::attribute(
                self.strings.intern(local),
                self.strings.intern(value),
                node_id,
                depth + 1,
            );
            attr.prefix_id = self.strings.intern(prefix);
            if attr.prefix_id != 0 {
                attr.namespace_id = self.namespaces.resolve(attr.prefix_id).unwrap_or(0);
            }
            self.nodes.push(attr);
            attr_count += 1;
        }
        self.nodes[node_id as usize].attr_count = attr_count;

        self.link_child(parent_id, node_id);
        if self.root_element.is_none() && parent_id == 0 {
            self.root_element = Some(node_id);
        }
        self.stack.push(node_id);
        node_id
    }

    /// Close the innermost open element. Extra calls are ignored.
    pub fn end_element(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
            self.namespaces.pop_scope();
        }
    }

    /// Open and immediately close an element
    pub fn empty_element(&mut self, qname: &str, attributes: &[(&str, &str)]) -> NodeId {
        let id = self.start_element(qname, attributes);
        self.end_element();
        id
    }

    fn push_leaf(&mut self, kind: NodeKind, content: &str) -> NodeId {
        let (parent_id, depth) = self.parent_and_depth();
        let value_id = self.strings.intern(content);
        let node_id = self.nodes.len() as NodeId;
        self.nodes.push(XmlNode::leaf(kind, value_id, parent_id, depth));
        self.link_child(parent_id, node_id);
        node_id
    }

    pub fn text(&mut self, content: &str) -> NodeId {
        self.push_leaf(NodeKind::Text, content)
    }

    pub fn cdata(&mut self, content: &str) -> NodeId {
        self.push_leaf(NodeKind::CData, content)
    }

    pub fn comment(&mut self, content: &str) -> NodeId {
        self.push_leaf(NodeKind::Comment, content)
    }

    pub fn doctype(&mut self, content: &str) -> NodeId {
        self.push_leaf(NodeKind::Doctype, content)
    }

    pub fn xml_declaration(&mut self, content: &str) -> NodeId {
        self.push_leaf(NodeKind::XmlDeclaration, content)
    }

    pub fn processing_instruction(&mut self, target: &str, content: &str) -> NodeId {
        let (parent_id, depth) = self.parent_and_depth();
        let target_id = self.strings.intern(target);
        let value_id = self.strings.intern(content);
        let node_id = self.nodes.len() as NodeId;
        self.nodes
            .push(XmlNode::processing_instruction(target_id, value_id, parent_id, depth));
        self.link_child(parent_id, node_id);
        node_id
    }

    /// Close any open elements and return the finished document
    pub fn finish(mut self) -> XmlDocument {
        while self.stack.len() > 1 {
            self.end_element();
        }
        XmlDocument {
            nodes: self.nodes,
            strings: self.strings,
            root_element: self.root_element,
        }
    }

    /// Link a child node to its parent
    fn link_child(&mut self, parent_id: NodeId, child_id: NodeId) {
        let last_child_opt = self.nodes[parent_id as usize].last_child;

        if let Some(last_child_id) = last_child_opt {
            self.nodes[child_id as usize].prev_sibling = Some(last_child_id);
            self.nodes[last_child_id as usize].next_sibling = Some(child_id);
        } else {
            self.nodes[parent_id as usize].first_child = Some(child_id);
        }
        self.nodes[parent_id as usize].last_child = Some(child_id);
    }
}

/// Split `prefix:local`; names without a colon have an empty prefix.
fn split_qname(qname: &str) -> (&str, &str) {
    match memchr::memchr(b':', qname.as_bytes()) {
        Some(pos) => (&qname[..pos], &qname[pos + 1..]),
        None => ("", qname),
    }
}
