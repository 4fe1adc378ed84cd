//! Tree node representation
//!
//! Uses NodeId (u32) for compact, cache-friendly node references.

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// Type of a node in the queried tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Document root
    Document,
    /// Element node
    Element,
    /// Attribute of an element (reachable only through the attribute axis)
    Attribute,
    /// In-scope namespace binding of an element (reachable only through the namespace axis)
    Namespace,
    /// Text content
    Text,
    /// CDATA section
    CData,
    /// Comment
    Comment,
    /// Processing instruction
    ProcessingInstruction,
    /// `<!DOCTYPE ...>`
    Doctype,
    /// `<?xml ...?>`
    XmlDeclaration,
}

impl NodeKind {
    /// Name used in type errors and debug output
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Element => "element",
            NodeKind::Attribute => "attribute",
            NodeKind::Namespace => "namespace",
            NodeKind::Text => "text",
            NodeKind::CData => "cdata",
            NodeKind::Comment => "comment",
            NodeKind::ProcessingInstruction => "processing-instruction",
            NodeKind::Doctype => "doctype",
            NodeKind::XmlDeclaration => "xml-declaration",
        }
    }
}

/// A node in the arena
#[derive(Debug, Clone)]
pub struct XmlNode {
    /// Type of this node
    pub kind: NodeKind,
    /// Parent node (None for document root). Attribute and namespace nodes point at their owner.
    pub parent: Option<NodeId>,
    /// First child node
    pub first_child: Option<NodeId>,
    /// Last child node
    pub last_child: Option<NodeId>,
    /// Previous sibling
    pub prev_sibling: Option<NodeId>,
    /// Next sibling
    pub next_sibling: Option<NodeId>,
    /// Index into string pool for the local name (elements, attributes, PI targets, namespace prefixes)
    pub name_id: u32,
    /// Index into string pool for the source prefix, or 0
    pub prefix_id: u32,
    /// Index into string pool for the resolved namespace URI, or 0
    pub namespace_id: u32,
    /// Index into string pool for text, attribute value, namespace URI, comment or PI content
    pub value_id: u32,
    /// First attribute node id (elements only)
    pub attr_start: NodeId,
    /// Number of attribute nodes following `attr_start`
    pub attr_count: u16,
    /// Number of namespace nodes directly after the element, before its attributes
    pub ns_count: u16,
    /// Depth in document tree
    pub depth: u16,
}

impl XmlNode {
    fn blank(kind: NodeKind, parent: Option<NodeId>, depth: u16) -> Self {
        XmlNode {
            kind,
            parent,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            name_id: 0,
            prefix_id: 0,
            namespace_id: 0,
            value_id: 0,
            attr_start: 0,
            attr_count: 0,
            ns_count: 0,
            depth,
        }
    }

    /// Create a new document root node
    pub fn document() -> Self {
        Self::blank(NodeKind::Document, None, 0)
    }

    /// Create a new element node
    pub fn element(name_id: u32, parent: NodeId, depth: u16) -> Self {
        XmlNode {
            name_id,
            ..Self::blank(NodeKind::Element, Some(parent), depth)
        }
    }

    /// Create an attribute node owned by `owner`
    pub fn attribute(name_id: u32, value_id: u32, owner: NodeId, depth: u16) -> Self {
        XmlNode {
            name_id,
            value_id,
            ..Self::blank(NodeKind::Attribute, Some(owner), depth)
        }
    }

    /// Create a namespace node owned by `owner`; prefix id 0 is the default namespace
    pub fn namespace(prefix_id: u32, uri_id: u32, owner: NodeId, depth: u16) -> Self {
        XmlNode {
            name_id: prefix_id,
            value_id: uri_id,
            ..Self::blank(NodeKind::Namespace, Some(owner), depth)
        }
    }

    /// Create a leaf node carrying only content (text, CDATA, comment, doctype, declaration)
    pub fn leaf(kind: NodeKind, value_id: u32, parent: NodeId, depth: u16) -> Self {
        XmlNode {
            value_id,
            ..Self::blank(kind, Some(parent), depth)
        }
    }

    /// Create a processing instruction node
    pub fn processing_instruction(target_id: u32, value_id: u32, parent: NodeId, depth: u16) -> Self {
        XmlNode {
            name_id: target_id,
            value_id,
            ..Self::blank(NodeKind::ProcessingInstruction, Some(parent), depth)
        }
    }

    /// Check if this is an element node
    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Check if this node has children
    #[inline]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }
}
