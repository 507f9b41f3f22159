//! Node representation
//!
//! Uses NodeId (u32) for compact node references into the document arena.
//! Nodes own their strings since documents are edited in place.

use crate::core::attributes::Attribute;

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// Type of node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Document root
    Document,
    /// Element node
    Element,
    /// Text content
    Text,
    /// CDATA section
    CData,
    /// Comment
    Comment,
    /// Processing instruction
    ProcessingInstruction,
}

/// A node in the arena
#[derive(Debug, Clone)]
pub struct XmlNode {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    /// Tag name for elements, target for processing instructions
    pub name: String,
    /// Content of text, CDATA, comment and PI nodes
    pub value: String,
    /// Attributes in document order (elements only)
    pub attributes: Vec<Attribute>,
}

impl XmlNode {
    fn with_kind(kind: NodeKind, name: String, value: String) -> Self {
        XmlNode {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            name,
            value,
            attributes: Vec::new(),
        }
    }

    pub fn document() -> Self {
        Self::with_kind(NodeKind::Document, String::new(), String::new())
    }

    pub fn element(name: impl Into<String>) -> Self {
        Self::with_kind(NodeKind::Element, name.into(), String::new())
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::with_kind(NodeKind::Text, String::new(), content.into())
    }

    pub fn cdata(content: impl Into<String>) -> Self {
        Self::with_kind(NodeKind::CData, String::new(), content.into())
    }

    pub fn comment(content: impl Into<String>) -> Self {
        Self::with_kind(NodeKind::Comment, String::new(), content.into())
    }

    pub fn processing_instruction(target: impl Into<String>, data: impl Into<String>) -> Self {
        Self::with_kind(NodeKind::ProcessingInstruction, target.into(), data.into())
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Text or CDATA, which both contribute to string values
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text | NodeKind::CData)
    }

    /// Local part of the name (after any prefix)
    pub fn local_name(&self) -> &str {
        crate::core::attributes::split_name(&self.name).1
    }

    /// Prefix of the name, if any
    pub fn prefix(&self) -> Option<&str> {
        crate::core::attributes::split_name(&self.name).0
    }

    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_creation() {
        let doc = XmlNode::document();
        assert_eq!(doc.kind, NodeKind::Document);
        assert!(doc.parent.is_none());

        let elem = XmlNode::element("field");
        assert!(elem.is_element());
        assert_eq!(elem.name, "field");

        let text = XmlNode::text("hello");
        assert!(text.is_text());
        assert_eq!(text.value, "hello");
    }

    #[test]
    fn test_prefixed_name() {
        let elem = XmlNode::element("t:call");
        assert_eq!(elem.local_name(), "call");
        assert_eq!(elem.prefix(), Some("t"));
    }

    #[test]
    fn test_get_attribute() {
        let mut elem = XmlNode::element("field");
        elem.attributes.push(Attribute::new("name", "partner_id"));
        assert_eq!(elem.get_attribute("name"), Some("partner_id"));
        assert_eq!(elem.get_attribute("string"), None);
    }
}
