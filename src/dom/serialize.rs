//! Serialization and re-indentation
//!
//! XML output writes empty elements as `<name/>`; HTML output writes void
//! elements without a slash, other empty elements with an explicit end tag,
//! and leaves `<script>`/`<style>` content unescaped.

use super::document::{Document, DocumentMode, DOCUMENT_NODE};
use super::node::{NodeId, NodeKind};
use crate::core::entities::{encode_attribute, encode_text};
use crate::reader::slice::HTML_VOID_ELEMENTS;
use std::fmt;

impl Document {
    /// Serialize a node and its subtree (never its tail) as XML
    pub fn to_xml(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, DocumentMode::Xml, false, &mut out);
        out
    }

    /// Serialize a node and its subtree as HTML
    pub fn to_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, DocumentMode::Html, false, &mut out);
        out
    }

    /// Serialize a node using the document's own mode
    pub fn serialize(&self, id: NodeId) -> String {
        match self.mode() {
            DocumentMode::Xml => self.to_xml(id),
            DocumentMode::Html => self.to_html(id),
        }
    }

    /// Serialize the content of an element: its text followed by its children
    pub fn inner_markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        let raw = self.is_html() && self.node_name(id).is_some_and(is_raw_text_element);
        for child in self.children(id) {
            self.write_node(child, self.mode(), raw, &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, mode: DocumentMode, raw_text: bool, out: &mut String) {
        let Some(node) = self.get_node(id) else {
            return;
        };
        match node.kind {
            NodeKind::Document => {
                for child in self.children(id) {
                    self.write_node(child, mode, false, out);
                }
            }
            NodeKind::Text if raw_text => out.push_str(&node.value),
            NodeKind::Text => out.push_str(&encode_text(&node.value)),
            NodeKind::CData => {
                out.push_str("<![CDATA[");
                out.push_str(&node.value);
                out.push_str("]]>");
            }
            NodeKind::Comment => {
                out.push_str("<!--");
                out.push_str(&node.value);
                out.push_str("-->");
            }
            NodeKind::ProcessingInstruction => {
                out.push_str("<?");
                out.push_str(&node.name);
                if !node.value.is_empty() {
                    out.push(' ');
                    out.push_str(&node.value);
                }
                out.push_str("?>");
            }
            NodeKind::Element => {
                out.push('<');
                out.push_str(&node.name);
                for attr in &node.attributes {
                    out.push(' ');
                    out.push_str(&attr.name);
                    out.push_str("=\"");
                    out.push_str(&encode_attribute(&attr.value));
                    out.push('"');
                }

                let has_children = node.first_child.is_some();
                match mode {
                    DocumentMode::Xml if !has_children => {
                        out.push_str("/>");
                        return;
                    }
                    DocumentMode::Html if HTML_VOID_ELEMENTS.contains(&node.name.as_str()) => {
                        out.push('>');
                        return;
                    }
                    _ => out.push('>'),
                }

                let raw = mode == DocumentMode::Html && is_raw_text_element(&node.name);
                for child in self.children(id) {
                    self.write_node(child, mode, raw, out);
                }
                out.push_str("</");
                out.push_str(&node.name);
                out.push('>');
            }
        }
    }

    /// Re-indent a subtree with two spaces per level.
    ///
    /// Only whitespace-only (or missing) text and tails are rewritten, so
    /// mixed content is preserved.
    pub fn indent_tree(&mut self, id: NodeId, level: usize) {
        let indent = format!("\n{}", "  ".repeat(level));
        let children: Vec<NodeId> = self
            .children(id)
            .filter(|&c| !matches!(self.kind(c), Some(NodeKind::Text | NodeKind::CData)))
            .collect();
        let is_blank = |s: Option<String>| s.is_none_or(|s| s.trim().is_empty());
        let has_parent_element = self.parent_of(id).is_some_and(|p| p != DOCUMENT_NODE);

        if let Some(&last) = children.last() {
            if is_blank(self.text(id)) {
                self.set_text(id, Some(&format!("{indent}  ")));
            }
            if has_parent_element && is_blank(self.tail(id)) {
                self.set_tail(id, Some(&indent));
            }
            for &child in &children {
                self.indent_tree(child, level + 1);
            }
            if is_blank(self.tail(last)) {
                self.set_tail(last, Some(&indent));
            }
        } else if level > 0 && has_parent_element && is_blank(self.tail(id)) {
            self.set_tail(id, Some(&indent));
        }
    }
}

fn is_raw_text_element(name: &str) -> bool {
    matches!(name, "script" | "style")
}

impl fmt::Display for Document {
    /// Writes the whole document in its own mode
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize(DOCUMENT_NODE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xml_roundtrip_shape() {
        let input = r#"<form string="A &amp; B"><field name="x"/><!--c--><p>a &lt; b</p></form>"#;
        let doc = Document::parse(input).unwrap();
        assert_eq!(doc.to_string(), input);
    }

    #[test]
    fn test_html_void_elements() {
        let doc = Document::parse_html("<div><br><img src=\"a.png\"><span></span></div>").unwrap();
        let root = doc.root_element_id().unwrap();
        assert_eq!(
            doc.to_html(root),
            r#"<div><br><img src="a.png"><span></span></div>"#
        );
    }

    #[test]
    fn test_inner_markup() {
        let doc = Document::parse("<p>lead<b>x</b>tail</p>").unwrap();
        let p = doc.root_element_id().unwrap();
        assert_eq!(doc.inner_markup(p), "lead<b>x</b>tail");
    }

    #[test]
    fn test_indent_tree() {
        let mut doc = Document::parse(r#"<form><group><field name="a"/></group><field name="b"/></form>"#)
            .unwrap();
        let root = doc.root_element_id().unwrap();
        doc.indent_tree(root, 0);
        assert_eq!(
            doc.to_xml(root),
            "<form>\n  <group>\n    <field name=\"a\"/>\n  </group>\n  <field name=\"b\"/>\n</form>"
        );
    }

    #[test]
    fn test_indent_preserves_mixed_content() {
        let mut doc = Document::parse("<p>Hello <b>world</b> again</p>").unwrap();
        let root = doc.root_element_id().unwrap();
        doc.indent_tree(root, 0);
        assert_eq!(doc.to_xml(root), "<p>Hello <b>world</b> again</p>");
    }
}
