//! Document - Arena-based mutable DOM
//!
//! Nodes live in a `Vec` and link to each other by `NodeId`. Detached nodes
//! stay in the arena (ids are never reused), so a `NodeId` handed out by a
//! document remains valid for that document's lifetime.
//!
//! Text follows the element-centric model used by view archs: `text(el)`
//! is the text before the first child node, `tail(el)` is the text after the
//! element up to its next non-text sibling. Moving or detaching a node
//! moves its tail along with it.

use super::node::{NodeId, NodeKind, XmlNode};
use crate::core::attributes::Attribute;
use crate::error::{Error, Result};
use crate::reader::{SliceReader, XmlEvent};

/// Id of the document node in every document
pub const DOCUMENT_NODE: NodeId = 0;

/// Wrapper element used to parse fragments with several top-level elements
pub const FRAGMENT_WRAPPER: &str = "xmlfragment";

/// How a document was parsed and how it serializes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentMode {
    Xml,
    Html,
}

/// A parsed, editable document
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<XmlNode>,
    mode: DocumentMode,
}

/// Elements implicitly closed by an opening tag of the given name (HTML)
fn implied_close(opening: &str, open: &str) -> bool {
    match opening {
        "li" => open == "li",
        "p" => open == "p",
        "option" => open == "option",
        "tr" => matches!(open, "tr" | "td" | "th"),
        "td" | "th" => matches!(open, "td" | "th"),
        "dt" | "dd" => matches!(open, "dt" | "dd"),
        _ => false,
    }
}

impl Document {
    /// Create an empty document (only the document node)
    pub fn new(mode: DocumentMode) -> Self {
        Document {
            nodes: vec![XmlNode::document()],
            mode,
        }
    }

    /// Parse a well-formed XML document
    pub fn parse(input: &str) -> Result<Self> {
        let mut doc = Document::new(DocumentMode::Xml);
        doc.build_from_events(SliceReader::new(input))
            .map_err(Error::XmlSyntax)?;
        Ok(doc)
    }

    /// Parse HTML leniently: void elements, implied end tags, unquoted and
    /// valueless attributes, HTML entities
    pub fn parse_html(input: &str) -> Result<Self> {
        let mut doc = Document::new(DocumentMode::Html);
        doc.build_from_events(SliceReader::new_html(input))
            .map_err(Error::XmlSyntax)?;
        Ok(doc)
    }

    /// Parse in the given mode
    pub fn parse_with_mode(input: &str, mode: DocumentMode) -> Result<Self> {
        match mode {
            DocumentMode::Xml => Self::parse(input),
            DocumentMode::Html => Self::parse_html(input),
        }
    }

    /// Parse a fragment of sibling elements, wrapped in `<xmlfragment>`.
    ///
    /// The top-level elements are the element children of the root.
    pub fn parse_fragment(input: &str, mode: DocumentMode) -> Result<Self> {
        let wrapped = format!("<{FRAGMENT_WRAPPER}>{input}</{FRAGMENT_WRAPPER}>");
        Self::parse_with_mode(&wrapped, mode)
    }

    fn build_from_events(&mut self, mut reader: SliceReader<'_>) -> Result<(), String> {
        let strict = reader.is_strict();
        let mut stack: Vec<NodeId> = vec![DOCUMENT_NODE];
        let mut seen_root_element = false;

        while let Some(event) = reader.next_event() {
            match event? {
                XmlEvent::StartElement(elem) | XmlEvent::EmptyElement(elem)
                    if strict && stack.len() == 1 && seen_root_element =>
                {
                    return Err(format!(
                        "Document has multiple root elements (second is <{}>)",
                        elem.name
                    ));
                }

                XmlEvent::StartElement(elem) => {
                    if !strict {
                        while let Some(&top) = stack.last() {
                            if top != DOCUMENT_NODE && implied_close(&elem.name, &self.node(top).name) {
                                stack.pop();
                            } else {
                                break;
                            }
                        }
                    }
                    seen_root_element |= stack.len() == 1;
                    let parent = *stack.last().unwrap_or(&DOCUMENT_NODE);
                    let id = self.alloc_element(elem.name.into_owned(), elem.attributes);
                    self.link_child(parent, id);
                    stack.push(id);
                }

                XmlEvent::EmptyElement(elem) => {
                    seen_root_element |= stack.len() == 1;
                    let parent = *stack.last().unwrap_or(&DOCUMENT_NODE);
                    let id = self.alloc_element(elem.name.into_owned(), elem.attributes);
                    self.link_child(parent, id);
                }

                XmlEvent::EndElement(name) => {
                    if strict {
                        match stack.pop() {
                            Some(open) if open != DOCUMENT_NODE => {
                                let open_name = &self.node(open).name;
                                if open_name.as_str() != &*name {
                                    return Err(format!(
                                        "Tag mismatch: <{open_name}> closed with </{name}>"
                                    ));
                                }
                            }
                            _ => {
                                return Err(format!(
                                    "Unexpected end tag: </{name}> without matching start tag"
                                ))
                            }
                        }
                    } else if let Some(pos) = stack
                        .iter()
                        .rposition(|&id| id != DOCUMENT_NODE && self.node(id).name == *name)
                    {
                        stack.truncate(pos);
                    }
                }

                XmlEvent::Text(content) => {
                    if stack.len() == 1 {
                        if content.trim().is_empty() {
                            continue;
                        }
                        if strict {
                            return Err("Text content not allowed at document level".to_string());
                        }
                    }
                    let parent = *stack.last().unwrap_or(&DOCUMENT_NODE);
                    let id = self.alloc(XmlNode::text(content.into_owned()));
                    self.link_child(parent, id);
                }

                XmlEvent::CData(content) => {
                    if strict && stack.len() == 1 {
                        return Err("CDATA section not allowed at document level".to_string());
                    }
                    let parent = *stack.last().unwrap_or(&DOCUMENT_NODE);
                    let id = self.alloc(XmlNode::cdata(content));
                    self.link_child(parent, id);
                }

                XmlEvent::Comment(content) => {
                    let parent = *stack.last().unwrap_or(&DOCUMENT_NODE);
                    let id = self.alloc(XmlNode::comment(content));
                    self.link_child(parent, id);
                }

                XmlEvent::ProcessingInstruction { target, data } => {
                    let parent = *stack.last().unwrap_or(&DOCUMENT_NODE);
                    let id = self.alloc(XmlNode::processing_instruction(target, data));
                    self.link_child(parent, id);
                }

                XmlEvent::XmlDeclaration | XmlEvent::DocType(_) => {}
            }
        }

        if strict {
            if let Some(&open) = stack.last().filter(|&&id| id != DOCUMENT_NODE) {
                return Err(format!("Unclosed tag: <{}>", self.node(open).name));
            }
            if !seen_root_element {
                return Err("Document is empty".to_string());
            }
        }
        Ok(())
    }

    // =========================================================================
    // Access
    // =========================================================================

    pub fn mode(&self) -> DocumentMode {
        self.mode
    }

    pub fn is_html(&self) -> bool {
        self.mode == DocumentMode::Html
    }

    /// Number of nodes in the arena, detached ones included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn root_element_id(&self) -> Option<NodeId> {
        self.children(DOCUMENT_NODE).find(|&id| self.is_element(id))
    }

    pub fn get_node(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes.get(id as usize)
    }

    #[inline]
    fn node(&self, id: NodeId) -> &XmlNode {
        &self.nodes[id as usize]
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> &mut XmlNode {
        &mut self.nodes[id as usize]
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.get_node(id).map(|n| n.kind)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.get_node(id).is_some_and(|n| n.is_element())
    }

    /// Element tag or PI target
    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Element | NodeKind::ProcessingInstruction => Some(node.name.as_str()),
            _ => None,
        }
    }

    pub fn node_local_name(&self, id: NodeId) -> Option<&str> {
        self.node_name(id)
            .map(|name| crate::core::attributes::split_name(name).1)
    }

    /// Content of a text, CDATA, comment or PI node
    pub fn text_content(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Document | NodeKind::Element => None,
            _ => Some(node.value.as_str()),
        }
    }

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        self.get_node(id).map_or(&[], |n| n.attributes.as_slice())
    }

    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get_node(id)?.get_attribute(name)
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.get_attribute(id, name).is_some()
    }

    /// Set an attribute, keeping its position if it already exists
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        let value = value.into();
        let attributes = &mut self.node_mut(id).attributes;
        match attributes.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value,
            None => attributes.push(Attribute::new(name, value)),
        }
    }

    /// Remove an attribute, returning its previous value
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        let attributes = &mut self.node_mut(id).attributes;
        let pos = attributes.iter().position(|a| a.name == name)?;
        Some(attributes.remove(pos).value)
    }

    /// Rename an element
    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) {
        self.node_mut(id).name = name.into();
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.parent
    }

    pub fn first_child_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.first_child
    }

    pub fn last_child_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.last_child
    }

    pub fn next_sibling_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.next_sibling
    }

    pub fn prev_sibling_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.prev_sibling
    }

    /// Iterate over child nodes
    pub fn children(&self, id: NodeId) -> ChildIter<'_> {
        ChildIter {
            doc: self,
            current: self.first_child_of(id),
        }
    }

    /// Iterate over descendant nodes in document order (not including `id`)
    pub fn descendants(&self, id: NodeId) -> DescendantIter<'_> {
        let mut stack: Vec<NodeId> = self.children(id).collect();
        stack.reverse();
        DescendantIter { doc: self, stack }
    }

    pub fn children_vec(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).collect()
    }

    pub fn descendants_vec(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id).collect()
    }

    /// Element children only
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).filter(|&c| self.is_element(c)).collect()
    }

    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.prev_sibling_of(id);
        while let Some(sibling) = current {
            if self.is_element(sibling) {
                return Some(sibling);
            }
            current = self.prev_sibling_of(sibling);
        }
        None
    }

    /// Text before the first child node, `None` when there is none
    pub fn text(&self, id: NodeId) -> Option<String> {
        Self::join_text(self, self.leading_text_nodes(id))
    }

    /// Text following the node up to its next non-text sibling
    pub fn tail(&self, id: NodeId) -> Option<String> {
        Self::join_text(self, self.tail_nodes(id))
    }

    fn join_text(&self, ids: Vec<NodeId>) -> Option<String> {
        if ids.is_empty() {
            return None;
        }
        Some(ids.iter().map(|&t| self.node(t).value.as_str()).collect())
    }

    fn leading_text_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .take_while(|&c| self.node(c).is_text())
            .collect()
    }

    fn tail_nodes(&self, id: NodeId) -> Vec<NodeId> {
        if self.get_node(id).is_none_or(|n| n.is_text() || n.kind == NodeKind::Document) {
            return Vec::new();
        }
        let mut nodes = Vec::new();
        let mut current = self.next_sibling_of(id);
        while let Some(sibling) = current {
            if !self.node(sibling).is_text() {
                break;
            }
            nodes.push(sibling);
            current = self.next_sibling_of(sibling);
        }
        nodes
    }

    /// Replace the leading text of an element; `None` or empty removes it
    pub fn set_text(&mut self, id: NodeId, text: Option<&str>) {
        for t in self.leading_text_nodes(id) {
            self.unlink(t);
        }
        if let Some(text) = text.filter(|t| !t.is_empty()) {
            let node = self.create_text(text);
            match self.first_child_of(id) {
                Some(first) => self.link_before(first, node),
                None => self.link_child(id, node),
            }
        }
    }

    /// Replace the tail text of a node; `None` or empty removes it
    pub fn set_tail(&mut self, id: NodeId, tail: Option<&str>) {
        for t in self.tail_nodes(id) {
            self.unlink(t);
        }
        if let Some(tail) = tail.filter(|t| !t.is_empty()) {
            if self.parent_of(id).is_some() {
                let node = self.create_text(tail);
                self.link_after(id, node);
            }
        }
    }

    /// XPath string-value: concatenated descendant text for elements
    pub fn string_value(&self, id: NodeId) -> String {
        let Some(node) = self.get_node(id) else {
            return String::new();
        };
        match node.kind {
            NodeKind::Document | NodeKind::Element => self
                .descendants(id)
                .filter(|&d| self.node(d).is_text())
                .map(|d| self.node(d).value.as_str())
                .collect(),
            _ => node.value.clone(),
        }
    }

    /// True when the node is connected to the document node
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == DOCUMENT_NODE {
                return true;
            }
            current = self.parent_of(node);
        }
        false
    }

    /// Preorder position of every node, indexed by `NodeId`.
    ///
    /// Attached nodes come first, followed by each detached subtree in
    /// arena order.
    pub fn document_order(&self) -> Vec<u32> {
        let mut order = vec![u32::MAX; self.nodes.len()];
        let mut next = 0u32;
        let mut visit = |root: NodeId, order: &mut Vec<u32>| {
            order[root as usize] = next;
            next += 1;
            for d in self.descendants(root) {
                order[d as usize] = next;
                next += 1;
            }
        };
        visit(DOCUMENT_NODE, &mut order);
        for id in 1..self.nodes.len() {
            if order[id] == u32::MAX && self.nodes[id].parent.is_none() {
                visit(id as NodeId, &mut order);
            }
        }
        order
    }

    // =========================================================================
    // Construction
    // =========================================================================

    fn alloc(&mut self, node: XmlNode) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        id
    }

    fn alloc_element(&mut self, name: String, attributes: Vec<Attribute>) -> NodeId {
        let mut node = XmlNode::element(name);
        node.attributes = attributes;
        self.alloc(node)
    }

    /// Create a detached element
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.alloc(XmlNode::element(name))
    }

    /// Create a detached element with attributes
    pub fn create_element_with(&mut self, name: &str, attributes: &[(&str, &str)]) -> NodeId {
        let attrs = attributes
            .iter()
            .map(|(k, v)| Attribute::new(*k, *v))
            .collect();
        self.alloc_element(name.to_string(), attrs)
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(XmlNode::text(text))
    }

    /// Copy a subtree into a new detached subtree (without its tail)
    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        let mut copy = self.node(id).clone();
        copy.parent = None;
        copy.first_child = None;
        copy.last_child = None;
        copy.prev_sibling = None;
        copy.next_sibling = None;
        let new_id = self.alloc(copy);
        for child in self.children_vec(id) {
            let child_copy = self.deep_copy(child);
            self.link_child(new_id, child_copy);
        }
        new_id
    }

    /// Copy a subtree from another document into a detached subtree here
    pub fn import_subtree(&mut self, other: &Document, id: NodeId) -> NodeId {
        let mut copy = other.node(id).clone();
        copy.parent = None;
        copy.first_child = None;
        copy.last_child = None;
        copy.prev_sibling = None;
        copy.next_sibling = None;
        let new_id = self.alloc(copy);
        for child in other.children(id) {
            let child_copy = self.import_subtree(other, child);
            self.link_child(new_id, child_copy);
        }
        new_id
    }

    // =========================================================================
    // Mutation (tail-carrying)
    // =========================================================================

    /// Detach a node (and its tail) from its parent
    pub fn detach(&mut self, id: NodeId) {
        self.take_with_tail(id);
    }

    /// Append as last child of `parent`, moving the node's tail along
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        for moved in self.take_with_tail(child) {
            self.link_child(parent, moved);
        }
    }

    /// Insert as previous sibling of `reference`, moving the node's tail along
    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) {
        for moved in self.take_with_tail(node) {
            self.link_before(reference, moved);
        }
    }

    /// Insert as next sibling of `reference`, after the reference's tail
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) {
        let anchor = self.tail_nodes(reference).last().copied().unwrap_or(reference);
        let moved = self.take_with_tail(node);
        match self.next_sibling_of(anchor) {
            Some(next) => {
                for m in moved {
                    self.link_before(next, m);
                }
            }
            None => {
                let Some(parent) = self.parent_of(anchor) else {
                    return;
                };
                for m in moved {
                    self.link_child(parent, m);
                }
            }
        }
    }

    /// Put `new` (with its own tail) where `old` is. `old` is detached
    /// alone: its tail stays in place, after `new`.
    pub fn replace_node(&mut self, old: NodeId, new: NodeId) {
        if self.parent_of(old).is_none() {
            return;
        }
        for moved in self.take_with_tail(new) {
            self.link_before(old, moved);
        }
        self.unlink(old);
    }

    /// Replace an element by its content: every child node, text included,
    /// moves to the element's position and the element's tail stays put
    pub fn unwrap_element(&mut self, id: NodeId) {
        if self.parent_of(id).is_none() {
            return;
        }
        for child in self.children_vec(id) {
            self.unlink(child);
            self.link_before(id, child);
        }
        self.unlink(id);
    }

    /// Unlink a node together with its tail text, returning them in order
    fn take_with_tail(&mut self, id: NodeId) -> Vec<NodeId> {
        let mut moved = vec![id];
        moved.extend(self.tail_nodes(id));
        for &m in &moved {
            self.unlink(m);
        }
        moved
    }

    // =========================================================================
    // Raw linking
    // =========================================================================

    fn link_child(&mut self, parent: NodeId, child: NodeId) {
        let prev_last = self.node(parent).last_child;
        {
            let node = self.node_mut(child);
            node.parent = Some(parent);
            node.prev_sibling = prev_last;
            node.next_sibling = None;
        }
        match prev_last {
            Some(last) => self.node_mut(last).next_sibling = Some(child),
            None => self.node_mut(parent).first_child = Some(child),
        }
        self.node_mut(parent).last_child = Some(child);
    }

    fn link_before(&mut self, reference: NodeId, node: NodeId) {
        let Some(parent) = self.parent_of(reference) else {
            return;
        };
        let prev = self.node(reference).prev_sibling;
        {
            let n = self.node_mut(node);
            n.parent = Some(parent);
            n.prev_sibling = prev;
            n.next_sibling = Some(reference);
        }
        self.node_mut(reference).prev_sibling = Some(node);
        match prev {
            Some(p) => self.node_mut(p).next_sibling = Some(node),
            None => self.node_mut(parent).first_child = Some(node),
        }
    }

    fn link_after(&mut self, reference: NodeId, node: NodeId) {
        match self.next_sibling_of(reference) {
            Some(next) => self.link_before(next, node),
            None => {
                if let Some(parent) = self.parent_of(reference) {
                    self.link_child(parent, node);
                }
            }
        }
    }

    fn unlink(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let n = self.node(id);
            (n.parent, n.prev_sibling, n.next_sibling)
        };
        let Some(parent) = parent else {
            return;
        };
        match prev {
            Some(p) => self.node_mut(p).next_sibling = next,
            None => self.node_mut(parent).first_child = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev_sibling = prev,
            None => self.node_mut(parent).last_child = prev,
        }
        let n = self.node_mut(id);
        n.parent = None;
        n.prev_sibling = None;
        n.next_sibling = None;
    }
}

/// Iterator over child nodes
pub struct ChildIter<'d> {
    doc: &'d Document,
    current: Option<NodeId>,
}

impl Iterator for ChildIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.doc.next_sibling_of(id);
        Some(id)
    }
}

/// Iterator over descendant nodes (depth-first, document order)
pub struct DescendantIter<'d> {
    doc: &'d Document,
    stack: Vec<NodeId>,
}

impl Iterator for DescendantIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let mut children: Vec<NodeId> = self.doc.children(id).collect();
        children.reverse();
        self.stack.extend(children);
        Some(id)
    }
}
