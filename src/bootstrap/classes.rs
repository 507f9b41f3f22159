//! Class-token editing for `class` attributes.

use crate::dom::{Document, NodeId};

/// The whitespace-separated tokens of a `class` attribute, in order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassList(Vec<String>);

impl ClassList {
    pub fn parse(value: &str) -> Self {
        ClassList(value.split_whitespace().map(str::to_string).collect())
    }

    /// Classes of an element (empty for other nodes)
    pub fn of(doc: &Document, id: NodeId) -> Self {
        Self::parse(doc.get_attribute(id, "class").unwrap_or(""))
    }

    pub fn contains(&self, class: &str) -> bool {
        self.0.iter().any(|c| c == class)
    }

    pub fn contains_any(&self, classes: &[&str]) -> bool {
        classes.iter().any(|c| self.contains(c))
    }

    /// Append a class unless already present
    pub fn add(&mut self, class: &str) {
        if !self.contains(class) {
            self.0.push(class.to_string());
        }
    }

    /// Remove a class, returning whether it was present
    pub fn remove(&mut self, class: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|c| c != class);
        self.0.len() != before
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Write back to the element. An empty list removes the attribute.
    pub fn store(&self, doc: &mut Document, id: NodeId) {
        if self.is_empty() {
            doc.remove_attribute(id, "class");
        } else {
            doc.set_attribute(id, "class", self.0.join(" "));
        }
    }
}

/// Edit the classes of an element in place
pub fn edit_classes<F>(doc: &mut Document, id: NodeId, edit: F)
where
    F: FnOnce(&mut ClassList),
{
    let mut classes = ClassList::of(doc, id);
    edit(&mut classes);
    classes.store(doc, id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_remove_keep_order() {
        let mut classes = ClassList::parse("  btn   btn-default ");
        classes.add("btn-secondary");
        classes.add("btn");
        assert!(classes.remove("btn-default"));
        assert!(!classes.remove("btn-default"));
        assert_eq!(classes.iter().collect::<Vec<_>>(), ["btn", "btn-secondary"]);
    }

    #[test]
    fn test_edit_classes() {
        let mut doc = Document::parse(r#"<div class="label label-danger" id="x"/>"#).unwrap();
        let div = doc.root_element_id().unwrap();
        edit_classes(&mut doc, div, |c| {
            c.add("badge");
            c.remove("label");
        });
        assert_eq!(doc.to_xml(div), r#"<div class="label-danger badge" id="x"/>"#);
        edit_classes(&mut doc, div, ClassList::clear);
        assert_eq!(doc.to_xml(div), r#"<div id="x"/>"#);
    }
}
