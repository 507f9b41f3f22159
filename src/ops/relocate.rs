//! Moving elements

use super::{ArchLookup, ViewOperation};
use crate::dom::{Document, NodeId, NodeKind, DOCUMENT_NODE};
use crate::error::{Error, Result};
use crate::selector::Selector;
use std::fmt;

/// Move matched elements to the end of a single destination element,
/// optionally removing the containers they leave empty
#[derive(Debug, Clone)]
pub struct MoveElements {
    selector: Selector,
    destination: Selector,
    prune_parents: bool,
}

impl MoveElements {
    pub fn new<I, S>(xpaths: I, destination: &str) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(MoveElements {
            selector: Selector::new(xpaths)?,
            destination: Selector::single(destination)?,
            prune_parents: true,
        })
    }

    /// Keep the emptied containers in place
    pub fn keep_parents(mut self) -> Self {
        self.prune_parents = false;
        self
    }
}

/// Whether an element has no child other than blank text
fn is_empty_element(doc: &Document, id: NodeId) -> bool {
    doc.children(id).all(|child| match doc.kind(child) {
        Some(NodeKind::Text) => doc.text_content(child).is_none_or(|t| t.trim().is_empty()),
        _ => false,
    })
}

/// Whether `node` is `ancestor` or lies below it
fn contains(doc: &Document, ancestor: NodeId, node: NodeId) -> bool {
    let mut current = Some(node);
    while let Some(id) = current {
        if id == ancestor {
            return true;
        }
        current = doc.parent_of(id);
    }
    false
}

/// Remove `id` if it is empty, then its parent, up to the root element
fn prune_empty(doc: &mut Document, id: NodeId) {
    let mut current = id;
    loop {
        let Some(parent) = doc.parent_of(current) else {
            return;
        };
        if parent == DOCUMENT_NODE || !is_empty_element(doc, current) {
            return;
        }
        doc.detach(current);
        current = parent;
    }
}

impl ViewOperation for MoveElements {
    fn apply(&self, doc: &mut Document, _lookup: Option<&dyn ArchLookup>) -> Result<()> {
        let destinations = self.destination.select(doc)?;
        let [destination] = destinations.as_slice() else {
            return Err(Error::NotFound(format!(
                "Move destination `{}` must match exactly one element, matched {}",
                self.destination,
                destinations.len()
            )));
        };
        let destination = *destination;
        self.selector.for_each_match(doc, |doc, el| {
            if contains(doc, el, destination) {
                return Err(Error::Usage(format!(
                    "Cannot move an element matching `{}` into itself or its own descendant `{}`",
                    self.selector, self.destination
                )));
            }
            let old_parent = doc.parent_of(el);
            doc.append_child(destination, el);
            if let Some(parent) = old_parent.filter(|_| self.prune_parents) {
                prune_empty(doc, parent);
            }
            Ok(())
        })
    }
}

impl fmt::Display for MoveElements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Move elements matching XPath(s) `{}` to `{}`",
            self.selector, self.destination
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn xml(doc: &Document) -> String {
        doc.to_xml(doc.root_element_id().unwrap())
    }

    #[test]
    fn test_move_prunes_emptied_ancestors() {
        let mut doc = Document::parse(
            r#"<data><xpath expr="//x"><div class="col"> <p>a</p> </div></xpath><xpath expr="//y"><b/></xpath></data>"#,
        )
        .unwrap();
        let op = MoveElements::new(["//div[@class='col']/p"], "/data").unwrap();
        op.apply(&mut doc, None).unwrap();
        assert_eq!(
            xml(&doc),
            r#"<data><xpath expr="//y"><b/></xpath><p>a</p> </data>"#
        );
        assert_eq!(op.to_string(), "Move elements matching XPath(s) `//div[@class='col']/p` to `/data`");
    }

    #[test]
    fn test_pruning_stops_at_content() {
        let mut doc = Document::parse("<data><div>keep<p/></div><dest/></data>").unwrap();
        MoveElements::new(["//p"], "//dest").unwrap().apply(&mut doc, None).unwrap();
        assert_eq!(xml(&doc), "<data><div>keep</div><dest><p/></dest></data>");
    }

    #[test]
    fn test_keep_parents() {
        let mut doc = Document::parse("<data><div><p/></div><dest/></data>").unwrap();
        MoveElements::new(["//p"], "//dest")
            .unwrap()
            .keep_parents()
            .apply(&mut doc, None)
            .unwrap();
        assert_eq!(xml(&doc), "<data><div/><dest><p/></dest></data>");
    }

    #[test]
    fn test_destination_must_be_unique() {
        let mut doc = Document::parse("<data><dest/><dest/><p/></data>").unwrap();
        let err = MoveElements::new(["//p"], "//dest").unwrap().apply(&mut doc, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = MoveElements::new(["//p"], "//nowhere").unwrap().apply(&mut doc, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(xml(&doc), "<data><dest/><dest/><p/></data>");
    }

    #[test]
    fn test_move_into_own_subtree_fails() {
        let mut doc = Document::parse("<data><div><span/></div></data>").unwrap();
        let err = MoveElements::new(["//div"], "//span").unwrap().apply(&mut doc, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(xml(&doc), "<data><div><span/></div></data>");

        let mut doc = Document::parse("<data><p/><q/></data>").unwrap();
        let err = MoveElements::new(["//p"], "//p").unwrap().apply(&mut doc, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(xml(&doc), "<data><p/><q/></data>");
    }

    #[test]
    fn test_root_is_never_pruned() {
        let mut doc = Document::parse("<data><p/></data>").unwrap();
        MoveElements::new(["//p"], "/data").unwrap().apply(&mut doc, None).unwrap();
        assert_eq!(xml(&doc), "<data><p/></data>");
    }
}
