//! Ops Module - reusable edits applied to view archs
//!
//! Every operation is an immutable value: selectors are compiled and
//! fragments parsed when the operation is built, and nodes are re-selected
//! on each application. The same operation can therefore be applied to any
//! number of documents.
//!
//! - `add`: fragment insertion (literal, from a file, copied from a view)
//! - `remove`: element and field removal
//! - `attributes`: renames, attribute updates, search and replace
//! - `relocate`: moving elements and pruning what they leave behind

pub mod add;
pub mod attributes;
pub mod relocate;
pub mod remove;

pub use add::{AddElementPosition, AddElements, AddElementsFromFile, AddInvisibleSiblingFields, CopyElements};
pub use attributes::{RenameElements, ReplacePattern, ReplacePosition, ReplaceValue, UpdateAttributes};
pub use relocate::MoveElements;
pub use remove::{RemoveElements, RemoveFields};

use crate::dom::Document;
use crate::error::Result;
use crate::resolve::ViewRef;
use std::fmt;
use std::sync::Arc;

/// Fetches the parsed arch of another view
pub trait ArchLookup {
    fn fetch_arch(&self, view: &ViewRef) -> Result<Document>;
}

/// An edit applied to a whole document.
///
/// `Display` gives a one-line description, with code in backticks.
pub trait ViewOperation: fmt::Display + fmt::Debug + Send + Sync {
    /// Apply the edit. `lookup` is only needed by operations reading other
    /// views.
    fn apply(&self, doc: &mut Document, lookup: Option<&dyn ArchLookup>) -> Result<()>;
}

/// Shared handle to an operation, reusable across views
pub type Operation = Arc<dyn ViewOperation>;

/// Wrap an operation in a shared handle
pub fn op<T: ViewOperation + 'static>(operation: T) -> Operation {
    Arc::new(operation)
}

/// Apply operations in order, stopping at the first failure
pub fn apply_all(operations: &[Operation], doc: &mut Document, lookup: Option<&dyn ArchLookup>) -> Result<()> {
    for operation in operations {
        log::debug!("{operation}");
        operation.apply(doc, lookup)?;
    }
    Ok(())
}

/// Quote a list of values for descriptions: `a, b`
pub(crate) fn join_display<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_removed_then_added() {
        let mut doc = Document::parse(r#"<form><field name="x"/></form>"#).unwrap();
        let operations = vec![
            op(RemoveFields::new(["x"]).unwrap()),
            op(AddElements::new(["//form"], r#"<field name="y"/>"#, AddElementPosition::Inside).unwrap()),
        ];
        apply_all(&operations, &mut doc, None).unwrap();
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.to_xml(root), r#"<form><field name="y"/></form>"#);
    }

    #[test]
    fn test_operations_are_reusable_across_documents() {
        let add = op(AddElements::new(["//form"], "<group/>", AddElementPosition::Inside).unwrap());
        for source in ["<form/>", "<form><sheet/></form>"] {
            let mut doc = Document::parse(source).unwrap();
            add.apply(&mut doc, None).unwrap();
            add.apply(&mut doc, None).unwrap();
            let root = doc.root_element_id().unwrap();
            let groups = doc
                .element_children(root)
                .into_iter()
                .filter(|&c| doc.node_name(c) == Some("group"))
                .count();
            assert_eq!(groups, 2, "{source}");
        }
    }
}
