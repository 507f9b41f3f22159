//! Store Module - collaborators that own the persisted views
//!
//! The editing engine never talks to a database directly. It goes through:
//! - `ViewStore` for view archs, keys, scopes and copy-on-write copies
//! - `XmlIdResolver` for external identifiers and installed modules
//!
//! `MemoryStore` implements both (and `RowStore`) in memory.

pub mod memory;

pub use memory::MemoryStore;

use crate::dom::Document;
use crate::error::{Error, Result};
use log::debug;

/// Numeric view identifier
pub type ViewId = i64;

/// A view matched by structural key, with its website scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyedView {
    pub id: ViewId,
    pub website_id: Option<i64>,
}

/// Access to persisted views
pub trait ViewStore {
    /// Whether a view with this id exists
    fn view_exists(&self, id: ViewId) -> Result<bool>;

    /// Raw arch of a view, `None` if the view is missing or has no arch
    fn arch(&self, id: ViewId) -> Result<Option<String>>;

    /// Replace the arch of a view
    fn write_arch(&mut self, id: ViewId, arch: &str) -> Result<()>;

    /// Whether the view is protected from module updates
    fn is_noupdate(&self, id: ViewId) -> Result<bool>;

    /// Set the active flag of a view
    fn set_active(&mut self, id: ViewId, active: bool) -> Result<()>;

    /// All views carrying a structural key, whatever their website
    fn views_by_key(&self, key: &str) -> Result<Vec<KeyedView>>;

    /// Parent view in the inheritance relation
    fn inherit_id(&self, id: ViewId) -> Result<Option<ViewId>>;

    /// Copy an unscoped template view to a website, returning the copy's id.
    ///
    /// The copy inherits from the website copy of the template's parent when
    /// one exists.
    fn create_cow(&mut self, template: ViewId, website_id: i64) -> Result<ViewId>;

    /// Flag views as edited outside their source files
    fn mark_arch_updated(&mut self, ids: &[ViewId]) -> Result<()>;
}

/// Access to external identifiers
pub trait XmlIdResolver {
    /// Record id of `module.name` for records of `model`
    fn resolve_xmlid(&self, model: &str, module: &str, name: &str) -> Result<Option<i64>>;

    /// Whether all given modules are installed.
    ///
    /// Nothing in this crate checks it. It is there for callers that gate
    /// rename or merge follow-ups on optional modules.
    fn modules_installed(&self, modules: &[&str]) -> Result<bool>;
}

/// How an edit scope treats the view it opens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditScope {
    /// Leave views that are not `noupdate` untouched
    pub skip_if_not_noupdate: bool,
    /// Active flag written along with the arch, `None` keeps it
    pub active: Option<bool>,
}

impl Default for EditScope {
    fn default() -> Self {
        EditScope {
            skip_if_not_noupdate: true,
            active: None,
        }
    }
}

/// Parse a view arch
pub fn parse_arch(id: ViewId, arch: &str) -> Result<Document> {
    Document::parse(arch).map_err(|e| match e {
        Error::XmlSyntax(reason) => Error::XmlSyntax(format!("arch of view id={id}: {reason}")),
        other => other,
    })
}

/// Open a view arch for editing.
///
/// The arch is parsed, handed to `edit` together with the store (read-only),
/// and written back when `edit` succeeds. On error nothing is written.
/// Returns `false` when the scope skipped the view.
pub fn edit_arch<S, F>(store: &mut S, id: ViewId, scope: EditScope, edit: F) -> Result<bool>
where
    S: ViewStore,
    F: FnOnce(&mut Document, &S) -> Result<()>,
{
    if scope.skip_if_not_noupdate && !store.is_noupdate(id)? {
        debug!("Skipping view id={id}: not noupdate");
        return Ok(false);
    }
    let arch = store
        .arch(id)?
        .ok_or_else(|| Error::NotFound(format!("View id={id} not found, or has no arch")))?;
    let mut doc = parse_arch(id, &arch)?;
    edit(&mut doc, store)?;

    let root = doc
        .root_element_id()
        .ok_or_else(|| Error::XmlSyntax(format!("arch of view id={id} has no root element")))?;
    store.write_arch(id, &doc.to_xml(root))?;
    if let Some(active) = scope.active {
        store.set_active(id, active)?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_edit_arch_writes_back() {
        let mut store = MemoryStore::new();
        let id = store.insert_view("<form><field name=\"a\"/></form>");
        let scope = EditScope { skip_if_not_noupdate: false, active: Some(true) };
        let edited = edit_arch(&mut store, id, scope, |doc, _| {
            let root = doc.root_element_id().unwrap_or(0);
            doc.set_attribute(root, "string", "Form");
            Ok(())
        })
        .unwrap();
        assert!(edited);
        assert_eq!(
            store.arch(id).unwrap().as_deref(),
            Some("<form string=\"Form\"><field name=\"a\"/></form>")
        );
        assert_eq!(store.writes(), &[id]);
        assert!(store.is_active(id));
    }

    #[test]
    fn test_edit_arch_abandons_on_error() {
        let mut store = MemoryStore::new();
        let id = store.insert_view("<form/>");
        let scope = EditScope { skip_if_not_noupdate: false, active: None };
        let err = edit_arch(&mut store, id, scope, |_, _| Err(Error::NotFound("x".into()))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(store.writes().is_empty());
        assert_eq!(store.arch(id).unwrap().as_deref(), Some("<form/>"));
    }

    #[test]
    fn test_edit_arch_skips_updatable_views() {
        let mut store = MemoryStore::new();
        let id = store.insert_view("<form/>");
        store.set_noupdate(id, false);
        let edited = edit_arch(&mut store, id, EditScope::default(), |_, _| Ok(())).unwrap();
        assert!(!edited);
        assert!(store.writes().is_empty());
    }

    #[test]
    fn test_edit_arch_missing_view() {
        let mut store = MemoryStore::new();
        let scope = EditScope { skip_if_not_noupdate: false, active: None };
        let err = edit_arch(&mut store, 99, scope, |_, _| Ok(())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
