//! In-memory store
//!
//! Holds views, external identifiers, installed modules and plain table
//! columns, and journals every write so callers can check what a run did
//! without touching a database.

use super::{KeyedView, ViewId, ViewStore, XmlIdResolver};
use crate::error::{Error, Result};
use crate::html_fields::RowStore;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone)]
struct StoredView {
    key: Option<String>,
    website_id: Option<i64>,
    inherit_id: Option<ViewId>,
    arch: Option<String>,
    active: bool,
    noupdate: bool,
    arch_updated: bool,
}

/// A page read issued through `RowStore::fetch_page`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRead {
    pub table: String,
    pub column: String,
    pub offset: usize,
    pub limit: usize,
}

/// A batched update issued through `RowStore::update_rows`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowUpdate {
    pub table: String,
    pub column: String,
    pub ids: Vec<i64>,
}

/// Views, identifiers and table rows held in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    views: BTreeMap<ViewId, StoredView>,
    next_id: ViewId,
    xmlids: HashMap<(String, String, String), i64>,
    modules: HashSet<String>,
    columns: HashMap<(String, String), BTreeMap<i64, Option<String>>>,
    html_fields: Vec<(String, String)>,

    cows: Vec<(String, i64)>,
    writes: Vec<ViewId>,
    arch_updated_batches: Vec<Vec<ViewId>>,
    page_reads: Vec<PageRead>,
    row_updates: Vec<RowUpdate>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            next_id: 1,
            ..Default::default()
        }
    }

    fn alloc_view(&mut self, view: StoredView) -> ViewId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        self.views.insert(id, view);
        id
    }

    /// Add an unkeyed, active, `noupdate` view
    pub fn insert_view(&mut self, arch: &str) -> ViewId {
        self.alloc_view(StoredView {
            key: None,
            website_id: None,
            inherit_id: None,
            arch: Some(arch.to_string()),
            active: true,
            noupdate: true,
            arch_updated: false,
        })
    }

    /// Add a view with a structural key
    pub fn insert_keyed_view(
        &mut self,
        key: &str,
        website_id: Option<i64>,
        inherit_id: Option<ViewId>,
        arch: &str,
    ) -> ViewId {
        self.alloc_view(StoredView {
            key: Some(key.to_string()),
            website_id,
            inherit_id,
            arch: Some(arch.to_string()),
            active: true,
            noupdate: true,
            arch_updated: false,
        })
    }

    /// Register `module.name` as the external id of a record
    pub fn insert_xmlid(&mut self, model: &str, xmlid: &str, res_id: i64) {
        if let Some((module, name)) = xmlid.split_once('.') {
            self.xmlids
                .insert((model.to_string(), module.to_string(), name.to_string()), res_id);
        }
    }

    pub fn install_module(&mut self, module: &str) {
        self.modules.insert(module.to_string());
    }

    pub fn set_noupdate(&mut self, id: ViewId, noupdate: bool) {
        if let Some(view) = self.views.get_mut(&id) {
            view.noupdate = noupdate;
        }
    }

    pub fn is_active(&self, id: ViewId) -> bool {
        self.views.get(&id).is_some_and(|v| v.active)
    }

    pub fn is_arch_updated(&self, id: ViewId) -> bool {
        self.views.get(&id).is_some_and(|v| v.arch_updated)
    }

    pub fn website_of(&self, id: ViewId) -> Option<i64> {
        self.views.get(&id).and_then(|v| v.website_id)
    }

    pub fn inherit_of(&self, id: ViewId) -> Option<ViewId> {
        self.views.get(&id).and_then(|v| v.inherit_id)
    }

    /// Create a column (and its table) so it exists even without rows
    pub fn create_column(&mut self, table: &str, column: &str) {
        self.columns
            .entry((table.to_string(), column.to_string()))
            .or_default();
    }

    /// Set a value in a table column
    pub fn insert_row(&mut self, table: &str, column: &str, id: i64, value: Option<&str>) {
        self.columns
            .entry((table.to_string(), column.to_string()))
            .or_default()
            .insert(id, value.map(str::to_string));
    }

    pub fn row(&self, table: &str, column: &str, id: i64) -> Option<&str> {
        self.columns
            .get(&(table.to_string(), column.to_string()))
            .and_then(|rows| rows.get(&id))
            .and_then(|v| v.as_deref())
    }

    /// Declare a stored html field of a model
    pub fn insert_html_field(&mut self, model: &str, field: &str) {
        self.html_fields.push((model.to_string(), field.to_string()));
    }

    // =========================================================================
    // Journal
    // =========================================================================

    /// Copy-on-write creations as `(key, website_id)`, in creation order
    pub fn cows(&self) -> &[(String, i64)] {
        &self.cows
    }

    /// Views whose arch was written, in write order
    pub fn writes(&self) -> &[ViewId] {
        &self.writes
    }

    pub fn arch_updated_batches(&self) -> &[Vec<ViewId>] {
        &self.arch_updated_batches
    }

    pub fn page_reads(&self) -> &[PageRead] {
        &self.page_reads
    }

    pub fn row_updates(&self) -> &[RowUpdate] {
        &self.row_updates
    }

    fn view(&self, id: ViewId) -> Result<&StoredView> {
        self.views
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("View id={id} does not exist")))
    }

    fn view_mut(&mut self, id: ViewId) -> Result<&mut StoredView> {
        self.views
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("View id={id} does not exist")))
    }
}

impl ViewStore for MemoryStore {
    fn view_exists(&self, id: ViewId) -> Result<bool> {
        Ok(self.views.contains_key(&id))
    }

    fn arch(&self, id: ViewId) -> Result<Option<String>> {
        Ok(self
            .views
            .get(&id)
            .and_then(|v| v.arch.clone())
            .filter(|a| !a.is_empty()))
    }

    fn write_arch(&mut self, id: ViewId, arch: &str) -> Result<()> {
        self.view_mut(id)?.arch = Some(arch.to_string());
        self.writes.push(id);
        Ok(())
    }

    fn is_noupdate(&self, id: ViewId) -> Result<bool> {
        Ok(self.view(id)?.noupdate)
    }

    fn set_active(&mut self, id: ViewId, active: bool) -> Result<()> {
        self.view_mut(id)?.active = active;
        Ok(())
    }

    fn views_by_key(&self, key: &str) -> Result<Vec<KeyedView>> {
        Ok(self
            .views
            .iter()
            .filter(|(_, v)| v.key.as_deref() == Some(key))
            .map(|(&id, v)| KeyedView {
                id,
                website_id: v.website_id,
            })
            .collect())
    }

    fn inherit_id(&self, id: ViewId) -> Result<Option<ViewId>> {
        Ok(self.view(id)?.inherit_id)
    }

    fn create_cow(&mut self, template: ViewId, website_id: i64) -> Result<ViewId> {
        let source = self.view(template)?.clone();
        if source.website_id.is_some() {
            return Err(Error::Usage(format!(
                "View id={template} is already bound to a website"
            )));
        }
        let key = source.key.clone().unwrap_or_default();
        let inherit_id = match source.inherit_id {
            Some(parent) => {
                let parent_key = self.view(parent)?.key.clone();
                let parent_cow = parent_key.and_then(|pk| {
                    self.views
                        .iter()
                        .find(|(_, v)| v.key.as_deref() == Some(pk.as_str()) && v.website_id == Some(website_id))
                        .map(|(&id, _)| id)
                });
                Some(parent_cow.unwrap_or(parent))
            }
            None => None,
        };
        let id = self.alloc_view(StoredView {
            website_id: Some(website_id),
            inherit_id,
            arch_updated: false,
            ..source
        });
        self.cows.push((key, website_id));
        Ok(id)
    }

    fn mark_arch_updated(&mut self, ids: &[ViewId]) -> Result<()> {
        for &id in ids {
            self.view_mut(id)?.arch_updated = true;
        }
        self.arch_updated_batches.push(ids.to_vec());
        Ok(())
    }
}

impl XmlIdResolver for MemoryStore {
    fn resolve_xmlid(&self, model: &str, module: &str, name: &str) -> Result<Option<i64>> {
        Ok(self
            .xmlids
            .get(&(model.to_string(), module.to_string(), name.to_string()))
            .copied())
    }

    fn modules_installed(&self, modules: &[&str]) -> Result<bool> {
        Ok(modules.iter().all(|m| self.modules.contains(*m)))
    }
}

impl RowStore for MemoryStore {
    fn fetch_page(&mut self, table: &str, column: &str, offset: usize, limit: usize) -> Result<Vec<(i64, String)>> {
        self.page_reads.push(PageRead {
            table: table.to_string(),
            column: column.to_string(),
            offset,
            limit,
        });
        let rows = self
            .columns
            .get(&(table.to_string(), column.to_string()))
            .ok_or_else(|| Error::NotFound(format!("Column {table}.{column} does not exist")))?;
        Ok(rows
            .iter()
            .filter_map(|(&id, v)| v.as_ref().filter(|v| !v.is_empty()).map(|v| (id, v.clone())))
            .skip(offset)
            .take(limit)
            .collect())
    }

    fn update_rows(&mut self, table: &str, column: &str, rows: &[(i64, String)]) -> Result<()> {
        let stored = self
            .columns
            .get_mut(&(table.to_string(), column.to_string()))
            .ok_or_else(|| Error::NotFound(format!("Column {table}.{column} does not exist")))?;
        for (id, value) in rows {
            stored.insert(*id, Some(value.clone()));
        }
        self.row_updates.push(RowUpdate {
            table: table.to_string(),
            column: column.to_string(),
            ids: rows.iter().map(|(id, _)| *id).collect(),
        });
        Ok(())
    }

    fn column_exists(&self, table: &str, column: &str) -> Result<bool> {
        Ok(self
            .columns
            .contains_key(&(table.to_string(), column.to_string())))
    }

    fn html_fields_like(&self, pattern: &str) -> Result<Vec<(String, String)>> {
        let pattern = pattern.to_lowercase();
        Ok(self
            .html_fields
            .iter()
            .filter(|(_, field)| field.to_lowercase().contains(&pattern))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_cow_rebinds_parent() {
        let mut store = MemoryStore::new();
        let parent = store.insert_keyed_view("website.layout", None, None, "<t/>");
        let child = store.insert_keyed_view("website.footer", None, Some(parent), "<t/>");
        let parent_cow = store.create_cow(parent, 1).unwrap();
        let child_cow = store.create_cow(child, 1).unwrap();
        assert_eq!(store.inherit_of(child_cow), Some(parent_cow));
        assert_eq!(store.website_of(child_cow), Some(1));
        assert_eq!(
            store.cows(),
            &[("website.layout".to_string(), 1), ("website.footer".to_string(), 1)]
        );
        assert!(store.create_cow(child_cow, 2).is_err());
    }

    #[test]
    fn test_fetch_page_skips_empty_values() {
        let mut store = MemoryStore::new();
        store.insert_row("blog_post", "content", 3, Some("<p/>"));
        store.insert_row("blog_post", "content", 1, Some(""));
        store.insert_row("blog_post", "content", 2, None);
        store.insert_row("blog_post", "content", 4, Some("<div/>"));
        let page = store.fetch_page("blog_post", "content", 0, 10).unwrap();
        assert_eq!(page, vec![(3, "<p/>".to_string()), (4, "<div/>".to_string())]);
        assert_eq!(store.fetch_page("blog_post", "content", 1, 10).unwrap().len(), 1);
        assert_eq!(store.page_reads().len(), 2);
    }

    #[test]
    fn test_xmlids_and_modules() {
        let mut store = MemoryStore::new();
        store.insert_xmlid("ir.ui.view", "website.footer", 7);
        store.install_module("website");
        assert_eq!(store.resolve_xmlid("ir.ui.view", "website", "footer").unwrap(), Some(7));
        assert_eq!(store.resolve_xmlid("res.partner", "website", "footer").unwrap(), None);
        assert!(store.modules_installed(&["website"]).unwrap());
        assert!(!store.modules_installed(&["website", "event"]).unwrap());
    }
}
