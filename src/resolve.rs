//! View reference resolution
//!
//! References come in three shapes: numeric ids, external ids
//! (`module.name`, with Studio names expanded) and structural keys scoped to
//! a website. They resolve to view ids, either as one flat set or mapped per
//! reference. Missing website copies of keyed views can be created on the
//! way, parents before children.

use crate::dom::Document;
use crate::error::{Error, Result};
use crate::ops::ArchLookup;
use crate::store::{parse_arch, KeyedView, ViewId, ViewStore, XmlIdResolver};
use log::debug;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Model of view records
pub const VIEW_MODEL: &str = "ir.ui.view";

/// Module holding Studio customizations
pub const STUDIO_MODULE: &str = "studio_customization";

/// Prefix of external id names generated by Studio
pub const STUDIO_NAME_PREFIX: &str = "odoo_studio_";

/// Website a structural key is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "ScopeSetting")]
pub enum WebsiteScope {
    /// Any website, or none
    #[default]
    Unset,
    /// Any website, but not none
    NotNull,
    /// Only views bound to no website (templates)
    Null,
    /// One specific website
    Id(i64),
}

impl WebsiteScope {
    /// Whether a view bound to `website_id` is in this scope
    pub fn matches(self, website_id: Option<i64>) -> bool {
        match self {
            WebsiteScope::Unset => true,
            WebsiteScope::NotNull => website_id.is_some(),
            WebsiteScope::Null => website_id.is_none(),
            WebsiteScope::Id(id) => website_id == Some(id),
        }
    }

    pub fn website_id(self) -> Option<i64> {
        match self {
            WebsiteScope::Id(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for WebsiteScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebsiteScope::Unset => f.write_str("unset"),
            WebsiteScope::NotNull => f.write_str("notnull"),
            WebsiteScope::Null => f.write_str("null"),
            WebsiteScope::Id(id) => write!(f, "{id}"),
        }
    }
}

/// Scope as written in configuration: a website id or one of
/// `"unset"`, `"notnull"`, `"null"`
#[derive(Deserialize)]
#[serde(untagged)]
enum ScopeSetting {
    Id(i64),
    Name(String),
}

impl TryFrom<ScopeSetting> for WebsiteScope {
    type Error = String;

    fn try_from(setting: ScopeSetting) -> Result<Self, String> {
        match setting {
            ScopeSetting::Id(id) => Ok(WebsiteScope::Id(id)),
            ScopeSetting::Name(name) => match name.to_ascii_lowercase().as_str() {
                "unset" => Ok(WebsiteScope::Unset),
                "notnull" => Ok(WebsiteScope::NotNull),
                "null" | "none" => Ok(WebsiteScope::Null),
                other => Err(format!("invalid website scope: {other}")),
            },
        }
    }
}

/// A structural key with its website scope
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewKey {
    pub key: String,
    pub website_id: WebsiteScope,
}

impl ViewKey {
    pub fn new(key: impl Into<String>, website_id: WebsiteScope) -> Self {
        ViewKey {
            key: key.into(),
            website_id,
        }
    }

    /// Whether a view with this key and website matches
    pub fn matches(&self, key: &str, website_id: Option<i64>) -> bool {
        self.key == key && self.website_id.matches(website_id)
    }
}

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ViewKey({:?}, {})", self.key, self.website_id)
    }
}

/// Any way of pointing at a view
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewRef {
    Id(ViewId),
    XmlId(String),
    Key(ViewKey),
}

impl From<ViewId> for ViewRef {
    fn from(id: ViewId) -> Self {
        ViewRef::Id(id)
    }
}

impl From<&str> for ViewRef {
    fn from(xmlid: &str) -> Self {
        ViewRef::XmlId(xmlid.to_string())
    }
}

impl From<String> for ViewRef {
    fn from(xmlid: String) -> Self {
        ViewRef::XmlId(xmlid)
    }
}

impl From<ViewKey> for ViewRef {
    fn from(key: ViewKey) -> Self {
        ViewRef::Key(key)
    }
}

impl fmt::Display for ViewRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewRef::Id(id) => write!(f, "{id}"),
            ViewRef::XmlId(xmlid) => f.write_str(xmlid),
            ViewRef::Key(key) => key.fmt(f),
        }
    }
}

/// Expand a Studio-generated name into a full external id.
///
/// Names that are already qualified with the Studio module pass through.
pub fn expand_studio_xmlid(xmlid: &str) -> Result<String> {
    if xmlid.strip_prefix(STUDIO_NAME_PREFIX).is_some_and(|rest| !rest.is_empty()) {
        Ok(format!("{STUDIO_MODULE}.{xmlid}"))
    } else if xmlid.starts_with(&format!("{STUDIO_MODULE}.")) {
        Ok(xmlid.to_string())
    } else {
        Err(Error::InvalidReference(format!("Failed detecting studio xmlid: {xmlid}")))
    }
}

/// Split an external id into module and name, expanding Studio names
fn split_xmlid(xmlid: &str) -> Result<(String, String)> {
    let full = if xmlid.contains('.') {
        xmlid.to_string()
    } else {
        expand_studio_xmlid(xmlid).unwrap_or_else(|_| xmlid.to_string())
    };
    let mut parts = full.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(module), Some(name), None) if !module.is_empty() && !name.is_empty() => {
            Ok((module.to_string(), name.to_string()))
        }
        _ => Err(Error::InvalidReference(format!(
            "xmlid must be in the \"<module>.<name>\" format, got: {full}"
        ))),
    }
}

/// How references are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Fail when any reference matches nothing
    pub ensure_exist: bool,
    /// Create missing website copies of keyed views from their templates
    pub create_missing_cows: bool,
    /// Website used for keys whose own scope is not a concrete website
    pub website_id: WebsiteScope,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        ResolveOptions {
            ensure_exist: true,
            create_missing_cows: false,
            website_id: WebsiteScope::Unset,
        }
    }
}

/// Resolved ids per reference
pub type IdsByRef = HashMap<ViewRef, BTreeSet<ViewId>>;

/// Resolve references to the flat set of matched view ids
pub fn get_views_ids<S>(store: &mut S, refs: &[ViewRef], options: ResolveOptions) -> Result<BTreeSet<ViewId>>
where
    S: ViewStore + XmlIdResolver,
{
    Ok(get_views_ids_mapped(store, refs, options)?
        .into_values()
        .flatten()
        .collect())
}

/// Resolve references to their matched view ids, per reference.
///
/// Expanded Studio external ids are reported under both the name passed
/// and the expanded name.
pub fn get_views_ids_mapped<S>(store: &mut S, refs: &[ViewRef], options: ResolveOptions) -> Result<IdsByRef>
where
    S: ViewStore + XmlIdResolver,
{
    let mut keys: Vec<&ViewKey> = Vec::new();
    let mut others: Vec<&ViewRef> = Vec::new();
    for r in refs {
        match r {
            ViewRef::Key(key) => keys.push(key),
            other => others.push(other),
        }
    }

    let mut result = if others.is_empty() {
        IdsByRef::new()
    } else {
        resolve_ids_and_xmlids(&*store, &others, options.ensure_exist)?
    };

    if keys.is_empty() {
        return Ok(result);
    }
    let same_website = options.create_missing_cows;
    let mut ids_by_key = keys_to_ids(
        &*store,
        &keys,
        options.ensure_exist && !options.create_missing_cows,
        same_website,
    )?;

    if options.create_missing_cows {
        let mut missing_by_website: BTreeMap<i64, Vec<&ViewKey>> = BTreeMap::new();
        for key in &keys {
            if ids_by_key.get(*key).is_some_and(|ids| !ids.is_empty()) {
                continue;
            }
            let website_id = match key.website_id {
                WebsiteScope::Id(id) => id,
                WebsiteScope::Unset | WebsiteScope::NotNull => options.website_id.website_id().ok_or_else(|| {
                    Error::Usage(format!("Tried using `create_missing_cows` without `website_id`: {key}"))
                })?,
                WebsiteScope::Null => {
                    return Err(Error::Usage(format!(
                        "Cannot use `create_missing_cows` with `website_id=None` in {key}"
                    )));
                }
            };
            missing_by_website.entry(website_id).or_default().push(*key);
        }

        for (website_id, missing) in missing_by_website {
            let names: Vec<&str> = missing.iter().map(|k| k.key.as_str()).collect();
            let created = create_cow_views(store, &names, website_id)?;
            for key in missing {
                if let Some(&cow_id) = created.get(&key.key) {
                    ids_by_key.insert(key.clone(), BTreeSet::from([cow_id]));
                }
            }
        }
    }

    for (key, ids) in ids_by_key {
        result.entry(ViewRef::Key(key)).or_default().extend(ids);
    }
    Ok(result)
}

/// Resolve numeric ids and external ids
fn resolve_ids_and_xmlids<S>(store: &S, refs: &[&ViewRef], ensure_exist: bool) -> Result<IdsByRef>
where
    S: ViewStore + XmlIdResolver,
{
    // id -> references it came from
    let mut origins: BTreeMap<ViewId, Vec<ViewRef>> = BTreeMap::new();
    let mut missing: Vec<String> = Vec::new();

    for r in refs {
        match r {
            ViewRef::Id(id) => origins.entry(*id).or_default().push((*r).clone()),
            ViewRef::XmlId(xmlid) => {
                let (module, name) = split_xmlid(xmlid)?;
                let full = format!("{module}.{name}");
                match store.resolve_xmlid(VIEW_MODEL, &module, &name)? {
                    Some(id) => {
                        let entry = origins.entry(id).or_default();
                        entry.push(ViewRef::XmlId(xmlid.clone()));
                        if full != *xmlid {
                            entry.push(ViewRef::XmlId(full));
                        }
                    }
                    None => missing.push(xmlid.clone()),
                }
            }
            ViewRef::Key(_) => {}
        }
    }

    if ensure_exist {
        for (id, refs) in &origins {
            if !store.view_exists(*id)? {
                missing.extend(refs.iter().map(ToString::to_string));
            }
        }
        if !missing.is_empty() {
            missing.sort();
            missing.dedup();
            return Err(Error::NotFound(format!(
                "`{VIEW_MODEL}` records for these ids/xmlids are missing in the database: {}",
                missing.join(", ")
            )));
        }
    }

    let mut mapped = IdsByRef::new();
    for (id, refs) in origins {
        for r in refs {
            mapped.entry(r).or_default().insert(id);
        }
    }
    Ok(mapped)
}

/// Match structural keys against stored views.
///
/// With `same_website`, all matched views must belong to one website.
/// With `must_exist`, every key must match at least one view.
pub fn keys_to_ids<S>(
    store: &S,
    keys: &[&ViewKey],
    must_exist: bool,
    same_website: bool,
) -> Result<HashMap<ViewKey, BTreeSet<ViewId>>>
where
    S: ViewStore + ?Sized,
{
    let mut ids_by_key: HashMap<ViewKey, BTreeSet<ViewId>> = HashMap::new();
    let mut websites: BTreeSet<Option<i64>> = BTreeSet::new();

    for key in keys {
        let matched: Vec<KeyedView> = store
            .views_by_key(&key.key)?
            .into_iter()
            .filter(|v| key.matches(&key.key, v.website_id))
            .collect();
        websites.extend(matched.iter().map(|v| v.website_id));
        ids_by_key
            .entry((*key).clone())
            .or_default()
            .extend(matched.iter().map(|v| v.id));
    }

    if same_website && websites.len() > 1 {
        let listed: Vec<String> = websites
            .iter()
            .map(|w| w.map_or_else(|| "none".to_string(), |w| w.to_string()))
            .collect();
        return Err(Error::Ambiguous(format!(
            "Matched views for the specified keys on multiple websites: {}",
            listed.join(", ")
        )));
    }

    if must_exist {
        let mut missing: Vec<String> = keys
            .iter()
            .filter(|k| ids_by_key.get(**k).is_none_or(BTreeSet::is_empty))
            .map(ToString::to_string)
            .collect();
        if !missing.is_empty() {
            missing.sort();
            return Err(Error::NotFound(format!(
                "Some ViewKey did not match in the db: {}",
                missing.join(", ")
            )));
        }
    }

    Ok(ids_by_key)
}

/// Chain of view ids from the inheritance root down to `id`
fn inherit_path<S: ViewStore + ?Sized>(store: &S, id: ViewId) -> Result<Vec<ViewId>> {
    let mut path = vec![id];
    let mut current = id;
    while let Some(parent) = store.inherit_id(current)? {
        if path.contains(&parent) {
            return Err(Error::Ambiguous(format!(
                "Inheritance cycle through view id={parent}"
            )));
        }
        path.push(parent);
        current = parent;
    }
    path.reverse();
    Ok(path)
}

/// Create the website copies of the template views with the given keys.
///
/// Keys are processed so that a view is copied after every view it inherits
/// from. Existing copies are reused. Returns the copy id per key.
pub fn create_cow_views<S>(store: &mut S, keys: &[&str], website_id: i64) -> Result<BTreeMap<String, ViewId>>
where
    S: ViewStore + ?Sized,
{
    let mut templates: Vec<(Vec<ViewId>, String, ViewId)> = Vec::new();
    let mut missing: Vec<&str> = Vec::new();
    for &key in keys {
        let template = store
            .views_by_key(key)?
            .into_iter()
            .find(|v| v.website_id.is_none());
        match template {
            Some(view) => templates.push((inherit_path(&*store, view.id)?, key.to_string(), view.id)),
            None => missing.push(key),
        }
    }
    if !missing.is_empty() {
        missing.sort_unstable();
        return Err(Error::NotFound(format!(
            "Some of the specified keys have no matching view without website_id: {}",
            missing.join(", ")
        )));
    }

    templates.sort();
    templates.dedup_by(|a, b| a.1 == b.1);

    let mut ids_by_key = BTreeMap::new();
    for (_, key, template) in templates {
        let existing = store
            .views_by_key(&key)?
            .into_iter()
            .find(|v| v.website_id == Some(website_id));
        let cow_id = match existing {
            Some(view) => view.id,
            None => {
                let id = store.create_cow(template, website_id)?;
                debug!("Created website {website_id} copy of view \"{key}\" (id={id})");
                id
            }
        };
        ids_by_key.insert(key, cow_id);
    }
    Ok(ids_by_key)
}

/// Parsed arch of exactly one referenced view
pub fn get_arch<S>(store: &S, view: &ViewRef) -> Result<Document>
where
    S: ViewStore + XmlIdResolver + ?Sized,
{
    let id = single_view_id(store, view)?;
    let arch = store
        .arch(id)?
        .ok_or_else(|| Error::NotFound(format!("View \"{view}\" not found, or has no arch")))?;
    parse_arch(id, &arch)
}

/// Read-only resolution of a reference that must match one view
fn single_view_id<S>(store: &S, view: &ViewRef) -> Result<ViewId>
where
    S: ViewStore + XmlIdResolver + ?Sized,
{
    let ids: BTreeSet<ViewId> = match view {
        ViewRef::Id(id) => BTreeSet::from([*id]),
        ViewRef::XmlId(xmlid) => {
            let (module, name) = split_xmlid(xmlid)?;
            store
                .resolve_xmlid(VIEW_MODEL, &module, &name)?
                .into_iter()
                .collect()
        }
        ViewRef::Key(key) => keys_to_ids(store, &[key], false, false)?
            .into_values()
            .flatten()
            .collect(),
    };
    let mut ids = ids.into_iter();
    match (ids.next(), ids.next()) {
        (Some(id), None) => Ok(id),
        (None, _) => Err(Error::NotFound(format!("View \"{view}\" not found, or has no arch"))),
        (Some(_), Some(_)) => Err(Error::Ambiguous(format!("View reference {view} matches several views"))),
    }
}

impl<S> ArchLookup for S
where
    S: ViewStore + XmlIdResolver,
{
    fn fetch_arch(&self, view: &ViewRef) -> Result<Document> {
        get_arch(self, view)
    }
}
