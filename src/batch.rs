//! Batch editing of stored views.
//!
//! A request pairs view references with the operations to run on every view
//! they resolve to. Editing is fail-fast: the first failing operation aborts
//! the whole batch, and the view it was applied to is not written.

use crate::bootstrap::Bs3To4Converter;
use crate::config::EditOptions;
use crate::error::{Error, Result};
use crate::ops::{apply_all, ArchLookup, Operation};
use crate::resolve::{get_views_ids, get_views_ids_mapped, ResolveOptions, ViewKey, ViewRef, WebsiteScope};
use crate::store::{edit_arch, EditScope, ViewId, ViewStore, XmlIdResolver};
use log::{debug, info, log, warn, Level};
use std::collections::{BTreeMap, BTreeSet};

/// Views to edit and the operations to apply to each, in order
pub type EditRequest = [(ViewRef, Vec<Operation>)];

/// Apply the operations of a request to the views it references.
///
/// Entries with no operations are skipped. Every referenced view must exist
/// (or be created as a website copy when `create_missing_cows` is set).
/// Returns the ids of the edited views.
pub fn edit_views<S>(store: &mut S, request: &EditRequest, options: &EditOptions) -> Result<BTreeSet<ViewId>>
where
    S: ViewStore + XmlIdResolver,
{
    let refs: Vec<ViewRef> = request.iter().map(|(view, _)| view.clone()).collect();
    let ids_by_ref = get_views_ids_mapped(store, &refs, options.resolve_options())?;
    let level = if options.verbose { Level::Info } else { Level::Debug };
    let scope = EditScope {
        skip_if_not_noupdate: false,
        active: Some(true),
    };

    let mut updated = BTreeSet::new();
    for (origin, operations) in request {
        if operations.is_empty() {
            continue;
        }
        let ids = ids_by_ref.get(origin).cloned().unwrap_or_default();
        for id in ids {
            edit_arch(store, id, scope, |doc, store| {
                log!(level, "Patching ir.ui.view \"{origin}\" (id={id})");
                apply_all(operations, doc, Some(store as &dyn ArchLookup))?;
                if let Some(root) = doc.root_element_id() {
                    doc.indent_tree(root, 0);
                }
                Ok(())
            })?;
            updated.insert(id);
        }
    }

    if updated.is_empty() {
        let matched: Vec<String> = refs
            .iter()
            .map(|r| format!("{r}: {:?}", ids_by_ref.get(r).cloned().unwrap_or_default()))
            .collect();
        warn!(
            "No views edited by `edit_views`, arguments matched these ids: {{{}}}",
            matched.join(", ")
        );
    } else if options.update_arch {
        let ids: Vec<ViewId> = updated.iter().copied().collect();
        store.mark_arch_updated(&ids)?;
    }
    Ok(updated)
}

/// Like [`edit_views`], with external-id references read as website view
/// keys scoped to `options.website_id`. Edited views are always flagged as
/// `arch_updated`.
pub fn edit_website_views<S>(store: &mut S, request: &EditRequest, options: &EditOptions) -> Result<BTreeSet<ViewId>>
where
    S: ViewStore + XmlIdResolver,
{
    let request: Vec<(ViewRef, Vec<Operation>)> = request
        .iter()
        .map(|(view, operations)| {
            let view = match view {
                ViewRef::XmlId(key) => ViewRef::Key(ViewKey::new(key.as_str(), options.website_id)),
                other => other.clone(),
            };
            (view, operations.clone())
        })
        .collect();
    let options = EditOptions {
        update_arch: true,
        ..*options
    };
    edit_views(store, &request, &options)
}

/// Map website view keys to the id of their view for one website.
///
/// With `create_missing`, views missing for the website are copied from
/// their template, which requires a concrete website id. Each key must
/// match exactly one view.
pub fn get_website_views_ids<S>(
    store: &mut S,
    keys: &[&str],
    website_id: WebsiteScope,
    create_missing: bool,
) -> Result<BTreeMap<String, ViewId>>
where
    S: ViewStore + XmlIdResolver,
{
    if create_missing && !matches!(website_id, WebsiteScope::Id(_)) {
        return Err(Error::Usage(
            "Must specify a \"website_id\" when using \"create_missing\"".to_string(),
        ));
    }
    let refs: Vec<ViewRef> = keys
        .iter()
        .map(|&key| ViewRef::Key(ViewKey::new(key, website_id)))
        .collect();
    let options = ResolveOptions {
        ensure_exist: true,
        create_missing_cows: create_missing,
        website_id,
    };
    let ids_by_ref = get_views_ids_mapped(store, &refs, options)?;

    let mut ids_by_key = BTreeMap::new();
    for view in &refs {
        let ViewRef::Key(key) = view else { continue };
        let ids = ids_by_ref.get(view).cloned().unwrap_or_default();
        let mut ids = ids.into_iter();
        match (ids.next(), ids.next()) {
            (Some(id), None) => {
                ids_by_key.insert(key.key.clone(), id);
            }
            (None, _) => {
                return Err(Error::NotFound(format!("No view matches {key}")));
            }
            (Some(_), Some(_)) => {
                return Err(Error::Ambiguous(format!("{key} matches several views")));
            }
        }
    }
    Ok(ids_by_key)
}

/// Convert the arch of the referenced views from Bootstrap 3 to 4 and flag
/// them as `arch_updated`.
pub fn convert_views_bs3_to_bs4<S>(store: &mut S, refs: &[ViewRef]) -> Result<BTreeSet<ViewId>>
where
    S: ViewStore + XmlIdResolver,
{
    let ids = get_views_ids(store, refs, ResolveOptions::default())?;
    info!("Converting {} templates from BS3 to BS4", ids.len());
    let converter = Bs3To4Converter::new()?;
    let scope = EditScope {
        skip_if_not_noupdate: false,
        active: None,
    };
    for &id in &ids {
        debug!("Converting view id={id}");
        edit_arch(store, id, scope, |doc, _| converter.convert(doc))?;
    }
    if !ids.is_empty() {
        let ids: Vec<ViewId> = ids.iter().copied().collect();
        store.mark_arch_updated(&ids)?;
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::ops::{op, AddElementPosition, AddElements, CopyElements, RemoveFields};
    use crate::store::MemoryStore;

    fn quiet() -> EditOptions {
        EditOptions {
            verbose: false,
            ..EditOptions::default()
        }
    }

    #[test]
    fn test_edit_views_end_to_end() {
        let mut store = MemoryStore::new();
        let id = store.insert_view(r#"<form><field name="a"/><field name="b"/></form>"#);
        store.insert_xmlid("ir.ui.view", "sale.view_form", id);
        store.set_noupdate(id, false);

        let request = vec![(
            ViewRef::from("sale.view_form"),
            vec![
                op(RemoveFields::new(["a"]).unwrap()),
                op(AddElements::new(["//field[@name='b']"], r#"<field name="c"/>"#, AddElementPosition::After).unwrap()),
            ],
        )];
        let edited = edit_views(&mut store, &request, &quiet()).unwrap();

        assert_eq!(edited, BTreeSet::from([id]));
        assert_eq!(
            store.arch(id).unwrap().unwrap(),
            "<form>\n  <field name=\"b\"/>\n  <field name=\"c\"/>\n</form>"
        );
        assert!(store.is_active(id));
        assert!(store.is_arch_updated(id));
        assert_eq!(store.arch_updated_batches(), [vec![id]]);
    }

    #[test]
    fn test_empty_operation_lists_are_skipped() {
        let mut store = MemoryStore::new();
        let id = store.insert_view("<form/>");
        let request = vec![(ViewRef::Id(id), Vec::new())];
        let edited = edit_views(&mut store, &request, &quiet()).unwrap();
        assert!(edited.is_empty());
        assert!(store.writes().is_empty());
        assert!(store.arch_updated_batches().is_empty());
    }

    #[test]
    fn test_update_arch_disabled() {
        let mut store = MemoryStore::new();
        let id = store.insert_view(r#"<form><field name="a"/></form>"#);
        let request = vec![(ViewRef::Id(id), vec![op(RemoveFields::new(["a"]).unwrap())])];
        let options = EditOptions {
            update_arch: false,
            ..quiet()
        };
        edit_views(&mut store, &request, &options).unwrap();
        assert!(!store.is_arch_updated(id));
    }

    #[test]
    fn test_failure_aborts_batch() {
        let mut store = MemoryStore::new();
        let first = store.insert_view(r#"<form><field name="a"/></form>"#);
        let second = store.insert_view("<form/>");
        let request = vec![
            (ViewRef::Id(first), vec![op(RemoveFields::new(["a"]).unwrap())]),
            (
                ViewRef::Id(second),
                vec![op(CopyElements::new(["//field"], ["/form"], Some(ViewRef::Id(404)), AddElementPosition::Inside)
                    .unwrap())],
            ),
        ];
        let err = edit_views(&mut store, &request, &quiet()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(store.writes(), [first]);
        assert_eq!(store.arch(second).unwrap().unwrap(), "<form/>");
        assert!(store.arch_updated_batches().is_empty());
    }

    #[test]
    fn test_unknown_reference_fails_before_editing() {
        let mut store = MemoryStore::new();
        let id = store.insert_view(r#"<form><field name="a"/></form>"#);
        let request = vec![
            (ViewRef::Id(id), vec![op(RemoveFields::new(["a"]).unwrap())]),
            (ViewRef::from("sale.missing"), vec![op(RemoveFields::new(["a"]).unwrap())]),
        ];
        let err = edit_views(&mut store, &request, &quiet()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(store.writes().is_empty());
    }

    #[test]
    fn test_copy_elements_reads_other_views() {
        let mut store = MemoryStore::new();
        let source = store.insert_view(r#"<form><field name="x" widget="y"/></form>"#);
        store.insert_xmlid("ir.ui.view", "sale.source", source);
        let target = store.insert_view("<tree/>");
        let request = vec![(
            ViewRef::Id(target),
            vec![op(CopyElements::new(
                ["//field[@name='x']"],
                ["/tree"],
                Some(ViewRef::from("sale.source")),
                AddElementPosition::Inside,
            )
            .unwrap())],
        )];
        edit_views(&mut store, &request, &quiet()).unwrap();
        assert_eq!(
            store.arch(target).unwrap().unwrap(),
            "<tree>\n  <field name=\"x\" widget=\"y\"/>\n</tree>"
        );
    }

    #[test]
    fn test_edit_website_views_creates_copies() {
        let mut store = MemoryStore::new();
        let template = store.insert_keyed_view("website.footer", None, None, r#"<t><div id="f"/></t>"#);
        let request = vec![(
            ViewRef::from("website.footer"),
            vec![op(AddElements::new(["//div[@id='f']"], "<p/>", AddElementPosition::Inside).unwrap())],
        )];
        let options = EditOptions {
            update_arch: false,
            create_missing_cows: true,
            website_id: WebsiteScope::Id(1),
            ..quiet()
        };
        let edited = edit_website_views(&mut store, &request, &options).unwrap();

        assert_eq!(edited.len(), 1);
        let cow = *edited.iter().next().unwrap();
        assert_ne!(cow, template);
        assert_eq!(store.website_of(cow), Some(1));
        assert_eq!(store.cows(), [("website.footer".to_string(), 1)]);
        assert!(store.is_arch_updated(cow));
        assert_eq!(store.arch(template).unwrap().unwrap(), r#"<t><div id="f"/></t>"#);
    }

    #[test]
    fn test_get_website_views_ids() {
        let mut store = MemoryStore::new();
        store.insert_keyed_view("website.footer", None, None, "<t/>");
        let w1 = store.insert_keyed_view("website.footer", Some(1), None, "<t/>");
        store.insert_keyed_view("website.header", None, None, "<t/>");

        let ids = get_website_views_ids(&mut store, &["website.footer"], WebsiteScope::NotNull, false).unwrap();
        assert_eq!(ids, BTreeMap::from([("website.footer".to_string(), w1)]));

        let err = get_website_views_ids(&mut store, &["website.header"], WebsiteScope::NotNull, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);

        let ids = get_website_views_ids(&mut store, &["website.footer", "website.header"], WebsiteScope::Id(1), true)
            .unwrap();
        assert_eq!(ids["website.footer"], w1);
        assert_eq!(store.website_of(ids["website.header"]), Some(1));
    }

    #[test]
    fn test_convert_views() {
        let mut store = MemoryStore::new();
        let id = store.insert_view(r#"<t><span class="label label-danger">x</span></t>"#);
        store.insert_xmlid("ir.ui.view", "website.snippet", id);
        store.set_noupdate(id, false);
        let converted = convert_views_bs3_to_bs4(&mut store, &[ViewRef::from("website.snippet")]).unwrap();
        assert_eq!(converted, BTreeSet::from([id]));
        assert_eq!(
            store.arch(id).unwrap().unwrap(),
            r#"<t><span class="badge badge-danger">x</span></t>"#
        );
        assert!(store.is_arch_updated(id));
    }
}
