//! Bulk conversion of HTML stored in table columns.
//!
//! Rows are read in pages of `chunk_size`, rewritten in memory and written
//! back with one batched update per page. Only rows whose value actually
//! changed are written.

use crate::bootstrap::Bs3To4Converter;
use crate::config::HtmlConvertOptions;
use crate::error::{Error, Result};
use log::{debug, info};

/// Row-level access to plain table columns
pub trait RowStore {
    /// Rows `offset..offset + limit` (by id) whose value is set and not empty
    fn fetch_page(&mut self, table: &str, column: &str, offset: usize, limit: usize) -> Result<Vec<(i64, String)>>;

    /// Write new values for the given rows in one batch
    fn update_rows(&mut self, table: &str, column: &str, rows: &[(i64, String)]) -> Result<()>;

    fn column_exists(&self, table: &str, column: &str) -> Result<bool>;

    /// Stored html fields (`(model, field)`) whose name contains `pattern`,
    /// case-insensitively
    fn html_fields_like(&self, pattern: &str) -> Result<Vec<(String, String)>>;
}

/// Html fields that are not named like website descriptions but hold
/// website content too
const EXTRA_WEBSITE_HTML_FIELDS: &[(&str, &str)] = &[("event.event", "description")];

/// Table of a model: dots become underscores
pub fn table_of_model(model: &str) -> String {
    model.replace('.', "_")
}

/// Html fields holding website content, restricted to existing columns
pub fn website_html_fields<S>(store: &S) -> Result<Vec<(String, String)>>
where
    S: RowStore + ?Sized,
{
    let mut fields = store.html_fields_like("website_description")?;
    fields.extend(
        EXTRA_WEBSITE_HTML_FIELDS
            .iter()
            .map(|(model, field)| (model.to_string(), field.to_string())),
    );
    let mut existing = Vec::with_capacity(fields.len());
    for (model, field) in fields {
        if store.column_exists(&table_of_model(&model), &field)? {
            existing.push((model, field));
        }
    }
    Ok(existing)
}

/// Rewrite every non-empty value of a column page by page.
///
/// `rewrite` returns the new value of a row; rows for which it returns the
/// same value are left alone. Returns the number of rows written.
pub fn rewrite_column<S, F>(store: &mut S, table: &str, column: &str, chunk_size: usize, mut rewrite: F) -> Result<usize>
where
    S: RowStore + ?Sized,
    F: FnMut(i64, &str) -> Result<String>,
{
    if chunk_size == 0 {
        return Err(Error::InvalidArgument("chunk_size must be positive".to_string()));
    }
    let mut offset = 0;
    let mut updated = 0;
    loop {
        let rows = store.fetch_page(table, column, offset, chunk_size)?;
        if rows.is_empty() {
            break;
        }
        let mut changed = Vec::new();
        for (id, value) in &rows {
            let new_value = rewrite(*id, value)?;
            if new_value != *value {
                changed.push((*id, new_value));
            }
        }
        if !changed.is_empty() {
            store.update_rows(table, column, &changed)?;
            updated += changed.len();
        }
        debug!(
            "{table}.{column}: rewrote {} of {} rows at offset {offset}",
            changed.len(),
            rows.len()
        );
        if rows.len() < chunk_size {
            break;
        }
        offset += chunk_size;
    }
    Ok(updated)
}

/// Convert html columns from Bootstrap 3 to 4.
///
/// Without an explicit list, [`website_html_fields`] are converted.
/// Returns the total number of rewritten rows.
pub fn convert_html_fields<S>(
    store: &mut S,
    models_fields: Option<&[(String, String)]>,
    options: &HtmlConvertOptions,
) -> Result<usize>
where
    S: RowStore + ?Sized,
{
    let models_fields = match models_fields {
        Some(list) => list.to_vec(),
        None => website_html_fields(&*store)?,
    };
    if options.verbose {
        info!(
            "Converting {} fields with embedded html website data from BS3 to BS4",
            models_fields.len()
        );
    }

    let mut total = 0;
    for (model, field) in &models_fields {
        let table = table_of_model(model);
        let updated = rewrite_column(store, &table, field, options.chunk_size, |id, value| {
            Bs3To4Converter::convert_arch(value, true).map_err(|e| Error::HtmlConversion {
                model: model.clone(),
                field: field.clone(),
                id,
                source: Box::new(e),
            })
        })?;
        if updated > 0 && options.verbose {
            info!("Converted {updated} `{model}` records `{field}` data from BS3 to BS4");
        }
        total += updated;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::store::MemoryStore;

    #[test]
    fn test_website_html_fields() {
        let mut store = MemoryStore::new();
        store.insert_html_field("product.template", "website_description");
        store.insert_html_field("sale.order", "x_website_description_extra");
        store.insert_html_field("blog.post", "content");
        store.create_column("product_template", "website_description");
        store.create_column("event_event", "description");

        assert_eq!(
            website_html_fields(&store).unwrap(),
            [
                ("product.template".to_string(), "website_description".to_string()),
                ("event.event".to_string(), "description".to_string()),
            ]
        );
    }

    #[test]
    fn test_pages_until_short_page() {
        let mut store = MemoryStore::new();
        for id in 1..=600 {
            let value = if id % 100 == 0 {
                r#"<div class="pull-right">x</div>"#
            } else {
                r#"<div class="float-right">x</div>"#
            };
            store.insert_row("product_template", "website_description", id, Some(value));
        }
        let fields = [("product.template".to_string(), "website_description".to_string())];
        let updated = convert_html_fields(&mut store, Some(&fields), &HtmlConvertOptions::default()).unwrap();

        assert_eq!(updated, 6);
        let offsets: Vec<usize> = store.page_reads().iter().map(|r| r.offset).collect();
        assert_eq!(offsets, [0, 250, 500]);
        assert!(store.page_reads().iter().all(|r| r.limit == 250));
        let updates: Vec<Vec<i64>> = store.row_updates().iter().map(|u| u.ids.clone()).collect();
        assert_eq!(updates, [vec![100, 200], vec![300, 400, 500], vec![600]]);
        assert_eq!(
            store.row("product_template", "website_description", 300),
            Some(r#"<div class="float-right">x</div>"#)
        );
    }

    #[test]
    fn test_unchanged_page_issues_no_update() {
        let mut store = MemoryStore::new();
        store.insert_row("event_event", "description", 1, Some("<p>plain</p>"));
        store.insert_row("event_event", "description", 2, None);
        let fields = [("event.event".to_string(), "description".to_string())];
        let options = HtmlConvertOptions {
            chunk_size: 10,
            verbose: false,
        };
        assert_eq!(convert_html_fields(&mut store, Some(&fields), &options).unwrap(), 0);
        assert!(store.row_updates().is_empty());
        assert_eq!(store.page_reads().len(), 1);
    }

    #[test]
    fn test_only_changed_rows_are_counted() {
        let mut store = MemoryStore::new();
        store.insert_row("event_event", "description", 7, Some(r#"<ul class="dropdown-menu"><li>x</li></ul>"#));
        store.insert_row("event_event", "description", 8, Some("<li>bare</li>"));
        let fields = [("event.event".to_string(), "description".to_string())];
        let options = HtmlConvertOptions::default();
        assert_eq!(convert_html_fields(&mut store, Some(&fields), &options).unwrap(), 1);
        assert_eq!(
            store.row("event_event", "description", 7),
            Some(r#"<ul class="dropdown-menu">x</ul>"#)
        );

        let fields = [("event.event".to_string(), "missing".to_string())];
        let err = convert_html_fields(&mut store, Some(&fields), &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_rewrite_error_is_wrapped() {
        let mut store = MemoryStore::new();
        store.insert_row("event_event", "description", 7, Some("<p>x</p>"));
        let err = rewrite_column(&mut store, "event_event", "description", 5, |id, _| {
            Err(Error::HtmlConversion {
                model: "event.event".to_string(),
                field: "description".to_string(),
                id,
                source: Box::new(Error::XmlSyntax("boom".to_string())),
            })
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "Failed converting html event.event.description for record id=7");
        assert_eq!(err.kind(), ErrorKind::Malformed);
        assert!(store.row_updates().is_empty());
    }

    #[test]
    fn test_chunk_size_must_be_positive() {
        let mut store = MemoryStore::new();
        let err = rewrite_column(&mut store, "t", "c", 0, |_, v| Ok(v.to_string())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }
}
