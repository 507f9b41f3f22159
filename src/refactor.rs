//! Follow-up of field renames in stored code and templates.
//!
//! Renames are recorded per model while an upgrade runs and applied at the
//! end in one pass. References cannot be told apart by model, so every
//! whole-word occurrence of an old name is rewritten wherever it appears.

use crate::config::DEFAULT_CHUNK_SIZE;
use crate::error::{Error, Result};
use crate::html_fields::{rewrite_column, RowStore};
use log::{debug, info};
use regex::Regex;
use std::collections::BTreeMap;

/// Columns holding code or templates that may reference field names
pub const DEFAULT_RENAME_TARGETS: &[(&str, &[&str])] = &[
    ("ir_act_server", &["code"]),
    ("ir_ui_view_custom", &["arch"]),
    ("ir_server_object_lines", &["value"]),
    (
        "mail_template",
        &[
            "subject",
            "body_html",
            "email_from",
            "email_to",
            "partner_to",
            "email_cc",
            "reply_to",
            "scheduled_date",
            "lang",
        ],
    ),
];

/// Field renames done so far, per model
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingRenames {
    by_model: BTreeMap<String, BTreeMap<String, String>>,
}

impl PendingRenames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, model: &str, old: &str, new: &str) {
        self.by_model
            .entry(model.to_string())
            .or_default()
            .insert(old.to_string(), new.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.by_model.values().all(BTreeMap::is_empty)
    }

    /// All renames in one map. The same old name renamed to two different
    /// names (on different models) cannot be merged.
    pub fn merged(&self) -> Result<BTreeMap<String, String>> {
        let mut merged: BTreeMap<String, String> = BTreeMap::new();
        for renames in self.by_model.values() {
            for (old, new) in renames {
                match merged.get(old) {
                    Some(existing) if existing != new => {
                        return Err(Error::Ambiguous(format!(
                            "Rename \"{old}\"->\"{new}\" conflicts with existing rename \"{old}\"->\"{existing}\""
                        )));
                    }
                    _ => {
                        merged.insert(old.clone(), new.clone());
                    }
                }
            }
        }
        Ok(merged)
    }

    /// Drain the recorded renames
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

/// Compiled whole-word rewrites, applied one after the other
#[derive(Debug, Clone)]
pub struct RenamePatterns {
    patterns: Vec<(Regex, String)>,
}

impl RenamePatterns {
    pub fn new(renames: &BTreeMap<String, String>) -> Result<Self> {
        let patterns = renames
            .iter()
            .map(|(old, new)| {
                let pattern = format!(r"\b{{start}}{}\b{{end}}", regex::escape(old));
                Regex::new(&pattern)
                    .map(|re| (re, new.clone()))
                    .map_err(|e| Error::InvalidArgument(format!("Cannot match rename of `{old}`: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(RenamePatterns { patterns })
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn apply(&self, text: &str) -> String {
        let mut text = text.to_string();
        for (re, new) in &self.patterns {
            if re.is_match(&text) {
                text = re.replace_all(&text, regex::NoExpand(new)).into_owned();
            }
        }
        text
    }
}

/// Rewrite whole-word occurrences of every old name in `text`
pub fn replace_renamed(text: &str, renames: &BTreeMap<String, String>) -> Result<String> {
    Ok(RenamePatterns::new(renames)?.apply(text))
}

/// Rewrite renamed names in the given `(table, columns)` targets.
///
/// Columns that do not exist are skipped. Returns the number of rewritten
/// values.
pub fn fix_renames_in_columns<S>(
    store: &mut S,
    targets: &[(&str, &[&str])],
    renames: &BTreeMap<String, String>,
) -> Result<usize>
where
    S: RowStore + ?Sized,
{
    let patterns = RenamePatterns::new(renames)?;
    if patterns.is_empty() {
        return Ok(0);
    }
    let mut total = 0;
    for (table, columns) in targets {
        info!(
            "Fixing {} renamed fields/values referenced in \"{table}\"",
            patterns.len()
        );
        for column in *columns {
            if !store.column_exists(table, column)? {
                debug!("Skipping missing column {table}.{column}");
                continue;
            }
            total += rewrite_column(store, table, column, DEFAULT_CHUNK_SIZE, |_, value| {
                Ok(patterns.apply(value))
            })?;
        }
    }
    Ok(total)
}

/// Apply and clear the pending renames over [`DEFAULT_RENAME_TARGETS`]
pub fn apply_pending_renames<S>(store: &mut S, pending: &mut PendingRenames) -> Result<usize>
where
    S: RowStore + ?Sized,
{
    info!("Applying pending post-refactors steps");
    let merged = pending.merged()?;
    let fixed = if merged.is_empty() {
        0
    } else {
        fix_renames_in_columns(store, DEFAULT_RENAME_TARGETS, &merged)?
    };
    pending.take();
    Ok(fixed)
}
