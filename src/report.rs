//! HTML summary of the edits made to views, for upgrade reports.

use crate::dom::{Document, DocumentMode, NodeId};
use crate::ops::Operation;
use crate::resolve::ViewRef;

/// Report category the entries are filed under
pub const VIEW_MODIFICATIONS_CATEGORY: &str = "Modified custom/studio views";

#[derive(Debug, Clone, PartialEq, Eq)]
struct ReportEntry {
    view: String,
    operations: Vec<String>,
}

/// Operations applied to each view, rendered as one HTML block per view
#[derive(Debug, Clone, Default)]
pub struct ViewModificationReport {
    entries: Vec<ReportEntry>,
}

impl ViewModificationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report every entry of an edit request that has operations
    pub fn from_request(request: &[(ViewRef, Vec<Operation>)]) -> Self {
        let mut report = Self::new();
        for (view, operations) in request.iter().filter(|(_, ops)| !ops.is_empty()) {
            report.add(&view.to_string(), operations);
        }
        report
    }

    pub fn add(&mut self, view: &str, operations: &[Operation]) {
        self.entries.push(ReportEntry {
            view: view.to_string(),
            operations: operations.iter().map(ToString::to_string).collect(),
        });
    }

    pub fn category(&self) -> &'static str {
        VIEW_MODIFICATIONS_CATEGORY
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One `<p>` block per view, in insertion order
    pub fn render(&self) -> Vec<String> {
        self.entries.iter().map(render_entry).collect()
    }
}

fn append_element(doc: &mut Document, parent: NodeId, name: &str) -> NodeId {
    let element = doc.create_element(name);
    doc.append_child(parent, element);
    element
}

fn append_text(doc: &mut Document, parent: NodeId, text: &str) {
    if !text.is_empty() {
        let node = doc.create_text(text);
        doc.append_child(parent, node);
    }
}

/// A description as a paragraph where `backticked` spans become `<code>`
fn append_description(doc: &mut Document, parent: NodeId, description: &str) {
    let p = append_element(doc, parent, "p");
    for (i, part) in description.split('`').enumerate() {
        if i % 2 == 1 {
            let code = append_element(doc, p, "code");
            append_text(doc, code, part);
        } else {
            append_text(doc, p, part);
        }
    }
}

fn render_entry(entry: &ReportEntry) -> String {
    let mut doc = Document::new(DocumentMode::Xml);
    let block = doc.create_element("p");
    append_text(&mut doc, block, &entry.view);
    append_element(&mut doc, block, "br");
    let details = append_element(&mut doc, block, "details");
    let summary = append_element(&mut doc, details, "summary");
    append_text(&mut doc, summary, "Operations:");
    let list = append_element(&mut doc, details, "ul");
    for description in &entry.operations {
        let item = append_element(&mut doc, list, "li");
        append_description(&mut doc, item, description);
    }
    doc.to_xml(block)
}
