//! Element operations of the conversion rules.
//!
//! An operation receives one element and returns the element further
//! operations of the same rule continue with: the same one, a replacement,
//! or `None` once the element is gone.

use super::classes::{edit_classes, ClassList};
use crate::dom::{Document, NodeId, NodeKind, DOCUMENT_NODE};
use crate::error::{Error, Result};
use std::fmt;

/// Class substitutions applied over a whole converted card
const CARD_POST_CONVERSIONS: &[(&str, &[&str])] = &[
    ("title", &["card-title"]),
    ("description", &["card-description"]),
    ("category", &["card-category"]),
    ("panel-danger", &["card", "bg-danger", "text-white"]),
    ("panel-warning", &["card", "bg-warning"]),
    ("panel-info", &["card", "bg-info", "text-white"]),
    ("panel-success", &["card", "bg-success", "text-white"]),
    ("panel-primary", &["card", "bg-primary", "text-white"]),
    ("panel-footer", &["card-footer"]),
    ("panel-body", &["card-body"]),
    ("panel-title", &["card-title"]),
    ("panel-heading", &["card-header"]),
    ("panel-default", &[]),
    ("panel", &["card"]),
];

/// One step of a conversion rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementOp {
    AddClass(String),
    RemoveClass(String),
    /// Replace the element by its content
    PullUp,
    /// `<blockquote>` to `<div class="blockquote">`
    ConvertBlockquote,
    /// Wrap the content of a well or thumbnail into a bare card
    MakeCard,
    /// Convert a panel or card and its parts to card components
    ConvertCard,
}

impl ElementOp {
    pub fn add_class(class: &str) -> Self {
        ElementOp::AddClass(class.to_string())
    }

    pub fn remove_class(class: &str) -> Self {
        ElementOp::RemoveClass(class.to_string())
    }

    /// Apply to `element`, returning the element to continue with
    pub fn apply(&self, doc: &mut Document, element: NodeId) -> Result<Option<NodeId>> {
        match self {
            ElementOp::AddClass(class) => {
                edit_classes(doc, element, |c| c.add(class));
                Ok(Some(element))
            }
            ElementOp::RemoveClass(class) => {
                edit_classes(doc, element, |c| {
                    c.remove(class);
                });
                Ok(Some(element))
            }
            ElementOp::PullUp => {
                pull_up(doc, element)?;
                Ok(None)
            }
            ElementOp::ConvertBlockquote => {
                let mut classes = ClassList::of(doc, element);
                classes.add("blockquote");
                let blockquote = copy_element(doc, element, "div", &classes, false, true);
                doc.replace_node(element, blockquote);
                Ok(Some(blockquote))
            }
            ElementOp::MakeCard => {
                let card = doc.create_element_with("div", &[("class", "card")]);
                let body_classes = ClassList::parse("card-body");
                let body = copy_element(doc, element, "div", &body_classes, false, true);
                doc.append_child(card, body);
                doc.replace_node(element, card);
                Ok(Some(card))
            }
            ElementOp::ConvertCard => convert_card(doc, element).map(Some),
        }
    }
}

impl fmt::Display for ElementOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementOp::AddClass(class) => write!(f, "AddClass({class})"),
            ElementOp::RemoveClass(class) => write!(f, "RemoveClass({class})"),
            ElementOp::PullUp => f.write_str("PullUp"),
            ElementOp::ConvertBlockquote => f.write_str("ConvertBlockquote"),
            ElementOp::MakeCard => f.write_str("MakeCard"),
            ElementOp::ConvertCard => f.write_str("ConvertCard"),
        }
    }
}

/// Move the content of `element` (text included) to where it stands and
/// remove it. Its tail stays in place.
fn pull_up(doc: &mut Document, element: NodeId) -> Result<()> {
    match doc.parent_of(element) {
        Some(parent) if parent != DOCUMENT_NODE => {
            doc.unwrap_element(element);
            Ok(())
        }
        _ => Err(Error::Usage(format!(
            "Cannot pull up contents of xml element with no parent: <{}>",
            doc.node_name(element).unwrap_or("?")
        ))),
    }
}

/// New detached element named `tag` with the given classes, optionally the
/// other attributes of `source` and a copy of its content
fn copy_element(
    doc: &mut Document,
    source: NodeId,
    tag: &str,
    classes: &ClassList,
    copy_attrs: bool,
    copy_contents: bool,
) -> NodeId {
    let copy = doc.create_element(tag);
    classes.store(doc, copy);
    if copy_attrs {
        let attributes: Vec<(String, String)> = doc
            .attributes(source)
            .iter()
            .filter(|a| a.name != "class")
            .map(|a| (a.name.clone(), a.value.clone()))
            .collect();
        for (name, value) in attributes {
            doc.set_attribute(copy, &name, value);
        }
    }
    if copy_contents {
        for child in doc.children_vec(source) {
            let child_copy = doc.deep_copy(child);
            doc.append_child(copy, child_copy);
        }
    }
    copy
}

fn convert_card(doc: &mut Document, element: NodeId) -> Result<NodeId> {
    let classes = ClassList::of(doc, element);
    let card = copy_element(doc, element, "div", &classes, true, false);
    let container = if classes.contains("card-horizontal") {
        let row = doc.create_element_with("div", &[("class", "row")]);
        doc.append_child(card, row);
        row
    } else {
        card
    };
    if let Some(text) = doc.text(element) {
        doc.set_text(container, Some(&text));
    }

    let parts: Vec<NodeId> = doc
        .children_vec(element)
        .into_iter()
        .filter(|&c| doc.kind(c) != Some(NodeKind::Text))
        .collect();
    for part in parts {
        convert_card_part(doc, part, &classes, container);
    }

    post_convert_card(doc, card);
    doc.replace_node(element, card);
    Ok(card)
}

/// Convert one child of an old card into the matching card component and
/// append it to `container`. Unrecognized children move over unchanged.
fn convert_card_part(doc: &mut Document, part: NodeId, card_classes: &ClassList, container: NodeId) {
    let classes = ClassList::of(doc, part);
    let is_image = classes.contains("image");
    let is_content = classes.contains("content");

    let (add, remove): (&str, &[&str]) =
        if classes.contains("header") || (is_image && !doc.element_children(part).is_empty()) {
            ("card-header", &["header", "image"])
        } else if is_content {
            if card_classes.contains("card-background") {
                ("card-img-overlay", &["content"])
            } else {
                ("card-body", &["content"])
            }
        } else if classes.contains_any(&["card-footer", "footer", "text-center"]) {
            ("card-footer", &["footer"])
        } else {
            doc.append_child(container, part);
            return;
        };

    let mut new_classes = classes.clone();
    new_classes.add(add);
    for class in remove {
        new_classes.remove(class);
    }
    let component = copy_element(doc, part, "div", &new_classes, true, true);

    if is_image {
        let image = doc
            .element_children(component)
            .into_iter()
            .find(|&c| doc.node_name(c) == Some("img"));
        if let Some(image) = image {
            if let Some(src) = doc.get_attribute(image, "src").map(str::to_string) {
                doc.set_attribute(
                    component,
                    "style",
                    format!(
                        "background-image: url(\"{src}\"); background-position: center center; background-size: cover;"
                    ),
                );
                doc.detach(image);
            }
        }
    }

    let tail = doc.tail(part);
    doc.append_child(container, component);
    doc.set_tail(component, tail.as_deref());

    if is_content {
        let footer = doc
            .element_children(component)
            .into_iter()
            .find(|&c| ClassList::of(doc, c).contains("footer"));
        if let Some(footer) = footer {
            convert_card_part(doc, footer, card_classes, container);
            if doc.parent_of(footer) == Some(component) {
                doc.detach(footer);
            }
        }
    }
}

fn post_convert_card(doc: &mut Document, card: NodeId) {
    let mut elements = vec![card];
    elements.extend(doc.descendants_vec(card).into_iter().filter(|&d| doc.is_element(d)));
    for element in elements {
        let mut classes = ClassList::of(doc, element);
        let mut changed = false;
        for (old, new) in CARD_POST_CONVERSIONS {
            if classes.remove(old) {
                changed = true;
                for class in *new {
                    classes.add(class);
                }
            }
        }
        if changed {
            classes.store(doc, element);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    /// Apply `op` to the first `name` element and serialize the result
    fn apply(input: &str, name: &str, op: ElementOp) -> String {
        let mut doc = Document::parse(input).unwrap();
        let root = doc.root_element_id().unwrap();
        let target = doc
            .descendants_vec(root)
            .into_iter()
            .find(|&d| doc.node_name(d) == Some(name))
            .unwrap();
        op.apply(&mut doc, target).unwrap();
        doc.to_xml(root)
    }

    #[test]
    fn test_class_ops_continue_with_same_element() {
        let mut doc = Document::parse(r#"<div class="pull-right"/>"#).unwrap();
        let div = doc.root_element_id().unwrap();
        let next = ElementOp::add_class("float-right").apply(&mut doc, div).unwrap();
        assert_eq!(next, Some(div));
        ElementOp::remove_class("pull-right").apply(&mut doc, div).unwrap();
        assert_eq!(doc.to_xml(div), r#"<div class="float-right"/>"#);
    }

    #[test]
    fn test_pull_up_keeps_text_and_tail() {
        assert_eq!(
            apply("<ul><li>one <a>x</a> two</li> after</ul>", "li", ElementOp::PullUp),
            "<ul>one <a>x</a> two after</ul>"
        );
        assert_eq!(
            apply("<ul><b/>, <li>one</li></ul>", "li", ElementOp::PullUp),
            "<ul><b/>, one</ul>"
        );
    }

    #[test]
    fn test_pull_up_root_fails() {
        let mut doc = Document::parse("<li>x</li>").unwrap();
        let root = doc.root_element_id().unwrap();
        let err = ElementOp::PullUp.apply(&mut doc, root).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn test_convert_blockquote() {
        assert_eq!(
            apply(
                r#"<data><blockquote class="blockquote-reverse" id="q"><p>x</p></blockquote> tail</data>"#,
                "blockquote",
                ElementOp::ConvertBlockquote
            ),
            r#"<data><div class="blockquote-reverse blockquote"><p>x</p></div> tail</data>"#
        );
    }

    #[test]
    fn test_make_card() {
        assert_eq!(
            apply(r#"<data><div class="well well-sm" id="w">Hi <b>there</b></div></data>"#, "div", ElementOp::MakeCard),
            r#"<data><div class="card"><div class="card-body">Hi <b>there</b></div></div></data>"#
        );
    }

    #[test]
    fn test_convert_panel() {
        let input = concat!(
            r#"<data><div class="panel panel-danger" id="p">"#,
            r#"<div class="panel-heading header"><h3 class="panel-title">T</h3></div>"#,
            r#"<div class="content">Body<div class="footer">F</div></div>"#,
            r#"<span>other</span>"#,
            r#"</div></data>"#,
        );
        assert_eq!(
            apply(input, "div", ElementOp::ConvertCard),
            concat!(
                r#"<data><div class="card bg-danger text-white" id="p">"#,
                r#"<div class="card-header"><h3 class="card-title">T</h3></div>"#,
                r#"<div class="card-body">Body</div>"#,
                r#"<div class="card-footer">F</div>"#,
                r#"<span>other</span>"#,
                r#"</div></data>"#,
            )
        );
    }

    #[test]
    fn test_convert_card_image_and_horizontal() {
        let input = concat!(
            r#"<data><div class="card card-horizontal card-background">"#,
            r#"<div class="image"><img src="/a.png"/><span>x</span></div>"#,
            r#"<div class="content">C</div>"#,
            r#"</div></data>"#,
        );
        assert_eq!(
            apply(input, "div", ElementOp::ConvertCard),
            concat!(
                r#"<data><div class="card card-horizontal card-background"><div class="row">"#,
                r#"<div class="card-header" style="background-image: url(&quot;/a.png&quot;); background-position: center center; background-size: cover;"><span>x</span></div>"#,
                r#"<div class="card-img-overlay">C</div>"#,
                r#"</div></div></data>"#,
            )
        );
    }
}
