//! The Bootstrap 3 to 4 rule table.
//!
//! Groups run in order: simple class renames first, structural rewrites
//! (navbars, cards) last, since those expect already renamed classes.
//! Selectors are translated and compiled once per process.

use super::css::simple_css_selector_to_xpath;
use super::ops::ElementOp;
use crate::error::Result;
use crate::xpath::XPath;
use std::sync::OnceLock;

/// Operations applied in sequence to every element a selector matches
#[derive(Debug)]
pub struct Rule {
    pub selector: &'static str,
    pub xpath: XPath,
    pub ops: Vec<ElementOp>,
}

/// Rules of one priority tier
#[derive(Debug)]
pub struct RuleGroup {
    pub name: &'static str,
    pub rules: Vec<Rule>,
}

type GroupSpec = (&'static str, Vec<(&'static str, Vec<ElementOp>)>);

static RULE_GROUPS: OnceLock<Vec<RuleGroup>> = OnceLock::new();

fn add(class: &str) -> ElementOp {
    ElementOp::add_class(class)
}

fn remove(class: &str) -> ElementOp {
    ElementOp::remove_class(class)
}

/// Swap one class for another
fn rename(old: &str, new: &str) -> Vec<ElementOp> {
    vec![add(new), remove(old)]
}

fn table() -> Vec<GroupSpec> {
    vec![
        (
            "INPUTS",
            vec![
                (".form-group .control-label", rename("control-label", "form-control-label")),
                (".form-group .text-help", rename("text-help", "form-control-feedback")),
                (".control-group .help-block", rename("help-block", "form-text")),
                (".form-group-sm", rename("form-group-sm", "form-control-sm")),
                (".form-group-lg", rename("form-group-lg", "form-control-lg")),
                (".form-control.input-lg", rename("input-lg", "form-control-lg")),
                (".form-control.input-sm", rename("input-sm", "form-control-sm")),
            ],
        ),
        (
            "HIDE",
            vec![
                (".hidden-xs", rename("hidden-xs", "d-none")),
                (".hidden-sm", rename("hidden-sm", "d-sm-none")),
                (".hidden-md", rename("hidden-md", "d-md-none")),
                (".hidden-lg", rename("hidden-lg", "d-lg-none")),
                (".visible-xs", vec![add("d-block"), add("d-sm-none"), remove("visible-xs")]),
                (".visible-sm", vec![add("d-block"), add("d-md-none"), remove("visible-sm")]),
                (".visible-md", vec![add("d-block"), add("d-lg-none"), remove("visible-md")]),
                (".visible-lg", vec![add("d-block"), add("d-xl-none"), remove("visible-lg")]),
            ],
        ),
        (
            "IMAGE",
            vec![
                (".img-rounded", rename("img-rounded", "rounded")),
                (".img-circle", rename("img-circle", "rounded-circle")),
                (".img-responsive", vec![add("img-fluid"), add("d-block"), remove("img-responsive")]),
            ],
        ),
        (
            "BUTTONS",
            vec![
                (".btn-default", rename("btn-default", "btn-secondary")),
                (".btn-xs", rename("btn-xs", "btn-sm")),
                (".btn-group.btn-group-xs", rename("btn-group-xs", "btn-group-sm")),
                (".dropdown .divider", rename("divider", "dropdown-divider")),
                (".badge", vec![add("badge"), add("badge-pill")]),
                (".label", rename("label", "badge")),
                (".label-default", rename("label-default", "badge-secondary")),
                (".label-primary", rename("label-primary", "badge-primary")),
                (".label-success", rename("label-success", "badge-success")),
                (".label-info", rename("label-info", "badge-info")),
                (".label-warning", rename("label-warning", "badge-warning")),
                (".label-danger", rename("label-danger", "badge-danger")),
                (".breadcrumb > li", rename("breadcrumb", "breadcrumb-item")),
            ],
        ),
        ("LI", vec![(".list-inline > li", vec![add("list-inline-item")])]),
        (
            "PAGINATION",
            vec![
                (".pagination > li", vec![add("page-item")]),
                (".pagination > li > a", vec![add("page-link")]),
            ],
        ),
        (
            "CAROUSEL",
            vec![(".carousel .carousel-inner > .item", rename("item", "carousel-item"))],
        ),
        (
            "PULL",
            vec![
                (".pull-right", rename("pull-right", "float-right")),
                (".pull-left", rename("pull-left", "float-left")),
                (".center-block", rename("center-block", "mx-auto")),
            ],
        ),
        (
            "WELL",
            vec![
                (".well", vec![ElementOp::MakeCard]),
                (".thumbnail", vec![ElementOp::MakeCard]),
            ],
        ),
        (
            "BLOCKQUOTE",
            vec![
                ("blockquote", vec![ElementOp::ConvertBlockquote]),
                (".blockquote.blockquote-reverse", rename("blockquote-reverse", "text-right")),
            ],
        ),
        (
            "DROPDOWN",
            vec![
                (".dropdown-menu > li > a", vec![add("dropdown-item")]),
                (".dropdown-menu > li", vec![ElementOp::PullUp]),
            ],
        ),
        ("IN", vec![(".in", rename("in", "show"))]),
        (
            "TABLE",
            vec![
                ("tr.active, td.active", rename("active", "table-active")),
                ("tr.success, td.success", rename("success", "table-success")),
                ("tr.info, td.info", rename("info", "table-info")),
                ("tr.warning, td.warning", rename("warning", "table-warning")),
                ("tr.danger, td.danger", rename("danger", "table-danger")),
                ("table.table-condensed", rename("table-condensed", "table-sm")),
            ],
        ),
        (
            "NAVBAR",
            vec![
                (".nav.navbar > li > a", vec![add("nav-link")]),
                (".nav.navbar > li", vec![add("nav-item")]),
                (".navbar-btn", rename("navbar-btn", "nav-item")),
                (".navbar-nav", vec![add("ml-auto"), remove("navbar-right"), remove("nav")]),
                (".navbar-toggler-right", rename("navbar-toggler-right", "ml-auto")),
                (".navbar-nav > li > a", vec![add("nav-link")]),
                (".navbar-nav > li", vec![add("nav-item")]),
                (".navbar-nav > a", vec![add("navbar-brand")]),
                (".navbar-fixed-top", rename("navbar-fixed-top", "fixed-top")),
                (".navbar-toggle", rename("navbar-toggle", "navbar-toggler")),
                (".nav-stacked", rename("nav-stacked", "flex-column")),
                ("nav.navbar", vec![add("navbar-expand-lg")]),
                ("button.navbar-toggle", rename("navbar-toggle", "navbar-expand-md")),
            ],
        ),
        (
            "CARD",
            vec![
                (".panel", vec![ElementOp::ConvertCard]),
                (".card", vec![ElementOp::ConvertCard]),
            ],
        ),
    ]
}

fn compile(table: Vec<GroupSpec>) -> Result<Vec<RuleGroup>> {
    table
        .into_iter()
        .map(|(name, rules)| {
            let rules = rules
                .into_iter()
                .map(|(selector, ops)| {
                    let xpath = XPath::new(&simple_css_selector_to_xpath(selector)?)?;
                    Ok(Rule { selector, xpath, ops })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(RuleGroup { name, rules })
        })
        .collect()
}

/// The compiled rule groups, in priority order
pub fn rule_groups() -> Result<&'static [RuleGroup]> {
    if let Some(groups) = RULE_GROUPS.get() {
        return Ok(groups);
    }
    let compiled = compile(table())?;
    Ok(RULE_GROUPS.get_or_init(|| compiled))
}
