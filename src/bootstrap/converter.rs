//! Rule-driven conversion of whole documents.

use super::rules::{rule_groups, RuleGroup};
use crate::dom::Document;
use crate::error::{Error, Result};
use log::{debug, warn};
use std::path::Path;

const XML_DECLARATION: &str = "<?xml version='1.0' encoding='UTF-8'?>\n";

/// Applies a rule table to documents
#[derive(Debug, Clone, Copy)]
pub struct Bs3To4Converter<'r> {
    groups: &'r [RuleGroup],
}

impl Bs3To4Converter<'static> {
    /// Converter with the Bootstrap 3 to 4 rule table
    pub fn new() -> Result<Self> {
        Ok(Bs3To4Converter {
            groups: rule_groups()?,
        })
    }

    /// Convert an arch fragment, returning the converted markup.
    ///
    /// The fragment may hold several top-level nodes.
    pub fn convert_arch(arch: &str, is_html: bool) -> Result<String> {
        let wrapped = format!("<data>{arch}</data>");
        let mut doc = if is_html {
            Document::parse_html(&wrapped)?
        } else {
            Document::parse(&wrapped)?
        };
        Self::new()?.convert(&mut doc)?;
        let root = doc
            .root_element_id()
            .ok_or_else(|| Error::XmlSyntax("document has no root element".to_string()))?;
        Ok(doc.inner_markup(root))
    }

    /// Convert a file in place. Files with an `htm*` extension are handled
    /// as HTML, anything else as XML (written back with a declaration).
    pub fn convert_file(path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let is_html = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.to_ascii_lowercase().starts_with("htm"));
        let source = std::fs::read_to_string(path)?;
        let mut doc = if is_html {
            Document::parse_html(&source)?
        } else {
            Document::parse(&source)?
        };
        Self::new()?.convert(&mut doc)?;
        let output = if is_html {
            doc.to_string()
        } else {
            format!("{XML_DECLARATION}{doc}")
        };
        std::fs::write(path, output)?;
        Ok(())
    }
}

impl<'r> Bs3To4Converter<'r> {
    /// Converter over a custom rule table
    pub fn with_rules(groups: &'r [RuleGroup]) -> Self {
        Bs3To4Converter { groups }
    }

    /// Convert a document in place.
    ///
    /// Each selector is evaluated once against the current tree; elements
    /// removed by a previous match are skipped.
    pub fn convert(&self, doc: &mut Document) -> Result<()> {
        for group in self.groups {
            debug!("Applying {} conversions", group.name);
            for rule in &group.rules {
                let matched = rule.xpath.evaluate(doc)?.into_nodeset().unwrap_or_default();
                for element in matched {
                    if !doc.is_attached(element) {
                        warn!(
                            "Skipping <{}> matched by `{}`: it was removed by an earlier conversion",
                            doc.node_name(element).unwrap_or("?"),
                            rule.selector
                        );
                        continue;
                    }
                    let mut current = Some(element);
                    for op in &rule.ops {
                        let Some(target) = current else {
                            return Err(Error::Usage(format!(
                                "Matched xml element is not available anymore before `{op}` (selector `{}`)! Check operations.",
                                rule.selector
                            )));
                        };
                        current = op.apply(doc, target)?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::ops::ElementOp;
    use crate::bootstrap::rules::Rule;
    use crate::error::ErrorKind;
    use crate::xpath::XPath;

    #[test]
    fn test_label_becomes_badge() {
        assert_eq!(
            Bs3To4Converter::convert_arch(r#"<div class="label label-danger">x</div>"#, false).unwrap(),
            r#"<div class="badge badge-danger">x</div>"#
        );
    }

    #[test]
    fn test_table_classes() {
        let arch = r#"<table class="table table-condensed"><tr class="active"><td class="danger">x</td></tr></table>"#;
        assert_eq!(
            Bs3To4Converter::convert_arch(arch, false).unwrap(),
            r#"<table class="table table-sm"><tr class="table-active"><td class="table-danger">x</td></tr></table>"#
        );
    }

    #[test]
    fn test_dropdown_items_are_pulled_up() {
        let arch = r##"<ul class="dropdown-menu"><li><a href="#">A</a></li><li class="divider"/></ul>"##;
        assert_eq!(
            Bs3To4Converter::convert_arch(arch, false).unwrap(),
            r##"<ul class="dropdown-menu"><a href="#" class="dropdown-item">A</a></ul>"##
        );
    }

    #[test]
    fn test_removed_matches_are_skipped() {
        let arch = r#"<div class="well"><div class="well">x</div></div>"#;
        assert_eq!(
            Bs3To4Converter::convert_arch(arch, false).unwrap(),
            r#"<div class="card"><div class="card-body"><div class="well">x</div></div></div>"#
        );
    }

    #[test]
    fn test_several_top_level_nodes() {
        let arch = "<p class=\"pull-right\">a</p>\n<p class=\"hidden-xs\">b</p>";
        assert_eq!(
            Bs3To4Converter::convert_arch(arch, true).unwrap(),
            "<p class=\"float-right\">a</p>\n<p class=\"d-none\">b</p>"
        );
    }

    #[test]
    fn test_operation_after_removal_fails() {
        let groups = vec![RuleGroup {
            name: "BROKEN",
            rules: vec![Rule {
                selector: "li",
                xpath: XPath::new("//li").unwrap(),
                ops: vec![ElementOp::PullUp, ElementOp::add_class("x")],
            }],
        }];
        let mut doc = Document::parse("<ul><li>a</li></ul>").unwrap();
        let err = Bs3To4Converter::with_rules(&groups).convert(&mut doc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn test_convert_files() {
        let dir = tempfile::tempdir().unwrap();

        let html = dir.path().join("page.html");
        std::fs::write(&html, r#"<div class="pull-left">x<br></div>"#).unwrap();
        Bs3To4Converter::convert_file(&html).unwrap();
        assert_eq!(
            std::fs::read_to_string(&html).unwrap(),
            r#"<div class="float-left">x<br></div>"#
        );

        let xml = dir.path().join("view.xml");
        std::fs::write(&xml, r#"<t><img class="img-responsive"/></t>"#).unwrap();
        Bs3To4Converter::convert_file(&xml).unwrap();
        assert_eq!(
            std::fs::read_to_string(&xml).unwrap(),
            "<?xml version='1.0' encoding='UTF-8'?>\n<t><img class=\"img-fluid d-block\"/></t>"
        );
        Bs3To4Converter::convert_file(&xml).unwrap();
        assert!(std::fs::read_to_string(&xml).unwrap().ends_with("<t><img class=\"img-fluid d-block\"/></t>"));
    }
}
