//! Element selection by one or more XPath expressions.
//!
//! Expressions are compiled when the selector is built, so a bad expression
//! fails before any document is touched. Matching evaluates them in
//! declared order and flattens the results.

use crate::dom::{Document, NodeId};
use crate::error::{Error, Result};
use crate::xpath::{FunctionTable, XPath, XPathValue};
use log::warn;
use std::fmt;
use std::sync::Arc;

/// One or more compiled XPath expressions that must yield elements
#[derive(Debug, Clone)]
pub struct Selector {
    xpaths: Vec<XPath>,
}

impl Selector {
    /// Compile every expression with the standard extension functions
    pub fn new<I, S>(xpaths: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_functions(xpaths, Arc::new(FunctionTable::standard()))
    }

    /// Compile every expression against a custom function table
    pub fn with_functions<I, S>(xpaths: I, functions: Arc<FunctionTable>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let xpaths = xpaths
            .into_iter()
            .map(|x| XPath::with_functions(x.as_ref(), Arc::clone(&functions)))
            .collect::<Result<Vec<_>>>()?;
        if xpaths.is_empty() {
            return Err(Error::InvalidArgument(
                "a selector needs at least one XPath expression".to_string(),
            ));
        }
        Ok(Selector { xpaths })
    }

    /// Selector with a single expression
    pub fn single(xpath: &str) -> Result<Self> {
        Self::new([xpath])
    }

    pub fn xpaths(&self) -> &[XPath] {
        &self.xpaths
    }

    /// All matched elements, expression by expression
    pub fn select(&self, doc: &Document) -> Result<Vec<NodeId>> {
        let mut matched = Vec::new();
        for xpath in &self.xpaths {
            matched.extend(elements_of(xpath, doc)?);
        }
        Ok(matched)
    }

    /// Visit matched elements, evaluating each expression only after the
    /// elements of the previous one were visited, so later expressions see
    /// the edits made for earlier ones.
    pub fn for_each_match<F>(&self, doc: &mut Document, mut visit: F) -> Result<()>
    where
        F: FnMut(&mut Document, NodeId) -> Result<()>,
    {
        for xpath in &self.xpaths {
            for element in elements_of(xpath, doc)? {
                visit(doc, element)?;
            }
        }
        Ok(())
    }
}

/// Evaluate one expression, requiring a list of elements
fn elements_of(xpath: &XPath, doc: &Document) -> Result<Vec<NodeId>> {
    let nodes = match xpath.evaluate(doc)? {
        XPathValue::NodeSet(nodes) => nodes,
        other => {
            return Err(Error::NotElements {
                expr: xpath.as_str().to_string(),
                got: format!("{} {:?}", other.type_name(), other.to_string_in(doc)),
            });
        }
    };
    if let Some(&bad) = nodes.iter().find(|&&n| !doc.is_element(n)) {
        let kind = doc
            .kind(bad)
            .map_or_else(|| "unknown node".to_string(), |k| format!("{k:?} node"));
        return Err(Error::NotElements {
            expr: xpath.as_str().to_string(),
            got: kind,
        });
    }
    if nodes.is_empty() {
        warn!("XPath expression {} yielded no results", xpath);
    }
    Ok(nodes)
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, xpath) in self.xpaths.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(xpath.as_str())?;
        }
        Ok(())
    }
}

/// Serialize every element matched by `selector`, joined by newlines.
///
/// `source` names the document in the not-found error.
pub fn extract_elements(doc: &Document, selector: &Selector, source: Option<&str>) -> Result<String> {
    let extracted: Vec<String> = selector
        .select(doc)?
        .into_iter()
        .map(|id| doc.serialize(id))
        .collect();
    if extracted.is_empty() {
        let source = source.map_or_else(|| "arch".to_string(), |name| format!("view {name}"));
        return Err(Error::NotFound(format!(
            "No elements found in {source} with xpaths: {selector}"
        )));
    }
    Ok(extracted.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_bad_expression_fails_at_construction() {
        let err = Selector::new(["//field", "//field[@name="]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
        assert!(Selector::new(Vec::<String>::new()).is_err());
    }

    #[test]
    fn test_select_flattens_in_declared_order() {
        let doc = Document::parse(r#"<form><a/><b/><a/></form>"#).unwrap();
        let selector = Selector::new(["//b", "//a"]).unwrap();
        let names: Vec<_> = selector
            .select(&doc)
            .unwrap()
            .into_iter()
            .map(|n| doc.node_name(n).unwrap_or("").to_string())
            .collect();
        assert_eq!(names, vec!["b", "a", "a"]);
    }

    #[test]
    fn test_non_node_results_are_rejected() {
        let doc = Document::parse("<form><a/></form>").unwrap();
        let err = Selector::single("count(//a)").unwrap().select(&doc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(err.to_string().contains("count(//a)"));
        let err = Selector::single("//a/@x | //b/@y").unwrap().select(&doc).unwrap_err();
        assert!(matches!(err, Error::NotElements { .. }));
    }

    #[test]
    fn test_text_nodes_are_rejected() {
        let doc = Document::parse("<form>hi</form>").unwrap();
        let err = Selector::single("//text()").unwrap().select(&doc).unwrap_err();
        assert!(matches!(err, Error::NotElements { .. }));
    }

    #[test]
    fn test_empty_match_is_not_an_error() {
        let doc = Document::parse("<form/>").unwrap();
        assert!(Selector::single("//missing").unwrap().select(&doc).unwrap().is_empty());
    }

    #[test]
    fn test_for_each_match_sees_previous_edits() {
        let mut doc = Document::parse("<form><a/></form>").unwrap();
        let selector = Selector::new(["//a", "//b"]).unwrap();
        let mut visited = Vec::new();
        selector
            .for_each_match(&mut doc, |doc, el| {
                visited.push(doc.node_name(el).unwrap_or("").to_string());
                if doc.node_name(el) == Some("a") {
                    let b = doc.create_element("b");
                    doc.append_child(el, b);
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(visited, vec!["a", "b"]);
    }

    #[test]
    fn test_extract_elements() {
        let doc = Document::parse(r#"<t><div id="f"><p>x</p></div><span/></t>"#).unwrap();
        let selector = Selector::new(["//div[@id='f']", "//span"]).unwrap();
        assert_eq!(
            extract_elements(&doc, &selector, None).unwrap(),
            "<div id=\"f\"><p>x</p></div>\n<span/>"
        );
        let missing = Selector::single("//nav").unwrap();
        let err = extract_elements(&doc, &missing, Some("website.footer")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("view website.footer"));
    }
}
