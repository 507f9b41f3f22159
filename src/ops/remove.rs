//! Element removal operations

use super::{join_display, ArchLookup, ViewOperation};
use crate::dom::Document;
use crate::error::Result;
use crate::selector::Selector;
use std::fmt;

/// Remove every matched element (with its trailing text)
#[derive(Debug, Clone)]
pub struct RemoveElements {
    selector: Selector,
}

impl RemoveElements {
    pub fn new<I, S>(xpaths: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(RemoveElements {
            selector: Selector::new(xpaths)?,
        })
    }
}

impl ViewOperation for RemoveElements {
    fn apply(&self, doc: &mut Document, _lookup: Option<&dyn ArchLookup>) -> Result<()> {
        self.selector.for_each_match(doc, |doc, el| {
            doc.detach(el);
            Ok(())
        })
    }
}

impl fmt::Display for RemoveElements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Remove all elements matching XPath(s) `{}`", self.selector)
    }
}

/// Remove every `<field>` with one of the given names
#[derive(Debug, Clone)]
pub struct RemoveFields {
    names: Vec<String>,
    inner: RemoveElements,
}

impl RemoveFields {
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = names.into_iter().map(|n| n.as_ref().to_string()).collect();
        let xpaths: Vec<String> = names
            .iter()
            .map(|name| format!(r#"//field[@name="{name}"]"#))
            .collect();
        Ok(RemoveFields {
            inner: RemoveElements::new(xpaths)?,
            names,
        })
    }
}

impl ViewOperation for RemoveFields {
    fn apply(&self, doc: &mut Document, lookup: Option<&dyn ArchLookup>) -> Result<()> {
        self.inner.apply(doc, lookup)
    }
}

impl fmt::Display for RemoveFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Remove all fields with name(s) `{}`", join_display(&self.names))
    }
}
