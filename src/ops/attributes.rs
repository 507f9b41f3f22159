//! Attribute and text editing operations

use super::{ArchLookup, ViewOperation};
use crate::dom::Document;
use crate::error::{Error, Result};
use crate::selector::Selector;
use bitflags::bitflags;
use log::warn;
use regex::Regex;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Rename the `name` attribute of matched elements, following labels that
/// point at them through `for`
#[derive(Debug, Clone)]
pub struct RenameElements {
    selector: Selector,
    old: String,
    new: String,
}

impl RenameElements {
    /// Rename on any element
    pub fn new(old: &str, new: &str) -> Result<Self> {
        Self::within("//*", old, new)
    }

    /// Rename on elements matched by `xpath`
    pub fn within(xpath: &str, old: &str, new: &str) -> Result<Self> {
        let named = format!(r#"{xpath}[@name="{old}"]"#);
        let selector = Selector::single(&format!(r#"{named} | {named}/../label[@for="{old}"]"#))?;
        Ok(RenameElements {
            selector,
            old: old.to_string(),
            new: new.to_string(),
        })
    }
}

impl ViewOperation for RenameElements {
    fn apply(&self, doc: &mut Document, _lookup: Option<&dyn ArchLookup>) -> Result<()> {
        self.selector.for_each_match(doc, |doc, el| {
            let attr = if doc.node_name(el) == Some("label") { "for" } else { "name" };
            doc.set_attribute(el, attr, self.new.as_str());
            Ok(())
        })
    }
}

impl fmt::Display for RenameElements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Update `name` attribute: `{}` -> `{}` (XPath(s): `{}`)",
            self.old, self.new, self.selector
        )
    }
}

/// Set attributes on matched elements; a `None` value deletes the attribute
#[derive(Debug, Clone)]
pub struct UpdateAttributes {
    selector: Selector,
    attributes: Vec<(String, Option<String>)>,
}

impl UpdateAttributes {
    pub fn new<I, S, A, K, V>(xpaths: I, attributes: A) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        A: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        let attributes: Vec<(String, Option<String>)> = attributes
            .into_iter()
            .map(|(k, v)| (k.into(), v.map(Into::into)))
            .collect();
        if attributes.is_empty() {
            return Err(Error::InvalidArgument("Must provide at least one attribute".to_string()));
        }
        Ok(UpdateAttributes {
            selector: Selector::new(xpaths)?,
            attributes,
        })
    }
}

impl ViewOperation for UpdateAttributes {
    fn apply(&self, doc: &mut Document, _lookup: Option<&dyn ArchLookup>) -> Result<()> {
        self.selector.for_each_match(doc, |doc, el| {
            for (name, value) in &self.attributes {
                match value {
                    Some(value) => doc.set_attribute(el, name, value.as_str()),
                    None => {
                        if doc.remove_attribute(el, name).is_none() {
                            warn!("No attribute '{name}' was available to delete");
                        }
                    }
                }
            }
            Ok(())
        })
    }
}

impl fmt::Display for UpdateAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Update attributes: `{")?;
        for (i, (name, value)) in self.attributes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match value {
                Some(value) => write!(f, "'{name}': '{value}'")?,
                None => write!(f, "'{name}': None")?,
            }
        }
        write!(f, "}}` (XPath(s): `{}`)", self.selector)
    }
}

bitflags! {
    /// Where `ReplaceValue` searches
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ReplacePosition: u8 {
        /// Every attribute value
        const ATTRIBUTES = 1 << 0;
        /// The leading text of the element
        const TEXT = 1 << 1;
        const ANY = Self::ATTRIBUTES.bits() | Self::TEXT.bits();
    }
}

impl Default for ReplacePosition {
    fn default() -> Self {
        ReplacePosition::ATTRIBUTES
    }
}

impl FromStr for ReplacePosition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ATTRIBUTES" => Ok(ReplacePosition::ATTRIBUTES),
            "TEXT" => Ok(ReplacePosition::TEXT),
            "ANY" => Ok(ReplacePosition::ANY),
            _ => Err(Error::InvalidArgument(format!(
                "\"position\" must be one of ATTRIBUTES,TEXT,ANY, got \"{s}\""
            ))),
        }
    }
}

/// What `ReplaceValue` looks for
#[derive(Debug, Clone)]
pub enum ReplacePattern {
    /// Every occurrence of a substring
    Literal(String),
    /// Every match of a regex; the replacement may use `$1`/`${name}`
    Regex(Regex),
}

impl ReplacePattern {
    /// Compile a regex pattern
    pub fn regex(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(ReplacePattern::Regex)
            .map_err(|e| Error::InvalidArgument(format!("Invalid regex `{pattern}`: {e}")))
    }

    /// Replaced value, or `None` when `value` is empty or has no match
    fn replace<'v>(&self, value: &'v str, repl: &str) -> Option<Cow<'v, str>> {
        if value.is_empty() {
            return None;
        }
        match self {
            ReplacePattern::Literal(pattern) => {
                (!pattern.is_empty() && value.contains(pattern.as_str()))
                    .then(|| Cow::Owned(value.replace(pattern.as_str(), repl)))
            }
            ReplacePattern::Regex(re) => re.is_match(value).then(|| re.replace_all(value, repl)),
        }
    }
}

impl From<&str> for ReplacePattern {
    fn from(pattern: &str) -> Self {
        ReplacePattern::Literal(pattern.to_string())
    }
}

impl From<Regex> for ReplacePattern {
    fn from(re: Regex) -> Self {
        ReplacePattern::Regex(re)
    }
}

impl fmt::Display for ReplacePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplacePattern::Literal(pattern) => f.write_str(pattern),
            ReplacePattern::Regex(re) => write!(f, "re({})", re.as_str()),
        }
    }
}

/// Search and replace in attribute values and/or text of matched elements
#[derive(Debug, Clone)]
pub struct ReplaceValue {
    pattern: ReplacePattern,
    repl: String,
    selector: Selector,
    position: ReplacePosition,
}

impl ReplaceValue {
    /// Replace in the attributes of every element
    pub fn new(pattern: impl Into<ReplacePattern>, repl: &str) -> Result<Self> {
        Ok(ReplaceValue {
            pattern: pattern.into(),
            repl: repl.to_string(),
            selector: Selector::single("//*")?,
            position: ReplacePosition::default(),
        })
    }

    /// Restrict to elements matched by `xpaths`
    pub fn with_xpaths<I, S>(mut self, xpaths: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.selector = Selector::new(xpaths)?;
        Ok(self)
    }

    pub fn with_position(mut self, position: ReplacePosition) -> Self {
        self.position = position;
        self
    }
}

impl ViewOperation for ReplaceValue {
    fn apply(&self, doc: &mut Document, _lookup: Option<&dyn ArchLookup>) -> Result<()> {
        self.selector.for_each_match(doc, |doc, el| {
            if self.position.contains(ReplacePosition::ATTRIBUTES) {
                let replaced: Vec<(String, String)> = doc
                    .attributes(el)
                    .iter()
                    .filter_map(|a| {
                        self.pattern
                            .replace(&a.value, &self.repl)
                            .map(|v| (a.name.clone(), v.into_owned()))
                    })
                    .collect();
                for (name, value) in replaced {
                    doc.set_attribute(el, &name, value);
                }
            }
            if self.position.contains(ReplacePosition::TEXT) {
                let text = doc.text(el).unwrap_or_default();
                if let Some(value) = self.pattern.replace(&text, &self.repl) {
                    let value = value.into_owned();
                    doc.set_text(el, Some(&value));
                }
            }
            Ok(())
        })
    }
}

impl fmt::Display for ReplaceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Replace all variables matching `{}` with `{}` (XPath(s): `{}`)",
            self.pattern, self.repl, self.selector
        )
    }
}
