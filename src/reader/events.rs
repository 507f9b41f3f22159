//! Markup Event Types
//!
//! Event types for pull-parser style processing. Text is already
//! entity-decoded; names are as written (lower-cased in HTML mode).

use crate::core::attributes::Attribute;
use std::borrow::Cow;

/// Parsing event
#[derive(Debug, Clone, PartialEq)]
pub enum XmlEvent<'a> {
    /// Start of an element: <name attrs...>
    StartElement(StartElement<'a>),
    /// End of an element: </name>
    EndElement(Cow<'a, str>),
    /// Empty element: <name attrs.../> (or an HTML void element)
    EmptyElement(StartElement<'a>),
    /// Text content between tags
    Text(Cow<'a, str>),
    /// CDATA section content
    CData(&'a str),
    /// Comment content
    Comment(&'a str),
    /// Processing instruction: <?target data?>
    ProcessingInstruction { target: &'a str, data: &'a str },
    /// XML declaration: <?xml version="1.0"?>
    XmlDeclaration,
    /// DOCTYPE declaration
    DocType(&'a str),
}

/// Start element event data
#[derive(Debug, Clone, PartialEq)]
pub struct StartElement<'a> {
    pub name: Cow<'a, str>,
    pub attributes: Vec<Attribute>,
}

impl<'a> StartElement<'a> {
    pub fn new(name: Cow<'a, str>, attributes: Vec<Attribute>) -> Self {
        StartElement { name, attributes }
    }

    /// Get an attribute value by name
    pub fn get_attribute_value(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }
}
