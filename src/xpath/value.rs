//! Values an expression evaluates to
//!
//! Besides the four XPath 1.0 types, attribute steps yield a `StringList`
//! of attribute values in document order. It tests and compares like a
//! node-set: true when non-empty, equal when any member is.

use crate::dom::{Document, NodeId};

#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum XPathValue {
    /// Nodes in document order, without duplicates
    NodeSet(Vec<NodeId>),
    Boolean(bool),
    Number(f64),
    String(String),
    StringList(Vec<String>),
}

impl Default for XPathValue {
    fn default() -> Self {
        XPathValue::NodeSet(Vec::new())
    }
}

impl XPathValue {
    pub fn empty_nodeset() -> Self {
        Self::default()
    }

    pub fn single_node(id: NodeId) -> Self {
        XPathValue::NodeSet(vec![id])
    }

    /// `boolean()`
    pub fn to_boolean(&self) -> bool {
        match self {
            XPathValue::NodeSet(nodes) => !nodes.is_empty(),
            XPathValue::StringList(values) => !values.is_empty(),
            XPathValue::Boolean(b) => *b,
            XPathValue::Number(n) => !(n.is_nan() || *n == 0.0),
            XPathValue::String(s) => !s.is_empty(),
        }
    }

    /// `number()`; node-sets go through their string-value in `doc`
    pub fn to_number_in(&self, doc: &Document) -> f64 {
        match self {
            XPathValue::Number(n) => *n,
            XPathValue::Boolean(b) => f64::from(u8::from(*b)),
            XPathValue::String(s) => parse_number(s),
            XPathValue::StringList(values) => values.first().map_or(f64::NAN, |v| parse_number(v)),
            XPathValue::NodeSet(_) => parse_number(&self.to_string_in(doc)),
        }
    }

    /// `string()`; a node-set converts through its first node
    pub fn to_string_in(&self, doc: &Document) -> String {
        match self {
            XPathValue::String(s) => s.clone(),
            XPathValue::Number(n) => format_number(*n),
            XPathValue::Boolean(b) => b.to_string(),
            XPathValue::StringList(values) => values.first().cloned().unwrap_or_default(),
            XPathValue::NodeSet(nodes) => nodes.first().map(|&n| doc.string_value(n)).unwrap_or_default(),
        }
    }

    pub fn as_nodeset(&self) -> Option<&Vec<NodeId>> {
        match self {
            XPathValue::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }

    pub fn into_nodeset(self) -> Option<Vec<NodeId>> {
        match self {
            XPathValue::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }

    /// Name used in type errors
    pub fn type_name(&self) -> &'static str {
        match self {
            XPathValue::NodeSet(_) => "node-set",
            XPathValue::StringList(_) => "attribute values",
            XPathValue::Boolean(_) => "boolean",
            XPathValue::Number(_) => "number",
            XPathValue::String(_) => "string",
        }
    }
}

fn parse_number(s: &str) -> f64 {
    s.trim().parse().unwrap_or(f64::NAN)
}

/// Integral numbers print without a fraction, as in `3` rather than `3.0`
fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
