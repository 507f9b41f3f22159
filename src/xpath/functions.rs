//! XPath 1.0 Functions
//!
//! Implements the XPath 1.0 core functions:
//!
//! Node Set Functions:
//! - position(), last(), count(), local-name(), namespace-uri(), name()
//!
//! String Functions:
//! - string(), concat(), starts-with(), contains(), substring(),
//!   substring-before(), substring-after(), string-length(),
//!   normalize-space(), translate()
//!
//! Boolean Functions:
//! - boolean(), not(), true(), false(), lang()
//!
//! Number Functions:
//! - number(), sum(), floor(), ceiling(), round()
//!
//! Extension functions (such as `hasclass()`) are looked up in a
//! [`FunctionTable`] attached to the expression.

use super::value::XPathValue;
use crate::dom::{Document, NodeId};
use std::collections::HashMap;
use std::fmt;

/// Signature of an extension function: document, context node, arguments
pub type ExtensionFn = fn(&Document, NodeId, &[XPathValue]) -> Result<XPathValue, String>;

const CORE_FUNCTIONS: &[&str] = &[
    "position",
    "last",
    "count",
    "local-name",
    "namespace-uri",
    "name",
    "id",
    "string",
    "concat",
    "starts-with",
    "contains",
    "substring",
    "substring-before",
    "substring-after",
    "string-length",
    "normalize-space",
    "translate",
    "boolean",
    "not",
    "true",
    "false",
    "lang",
    "number",
    "sum",
    "floor",
    "ceiling",
    "round",
];

/// Extension functions available to an expression
#[derive(Clone, Default)]
pub struct FunctionTable {
    functions: HashMap<String, ExtensionFn>,
}

impl FunctionTable {
    /// An empty table: only the core library is available
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the view-editing extensions (`hasclass`)
    pub fn standard() -> Self {
        let mut table = Self::new();
        table.register("hasclass", hasclass);
        table
    }

    /// Register (or replace) an extension function
    pub fn register(&mut self, name: &str, function: ExtensionFn) {
        self.functions.insert(name.to_string(), function);
    }

    /// Look up an extension function
    pub fn get(&self, name: &str) -> Option<ExtensionFn> {
        self.functions.get(name).copied()
    }

    /// True for core functions and registered extensions
    pub fn is_known(&self, name: &str) -> bool {
        CORE_FUNCTIONS.contains(&name) || self.functions.contains_key(name)
    }
}

impl fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("FunctionTable").field("functions", &names).finish()
    }
}

/// `hasclass(c1, c2, ...)`: the context node's class attribute contains
/// every argument as a whitespace-separated token
pub fn hasclass(doc: &Document, context: NodeId, args: &[XPathValue]) -> Result<XPathValue, String> {
    let classes = doc.get_attribute(context, "class").unwrap_or("");
    let has_all = args.iter().all(|arg| {
        let wanted = arg.to_string_in(doc);
        classes.split_whitespace().any(|c| c == wanted)
    });
    Ok(XPathValue::Boolean(has_all))
}

/// Evaluation context handed to function calls
pub struct CallContext<'a> {
    pub doc: &'a Document,
    pub node: NodeId,
    pub position: usize,
    pub size: usize,
    pub functions: &'a FunctionTable,
}

/// Evaluate a function call
pub fn call(name: &str, args: Vec<XPathValue>, ctx: &CallContext<'_>) -> Result<XPathValue, String> {
    let doc = ctx.doc;
    let context = ctx.node;
    match name {
        // Node Set Functions
        "position" => Ok(XPathValue::Number(ctx.position as f64)),
        "last" => Ok(XPathValue::Number(ctx.size as f64)),
        "count" => fn_count(args),
        "local-name" => fn_local_name(args, doc, context),
        "namespace-uri" => fn_namespace_uri(args),
        "name" => fn_name(args, doc, context),
        "id" => Err("id() is not supported: documents carry no DTD".to_string()),

        // String Functions
        "string" => fn_string(args, doc, context),
        "concat" => fn_concat(args, doc),
        "starts-with" => fn_starts_with(args, doc),
        "contains" => fn_contains(args, doc),
        "substring" => fn_substring(args, doc),
        "substring-before" => fn_substring_before(args, doc),
        "substring-after" => fn_substring_after(args, doc),
        "string-length" => fn_string_length(args, doc, context),
        "normalize-space" => fn_normalize_space(args, doc, context),
        "translate" => fn_translate(args, doc),

        // Boolean Functions
        "boolean" => fn_boolean(args),
        "not" => fn_not(args),
        "true" => Ok(XPathValue::Boolean(true)),
        "false" => Ok(XPathValue::Boolean(false)),
        "lang" => fn_lang(args, doc, context),

        // Number Functions
        "number" => fn_number(args, doc, context),
        "sum" => fn_sum(args, doc),
        "floor" => unary_number("floor", args, doc, f64::floor),
        "ceiling" => unary_number("ceiling", args, doc, f64::ceil),
        "round" => unary_number("round", args, doc, xpath_round),

        _ => match ctx.functions.get(name) {
            Some(function) => function(doc, context, &args),
            None => Err(format!("Unknown function: {}", name)),
        },
    }
}

// Node Set Functions

fn fn_count(args: Vec<XPathValue>) -> Result<XPathValue, String> {
    if args.len() != 1 {
        return Err("count() requires exactly 1 argument".to_string());
    }
    match &args[0] {
        XPathValue::NodeSet(nodes) => Ok(XPathValue::Number(nodes.len() as f64)),
        XPathValue::StringList(values) => Ok(XPathValue::Number(values.len() as f64)),
        _ => Err("count() argument must be a node-set".to_string()),
    }
}

/// The node a name function applies to: the context node or the first of
/// its node-set argument
fn name_target(fname: &str, args: &[XPathValue], context: NodeId) -> Result<Option<NodeId>, String> {
    match args.first() {
        None => Ok(Some(context)),
        Some(XPathValue::NodeSet(nodes)) => Ok(nodes.first().copied()),
        Some(_) => Err(format!("{fname}() argument must be a node-set")),
    }
}

fn fn_local_name(args: Vec<XPathValue>, doc: &Document, context: NodeId) -> Result<XPathValue, String> {
    let name = name_target("local-name", &args, context)?
        .and_then(|n| doc.node_local_name(n))
        .unwrap_or("");
    Ok(XPathValue::String(name.to_string()))
}

fn fn_namespace_uri(args: Vec<XPathValue>) -> Result<XPathValue, String> {
    if args.len() > 1 {
        return Err("namespace-uri() requires 0 or 1 arguments".to_string());
    }
    // names are never namespace-resolved
    Ok(XPathValue::String(String::new()))
}

fn fn_name(args: Vec<XPathValue>, doc: &Document, context: NodeId) -> Result<XPathValue, String> {
    let name = name_target("name", &args, context)?
        .and_then(|n| doc.node_name(n))
        .unwrap_or("");
    Ok(XPathValue::String(name.to_string()))
}

// String Functions

fn fn_string(args: Vec<XPathValue>, doc: &Document, context: NodeId) -> Result<XPathValue, String> {
    let value = match args.first() {
        None => doc.string_value(context),
        Some(arg) => arg.to_string_in(doc),
    };
    Ok(XPathValue::String(value))
}

fn fn_concat(args: Vec<XPathValue>, doc: &Document) -> Result<XPathValue, String> {
    if args.len() < 2 {
        return Err("concat() requires at least 2 arguments".to_string());
    }
    let result: String = args.iter().map(|a| a.to_string_in(doc)).collect();
    Ok(XPathValue::String(result))
}

fn two_strings(fname: &str, args: &[XPathValue], doc: &Document) -> Result<(String, String), String> {
    if args.len() != 2 {
        return Err(format!("{fname}() requires exactly 2 arguments"));
    }
    Ok((args[0].to_string_in(doc), args[1].to_string_in(doc)))
}

fn fn_starts_with(args: Vec<XPathValue>, doc: &Document) -> Result<XPathValue, String> {
    let (s, prefix) = two_strings("starts-with", &args, doc)?;
    Ok(XPathValue::Boolean(s.starts_with(&prefix)))
}

fn fn_contains(args: Vec<XPathValue>, doc: &Document) -> Result<XPathValue, String> {
    let (s, pattern) = two_strings("contains", &args, doc)?;
    Ok(XPathValue::Boolean(s.contains(&pattern)))
}

fn fn_substring(args: Vec<XPathValue>, doc: &Document) -> Result<XPathValue, String> {
    if args.len() < 2 || args.len() > 3 {
        return Err("substring() requires 2 or 3 arguments".to_string());
    }

    let s = args[0].to_string_in(doc);
    let chars: Vec<char> = s.chars().collect();
    // XPath positions are 1-based and rounded
    let start = xpath_round(args[1].to_number_in(doc));
    let end = match args.get(2) {
        Some(len) => start + xpath_round(len.to_number_in(doc)),
        None => f64::INFINITY,
    };
    if start.is_nan() || end.is_nan() {
        return Ok(XPathValue::String(String::new()));
    }

    let result: String = chars
        .iter()
        .enumerate()
        .filter(|(i, _)| {
            let pos = (*i + 1) as f64;
            pos >= start && pos < end
        })
        .map(|(_, c)| *c)
        .collect();
    Ok(XPathValue::String(result))
}

fn fn_substring_before(args: Vec<XPathValue>, doc: &Document) -> Result<XPathValue, String> {
    let (s, pattern) = two_strings("substring-before", &args, doc)?;
    let result = s.find(&pattern).map(|pos| s[..pos].to_string()).unwrap_or_default();
    Ok(XPathValue::String(result))
}

fn fn_substring_after(args: Vec<XPathValue>, doc: &Document) -> Result<XPathValue, String> {
    let (s, pattern) = two_strings("substring-after", &args, doc)?;
    let result = s
        .find(&pattern)
        .map(|pos| s[pos + pattern.len()..].to_string())
        .unwrap_or_default();
    Ok(XPathValue::String(result))
}

fn fn_string_length(args: Vec<XPathValue>, doc: &Document, context: NodeId) -> Result<XPathValue, String> {
    if args.len() > 1 {
        return Err("string-length() requires 0 or 1 arguments".to_string());
    }
    let s = match args.first() {
        None => doc.string_value(context),
        Some(arg) => arg.to_string_in(doc),
    };
    Ok(XPathValue::Number(s.chars().count() as f64))
}

fn fn_normalize_space(args: Vec<XPathValue>, doc: &Document, context: NodeId) -> Result<XPathValue, String> {
    let s = match args.as_slice() {
        [] => doc.string_value(context),
        [arg] => arg.to_string_in(doc),
        _ => return Err("normalize-space() requires 0 or 1 arguments".to_string()),
    };
    let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
    Ok(XPathValue::String(normalized))
}

fn fn_translate(args: Vec<XPathValue>, doc: &Document) -> Result<XPathValue, String> {
    if args.len() != 3 {
        return Err("translate() requires exactly 3 arguments".to_string());
    }

    let s = args[0].to_string_in(doc);
    let from: Vec<char> = args[1].to_string_in(doc).chars().collect();
    let to: Vec<char> = args[2].to_string_in(doc).chars().collect();

    let result: String = s
        .chars()
        .filter_map(|c| match from.iter().position(|&fc| fc == c) {
            Some(pos) => to.get(pos).copied(),
            None => Some(c),
        })
        .collect();

    Ok(XPathValue::String(result))
}

// Boolean Functions

fn fn_boolean(args: Vec<XPathValue>) -> Result<XPathValue, String> {
    if args.len() != 1 {
        return Err("boolean() requires exactly 1 argument".to_string());
    }
    Ok(XPathValue::Boolean(args[0].to_boolean()))
}

fn fn_not(args: Vec<XPathValue>) -> Result<XPathValue, String> {
    if args.len() != 1 {
        return Err("not() requires exactly 1 argument".to_string());
    }
    Ok(XPathValue::Boolean(!args[0].to_boolean()))
}

fn fn_lang(args: Vec<XPathValue>, doc: &Document, context: NodeId) -> Result<XPathValue, String> {
    if args.len() != 1 {
        return Err("lang() requires exactly 1 argument".to_string());
    }
    let target_lang = args[0].to_string_in(doc).to_lowercase();

    // Nearest xml:lang on the ancestor-or-self chain decides
    let mut node = Some(context);
    while let Some(current) = node {
        if let Some(lang_val) = doc.get_attribute(current, "xml:lang") {
            let lang_lower = lang_val.to_lowercase();
            let matched = lang_lower == target_lang
                || (lang_lower.starts_with(&target_lang)
                    && lang_lower.as_bytes().get(target_lang.len()) == Some(&b'-'));
            return Ok(XPathValue::Boolean(matched));
        }
        node = doc.parent_of(current);
    }
    Ok(XPathValue::Boolean(false))
}

// Number Functions

fn fn_number(args: Vec<XPathValue>, doc: &Document, context: NodeId) -> Result<XPathValue, String> {
    let value = match args.as_slice() {
        [] => XPathValue::single_node(context).to_number_in(doc),
        [arg] => arg.to_number_in(doc),
        _ => return Err("number() requires 0 or 1 arguments".to_string()),
    };
    Ok(XPathValue::Number(value))
}

fn fn_sum(args: Vec<XPathValue>, doc: &Document) -> Result<XPathValue, String> {
    if args.len() != 1 {
        return Err("sum() requires exactly 1 argument".to_string());
    }

    let strings: Vec<String> = match &args[0] {
        XPathValue::NodeSet(nodes) => nodes.iter().map(|&n| doc.string_value(n)).collect(),
        XPathValue::StringList(values) => values.clone(),
        _ => return Err("sum() argument must be a node-set".to_string()),
    };
    let total = strings
        .iter()
        .map(|s| s.trim().parse::<f64>().unwrap_or(f64::NAN))
        .sum();
    Ok(XPathValue::Number(total))
}

fn unary_number(
    fname: &str,
    args: Vec<XPathValue>,
    doc: &Document,
    f: fn(f64) -> f64,
) -> Result<XPathValue, String> {
    if args.len() != 1 {
        return Err(format!("{fname}() requires exactly 1 argument"));
    }
    Ok(XPathValue::Number(f(args[0].to_number_in(doc))))
}

/// XPath round: .5 rounds towards positive infinity
fn xpath_round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        n
    } else {
        (n + 0.5).floor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call_on(doc: &Document, node: NodeId, name: &str, args: Vec<XPathValue>) -> XPathValue {
        let functions = FunctionTable::standard();
        let ctx = CallContext {
            doc,
            node,
            position: 1,
            size: 1,
            functions: &functions,
        };
        call(name, args, &ctx).unwrap()
    }

    fn s(v: &str) -> XPathValue {
        XPathValue::String(v.to_string())
    }

    #[test]
    fn test_concat() {
        let doc = Document::parse("<r/>").unwrap();
        let result = call_on(&doc, 1, "concat", vec![s("hello"), s(" "), s("world")]);
        assert_eq!(result, s("hello world"));
    }

    #[test]
    fn test_contains() {
        let doc = Document::parse("<r/>").unwrap();
        assert!(call_on(&doc, 1, "contains", vec![s("hello world"), s("world")]).to_boolean());
    }

    #[test]
    fn test_substring() {
        let doc = Document::parse("<r/>").unwrap();
        let args = vec![s("hello"), XPathValue::Number(2.0), XPathValue::Number(3.0)];
        assert_eq!(call_on(&doc, 1, "substring", args), s("ell"));
        let args = vec![s("12345"), XPathValue::Number(1.5), XPathValue::Number(2.6)];
        assert_eq!(call_on(&doc, 1, "substring", args), s("234"));
    }

    #[test]
    fn test_normalize_space() {
        let doc = Document::parse("<r/>").unwrap();
        let result = call_on(&doc, 1, "normalize-space", vec![s("  hello   world  ")]);
        assert_eq!(result, s("hello world"));
    }

    #[test]
    fn test_id_returns_explicit_error() {
        let doc = Document::parse("<r/>").unwrap();
        let functions = FunctionTable::new();
        let ctx = CallContext {
            doc: &doc,
            node: 1,
            position: 1,
            size: 1,
            functions: &functions,
        };
        let err = call("id", vec![s("foo")], &ctx).unwrap_err();
        assert!(err.contains("not supported"));
    }

    #[test]
    fn test_lang_matches_subtag_prefix() {
        let doc = Document::parse("<root xml:lang=\"en-US\"><child/></root>").unwrap();
        let root = doc.root_element_id().unwrap();
        let child = doc.children_vec(root)[0];
        assert!(call_on(&doc, child, "lang", vec![s("en")]).to_boolean());
        assert!(!call_on(&doc, child, "lang", vec![s("fr")]).to_boolean());
    }

    #[test]
    fn test_hasclass_requires_every_token() {
        let doc = Document::parse(r#"<div class="panel  panel-default"/>"#).unwrap();
        let div = doc.root_element_id().unwrap();
        assert!(call_on(&doc, div, "hasclass", vec![s("panel")]).to_boolean());
        assert!(call_on(&doc, div, "hasclass", vec![s("panel"), s("panel-default")]).to_boolean());
        assert!(!call_on(&doc, div, "hasclass", vec![s("panel-def")]).to_boolean());
        assert!(!call_on(&doc, div, "hasclass", vec![s("panel"), s("well")]).to_boolean());
    }

    #[test]
    fn test_unknown_function_without_extension() {
        let doc = Document::parse("<r/>").unwrap();
        let functions = FunctionTable::new();
        let ctx = CallContext {
            doc: &doc,
            node: 1,
            position: 1,
            size: 1,
            functions: &functions,
        };
        assert!(call("hasclass", vec![s("x")], &ctx).is_err());
        assert!(!functions.is_known("hasclass"));
        assert!(FunctionTable::standard().is_known("hasclass"));
        assert!(functions.is_known("normalize-space"));
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(xpath_round(2.5), 3.0);
        assert_eq!(xpath_round(-2.5), -2.0);
        assert_eq!(xpath_round(1.4), 1.0);
    }
}
