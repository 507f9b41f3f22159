//! XPath 1.0 Engine
//!
//! - All 13 axes, per-step predicates, unions and filter expressions
//! - The XPath 1.0 core functions plus per-expression extensions
//! - Compiled expression caching
//!
//! ```
//! use viewpatch::dom::Document;
//! use viewpatch::xpath::XPath;
//!
//! let doc = Document::parse(r#"<form><field name="x"/></form>"#).unwrap();
//! let xpath = XPath::new("//field[@name='x']").unwrap();
//! assert_eq!(xpath.evaluate(&doc).unwrap().as_nodeset().map(Vec::len), Some(1));
//! ```

pub mod axes;
pub mod cache;
pub mod compiler;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod value;

pub use functions::{ExtensionFn, FunctionTable};
pub use value::XPathValue;

use crate::dom::{Document, NodeId, DOCUMENT_NODE};
use crate::error::{Error, Result};
use compiler::CompiledExpr;
use eval::{evaluate_compiled, EvalContext};
use std::fmt;
use std::sync::Arc;

/// A compiled XPath expression together with its extension functions
#[derive(Clone)]
pub struct XPath {
    source: String,
    compiled: Arc<CompiledExpr>,
    functions: Arc<FunctionTable>,
}

impl XPath {
    /// Compile an expression with the standard extensions (`hasclass`)
    pub fn new(xpath: &str) -> Result<Self> {
        Self::with_functions(xpath, Arc::new(FunctionTable::standard()))
    }

    /// Compile an expression against a custom extension table.
    ///
    /// Calls to functions that are neither core nor in `functions` are
    /// rejected here rather than at evaluation time.
    pub fn with_functions(xpath: &str, functions: Arc<FunctionTable>) -> Result<Self> {
        let compiled = cache::get_or_compile(xpath).map_err(|e| Error::xpath_syntax(xpath, e))?;
        if let Some(unknown) = compiled.function_names().into_iter().find(|f| !functions.is_known(f)) {
            return Err(Error::xpath_syntax(xpath, format!("Unknown function: {unknown}")));
        }
        Ok(XPath {
            source: xpath.to_string(),
            compiled,
            functions,
        })
    }

    /// The expression text
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Evaluate with the root element as context node
    pub fn evaluate(&self, doc: &Document) -> Result<XPathValue> {
        let context = doc.root_element_id().unwrap_or(DOCUMENT_NODE);
        self.evaluate_from(doc, context)
    }

    /// Evaluate from a specific context node
    pub fn evaluate_from(&self, doc: &Document, context: NodeId) -> Result<XPathValue> {
        let order = doc.document_order();
        let ctx = EvalContext {
            doc,
            node: context,
            position: 1,
            size: 1,
            order: &order,
            functions: &self.functions,
        };
        evaluate_compiled(&self.compiled, &ctx).map_err(|e| Error::xpath_eval(&self.source, e))
    }
}

impl fmt::Debug for XPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("XPath").field(&self.source).finish()
    }
}

impl fmt::Display for XPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
