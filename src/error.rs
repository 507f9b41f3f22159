//! Error types for view editing and conversion.
//!
//! Low-level parsing layers report plain `String` diagnostics; they are
//! wrapped into these variants at the point where the offending expression
//! or input is known.

use thiserror::Error;

/// Broad failure category, stable enough for callers to match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad XPath, XML, CSS selector, reference format or arguments.
    Malformed,
    /// Missing document, template, destination node or extracted content.
    NotFound,
    /// Conflicting or inconsistent state.
    Ambiguous,
    /// The API was driven in a way it does not support.
    Usage,
    /// Filesystem errors.
    Io,
}

/// Error types for view operations.
#[derive(Error, Debug)]
pub enum Error {
    /// XPath expression failed to compile.
    #[error("Invalid XPath expression `{expr}`: {reason}")]
    XPathSyntax { expr: String, reason: String },

    /// XPath expression failed while being evaluated.
    #[error("Failed evaluating XPath `{expr}`: {reason}")]
    XPathEval { expr: String, reason: String },

    /// XPath produced something other than a list of elements.
    #[error("XPath `{expr}` must yield elements, got {got}")]
    NotElements { expr: String, got: String },

    /// Input text is not well-formed XML.
    #[error("Invalid XML: {0}")]
    XmlSyntax(String),

    /// CSS selector uses syntax outside the supported subset.
    #[error("Unsupported CSS selector syntax: {0}")]
    UnsupportedSelector(String),

    /// A document reference could not be interpreted.
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// Operation constructed with unusable arguments.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration text could not be loaded.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Something that had to exist does not.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Data is inconsistent with what the caller asked for.
    #[error("Inconsistent state: {0}")]
    Ambiguous(String),

    /// The API was used incorrectly.
    #[error("Usage error: {0}")]
    Usage(String),

    /// A bulk HTML conversion failed on one record.
    #[error("Failed converting html {model}.{field} for record id={id}")]
    HtmlConversion {
        model: String,
        field: String,
        id: i64,
        #[source]
        source: Box<Error>,
    },

    /// Low-level I/O error from std::io.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::XPathSyntax { .. }
            | Error::XmlSyntax(_)
            | Error::UnsupportedSelector(_)
            | Error::InvalidReference(_)
            | Error::InvalidArgument(_)
            | Error::Config(_) => ErrorKind::Malformed,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Ambiguous(_) => ErrorKind::Ambiguous,
            Error::XPathEval { .. } | Error::NotElements { .. } | Error::Usage(_) => {
                ErrorKind::Usage
            }
            Error::HtmlConversion { source, .. } => source.kind(),
            Error::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn xpath_syntax(expr: &str, reason: impl Into<String>) -> Self {
        Error::XPathSyntax {
            expr: expr.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn xpath_eval(expr: &str, reason: impl Into<String>) -> Self {
        Error::XPathEval {
            expr: expr.to_string(),
            reason: reason.into(),
        }
    }
}

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;
