//! DOM Module - Arena-based mutable document
//!
//! - Arena allocation for nodes, `NodeId` (u32) links
//! - Strict XML and lenient HTML parsing
//! - In-place editing with element text/tail semantics
//! - XML/HTML serialization and re-indentation

pub mod document;
pub mod node;
pub mod serialize;

pub use document::{Document, DocumentMode, DOCUMENT_NODE, FRAGMENT_WRAPPER};
pub use node::{NodeId, NodeKind, XmlNode};
