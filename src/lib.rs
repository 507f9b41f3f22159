//! viewpatch - XPath-driven editing of stored view archs
//!
//! Layers:
//! - `core`, `reader`, `dom`: markup scanning, pull reader and a mutable
//!   arena tree with element text/tail
//! - `xpath`: XPath 1.0 engine with per-expression extension functions
//! - `selector`, `ops`: edit operations over the matches of XPaths
//! - `store`, `resolve`, `batch`: view lookup, copy-on-write website
//!   copies and fail-fast batch editing
//! - `bootstrap`, `html_fields`: Bootstrap 3 to 4 conversion of views and
//!   stored HTML
//! - `refactor`, `report`, `config`: rename follow-ups, operation reports
//!   and options
//!
//! ```
//! use viewpatch::dom::Document;
//! use viewpatch::ops::{op, apply_all, RemoveFields};
//!
//! let mut doc = Document::parse(r#"<form><field name="a"/><field name="b"/></form>"#).unwrap();
//! apply_all(&[op(RemoveFields::new(["a"]).unwrap())], &mut doc, None).unwrap();
//! assert_eq!(doc.to_string(), r#"<form><field name="b"/></form>"#);
//! ```

pub mod batch;
pub mod bootstrap;
pub mod config;
pub mod core;
pub mod dom;
pub mod error;
pub mod html_fields;
pub mod ops;
pub mod reader;
pub mod refactor;
pub mod report;
pub mod resolve;
pub mod selector;
pub mod store;
pub mod xpath;

pub use error::{Error, ErrorKind, Result};
