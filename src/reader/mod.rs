//! Pull-style markup reader
//!
//! `SliceReader` turns a string into a stream of `XmlEvent`s, either
//! strictly (XML) or leniently (HTML, no structural checks).

pub mod events;
pub mod slice;

pub use events::{StartElement, XmlEvent};
pub use slice::SliceReader;
