//! Core markup parsing primitives
//!
//! - Scanner: memchr-backed delimiter detection
//! - Entities: entity decoding and escaping with Cow (zero-copy when possible)
//! - Attributes: attribute parsing for XML and lenient HTML

pub mod attributes;
pub mod entities;
pub mod scanner;
