//! Deterministic encoding of export documents.
//!
//! Exports must be byte-identical for identical input, so every document
//! is built from ordered types (`BTreeMap`, `Vec`) and written with:
//! - 2-space indentation for JSON
//! - A trailing newline
//! - UTF-8 without BOM

mod json;

pub use json::*;
