//! Parsers for backend payloads.

pub mod document;

pub use document::{decode_document, encode_document};
