//! infobuf-compiler
//!
//! This crate implements:
//!  1) A lexer + parser for infobuf IDL sources (`info`, `struct`, `enum`,
//!     `union`, `namespace`, `Main`),
//!  2) A value parser that encodes the single JSON-like root value against
//!     the declared schema into a little-endian binary payload,
//!  3) End-of-parse verification (unresolved forward declarations, union
//!     members),
//!  4) A dynamic decoder from payloads back to JSON (`decode_buffer`),
//!  5) Error types (`InfoError`).

pub mod compiler;
pub mod error;
pub mod json;
pub mod lexer;
pub mod parser;
pub mod types;
pub mod utils;
pub mod verifier;

pub use compiler::compile_source;
pub use json::{decode_buffer, schema_json};
