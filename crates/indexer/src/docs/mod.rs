//! Structured documentation of a single symbol.

pub mod annotate;
pub mod extract;
pub mod lexer;
pub mod oracle;
pub mod sections;
pub mod types;
