//! `quarry_core`: static analysis of JavaScript modules for a bundler.
//!
//! # Crate layout
//!
//! - [`parser`]: the JavaScript scanner, syntax tree and parser.
//! - [`analyzer`]: scope tracking, partial evaluation and the hook-driven
//!   three-phase walker.
//! - [`error`]: the crate-wide error type.
//!
//! The usual entry point is [`Analyzer`]: register handlers on its
//! [`AnalyzerHooks`], then feed it module sources with [`Analyzer::parse`].

/// Scope tracking, partial evaluation and the AST walker.
pub mod analyzer;
/// Error types.
pub mod error;
/// JavaScript scanner, syntax tree and parser.
pub mod parser;

pub use analyzer::{
    Analyzer, AnalyzerHooks, AnalyzerOptions, EvaluatedExpression, EvaluatedKind, Walker,
};
pub use error::{QuarryError, QuarryResult};
