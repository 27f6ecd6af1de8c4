//! JavaScript front end.
//!
//! - [`scanner`]: lexer that converts raw source text into a stream of
//!   [`scanner::Token`]s, comments included.
//! - [`ast`]: ESTree-shaped syntax tree node definitions.
//! - [`parse`]: recursive-descent parser that also reports comments and
//!   automatic-semicolon positions.

/// Syntax tree node types.
pub mod ast;
/// Recursive-descent parser.
pub mod parse;
/// JavaScript lexer.
pub mod scanner;

pub use parse::{parse, parse_expression, Comment, CommentKind, ParseOutput};
