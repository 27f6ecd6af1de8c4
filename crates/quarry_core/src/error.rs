//! Error types for the quarry analyzer.

use thiserror::Error;

/// All errors that can be produced while parsing or analyzing a module.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuarryError {
    /// The source text is not valid JavaScript for the requested grammar.
    #[error("SyntaxError: {message} ({line}:{column})")]
    SyntaxError {
        /// Human-readable description of the failure.
        message: String,
        /// 1-based line of the offending token.
        line: u32,
        /// 1-based column of the offending token.
        column: u32,
    },

    /// An operation was applied to a value of the wrong shape.
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Analyzer options could not be loaded or are inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// An internal analyzer error that should not occur in normal operation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl QuarryError {
    /// Build a [`QuarryError::SyntaxError`] at the given position.
    pub fn syntax(message: impl Into<String>, line: u32, column: u32) -> Self {
        QuarryError::SyntaxError {
            message: message.into(),
            line,
            column,
        }
    }
}

/// Convenient `Result` alias for fallible analyzer operations.
pub type QuarryResult<T> = Result<T, QuarryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_display_includes_position() {
        let err = QuarryError::syntax("unexpected token", 3, 14);
        assert_eq!(err.to_string(), "SyntaxError: unexpected token (3:14)");
    }

    #[test]
    fn test_type_error_display() {
        let err = QuarryError::TypeError("not a string".into());
        assert_eq!(err.to_string(), "TypeError: not a string");
    }
}
