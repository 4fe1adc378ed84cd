//! Query errors
//!
//! Every failure in the engine surfaces as a [`QueryError`]. Value-level
//! anomalies (non-numeric text used as a number, an empty node-set used as a
//! string) are not errors and produce NaN or the empty string instead.

use thiserror::Error;

/// Errors raised while parsing, compiling or evaluating a query.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Lexical or grammatical failure. Line and column are 1-based.
    #[error("parse error at {line}:{column}: {message}")]
    Parse {
        message: String,
        line: u32,
        column: u32,
    },

    #[error("unbound variable: ${name}")]
    UnboundVariable { name: String },

    /// An axis, function, pseudo-class or combinator the engine does not implement.
    #[error("unsupported feature: {name}")]
    UnsupportedFeature { name: String },

    /// A value could not be used where a node-set is required.
    #[error("type error: expected {expected}, found {found}")]
    TypeCoercion {
        expected: &'static str,
        found: &'static str,
    },

    #[error("invalid arguments to {function}(): {message}")]
    InvalidArguments { function: String, message: String },
}

impl QueryError {
    pub(crate) fn parse(message: impl Into<String>, line: u32, column: u32) -> Self {
        QueryError::Parse {
            message: message.into(),
            line,
            column,
        }
    }

    pub(crate) fn unsupported(name: impl Into<String>) -> Self {
        let name = name.into();
        log::debug!("unsupported query feature: {}", name);
        QueryError::UnsupportedFeature { name }
    }

    pub(crate) fn arguments(function: &str, message: impl Into<String>) -> Self {
        QueryError::InvalidArguments {
            function: function.to_string(),
            message: message.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_display_includes_position() {
        let err = QueryError::parse("unterminated string literal", 1, 7);
        assert_eq!(
            err.to_string(),
            "parse error at 1:7: unterminated string literal"
        );
    }

    #[test]
    fn unbound_variable_display() {
        let err = QueryError::UnboundVariable {
            name: "missing".to_string(),
        };
        assert_eq!(err.to_string(), "unbound variable: $missing");
    }
}
