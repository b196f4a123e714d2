//! Error types for template rendering

use thiserror::Error;

/// Errors raised while parsing or evaluating a JSON-e template.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// An expression could not be tokenized or parsed
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    /// An expression was well-formed but failed to evaluate
    #[error("interpreter error: {0}")]
    Interpreter(String),

    /// A `$`-operator was used with the wrong shape
    #[error("template error: {0}")]
    Template(String),
}

impl RenderError {
    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
        RenderError::Syntax {
            offset,
            message: message.into(),
        }
    }

    pub(crate) fn interpreter(message: impl Into<String>) -> Self {
        RenderError::Interpreter(message.into())
    }

    pub(crate) fn template(message: impl Into<String>) -> Self {
        RenderError::Template(message.into())
    }
}

/// Result type for rendering operations
pub type Result<T> = std::result::Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_reports_offset() {
        let err = RenderError::syntax(7, "unexpected token");
        let msg = err.to_string();
        assert!(msg.contains("offset 7"));
        assert!(msg.contains("unexpected token"));
    }

    #[test]
    fn test_error_kinds_are_distinguishable() {
        assert_ne!(
            RenderError::interpreter("boom"),
            RenderError::template("boom")
        );
    }
}
