//! Markup error taxonomy
//!
//! Every variant carries a 1-based line number; syntax errors also carry
//! the verbatim offending span. Strict mode turns the tolerated class of
//! malformed markup into hard errors; with strict mode off the reader and
//! parser recover instead (see the reader's re-queue path).

use thiserror::Error;

pub type MarkupResult<T> = Result<T, MarkupError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarkupError {
    #[error("syntax error at line {line}: {message} (near '{context}')")]
    Syntax {
        line: usize,
        message: String,
        context: String,
    },

    #[error("unknown node type '{type_name}' for tag '{tag}' at line {line}")]
    TypeResolution {
        line: usize,
        tag: String,
        type_name: String,
    },

    #[error("mismatched closing tag '</{found}>' at line {line}: no matching '<{found}>' is open (expected '</{expected}>')")]
    MismatchedClosingTag {
        line: usize,
        expected: String,
        found: String,
    },
}

impl MarkupError {
    /// The 1-based source line the error points at.
    pub fn line(&self) -> usize {
        match self {
            MarkupError::Syntax { line, .. }
            | MarkupError::TypeResolution { line, .. }
            | MarkupError::MismatchedClosingTag { line, .. } => *line,
        }
    }
}
