//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent violations of the question-tree model.
/// These are independent of oracle transport concerns.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("max depth {depth} out of range (limit {limit})")]
    DepthOutOfRange { depth: usize, limit: usize },

    #[error("malformed oracle output for '{question}': {message}")]
    MalformedOracleOutput { question: String, message: String },

    #[error("invalid tree document: {0}")]
    InvalidTree(String),
}

impl DomainError {
    pub fn malformed(question: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedOracleOutput {
            question: question.into(),
            message: message.into(),
        }
    }
}
