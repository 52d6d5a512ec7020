//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::DomainError;

/// Application errors wrap domain errors and add oracle-call context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("oracle unavailable: {message}")]
    OracleUnavailable { message: String },

    #[error("oracle rejected the request ({status}): {message}")]
    OracleRejected { status: u16, message: String },

    #[error("tool-call budget exhausted after {turns} turns without a final answer")]
    BudgetExhausted { turns: usize },

    #[error("oracle call timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApplicationError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::OracleUnavailable {
            message: message.into(),
        }
    }

    /// Only transport failures are worth retrying; a malformed reply to the
    /// same prompt is unlikely to improve.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::OracleUnavailable { .. })
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
