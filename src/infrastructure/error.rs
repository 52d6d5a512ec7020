//! Infrastructure-level errors (wraps application errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;

/// Infrastructure errors wrap application errors and add HTTP-level concerns.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("unknown evidence operation: {0}")]
    UnknownOperation(String),

    #[error("operation {operation} is missing argument '{argument}'")]
    MissingArgument { operation: String, argument: String },

    #[error("API key not configured for {0}")]
    MissingApiKey(&'static str),
}

impl InfraError {
    /// Worth another attempt: transport failures, throttling, and server errors.
    pub fn is_retryable(&self) -> bool {
        match self {
            InfraError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            InfraError::RateLimited { .. } => true,
            InfraError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Map an adapter failure onto the oracle error taxonomy seen by the tree services.
    pub fn into_oracle_error(self, question: &str) -> ApplicationError {
        match self {
            InfraError::Application(e) => e,
            InfraError::Parse(message) => DomainError::malformed(question, message).into(),
            e @ InfraError::MissingApiKey(_) => ApplicationError::Config {
                message: e.to_string(),
            },
            InfraError::Api { status, message } if status == 401 || status == 403 => {
                ApplicationError::Config {
                    message: format!("oracle refused credentials ({status}): {message}"),
                }
            }
            InfraError::Api { status, message } if (400..500).contains(&status) => {
                ApplicationError::OracleRejected { status, message }
            }
            other => ApplicationError::unavailable(other.to_string()),
        }
    }
}

/// Result type for infrastructure layer operations.
pub type InfraResult<T> = Result<T, InfraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_parse_error_when_mapping_then_malformed_output() {
        let err = InfraError::Parse("missing field".into()).into_oracle_error("q?");
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::MalformedOracleOutput { .. })
        ));
    }

    #[test]
    fn given_server_error_when_mapping_then_unavailable_and_retryable() {
        let err = InfraError::Api {
            status: 503,
            message: "busy".into(),
        };
        assert!(err.is_retryable());
        assert!(err.into_oracle_error("q?").is_transient());
    }

    #[test]
    fn given_client_error_when_checking_then_not_retryable() {
        let err = InfraError::Api {
            status: 404,
            message: "no such game".into(),
        };
        assert!(!err.is_retryable());
        assert!(!err.into_oracle_error("q?").is_transient());
        assert!(matches!(
            InfraError::Api {
                status: 400,
                message: "bad schema".into(),
            }
            .into_oracle_error("q?"),
            ApplicationError::OracleRejected { status: 400, .. }
        ));
        assert!(InfraError::RateLimited {
            retry_after_secs: 1
        }
        .is_retryable());
    }

    #[test]
    fn given_unauthorized_reply_when_mapping_then_config_error() {
        for status in [401, 403] {
            let err = InfraError::Api {
                status,
                message: "invalid api key".into(),
            }
            .into_oracle_error("q?");

            assert!(matches!(err, ApplicationError::Config { .. }));
            assert!(!err.is_transient());
        }
    }
}
