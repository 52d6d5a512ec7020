//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) => exitcode::USAGE,
            CliError::Infra(e) => match e {
                InfraError::Application(app) => application_exit_code(app),
                InfraError::Http(_) | InfraError::Api { .. } | InfraError::RateLimited { .. } => {
                    exitcode::UNAVAILABLE
                }
                InfraError::Parse(_) => exitcode::DATAERR,
                InfraError::MissingApiKey(_) => exitcode::CONFIG,
                InfraError::UnknownOperation(_) | InfraError::MissingArgument { .. } => {
                    exitcode::SOFTWARE
                }
            },
        }
    }
}

fn application_exit_code(e: &ApplicationError) -> i32 {
    match e {
        ApplicationError::Domain(DomainError::InvalidInput(_))
        | ApplicationError::Domain(DomainError::DepthOutOfRange { .. }) => exitcode::USAGE,
        ApplicationError::Domain(_) => exitcode::DATAERR,
        ApplicationError::OracleUnavailable { .. }
        | ApplicationError::OracleRejected { .. }
        | ApplicationError::BudgetExhausted { .. }
        | ApplicationError::Timeout { .. } => exitcode::UNAVAILABLE,
        ApplicationError::Config { .. } => exitcode::CONFIG,
        ApplicationError::OperationFailed { .. } => exitcode::IOERR,
    }
}
