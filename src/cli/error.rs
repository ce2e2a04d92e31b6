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

    #[error("{0}")]
    Usage(String),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

impl From<DomainError> for CliError {
    fn from(e: DomainError) -> Self {
        ApplicationError::Domain(e).into()
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => exitcode::USAGE,
            CliError::Infra(e) => match e {
                InfraError::Io { .. } => exitcode::IOERR,
                InfraError::Serialization(_) => exitcode::SOFTWARE,
                InfraError::Application(app) => match app {
                    ApplicationError::Domain(DomainError::NotFound(_)) => exitcode::NOINPUT,
                    ApplicationError::Domain(_) => exitcode::DATAERR,
                    ApplicationError::Config { .. } => exitcode::CONFIG,
                    ApplicationError::Persistence { .. } => exitcode::IOERR,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(DomainError::NotFound("x".into()), exitcode::NOINPUT)]
    #[case(DomainError::UndoEmpty, exitcode::DATAERR)]
    #[case(DomainError::Cycle { source_id: "a".into(), target_id: "b".into() }, exitcode::DATAERR)]
    #[case(DomainError::InvalidOperation("no".into()), exitcode::DATAERR)]
    fn given_domain_error_when_exit_code_then_sysexits_value(
        #[case] err: DomainError,
        #[case] code: i32,
    ) {
        assert_eq!(CliError::from(err).exit_code(), code);
    }

    #[test]
    fn given_config_error_when_exit_code_then_config() {
        let err: CliError = ApplicationError::Config {
            message: "bad".into(),
        }
        .into();
        assert_eq!(err.exit_code(), exitcode::CONFIG);
        assert_eq!(CliError::Usage("x".into()).exit_code(), exitcode::USAGE);
    }
}
