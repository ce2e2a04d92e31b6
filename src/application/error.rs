//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::DomainError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("persistence failed: {context}")]
    Persistence {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("config error: {message}")]
    Config { message: String },
}

impl ApplicationError {
    /// The domain error behind this one, if any.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            ApplicationError::Domain(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
