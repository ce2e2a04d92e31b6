//! Error conversion helpers for I/O calls
//!
//! Provides an extension trait for cleaner error handling with context.

use std::io;

use crate::application::{ApplicationError, ApplicationResult};

/// Extension trait for converting `io::Result` to `ApplicationResult` with context.
pub trait IoResultExt<T> {
    /// Mark an I/O error as a failure of the persistence collaborator.
    ///
    /// # Example
    /// ```ignore
    /// store.load().with_persistence_context("load forest")?;
    /// ```
    fn with_persistence_context(self, action: &str) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_persistence_context(self, action: &str) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::Persistence {
            context: action.to_string(),
            source: Box::new(e),
        })
    }
}
