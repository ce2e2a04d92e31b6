//! Service container for dependency injection
//!
//! Wires settings and the forest store into a session.

use std::sync::Arc;
use std::time::Instant;

use crate::application::Session;
use crate::config::Settings;
use crate::infrastructure::persistence::JsonForestStore;
use crate::infrastructure::traits::{FileSystem, ForestStore, RealFileSystem};
use crate::infrastructure::InfraResult;

/// Holds shared dependencies and opens sessions over them.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Forest document store
    pub store: Arc<dyn ForestStore>,
}

impl ServiceContainer {
    /// Create a container backed by the JSON document at `settings.data_file`.
    pub fn new(settings: Settings) -> Self {
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        let store = Arc::new(JsonForestStore::new(fs, settings.data_file.clone()));
        Self::with_deps(settings, store)
    }

    /// Create a container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, store: Arc<dyn ForestStore>) -> Self {
        Self {
            settings: Arc::new(settings),
            store,
        }
    }

    /// Load the forest and start a session.
    pub fn open_session(&self) -> InfraResult<Session> {
        Ok(Session::open(
            self.store.clone(),
            &self.settings,
            Instant::now(),
        )?)
    }
}
