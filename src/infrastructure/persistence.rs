//! Forest document stores
//!
//! The on-disk document is a small JSON envelope around the forest:
//!
//! ```json
//! { "version": 1, "savedAt": "2026-01-01T00:00:00Z", "roots": [ ... ] }
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::Forest;
use crate::infrastructure::traits::{FileSystem, ForestStore};

pub const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    saved_at: Option<DateTime<Utc>>,
    roots: Forest,
}

/// Forest stored as a JSON document through a [`FileSystem`].
pub struct JsonForestStore {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl JsonForestStore {
    pub fn new(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ForestStore for JsonForestStore {
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    fn load(&self) -> io::Result<Option<Forest>> {
        if !self.fs.exists(&self.path) {
            debug!("no forest document yet");
            return Ok(None);
        }
        let content = self.fs.read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        let doc: Document = serde_json::from_str(&content)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        if doc.version > DOCUMENT_VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "document version {} is newer than supported {}",
                    doc.version, DOCUMENT_VERSION
                ),
            ));
        }
        debug!(nodes = doc.roots.len(), "forest document loaded");
        Ok(Some(doc.roots))
    }

    #[instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    fn save(&self, forest: &Forest) -> io::Result<()> {
        let doc = Document {
            version: DOCUMENT_VERSION,
            saved_at: Some(Utc::now()),
            roots: forest.clone(),
        };
        let json = serde_json::to_string_pretty(&doc)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.fs.ensure_parent(&self.path)?;
        self.fs.write(&self.path, &json)
    }
}

/// In-memory store; can be told to fail saves.
#[derive(Debug, Default)]
pub struct MemoryForestStore {
    forest: Mutex<Option<Forest>>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryForestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_forest(forest: Forest) -> Self {
        Self {
            forest: Mutex::new(Some(forest)),
            ..Self::default()
        }
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Last saved (or seeded) forest.
    pub fn stored(&self) -> Option<Forest> {
        self.forest.lock().ok().and_then(|f| f.clone())
    }
}

impl ForestStore for MemoryForestStore {
    fn load(&self) -> io::Result<Option<Forest>> {
        self.forest
            .lock()
            .map(|f| f.clone())
            .map_err(|_| io::Error::other("memory store poisoned"))
    }

    fn save(&self, forest: &Forest) -> io::Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(io::Error::other("simulated save failure"));
        }
        let mut slot = self
            .forest
            .lock()
            .map_err(|_| io::Error::other("memory store poisoned"))?;
        *slot = Some(forest.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
