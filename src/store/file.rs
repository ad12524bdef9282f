//! JSON-file-backed session store.
//!
//! The whole registry lives in one pretty-printed JSON file:
//!
//! ```json
//! {
//!   "active": "7d7c3f0e-...",
//!   "sessions": { "7d7c3f0e-...": { "id": "...", "current_stage": "analyze", ... } }
//! }
//! ```

use super::{SessionRegistry, SessionStore, delegate_to_registry};
use crate::errors::StoreError;
use stagesync_common::{ContentType, MetadataPatch, Session, SessionId, Stage};
use std::fs;
use std::path::{Path, PathBuf};

/// Session store persisted to a single JSON file.
#[derive(Debug)]
pub struct JsonFileSessionStore {
    path: PathBuf,
    registry: SessionRegistry,
}

impl JsonFileSessionStore {
    /// Open the registry at `path`. A missing file is an empty registry.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let registry = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            if content.trim().is_empty() {
                SessionRegistry::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            SessionRegistry::new()
        };
        tracing::debug!(path = %path.display(), sessions = registry.len(), "Opened session file");
        Ok(Self { path, registry })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the full registry, including the active pointer, to disk.
    ///
    /// The registry is written to a sibling temp file, then renamed over the
    /// target.
    pub fn persist(&self) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let content = serde_json::to_string_pretty(&self.registry)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl SessionStore for JsonFileSessionStore {
    delegate_to_registry!();

    fn save(&mut self) -> Result<(), StoreError> {
        self.persist()
    }
}
