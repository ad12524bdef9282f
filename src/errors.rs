//! Typed error hierarchy for stagesync.
//!
//! Reconciliation itself has no fatal paths: skipped syncs are reported as
//! [`SkipReason`](crate::reconcile::SkipReason) values, not errors. The enums
//! here cover the fallible edges:
//! - `StoreError`: session registry lookups and persistence
//! - `DriverError`: talking to a sync driver whose task has stopped

use crate::SessionId;
use thiserror::Error;

/// Errors from a session store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No active session")]
    NoActiveSession,

    #[error("Session {id} not found")]
    SessionNotFound { id: SessionId },

    #[error("Failed to access session file at {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to (de)serialize sessions: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from a [`DriverHandle`](crate::reconcile::DriverHandle).
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Sync driver has shut down")]
    Closed,

    #[error("Sync driver task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}
