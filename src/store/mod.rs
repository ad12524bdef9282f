//! Session registry: the durable side of reconciliation.
//!
//! [`SessionStore`] is the interface the reconciliation engine consumes. Both
//! bundled implementations keep their sessions in a [`SessionRegistry`] and
//! differ only in what `save()` does:
//!
//! | Store                   | `save()`                                   |
//! |-------------------------|--------------------------------------------|
//! | `InMemorySessionStore`  | counts calls, keeps nothing on disk        |
//! | `JsonFileSessionStore`  | rewrites the registry file atomically      |

pub mod file;
pub mod memory;

pub use file::JsonFileSessionStore;
pub use memory::InMemorySessionStore;

use crate::errors::StoreError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use stagesync_common::{ContentType, MetadataPatch, Session, SessionId, Stage};
use std::collections::BTreeMap;

/// A registry of sessions with at most one active at a time.
pub trait SessionStore {
    /// The active session, if any.
    fn active(&self) -> Option<&Session>;

    /// Id of the active session, if any.
    fn active_id(&self) -> Option<SessionId> {
        self.active().map(|s| s.id)
    }

    fn get(&self, id: SessionId) -> Option<&Session>;

    /// All sessions, most recently updated first.
    fn sessions(&self) -> Vec<&Session>;

    /// Create a session and make it the active one.
    fn create_session(&mut self, content_type: Option<ContentType>) -> SessionId;

    /// Make an existing session the active one.
    fn resume(&mut self, id: SessionId) -> Result<(), StoreError>;

    /// Clear the active pointer. The session itself stays in the registry.
    fn clear_active(&mut self);

    /// Move the active session to `stage`, recording the stage it leaves as completed.
    fn advance_to_stage(&mut self, stage: Stage) -> Result<(), StoreError>;

    /// Shallow-merge metadata into the active session. Returns true if it changed.
    fn update_metadata(&mut self, patch: MetadataPatch) -> Result<bool, StoreError>;

    /// Shallow-merge `partial` into the active session's block for `stage`.
    fn update_stage_data(
        &mut self,
        stage: Stage,
        partial: Map<String, Value>,
    ) -> Result<(), StoreError>;

    fn mark_stage_completed(&mut self, stage: Stage) -> Result<(), StoreError>;

    /// Finish the pipeline: mark the current stage completed and clear the
    /// active pointer. Returns the finished session's id.
    fn complete_active(&mut self) -> Result<SessionId, StoreError>;

    /// Persist the registry, including a cleared active pointer.
    fn save(&mut self) -> Result<(), StoreError>;
}

/// Plain session bookkeeping shared by the bundled stores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRegistry {
    #[serde(default)]
    active: Option<SessionId>,
    #[serde(default)]
    sessions: BTreeMap<SessionId, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&Session> {
        self.active.and_then(|id| self.sessions.get(&id))
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn sessions(&self) -> Vec<&Session> {
        let mut sessions: Vec<&Session> = self.sessions.values().collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        sessions
    }

    pub fn create_session(&mut self, content_type: Option<ContentType>) -> SessionId {
        let session = Session::new(content_type);
        let id = session.id;
        self.sessions.insert(id, session);
        self.active = Some(id);
        id
    }

    /// Insert a session as-is and make it active.
    pub fn insert_active(&mut self, session: Session) -> SessionId {
        let id = session.id;
        self.sessions.insert(id, session);
        self.active = Some(id);
        id
    }

    pub fn resume(&mut self, id: SessionId) -> Result<(), StoreError> {
        if !self.sessions.contains_key(&id) {
            return Err(StoreError::SessionNotFound { id });
        }
        self.active = Some(id);
        Ok(())
    }

    pub fn clear_active(&mut self) {
        self.active = None;
    }

    /// Mutable access to the active session.
    pub fn active_mut(&mut self) -> Result<&mut Session, StoreError> {
        let id = self.active.ok_or(StoreError::NoActiveSession)?;
        self.sessions
            .get_mut(&id)
            .ok_or(StoreError::SessionNotFound { id })
    }

    pub fn complete_active(&mut self) -> Result<SessionId, StoreError> {
        let session = self.active_mut()?;
        let stage = session.current_stage;
        session.mark_completed(stage);
        let id = session.id;
        self.active = None;
        Ok(id)
    }
}

/// Implement the [`SessionStore`] registry operations by delegating to a
/// `registry: SessionRegistry` field. Stores supply their own `save()`.
macro_rules! delegate_to_registry {
    () => {
        fn active(&self) -> Option<&Session> {
            self.registry.active()
        }

        fn get(&self, id: SessionId) -> Option<&Session> {
            self.registry.get(id)
        }

        fn sessions(&self) -> Vec<&Session> {
            self.registry.sessions()
        }

        fn create_session(&mut self, content_type: Option<ContentType>) -> SessionId {
            self.registry.create_session(content_type)
        }

        fn resume(&mut self, id: SessionId) -> Result<(), StoreError> {
            self.registry.resume(id)
        }

        fn clear_active(&mut self) {
            self.registry.clear_active();
        }

        fn advance_to_stage(&mut self, stage: Stage) -> Result<(), StoreError> {
            self.registry.active_mut()?.advance_to(stage);
            Ok(())
        }

        fn update_metadata(&mut self, patch: MetadataPatch) -> Result<bool, StoreError> {
            Ok(self.registry.active_mut()?.apply_metadata(patch))
        }

        fn update_stage_data(
            &mut self,
            stage: Stage,
            partial: serde_json::Map<String, serde_json::Value>,
        ) -> Result<(), StoreError> {
            self.registry.active_mut()?.merge_stage_data(stage, partial);
            Ok(())
        }

        fn mark_stage_completed(&mut self, stage: Stage) -> Result<(), StoreError> {
            self.registry.active_mut()?.mark_completed(stage);
            Ok(())
        }

        fn complete_active(&mut self) -> Result<SessionId, StoreError> {
            self.registry.complete_active()
        }
    };
}

pub(crate) use delegate_to_registry;
