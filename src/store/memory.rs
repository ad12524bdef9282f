//! In-memory session store for development and testing.

use super::{SessionRegistry, SessionStore, delegate_to_registry};
use crate::errors::StoreError;
use stagesync_common::{ContentType, MetadataPatch, Session, SessionId, Stage};

/// Session store that keeps everything in memory.
///
/// `save()` only counts calls, which lets tests assert when the engine
/// persisted and when it deliberately did not.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    registry: SessionRegistry,
    saves: usize,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store whose active session is `session`.
    pub fn with_active(session: Session) -> Self {
        let mut store = Self::new();
        store.registry.insert_active(session);
        store
    }

    /// Insert `session` and make it active, replacing any active pointer.
    pub fn insert_active(&mut self, session: Session) -> SessionId {
        self.registry.insert_active(session)
    }

    /// Number of times `save()` has been called.
    pub fn save_count(&self) -> usize {
        self.saves
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }
}

impl SessionStore for InMemorySessionStore {
    delegate_to_registry!();

    fn save(&mut self) -> Result<(), StoreError> {
        self.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_save_counts_with_and_without_active_session() {
        let mut store = InMemorySessionStore::new();
        store.save().unwrap();
        store.create_session(None);
        store.save().unwrap();
        assert_eq!(store.save_count(), 2);
    }

    #[test]
    fn test_mutators_require_active_session() {
        let mut store = InMemorySessionStore::new();
        assert!(store.advance_to_stage(Stage::Analyze).is_err());
        assert!(store.update_metadata(MetadataPatch::default()).is_err());
        assert!(store.mark_stage_completed(Stage::Start).is_err());
    }

    #[test]
    fn test_update_stage_data_targets_active_session() {
        let mut store = InMemorySessionStore::new();
        let first = store.create_session(None);
        let second = store.create_session(None);

        let partial = json!({"script": "hello"});
        store
            .update_stage_data(Stage::Create, partial.as_object().unwrap().clone())
            .unwrap();

        assert!(store.get(first).unwrap().stage_data.is_empty());
        assert_eq!(
            store.get(second).unwrap().stage_block(Stage::Create),
            Some(&partial)
        );
    }

    #[test]
    fn test_with_active_uses_given_session() {
        let session = Session::new(Some(ContentType::Carousel));
        let id = session.id;
        let store = InMemorySessionStore::with_active(session);
        assert_eq!(store.active_id(), Some(id));
    }
}
