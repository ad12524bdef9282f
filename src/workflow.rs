//! Workflow state container: the live side of reconciliation.

use stagesync_common::{FieldUpdate, WorkflowState};

/// The single mutable working state stage views read and write.
pub trait WorkflowStore {
    /// Full copy of the current state.
    fn snapshot(&self) -> WorkflowState;

    /// Replace exactly one field.
    fn apply(&mut self, update: FieldUpdate);

    /// Restore the default shape and drop any session-scoped cache.
    fn reset(&mut self);
}

/// Workflow store held in memory, with an optional reload cache.
///
/// The cache stands in for whatever a host keeps across reloads (local
/// storage, a scratch file). `reset()` clears it too, so a later reload can
/// never re-hydrate a previous session's fields.
#[derive(Debug, Default)]
pub struct InMemoryWorkflowStore {
    state: WorkflowState,
    cache: Option<WorkflowState>,
}

impl InMemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow the live state without cloning.
    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Copy the live state into the reload cache.
    pub fn stash(&mut self) {
        self.cache = Some(self.state.clone());
    }

    /// Restore the live state from the reload cache. Returns false if empty.
    pub fn restore_stash(&mut self) -> bool {
        match &self.cache {
            Some(cached) => {
                self.state = cached.clone();
                true
            }
            None => false,
        }
    }

    pub fn has_stash(&self) -> bool {
        self.cache.is_some()
    }
}

impl WorkflowStore for InMemoryWorkflowStore {
    fn snapshot(&self) -> WorkflowState {
        self.state.clone()
    }

    fn apply(&mut self, update: FieldUpdate) {
        update.apply(&mut self.state);
    }

    fn reset(&mut self) {
        self.state = WorkflowState::default();
        self.cache = None;
    }
}
