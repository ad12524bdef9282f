//! Reconciliation between the session registry and the live workflow state.
//!
//! ```text
//!   view attach ──► hydrate (Session ──► WorkflowState)
//!   user edits  ──► WorkflowState setters
//!   tick / teardown / manual ──► flush (WorkflowState ──► Session) ──► save
//! ```
//!
//! | Module      | Responsibility                                              |
//! |-------------|-------------------------------------------------------------|
//! | `hydrate`   | reset-then-restore of the workflow state                    |
//! | `flush`     | ownership-guarded selective merge into the session          |
//! | `guard`     | ownership check and title derivation                        |
//! | `lifecycle` | attach/tick/detach state machine and deferred transitions   |
//! | `driver`    | tokio task serializing all of the above behind one queue    |
//!
//! Every deferred operation captures the session id it targets and re-checks
//! it against the live store right before mutating. On mismatch it drops the
//! update; it never retries.

pub mod driver;
pub mod flush;
pub mod guard;
pub mod hydrate;
pub mod lifecycle;

pub use driver::{DriverHandle, SyncDriver, ViewHandle};
pub use flush::flush;
pub use guard::{DEFAULT_TITLE_MAX_CHARS, check_ownership, derive_title};
pub use hydrate::{HydrateReport, hydrate};
pub use lifecycle::{Attachment, LifecycleController, ViewBinding};

use crate::store::SessionStore;
use crate::workflow::WorkflowStore;
use stagesync_common::{Session, SessionId, Stage};
use tracing::{info, warn};

/// Tunables for reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Characters of source text kept in a derived title
    pub title_max_chars: usize,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            title_max_chars: DEFAULT_TITLE_MAX_CHARS,
        }
    }
}

/// Why a flush wrote nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The registry has no active session
    NoActiveSession,
    /// The live session is not the one the flush was scheduled for
    OwnershipMismatch {
        expected: SessionId,
        actual: SessionId,
    },
    /// The trigger requires an attached view and none is attached
    Detached,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoActiveSession => write!(f, "no active session"),
            SkipReason::OwnershipMismatch { expected, actual } => {
                write!(f, "session changed (expected {}, active {})", expected, actual)
            }
            SkipReason::Detached => write!(f, "no view attached"),
        }
    }
}

/// What a successful flush changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushReport {
    pub session_id: SessionId,
    /// Stage the session was advanced to, if any
    pub advanced_to: Option<Stage>,
    pub metadata_updated: bool,
    /// Stages whose blocks were overwritten
    pub stages_written: Vec<Stage>,
}

impl FlushReport {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            advanced_to: None,
            metadata_updated: false,
            stages_written: Vec::new(),
        }
    }

    /// Check if the flush changed anything in the session.
    pub fn changed(&self) -> bool {
        self.advanced_to.is_some() || self.metadata_updated || !self.stages_written.is_empty()
    }
}

/// Result of a flush attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    Applied(FlushReport),
    Skipped(SkipReason),
}

impl FlushOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn report(&self) -> Option<&FlushReport> {
        match self {
            Self::Applied(report) => Some(report),
            Self::Skipped(_) => None,
        }
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::Applied(_) => None,
            Self::Skipped(reason) => Some(*reason),
        }
    }
}

/// Owns both containers and runs hydration and flush between them.
///
/// The containers are injected so the engine can run against fakes.
pub struct ReconciliationEngine<S, W> {
    sessions: S,
    workflow: W,
    options: ReconcileOptions,
}

impl<S: SessionStore, W: WorkflowStore> ReconciliationEngine<S, W> {
    pub fn new(sessions: S, workflow: W) -> Self {
        Self::with_options(sessions, workflow, ReconcileOptions::default())
    }

    pub fn with_options(sessions: S, workflow: W, options: ReconcileOptions) -> Self {
        Self {
            sessions,
            workflow,
            options,
        }
    }

    pub fn sessions(&self) -> &S {
        &self.sessions
    }

    pub fn sessions_mut(&mut self) -> &mut S {
        &mut self.sessions
    }

    pub fn workflow(&self) -> &W {
        &self.workflow
    }

    pub fn workflow_mut(&mut self) -> &mut W {
        &mut self.workflow
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Overwrite the workflow state from `session`.
    pub fn hydrate(&mut self, session: &Session) -> HydrateReport {
        hydrate(&mut self.workflow, session)
    }

    /// Hydrate from the live active session. `None` when there is none.
    pub fn hydrate_active(&mut self) -> Option<HydrateReport> {
        match self.sessions.active() {
            Some(session) => Some(hydrate(&mut self.workflow, session)),
            None => {
                info!("No active session; nothing to hydrate");
                None
            }
        }
    }

    /// Merge the workflow state into the active session, guarded by `expected`.
    pub fn flush(&mut self, expected: Option<SessionId>) -> FlushOutcome {
        flush(&mut self.sessions, &self.workflow, expected, &self.options)
    }

    /// Persist the session registry. Failures are logged, never returned.
    pub fn persist(&mut self) -> bool {
        match self.sessions.save() {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "Failed to save session");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemorySessionStore, JsonFileSessionStore};
    use crate::workflow::InMemoryWorkflowStore;
    use stagesync_common::FieldUpdate;

    fn engine() -> ReconciliationEngine<InMemorySessionStore, InMemoryWorkflowStore> {
        ReconciliationEngine::new(InMemorySessionStore::new(), InMemoryWorkflowStore::new())
    }

    #[test]
    fn test_hydrate_active_without_session() {
        let mut engine = engine();
        engine.workflow_mut().apply(FieldUpdate::Caption("kept".into()));
        assert!(engine.hydrate_active().is_none());
        assert_eq!(engine.workflow().state().publish.caption, "kept");
    }

    #[test]
    fn test_flush_then_hydrate_round_trip() {
        let mut engine = engine();
        let id = engine.sessions_mut().create_session(None);
        engine.workflow_mut().apply(FieldUpdate::CurrentStage(Stage::Create));
        engine.workflow_mut().apply(FieldUpdate::Script("scene one".into()));
        engine.workflow_mut().apply(FieldUpdate::CampaignName("Summer Tour".into()));
        let edited = engine.workflow().snapshot();

        assert!(engine.flush(Some(id)).is_applied());
        engine.hydrate_active().unwrap();

        assert_eq!(engine.workflow().snapshot(), edited);
    }

    #[test]
    fn test_persist_without_active_session_still_saves() {
        let mut engine = engine();
        assert!(engine.persist());
        engine.sessions_mut().create_session(None);
        assert!(engine.persist());
        assert_eq!(engine.sessions().save_count(), 2);
    }

    #[test]
    fn test_persist_logs_and_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let store = JsonFileSessionStore::open(blocker.join("sessions.json")).unwrap();
        let mut engine = ReconciliationEngine::new(store, InMemoryWorkflowStore::new());
        engine.sessions_mut().create_session(None);
        assert!(!engine.persist());
    }

    #[test]
    fn test_flush_report_changed() {
        let mut report = FlushReport::new(SessionId::new());
        assert!(!report.changed());
        report.stages_written.push(Stage::Start);
        assert!(report.changed());
    }

    #[test]
    fn test_skip_reason_display() {
        let expected = SessionId::new();
        let actual = SessionId::new();
        let text = SkipReason::OwnershipMismatch { expected, actual }.to_string();
        assert!(text.contains(&expected.to_string()));
        assert!(text.contains(&actual.to_string()));
    }
}
