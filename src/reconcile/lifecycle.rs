//! View lifecycle: when to hydrate, when to flush, and for which session.
//!
//! The controller is a small state machine over the attached session id.
//! Hydration runs at most once per distinct session id (the reentrancy
//! marker), and every flush it triggers re-reads the live active id first.
//! Store transitions requested during an attach are queued and only run from
//! [`LifecycleController::run_deferred`], never inside the attach itself.

use super::{FlushOutcome, ReconciliationEngine, SkipReason};
use crate::store::SessionStore;
use crate::workflow::WorkflowStore;
use stagesync_common::{ContentType, FieldUpdate, Session, SessionId, Stage};
use std::collections::VecDeque;
use tracing::{debug, info};

/// Which session, if any, a view is currently bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Attachment {
    #[default]
    Detached,
    Attached { id: SessionId, stage: Stage },
}

impl Attachment {
    pub fn id(&self) -> Option<SessionId> {
        match self {
            Attachment::Detached => None,
            Attachment::Attached { id, .. } => Some(*id),
        }
    }
}

/// What an attaching view gets back.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewBinding {
    /// The stage the view declared
    pub stage: Stage,
    /// The active session as of the attach, before any deferred transition
    pub active_session: Option<Session>,
}

/// A store transition scheduled during one pass and run in a later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    AdvanceTo { token: SessionId, stage: Stage },
}

pub struct LifecycleController<S, W> {
    engine: ReconciliationEngine<S, W>,
    attachment: Attachment,
    last_hydrated: Option<SessionId>,
    deferred: VecDeque<Deferred>,
}

impl<S: SessionStore, W: WorkflowStore> LifecycleController<S, W> {
    pub fn new(engine: ReconciliationEngine<S, W>) -> Self {
        Self {
            engine,
            attachment: Attachment::Detached,
            last_hydrated: None,
            deferred: VecDeque::new(),
        }
    }

    pub fn engine(&self) -> &ReconciliationEngine<S, W> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut ReconciliationEngine<S, W> {
        &mut self.engine
    }

    pub fn attachment(&self) -> Attachment {
        self.attachment
    }

    pub fn attached_id(&self) -> Option<SessionId> {
        self.attachment.id()
    }

    /// Session id the workflow state was last hydrated from.
    pub fn last_hydrated(&self) -> Option<SessionId> {
        self.last_hydrated
    }

    /// Number of queued deferred transitions.
    pub fn pending_deferred(&self) -> usize {
        self.deferred.len()
    }

    /// A view declaring `stage` became active.
    ///
    /// Hydrates unless the workflow state already mirrors the live session,
    /// then binds to that session. A stage mismatch is queued as a deferred
    /// advance.
    pub fn attach(&mut self, stage: Stage) -> ViewBinding {
        let Some(live) = self.engine.sessions().active_id() else {
            info!(stage = %stage, "No active session; view stays detached");
            self.attachment = Attachment::Detached;
            return ViewBinding {
                stage,
                active_session: None,
            };
        };

        if self.last_hydrated != Some(live) {
            self.engine.hydrate_active();
            self.last_hydrated = Some(live);
        } else {
            debug!(session_id = %live, "Workflow state already hydrated for session");
        }

        if let Attachment::Attached { id, stage: previous } = self.attachment {
            debug!(previous_session = %id, previous_stage = %previous, "Replacing attachment");
        }
        self.attachment = Attachment::Attached { id: live, stage };

        let active_session = self.engine.sessions().active().cloned();
        if let Some(session) = &active_session {
            if session.current_stage != stage {
                debug!(
                    session_id = %live,
                    from = %session.current_stage,
                    to = %stage,
                    "Scheduling deferred stage advance"
                );
                self.deferred
                    .push_back(Deferred::AdvanceTo { token: live, stage });
            }
        }

        ViewBinding {
            stage,
            active_session,
        }
    }

    /// Run queued transitions in order. Returns how many were applied.
    pub fn run_deferred(&mut self) -> usize {
        let mut applied = 0;
        while let Some(item) = self.deferred.pop_front() {
            match item {
                Deferred::AdvanceTo { token, stage } => {
                    if self.advance_if_owned(token, stage) {
                        applied += 1;
                    }
                }
            }
        }
        applied
    }

    fn advance_if_owned(&mut self, token: SessionId, stage: Stage) -> bool {
        let live = self.engine.sessions().active_id();
        if live != Some(token) {
            info!(
                expected = %token,
                actual = ?live,
                stage = %stage,
                "Active session changed; dropping deferred stage advance"
            );
            return false;
        }
        let Some(current) = self.engine.sessions().active().map(|s| s.current_stage) else {
            return false;
        };
        if !current.is_before(stage) {
            debug!(session_id = %token, current = %current, requested = %stage, "Not advancing backwards");
            return false;
        }
        if let Err(err) = self.engine.sessions_mut().advance_to_stage(stage) {
            info!(session_id = %token, error = %err, "Deferred stage advance failed");
            return false;
        }
        self.engine
            .workflow_mut()
            .apply(FieldUpdate::CurrentStage(stage));
        self.engine.persist();
        true
    }

    /// Periodic timer fired.
    pub fn tick(&mut self) -> FlushOutcome {
        self.guarded_sync("timer")
    }

    /// The attached view is being torn down.
    ///
    /// Drains deferred work, then flushes only if the live session is still
    /// the one the view attached to. Always ends detached.
    pub fn detach(&mut self) -> FlushOutcome {
        self.run_deferred();
        let outcome = self.guarded_sync("teardown");
        self.attachment = Attachment::Detached;
        outcome
    }

    /// Flush and persist on demand.
    pub fn manual_sync(&mut self) -> FlushOutcome {
        match self.attachment.id() {
            Some(id) => self.sync(id),
            None => {
                info!("Manual sync requested with no view attached");
                FlushOutcome::Skipped(SkipReason::Detached)
            }
        }
    }

    /// Flush, then mark `stage` completed, then persist.
    ///
    /// The completion flag is only recorded when the flush applied, so it is
    /// never written against stale stage data or the wrong session.
    pub fn mark_stage_complete(&mut self, stage: Stage) -> FlushOutcome {
        let Some(id) = self.attachment.id() else {
            info!(stage = %stage, "Cannot mark stage complete with no view attached");
            return FlushOutcome::Skipped(SkipReason::Detached);
        };
        let outcome = self.engine.flush(Some(id));
        if outcome.is_applied() {
            match self.engine.sessions_mut().mark_stage_completed(stage) {
                Ok(()) => {
                    self.engine.persist();
                }
                Err(err) => info!(session_id = %id, error = %err, "Failed to mark stage completed"),
            }
        }
        outcome
    }

    /// Apply a user edit to the workflow state.
    pub fn edit(&mut self, update: FieldUpdate) {
        self.engine.workflow_mut().apply(update);
    }

    /// Start a fresh session and discard the working state.
    ///
    /// The attachment is left alone: anything still bound to the previous
    /// session fails its ownership check instead of writing here.
    pub fn start_new_session(&mut self, content_type: Option<ContentType>) -> SessionId {
        let id = self.engine.sessions_mut().create_session(content_type);
        self.engine.workflow_mut().reset();
        self.engine.hydrate_active();
        self.last_hydrated = Some(id);
        self.engine.persist();
        info!(session_id = %id, "Started new session");
        id
    }

    /// Drop the active session pointer and discard the working state.
    pub fn abandon_session(&mut self) -> Option<SessionId> {
        let abandoned = self.engine.sessions().active_id();
        self.engine.sessions_mut().clear_active();
        self.engine.workflow_mut().reset();
        self.last_hydrated = None;
        if let Some(id) = abandoned {
            self.engine.persist();
            info!(session_id = %id, "Abandoned session");
        }
        abandoned
    }

    /// Flush, persist and close out the active session.
    pub fn complete_pipeline(&mut self) -> Option<SessionId> {
        let outcome = self.engine.flush(self.attachment.id());
        if !outcome.is_applied() {
            return None;
        }
        let completed = match self.engine.sessions_mut().complete_active() {
            Ok(id) => {
                self.engine.workflow_mut().reset();
                self.last_hydrated = None;
                info!(session_id = %id, "Completed pipeline");
                Some(id)
            }
            Err(err) => {
                info!(error = %err, "Failed to complete pipeline");
                None
            }
        };
        self.engine.persist();
        completed
    }

    /// Flush and persist if the live session still matches the attachment.
    fn guarded_sync(&mut self, trigger: &'static str) -> FlushOutcome {
        let Some(attached) = self.attachment.id() else {
            debug!(trigger, "No view attached; skipping sync");
            return FlushOutcome::Skipped(SkipReason::Detached);
        };
        match self.engine.sessions().active_id() {
            Some(live) if live == attached => self.sync(attached),
            Some(live) => {
                info!(
                    trigger,
                    expected = %attached,
                    actual = %live,
                    "Session changed since attach; skipping sync"
                );
                FlushOutcome::Skipped(SkipReason::OwnershipMismatch {
                    expected: attached,
                    actual: live,
                })
            }
            None => {
                info!(trigger, expected = %attached, "No active session; skipping sync");
                FlushOutcome::Skipped(SkipReason::NoActiveSession)
            }
        }
    }

    fn sync(&mut self, id: SessionId) -> FlushOutcome {
        let outcome = self.engine.flush(Some(id));
        if outcome.is_applied() {
            self.engine.persist();
        }
        outcome
    }
}
