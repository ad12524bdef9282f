//! Flush: write meaningful workflow changes back into the active session.
//!
//! A flush is a single synchronous pass guarded by the ownership check. It
//! only merges, in three steps: stage (forward only), metadata (only when a
//! derived field differs), and stage data (only stages with meaningful
//! content). It never persists and never touches the workflow state.

use super::guard::{check_ownership, derive_title};
use super::{FlushOutcome, FlushReport, ReconcileOptions, SkipReason};
use crate::errors::StoreError;
use crate::store::SessionStore;
use crate::workflow::WorkflowStore;
use serde_json::Value;
use stagesync_common::{MetadataPatch, SessionId, Stage, WorkflowState};
use tracing::{debug, info, warn};

/// Merge `workflow` into the active session of `sessions`.
///
/// When `expected` is set and differs from the live session id, nothing is
/// written.
pub fn flush<S, W>(
    sessions: &mut S,
    workflow: &W,
    expected: Option<SessionId>,
    options: &ReconcileOptions,
) -> FlushOutcome
where
    S: SessionStore + ?Sized,
    W: WorkflowStore + ?Sized,
{
    let session_id = match check_ownership(sessions.active_id(), expected) {
        Ok(id) => id,
        Err(reason) => {
            log_skip(&reason);
            return FlushOutcome::Skipped(reason);
        }
    };

    let state = workflow.snapshot();
    let mut report = FlushReport::new(session_id);

    report.advanced_to = reconcile_stage(sessions, &state, session_id);
    report.metadata_updated = reconcile_metadata(sessions, &state, session_id, options);
    report.stages_written = reconcile_stage_data(sessions, &state, session_id);

    debug!(
        session_id = %session_id,
        advanced_to = ?report.advanced_to,
        metadata_updated = report.metadata_updated,
        stages_written = ?report.stages_written,
        "Flushed workflow state"
    );
    FlushOutcome::Applied(report)
}

fn log_skip(reason: &SkipReason) {
    match reason {
        SkipReason::NoActiveSession => info!("No active session; skipping flush"),
        SkipReason::OwnershipMismatch { expected, actual } => info!(
            expected = %expected,
            actual = %actual,
            "Active session changed; skipping flush"
        ),
        SkipReason::Detached => info!("No view attached; skipping flush"),
    }
}

fn log_store_error(session_id: SessionId, step: &str, err: &StoreError) {
    warn!(session_id = %session_id, step, error = %err, "Session store rejected flush step");
}

fn reconcile_stage<S: SessionStore + ?Sized>(
    sessions: &mut S,
    state: &WorkflowState,
    session_id: SessionId,
) -> Option<Stage> {
    let stored = sessions.active()?.current_stage;
    let target = state.current_stage;
    if stored == target {
        return None;
    }
    if !stored.is_before(target) {
        debug!(
            session_id = %session_id,
            stored = %stored,
            workflow = %target,
            "Workflow stage is behind the session; not regressing"
        );
        return None;
    }
    match sessions.advance_to_stage(target) {
        Ok(()) => Some(target),
        Err(err) => {
            log_store_error(session_id, "advance_to_stage", &err);
            None
        }
    }
}

fn reconcile_metadata<S: SessionStore + ?Sized>(
    sessions: &mut S,
    state: &WorkflowState,
    session_id: SessionId,
    options: &ReconcileOptions,
) -> bool {
    let Some(session) = sessions.active() else {
        return false;
    };
    let stored = &session.metadata;

    let title = derive_title(&state.start, options.title_max_chars);
    // An empty derived title never clears a stored one.
    let patch = MetadataPatch {
        title: (!title.is_empty() && title != stored.title).then_some(title),
        content_type: state
            .start
            .content_type
            .filter(|ct| stored.content_type != Some(*ct)),
    };
    if patch.is_empty() {
        return false;
    }

    match sessions.update_metadata(patch) {
        Ok(changed) => changed,
        Err(err) => {
            log_store_error(session_id, "update_metadata", &err);
            false
        }
    }
}

fn reconcile_stage_data<S: SessionStore + ?Sized>(
    sessions: &mut S,
    state: &WorkflowState,
    session_id: SessionId,
) -> Vec<Stage> {
    let mut written = Vec::new();

    for stage in Stage::ALL {
        // An empty slice must never erase what an earlier flush stored.
        if !state.is_meaningful(stage) {
            continue;
        }
        let object = match state.slice_object(stage) {
            Ok(object) => object,
            Err(err) => {
                warn!(session_id = %session_id, stage = %stage, error = %err, "Failed to serialize slice");
                continue;
            }
        };

        let unchanged = sessions
            .active()
            .and_then(|s| s.stage_block(stage))
            .and_then(Value::as_object)
            .is_some_and(|stored| object.iter().all(|(k, v)| stored.get(k) == Some(v)));
        if unchanged {
            continue;
        }

        match sessions.update_stage_data(stage, object) {
            Ok(()) => written.push(stage),
            Err(err) => log_store_error(session_id, "update_stage_data", &err),
        }
    }

    written
}
