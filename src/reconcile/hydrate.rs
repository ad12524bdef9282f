//! Hydration: overwrite the workflow state from a session.
//!
//! Reset first, then replay every stored field through its setter. Because
//! the base is always the default shape, the result mirrors the session
//! exactly and never keeps fields from an earlier session.

use crate::workflow::WorkflowStore;
use serde_json::Value;
use stagesync_common::{FieldUpdate, Session, Stage};
use tracing::{debug, warn};

/// What a hydration pass applied and what it had to skip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HydrateReport {
    /// Number of field setters applied (excluding the current stage)
    pub fields_applied: usize,
    /// Fields whose stored value did not decode
    pub fields_skipped: usize,
    /// Stages whose stored block was not a JSON object
    pub malformed_blocks: Vec<Stage>,
}

impl HydrateReport {
    pub fn is_clean(&self) -> bool {
        self.fields_skipped == 0 && self.malformed_blocks.is_empty()
    }
}

/// Reset `workflow` and restore it from `session`. Never fails.
pub fn hydrate<W: WorkflowStore + ?Sized>(workflow: &mut W, session: &Session) -> HydrateReport {
    workflow.reset();
    let mut report = HydrateReport::default();

    for (&stage, block) in &session.stage_data {
        let fields = match block {
            Value::Object(fields) => fields,
            Value::Null => continue,
            other => {
                warn!(
                    session_id = %session.id,
                    stage = %stage,
                    kind = json_kind(other),
                    "Skipping malformed stage block"
                );
                report.malformed_blocks.push(stage);
                continue;
            }
        };

        for (key, value) in fields {
            match FieldUpdate::decode(stage, key, value) {
                Ok(Some(update)) => {
                    workflow.apply(update);
                    report.fields_applied += 1;
                }
                Ok(None) => {
                    debug!(stage = %stage, field = %key, "Ignoring unknown stage field");
                }
                Err(err) => {
                    warn!(
                        session_id = %session.id,
                        stage = %stage,
                        field = %key,
                        error = %err,
                        "Skipping malformed stage field"
                    );
                    report.fields_skipped += 1;
                }
            }
        }
    }

    workflow.apply(FieldUpdate::CurrentStage(session.current_stage));
    debug!(
        session_id = %session.id,
        stage = %session.current_stage,
        fields = report.fields_applied,
        "Hydrated workflow state"
    );
    report
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
