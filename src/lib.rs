//! Session/workflow reconciliation for multi-stage content pipelines.
//!
//! A durable [`Session`] record and a live [`WorkflowState`] describe the same
//! piece of work. The [`reconcile`] module keeps them consistent: hydration
//! copies a session into the working state when a stage view attaches, and
//! guarded flushes merge edits back on a timer, on teardown and on demand.

pub mod config;
pub mod errors;
pub mod init;
pub mod logging;
pub mod reconcile;
pub mod store;
pub mod workflow;

pub use stagesync_common::{
    AnalyzeSlice, Asset, ContentType, CreateSlice, EntryKind, FieldUpdate, Idea, MetadataPatch,
    ParseStageError, ProcessSlice, PublishSlice, RenderedOutput, Session, SessionId,
    SessionMetadata, Stage, StageSlice, StartSlice, WorkflowState,
};
