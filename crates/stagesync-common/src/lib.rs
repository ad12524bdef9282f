//! Shared domain types for the stagesync workspace.
//!
//! - [`stage`]: the ordered pipeline stages
//! - [`session`]: the durable session record and its metadata
//! - [`workflow`]: the live working state, its per-stage slices and the
//!   per-field setter family ([`FieldUpdate`])

pub mod session;
pub mod stage;
pub mod workflow;

pub use session::{ContentType, MetadataPatch, Session, SessionId, SessionMetadata};
pub use stage::{ParseStageError, Stage};
pub use workflow::{
    AnalyzeSlice, Asset, CreateSlice, EntryKind, FieldUpdate, Idea, ProcessSlice, PublishSlice,
    RenderedOutput, StageSlice, StartSlice, WorkflowState,
};
