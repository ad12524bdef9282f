//! Pipeline stages.
//!
//! Stages are totally ordered by their position in the pipeline, so
//! `Stage::Start < Stage::Analyze < ... < Stage::Publish`. Reconciliation
//! relies on that ordering to keep a session's stage moving forward only.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One step of the content pipeline. Each stage owns an independent data block.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Entry: pick a trend, campaign or manual source
    #[default]
    Start,
    /// Analysis: generate and choose an idea
    Analyze,
    /// Creation: script and generated assets
    Create,
    /// Processing: edits and rendered outputs
    Process,
    /// Publishing: platforms and schedule
    Publish,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Stage; 5] = [
        Stage::Start,
        Stage::Analyze,
        Stage::Create,
        Stage::Process,
        Stage::Publish,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::Analyze => "analyze",
            Stage::Create => "create",
            Stage::Process => "process",
            Stage::Publish => "publish",
        }
    }

    /// The stage after this one, or `None` for the last stage.
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Start => Some(Stage::Analyze),
            Stage::Analyze => Some(Stage::Create),
            Stage::Create => Some(Stage::Process),
            Stage::Process => Some(Stage::Publish),
            Stage::Publish => None,
        }
    }

    /// Check if moving from `self` to `target` goes forward in the pipeline.
    pub fn is_before(&self, target: Stage) -> bool {
        *self < target
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid stage '{0}'. Valid values: start, analyze, create, process, publish")]
pub struct ParseStageError(pub String);

impl std::str::FromStr for Stage {
    type Err = ParseStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "start" | "entry" => Ok(Stage::Start),
            "analyze" | "analysis" => Ok(Stage::Analyze),
            "create" | "creation" => Ok(Stage::Create),
            "process" | "processing" => Ok(Stage::Process),
            "publish" => Ok(Stage::Publish),
            _ => Err(ParseStageError(s.to_string())),
        }
    }
}
