//! The live working state stage views bind to.
//!
//! [`WorkflowState`] mirrors a [`Session`](crate::Session) with one typed
//! slice per stage. Every field has exactly one setter, expressed as a
//! [`FieldUpdate`] variant, so callers never replace a whole slice by accident.

use crate::session::ContentType;
use crate::stage::Stage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where the entry stage's source came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Trend,
    Campaign,
    Manual,
}

/// A candidate idea produced during analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Idea {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub angle: String,
}

/// A generated artifact (image, clip, voiceover...) from the create stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub kind: String,
    pub uri: String,
}

/// A rendered output from the processing stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedOutput {
    pub id: String,
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u32>,
}

/// Behaviour shared by every per-stage slice.
pub trait StageSlice: Default + Serialize {
    /// The stage this slice belongs to.
    const STAGE: Stage;

    /// Minimal-presence check: does this slice hold anything worth persisting?
    fn is_meaningful(&self) -> bool;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartSlice {
    /// Primary entry-source text (trend description, manual prompt...)
    pub source_text: String,
    pub source_kind: Option<EntryKind>,
    pub source_id: Option<String>,
    pub campaign_name: String,
    pub content_type: Option<ContentType>,
}

impl StageSlice for StartSlice {
    const STAGE: Stage = Stage::Start;

    fn is_meaningful(&self) -> bool {
        self.source_id.is_some() || !self.source_text.is_empty() || !self.campaign_name.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzeSlice {
    pub ideas: Vec<Idea>,
    pub selected_idea: Option<Idea>,
    pub insights: String,
}

impl StageSlice for AnalyzeSlice {
    const STAGE: Stage = Stage::Analyze;

    fn is_meaningful(&self) -> bool {
        self.selected_idea.is_some() || !self.ideas.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateSlice {
    pub script: String,
    pub assets: Vec<Asset>,
}

impl StageSlice for CreateSlice {
    const STAGE: Stage = Stage::Create;

    fn is_meaningful(&self) -> bool {
        !self.script.is_empty() || !self.assets.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessSlice {
    pub outputs: Vec<RenderedOutput>,
    pub selected_output_id: Option<String>,
}

impl StageSlice for ProcessSlice {
    const STAGE: Stage = Stage::Process;

    fn is_meaningful(&self) -> bool {
        self.selected_output_id.is_some() || !self.outputs.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishSlice {
    pub platforms: Vec<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub caption: String,
}

impl StageSlice for PublishSlice {
    const STAGE: Stage = Stage::Publish;

    fn is_meaningful(&self) -> bool {
        self.scheduled_at.is_some() || !self.platforms.is_empty() || !self.caption.is_empty()
    }
}

/// The single active working state. `Default` is the documented reset shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowState {
    pub current_stage: Stage,
    pub start: StartSlice,
    pub analyze: AnalyzeSlice,
    pub create: CreateSlice,
    pub process: ProcessSlice,
    pub publish: PublishSlice,
}

impl WorkflowState {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Check the minimal-presence predicate for one stage's slice.
    pub fn is_meaningful(&self, stage: Stage) -> bool {
        match stage {
            Stage::Start => self.start.is_meaningful(),
            Stage::Analyze => self.analyze.is_meaningful(),
            Stage::Create => self.create.is_meaningful(),
            Stage::Process => self.process.is_meaningful(),
            Stage::Publish => self.publish.is_meaningful(),
        }
    }

    /// Serialize one stage's slice into the JSON object shape sessions store.
    pub fn slice_object(&self, stage: Stage) -> serde_json::Result<Map<String, Value>> {
        let value = match stage {
            Stage::Start => serde_json::to_value(&self.start)?,
            Stage::Analyze => serde_json::to_value(&self.analyze)?,
            Stage::Create => serde_json::to_value(&self.create)?,
            Stage::Process => serde_json::to_value(&self.process)?,
            Stage::Publish => serde_json::to_value(&self.publish)?,
        };
        match value {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }
}

/// The per-field setter family. Applying an update replaces exactly one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    CurrentStage(Stage),
    // start
    SourceText(String),
    SourceKind(Option<EntryKind>),
    SourceId(Option<String>),
    CampaignName(String),
    ContentType(Option<ContentType>),
    // analyze
    Ideas(Vec<Idea>),
    SelectedIdea(Option<Idea>),
    Insights(String),
    // create
    Script(String),
    Assets(Vec<Asset>),
    // process
    Outputs(Vec<RenderedOutput>),
    SelectedOutputId(Option<String>),
    // publish
    Platforms(Vec<String>),
    ScheduledAt(Option<DateTime<Utc>>),
    Caption(String),
}

impl FieldUpdate {
    /// Decode one stored stage-data entry into its setter.
    ///
    /// Returns `Ok(None)` for keys this version does not know about and an
    /// error when a known key holds a value of the wrong shape.
    pub fn decode(stage: Stage, key: &str, value: &Value) -> serde_json::Result<Option<Self>> {
        let update = match (stage, key) {
            (Stage::Start, "source_text") => Self::SourceText(Deserialize::deserialize(value)?),
            (Stage::Start, "source_kind") => Self::SourceKind(Deserialize::deserialize(value)?),
            (Stage::Start, "source_id") => Self::SourceId(Deserialize::deserialize(value)?),
            (Stage::Start, "campaign_name") => {
                Self::CampaignName(Deserialize::deserialize(value)?)
            }
            (Stage::Start, "content_type") => Self::ContentType(Deserialize::deserialize(value)?),
            (Stage::Analyze, "ideas") => Self::Ideas(Deserialize::deserialize(value)?),
            (Stage::Analyze, "selected_idea") => {
                Self::SelectedIdea(Deserialize::deserialize(value)?)
            }
            (Stage::Analyze, "insights") => Self::Insights(Deserialize::deserialize(value)?),
            (Stage::Create, "script") => Self::Script(Deserialize::deserialize(value)?),
            (Stage::Create, "assets") => Self::Assets(Deserialize::deserialize(value)?),
            (Stage::Process, "outputs") => Self::Outputs(Deserialize::deserialize(value)?),
            (Stage::Process, "selected_output_id") => {
                Self::SelectedOutputId(Deserialize::deserialize(value)?)
            }
            (Stage::Publish, "platforms") => Self::Platforms(Deserialize::deserialize(value)?),
            (Stage::Publish, "scheduled_at") => {
                Self::ScheduledAt(Deserialize::deserialize(value)?)
            }
            (Stage::Publish, "caption") => Self::Caption(Deserialize::deserialize(value)?),
            _ => return Ok(None),
        };
        Ok(Some(update))
    }

    /// The stage whose slice this update writes, or `None` for `CurrentStage`.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::CurrentStage(_) => None,
            Self::SourceText(_)
            | Self::SourceKind(_)
            | Self::SourceId(_)
            | Self::CampaignName(_)
            | Self::ContentType(_) => Some(Stage::Start),
            Self::Ideas(_) | Self::SelectedIdea(_) | Self::Insights(_) => Some(Stage::Analyze),
            Self::Script(_) | Self::Assets(_) => Some(Stage::Create),
            Self::Outputs(_) | Self::SelectedOutputId(_) => Some(Stage::Process),
            Self::Platforms(_) | Self::ScheduledAt(_) | Self::Caption(_) => Some(Stage::Publish),
        }
    }

    pub fn apply(self, state: &mut WorkflowState) {
        match self {
            Self::CurrentStage(v) => state.current_stage = v,
            Self::SourceText(v) => state.start.source_text = v,
            Self::SourceKind(v) => state.start.source_kind = v,
            Self::SourceId(v) => state.start.source_id = v,
            Self::CampaignName(v) => state.start.campaign_name = v,
            Self::ContentType(v) => state.start.content_type = v,
            Self::Ideas(v) => state.analyze.ideas = v,
            Self::SelectedIdea(v) => state.analyze.selected_idea = v,
            Self::Insights(v) => state.analyze.insights = v,
            Self::Script(v) => state.create.script = v,
            Self::Assets(v) => state.create.assets = v,
            Self::Outputs(v) => state.process.outputs = v,
            Self::SelectedOutputId(v) => state.process.selected_output_id = v,
            Self::Platforms(v) => state.publish.platforms = v,
            Self::ScheduledAt(v) => state.publish.scheduled_at = v,
            Self::Caption(v) => state.publish.caption = v,
        }
    }
}
