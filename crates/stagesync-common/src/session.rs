//! The durable session record.
//!
//! A [`Session`] is what the session registry stores and persists. Its stage
//! data is kept as loosely typed JSON objects: it outlives any one version of
//! the typed workflow slices, and readers must tolerate blocks that no longer
//! decode.

use crate::stage::Stage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Identifier of a session in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl From<Uuid> for SessionId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

/// Kind of content a session produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    ShortVideo,
    Image,
    Carousel,
    Story,
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentType::ShortVideo => write!(f, "short_video"),
            ContentType::Image => write!(f, "image"),
            ContentType::Carousel => write!(f, "carousel"),
            ContentType::Story => write!(f, "story"),
        }
    }
}

impl std::str::FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "short_video" | "video" => Ok(ContentType::ShortVideo),
            "image" => Ok(ContentType::Image),
            "carousel" => Ok(ContentType::Carousel),
            "story" => Ok(ContentType::Story),
            _ => Err(format!(
                "Invalid content type '{}'. Valid values: short_video, image, carousel, story",
                s
            )),
        }
    }
}

/// Display metadata shown in session lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
}

/// Partial metadata update; `None` fields are left as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataPatch {
    pub title: Option<String>,
    pub content_type: Option<ContentType>,
}

impl MetadataPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content_type.is_none()
    }
}

/// One user's in-progress pass through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub current_stage: Stage,
    #[serde(default)]
    pub completed_stages: BTreeSet<Stage>,
    /// Per-stage payloads, one JSON object per stage that has been written.
    #[serde(default)]
    pub stage_data: BTreeMap<Stage, Value>,
    #[serde(default)]
    pub metadata: SessionMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a fresh session positioned at the first stage.
    pub fn new(content_type: Option<ContentType>) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            current_stage: Stage::Start,
            completed_stages: BTreeSet::new(),
            stage_data: BTreeMap::new(),
            metadata: SessionMetadata {
                title: String::new(),
                content_type,
            },
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `stage`, recording the stage being left as completed.
    pub fn advance_to(&mut self, stage: Stage) {
        if self.current_stage == stage {
            return;
        }
        self.completed_stages.insert(self.current_stage);
        self.current_stage = stage;
        self.touch();
    }

    /// Shallow-merge `patch` into the metadata. Returns true if anything changed.
    pub fn apply_metadata(&mut self, patch: MetadataPatch) -> bool {
        let mut changed = false;
        if let Some(title) = patch.title {
            if self.metadata.title != title {
                self.metadata.title = title;
                changed = true;
            }
        }
        if let Some(content_type) = patch.content_type {
            if self.metadata.content_type != Some(content_type) {
                self.metadata.content_type = Some(content_type);
                changed = true;
            }
        }
        if changed {
            self.touch();
        }
        changed
    }

    /// Shallow-merge `partial` into the stage's block.
    ///
    /// Top-level keys of `partial` replace the stored keys. A stored block that
    /// is not a JSON object is replaced outright.
    pub fn merge_stage_data(&mut self, stage: Stage, partial: Map<String, Value>) {
        let block = self
            .stage_data
            .entry(stage)
            .or_insert_with(|| Value::Object(Map::new()));
        match block {
            Value::Object(existing) => {
                for (key, value) in partial {
                    existing.insert(key, value);
                }
            }
            other => *other = Value::Object(partial),
        }
        self.touch();
    }

    pub fn mark_completed(&mut self, stage: Stage) {
        if self.completed_stages.insert(stage) {
            self.touch();
        }
    }

    pub fn is_completed(&self, stage: Stage) -> bool {
        self.completed_stages.contains(&stage)
    }

    /// The stored block for `stage`, if any.
    pub fn stage_block(&self, stage: Stage) -> Option<&Value> {
        self.stage_data.get(&stage)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_session_starts_at_first_stage() {
        let session = Session::new(Some(ContentType::ShortVideo));
        assert_eq!(session.current_stage, Stage::Start);
        assert!(session.completed_stages.is_empty());
        assert!(session.stage_data.is_empty());
        assert_eq!(session.metadata.content_type, Some(ContentType::ShortVideo));
    }

    #[test]
    fn test_advance_records_previous_stage() {
        let mut session = Session::new(None);
        session.advance_to(Stage::Analyze);
        assert_eq!(session.current_stage, Stage::Analyze);
        assert!(session.is_completed(Stage::Start));
        assert!(!session.is_completed(Stage::Analyze));
    }

    #[test]
    fn test_advance_to_same_stage_is_noop() {
        let mut session = Session::new(None);
        session.advance_to(Stage::Start);
        assert!(session.completed_stages.is_empty());
    }

    #[test]
    fn test_apply_metadata_reports_change() {
        let mut session = Session::new(None);
        let patch = MetadataPatch {
            title: Some("Summer Tour".to_string()),
            content_type: None,
        };
        assert!(session.apply_metadata(patch.clone()));
        assert!(!session.apply_metadata(patch));
        assert_eq!(session.metadata.title, "Summer Tour");
    }

    #[test]
    fn test_merge_stage_data_is_shallow() {
        let mut session = Session::new(None);
        let first = json!({"script": "v1", "assets": [1]});
        session.merge_stage_data(Stage::Create, first.as_object().unwrap().clone());
        let second = json!({"script": "v2"});
        session.merge_stage_data(Stage::Create, second.as_object().unwrap().clone());

        let block = session.stage_block(Stage::Create).unwrap();
        assert_eq!(block["script"], "v2");
        assert_eq!(block["assets"], json!([1]));
    }

    #[test]
    fn test_merge_stage_data_replaces_non_object_block() {
        let mut session = Session::new(None);
        session.stage_data.insert(Stage::Analyze, json!("garbage"));
        let partial = json!({"insights": "fresh"});
        session.merge_stage_data(Stage::Analyze, partial.as_object().unwrap().clone());
        assert_eq!(session.stage_block(Stage::Analyze), Some(&partial));
    }

    #[test]
    fn test_session_json_keys_are_stage_names() {
        let mut session = Session::new(None);
        session.stage_data.insert(Stage::Publish, json!({"caption": "hi"}));
        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["stage_data"]["publish"]["caption"], "hi");
        let back: Session = serde_json::from_value(value).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn test_session_id_parse() {
        let id = SessionId::new();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<SessionId>().is_err());
    }

    #[test]
    fn test_content_type_from_str() {
        assert_eq!("video".parse::<ContentType>(), Ok(ContentType::ShortVideo));
        assert_eq!("short-video".parse::<ContentType>(), Ok(ContentType::ShortVideo));
        assert!("podcast".parse::<ContentType>().is_err());
    }
}
