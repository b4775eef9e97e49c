//! Annotations attached to a recorded session
//!
//! Annotations are produced outside this crate (reviewers, evaluators,
//! labelling tools); only the shape needed to correlate them with playback
//! lives here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What an annotation refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Session,
    TimeRange,
    Event,
    Turn,
    Message,
}

/// Scope of an annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    #[serde(rename = "type")]
    pub kind: TargetKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    /// Sequence of the annotated event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_sequence: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_index: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

impl Target {
    fn of_kind(kind: TargetKind) -> Self {
        Self {
            kind,
            start_time: None,
            end_time: None,
            event_sequence: None,
            turn_index: None,
            message_id: None,
        }
    }

    pub fn session() -> Self {
        Self::of_kind(TargetKind::Session)
    }

    pub fn time_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start_time: Some(start),
            end_time: Some(end),
            ..Self::of_kind(TargetKind::TimeRange)
        }
    }

    pub fn event(sequence: i64) -> Self {
        Self {
            event_sequence: Some(sequence),
            ..Self::of_kind(TargetKind::Event)
        }
    }

    pub fn turn(index: u32) -> Self {
        Self {
            turn_index: Some(index),
            ..Self::of_kind(TargetKind::Turn)
        }
    }

    pub fn message(id: impl Into<String>) -> Self {
        Self {
            message_id: Some(id.into()),
            ..Self::of_kind(TargetKind::Message)
        }
    }
}

/// A label, score or comment on part of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: String,

    /// Annotation category (`score`, `label`, `comment`, ...)
    #[serde(rename = "type")]
    pub annotation_type: String,

    pub key: String,

    #[serde(default)]
    pub value: Value,

    pub target: Target,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,

    pub created_at: DateTime<Utc>,
}

impl Annotation {
    pub fn new(
        annotation_type: impl Into<String>,
        key: impl Into<String>,
        target: Target,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            annotation_type: annotation_type.into(),
            key: key.into(),
            value: Value::Null,
            target,
            metadata: Map::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }
}
