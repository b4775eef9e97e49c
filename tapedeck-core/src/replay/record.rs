//! Session recording types
//!
//! A [`SessionRecording`] is a self-contained snapshot of one session's
//! events: everything needed to replay it without the source event store.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::events::{deserialize_event_data, Event, EventData, EventType};
use crate::media::{BlobStore, MediaTimeline};

/// A complete recording: metadata plus events in ascending time order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecording {
    /// Session-level information
    pub metadata: Metadata,

    /// Events in ascending time order
    #[serde(default, deserialize_with = "nullable")]
    pub events: Vec<RecordedEvent>,
}

/// Session-level information
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    /// Session the events were exported from
    pub session_id: String,

    /// First conversation id seen among the events
    #[serde(skip_serializing_if = "String::is_empty")]
    pub conversation_id: String,

    /// Timestamp of the earliest event
    pub start_time: DateTime<Utc>,

    /// Timestamp of the latest event
    pub end_time: DateTime<Utc>,

    /// `end_time - start_time`
    #[serde(with = "crate::duration_nanos")]
    pub duration: Duration,

    /// Number of events in the recording
    pub event_count: usize,

    /// LLM provider used (e.g. "openai", "gemini")
    #[serde(skip_serializing_if = "String::is_empty")]
    pub provider_name: String,

    /// Model used (e.g. "gpt-4o")
    #[serde(skip_serializing_if = "String::is_empty")]
    pub model: String,

    /// Recording format version
    pub version: String,

    /// When this recording was exported
    pub created_at: DateTime<Utc>,

    /// Free-form caller metadata
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub custom: Map<String, Value>,
}

/// An event as captured in a recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// Store-assigned sequence number
    #[serde(rename = "seq", default)]
    pub sequence: i64,

    /// Causal parent, 0 when none
    #[serde(rename = "parent_seq", default, skip_serializing_if = "is_zero")]
    pub parent_sequence: i64,

    /// Event kind (e.g. "message.created")
    #[serde(rename = "type")]
    pub event_type: EventType,

    /// When the event occurred
    #[serde(default)]
    pub timestamp: DateTime<Utc>,

    /// Time since session start
    #[serde(with = "crate::duration_nanos", default)]
    pub offset: Duration,

    /// Session the event belongs to
    #[serde(default)]
    pub session_id: String,

    /// Conversation within the session, if any
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub conversation_id: String,

    /// Pipeline run that emitted the event, if any
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub run_id: String,

    /// Discriminant naming the payload shape
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data_type: String,

    /// Payload as raw JSON, decoded on demand
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl RecordedEvent {
    /// Whether there is a payload worth decoding
    pub fn has_data(&self) -> bool {
        !self.data_type.is_empty() && self.data.as_ref().is_some_and(|d| !d.is_null())
    }

    /// Decode the payload through the registry.
    ///
    /// `Ok(None)` when there is no payload or its discriminant is unknown.
    pub fn decode_data(&self) -> Result<Option<EventData>> {
        match &self.data {
            Some(raw) if self.has_data() => deserialize_event_data(&self.data_type, raw),
            _ => Ok(None),
        }
    }

    fn envelope(&self) -> Event {
        Event {
            event_type: self.event_type.clone(),
            timestamp: self.timestamp,
            session_id: self.session_id.clone(),
            conversation_id: self.conversation_id.clone(),
            run_id: self.run_id.clone(),
            data: None,
        }
    }
}

impl SessionRecording {
    /// Total recording length
    pub fn duration(&self) -> Duration {
        self.metadata.duration
    }

    /// Envelope-only events, payloads left empty
    pub fn to_events(&self) -> Vec<Event> {
        self.events.iter().map(RecordedEvent::envelope).collect()
    }

    /// Events with payloads decoded into their typed shapes.
    ///
    /// An event whose payload fails to decode keeps an empty payload and the
    /// rest of the batch is still converted; a single unreadable event must
    /// not make the recording unusable. Callers needing a payload kind check
    /// for `None` themselves.
    pub fn to_typed_events(&self) -> Result<Vec<Event>> {
        let mut result = Vec::with_capacity(self.events.len());

        for recorded in &self.events {
            let mut event = recorded.envelope();
            event.data = match recorded.decode_data() {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!(
                        seq = recorded.sequence,
                        data_type = %recorded.data_type,
                        error = %e,
                        "Dropping undecodable event payload"
                    );
                    None
                }
            };
            result.push(event);
        }

        Ok(result)
    }

    /// Media timeline for audio/video reconstruction. `blob_store` is only
    /// needed for payloads that are not inline.
    pub fn to_media_timeline(
        &self,
        blob_store: Option<Arc<dyn BlobStore>>,
    ) -> Result<MediaTimeline> {
        let typed = self.to_typed_events()?;
        Ok(MediaTimeline::new(
            self.metadata.session_id.clone(),
            &typed,
            blob_store,
        ))
    }
}

impl fmt::Display for SessionRecording {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let duration = self
            .metadata
            .duration
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);
        write!(
            f,
            "SessionRecording{{session={}, events={}, duration={:?}}}",
            self.metadata.session_id, self.metadata.event_count, duration
        )
    }
}
