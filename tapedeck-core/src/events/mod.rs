//! Session events as produced by the live pipeline
//!
//! An [`Event`] is the typed envelope consumers work with; [`RawEvent`] is
//! the wire form an [`EventStore`] hands back, with the payload still as
//! untyped JSON plus a discriminant naming its shape.
//!
//! # Example
//!
//! ```rust,ignore
//! use tapedeck_core::events::{Event, EventType, InMemoryEventStore, MessageCreatedData};
//!
//! let store = InMemoryEventStore::new();
//! store
//!     .append(&Event::new(EventType::MESSAGE_CREATED, "session-1").with_data(
//!         MessageCreatedData::new("user", "Hello!"),
//!     ))
//!     .await?;
//! ```

mod data;
mod registry;
mod store;

pub use data::{
    AudioInputData, AudioMetadata, AudioOutputData, AudioTranscriptionData, BinaryPayload,
    ContextBuiltData, ConversationStartedData, CustomEventData, EventData, ImageInputData,
    ImageOutputData, MessageCreatedData, MessageUpdatedData, MiddlewareCompletedData,
    MiddlewareFailedData, MiddlewareStartedData, PipelineCompletedData, PipelineFailedData,
    PipelineStartedData, ProviderCallCompletedData, ProviderCallFailedData,
    ProviderCallStartedData, ScreenshotData, StageCompletedData, StageFailedData,
    StageStartedData, StateLoadedData, StateSavedData, StreamInterruptedData,
    TokenBudgetExceededData, ToolCallCompletedData, ToolCallFailedData, ToolCallStartedData,
    ValidationFailedData, ValidationPassedData, ValidationStartedData, VideoFrameData,
    VideoMetadata,
};
pub use registry::{canonical_data_type, deserialize_event_data, is_known_data_type};
pub use store::{EventFilter, EventStore, InMemoryEventStore, StoredEvent};

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event kind tag (`"message.created"`, `"audio.input"`, ...)
///
/// The set is open: recordings may carry kinds this build has never heard
/// of, so this is a string newtype rather than a closed enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(Cow<'static, str>);

impl EventType {
    pub const PIPELINE_STARTED: EventType = EventType::from_static("pipeline.started");
    pub const PIPELINE_COMPLETED: EventType = EventType::from_static("pipeline.completed");
    pub const PIPELINE_FAILED: EventType = EventType::from_static("pipeline.failed");

    pub const MIDDLEWARE_STARTED: EventType = EventType::from_static("middleware.started");
    pub const MIDDLEWARE_COMPLETED: EventType = EventType::from_static("middleware.completed");
    pub const MIDDLEWARE_FAILED: EventType = EventType::from_static("middleware.failed");

    pub const STAGE_STARTED: EventType = EventType::from_static("stage.started");
    pub const STAGE_COMPLETED: EventType = EventType::from_static("stage.completed");
    pub const STAGE_FAILED: EventType = EventType::from_static("stage.failed");

    pub const PROVIDER_CALL_STARTED: EventType = EventType::from_static("provider.call.started");
    pub const PROVIDER_CALL_COMPLETED: EventType =
        EventType::from_static("provider.call.completed");
    pub const PROVIDER_CALL_FAILED: EventType = EventType::from_static("provider.call.failed");

    pub const TOOL_CALL_STARTED: EventType = EventType::from_static("tool.call.started");
    pub const TOOL_CALL_COMPLETED: EventType = EventType::from_static("tool.call.completed");
    pub const TOOL_CALL_FAILED: EventType = EventType::from_static("tool.call.failed");

    pub const VALIDATION_STARTED: EventType = EventType::from_static("validation.started");
    pub const VALIDATION_PASSED: EventType = EventType::from_static("validation.passed");
    pub const VALIDATION_FAILED: EventType = EventType::from_static("validation.failed");

    pub const CONTEXT_BUILT: EventType = EventType::from_static("context.built");
    pub const TOKEN_BUDGET_EXCEEDED: EventType =
        EventType::from_static("context.token_budget_exceeded");
    pub const STATE_LOADED: EventType = EventType::from_static("state.loaded");
    pub const STATE_SAVED: EventType = EventType::from_static("state.saved");
    pub const STREAM_INTERRUPTED: EventType = EventType::from_static("stream.interrupted");

    pub const MESSAGE_CREATED: EventType = EventType::from_static("message.created");
    pub const MESSAGE_UPDATED: EventType = EventType::from_static("message.updated");
    pub const CONVERSATION_STARTED: EventType = EventType::from_static("conversation.started");

    pub const AUDIO_INPUT: EventType = EventType::from_static("audio.input");
    pub const AUDIO_OUTPUT: EventType = EventType::from_static("audio.output");
    pub const AUDIO_TRANSCRIPTION: EventType = EventType::from_static("audio.transcription");
    pub const VIDEO_FRAME: EventType = EventType::from_static("video.frame");
    pub const SCREENSHOT: EventType = EventType::from_static("screenshot");
    pub const IMAGE_INPUT: EventType = EventType::from_static("image.input");
    pub const IMAGE_OUTPUT: EventType = EventType::from_static("image.output");

    const fn from_static(s: &'static str) -> Self {
        EventType(Cow::Borrowed(s))
    }

    /// Create an event type from an arbitrary tag
    pub fn new(s: impl Into<String>) -> Self {
        EventType(Cow::Owned(s.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        EventType::new(s)
    }
}

impl From<String> for EventType {
    fn from(s: String) -> Self {
        EventType::new(s)
    }
}

/// A session event with a typed payload
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event kind
    pub event_type: EventType,

    /// When the event occurred
    pub timestamp: DateTime<Utc>,

    /// Session the event belongs to
    pub session_id: String,

    /// Conversation within the session (empty when unknown)
    pub conversation_id: String,

    /// Run/request that produced the event (empty when unknown)
    pub run_id: String,

    /// Typed payload, `None` when absent or not reconstructible
    pub data: Option<EventData>,
}

impl Event {
    /// Create an event stamped with the current time
    pub fn new(event_type: EventType, session_id: impl Into<String>) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            session_id: session_id.into(),
            conversation_id: String::new(),
            run_id: String::new(),
            data: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = conversation_id.into();
        self
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn with_data(mut self, data: impl Into<EventData>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Convert to the wire form, serializing the payload
    pub fn to_raw(&self) -> serde_json::Result<RawEvent> {
        let (data_type, data) = match &self.data {
            Some(d) => (d.data_type(), Some(d.to_value()?)),
            None => (String::new(), None),
        };

        Ok(RawEvent {
            event_type: self.event_type.clone(),
            timestamp: self.timestamp,
            run_id: self.run_id.clone(),
            session_id: self.session_id.clone(),
            conversation_id: self.conversation_id.clone(),
            data_type,
            data,
        })
    }
}

/// Wire form of an event, with the payload kept as raw JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,

    pub timestamp: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub run_id: String,

    #[serde(default)]
    pub session_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub conversation_id: String,

    /// Discriminant naming the payload shape (e.g. `*events.AudioInputData`)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_constants_compare_with_owned() {
        assert_eq!(EventType::MESSAGE_CREATED, EventType::new("message.created"));
        assert_ne!(EventType::AUDIO_INPUT, EventType::AUDIO_OUTPUT);
        assert_eq!(EventType::PROVIDER_CALL_STARTED.to_string(), "provider.call.started");
    }

    #[test]
    fn test_event_type_serializes_as_plain_string() {
        let json = serde_json::to_string(&EventType::AUDIO_INPUT).unwrap();
        assert_eq!(json, r#""audio.input""#);

        let parsed: EventType = serde_json::from_str(r#""arena.turn.scored""#).unwrap();
        assert_eq!(parsed.as_str(), "arena.turn.scored");
    }

    #[test]
    fn test_to_raw_writes_pointer_discriminant() {
        let event = Event::new(EventType::MESSAGE_CREATED, "s1")
            .with_conversation_id("conv-1")
            .with_data(MessageCreatedData::new("user", "hi"));

        let raw = event.to_raw().unwrap();
        assert_eq!(raw.data_type, "*events.MessageCreatedData");
        assert_eq!(raw.conversation_id, "conv-1");
        let data = raw.data.unwrap();
        assert_eq!(data["role"], "user");
        assert_eq!(data["content"], "hi");
    }

    #[test]
    fn test_raw_event_omits_empty_fields() {
        let raw = Event::new(EventType::PIPELINE_STARTED, "s1").to_raw().unwrap();
        let value = serde_json::to_value(&raw).unwrap();
        assert!(value.get("run_id").is_none());
        assert!(value.get("data_type").is_none());
        assert!(value.get("data").is_none());
        assert_eq!(value["type"], "pipeline.started");
    }
}
