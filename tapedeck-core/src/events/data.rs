//! Typed event payloads
//!
//! Media, message and conversation payloads use `snake_case` keys. Lifecycle
//! payloads (pipeline, provider, tool, stage, middleware, validation,
//! context/state) and custom payloads are written upstream with their field
//! names verbatim, so they use `PascalCase` keys. Every payload tolerates
//! missing fields.

use base64::Engine;
use chrono::Duration;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

macro_rules! event_data {
    ($($name:ident),* $(,)?) => {
        /// A decoded event payload
        #[derive(Debug, Clone, PartialEq, Serialize)]
        #[serde(untagged)]
        pub enum EventData {
            $($name($name)),*
        }

        impl EventData {
            /// Unprefixed discriminant, e.g. `events.AudioInputData`
            pub fn type_name(&self) -> &'static str {
                match self {
                    $(EventData::$name(_) => concat!("events.", stringify!($name))),*
                }
            }
        }

        $(
            impl From<$name> for EventData {
                fn from(data: $name) -> Self {
                    EventData::$name(data)
                }
            }
        )*
    };
}

event_data!(
    AudioInputData,
    AudioOutputData,
    AudioTranscriptionData,
    VideoFrameData,
    ScreenshotData,
    ImageInputData,
    ImageOutputData,
    MessageCreatedData,
    MessageUpdatedData,
    ConversationStartedData,
    PipelineStartedData,
    PipelineCompletedData,
    PipelineFailedData,
    ProviderCallStartedData,
    ProviderCallCompletedData,
    ProviderCallFailedData,
    ToolCallStartedData,
    ToolCallCompletedData,
    ToolCallFailedData,
    CustomEventData,
    StageStartedData,
    StageCompletedData,
    StageFailedData,
    MiddlewareStartedData,
    MiddlewareCompletedData,
    MiddlewareFailedData,
    ValidationStartedData,
    ValidationPassedData,
    ValidationFailedData,
    ContextBuiltData,
    TokenBudgetExceededData,
    StateLoadedData,
    StateSavedData,
    StreamInterruptedData,
);

impl EventData {
    /// Discriminant as written by the event store, e.g. `*events.AudioInputData`
    pub fn data_type(&self) -> String {
        format!("*{}", self.type_name())
    }

    /// Serialize the payload alone (no variant tag)
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// Binary media content, inline or stored externally
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinaryPayload {
    /// Reference into a blob store when the bytes are not inline
    #[serde(skip_serializing_if = "String::is_empty")]
    pub storage_ref: String,

    /// Inline bytes, base64 on the wire
    #[serde(
        serialize_with = "serialize_base64",
        deserialize_with = "deserialize_base64",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub inline_data: Vec<u8>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub mime_type: String,

    pub size: i64,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub checksum: String,
}

impl BinaryPayload {
    /// Inline payload of the given bytes
    pub fn inline(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            size: bytes.len() as i64,
            inline_data: bytes,
            mime_type: mime_type.into(),
            ..Default::default()
        }
    }

    pub fn is_inline(&self) -> bool {
        !self.inline_data.is_empty()
    }
}

fn serialize_base64<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
}

fn deserialize_base64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    base64::engine::general_purpose::STANDARD
        .decode(encoded.as_bytes())
        .map_err(serde::de::Error::custom)
}

/// Failure causes are emitted either as a message string or as an opaque
/// object; keep whatever text is there.
fn deserialize_error_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Object(map) if map.is_empty() => None,
        other => Some(other.to_string()),
    })
}

/// Audio format information
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioMetadata {
    pub sample_rate: i32,
    pub channels: i32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub encoding: String,
    pub duration_ms: i64,
}

/// Video format information
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoMetadata {
    pub width: i32,
    pub height: i32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub encoding: String,
    pub frame_rate: f64,
    pub duration_ms: i64,
}

/// Chunk of audio captured from the user or environment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioInputData {
    pub actor: String,
    pub chunk_index: i64,
    pub payload: BinaryPayload,
    pub metadata: AudioMetadata,
    pub is_final: bool,
}

/// Chunk of audio produced by the model or TTS
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioOutputData {
    pub chunk_index: i64,
    pub payload: BinaryPayload,
    pub metadata: AudioMetadata,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub generated_from: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioTranscriptionData {
    pub text: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub language: String,
    pub confidence: f64,
    pub is_final: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub actor: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoFrameData {
    pub frame_index: i64,
    pub payload: BinaryPayload,
    pub metadata: VideoMetadata,
    pub is_keyframe: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenshotData {
    pub payload: BinaryPayload,
    pub metadata: VideoMetadata,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageInputData {
    pub payload: BinaryPayload,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub actor: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageOutputData {
    pub payload: BinaryPayload,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub generated_from: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub prompt: String,
}

/// A message appended to the conversation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageCreatedData {
    pub role: String,
    pub content: String,
    pub index: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<Value>,
}

impl MessageCreatedData {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageUpdatedData {
    pub index: i64,
    pub latency_ms: i64,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub total_cost: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationStartedData {
    pub system_prompt: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct PipelineStartedData {
    pub middleware_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct PipelineCompletedData {
    #[serde(with = "crate::duration_nanos")]
    pub duration: Duration,
    pub total_cost: f64,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub message_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct PipelineFailedData {
    #[serde(deserialize_with = "deserialize_error_text")]
    pub error: Option<String>,
    #[serde(with = "crate::duration_nanos")]
    pub duration: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ProviderCallStartedData {
    pub provider: String,
    pub model: String,
    pub message_count: i64,
    pub tool_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ProviderCallCompletedData {
    pub provider: String,
    pub model: String,
    #[serde(with = "crate::duration_nanos")]
    pub duration: Duration,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cached_tokens: i64,
    pub cost: f64,
    pub finish_reason: String,
    pub tool_call_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ProviderCallFailedData {
    pub provider: String,
    pub model: String,
    #[serde(deserialize_with = "deserialize_error_text")]
    pub error: Option<String>,
    #[serde(with = "crate::duration_nanos")]
    pub duration: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ToolCallStartedData {
    pub tool_name: String,
    #[serde(rename = "CallID")]
    pub call_id: String,
    pub args: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ToolCallCompletedData {
    pub tool_name: String,
    #[serde(rename = "CallID")]
    pub call_id: String,
    #[serde(with = "crate::duration_nanos")]
    pub duration: Duration,
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ToolCallFailedData {
    pub tool_name: String,
    #[serde(rename = "CallID")]
    pub call_id: String,
    #[serde(deserialize_with = "deserialize_error_text")]
    pub error: Option<String>,
    #[serde(with = "crate::duration_nanos")]
    pub duration: Duration,
}

/// Escape hatch for events defined outside the core pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct CustomEventData {
    pub middleware_name: String,
    pub event_name: String,
    pub data: Map<String, Value>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct StageStartedData {
    pub name: String,
    pub index: i64,
    pub stage_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct StageCompletedData {
    pub name: String,
    pub index: i64,
    #[serde(with = "crate::duration_nanos")]
    pub duration: Duration,
    pub stage_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct StageFailedData {
    pub name: String,
    pub index: i64,
    #[serde(deserialize_with = "deserialize_error_text")]
    pub error: Option<String>,
    #[serde(with = "crate::duration_nanos")]
    pub duration: Duration,
    pub stage_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct MiddlewareStartedData {
    pub name: String,
    pub index: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct MiddlewareCompletedData {
    pub name: String,
    pub index: i64,
    #[serde(with = "crate::duration_nanos")]
    pub duration: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct MiddlewareFailedData {
    pub name: String,
    pub index: i64,
    #[serde(deserialize_with = "deserialize_error_text")]
    pub error: Option<String>,
    #[serde(with = "crate::duration_nanos")]
    pub duration: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ValidationStartedData {
    pub validator_name: String,
    pub validator_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ValidationPassedData {
    pub validator_name: String,
    pub validator_type: String,
    #[serde(with = "crate::duration_nanos")]
    pub duration: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ValidationFailedData {
    pub validator_name: String,
    pub validator_type: String,
    #[serde(deserialize_with = "deserialize_error_text")]
    pub error: Option<String>,
    #[serde(with = "crate::duration_nanos")]
    pub duration: Duration,
    pub violations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ContextBuiltData {
    pub message_count: i64,
    pub token_count: i64,
    pub token_budget: i64,
    pub truncated: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct TokenBudgetExceededData {
    pub required_tokens: i64,
    pub budget: i64,
    pub excess: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct StateLoadedData {
    #[serde(rename = "ConversationID")]
    pub conversation_id: String,
    pub message_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct StateSavedData {
    #[serde(rename = "ConversationID")]
    pub conversation_id: String,
    pub message_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct StreamInterruptedData {
    pub reason: String,
}
