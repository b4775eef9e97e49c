//! Discriminant → payload decoder table
//!
//! This table is the forward-compatibility surface of the recording format:
//! a discriminant listed here must keep decoding for as long as recordings
//! carrying it exist, and anything not listed loads with an empty payload.
//! Keep additions here, in one place.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::data::*;
use crate::error::{RecordingError, Result};

type Decoder = fn(&Value) -> serde_json::Result<EventData>;

fn decode<T>(raw: &Value) -> serde_json::Result<EventData>
where
    T: DeserializeOwned + Into<EventData>,
{
    T::deserialize(raw).map(Into::into)
}

static REGISTRY: Lazy<HashMap<&'static str, Decoder>> = Lazy::new(|| {
    let mut registry: HashMap<&'static str, Decoder> = HashMap::new();

    // Media
    registry.insert("events.AudioInputData", decode::<AudioInputData> as Decoder);
    registry.insert("events.AudioOutputData", decode::<AudioOutputData> as Decoder);
    registry.insert("events.AudioTranscriptionData", decode::<AudioTranscriptionData> as Decoder);
    registry.insert("events.VideoFrameData", decode::<VideoFrameData> as Decoder);
    registry.insert("events.ScreenshotData", decode::<ScreenshotData> as Decoder);
    registry.insert("events.ImageInputData", decode::<ImageInputData> as Decoder);
    registry.insert("events.ImageOutputData", decode::<ImageOutputData> as Decoder);
    // Messages
    registry.insert("events.MessageCreatedData", decode::<MessageCreatedData> as Decoder);
    registry.insert("events.MessageUpdatedData", decode::<MessageUpdatedData> as Decoder);
    registry.insert("events.ConversationStartedData", decode::<ConversationStartedData> as Decoder);
    // Pipeline
    registry.insert("events.PipelineStartedData", decode::<PipelineStartedData> as Decoder);
    registry.insert("events.PipelineCompletedData", decode::<PipelineCompletedData> as Decoder);
    registry.insert("events.PipelineFailedData", decode::<PipelineFailedData> as Decoder);
    // Provider
    registry.insert("events.ProviderCallStartedData", decode::<ProviderCallStartedData> as Decoder);
    registry.insert(
        "events.ProviderCallCompletedData",
        decode::<ProviderCallCompletedData> as Decoder,
    );
    registry.insert("events.ProviderCallFailedData", decode::<ProviderCallFailedData> as Decoder);
    // Tools
    registry.insert("events.ToolCallStartedData", decode::<ToolCallStartedData> as Decoder);
    registry.insert("events.ToolCallCompletedData", decode::<ToolCallCompletedData> as Decoder);
    registry.insert("events.ToolCallFailedData", decode::<ToolCallFailedData> as Decoder);
    registry.insert("events.CustomEventData", decode::<CustomEventData> as Decoder);
    // Stages
    registry.insert("events.StageStartedData", decode::<StageStartedData> as Decoder);
    registry.insert("events.StageCompletedData", decode::<StageCompletedData> as Decoder);
    registry.insert("events.StageFailedData", decode::<StageFailedData> as Decoder);
    // Middleware
    registry.insert("events.MiddlewareStartedData", decode::<MiddlewareStartedData> as Decoder);
    registry.insert("events.MiddlewareCompletedData", decode::<MiddlewareCompletedData> as Decoder);
    registry.insert("events.MiddlewareFailedData", decode::<MiddlewareFailedData> as Decoder);
    // Validation
    registry.insert("events.ValidationStartedData", decode::<ValidationStartedData> as Decoder);
    registry.insert("events.ValidationPassedData", decode::<ValidationPassedData> as Decoder);
    registry.insert("events.ValidationFailedData", decode::<ValidationFailedData> as Decoder);
    // Context and state
    registry.insert("events.ContextBuiltData", decode::<ContextBuiltData> as Decoder);
    registry.insert("events.TokenBudgetExceededData", decode::<TokenBudgetExceededData> as Decoder);
    registry.insert("events.StateLoadedData", decode::<StateLoadedData> as Decoder);
    registry.insert("events.StateSavedData", decode::<StateSavedData> as Decoder);
    registry.insert("events.StreamInterruptedData", decode::<StreamInterruptedData> as Decoder);

    registry
});

/// Strip the pointer sigil so `*events.X` and `events.X` share one key
pub fn canonical_data_type(data_type: &str) -> &str {
    data_type.trim_start_matches('*')
}

/// Whether this build knows how to decode the discriminant
pub fn is_known_data_type(data_type: &str) -> bool {
    REGISTRY.contains_key(canonical_data_type(data_type))
}

/// Decode a raw payload according to its discriminant.
///
/// Unknown discriminants yield `Ok(None)`: recordings made by newer or older
/// builds must stay loadable. A known discriminant whose payload does not fit
/// the target shape is a [`RecordingError::Decode`].
pub fn deserialize_event_data(data_type: &str, raw: &Value) -> Result<Option<EventData>> {
    let Some(decoder) = REGISTRY.get(canonical_data_type(data_type)) else {
        return Ok(None);
    };

    decoder(raw)
        .map(Some)
        .map_err(|source| RecordingError::Decode {
            data_type: data_type.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sigil_and_plain_forms_resolve_to_same_decoder() {
        let with_sigil = deserialize_event_data(
            "*events.AudioInputData",
            &json!({"actor": "user", "chunk_index": 1}),
        )
        .unwrap();
        let plain = deserialize_event_data(
            "events.AudioInputData",
            &json!({"actor": "assistant", "chunk_index": 2}),
        )
        .unwrap();

        match (with_sigil, plain) {
            (Some(EventData::AudioInputData(a)), Some(EventData::AudioInputData(b))) => {
                assert_eq!(a.actor, "user");
                assert_eq!(a.chunk_index, 1);
                assert_eq!(b.actor, "assistant");
            }
            other => panic!("expected two AudioInputData payloads, got {:?}", other),
        }
    }

    #[test]
    fn test_lifecycle_payloads_decode() {
        let stage = deserialize_event_data(
            "*events.StageStartedData",
            &json!({"Name": "test-stage", "StageType": "provider"}),
        )
        .unwrap();
        assert!(matches!(
            stage,
            Some(EventData::StageStartedData(ref s))
                if s.name == "test-stage" && s.stage_type == "provider"
        ));

        let validation = deserialize_event_data(
            "*events.ValidationStartedData",
            &json!({"ValidatorName": "schema-validator"}),
        )
        .unwrap();
        assert!(matches!(
            validation,
            Some(EventData::ValidationStartedData(ref v)) if v.validator_name == "schema-validator"
        ));

        let context =
            deserialize_event_data("*events.ContextBuiltData", &json!({"TokenCount": 1000}))
                .unwrap();
        assert!(matches!(
            context,
            Some(EventData::ContextBuiltData(ref c)) if c.token_count == 1000
        ));
    }

    #[test]
    fn test_unknown_type_is_not_an_error() {
        let result = deserialize_event_data("*events.NotYetKnown", &json!({"foo": "bar"})).unwrap();
        assert!(result.is_none());
        assert!(!is_known_data_type("*events.NotYetKnown"));
    }

    #[test]
    fn test_known_type_with_wrong_shape_is_decode_error() {
        let err = deserialize_event_data("*events.AudioInputData", &json!("not an object"))
            .unwrap_err();
        assert!(matches!(
            err,
            RecordingError::Decode { ref data_type, .. } if data_type == "*events.AudioInputData"
        ));
        assert!(err.to_string().contains("unmarshal"));
    }

    #[test]
    fn test_every_variant_round_trips_through_its_discriminant() {
        let samples: Vec<EventData> = vec![
            AudioOutputData::default().into(),
            MessageCreatedData::new("user", "hi").into(),
            ToolCallFailedData::default().into(),
            StreamInterruptedData {
                reason: "error".to_string(),
            }
            .into(),
        ];

        for sample in samples {
            let data_type = sample.data_type();
            assert!(is_known_data_type(&data_type), "{} not registered", data_type);
            let decoded = deserialize_event_data(&data_type, &sample.to_value().unwrap())
                .unwrap()
                .unwrap();
            assert_eq!(decoded, sample);
        }
    }
}
