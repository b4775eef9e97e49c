//! End-to-end tests: event store → export → disk → load → playback

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tapedeck_core::events::{
    AudioMetadata, AudioOutputData, BinaryPayload, PipelineStartedData, ProviderCallCompletedData,
};
use tapedeck_core::prelude::*;
use tapedeck_core::replay::{detect_dialect, Dialect};
use tempfile::TempDir;

fn session_start() -> DateTime<Utc> {
    "2025-03-14T09:30:00.125Z".parse().expect("valid timestamp")
}

async fn record_conversation(store: &InMemoryEventStore) -> Result<()> {
    let t0 = session_start();
    let at = |ms: i64| t0 + Duration::milliseconds(ms);

    let started = store
        .append(
            &Event::new(EventType::PIPELINE_STARTED, "voice-1")
                .with_timestamp(at(0))
                .with_run_id("run-1")
                .with_data(PipelineStartedData {
                    middleware_count: 3,
                }),
        )
        .await?;

    store
        .append_with_parent(
            &Event::new(EventType::MESSAGE_CREATED, "voice-1")
                .with_timestamp(at(120))
                .with_conversation_id("conv-1")
                .with_data(MessageCreatedData::new("user", "What's the weather?")),
            started,
        )
        .await?;

    store
        .append_with_parent(
            &Event::new(EventType::PROVIDER_CALL_COMPLETED, "voice-1")
                .with_timestamp(at(900))
                .with_data(ProviderCallCompletedData {
                    provider: "openai".to_string(),
                    model: "gpt-4o".to_string(),
                    duration: Duration::milliseconds(780),
                    input_tokens: 42,
                    output_tokens: 17,
                    ..Default::default()
                }),
            started,
        )
        .await?;

    for chunk in 0..3 {
        store
            .append(
                &Event::new(EventType::AUDIO_OUTPUT, "voice-1")
                    .with_timestamp(at(950 + chunk * 200))
                    .with_data(AudioOutputData {
                        chunk_index: chunk,
                        payload: BinaryPayload::inline(vec![chunk as u8; 320], "audio/pcm"),
                        metadata: AudioMetadata {
                            sample_rate: 24000,
                            channels: 1,
                            encoding: "pcm_linear16".to_string(),
                            duration_ms: 200,
                        },
                        ..Default::default()
                    }),
            )
            .await?;
    }

    store
        .append(
            &Event::new(EventType::MESSAGE_CREATED, "voice-1")
                .with_timestamp(at(1600))
                .with_conversation_id("conv-1")
                .with_data(MessageCreatedData::new("assistant", "Sunny, 21 degrees.")),
        )
        .await?;

    Ok(())
}

#[tokio::test]
async fn test_export_save_load_replay() {
    let store = InMemoryEventStore::new();
    record_conversation(&store).await.expect("record events");

    let recording = export(&store, "voice-1").await.expect("export");
    assert_eq!(recording.metadata.event_count, 7);
    assert_eq!(recording.metadata.conversation_id, "conv-1");
    assert_eq!(recording.duration(), Duration::milliseconds(1600));
    assert_eq!(recording.events[1].parent_sequence, 1);

    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("voice-1.jsonl");
    recording
        .save_to(&path, Format::JsonLines)
        .expect("save recording");
    let loaded = SessionRecording::load(&path).expect("load recording");
    assert_eq!(loaded, recording);

    let typed = loaded.to_typed_events().expect("typed events");
    assert!(matches!(
        typed[2].data,
        Some(EventData::ProviderCallCompletedData(ref d))
            if d.duration == Duration::milliseconds(780)
    ));

    let mut player = ReplayPlayer::new(loaded).expect("player");
    let early = player.advance(Duration::milliseconds(500));
    assert_eq!(early.len(), 2);

    let state = player.state_at(Duration::milliseconds(1000));
    assert_eq!(state.messages.len(), 1);
    assert!(!state.audio_input_active);

    let track = player
        .timeline()
        .track(TrackType::AudioOutput)
        .expect("audio output track");
    assert_eq!(track.segments.len(), 3);
    assert_eq!(track.total_duration, Duration::milliseconds(600));

    player.seek(player.duration());
    let end = player.state();
    assert_eq!(end.messages.len(), 2);
    assert_eq!(end.messages[1].role, "assistant");
    assert_eq!(player.format_position(), "00:01.600 / 00:01.600");
}

#[tokio::test]
async fn test_store_dump_replays_like_export() {
    let store = InMemoryEventStore::new();
    record_conversation(&store).await.expect("record events");

    let dir = TempDir::new().expect("temp dir");
    let dump = dir.path().join("dump.jsonl");
    store.dump_jsonl("voice-1", &dump).await.expect("dump");

    let raw = std::fs::read(&dump).expect("read dump");
    assert_eq!(detect_dialect(&raw), Dialect::EventStore);

    let from_dump = SessionRecording::load(&dump).expect("load dump");
    let exported = export(&store, "voice-1").await.expect("export");

    assert_eq!(from_dump.metadata.session_id, exported.metadata.session_id);
    assert_eq!(from_dump.metadata.duration, exported.metadata.duration);
    let offsets = |r: &SessionRecording| r.events.iter().map(|e| e.offset).collect::<Vec<_>>();
    assert_eq!(offsets(&from_dump), offsets(&exported));
}

#[test]
fn test_export_times_out_with_configured_deadline() {
    struct Stalled;

    #[async_trait::async_trait]
    impl EventStore for Stalled {
        async fn query_raw(&self, _filter: &EventFilter) -> Result<Vec<StoredEvent>> {
            std::future::pending::<Result<Vec<StoredEvent>>>().await
        }
    }

    let config = ExportConfig {
        query_timeout: Some(StdDuration::from_millis(20)),
    };
    let result = tokio_test::block_on(async {
        Exporter::with_config(&Stalled, config).export("any").await
    });
    assert!(matches!(result, Err(RecordingError::Timeout(_))));
}

#[test]
fn test_config_drives_save_and_playback() {
    let config = TapedeckConfig {
        playback: PlaybackConfig {
            event_tolerance: StdDuration::from_millis(500),
            ..Default::default()
        },
        storage: StorageConfig {
            default_format: Format::Json,
        },
        ..Default::default()
    };
    config.validate().expect("valid config");

    let store = InMemoryEventStore::new();
    let recording = tokio_test::block_on(async {
        record_conversation(&store).await?;
        export(&store, "voice-1").await
    })
    .expect("export");

    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("voice-1.json");
    recording.save(&path, &config.storage).expect("save");
    assert_eq!(
        detect_dialect(&std::fs::read(&path).expect("read")),
        Dialect::Json
    );

    let player = ReplayPlayer::with_config(
        SessionRecording::load(&path).expect("load"),
        &config.playback,
    )
    .expect("player");
    assert_eq!(player.state_at(Duration::milliseconds(400)).current_events.len(), 3);
}
