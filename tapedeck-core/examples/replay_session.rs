//! Replay session example
//!
//! Records a short voice conversation into an in-memory event store, exports
//! it, saves it to disk and steps through it with the replay player.
//!
//! Usage: `cargo run --example replay_session [output-path]`

use chrono::{Duration, Utc};
use tapedeck_core::annotations::{Annotation, Target};
use tapedeck_core::events::{AudioInputData, AudioMetadata, BinaryPayload, ToolCallStartedData};
use tapedeck_core::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = TapedeckConfig::load()?;

    println!("📼 Replay Session Example");
    println!("=========================\n");

    let store = InMemoryEventStore::new();
    let t0 = Utc::now();
    let at = |ms: i64| t0 + Duration::milliseconds(ms);

    store
        .append(
            &Event::new(EventType::AUDIO_INPUT, "demo")
                .with_timestamp(at(0))
                .with_data(AudioInputData {
                    actor: "user".to_string(),
                    chunk_index: 0,
                    payload: BinaryPayload::inline(vec![0; 640], "audio/pcm"),
                    metadata: AudioMetadata {
                        sample_rate: 16000,
                        channels: 1,
                        encoding: "pcm_linear16".to_string(),
                        duration_ms: 400,
                    },
                    is_final: true,
                }),
        )
        .await?;
    let question = store
        .append(
            &Event::new(EventType::MESSAGE_CREATED, "demo")
                .with_timestamp(at(450))
                .with_data(MessageCreatedData::new("user", "Book a table for two")),
        )
        .await?;
    store
        .append_with_parent(
            &Event::new(EventType::TOOL_CALL_STARTED, "demo")
                .with_timestamp(at(1200))
                .with_data(ToolCallStartedData {
                    tool_name: "reserve_table".to_string(),
                    call_id: "call-1".to_string(),
                    ..Default::default()
                }),
            question,
        )
        .await?;
    store
        .append(
            &Event::new(EventType::MESSAGE_CREATED, "demo")
                .with_timestamp(at(2500))
                .with_data(MessageCreatedData::new("assistant", "Done, 7pm tonight.")),
        )
        .await?;

    let recording = Exporter::with_config(&store, config.export.clone())
        .export_with_options(
            "demo",
            ExportOptions {
                provider_name: "openai".to_string(),
                model: "gpt-4o-realtime".to_string(),
                ..Default::default()
            },
        )
        .await?;
    println!("✓ Exported {}", recording);

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| format!("demo.{}", config.storage.default_format));
    recording.save(&path, &config.storage)?;
    println!("✓ Saved to {}\n", path);

    let mut player = ReplayPlayer::with_config(SessionRecording::load(&path)?, &config.playback)?;
    player.set_annotations(vec![
        Annotation::new("score", "task_success", Target::session()).with_value(1.0),
        Annotation::new("label", "tool_use", Target::event(question + 1)),
    ]);

    while player.position() < player.duration() {
        let passed: Vec<String> = player
            .advance(Duration::milliseconds(500))
            .iter()
            .map(|e| format!("{} (seq {})", e.event_type, e.sequence))
            .collect();
        let state = player.state();

        println!("[{}]", player.format_position());
        for line in passed {
            println!("  • {}", line);
        }
        if state.audio_input_active {
            println!("  🎙  user speaking");
        }
        for annotation in &state.active_annotations {
            println!("  🏷  {} = {}", annotation.key, annotation.value);
        }
    }

    println!("\nConversation:");
    for message in player.state().messages {
        println!("  {}: {}", message.role, message.content);
    }

    Ok(())
}
