//! # Tapedeck - Session Recording and Replay
//!
//! Tapedeck turns the event log of a conversational AI session into a
//! portable recording and plays it back:
//! - Export a session from an event store into a self-contained recording
//! - Save and load recordings as JSON or JSON-Lines
//! - Decode event payloads into typed structures through a central registry
//! - Seek, step and query a recording on its own timeline
//! - Reconstruct audio and video tracks and correlate annotations
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tapedeck_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let store = InMemoryEventStore::new();
//!     store
//!         .append(&Event::new(EventType::MESSAGE_CREATED, "s1")
//!             .with_data(MessageCreatedData::new("user", "hello")))
//!         .await?;
//!
//!     let recording = export(&store, "s1").await?;
//!     recording.save_to("s1.jsonl", Format::JsonLines)?;
//!
//!     let player = ReplayPlayer::new(SessionRecording::load("s1.jsonl")?)?;
//!     println!("{}", player.format_position());
//!     Ok(())
//! }
//! ```

pub mod annotations;
pub mod config;
pub mod duration_nanos;
pub mod error;
pub mod events;
pub mod media;
pub mod replay;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::annotations::{Annotation, Target, TargetKind};
    pub use crate::config::{ExportConfig, PlaybackConfig, StorageConfig, TapedeckConfig};
    pub use crate::error::{RecordingError, Result};
    pub use crate::events::{
        Event, EventData, EventFilter, EventStore, EventType, InMemoryEventStore,
        MessageCreatedData, RawEvent, StoredEvent,
    };
    pub use crate::media::{BlobStore, MediaTimeline, MediaTrack, TrackType};
    pub use crate::replay::{
        export, export_with_options, ExportOptions, Exporter, Format, PlaybackState,
        RecordedEvent, ReplayPlayer, SessionRecording,
    };
}
