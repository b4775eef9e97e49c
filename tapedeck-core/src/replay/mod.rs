//! Session recording and replay
//!
//! A session's events are exported from an [`EventStore`](crate::events::EventStore)
//! into a self-contained [`SessionRecording`], saved to disk as JSON or
//! JSON-Lines, loaded back, and played with a seekable [`ReplayPlayer`].
//!
//! # Example
//!
//! ```rust,no_run
//! use tapedeck_core::events::InMemoryEventStore;
//! use tapedeck_core::replay::{self, Format, ReplayPlayer, SessionRecording};
//! use chrono::Duration;
//!
//! # async fn run(store: InMemoryEventStore) -> tapedeck_core::error::Result<()> {
//! let recording = replay::export(&store, "session_123").await?;
//! recording.save_to("session_123.jsonl", Format::JsonLines)?;
//!
//! let loaded = SessionRecording::load("session_123.jsonl")?;
//! let mut player = ReplayPlayer::new(loaded)?;
//! for event in player.advance(Duration::seconds(5)) {
//!     println!("{} {}", event.offset, event.event_type);
//! }
//! println!("{}", player.format_position());
//! # Ok(())
//! # }
//! ```

mod export;
mod format;
mod player;
mod record;

pub use export::{export, export_with_options, ExportOptions, Exporter};
pub use format::{detect_dialect, load, Dialect, Format};
pub use player::{format_duration, EventIterator, MessageSnapshot, PlaybackState, ReplayPlayer};
pub use record::{Metadata, RecordedEvent, SessionRecording};

/// Version written into every recording's metadata
pub const RECORDING_VERSION: &str = "1.0";
