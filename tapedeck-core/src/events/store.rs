//! Event store interface and an in-memory implementation

use std::io::Write;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{Event, EventType, RawEvent};
use crate::error::{RecordingError, Result};

/// An event as persisted by an append-only store.
///
/// This is also the line shape of the store's JSON-Lines dump:
/// `{"seq":N,"parent_id":M,"event":{...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Store-assigned sequence number (unique, not necessarily contiguous)
    #[serde(rename = "seq")]
    pub sequence: i64,

    /// Causal parent, 0 when none
    #[serde(default, skip_serializing_if = "is_zero")]
    pub parent_id: i64,

    pub event: RawEvent,
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

/// Query filter for [`EventStore::query_raw`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub session_id: String,

    /// Restrict to one conversation
    pub conversation_id: Option<String>,

    /// Restrict to these kinds (empty means all)
    pub event_types: Vec<EventType>,
}

impl EventFilter {
    pub fn session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Default::default()
        }
    }

    fn matches(&self, event: &RawEvent) -> bool {
        if event.session_id != self.session_id {
            return false;
        }
        if let Some(conversation_id) = &self.conversation_id {
            if &event.conversation_id != conversation_id {
                return false;
            }
        }
        self.event_types.is_empty() || self.event_types.contains(&event.event_type)
    }
}

/// Source of raw session events.
///
/// No ordering guarantee is made on the returned events.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn query_raw(&self, filter: &EventFilter) -> Result<Vec<StoredEvent>>;
}

/// Append-only event store held in memory
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: RwLock<Vec<StoredEvent>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, returning its assigned sequence number
    pub async fn append(&self, event: &Event) -> Result<i64> {
        self.append_with_parent(event, 0).await
    }

    /// Append an event caused by the event with sequence `parent_id`
    pub async fn append_with_parent(&self, event: &Event, parent_id: i64) -> Result<i64> {
        let raw = event.to_raw()?;
        Ok(self.append_raw(raw, parent_id).await)
    }

    /// Append an already-serialized event
    pub async fn append_raw(&self, event: RawEvent, parent_id: i64) -> i64 {
        let mut events = self.events.write().await;
        let sequence = events.last().map_or(1, |e| e.sequence + 1);
        events.push(StoredEvent {
            sequence,
            parent_id,
            event,
        });
        sequence
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }

    /// Write one session's events as JSON-Lines in append order
    pub async fn dump_jsonl(&self, session_id: &str, path: impl AsRef<Path>) -> Result<()> {
        let filter = EventFilter::session(session_id);
        let events = self.events.read().await;

        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        for stored in events.iter().filter(|e| filter.matches(&e.event)) {
            writeln!(writer, "{}", serde_json::to_string(stored)?)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn query_raw(&self, filter: &EventFilter) -> Result<Vec<StoredEvent>> {
        if filter.session_id.is_empty() {
            return Err(RecordingError::Store(
                "query requires a session id".to_string(),
            ));
        }

        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|e| filter.matches(&e.event))
            .cloned()
            .collect())
    }
}
