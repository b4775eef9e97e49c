//! Building recordings from a live event store

use chrono::Utc;
use serde_json::{Map, Value};

use super::record::{Metadata, RecordedEvent, SessionRecording};
use super::RECORDING_VERSION;
use crate::config::ExportConfig;
use crate::error::{RecordingError, Result};
use crate::events::{EventFilter, EventStore};

/// Extra metadata applied by [`Exporter::export_with_options`]
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// LLM provider to record (e.g. "openai")
    pub provider_name: String,

    /// Model to record (e.g. "gpt-4o")
    pub model: String,

    /// Extra key/value metadata stored with the recording
    pub custom: Map<String, Value>,
}

/// Exports sessions from an [`EventStore`]
pub struct Exporter<'a> {
    store: &'a dyn EventStore,
    config: ExportConfig,
}

impl<'a> Exporter<'a> {
    pub fn new(store: &'a dyn EventStore) -> Self {
        Self::with_config(store, ExportConfig::default())
    }

    pub fn with_config(store: &'a dyn EventStore, config: ExportConfig) -> Self {
        Self { store, config }
    }

    /// Export every stored event of `session_id` into a recording.
    ///
    /// Events are ordered by timestamp, ties broken by sequence number.
    /// Fails with [`RecordingError::NotFound`] when the session has no events.
    pub async fn export(&self, session_id: &str) -> Result<SessionRecording> {
        let filter = EventFilter::session(session_id);
        let query = self.store.query_raw(&filter);

        let mut stored = match self.config.query_timeout {
            Some(limit) => tokio::time::timeout(limit, query).await.map_err(|_| {
                RecordingError::Timeout(format!(
                    "query events for session {} exceeded {:?}",
                    session_id, limit
                ))
            })?,
            None => query.await,
        }
        .map_err(|e| RecordingError::Store(format!("query events: {}", e)))?;

        if stored.is_empty() {
            return Err(RecordingError::NotFound(format!(
                "no events found for session {}",
                session_id
            )));
        }

        stored.sort_by(|a, b| {
            a.event
                .timestamp
                .cmp(&b.event.timestamp)
                .then(a.sequence.cmp(&b.sequence))
        });

        let session_start = stored[0].event.timestamp;
        let session_end = stored[stored.len() - 1].event.timestamp;

        let mut metadata = Metadata {
            session_id: session_id.to_string(),
            start_time: session_start,
            end_time: session_end,
            duration: session_end - session_start,
            event_count: stored.len(),
            version: RECORDING_VERSION.to_string(),
            created_at: Utc::now(),
            ..Default::default()
        };

        let mut events = Vec::with_capacity(stored.len());
        for se in stored {
            let e = se.event;

            if metadata.conversation_id.is_empty() && !e.conversation_id.is_empty() {
                metadata.conversation_id = e.conversation_id.clone();
            }

            events.push(RecordedEvent {
                sequence: se.sequence,
                parent_sequence: se.parent_id,
                event_type: e.event_type,
                timestamp: e.timestamp,
                offset: e.timestamp - session_start,
                session_id: e.session_id,
                conversation_id: e.conversation_id,
                run_id: e.run_id,
                data_type: e.data_type,
                data: e.data,
            });
        }

        tracing::debug!(
            session_id = %session_id,
            events = events.len(),
            duration_ms = metadata.duration.num_milliseconds(),
            "Exported session recording"
        );

        Ok(SessionRecording { metadata, events })
    }

    /// [`export`](Self::export), then attach provider/model/custom metadata
    pub async fn export_with_options(
        &self,
        session_id: &str,
        opts: ExportOptions,
    ) -> Result<SessionRecording> {
        let mut rec = self.export(session_id).await?;

        rec.metadata.provider_name = opts.provider_name;
        rec.metadata.model = opts.model;
        rec.metadata.custom = opts.custom;

        Ok(rec)
    }
}

/// Export a session with default settings
pub async fn export(store: &dyn EventStore, session_id: &str) -> Result<SessionRecording> {
    Exporter::new(store).export(session_id).await
}

/// Export a session and attach extra metadata
pub async fn export_with_options(
    store: &dyn EventStore,
    session_id: &str,
    opts: ExportOptions,
) -> Result<SessionRecording> {
    Exporter::new(store).export_with_options(session_id, opts).await
}
