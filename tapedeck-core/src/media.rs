//! Media tracks reconstructed from typed session events
//!
//! Audio chunks are laid end-to-end in chunk order to form contiguous
//! tracks; video frames form a track spanning first to last frame. Payload
//! bytes are either inline or fetched from a [`BlobStore`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RecordingError, Result};
use crate::events::{AudioMetadata, BinaryPayload, Event, EventData, EventType, VideoMetadata};

/// Media track kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackType {
    /// User/environment audio
    AudioInput,
    /// Model audio
    AudioOutput,
    Video,
}

/// External storage for payloads that are not inline
pub trait BlobStore: Send + Sync {
    fn load(&self, storage_ref: &str) -> Result<Vec<u8>>;
}

/// Format of a segment's media
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentFormat {
    Audio(AudioMetadata),
    Video(VideoMetadata),
}

/// A continuous piece of media taken from one event
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSegment {
    /// When the source event occurred, relative to session start
    pub start_time: Duration,
    pub duration: Duration,
    pub payload: BinaryPayload,
    pub format: SegmentFormat,
    /// Index of the source event in the event list
    pub event_index: usize,
    /// Chunk or frame sequence number
    pub chunk_index: i64,
}

/// Ordered segments of one media kind
#[derive(Debug, Clone, PartialEq)]
pub struct MediaTrack {
    pub track_type: TrackType,
    pub segments: Vec<MediaSegment>,
    pub total_duration: Duration,
    /// Format of the first segment
    pub format: Option<SegmentFormat>,
}

impl MediaTrack {
    /// Segment covering `offset` on the track's own clock, and the position
    /// within that segment
    pub fn offset_in_segment(&self, offset: Duration) -> Option<(&MediaSegment, Duration)> {
        let mut accumulated = Duration::zero();
        for segment in &self.segments {
            let end = saturating_add(accumulated, segment.duration);
            if offset < end {
                return Some((segment, offset.checked_sub(&accumulated)?));
            }
            accumulated = end;
        }
        None
    }
}

/// All media tracks of a session
pub struct MediaTimeline {
    pub session_id: String,
    pub session_start: Option<DateTime<Utc>>,
    pub session_end: Option<DateTime<Utc>>,
    tracks: HashMap<TrackType, MediaTrack>,
    blob_store: Option<Arc<dyn BlobStore>>,
}

impl std::fmt::Debug for MediaTimeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaTimeline")
            .field("session_id", &self.session_id)
            .field("session_start", &self.session_start)
            .field("session_end", &self.session_end)
            .field("tracks", &self.tracks.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MediaTimeline {
    /// Build tracks from time-ordered typed events
    pub fn new(
        session_id: impl Into<String>,
        events: &[Event],
        blob_store: Option<Arc<dyn BlobStore>>,
    ) -> Self {
        let session_start = events.first().map(|e| e.timestamp);
        let session_end = events.last().map(|e| e.timestamp);

        let mut timeline = Self {
            session_id: session_id.into(),
            session_start,
            session_end,
            tracks: HashMap::new(),
            blob_store,
        };

        let start = session_start.unwrap_or_default();
        for (track_type, event_type) in [
            (TrackType::AudioInput, EventType::AUDIO_INPUT),
            (TrackType::AudioOutput, EventType::AUDIO_OUTPUT),
        ] {
            let segments = audio_segments(events, &event_type, start);
            if !segments.is_empty() {
                timeline
                    .tracks
                    .insert(track_type, build_track(track_type, segments));
            }
        }

        let frames = video_segments(events, start);
        if !frames.is_empty() {
            timeline
                .tracks
                .insert(TrackType::Video, build_track(TrackType::Video, frames));
        }

        timeline
    }

    pub fn track(&self, track_type: TrackType) -> Option<&MediaTrack> {
        self.tracks.get(&track_type)
    }

    pub fn has_track(&self, track_type: TrackType) -> bool {
        self.tracks.contains_key(&track_type)
    }

    /// Session length as seen by the timeline
    pub fn duration(&self) -> Duration {
        match (self.session_start, self.session_end) {
            (Some(start), Some(end)) => end - start,
            _ => Duration::zero(),
        }
    }

    /// Bytes of a segment, from inline data or the blob store
    pub fn load_payload(&self, segment: &MediaSegment) -> Result<Vec<u8>> {
        if segment.payload.is_inline() {
            return Ok(segment.payload.inline_data.clone());
        }
        if segment.payload.storage_ref.is_empty() {
            return Ok(Vec::new());
        }
        match &self.blob_store {
            Some(store) => store.load(&segment.payload.storage_ref),
            None => Err(RecordingError::Other(format!(
                "segment references blob {} but no blob store is configured",
                segment.payload.storage_ref
            ))),
        }
    }
}

/// Length of a chunk from its declared milliseconds. Values outside the
/// representable range (or negative) count as zero.
fn segment_duration(duration_ms: i64) -> Duration {
    Duration::try_milliseconds(duration_ms)
        .filter(|d| *d >= Duration::zero())
        .unwrap_or_else(Duration::zero)
}

fn saturating_add(a: Duration, b: Duration) -> Duration {
    a.checked_add(&b).unwrap_or(Duration::MAX)
}

fn audio_segments(
    events: &[Event],
    event_type: &EventType,
    start: DateTime<Utc>,
) -> Vec<MediaSegment> {
    let mut segments: Vec<MediaSegment> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| &e.event_type == event_type)
        .filter_map(|(i, e)| {
            let (payload, metadata, chunk_index) = match e.data.as_ref()? {
                EventData::AudioInputData(d) => (&d.payload, &d.metadata, d.chunk_index),
                EventData::AudioOutputData(d) => (&d.payload, &d.metadata, d.chunk_index),
                _ => return None,
            };
            Some(MediaSegment {
                start_time: e.timestamp - start,
                duration: segment_duration(metadata.duration_ms),
                payload: payload.clone(),
                format: SegmentFormat::Audio(metadata.clone()),
                event_index: i,
                chunk_index,
            })
        })
        .collect();

    segments.sort_by_key(|s| s.chunk_index);
    segments
}

fn video_segments(events: &[Event], start: DateTime<Utc>) -> Vec<MediaSegment> {
    let mut segments: Vec<MediaSegment> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| e.event_type == EventType::VIDEO_FRAME)
        .filter_map(|(i, e)| match e.data.as_ref()? {
            EventData::VideoFrameData(d) => Some(MediaSegment {
                start_time: e.timestamp - start,
                duration: segment_duration(d.metadata.duration_ms),
                payload: d.payload.clone(),
                format: SegmentFormat::Video(d.metadata.clone()),
                event_index: i,
                chunk_index: d.frame_index,
            }),
            _ => None,
        })
        .collect();

    segments.sort_by_key(|s| s.chunk_index);
    segments
}

fn build_track(track_type: TrackType, segments: Vec<MediaSegment>) -> MediaTrack {
    let total_duration = match track_type {
        TrackType::Video => match (segments.first(), segments.last()) {
            (Some(first), Some(last)) => last
                .start_time
                .checked_sub(&first.start_time)
                .unwrap_or(Duration::MAX),
            _ => Duration::zero(),
        },
        _ => segments
            .iter()
            .fold(Duration::zero(), |acc, s| saturating_add(acc, s.duration)),
    };

    MediaTrack {
        track_type,
        format: segments.first().map(|s| s.format.clone()),
        segments,
        total_duration,
    }
}
