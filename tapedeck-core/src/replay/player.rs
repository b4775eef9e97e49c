//! Timeline playback over a loaded recording

use chrono::{DateTime, Duration, Utc};

use super::record::{RecordedEvent, SessionRecording};
use crate::annotations::{Annotation, TargetKind};
use crate::config::PlaybackConfig;
use crate::error::Result;
use crate::events::{EventData, EventType};
use crate::media::{MediaTimeline, TrackType};

#[derive(Debug, Clone, Copy)]
struct IndexedEvent {
    offset: Duration,
    index: usize,
}

/// A conversation message as seen at some playback position
#[derive(Debug, Clone, PartialEq)]
pub struct MessageSnapshot {
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub offset: Duration,
}

/// Session state at one playback position
#[derive(Debug, Clone)]
pub struct PlaybackState<'a> {
    pub position: Duration,

    /// Absolute wall-clock time at `position`
    pub timestamp: DateTime<Utc>,

    /// Events within the tolerance window around `position`
    pub current_events: Vec<&'a RecordedEvent>,

    /// Events in the trailing window ending at `position`
    pub recent_events: Vec<&'a RecordedEvent>,

    pub active_annotations: Vec<&'a Annotation>,

    /// Conversation up to `position`
    pub messages: Vec<MessageSnapshot>,

    pub audio_input_active: bool,
    pub audio_output_active: bool,
}

/// Seekable playback over a [`SessionRecording`].
///
/// Querying never changes the cursor; only [`seek`](Self::seek),
/// [`advance`](Self::advance) and [`advance_to`](Self::advance_to) do.
#[derive(Debug)]
pub struct ReplayPlayer {
    recording: SessionRecording,
    timeline: MediaTimeline,
    annotations: Vec<Annotation>,
    position: Duration,
    events_by_time: Vec<IndexedEvent>,
    event_tolerance: Duration,
    recent_window: Duration,
}

impl ReplayPlayer {
    pub fn new(recording: SessionRecording) -> Result<Self> {
        Self::with_config(recording, &PlaybackConfig::default())
    }

    /// Fails when the media timeline cannot be built from the recording
    pub fn with_config(recording: SessionRecording, config: &PlaybackConfig) -> Result<Self> {
        let timeline = recording.to_media_timeline(None)?;

        let mut events_by_time: Vec<IndexedEvent> = recording
            .events
            .iter()
            .enumerate()
            .map(|(index, e)| IndexedEvent {
                offset: e.offset,
                index,
            })
            .collect();
        events_by_time.sort_by_key(|ie| ie.offset);

        tracing::debug!(
            session_id = %recording.metadata.session_id,
            events = events_by_time.len(),
            "Replay player ready"
        );

        Ok(Self {
            recording,
            timeline,
            annotations: Vec::new(),
            position: Duration::zero(),
            events_by_time,
            event_tolerance: chrono_duration(config.event_tolerance),
            recent_window: chrono_duration(config.recent_window),
        })
    }

    pub fn set_annotations(&mut self, annotations: Vec<Annotation>) {
        self.annotations = annotations;
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Move the cursor, clamped to `[0, duration]`
    pub fn seek(&mut self, offset: Duration) {
        self.position = offset.min(self.duration()).max(Duration::zero());
    }

    pub fn position(&self) -> Duration {
        self.position
    }

    pub fn duration(&self) -> Duration {
        self.recording.metadata.duration
    }

    pub fn recording(&self) -> &SessionRecording {
        &self.recording
    }

    pub fn timeline(&self) -> &MediaTimeline {
        &self.timeline
    }

    /// State at the cursor
    pub fn state(&self) -> PlaybackState<'_> {
        self.state_at(self.position)
    }

    /// State at an arbitrary offset, cursor untouched
    pub fn state_at(&self, offset: Duration) -> PlaybackState<'_> {
        let mut current_events = Vec::new();
        let mut recent_events = Vec::new();
        let recent_start = offset
            .checked_sub(&self.recent_window)
            .unwrap_or(Duration::MIN);

        for ie in &self.events_by_time {
            let event = &self.recording.events[ie.index];

            let distance = ie
                .offset
                .checked_sub(&offset)
                .map_or(Duration::MAX, |d| d.abs());
            if distance <= self.event_tolerance {
                current_events.push(event);
            }
            if ie.offset > recent_start && ie.offset <= offset {
                recent_events.push(event);
            }
        }

        PlaybackState {
            position: offset,
            timestamp: self.wall_clock_at(offset),
            current_events,
            recent_events,
            active_annotations: self.active_annotations_at(offset),
            messages: self.messages_up_to(offset),
            audio_input_active: self.audio_active_at(TrackType::AudioInput, offset),
            audio_output_active: self.audio_active_at(TrackType::AudioOutput, offset),
        }
    }

    /// Events with `start <= offset <= end`, in offset order
    pub fn events_in_range(&self, start: Duration, end: Duration) -> Vec<&RecordedEvent> {
        let mut result = Vec::new();
        for ie in &self.events_by_time {
            if ie.offset > end {
                break;
            }
            if ie.offset >= start {
                result.push(&self.recording.events[ie.index]);
            }
        }
        result
    }

    /// Events of one type, in recording order
    pub fn events_by_type(&self, event_type: &EventType) -> Vec<&RecordedEvent> {
        self.recording
            .events
            .iter()
            .filter(|e| &e.event_type == event_type)
            .collect()
    }

    /// Move forward by `delta` (stopping at the end) and return the events
    /// passed over, both ends included
    pub fn advance(&mut self, delta: Duration) -> Vec<&RecordedEvent> {
        let start = self.position;
        let target = start
            .checked_add(&delta)
            .map_or(self.duration(), |t| t.min(self.duration()));
        self.position = target;
        self.events_in_range(start, target)
    }

    /// Move to `target`. Moving backwards (or staying put) returns nothing.
    pub fn advance_to(&mut self, target: Duration) -> Vec<&RecordedEvent> {
        if target <= self.position {
            self.position = target;
            return Vec::new();
        }
        let delta = target.checked_sub(&self.position).unwrap_or(Duration::MAX);
        self.advance(delta)
    }

    /// `"MM:SS.mmm / MM:SS.mmm"`
    pub fn format_position(&self) -> String {
        format!(
            "{} / {}",
            format_duration(self.position),
            format_duration(self.duration())
        )
    }

    /// Forward-only iterator over `[start, end]`
    pub fn event_iter(&self, start: Duration, end: Duration) -> EventIterator<'_> {
        let next = self.events_by_time.partition_point(|ie| ie.offset < start);
        EventIterator {
            player: self,
            next,
            end,
        }
    }

    fn active_annotations_at(&self, offset: Duration) -> Vec<&Annotation> {
        let now = self.wall_clock_at(offset);

        self.annotations
            .iter()
            .filter(|ann| match ann.target.kind {
                TargetKind::Session => true,
                TargetKind::TimeRange => match (ann.target.start_time, ann.target.end_time) {
                    (Some(start), Some(end)) => now >= start && now <= end,
                    _ => false,
                },
                TargetKind::Event => ann.target.event_sequence.is_some_and(|seq| {
                    self.recording
                        .events
                        .iter()
                        .find(|e| e.sequence == seq)
                        .is_some_and(|e| e.offset <= offset)
                }),
                // Turn and message boundaries are not tracked.
                TargetKind::Turn | TargetKind::Message => true,
            })
            .collect()
    }

    /// Absolute time at `offset`, saturating at the representable range
    fn wall_clock_at(&self, offset: Duration) -> DateTime<Utc> {
        let start = self.recording.metadata.start_time;
        start.checked_add_signed(offset).unwrap_or(if offset < Duration::zero() {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
    }

    fn messages_up_to(&self, offset: Duration) -> Vec<MessageSnapshot> {
        let mut messages = Vec::new();

        for ie in &self.events_by_time {
            if ie.offset > offset {
                break;
            }
            let event = &self.recording.events[ie.index];
            if event.event_type != EventType::MESSAGE_CREATED {
                continue;
            }
            if let Ok(Some(EventData::MessageCreatedData(msg))) = event.decode_data() {
                messages.push(MessageSnapshot {
                    role: msg.role,
                    content: msg.content,
                    timestamp: event.timestamp,
                    offset: event.offset,
                });
            }
        }

        messages
    }

    fn audio_active_at(&self, track_type: TrackType, offset: Duration) -> bool {
        self.timeline
            .track(track_type)
            .is_some_and(|track| track.offset_in_segment(offset).is_some())
    }
}

/// Single-pass iteration over a player's events between two offsets
pub struct EventIterator<'a> {
    player: &'a ReplayPlayer,
    next: usize,
    end: Duration,
}

impl<'a> Iterator for EventIterator<'a> {
    type Item = &'a RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let ie = self.player.events_by_time.get(self.next)?;
        if ie.offset > self.end {
            return None;
        }
        self.next += 1;
        Some(&self.player.recording.events[ie.index])
    }
}

/// Render as `MM:SS.mmm` with total minutes (no hour field)
pub fn format_duration(d: Duration) -> String {
    let total_ms = d.num_milliseconds();
    let minutes = total_ms / 60_000;
    let seconds = (total_ms / 1_000) % 60;
    let millis = total_ms % 1_000;
    format!("{:02}:{:02}.{:03}", minutes, seconds, millis)
}

fn chrono_duration(d: std::time::Duration) -> Duration {
    Duration::from_std(d).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::zero()), "00:00.000");
        assert_eq!(format_duration(Duration::milliseconds(1_500)), "00:01.500");
        assert_eq!(format_duration(Duration::seconds(61)), "01:01.000");
        assert_eq!(format_duration(Duration::minutes(100)), "100:00.000");
    }
}
