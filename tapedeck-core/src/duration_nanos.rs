//! Serde adapter encoding `chrono::Duration` as signed integer nanoseconds.
//!
//! Recordings written upstream store offsets and durations this way, so the
//! encoding has to stay bit-compatible.

use chrono::Duration;
use serde::{Deserialize, Deserializer, Serializer};

/// Nanoseconds in `d`, saturating at the `i64` bounds.
pub fn to_nanos(d: Duration) -> i64 {
    d.num_nanoseconds().unwrap_or(if d < Duration::zero() {
        i64::MIN
    } else {
        i64::MAX
    })
}

pub fn serialize<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_i64(to_nanos(*d))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let nanos = i64::deserialize(deserializer)?;
    Ok(Duration::nanoseconds(nanos))
}
