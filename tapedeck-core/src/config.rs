//! Configuration for export, storage and playback

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{RecordingError, Result};
use crate::replay::Format;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TapedeckConfig {
    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

/// Replay window sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// How far from the cursor an event still counts as current
    #[serde(with = "humantime_serde")]
    pub event_tolerance: Duration,

    /// Length of the trailing "recent events" window
    #[serde(with = "humantime_serde")]
    pub recent_window: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            event_tolerance: Duration::from_millis(50),
            recent_window: Duration::from_secs(2),
        }
    }
}

/// Exporter settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Deadline for the event store query; none by default
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub query_timeout: Option<Duration>,
}

/// On-disk settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Format used by [`SessionRecording::save`](crate::replay::SessionRecording::save)
    pub default_format: Format,
}

impl TapedeckConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Loads in this order:
    /// 1. Default configuration
    /// 2. `tapedeck.toml` in the working directory
    /// 3. Environment variables (`TAPEDECK_PLAYBACK__EVENT_TOLERANCE=100ms`)
    /// 4. The file named by `TAPEDECK_CONFIG_PATH`, if set
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or the result is invalid.
    pub fn load() -> Result<Self> {
        use figment::{
            Figment,
            providers::{Env, Format as _, Serialized, Toml},
        };

        let mut figment = Figment::from(Serialized::defaults(TapedeckConfig::default()))
            .merge(Toml::file("tapedeck.toml"))
            .merge(
                Env::prefixed("TAPEDECK_")
                    .ignore(&["CONFIG_PATH"])
                    .split("__"),
            );

        if let Ok(path) = std::env::var("TAPEDECK_CONFIG_PATH") {
            figment = figment.merge(Toml::file(path));
        }

        let config: TapedeckConfig = figment.extract().map_err(|e| {
            RecordingError::Configuration(format!("Failed to load configuration: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        use figment::{
            Figment,
            providers::{Format as _, Serialized, Toml},
        };

        let config: TapedeckConfig = Figment::from(Serialized::defaults(TapedeckConfig::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| {
                RecordingError::Configuration(format!(
                    "Failed to load configuration file: {}",
                    e
                ))
            })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.playback.event_tolerance.is_zero() {
            return Err(RecordingError::Configuration(
                "playback.event_tolerance must be greater than zero".to_string(),
            ));
        }
        if self.playback.recent_window.is_zero() {
            return Err(RecordingError::Configuration(
                "playback.recent_window must be greater than zero".to_string(),
            ));
        }
        if self.export.query_timeout.is_some_and(|t| t.is_zero()) {
            return Err(RecordingError::Configuration(
                "export.query_timeout must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }
}
