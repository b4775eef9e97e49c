//! Error types for recording export, persistence and replay

/// Result type for tapedeck operations
pub type Result<T> = std::result::Result<T, RecordingError>;

/// Error types for tapedeck
#[derive(Debug, thiserror::Error)]
pub enum RecordingError {
    /// No events exist for the requested session
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unsupported save format, or a file matching no known on-disk shape
    #[error("Format error: {0}")]
    Format(String),

    /// Structurally valid input that cannot form a recording
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// A known payload discriminant whose data failed to decode
    #[error("Decode error: unmarshal {data_type}: {source}")]
    Decode {
        /// Discriminant that was being decoded
        data_type: String,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// Event store query failed
    #[error("Store error: {0}")]
    Store(String),

    /// Event store query exceeded its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for RecordingError {
    fn from(s: String) -> Self {
        RecordingError::Other(s)
    }
}

impl From<&str> for RecordingError {
    fn from(s: &str) -> Self {
        RecordingError::Other(s.to_string())
    }
}

impl From<anyhow::Error> for RecordingError {
    fn from(err: anyhow::Error) -> Self {
        RecordingError::Other(err.to_string())
    }
}
