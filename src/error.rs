//! Error types for call-audio.

use thiserror::Error;

/// Main error type for call-audio operations.
///
/// None of these are fatal to the host. Session operations degrade to a
/// best-effort state, route queries fold failures into their result, and the
/// bridge turns unknown names into a "not implemented" response.
#[derive(Error, Debug)]
pub enum CallAudioError {
    /// A platform service handle could not be obtained.
    #[error("platform service unavailable: {0}")]
    PlatformUnavailable(&'static str),

    /// A device or route query failed.
    #[error("audio query failed: {0}")]
    QueryFailure(String),

    /// The platform API level lacks a feature.
    #[error("{feature} requires a newer platform (api level {api_level})")]
    UnsupportedPlatformVersion {
        feature: &'static str,
        api_level: u32,
    },

    /// No handler for the given bridge channel/method.
    #[error("not implemented: {channel}#{method}")]
    NotImplemented { channel: String, method: String },

    /// Bridge arguments did not have the expected shape.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience Result type for call-audio operations.
pub type Result<T> = std::result::Result<T, CallAudioError>;
