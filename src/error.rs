//! Error types for capture and replay operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while capturing, persisting or replaying webhooks
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The capture server is already running
    #[error("capture server is already running")]
    AlreadyRunning,

    /// The capture server is not running
    #[error("capture server is not running")]
    NotRunning,

    /// The listener could not bind its address
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// The inbound request body could not be fully read
    #[error("failed to read request body: {0}")]
    BodyRead(String),

    /// No captured webhook with the requested ID
    #[error("webhook not found: {0}")]
    EventNotFound(String),

    /// The replay target responded with an error status
    #[error("replay failed: target responded with HTTP {status}")]
    ReplayFailed { status: u16 },

    /// Transport-level failure during replay (DNS, connect, timeout)
    #[error("network error during replay: {0}")]
    Network(#[from] reqwest::Error),

    /// Invalid replay target URL
    #[error("invalid target URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Writing a captured webhook to disk failed
    #[error("failed to write webhook to {path:?}: {source}")]
    PersistWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Reading a persisted webhook from disk failed
    #[error("failed to read webhook from {path:?}: {source}")]
    PersistRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A persisted webhook file did not parse
    #[error("malformed webhook file {path:?}: {source}")]
    PersistMalformed {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl CaptureError {
    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::EventNotFound(_))
    }

    /// Check if this is a lifecycle misuse error.
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::AlreadyRunning | Self::NotRunning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_helpers() {
        assert!(CaptureError::EventNotFound("wh_9".into()).is_not_found());
        assert!(!CaptureError::AlreadyRunning.is_not_found());
        assert!(CaptureError::AlreadyRunning.is_lifecycle());
        assert!(CaptureError::NotRunning.is_lifecycle());
        assert!(!CaptureError::ReplayFailed { status: 502 }.is_lifecycle());
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            CaptureError::NotRunning.to_string(),
            "capture server is not running"
        );
        assert_eq!(
            CaptureError::ReplayFailed { status: 404 }.to_string(),
            "replay failed: target responded with HTTP 404"
        );
        assert_eq!(
            CaptureError::EventNotFound("wh_3".into()).to_string(),
            "webhook not found: wh_3"
        );
    }
}
