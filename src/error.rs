//! Error types for viewpulse

use thiserror::Error;

/// Errors that can occur while tracking or replaying views
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("Failed to deliver report: {0}")]
    ReportFailed(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse event log: {0}")]
    ParseError(String),

    #[error("Invalid recorded event: {0}")]
    InvalidEvent(String),
}
