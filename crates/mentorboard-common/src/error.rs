//! Error types for the Mentorboard tracker
//!
//! One error type flows through every cache and remote call. It is `Clone`
//! because a single in-flight fetch hands the same outcome to every caller
//! that joined it.

use crate::types::metric::MetricKind;
use thiserror::Error;

/// Result type alias using TrackerError
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Unified error type for tracker operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    // Remote service refused the call because of its request-rate ceiling
    #[error("Rate limited by remote service")]
    RateLimited,

    // Transport-level failures
    #[error("Network error: {0}")]
    Network(String),

    // Remote answered with an error status
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    // Response did not have the expected shape
    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Week {0} is outside 1..=12")]
    InvalidWeek(u8),

    #[error("No {kind} metric at catalog position {position}")]
    InvalidPosition { kind: MetricKind, position: usize },

    // Remote rejected a write
    #[error("Update rejected: {0}")]
    Rejected(String),

    // Operation needs data or state that is not there yet
    #[error("Not ready: {0}")]
    NotReady(String),

    // Owning view was torn down or superseded before the result landed
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl TrackerError {
    /// Whether this is the distinguished rate-limit condition
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, TrackerError::RateLimited)
    }

    /// Whether the failure should reach the user as a notice.
    ///
    /// Rate limits are absorbed by request staggering and cancellations are
    /// expected during navigation, so neither is surfaced.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, TrackerError::RateLimited | TrackerError::Cancelled)
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        TrackerError::Serialization(err.to_string())
    }
}
