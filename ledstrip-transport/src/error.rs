//! Transport error types

use thiserror::Error;

/// Errors that can occur while talking to the driver
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Driver unreachable: {0}")]
    Unreachable(String),

    #[error("Driver call timed out after {0}ms")]
    Timeout(u64),

    #[error("Driver returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid driver response: {0}")]
    Decode(String),

    /// Driver answered but reported `success: false`
    #[error("Driver rejected command: {0}")]
    Rejected(String),

    /// The command lane worker has shut down
    #[error("Command queue closed")]
    QueueClosed,

    /// A queued job panicked
    #[error("Command job aborted: {0}")]
    JobPanicked(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            // reqwest doesn't carry the configured budget; callers re-map with it
            TransportError::Timeout(0)
        } else if e.is_decode() {
            TransportError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            TransportError::Status {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            TransportError::Unreachable(e.to_string())
        }
    }
}
