//! Error types for keycmd-core.

use thiserror::Error;

/// Core library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Command text is missing, non-numeric, or not a single byte.
    #[error("invalid command {input:?}: {reason}")]
    InvalidCommand { input: String, reason: String },

    /// Device not present or could not be opened.
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Writing the command to the open device failed.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Reading the device reply failed.
    #[error("read failed: {0}")]
    ReadFailed(String),

    /// No reply arrived within the timeout.
    #[error("no reply from device after {0} ms")]
    ReplyTimeout(u64),
}

impl Error {
    /// Build an `InvalidCommand` error.
    pub fn invalid_command(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCommand {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
