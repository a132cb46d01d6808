//! Reply reports sent back by the keyboard after a command.
//!
//! The firmware answers a mode-switch command with a report whose byte at
//! offset 1 says what happened:
//!   - 0x03: gaming mode activated
//!   - 0x04: steno mode activated
//!   - 0x09: no action taken (mode unchanged)
//!
//! Any other status is passed through as `Unknown`.

use crate::error::{Error, Result};
use serde::Serialize;

/// Offset of the status byte within a reply report.
pub const STATUS_OFFSET: usize = 1;

/// Size of the buffer a reply is read into.
pub const REPLY_BUFFER_LEN: usize = 32;

pub const STATUS_GAMING_MODE: u8 = 0x03;
pub const STATUS_STENO_MODE: u8 = 0x04;
pub const STATUS_NO_ACTION: u8 = 0x09;

/// Decoded device acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "code")]
pub enum DeviceReply {
    GamingMode,
    StenoMode,
    NoActionTaken,
    Unknown(u8),
}

impl DeviceReply {
    pub fn from_status(status: u8) -> Self {
        match status {
            STATUS_GAMING_MODE => Self::GamingMode,
            STATUS_STENO_MODE => Self::StenoMode,
            STATUS_NO_ACTION => Self::NoActionTaken,
            other => Self::Unknown(other),
        }
    }

    /// Decode a reply report.
    pub fn decode(report: &[u8]) -> Result<Self> {
        report
            .get(STATUS_OFFSET)
            .map(|&status| Self::from_status(status))
            .ok_or_else(|| {
                Error::ReadFailed(format!(
                    "reply too short: {} byte(s), status at offset {STATUS_OFFSET}",
                    report.len()
                ))
            })
    }

    /// Whether the firmware reports that it acted on the command.
    pub fn is_acknowledged(&self) -> bool {
        matches!(self, Self::GamingMode | Self::StenoMode)
    }

    pub fn message(&self) -> String {
        match self {
            Self::GamingMode => "GAMING mode activated".into(),
            Self::StenoMode => "STENO mode activated".into(),
            Self::NoActionTaken => "attempted mode change unsuccessful".into(),
            Self::Unknown(code) => format!("unexpected response from device: {code}"),
        }
    }
}

impl std::fmt::Display for DeviceReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}
