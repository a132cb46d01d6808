//! Device acquisition with error classification and optional retry.
//!
//! Opening a keyboard that is still enumerating, or that another process
//! holds briefly, can fail transiently. Retrying is opt-in: with zero
//! retries the open is attempted exactly once.

use crate::device::DeviceIds;
use crate::error::{Error, Result};
use crate::transport::{DeviceHandle, HidBackend};
use std::time::Duration;
use tracing::{debug, warn};

/// Delay between open attempts, in milliseconds.
pub const DEFAULT_OPEN_RETRY_DELAY_MS: u64 = 15;

/// Classification of errors for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad input. Nothing to retry.
    Input,
    /// Device missing, busy, or not openable yet.
    Unavailable,
    /// I/O failure on an open device.
    Io,
}

impl ErrorClass {
    pub fn classify(err: &Error) -> Self {
        match err {
            Error::InvalidCommand { .. } => Self::Input,
            Error::DeviceUnavailable(_) => Self::Unavailable,
            Error::WriteFailed(_) | Error::ReadFailed(_) | Error::ReplyTimeout(_) => Self::Io,
        }
    }

    /// Only acquisition failures are worth another open attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }
}

/// Open `ids`, retrying up to `max_retries` times on `DeviceUnavailable`.
///
/// Returns the handle on success, or the last error after exhausting retries.
pub fn open_with_retry(
    backend: &dyn HidBackend,
    ids: DeviceIds,
    max_retries: u32,
    delay: Duration,
) -> Result<DeviceHandle> {
    let mut attempt = 0;
    loop {
        match DeviceHandle::open(backend, ids) {
            Ok(handle) => {
                if attempt > 0 {
                    debug!(device = %ids, "Device opened on attempt {}", attempt + 1);
                }
                return Ok(handle);
            }
            Err(e) => {
                let class = ErrorClass::classify(&e);
                if !class.is_retryable() || attempt >= max_retries {
                    warn!(
                        "Device open failed (class={:?}, attempt={}/{}): {}",
                        class,
                        attempt + 1,
                        max_retries + 1,
                        e
                    );
                    return Err(e);
                }

                debug!(
                    "Device open failed (attempt {}/{}): {}, retrying...",
                    attempt + 1,
                    max_retries + 1,
                    e
                );
                attempt += 1;
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
            }
        }
    }
}
