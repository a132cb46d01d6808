//! The command sender: validate → open → write → (read reply) → close.

use crate::command::Command;
use crate::comm::{open_with_retry, DEFAULT_OPEN_RETRY_DELAY_MS};
use crate::device::DeviceIds;
use crate::error::{Error, Result};
use crate::reply::{DeviceReply, REPLY_BUFFER_LEN};
use crate::transport::{DeviceHandle, HidBackend};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Default reply wait, matching three 500 ms polls.
pub const DEFAULT_REPLY_TIMEOUT_MS: u64 = 1500;

/// Sender configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderConfig {
    /// Target keyboard.
    pub ids: DeviceIds,
    /// Extra open attempts after the first one fails.
    pub open_retries: u32,
    pub open_retry_delay: Duration,
    /// Read and decode one reply report after writing.
    pub read_reply: bool,
    pub reply_timeout: Duration,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            ids: DeviceIds::default(),
            open_retries: 0,
            open_retry_delay: Duration::from_millis(DEFAULT_OPEN_RETRY_DELAY_MS),
            read_reply: false,
            reply_timeout: Duration::from_millis(DEFAULT_REPLY_TIMEOUT_MS),
        }
    }
}

/// Outcome of a delivered command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendReport {
    pub command: Command,
    pub device: DeviceIds,
    pub bytes_written: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<DeviceReply>,
}

/// Delivers command bytes to one configured device.
pub struct CommandSender<B> {
    backend: B,
    config: SenderConfig,
}

impl<B: HidBackend> CommandSender<B> {
    pub fn new(backend: B, config: SenderConfig) -> Self {
        Self { backend, config }
    }

    /// Parse `input` as a decimal command and send it.
    ///
    /// Parsing happens before any device I/O; invalid input never opens
    /// the device.
    pub fn send(&self, input: &str) -> Result<SendReport> {
        let command: Command = input.parse()?;
        self.send_command(command)
    }

    /// Send an already-validated command.
    pub fn send_command(&self, command: Command) -> Result<SendReport> {
        let ids = self.config.ids;
        let mut handle = open_with_retry(
            &self.backend,
            ids,
            self.config.open_retries,
            self.config.open_retry_delay,
        )?;

        // The handle closes on drop if any step below bails out early.
        let bytes_written = handle.write_command(command).inspect_err(|e| {
            warn!(device = %ids, command = command.code(), error = %e, "Command write failed");
        })?;
        info!(device = %ids, command = %command, "Command delivered");

        let reply = if self.config.read_reply {
            Some(self.read_reply(&mut handle)?)
        } else {
            None
        };

        handle.close();

        Ok(SendReport {
            command,
            device: ids,
            bytes_written,
            reply,
        })
    }

    fn read_reply(&self, handle: &mut DeviceHandle) -> Result<DeviceReply> {
        let timeout_ms = self.config.reply_timeout.as_millis().min(i32::MAX as u128) as i32;
        let mut buf = [0u8; REPLY_BUFFER_LEN];

        let n = handle.read_report(&mut buf, timeout_ms)?;
        if n == 0 {
            warn!(device = %handle.ids(), timeout_ms, "No reply from device");
            return Err(Error::ReplyTimeout(timeout_ms as u64));
        }

        let reply = DeviceReply::decode(&buf[..n])?;
        if reply.is_acknowledged() {
            info!(device = %handle.ids(), reply = %reply, "Device replied");
        } else {
            warn!(device = %handle.ids(), reply = %reply, "Device did not acknowledge command");
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockBackend;

    fn sender(mock: &MockBackend) -> CommandSender<MockBackend> {
        CommandSender::new(mock.clone(), SenderConfig::default())
    }

    #[test]
    fn default_config_targets_known_keyboard_without_retry() {
        let config = SenderConfig::default();
        assert_eq!(config.ids, DeviceIds::new(0xFEED, 0x1337));
        assert_eq!(config.open_retries, 0);
        assert!(!config.read_reply);
    }

    #[test]
    fn send_reports_written_command() {
        let mock = MockBackend::present();
        let report = sender(&mock).send("3").unwrap();
        assert_eq!(report.command, Command::new(3));
        assert_eq!(report.device, DeviceIds::default());
        assert_eq!(report.bytes_written, 1);
        assert_eq!(report.reply, None);
        assert_eq!(mock.reads(), 0);
    }

    #[test]
    fn send_uses_configured_ids() {
        let mock = MockBackend::present();
        let config = SenderConfig {
            ids: DeviceIds::new(0x1234, 0x5678),
            ..Default::default()
        };
        let report = CommandSender::new(mock.clone(), config).send("1").unwrap();
        assert_eq!(report.device.to_string(), "1234:5678");
    }

    #[test]
    fn invalid_input_never_opens() {
        let mock = MockBackend::present();
        let result = sender(&mock).send("abc");
        assert!(matches!(result, Err(Error::InvalidCommand { .. })));
        assert_eq!(mock.opens(), 0);
    }

    #[test]
    fn report_serializes_without_reply() {
        let mock = MockBackend::present();
        let report = sender(&mock).send("255").unwrap();
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(
            json,
            r#"{"command":255,"device":{"vendor_id":65261,"product_id":4919},"bytes_written":1}"#
        );
    }

    #[test]
    fn config_roundtrips_through_json() {
        let config = SenderConfig {
            open_retries: 30,
            read_reply: true,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: SenderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
