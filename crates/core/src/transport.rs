//! HID transport abstraction and scoped device handle.
//!
//! Provides a trait-based transport layer so that real HID devices and
//! mock devices share the same interface. `DeviceHandle` owns an open
//! connection and releases it exactly once, whichever way the send ends.

use crate::command::Command;
use crate::device::DeviceIds;
use crate::error::{Error, Result};
use tracing::{debug, trace};

/// An open connection to one HID device.
pub trait HidConnection: Send {
    /// Write a raw report, returning the number of bytes written.
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Read one report, waiting at most `timeout_ms`. Returns 0 on timeout.
    fn read_timeout(&mut self, buf: &mut [u8], timeout_ms: i32) -> Result<usize>;

    /// Release the underlying OS handle.
    fn close(self: Box<Self>);
}

/// Something that can open HID devices by vendor/product id.
pub trait HidBackend: Send {
    /// Open the device matching `ids`.
    ///
    /// Implementations report every failure as `Error::DeviceUnavailable`.
    fn open(&self, ids: DeviceIds) -> Result<Box<dyn HidConnection>>;
}

/// Exclusively-owned open device.
///
/// Closing consumes the handle, so a closed handle cannot be written to.
/// Dropping an unclosed handle closes it.
pub struct DeviceHandle {
    ids: DeviceIds,
    conn: Option<Box<dyn HidConnection>>,
}

impl DeviceHandle {
    /// Open the device identified by `ids` through `backend`.
    pub fn open(backend: &dyn HidBackend, ids: DeviceIds) -> Result<Self> {
        let conn = backend.open(ids)?;
        debug!(device = %ids, "Device opened");
        Ok(Self {
            ids,
            conn: Some(conn),
        })
    }

    /// Identifiers of the open device.
    pub fn ids(&self) -> DeviceIds {
        self.ids
    }

    /// Write `command` as a single-byte report.
    pub fn write_command(&mut self, command: Command) -> Result<usize> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| Error::WriteFailed("device handle already closed".into()))?;

        let report = [command.code()];
        trace!(
            device = %self.ids,
            report_hex = format_args!("{:02X?}", report),
            "HID TX"
        );

        let written = conn.write(&report)?;
        if written == 0 {
            return Err(Error::WriteFailed("device accepted 0 bytes".into()));
        }
        Ok(written)
    }

    /// Read one report into `buf`.
    pub fn read_report(&mut self, buf: &mut [u8], timeout_ms: i32) -> Result<usize> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| Error::ReadFailed("device handle already closed".into()))?;

        let n = conn.read_timeout(buf, timeout_ms)?;
        trace!(
            device = %self.ids,
            len = n,
            report_hex = format_args!("{:02X?}", &buf[..n]),
            "HID RX"
        );
        Ok(n)
    }

    /// Close the device.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(conn) = self.conn.take() {
            conn.close();
            debug!(device = %self.ids, "Device closed");
        }
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        self.release();
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockBackend;
    use super::*;

    #[test]
    fn open_absent_device_fails() {
        let mock = MockBackend::absent();
        let result = DeviceHandle::open(&mock, DeviceIds::default());
        assert!(matches!(result, Err(Error::DeviceUnavailable(_))));
        assert_eq!(mock.opens(), 1);
        assert_eq!(mock.closes(), 0);
    }

    #[test]
    fn close_releases_once() {
        let mock = MockBackend::present();
        let handle = DeviceHandle::open(&mock, DeviceIds::default()).unwrap();
        handle.close();
        assert_eq!(mock.closes(), 1);
    }

    #[test]
    fn drop_releases_once() {
        let mock = MockBackend::present();
        {
            let _handle = DeviceHandle::open(&mock, DeviceIds::default()).unwrap();
        }
        assert_eq!(mock.closes(), 1);
    }

    #[test]
    fn write_command_sends_one_byte() {
        let mock = MockBackend::present();
        let mut handle = DeviceHandle::open(&mock, DeviceIds::default()).unwrap();
        assert_eq!(handle.write_command(Command::new(0x42)).unwrap(), 1);
        handle.close();
        assert_eq!(mock.writes(), vec![vec![0x42]]);
    }

    #[test]
    fn zero_byte_write_is_a_failure() {
        let mock = MockBackend::present().short_writes();
        let mut handle = DeviceHandle::open(&mock, DeviceIds::default()).unwrap();
        let result = handle.write_command(Command::new(1));
        assert!(matches!(result, Err(Error::WriteFailed(_))));
    }

    #[test]
    fn read_report_times_out_with_zero() {
        let mock = MockBackend::present();
        let mut handle = DeviceHandle::open(&mock, DeviceIds::default()).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(handle.read_report(&mut buf, 10).unwrap(), 0);
    }
}
