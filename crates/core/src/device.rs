//! Device model: identifiers, discovery, and the hidapi backend.

use crate::error::{Error, Result};
use crate::transport::{HidBackend, HidConnection};
use crate::{DEFAULT_PID, DEFAULT_VID};
use hidapi::{HidApi, HidDevice};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// USB vendor/product id pair that selects the target keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIds {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceIds {
    pub const fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }

    /// Whether a device with this vid/pid is the target.
    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id == vendor_id && self.product_id == product_id
    }
}

impl Default for DeviceIds {
    fn default() -> Self {
        Self::new(DEFAULT_VID, DEFAULT_PID)
    }
}

impl std::fmt::Display for DeviceIds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04X}:{:04X}", self.vendor_id, self.product_id)
    }
}

/// Parse a 16-bit USB id written in hex, with or without a `0x` prefix.
pub fn parse_usb_id(input: &str) -> std::result::Result<u16, String> {
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    if digits.is_empty() || digits.len() > 4 || !digits.chars().all(|c| c.is_ascii_hexdigit())
    {
        return Err(format!("'{input}' is not a 16-bit hex id"));
    }
    u16::from_str_radix(digits, 16).map_err(|_| format!("'{input}' is not a 16-bit hex id"))
}

/// Information about one HID interface of the target keyboard.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    pub ids: DeviceIds,
    pub path: String,
    pub serial: Option<String>,
    pub product: Option<String>,
    pub interface_number: i32,
}

fn init_api() -> Result<HidApi> {
    let api = HidApi::new().map_err(|e| Error::DeviceUnavailable(format!("hidapi init: {e}")))?;
    // macOS opens exclusively by default, which fails while the OS holds the keyboard.
    #[cfg(target_os = "macos")]
    api.set_open_exclusive(false);
    Ok(api)
}

/// List every HID interface matching `ids`.
///
/// Devices from other vendors or with other product ids are skipped.
pub fn discover_devices(ids: DeviceIds) -> Result<Vec<DeviceInfo>> {
    debug!(device = %ids, "Starting HID device enumeration");
    let api = init_api()?;

    let devices: Vec<DeviceInfo> = api
        .device_list()
        .filter(|info| ids.matches(info.vendor_id(), info.product_id()))
        .map(|info| DeviceInfo {
            ids,
            path: info.path().to_string_lossy().into_owned(),
            serial: info.serial_number().map(|s| s.to_string()),
            product: info.product_string().map(|s| s.to_string()),
            interface_number: info.interface_number(),
        })
        .collect();

    debug!(count = devices.len(), "Device enumeration complete");
    Ok(devices)
}

/// Backend that talks to real hardware through hidapi.
#[derive(Debug, Default, Clone, Copy)]
pub struct HidApiBackend;

impl HidApiBackend {
    pub fn new() -> Self {
        Self
    }
}

impl HidBackend for HidApiBackend {
    /// Try each enumerated interface by path first, then fall back to
    /// hidapi's own vid/pid lookup.
    fn open(&self, ids: DeviceIds) -> Result<Box<dyn HidConnection>> {
        let api = init_api()?;

        for info in api.device_list() {
            if !ids.matches(info.vendor_id(), info.product_id()) {
                continue;
            }
            let path = info.path().to_string_lossy();
            match api.open_path(info.path()) {
                Ok(device) => {
                    info!(device = %ids, path = %path, "Opened device by path");
                    return Ok(Box::new(HidApiConnection { device }));
                }
                Err(e) => warn!(device = %ids, path = %path, error = %e, "Open by path failed"),
            }
        }

        let device = api
            .open(ids.vendor_id, ids.product_id)
            .map_err(|e| Error::DeviceUnavailable(format!("open HID device {ids}: {e}")))?;
        info!(device = %ids, "Opened device by vid/pid");
        Ok(Box::new(HidApiConnection { device }))
    }
}

struct HidApiConnection {
    device: HidDevice,
}

impl HidConnection for HidApiConnection {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.device
            .write(data)
            .map_err(|e| Error::WriteFailed(format!("hid_write: {e}")))
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout_ms: i32) -> Result<usize> {
        self.device
            .read_timeout(buf, timeout_ms)
            .map_err(|e| Error::ReadFailed(format!("hid_read: {e}")))
    }

    fn close(self: Box<Self>) {
        // hidapi closes the handle when HidDevice drops.
        drop(self.device);
    }
}
