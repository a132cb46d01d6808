//! keycmd-core: command validation, HID device access, and command delivery.
//!
//! This crate provides the logic for sending a single command byte to a
//! QMK-style keyboard over USB HID and reporting what happened.

pub mod command;
pub mod comm;
pub mod device;
pub mod error;
pub mod reply;
pub mod sender;
pub mod transport;

/// Default USB Vendor ID (QMK development boards).
pub const DEFAULT_VID: u16 = 0xFEED;

/// Default USB Product ID (Georgi steno keyboard).
pub const DEFAULT_PID: u16 = 0x1337;
