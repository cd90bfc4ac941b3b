//! Host-testable core of the delfin-panel firmware.
//!
//! Everything here is hardware-independent: the chunked BLE image transfer,
//! the device-mode sequence (received → image + print → printed → menu),
//! the macro table with its script interpreter, and the keyboard reports.
//! The embedded binary (`src/main.rs`, feature `embedded`) wires these to
//! the SoftDevice, USB, display and flash.
//!
//! Usage: `cargo test --lib` / `cargo test --test integration`

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
pub mod device;
pub mod error;
pub mod hid;
pub mod jpeg;
pub mod link;
pub mod macros;
pub mod mode;
pub mod transfer;
pub mod ui;

#[cfg(test)]
mod testing;

pub use device::{ButtonOutcome, DeviceCore, Host, LinkOutcome};
pub use error::{AllocError, ControlError, DispatchError, OverflowError, ParseError};
pub use mode::{DeviceMode, ModeTimings, Transition};
pub use transfer::TransferBuffer;
