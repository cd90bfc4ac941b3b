//! USB Device subsystem - presents a HID keyboard to the host.
//!
//! The nRF52840's built-in USB 2.0 Full-Speed controller is driven by
//! `embassy-usb` with a single boot-protocol keyboard interface. Macros and
//! the print shortcut are typed through it.

pub mod hid_device;
