//! Status line text.

use core::fmt::Write;

use heapless::String;

/// Longest status text we compose.
pub const STATUS_LINE_MAX: usize = 48;

pub type StatusLine = String<STATUS_LINE_MAX>;

/// `RAM:<free> | BLE:<OK|DISC> | HID:<READY|ERR>`
pub fn diagnostics_line(heap_free: usize, ble_connected: bool, hid_ready: bool) -> StatusLine {
    let mut line = StatusLine::new();
    // Fits: 20 digits worst case plus 27 fixed characters.
    let _ = write!(
        line,
        "RAM:{} | BLE:{} | HID:{}",
        heap_free,
        if ble_connected { "OK" } else { "DISC" },
        if hid_ready { "READY" } else { "ERR" },
    );
    line
}
