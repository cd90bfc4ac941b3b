//! Application-wide constants and compile-time configuration.
//!
//! All hardware pin assignments, timing parameters, and protocol
//! constants live here so they can be tuned in one place.

// BLE

/// Name advertised in the scan response.
pub const BLE_DEVICE_NAME: &str = "DelfinPanel";

/// Label service UUID (`4fafc201-1fb5-459e-8fcc-c5c9c331914b`), little-endian
/// byte order as it appears on air.
pub const LABEL_SERVICE_UUID_LE: [u8; 16] = [
    0x4b, 0x91, 0x31, 0xc3, 0xc9, 0xc5, 0xcc, 0x8f, 0x9e, 0x45, 0xb5, 0x1f, 0x01, 0xc2, 0xaf, 0x4f,
];

/// Largest single characteristic write we accept (ATT MTU 247 - 3).
pub const LINK_CHUNK_MAX: usize = 244;

/// Depth of the link → main-loop inbox.
///
/// Chunks arriving while the inbox is full are dropped; the transfer then
/// stalls until the sender issues a fresh `START_IMAGE`.
pub const LINK_INBOX_DEPTH: usize = 32;

// Image transfer

/// Upper bound for a declared image size (bytes). Must fit in the heap.
pub const IMAGE_MAX_BYTES: usize = 96 * 1024;

/// Heap reserved for the image buffer (bytes).
pub const HEAP_SIZE: usize = 100 * 1024;

/// Progress is reported each time the transfer crosses another tenth.
pub const PROGRESS_STEPS: usize = 10;

// Device mode dwell durations

/// Time the "received" confirmation stays up before drawing the image (ms).
pub const DWELL_RECEIVED_MS: u64 = 2000;

/// Time the image stays on screen after the print shortcut is sent (ms).
pub const DWELL_SHOWING_IMAGE_MS: u64 = 3000;

/// Time the "printed" label stays up before returning to the menu (ms).
pub const DWELL_PRINTED_MS: u64 = 3000;

/// Main loop period (ms).
pub const MAIN_LOOP_PERIOD_MS: u64 = 5;

/// Period of the RAM / link / HID diagnostics status line (ms).
pub const DIAGNOSTICS_PERIOD_MS: u64 = 3000;

// Macros

/// How long the "executing" status stays up after a macro (ms).
pub const MACRO_STATUS_MS: u32 = 500;

/// Wait after GUI+R before typing into the run dialog (ms).
pub const RUN_DIALOG_OPEN_MS: u32 = 400;

/// Wait after typing a run-dialog command before pressing Enter (ms).
pub const RUN_DIALOG_TYPE_MS: u32 = 100;

/// Hold time for the print shortcut so the host registers the combo (ms).
pub const PRINT_COMBO_HOLD_MS: u32 = 10;

/// Wait after typing into the start menu before pressing Enter (ms).
pub const START_MENU_SEARCH_MS: u32 = 400;

// Status text

pub const STATUS_READY: &str = "Ready";
pub const STATUS_RECEIVED: &str = "Received!";
pub const STATUS_PRINTING: &str = "Printing...";
pub const STATUS_PRINTED: &str = "Printed!";
pub const STATUS_BOOT_STORE_OK: &str = "Ready (Flash OK)";
pub const STATUS_BOOT_NO_STORE: &str = "Ready (No scripts)";

// USB

/// USB VID/PID - use the "pid.codes" open-source test VID.
/// Replace with your own allocated VID/PID for production.
pub const USB_VID: u16 = 0x1209;
pub const USB_PID: u16 = 0x0002;

/// USB device strings.
pub const USB_MANUFACTURER: &str = "delfin-panel";
pub const USB_PRODUCT: &str = "Delfin Label Panel";
pub const USB_SERIAL_NUMBER: &str = "000001";

/// USB HID polling interval (ms).
pub const USB_HID_POLL_MS: u8 = 1;

// GPIO pin assignments (nRF52840-DK defaults)
//
//   Button UP      → P0.11
//   Button DOWN    → P0.12
//   Button SELECT  → P0.24
//   I²C SDA        → P0.26
//   I²C SCL        → P0.27

/// Button debounce time (ms).
pub const BUTTON_DEBOUNCE_MS: u64 = 50;

// Script storage

/// Flash page index where script storage starts (4 KB per page on nRF52840).
pub const STORAGE_FLASH_PAGE_START: u32 = 240;

/// Number of flash pages reserved for script storage.
pub const STORAGE_FLASH_PAGE_COUNT: u32 = 4;

/// Largest stored script (bytes).
pub const SCRIPT_MAX_BYTES: usize = 1024;
