//! Keys the macros press, their US-layout usages, and the 8-byte boot
//! keyboard report they are sent in.
//!
//! ```text
//! [0] modifiers   Ctrl=0x01 Shift=0x02 Alt=0x04 GUI=0x08 (left hand)
//! [1] 0x00
//! [2..8] held usage codes, 0 = empty slot
//! ```

/// Keyboard report size in bytes.
pub const KEYBOARD_REPORT_SIZE: usize = 8;

pub const MOD_LEFT_CTRL: u8 = 0x01;
pub const MOD_LEFT_SHIFT: u8 = 0x02;
pub const MOD_LEFT_ALT: u8 = 0x04;
pub const MOD_LEFT_GUI: u8 = 0x08;

const USAGE_ENTER: u8 = 0x28;
const USAGE_ESCAPE: u8 = 0x29;
const USAGE_TAB: u8 = 0x2B;
const USAGE_SPACE: u8 = 0x2C;
const USAGE_PRINT_SCREEN: u8 = 0x46;

/// A key the macro engine can press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Key {
    LeftCtrl,
    LeftShift,
    LeftAlt,
    LeftGui,
    Enter,
    Escape,
    Tab,
    PrintScreen,
    /// A printable character on a US layout.
    Char(char),
}

/// How a `Key` lands in a report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyUsage {
    /// Modifier bit(s) in byte 0.
    Modifier(u8),
    /// Key code plus any modifier the character needs (e.g. Shift for 'A').
    Code { code: u8, modifier: u8 },
}

impl Key {
    pub fn usage(self) -> Option<KeyUsage> {
        let usage = match self {
            Key::LeftCtrl => KeyUsage::Modifier(MOD_LEFT_CTRL),
            Key::LeftShift => KeyUsage::Modifier(MOD_LEFT_SHIFT),
            Key::LeftAlt => KeyUsage::Modifier(MOD_LEFT_ALT),
            Key::LeftGui => KeyUsage::Modifier(MOD_LEFT_GUI),
            Key::Enter => plain(USAGE_ENTER),
            Key::Escape => plain(USAGE_ESCAPE),
            Key::Tab => plain(USAGE_TAB),
            Key::PrintScreen => plain(USAGE_PRINT_SCREEN),
            Key::Char(c) => {
                let (code, shifted) = ascii_usage(c)?;
                KeyUsage::Code {
                    code,
                    modifier: if shifted { MOD_LEFT_SHIFT } else { 0 },
                }
            }
        };
        Some(usage)
    }
}

const fn plain(code: u8) -> KeyUsage {
    KeyUsage::Code { code, modifier: 0 }
}

/// US-layout usage code for a printable ASCII character, with a flag telling
/// whether Shift must be held.
pub fn ascii_usage(c: char) -> Option<(u8, bool)> {
    let usage = match c {
        'a'..='z' => (0x04 + (c as u8 - b'a'), false),
        'A'..='Z' => (0x04 + (c as u8 - b'A'), true),
        '1'..='9' => (0x1E + (c as u8 - b'1'), false),
        '0' => (0x27, false),
        '\n' => (USAGE_ENTER, false),
        '\t' => (USAGE_TAB, false),
        ' ' => (USAGE_SPACE, false),
        '!' => (0x1E, true),
        '@' => (0x1F, true),
        '#' => (0x20, true),
        '$' => (0x21, true),
        '%' => (0x22, true),
        '^' => (0x23, true),
        '&' => (0x24, true),
        '*' => (0x25, true),
        '(' => (0x26, true),
        ')' => (0x27, true),
        '-' => (0x2D, false),
        '_' => (0x2D, true),
        '=' => (0x2E, false),
        '+' => (0x2E, true),
        '[' => (0x2F, false),
        '{' => (0x2F, true),
        ']' => (0x30, false),
        '}' => (0x30, true),
        '\\' => (0x31, false),
        '|' => (0x31, true),
        ';' => (0x33, false),
        ':' => (0x33, true),
        '\'' => (0x34, false),
        '"' => (0x34, true),
        '`' => (0x35, false),
        '~' => (0x35, true),
        ',' => (0x36, false),
        '<' => (0x36, true),
        '.' => (0x37, false),
        '>' => (0x37, true),
        '/' => (0x38, false),
        '?' => (0x38, true),
        _ => return None,
    };
    Some(usage)
}

/// Keys held right now, as the host sees them.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardReport {
    pub modifier: u8,
    pub reserved: u8,
    pub keycodes: [u8; 6],
}

impl KeyboardReport {
    /// Nothing held.
    pub const fn empty() -> Self {
        Self {
            modifier: 0,
            reserved: 0,
            keycodes: [0; 6],
        }
    }

    /// Report for a single typed character (press half of a keystroke).
    pub fn for_char(c: char) -> Option<Self> {
        let mut report = Self::empty();
        report.press(Key::Char(c)).then_some(report)
    }

    /// Add `key` to the held set.
    ///
    /// Returns `false` if the key has no usage on a US layout or all six
    /// key slots are taken.
    pub fn press(&mut self, key: Key) -> bool {
        match key.usage() {
            Some(KeyUsage::Modifier(bits)) => {
                self.modifier |= bits;
                true
            }
            Some(KeyUsage::Code { code, modifier }) => {
                if self.keycodes.contains(&code) {
                    self.modifier |= modifier;
                    return true;
                }
                match self.keycodes.iter_mut().find(|k| **k == 0) {
                    Some(slot) => {
                        *slot = code;
                        self.modifier |= modifier;
                        true
                    }
                    None => false,
                }
            }
            None => false,
        }
    }

    /// Release every key and modifier.
    pub fn release_all(&mut self) {
        *self = Self::empty();
    }

    /// Write the wire form into `buf`. Returns the length written, or 0 if
    /// `buf` is too short.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < KEYBOARD_REPORT_SIZE {
            return 0;
        }
        buf[0] = self.modifier;
        buf[1] = self.reserved;
        buf[2..8].copy_from_slice(&self.keycodes);
        KEYBOARD_REPORT_SIZE
    }

    /// Nothing held.
    pub fn is_empty(&self) -> bool {
        self.modifier == 0 && self.keycodes.iter().all(|&k| k == 0)
    }
}

/// Boot keyboard descriptor: modifier bits, padding byte, LED outputs,
/// six key slots. Matches [`KeyboardReport`] byte for byte.
pub const KEYBOARD_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    //
    //   - Modifier keys (8 bits) -
    0x05, 0x07, //   Usage Page (Keyboard/Keypad)
    0x19, 0xE0, //   Usage Minimum (Left Control)
    0x29, 0xE7, //   Usage Maximum (Right GUI)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    //   - Reserved byte -
    0x95, 0x01, //   Report Count (1)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x01, //   Input (Constant) - padding
    //
    //   - LED output (5 bits + 3 padding) -
    0x05, 0x08, //   Usage Page (LEDs)
    0x19, 0x01, //   Usage Minimum (Num Lock)
    0x29, 0x05, //   Usage Maximum (Kana)
    0x95, 0x05, //   Report Count (5)
    0x75, 0x01, //   Report Size (1)
    0x91, 0x02, //   Output (Data, Variable, Absolute)
    0x95, 0x01, //   Report Count (1)
    0x75, 0x03, //   Report Size (3)
    0x91, 0x01, //   Output (Constant) - padding
    //
    //   - Key codes (6 bytes) -
    0x05, 0x07, //   Usage Page (Keyboard/Keypad)
    0x19, 0x00, //   Usage Minimum (0)
    0x29, 0xFF, //   Usage Maximum (255)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, // Logical Maximum (255)
    0x95, 0x06, //   Report Count (6)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x00, //   Input (Data, Array)
    //
    0xC0, // End Collection
];
