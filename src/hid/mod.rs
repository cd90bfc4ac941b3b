//! Keyboard emulation towards the host computer.
//!
//! The core drives the host through the [`Keyboard`] trait; the firmware
//! implements it on top of the USB HID keyboard endpoint. Calls are awaited
//! one after another from the main loop, so a macro holds the device until
//! its last key is released.

pub mod keyboard;


pub use keyboard::{Key, KeyboardReport};

/// Keyboard-emulation collaborator.
#[allow(async_fn_in_trait)]
pub trait Keyboard {
    /// Add `key` to the held set and send the report.
    async fn press(&mut self, key: Key);

    /// Release everything and send the empty report.
    async fn release_all(&mut self);

    /// Type `text` one keystroke at a time.
    async fn type_string(&mut self, text: &str);

    /// Whether the host has configured the HID interface.
    fn is_ready(&self) -> bool {
        true
    }
}

/// Press every key of `combo` in order, then release them all.
pub async fn tap_combo<K: Keyboard>(keyboard: &mut K, combo: &[Key]) {
    for &key in combo {
        keyboard.press(key).await;
    }
    keyboard.release_all().await;
}
