//! User interface: status line, macro menu, and the panel traits.
//!
//! The core only talks to the screen through [`StatusSurface`] and
//! [`ImageRenderer`]. On the device both are implemented by the SSD1306
//! panel in the firmware binary.

pub mod menu;
pub mod status;

pub use menu::MacroMenu;
pub use status::{diagnostics_line, StatusLine};

/// Physical button events (after debouncing).
///
/// - UP/DOWN: move through the macro menu
/// - SELECT: run the highlighted macro
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonEvent {
    Up,
    Down,
    Select,
}

/// Single-line status text plus the periodic menu refresh.
pub trait StatusSurface {
    /// Replace the status text. Last writer wins.
    fn set_status(&mut self, text: &str);

    /// Periodic refresh while the menu is live.
    fn tick(&mut self);

    /// Request a full redraw on the next tick.
    fn invalidate(&mut self);
}

/// Draws a received image. Best effort: bad input draws nothing.
pub trait ImageRenderer {
    fn decode_and_draw(&mut self, image: &[u8]);
}
