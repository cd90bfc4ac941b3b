//! Macro menu navigation.

use core::ops::Range;

use super::ButtonEvent;
use crate::macros::MACROS;

/// Cursor over the macro table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MacroMenu {
    selected: usize,
}

impl MacroMenu {
    pub const fn new() -> Self {
        Self { selected: 0 }
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Apply a button press. Returns the action id to dispatch on SELECT.
    pub fn on_button(&mut self, event: ButtonEvent) -> Option<u8> {
        match event {
            ButtonEvent::Up => {
                self.selected = select_prev(self.selected);
                None
            }
            ButtonEvent::Down => {
                self.selected = select_next(self.selected, MACROS.len());
                None
            }
            // Table has fewer than 256 entries.
            ButtonEvent::Select => u8::try_from(self.selected).ok(),
        }
    }

    /// Rows of the table to show when `rows` lines fit on screen, scrolled
    /// so the cursor stays visible.
    pub fn visible(&self, rows: usize) -> Range<usize> {
        let len = MACROS.len();
        if rows == 0 || len == 0 {
            return 0..0;
        }
        let start = (self.selected + 1).saturating_sub(rows);
        start..(start + rows).min(len)
    }
}

/// Move selection cursor one item up.
fn select_prev(selected: usize) -> usize {
    selected.saturating_sub(1)
}

/// Move selection cursor one item down if another item exists.
fn select_next(selected: usize, item_count: usize) -> usize {
    if selected + 1 < item_count {
        selected + 1
    } else {
        selected
    }
}
