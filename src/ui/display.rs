//! SSD1306 OLED panel: macro menu, status line, received label card.
//!
//! ```text
//! ┌────────────────────────┐
//! │ DELFIN PANEL           │  title
//! │ > Printing Label       │
//! │   CMD                  │  four menu rows, scrolled
//! │   PowerShell           │  to keep the cursor visible
//! │   Notepad              │
//! │ Ready                  │  status line
//! └────────────────────────┘
//! ```

use core::fmt::Write;

use defmt::{debug, warn};
use delfin_panel::jpeg;
use delfin_panel::macros::MACROS;
use delfin_panel::ui::{ImageRenderer, MacroMenu, StatusLine, StatusSurface};
use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::{MonoTextStyle, MonoTextStyleBuilder};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::Text;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::I2CDisplayInterface;
use ssd1306::Ssd1306;

/// Type alias for the concrete display driver.
///
/// Generic over the I²C implementation so callers pass in their HAL's
/// I²C peripheral.
pub type Display<I2C> =
    Ssd1306<I2CInterface<I2C>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

const MENU_ROWS: usize = 4;
const STATUS_TOP: i32 = 54;
const STATUS_BASELINE: i32 = 62;

fn text_style() -> MonoTextStyle<'static, BinaryColor> {
    MonoTextStyleBuilder::new()
        .font(&FONT_6X10)
        .text_color(BinaryColor::On)
        .build()
}

/// Initialise the SSD1306 display and clear the screen.
pub fn init<I2C>(i2c: I2C) -> Display<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    let interface = I2CDisplayInterface::new(i2c);
    let mut display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
        .into_buffered_graphics_mode();
    if display.init().is_err() {
        warn!("OLED init failed");
    }
    display.clear_buffer();
    let _ = display.flush();
    display
}

/// The panel the device core draws on.
pub struct OledPanel<I2C> {
    display: Display<I2C>,
    status: StatusLine,
    menu: MacroMenu,
    /// Menu needs a full redraw on the next tick.
    dirty: bool,
}

impl<I2C> OledPanel<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    pub fn new(display: Display<I2C>) -> Self {
        Self {
            display,
            status: StatusLine::new(),
            menu: MacroMenu::new(),
            dirty: true,
        }
    }

    /// Mirror the core's menu cursor.
    pub fn set_menu(&mut self, menu: MacroMenu) {
        if menu != self.menu {
            self.menu = menu;
            self.dirty = true;
        }
    }

    fn draw_menu(&mut self) {
        self.display.clear_buffer();
        let _ = Text::new("DELFIN PANEL", Point::new(0, 8), text_style()).draw(&mut self.display);

        let visible = self.menu.visible(MENU_ROWS);
        for (row, id) in visible.enumerate() {
            let marker = if id == self.menu.selected() { ">" } else { " " };
            let mut line: heapless::String<24> = heapless::String::new();
            let _ = write!(line, "{} {}", marker, MACROS[id].label);
            let y = 20 + (row as i32 * 10);
            let _ = Text::new(line.as_str(), Point::new(0, y), text_style()).draw(&mut self.display);
        }

        self.draw_status();
    }

    fn draw_status(&mut self) {
        let _ = Rectangle::new(Point::new(0, STATUS_TOP), Size::new(128, 10))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::Off))
            .draw(&mut self.display);
        let _ = Text::new(
            self.status.as_str(),
            Point::new(0, STATUS_BASELINE),
            text_style(),
        )
        .draw(&mut self.display);
    }

    fn flush(&mut self) {
        if self.display.flush().is_err() {
            warn!("OLED flush failed");
        }
    }
}

impl<I2C> StatusSurface for OledPanel<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    fn set_status(&mut self, text: &str) {
        self.status.clear();
        // Longer text is cut at the line width.
        for c in text.chars() {
            if self.status.push(c).is_err() {
                break;
            }
        }
        self.draw_status();
        self.flush();
    }

    fn tick(&mut self) {
        if self.dirty {
            self.dirty = false;
            self.draw_menu();
            self.flush();
        }
    }

    fn invalidate(&mut self) {
        self.dirty = true;
    }
}

impl<I2C> ImageRenderer for OledPanel<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    /// The 1-bit panel cannot show the colour label, so a valid JPEG is drawn
    /// as a framed card with its dimensions.
    fn decode_and_draw(&mut self, image: &[u8]) {
        let Some(info) = jpeg::probe(image) else {
            warn!("Image: not a JPEG ({} bytes), nothing drawn", image.len());
            return;
        };
        debug!("Image: {}x{} ({} components)", info.width, info.height, info.components);

        self.display.clear_buffer();
        let _ = Rectangle::new(Point::new(0, 0), Size::new(128, STATUS_TOP as u32 - 2))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(&mut self.display);
        let _ = Text::new("LABEL", Point::new(48, 20), text_style()).draw(&mut self.display);

        let mut dims: heapless::String<24> = heapless::String::new();
        let _ = write!(dims, "{} x {}", info.width, info.height);
        let x = 64 - (dims.len() as i32 * 3);
        let _ = Text::new(dims.as_str(), Point::new(x, 36), text_style()).draw(&mut self.display);

        self.draw_status();
        self.flush();
    }
}
