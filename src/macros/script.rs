//! Stored keystroke scripts.
//!
//! One directive per line:
//!
//! | Line              | Effect                                  |
//! |-------------------|-----------------------------------------|
//! | `DELAY <ms>`      | wait                                    |
//! | `STRING <text>`   | type `text` verbatim                    |
//! | `ENTER`           | tap Enter                               |
//! | `GUI <c>`         | GUI + `c` (alias `WINDOWS <c>`)         |
//! | `ALT <c>`         | Alt + `c`                               |
//! | `TAB`             | tap Tab                                 |
//!
//! Blank lines and `//` comments are skipped. Unknown lines are ignored so
//! a script written for a richer dialect still runs the parts we know.

use embedded_hal_async::delay::DelayNs;

use crate::hid::{tap_combo, Key, Keyboard};

/// Which stored script a macro refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScriptId {
    Custom1,
    Custom2,
}

impl ScriptId {
    pub const ALL: [ScriptId; 2] = [ScriptId::Custom1, ScriptId::Custom2];

    /// Key under which the script is kept in flash.
    pub fn key(self) -> u8 {
        match self {
            ScriptId::Custom1 => 1,
            ScriptId::Custom2 => 2,
        }
    }

    /// Conventional file name, used when seeding the store.
    pub fn path(self) -> &'static str {
        match self {
            ScriptId::Custom1 => "payloads/custom1.txt",
            ScriptId::Custom2 => "payloads/custom2.txt",
        }
    }
}

/// Script-store collaborator.
pub trait ScriptSource {
    /// Script text, or `None` if nothing is stored under `id`.
    fn script(&self, id: ScriptId) -> Option<&str>;
}

/// A store with nothing in it.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoScripts;

impl ScriptSource for NoScripts {
    fn script(&self, _id: ScriptId) -> Option<&str> {
        None
    }
}

/// One parsed script line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Directive<'a> {
    Delay(u32),
    String(&'a str),
    Enter,
    Gui(char),
    Alt(char),
    Tab,
}

/// Parse one line. `None` for blanks, comments and anything unrecognised.
pub fn parse_line(line: &str) -> Option<Directive<'_>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with("//") {
        return None;
    }

    if let Some(ms) = line.strip_prefix("DELAY ") {
        // Like `atoi`: leading digits only, garbage means zero.
        let digits = ms.trim_start();
        let end = digits
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(digits.len());
        return Some(Directive::Delay(digits[..end].parse().unwrap_or(0)));
    }
    if let Some(text) = line.strip_prefix("STRING ") {
        return Some(Directive::String(text));
    }
    if let Some(rest) = line
        .strip_prefix("GUI ")
        .or_else(|| line.strip_prefix("WINDOWS "))
    {
        return rest.chars().next().map(Directive::Gui);
    }
    if let Some(rest) = line.strip_prefix("ALT ") {
        return rest.chars().next().map(Directive::Alt);
    }

    match line {
        "ENTER" => Some(Directive::Enter),
        "TAB" => Some(Directive::Tab),
        _ => None,
    }
}

/// Execute `script` line by line on `keyboard`.
pub async fn run<K: Keyboard, D: DelayNs>(script: &str, keyboard: &mut K, delay: &mut D) {
    for line in script.lines() {
        let Some(directive) = parse_line(line) else {
            continue;
        };
        match directive {
            Directive::Delay(ms) => delay.delay_ms(ms).await,
            Directive::String(text) => keyboard.type_string(text).await,
            Directive::Enter => tap_combo(keyboard, &[Key::Enter]).await,
            Directive::Gui(c) => tap_combo(keyboard, &[Key::LeftGui, Key::Char(c)]).await,
            Directive::Alt(c) => tap_combo(keyboard, &[Key::LeftAlt, Key::Char(c)]).await,
            Directive::Tab => tap_combo(keyboard, &[Key::Tab]).await,
        }
    }
}
