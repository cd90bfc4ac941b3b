//! Recording doubles for the collaborator traits, shared by unit tests.

use std::string::String;
use std::vec::Vec;

use embedded_hal_async::delay::DelayNs;

use crate::hid::{Key, Keyboard};
use crate::macros::script::{ScriptId, ScriptSource};
use crate::ui::{ImageRenderer, StatusSurface};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyCall {
    Press(Key),
    ReleaseAll,
    Type(String),
}

#[derive(Debug)]
pub struct RecordingKeyboard {
    pub calls: Vec<KeyCall>,
    pub ready: bool,
}

impl Default for RecordingKeyboard {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            ready: true,
        }
    }
}

impl RecordingKeyboard {
    pub fn typed(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                KeyCall::Type(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Keyboard for RecordingKeyboard {
    async fn press(&mut self, key: Key) {
        self.calls.push(KeyCall::Press(key));
    }

    async fn release_all(&mut self) {
        self.calls.push(KeyCall::ReleaseAll);
    }

    async fn type_string(&mut self, text: &str) {
        self.calls.push(KeyCall::Type(text.into()));
    }

    fn is_ready(&self) -> bool {
        self.ready
    }
}

/// Records requested waits instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    pub waits_ms: Vec<u32>,
}

impl DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.waits_ms.push(ns / 1_000_000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.waits_ms.push(ms);
    }
}

#[derive(Debug, Default)]
pub struct RecordingPanel {
    pub statuses: Vec<String>,
    pub drawn: Vec<Vec<u8>>,
    pub ticks: usize,
    pub invalidations: usize,
}

impl RecordingPanel {
    pub fn last_status(&self) -> Option<&str> {
        self.statuses.last().map(String::as_str)
    }
}

impl StatusSurface for RecordingPanel {
    fn set_status(&mut self, text: &str) {
        self.statuses.push(text.into());
    }

    fn tick(&mut self) {
        self.ticks += 1;
    }

    fn invalidate(&mut self) {
        self.invalidations += 1;
    }
}

impl ImageRenderer for RecordingPanel {
    fn decode_and_draw(&mut self, image: &[u8]) {
        self.drawn.push(image.to_vec());
    }
}

#[derive(Debug, Default)]
pub struct FixedScripts {
    pub custom1: Option<&'static str>,
    pub custom2: Option<&'static str>,
}

impl ScriptSource for FixedScripts {
    fn script(&self, id: ScriptId) -> Option<&str> {
        match id {
            ScriptId::Custom1 => self.custom1,
            ScriptId::Custom2 => self.custom2,
        }
    }
}
