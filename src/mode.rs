//! Device mode state machine.
//!
//! ```text
//!            transfer complete        2000 ms            3000 ms         3000 ms
//!   Idle ─────────────────────▶ Received ─────▶ ShowingImage ─────▶ Printed ─────▶ Idle
//! ```
//!
//! The machine itself is pure: [`DeviceModeMachine::poll`] consumes the
//! edge-triggered [`ModeInputs`] and a millisecond timestamp and says what
//! should happen this tick. Side effects (drawing, the print shortcut, status
//! text) belong to the caller, see [`crate::device::DeviceCore::tick`].

use crate::config::{DWELL_PRINTED_MS, DWELL_RECEIVED_MS, DWELL_SHOWING_IMAGE_MS};

/// Where the label sequence currently is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceMode {
    /// Menu is live; waiting for a completed transfer.
    #[default]
    Idle,
    /// "Received" confirmation on screen.
    Received,
    /// Image drawn, print shortcut sent.
    ShowingImage,
    /// "Printed" confirmation on screen.
    Printed,
}

impl DeviceMode {
    /// Mode that follows this one once its dwell elapses.
    pub fn next(self) -> DeviceMode {
        match self {
            DeviceMode::Idle => DeviceMode::Received,
            DeviceMode::Received => DeviceMode::ShowingImage,
            DeviceMode::ShowingImage => DeviceMode::Printed,
            DeviceMode::Printed => DeviceMode::Idle,
        }
    }
}

/// How long each non-idle mode is held.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModeTimings {
    pub received_ms: u64,
    pub showing_image_ms: u64,
    pub printed_ms: u64,
}

impl ModeTimings {
    /// Dwell for `mode`, `None` for [`DeviceMode::Idle`] which has no timeout.
    pub fn dwell(&self, mode: DeviceMode) -> Option<u64> {
        match mode {
            DeviceMode::Idle => None,
            DeviceMode::Received => Some(self.received_ms),
            DeviceMode::ShowingImage => Some(self.showing_image_ms),
            DeviceMode::Printed => Some(self.printed_ms),
        }
    }
}

impl Default for ModeTimings {
    fn default() -> Self {
        Self {
            received_ms: DWELL_RECEIVED_MS,
            showing_image_ms: DWELL_SHOWING_IMAGE_MS,
            printed_ms: DWELL_PRINTED_MS,
        }
    }
}

/// Edge-triggered inputs raised by the link handlers.
///
/// Each flag is consumed by the first `take_*` that observes it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModeInputs {
    transfer_complete: bool,
    print_requested: bool,
}

impl ModeInputs {
    pub fn raise_transfer_complete(&mut self) {
        self.transfer_complete = true;
    }

    pub fn take_transfer_complete(&mut self) -> bool {
        core::mem::take(&mut self.transfer_complete)
    }

    /// Withdraw a completion that nobody has observed yet.
    pub fn clear_transfer_complete(&mut self) {
        self.transfer_complete = false;
    }

    /// Manual print request. Repeated requests before the next poll coalesce.
    pub fn request_print(&mut self) {
        self.print_requested = true;
    }

    pub fn take_print_request(&mut self) -> bool {
        core::mem::take(&mut self.print_requested)
    }

    pub fn is_transfer_complete_pending(&self) -> bool {
        self.transfer_complete
    }
}

/// A mode change, as reported to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transition {
    pub from: DeviceMode,
    pub to: DeviceMode,
    /// Timestamp (ms) the new mode was entered.
    pub at: u64,
}

/// What the caller should do after a poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step {
    /// Idle with nothing pending; run the periodic UI tick.
    Idle,
    /// Idle and a manual print was requested.
    ManualPrint,
    /// A timed mode is still dwelling.
    Dwell,
    /// The mode changed.
    Enter(Transition),
}

/// The single device-mode state machine.
#[derive(Debug)]
pub struct DeviceModeMachine {
    mode: DeviceMode,
    entered_at: u64,
    timings: ModeTimings,
}

impl DeviceModeMachine {
    pub fn new(timings: ModeTimings) -> Self {
        Self {
            mode: DeviceMode::Idle,
            entered_at: 0,
            timings,
        }
    }

    pub fn mode(&self) -> DeviceMode {
        self.mode
    }

    /// Timestamp (ms) at which the current mode was entered.
    pub fn entered_at(&self) -> u64 {
        self.entered_at
    }

    pub fn timings(&self) -> &ModeTimings {
        &self.timings
    }

    /// Advance the machine to `now` (ms, monotonic).
    ///
    /// A completion is only consumed from `Idle`; one raised mid-sequence
    /// stays pending until the sequence returns to `Idle`. Print requests
    /// are only honoured from `Idle` and are discarded otherwise, because the
    /// running sequence sends the shortcut itself.
    pub fn poll(&mut self, now: u64, inputs: &mut ModeInputs) -> Step {
        match self.timings.dwell(self.mode) {
            None => {
                if inputs.take_transfer_complete() {
                    inputs.take_print_request();
                    self.enter(DeviceMode::Received, now)
                } else if inputs.take_print_request() {
                    Step::ManualPrint
                } else {
                    Step::Idle
                }
            }
            Some(dwell) => {
                inputs.take_print_request();
                if now.saturating_sub(self.entered_at) >= dwell {
                    self.enter(self.mode.next(), now)
                } else {
                    Step::Dwell
                }
            }
        }
    }

    fn enter(&mut self, to: DeviceMode, now: u64) -> Step {
        let from = self.mode;
        self.mode = to;
        self.entered_at = now;
        Step::Enter(Transition { from, to, at: now })
    }
}

impl Default for DeviceModeMachine {
    fn default() -> Self {
        Self::new(ModeTimings::default())
    }
}
