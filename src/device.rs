//! The device core: all mutable state, advanced once per main-loop tick.
//!
//! The firmware owns exactly one [`DeviceCore`] and one [`Host`] and runs:
//!
//! ```text
//! loop {
//!     core.drain_inbox(&INBOX, |outcome| log(outcome));
//!     core.tick(now_ms, &mut host).await;
//!     core.poll_diagnostics(now_ms, heap_free, &mut host);
//!     // button events → core.on_button(event, &mut host).await
//! }
//! ```
//!
//! Macros (and the print shortcut inside the label sequence) are awaited
//! inline, so while one runs nothing else in the core moves and link
//! events wait in the inbox.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal_async::delay::DelayNs;

use crate::config::{
    DIAGNOSTICS_PERIOD_MS, MACRO_STATUS_MS, STATUS_BOOT_NO_STORE, STATUS_BOOT_STORE_OK,
    STATUS_PRINTED, STATUS_PRINTING, STATUS_READY, STATUS_RECEIVED,
};
use crate::error::{ControlError, DispatchError};
use crate::hid::Keyboard;
use crate::link::control::{ControlMessage, ControlProtocol};
use crate::link::payload::{PayloadIngest, TransferStatus};
use crate::link::{Inbox, LinkEvent, LinkSession};
use crate::macros::script::ScriptSource;
use crate::macros::{self, send_print_combo, MacroDispatch, PRINT_LABEL_ID};
use crate::mode::{DeviceMode, DeviceModeMachine, ModeInputs, ModeTimings, Step, Transition};
use crate::transfer::TransferBuffer;
use crate::ui::{diagnostics_line, ButtonEvent, ImageRenderer, MacroMenu, StatusLine, StatusSurface};

/// The collaborators the core drives.
pub struct Host<K, D, P, S> {
    pub keyboard: K,
    pub delay: D,
    /// Screen: status line, menu and image drawing.
    pub panel: P,
    pub scripts: S,
}

/// What handling one link event did, for the caller to log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkOutcome {
    Connected {
        connections: u32,
    },
    Disconnected {
        resume_advertising: bool,
    },
    Control(Result<ControlMessage, ControlError>),
    Payload {
        status: TransferStatus,
        loaded: usize,
        capacity: usize,
        /// Percentage when this chunk crossed another tenth of the image.
        milestone: Option<u8>,
    },
}

/// What a button press did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonOutcome {
    /// Menu cursor now on this row.
    Moved(usize),
    /// Macro with this id was run.
    Ran(u8),
    /// The label sequence is running; SELECT is ignored.
    Busy,
}

/// All mutable device state.
#[derive(Debug)]
pub struct DeviceCore {
    transfer: TransferBuffer,
    control: ControlProtocol,
    ingest: PayloadIngest,
    link: LinkSession,
    inputs: ModeInputs,
    machine: DeviceModeMachine,
    menu: MacroMenu,
    diagnostics_period_ms: u64,
    last_diagnostics: u64,
}

impl DeviceCore {
    pub fn new(transfer: TransferBuffer, timings: ModeTimings) -> Self {
        Self {
            transfer,
            control: ControlProtocol::new(),
            ingest: PayloadIngest::new(),
            link: LinkSession::new(),
            inputs: ModeInputs::default(),
            machine: DeviceModeMachine::new(timings),
            menu: MacroMenu::new(),
            diagnostics_period_ms: DIAGNOSTICS_PERIOD_MS,
            last_diagnostics: 0,
        }
    }

    pub fn mode(&self) -> DeviceMode {
        self.machine.mode()
    }

    pub fn transfer(&self) -> &TransferBuffer {
        &self.transfer
    }

    pub fn link(&self) -> &LinkSession {
        &self.link
    }

    pub fn menu(&self) -> &MacroMenu {
        &self.menu
    }

    /// Chunks rejected since boot.
    pub fn rejected_chunks(&self) -> u32 {
        self.ingest.rejected()
    }

    /// Show the boot status depending on whether the script store loaded.
    pub fn announce_boot<P: StatusSurface>(&self, panel: &mut P, scripts_loaded: bool) {
        panel.set_status(if scripts_loaded {
            STATUS_BOOT_STORE_OK
        } else {
            STATUS_BOOT_NO_STORE
        });
    }

    /// Apply one event from the link task.
    pub fn on_link_event(&mut self, event: LinkEvent) -> LinkOutcome {
        match event {
            LinkEvent::Connected => {
                self.link.on_connected();
                LinkOutcome::Connected {
                    connections: self.link.connections(),
                }
            }
            LinkEvent::Disconnected => LinkOutcome::Disconnected {
                resume_advertising: self.link.on_disconnected(),
            },
            LinkEvent::Control(bytes) => LinkOutcome::Control(self.control.handle(
                &bytes,
                &mut self.transfer,
                &mut self.inputs,
            )),
            LinkEvent::Payload(bytes) => {
                let status = self
                    .ingest
                    .ingest(&bytes, &mut self.transfer, &mut self.inputs);
                let (loaded, capacity) = self.transfer.progress();
                let milestone = match status {
                    TransferStatus::Rejected(_) => None,
                    _ => self.transfer.progress_milestone(bytes.len()),
                };
                LinkOutcome::Payload {
                    status,
                    loaded,
                    capacity,
                    milestone,
                }
            }
        }
    }

    /// Handle everything currently queued in `inbox`. Returns how many
    /// events were processed.
    pub fn drain_inbox<M: RawMutex>(
        &mut self,
        inbox: &Inbox<M>,
        mut on_outcome: impl FnMut(LinkOutcome),
    ) -> usize {
        let mut handled = 0;
        while let Ok(event) = inbox.try_receive() {
            on_outcome(self.on_link_event(event));
            handled += 1;
        }
        handled
    }

    /// Advance the label sequence to `now` (ms) and perform its side effects.
    pub async fn tick<K, D, P, S>(
        &mut self,
        now: u64,
        host: &mut Host<K, D, P, S>,
    ) -> Option<Transition>
    where
        K: Keyboard,
        D: DelayNs,
        P: StatusSurface + ImageRenderer,
        S: ScriptSource,
    {
        match self.machine.poll(now, &mut self.inputs) {
            Step::Dwell => None,
            Step::Idle => {
                host.panel.tick();
                None
            }
            Step::ManualPrint => {
                let _ = self.dispatch(PRINT_LABEL_ID, host).await;
                host.panel.tick();
                None
            }
            Step::Enter(transition) => {
                self.enter(transition.to, host).await;
                Some(transition)
            }
        }
    }

    async fn enter<K, D, P, S>(&mut self, mode: DeviceMode, host: &mut Host<K, D, P, S>)
    where
        K: Keyboard,
        D: DelayNs,
        P: StatusSurface + ImageRenderer,
    {
        match mode {
            DeviceMode::Received => host.panel.set_status(STATUS_RECEIVED),
            DeviceMode::ShowingImage => {
                // A START_IMAGE that landed mid-sequence replaced the buffer;
                // then there is nothing complete to draw, but we still print.
                if let Some(image) = self.transfer.completed() {
                    host.panel.decode_and_draw(image);
                }
                send_print_combo(&mut host.keyboard, &mut host.delay).await;
                host.panel.set_status(STATUS_PRINTING);
            }
            DeviceMode::Printed => host.panel.set_status(STATUS_PRINTED),
            DeviceMode::Idle => {
                host.panel.set_status(STATUS_READY);
                host.panel.invalidate();
            }
        }
    }

    /// Run macro `id`, showing its label while it runs.
    ///
    /// Unknown ids do nothing and still succeed.
    pub async fn dispatch<K, D, P, S>(
        &mut self,
        id: u8,
        host: &mut Host<K, D, P, S>,
    ) -> Result<(), DispatchError>
    where
        K: Keyboard,
        D: DelayNs,
        P: StatusSurface,
        S: ScriptSource,
    {
        let Ok(entry) = MacroDispatch::lookup(id) else {
            return Ok(());
        };

        host.panel.set_status(entry.label);
        macros::execute(entry.action, &mut host.keyboard, &mut host.delay, &host.scripts).await;
        host.delay.delay_ms(MACRO_STATUS_MS).await;
        host.panel.set_status(STATUS_READY);
        Ok(())
    }

    /// Menu navigation; SELECT runs the highlighted macro while idle.
    pub async fn on_button<K, D, P, S>(
        &mut self,
        event: ButtonEvent,
        host: &mut Host<K, D, P, S>,
    ) -> ButtonOutcome
    where
        K: Keyboard,
        D: DelayNs,
        P: StatusSurface,
        S: ScriptSource,
    {
        if event == ButtonEvent::Select && self.mode() != DeviceMode::Idle {
            return ButtonOutcome::Busy;
        }

        match self.menu.on_button(event) {
            Some(id) => {
                let _ = self.dispatch(id, host).await;
                ButtonOutcome::Ran(id)
            }
            None => ButtonOutcome::Moved(self.menu.selected()),
        }
    }

    /// Compose the periodic diagnostics line once per period.
    ///
    /// While idle it also replaces the status text; during the label
    /// sequence it is only returned for logging.
    pub fn poll_diagnostics<K, D, P, S>(
        &mut self,
        now: u64,
        heap_free: usize,
        host: &mut Host<K, D, P, S>,
    ) -> Option<StatusLine>
    where
        K: Keyboard,
        P: StatusSurface,
    {
        if now.saturating_sub(self.last_diagnostics) < self.diagnostics_period_ms {
            return None;
        }
        self.last_diagnostics = now;

        let line = diagnostics_line(heap_free, self.link.is_connected(), host.keyboard.is_ready());
        if self.mode() == DeviceMode::Idle {
            host.panel.set_status(&line);
        }
        Some(line)
    }
}

impl Default for DeviceCore {
    fn default() -> Self {
        Self::new(TransferBuffer::new(), ModeTimings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::Key;
    use crate::link::post;
    use crate::macros::script::NoScripts;
    use crate::testing::{KeyCall, RecordingDelay, RecordingKeyboard, RecordingPanel};
    use embassy_futures::block_on;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use embassy_sync::channel::Channel;

    type TestHost = Host<RecordingKeyboard, RecordingDelay, RecordingPanel, NoScripts>;

    fn host() -> TestHost {
        Host {
            keyboard: RecordingKeyboard::default(),
            delay: RecordingDelay::default(),
            panel: RecordingPanel::default(),
            scripts: NoScripts,
        }
    }

    fn control(core: &mut DeviceCore, json: &str) -> LinkOutcome {
        core.on_link_event(LinkEvent::control(json.as_bytes()).unwrap())
    }

    fn payload(core: &mut DeviceCore, bytes: &[u8]) -> LinkOutcome {
        core.on_link_event(LinkEvent::payload(bytes).unwrap())
    }

    #[test]
    fn payload_outcome_reports_progress() {
        let mut core = DeviceCore::default();
        control(&mut core, r#"{"command":"START_IMAGE","size":10}"#);

        assert_eq!(
            payload(&mut core, &[0; 5]),
            LinkOutcome::Payload {
                status: TransferStatus::Accepted,
                loaded: 5,
                capacity: 10,
                milestone: Some(50),
            }
        );
        assert!(matches!(
            payload(&mut core, &[0; 5]),
            LinkOutcome::Payload {
                status: TransferStatus::Completed,
                loaded: 10,
                ..
            }
        ));
        assert!(matches!(
            payload(&mut core, &[0; 1]),
            LinkOutcome::Payload {
                status: TransferStatus::Rejected(_),
                loaded: 10,
                milestone: None,
                ..
            }
        ));
        assert_eq!(core.rejected_chunks(), 1);
    }

    #[test]
    fn connection_events_update_the_session() {
        let mut core = DeviceCore::default();
        assert_eq!(
            core.on_link_event(LinkEvent::Connected),
            LinkOutcome::Connected { connections: 1 }
        );
        assert!(core.link().is_connected());
        assert_eq!(
            core.on_link_event(LinkEvent::Disconnected),
            LinkOutcome::Disconnected {
                resume_advertising: true
            }
        );
        assert!(!core.link().is_connected());
    }

    #[test]
    fn drain_handles_everything_queued() {
        let inbox: Inbox<CriticalSectionRawMutex> = Channel::new();
        post(&inbox, LinkEvent::Connected).unwrap();
        post(&inbox, LinkEvent::control(br#"{"command":"START_IMAGE","size":2}"#).unwrap()).unwrap();
        post(&inbox, LinkEvent::payload(&[1, 2]).unwrap()).unwrap();

        let mut core = DeviceCore::default();
        let mut outcomes = std::vec::Vec::new();
        assert_eq!(core.drain_inbox(&inbox, |o| outcomes.push(o)), 3);
        assert_eq!(outcomes.len(), 3);
        assert!(core.transfer().is_ready());
        assert_eq!(core.drain_inbox(&inbox, |_| {}), 0);
    }

    #[test]
    fn showing_image_draws_then_prints() {
        let mut core = DeviceCore::default();
        let mut host = host();
        control(&mut core, r#"{"command":"START_IMAGE","size":3}"#);
        payload(&mut core, &[0xFF, 0xD8, 0x00]);

        block_on(async {
            core.tick(0, &mut host).await;
            assert_eq!(host.panel.last_status(), Some(STATUS_RECEIVED));
            core.tick(2_000, &mut host).await;
        });

        assert_eq!(host.panel.drawn, [std::vec![0xFF, 0xD8, 0x00]]);
        assert_eq!(
            host.keyboard.calls.as_slice(),
            &[
                KeyCall::Press(Key::LeftAlt),
                KeyCall::Press(Key::Char('p')),
                KeyCall::ReleaseAll,
            ]
        );
        assert_eq!(host.panel.last_status(), Some(STATUS_PRINTING));
    }

    #[test]
    fn restart_mid_sequence_prints_without_drawing() {
        let mut core = DeviceCore::default();
        let mut host = host();
        control(&mut core, r#"{"command":"START_IMAGE","size":1}"#);
        payload(&mut core, &[7]);

        block_on(core.tick(0, &mut host));
        assert_eq!(core.mode(), DeviceMode::Received);

        // New transfer replaces the completed buffer during the dwell.
        control(&mut core, r#"{"command":"START_IMAGE","size":4}"#);
        block_on(core.tick(2_000, &mut host));

        assert_eq!(core.mode(), DeviceMode::ShowingImage);
        assert!(host.panel.drawn.is_empty());
        assert_eq!(host.keyboard.calls.len(), 3);
    }

    #[test]
    fn return_to_idle_requests_redraw() {
        let mut core = DeviceCore::default();
        let mut host = host();
        control(&mut core, r#"{"command":"START_IMAGE","size":1}"#);
        payload(&mut core, &[7]);

        block_on(async {
            for now in [0, 2_000, 5_000, 8_000] {
                assert!(core.tick(now, &mut host).await.is_some());
            }
        });
        assert_eq!(core.mode(), DeviceMode::Idle);
        assert_eq!(host.panel.invalidations, 1);
        assert_eq!(
            host.panel.statuses,
            [STATUS_RECEIVED, STATUS_PRINTING, STATUS_PRINTED, STATUS_READY]
        );
        // No UI tick happened while the sequence ran.
        assert_eq!(host.panel.ticks, 0);
    }

    #[test]
    fn idle_tick_drives_the_panel() {
        let mut core = DeviceCore::default();
        let mut host = host();
        block_on(async {
            core.tick(0, &mut host).await;
            core.tick(5, &mut host).await;
        });
        assert_eq!(host.panel.ticks, 2);
        assert!(host.keyboard.calls.is_empty());
    }

    #[test]
    fn print_command_in_idle_runs_the_print_macro() {
        let mut core = DeviceCore::default();
        let mut host = host();
        control(&mut core, r#"{"command":"PRINT"}"#);

        assert_eq!(block_on(core.tick(0, &mut host)), None);
        assert_eq!(host.keyboard.calls.len(), 3);
        assert_eq!(host.panel.statuses, ["Printing Label", STATUS_READY]);
        assert_eq!(host.delay.waits_ms.as_slice(), &[10, MACRO_STATUS_MS]);
    }

    #[test]
    fn dispatch_shows_label_then_ready() {
        let mut core = DeviceCore::default();
        let mut host = host();
        block_on(core.dispatch(5, &mut host)).unwrap();
        assert_eq!(host.panel.statuses, ["Locking PC", STATUS_READY]);
        assert_eq!(host.delay.waits_ms.last(), Some(&MACRO_STATUS_MS));
    }

    #[test]
    fn dispatch_unknown_is_silent() {
        let mut core = DeviceCore::default();
        let mut host = host();
        assert_eq!(block_on(core.dispatch(200, &mut host)), Ok(()));
        assert!(host.keyboard.calls.is_empty());
        assert!(host.panel.statuses.is_empty());
    }

    #[test]
    fn select_is_ignored_during_the_sequence() {
        let mut core = DeviceCore::default();
        let mut host = host();
        control(&mut core, r#"{"command":"START_IMAGE","size":1}"#);
        payload(&mut core, &[7]);
        block_on(core.tick(0, &mut host));

        assert_eq!(
            block_on(core.on_button(ButtonEvent::Select, &mut host)),
            ButtonOutcome::Busy
        );
        assert_eq!(
            block_on(core.on_button(ButtonEvent::Down, &mut host)),
            ButtonOutcome::Moved(1)
        );
        assert!(host.keyboard.calls.is_empty());
    }

    #[test]
    fn select_in_idle_runs_the_highlighted_macro() {
        let mut core = DeviceCore::default();
        let mut host = host();
        block_on(core.on_button(ButtonEvent::Down, &mut host));
        block_on(core.on_button(ButtonEvent::Down, &mut host));
        block_on(core.on_button(ButtonEvent::Down, &mut host));
        assert_eq!(
            block_on(core.on_button(ButtonEvent::Select, &mut host)),
            ButtonOutcome::Ran(3)
        );
        assert_eq!(host.keyboard.typed(), ["notepad"]);
    }

    #[test]
    fn diagnostics_every_period_and_only_idle_writes_status() {
        let mut core = DeviceCore::default();
        let mut host = host();
        host.keyboard.ready = false;

        assert_eq!(core.poll_diagnostics(1_000, 512, &mut host), None);
        let line = core.poll_diagnostics(3_000, 512, &mut host).unwrap();
        assert_eq!(line.as_str(), "RAM:512 | BLE:DISC | HID:ERR");
        assert_eq!(host.panel.last_status(), Some(line.as_str()));
        assert_eq!(core.poll_diagnostics(5_999, 512, &mut host), None);

        control(&mut core, r#"{"command":"START_IMAGE","size":1}"#);
        payload(&mut core, &[7]);
        block_on(core.tick(6_000, &mut host));
        core.on_link_event(LinkEvent::Connected);
        host.keyboard.ready = true;

        let line = core.poll_diagnostics(6_000, 64, &mut host).unwrap();
        assert_eq!(line.as_str(), "RAM:64 | BLE:OK | HID:READY");
        assert_eq!(host.panel.last_status(), Some(STATUS_RECEIVED));
    }

    #[test]
    fn boot_status_reflects_script_store() {
        let core = DeviceCore::default();
        let mut panel = RecordingPanel::default();
        core.announce_boot(&mut panel, true);
        core.announce_boot(&mut panel, false);
        assert_eq!(panel.statuses, [STATUS_BOOT_STORE_OK, STATUS_BOOT_NO_STORE]);
    }
}
