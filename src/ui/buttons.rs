//! GPIO button input with async debouncing.
//!
//! Three physical buttons (active-low with internal pull-up):
//!   - UP     - previous macro
//!   - DOWN   - next macro
//!   - SELECT - run the highlighted macro
//!
//! Each button runs in its own task: wait for the falling edge, debounce,
//! post a `ButtonEvent` to the main loop, wait for release.

use defmt::{info, warn};
use delfin_panel::config::BUTTON_DEBOUNCE_MS;
use delfin_panel::ui::ButtonEvent;
use embassy_nrf::gpio::{AnyPin, Input, Pull};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Sender;
use embassy_time::{Duration, Timer};

/// Depth of the button → main loop channel.
pub const BUTTON_QUEUE_DEPTH: usize = 4;

pub type ButtonSender = Sender<'static, CriticalSectionRawMutex, ButtonEvent, BUTTON_QUEUE_DEPTH>;

/// Run a single button polling loop.
///
/// Presses made while the queue is full (a macro is running) are dropped
/// rather than replayed afterwards.
pub async fn button_task(pin: AnyPin, event: ButtonEvent, tx: ButtonSender) -> ! {
    let mut btn = Input::new(pin, Pull::Up);

    loop {
        btn.wait_for_falling_edge().await;
        Timer::after(Duration::from_millis(BUTTON_DEBOUNCE_MS)).await;

        if btn.is_low() {
            info!("Button: {}", event);
            if tx.try_send(event).is_err() {
                warn!("Button: queue full, {} dropped", event);
            }

            // Wait for release to avoid repeat triggers.
            btn.wait_for_rising_edge().await;
            Timer::after(Duration::from_millis(BUTTON_DEBOUNCE_MS)).await;
        }
    }
}
