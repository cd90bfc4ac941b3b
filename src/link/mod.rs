//! Wireless link: session lifecycle and the two inbound channels.
//!
//! The BLE stack runs in its own task. Everything it receives is posted as a
//! [`LinkEvent`] into a bounded [`Inbox`]; the main loop drains the inbox once
//! per tick and feeds each event to the device core. That handoff is the
//! only concurrency boundary the core sees.
//!
//! - **control** - JSON commands, see [`control`].
//! - **payload** - raw image chunks, see [`payload`].

pub mod control;
pub mod payload;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;

use crate::config::{LINK_CHUNK_MAX, LINK_INBOX_DEPTH};

/// One characteristic write, as received.
pub type Chunk = Vec<u8, LINK_CHUNK_MAX>;

/// Events the link task hands to the main loop.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkEvent {
    /// A central connected.
    Connected,
    /// The central went away.
    Disconnected,
    /// Write on the control characteristic.
    Control(Chunk),
    /// Write on the image payload characteristic.
    Payload(Chunk),
}

impl LinkEvent {
    /// Build a control event, `None` if `bytes` exceeds one write.
    pub fn control(bytes: &[u8]) -> Option<Self> {
        Vec::from_slice(bytes).ok().map(LinkEvent::Control)
    }

    /// Build a payload event, `None` if `bytes` exceeds one write.
    pub fn payload(bytes: &[u8]) -> Option<Self> {
        Vec::from_slice(bytes).ok().map(LinkEvent::Payload)
    }
}

/// Single-producer / single-consumer handoff from the link task.
pub type Inbox<M> = Channel<M, LinkEvent, LINK_INBOX_DEPTH>;

/// Post an event without blocking the BLE callback.
///
/// Returns the event back if the inbox is full; the caller drops it.
pub fn post<M: RawMutex>(inbox: &Inbox<M>, event: LinkEvent) -> Result<(), LinkEvent> {
    inbox.try_send(event).map_err(|e| match e {
        embassy_sync::channel::TrySendError::Full(event) => event,
    })
}

/// Connection lifecycle of the single peer we serve.
#[derive(Debug, Default)]
pub struct LinkSession {
    connected: bool,
    connections: u32,
}

impl LinkSession {
    pub const fn new() -> Self {
        Self {
            connected: false,
            connections: 0,
        }
    }

    pub fn on_connected(&mut self) {
        self.connected = true;
        self.connections = self.connections.wrapping_add(1);
    }

    /// Mark the peer gone. Always asks for advertising to resume so the
    /// panel is discoverable again.
    pub fn on_disconnected(&mut self) -> bool {
        self.connected = false;
        true
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Number of connections accepted since boot.
    pub fn connections(&self) -> u32 {
        self.connections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

    #[test]
    fn session_tracks_connect_and_disconnect() {
        let mut session = LinkSession::new();
        assert!(!session.is_connected());

        session.on_connected();
        assert!(session.is_connected());
        assert_eq!(session.connections(), 1);

        assert!(session.on_disconnected());
        assert!(!session.is_connected());

        session.on_connected();
        assert_eq!(session.connections(), 2);
    }

    #[test]
    fn oversized_write_cannot_become_an_event() {
        let big = [0u8; LINK_CHUNK_MAX + 1];
        assert!(LinkEvent::payload(&big).is_none());
        assert!(LinkEvent::control(&big).is_none());

        let ok = [7u8; LINK_CHUNK_MAX];
        assert!(matches!(LinkEvent::payload(&ok), Some(LinkEvent::Payload(c)) if c.len() == LINK_CHUNK_MAX));
    }

    #[test]
    fn full_inbox_hands_the_event_back() {
        let inbox: Inbox<CriticalSectionRawMutex> = Channel::new();
        for _ in 0..LINK_INBOX_DEPTH {
            assert!(post(&inbox, LinkEvent::Connected).is_ok());
        }
        assert_eq!(
            post(&inbox, LinkEvent::Disconnected),
            Err(LinkEvent::Disconnected)
        );

        // FIFO order is kept.
        assert_eq!(inbox.try_receive(), Ok(LinkEvent::Connected));
    }
}
