//! Control channel protocol.
//!
//! The sender writes small JSON objects to the control characteristic:
//!
//! ```text
//! {"command":"START_IMAGE","size":<bytes>}   announce a transfer
//! {"command":"PRINT"}                        ask for a print
//! ```
//!
//! Anything else is a [`ParseError`] and leaves the transfer untouched.

use serde::Deserialize;

use crate::error::{ControlError, ParseError};
use crate::mode::ModeInputs;
use crate::transfer::TransferBuffer;

const CMD_START_IMAGE: &str = "START_IMAGE";
const CMD_PRINT: &str = "PRINT";

/// A decoded control message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlMessage {
    /// A new image of `declared_size` bytes follows on the payload channel.
    StartTransfer { declared_size: usize },
    /// Manual print request.
    PrintTrigger,
}

#[derive(Deserialize)]
struct RawControl<'a> {
    #[serde(borrow)]
    command: Option<&'a str>,
    size: Option<u64>,
}

/// Decode one control write.
pub fn parse(bytes: &[u8]) -> Result<ControlMessage, ParseError> {
    if bytes.is_empty() {
        return Err(ParseError::Empty);
    }

    let (raw, _) =
        serde_json_core::from_slice::<RawControl<'_>>(bytes).map_err(|_| ParseError::Malformed)?;

    match raw.command {
        None => Err(ParseError::MissingCommand),
        Some(CMD_START_IMAGE) => {
            let size = raw.size.ok_or(ParseError::MissingSize)?;
            Ok(ControlMessage::StartTransfer {
                // Sizes past the address space can only fail allocation.
                declared_size: usize::try_from(size).unwrap_or(usize::MAX),
            })
        }
        Some(CMD_PRINT) => Ok(ControlMessage::PrintTrigger),
        Some(_) => Err(ParseError::UnknownCommand),
    }
}

/// Applies control messages to the transfer buffer and mode inputs.
#[derive(Debug, Default)]
pub struct ControlProtocol {
    /// Last `START_IMAGE` failed to allocate; payload is dropped until the
    /// next successful one.
    inert: bool,
}

impl ControlProtocol {
    pub const fn new() -> Self {
        Self { inert: false }
    }

    /// Decode and apply one control write.
    ///
    /// On a parse error nothing changes. A `StartTransfer` replaces any
    /// transfer in flight and withdraws a completion the mode machine has
    /// not picked up yet.
    pub fn handle(
        &mut self,
        bytes: &[u8],
        transfer: &mut TransferBuffer,
        inputs: &mut ModeInputs,
    ) -> Result<ControlMessage, ControlError> {
        let message = parse(bytes)?;

        match message {
            ControlMessage::StartTransfer { declared_size } => {
                inputs.clear_transfer_complete();
                match transfer.begin_transfer(declared_size) {
                    Ok(()) => self.inert = false,
                    Err(e) => {
                        self.inert = true;
                        return Err(e.into());
                    }
                }
            }
            ControlMessage::PrintTrigger => inputs.request_print(),
        }

        Ok(message)
    }

    pub fn is_inert(&self) -> bool {
        self.inert
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AllocError;

    #[test]
    fn parses_start_image() {
        assert_eq!(
            parse(br#"{"command":"START_IMAGE","size":1024}"#),
            Ok(ControlMessage::StartTransfer {
                declared_size: 1024
            })
        );
    }

    #[test]
    fn parses_print() {
        assert_eq!(
            parse(br#"{"command":"PRINT"}"#),
            Ok(ControlMessage::PrintTrigger)
        );
    }

    #[test]
    fn empty_object_is_missing_command() {
        assert_eq!(parse(b"{}"), Err(ParseError::MissingCommand));
    }

    #[test]
    fn rejects_bad_payloads() {
        assert_eq!(parse(b""), Err(ParseError::Empty));
        assert_eq!(parse(b"not json"), Err(ParseError::Malformed));
        assert_eq!(parse(br#"{"command":"START_IMAGE"#), Err(ParseError::Malformed));
        assert_eq!(
            parse(br#"{"command":"START_IMAGE","size":-5}"#),
            Err(ParseError::Malformed)
        );
        assert_eq!(
            parse(br#"{"command":"START_IMAGE"}"#),
            Err(ParseError::MissingSize)
        );
        assert_eq!(
            parse(br#"{"command":"REBOOT"}"#),
            Err(ParseError::UnknownCommand)
        );
        assert_eq!(
            parse(br#"{"size":10}"#),
            Err(ParseError::MissingCommand)
        );
    }

    #[test]
    fn field_order_and_spacing_do_not_matter() {
        assert_eq!(
            parse(br#"{ "size" : 42 , "command" : "START_IMAGE" }"#),
            Ok(ControlMessage::StartTransfer { declared_size: 42 })
        );
    }

    #[test]
    fn start_allocates_and_clears_pending_completion() {
        let mut protocol = ControlProtocol::new();
        let mut transfer = TransferBuffer::new();
        let mut inputs = ModeInputs::default();
        inputs.raise_transfer_complete();

        let msg = protocol
            .handle(br#"{"command":"START_IMAGE","size":16}"#, &mut transfer, &mut inputs)
            .unwrap();
        assert_eq!(msg, ControlMessage::StartTransfer { declared_size: 16 });
        assert_eq!(transfer.progress(), (0, 16));
        assert!(!inputs.take_transfer_complete());
        assert!(!protocol.is_inert());
    }

    #[test]
    fn parse_error_leaves_transfer_alone() {
        let mut protocol = ControlProtocol::new();
        let mut transfer = TransferBuffer::new();
        let mut inputs = ModeInputs::default();
        transfer.begin_transfer(4).unwrap();
        transfer.append(&[1, 2]).unwrap();

        let err = protocol
            .handle(b"{}", &mut transfer, &mut inputs)
            .unwrap_err();
        assert_eq!(err, ControlError::Parse(ParseError::MissingCommand));
        assert_eq!(transfer.progress(), (2, 4));
    }

    #[test]
    fn failed_allocation_goes_inert_until_next_start() {
        let mut protocol = ControlProtocol::new();
        let mut transfer = TransferBuffer::new();
        let mut inputs = ModeInputs::default();

        let err = protocol
            .handle(br#"{"command":"START_IMAGE","size":0}"#, &mut transfer, &mut inputs)
            .unwrap_err();
        assert_eq!(err, ControlError::Alloc(AllocError::Empty));
        assert!(protocol.is_inert());
        assert_eq!(transfer.progress(), (0, 0));

        protocol
            .handle(br#"{"command":"START_IMAGE","size":3}"#, &mut transfer, &mut inputs)
            .unwrap();
        assert!(!protocol.is_inert());
    }

    #[test]
    fn print_only_raises_the_request() {
        let mut protocol = ControlProtocol::new();
        let mut transfer = TransferBuffer::new();
        let mut inputs = ModeInputs::default();

        protocol
            .handle(br#"{"command":"PRINT"}"#, &mut transfer, &mut inputs)
            .unwrap();
        protocol
            .handle(br#"{"command":"PRINT"}"#, &mut transfer, &mut inputs)
            .unwrap();

        assert_eq!(transfer.progress(), (0, 0));
        assert!(inputs.take_print_request());
        assert!(!inputs.take_print_request());
    }
}
