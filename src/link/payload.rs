//! Payload channel: raw image chunks appended in arrival order.

use crate::error::OverflowError;
use crate::mode::ModeInputs;
use crate::transfer::TransferBuffer;

/// Outcome of one payload chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferStatus {
    /// Appended, more bytes expected.
    Accepted,
    /// Appended and the declared size is now reached.
    Completed,
    /// Dropped: no transfer running or the chunk overruns the declared size.
    Rejected(OverflowError),
}

/// Feeds payload chunks into the transfer buffer.
#[derive(Debug, Default)]
pub struct PayloadIngest {
    rejected: u32,
}

impl PayloadIngest {
    pub const fn new() -> Self {
        Self { rejected: 0 }
    }

    /// Append `chunk` to the running transfer.
    ///
    /// The append that fills the buffer raises the transfer-complete input
    /// for the mode machine; that happens once per transfer.
    pub fn ingest(
        &mut self,
        chunk: &[u8],
        transfer: &mut TransferBuffer,
        inputs: &mut ModeInputs,
    ) -> TransferStatus {
        match transfer.append(chunk) {
            Ok(true) => {
                inputs.raise_transfer_complete();
                TransferStatus::Completed
            }
            Ok(false) => TransferStatus::Accepted,
            Err(e) => {
                self.rejected = self.rejected.wrapping_add(1);
                TransferStatus::Rejected(e)
            }
        }
    }

    /// Chunks dropped since boot.
    pub fn rejected(&self) -> u32 {
        self.rejected
    }
}
