//! Error types for delfin-panel.
//!
//! We avoid `alloc` in error values - all variants carry only fixed-size
//! data. Every error in the core is locally absorbed: callers log it and
//! carry on from the previous well-defined state.

/// Image buffer could not be allocated for a `START_IMAGE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AllocError {
    /// Declared size was zero.
    Empty,
    /// Declared size exceeds the configured image budget.
    TooLarge { requested: usize, limit: usize },
    /// The allocator could not satisfy the request.
    OutOfMemory { requested: usize },
}

/// A payload chunk could not be appended to the transfer buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OverflowError {
    /// No transfer has been started (or its allocation failed).
    NoBuffer,
    /// The chunk would run past the declared size.
    Exceeds {
        loaded: usize,
        chunk: usize,
        capacity: usize,
    },
}

/// A control-channel message could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Zero-length write.
    Empty,
    /// Not a JSON object we can decode.
    Malformed,
    /// No `command` field.
    MissingCommand,
    /// `command` is not one we know.
    UnknownCommand,
    /// `START_IMAGE` without a usable `size`.
    MissingSize,
}

/// Result of applying a control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlError {
    Parse(ParseError),
    Alloc(AllocError),
}

/// Macro action id has no entry in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchError {
    Unmapped(u8),
}

/// Board-glue failures. Logged where they happen; none of them stop the
/// device core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// GATT server registration failed.
    GattRegister,
    /// Advertising could not start or was aborted.
    Advertise,
    /// Flash read/write/erase failed.
    Storage,
}

// Convenience conversions

impl From<ParseError> for ControlError {
    fn from(e: ParseError) -> Self {
        ControlError::Parse(e)
    }
}

impl From<AllocError> for ControlError {
    fn from(e: AllocError) -> Self {
        ControlError::Alloc(e)
    }
}
