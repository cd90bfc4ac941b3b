//! In-flight image buffer for the chunked BLE transfer.
//!
//! A transfer is announced with a declared byte size, the buffer is
//! allocated once for exactly that size, and payload chunks are appended
//! in arrival order until the buffer is full. At most one transfer is in
//! flight: starting a new one frees the previous buffer first.

use alloc::vec::Vec;

use crate::config::{IMAGE_MAX_BYTES, PROGRESS_STEPS};
use crate::error::{AllocError, OverflowError};

/// Owns the image bytes and the size/progress bookkeeping.
#[derive(Debug)]
pub struct TransferBuffer {
    /// Declared size of the current transfer (0 when unallocated).
    capacity: usize,
    /// Received bytes; `data.len()` is the loaded count.
    data: Vec<u8>,
    /// Set once the buffer filled; guards against a second completion.
    complete: bool,
    /// Largest declared size we will try to allocate.
    limit: usize,
}

impl TransferBuffer {
    /// Create an empty, unallocated buffer capped at `IMAGE_MAX_BYTES`.
    pub const fn new() -> Self {
        Self::with_limit(IMAGE_MAX_BYTES)
    }

    /// Create an empty buffer with a custom size cap.
    pub const fn with_limit(limit: usize) -> Self {
        Self {
            capacity: 0,
            data: Vec::new(),
            complete: false,
            limit,
        }
    }

    /// Start a new transfer of `declared_size` bytes.
    ///
    /// Any previous buffer is released before the new allocation is
    /// attempted. On failure the buffer stays unallocated with capacity 0.
    pub fn begin_transfer(&mut self, declared_size: usize) -> Result<(), AllocError> {
        self.reset();

        if declared_size == 0 {
            return Err(AllocError::Empty);
        }
        if declared_size > self.limit {
            return Err(AllocError::TooLarge {
                requested: declared_size,
                limit: self.limit,
            });
        }

        let mut data = Vec::new();
        data.try_reserve_exact(declared_size)
            .map_err(|_| AllocError::OutOfMemory {
                requested: declared_size,
            })?;

        self.data = data;
        self.capacity = declared_size;
        Ok(())
    }

    /// Append one payload chunk.
    ///
    /// Returns `Ok(true)` only for the append that fills the buffer. A chunk
    /// that does not fit is dropped whole and nothing changes.
    pub fn append(&mut self, chunk: &[u8]) -> Result<bool, OverflowError> {
        if self.capacity == 0 {
            return Err(OverflowError::NoBuffer);
        }

        let loaded = self.data.len();
        if loaded + chunk.len() > self.capacity {
            return Err(OverflowError::Exceeds {
                loaded,
                chunk: chunk.len(),
                capacity: self.capacity,
            });
        }

        // Capacity was reserved up front; this never reallocates.
        self.data.extend_from_slice(chunk);

        if !self.complete && self.data.len() == self.capacity {
            self.complete = true;
            return Ok(true);
        }
        Ok(false)
    }

    /// `(loaded, capacity)` for diagnostics.
    pub fn progress(&self) -> (usize, usize) {
        (self.data.len(), self.capacity)
    }

    /// Whether the declared size has been fully received.
    pub fn is_ready(&self) -> bool {
        self.complete
    }

    /// The image bytes, only once the transfer is complete.
    pub fn completed(&self) -> Option<&[u8]> {
        self.complete.then_some(self.data.as_slice())
    }

    /// Percentage step reached by the last append of `chunk_len` bytes, if
    /// that append crossed into a new tenth of the transfer.
    pub fn progress_milestone(&self, chunk_len: usize) -> Option<u8> {
        let (loaded, capacity) = self.progress();
        if capacity == 0 || chunk_len == 0 {
            return None;
        }
        let step = capacity / PROGRESS_STEPS + 1;
        if loaded % step < chunk_len {
            Some((loaded * 100 / capacity) as u8)
        } else {
            None
        }
    }

    /// Free the buffer (device reset or a new transfer).
    pub fn reset(&mut self) {
        self.data = Vec::new();
        self.capacity = 0;
        self.complete = false;
    }
}

impl Default for TransferBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_byte_transfer_example() {
        let bytes: [u8; 10] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9];
        let mut buf = TransferBuffer::new();
        buf.begin_transfer(10).unwrap();

        assert_eq!(buf.append(&bytes[0..5]), Ok(false));
        assert_eq!(buf.progress(), (5, 10));

        assert_eq!(buf.append(&bytes[5..10]), Ok(true));
        assert_eq!(buf.progress(), (10, 10));
        assert_eq!(buf.completed(), Some(&bytes[..]));

        assert!(buf.append(&[0xFF]).is_err());
        assert_eq!(buf.progress(), (10, 10));
    }

    #[test]
    fn completes_exactly_once_for_any_chunking() {
        for size in [1usize, 2, 7, 64, 255, 1000] {
            for chunk_len in [1usize, 3, 20, 244] {
                let payload: Vec<u8> = (0..size).map(|i| i as u8).collect();
                let mut buf = TransferBuffer::new();
                buf.begin_transfer(size).unwrap();

                let completions = payload
                    .chunks(chunk_len)
                    .filter(|c| buf.append(c).unwrap())
                    .count();
                assert_eq!(completions, 1, "size {} chunk {}", size, chunk_len);

                // Empty writes after completion never re-signal.
                assert_eq!(buf.append(&[]), Ok(false));
                assert_eq!(buf.completed().map(|d| d.len()), Some(size));
            }
        }
    }

    #[test]
    fn oversize_chunk_is_dropped_whole() {
        let mut buf = TransferBuffer::new();
        buf.begin_transfer(8).unwrap();
        buf.append(&[1; 6]).unwrap();

        let err = buf.append(&[2; 3]).unwrap_err();
        assert_eq!(
            err,
            OverflowError::Exceeds {
                loaded: 6,
                chunk: 3,
                capacity: 8
            }
        );
        assert_eq!(buf.progress(), (6, 8));

        // A chunk that fits still lands afterwards.
        assert_eq!(buf.append(&[3; 2]), Ok(true));
    }

    #[test]
    fn append_without_transfer_is_rejected() {
        let mut buf = TransferBuffer::new();
        assert_eq!(buf.append(&[1, 2, 3]), Err(OverflowError::NoBuffer));
        assert_eq!(buf.append(&[]), Err(OverflowError::NoBuffer));
        assert_eq!(buf.progress(), (0, 0));
        assert!(buf.data.capacity() == 0);
    }

    #[test]
    fn restart_discards_previous_bytes() {
        let mut buf = TransferBuffer::new();
        buf.begin_transfer(6).unwrap();
        buf.append(&[0xAA; 4]).unwrap();

        buf.begin_transfer(4).unwrap();
        assert_eq!(buf.progress(), (0, 4));
        assert!(buf.completed().is_none());

        assert_eq!(buf.append(&[0x55; 4]), Ok(true));
        assert_eq!(buf.completed(), Some(&[0x55u8; 4][..]));
    }

    #[test]
    fn zero_size_is_an_alloc_error() {
        let mut buf = TransferBuffer::new();
        assert_eq!(buf.begin_transfer(0), Err(AllocError::Empty));
        assert_eq!(buf.progress(), (0, 0));
        assert_eq!(buf.append(&[1]), Err(OverflowError::NoBuffer));
    }

    #[test]
    fn failed_allocation_leaves_no_partial_state() {
        let mut buf = TransferBuffer::new();
        buf.begin_transfer(4).unwrap();
        buf.append(&[1, 2]).unwrap();

        let err = buf.begin_transfer(IMAGE_MAX_BYTES + 1).unwrap_err();
        assert!(matches!(err, AllocError::TooLarge { .. }));
        assert_eq!(buf.progress(), (0, 0));
        assert_eq!(buf.append(&[3]), Err(OverflowError::NoBuffer));
    }

    #[test]
    fn allocator_failure_is_reported() {
        let mut buf = TransferBuffer::with_limit(usize::MAX);
        let err = buf.begin_transfer(usize::MAX).unwrap_err();
        assert_eq!(
            err,
            AllocError::OutOfMemory {
                requested: usize::MAX
            }
        );
        assert_eq!(buf.progress(), (0, 0));
    }

    #[test]
    fn progress_milestones_every_tenth() {
        let mut buf = TransferBuffer::new();
        buf.begin_transfer(100).unwrap();

        let mut milestones = Vec::new();
        for _ in 0..10 {
            buf.append(&[0; 10]).unwrap();
            if let Some(pct) = buf.progress_milestone(10) {
                milestones.push(pct);
            }
        }
        // step = 100 / 10 + 1 = 11; crossings at 11, 22, ... 99.
        assert_eq!(milestones, [20, 30, 40, 50, 60, 70, 80, 90, 100]);
    }
}
