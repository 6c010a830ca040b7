//! In-order MMIO expectation queue.
//!
//! Every `rv io` line pushes one expected transaction. Each MMIO access of
//! the reference executor pops the head and must match it exactly.

use std::collections::VecDeque;
use std::fmt;

use tracing::debug;

use crate::error::{Error, Result};
use crate::event::TraceIo;

/// Bus transfer direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Read,
    Write,
}

impl Direction {
    #[must_use]
    pub const fn from_write(is_write: bool) -> Self {
        if is_write { Self::Write } else { Self::Read }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// FIFO of expected MMIO transactions for one hart.
#[derive(Debug, Default)]
pub struct MmioQueue {
    pending: VecDeque<TraceIo>,
}

impl MmioQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an expectation at the tail.
    pub fn push(&mut self, io: TraceIo) {
        self.pending.push_back(io);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Next expectation to be matched.
    #[must_use]
    pub fn front(&self) -> Option<&TraceIo> {
        self.pending.front()
    }

    /// Match a reference load against the head.
    ///
    /// Returns the DUT data truncated to `size` bytes and the injected error
    /// flag.
    ///
    /// # Errors
    ///
    /// Fails if the queue is empty or the head is not a read of `size` bytes
    /// at `address`.
    pub fn match_load(&mut self, address: u64, size: u32) -> Result<(u64, bool)> {
        let head = self.pop(Direction::Read, address, size)?;
        let data = head.data & size_mask(size);
        debug!(
            addr = format!("{:#x}", address),
            size,
            data = format!("{:#x}", data),
            error = head.error,
            "mmio load matched"
        );
        Ok((data, head.error))
    }

    /// Match a reference store of `bytes` against the head.
    ///
    /// Returns the injected error flag.
    ///
    /// # Errors
    ///
    /// Fails if the queue is empty, the head is not a write of `size` bytes at
    /// `address`, or the low `size` bytes of its data differ from `bytes`.
    pub fn match_store(&mut self, address: u64, size: u32, bytes: &[u8]) -> Result<bool> {
        let head = self.pop(Direction::Write, address, size)?;
        let len = (size as usize).min(8);
        let expected = &head.data.to_le_bytes()[..len];
        if bytes.len() < len || expected != &bytes[..len] {
            return Err(Error::MmioData {
                address,
                dut: head.data & size_mask(size),
                reference: pack_le(bytes),
            });
        }
        debug!(
            addr = format!("{:#x}", address),
            size,
            data = format!("{:#x}", pack_le(bytes)),
            error = head.error,
            "mmio store matched"
        );
        Ok(head.error)
    }

    fn pop(&mut self, direction: Direction, address: u64, size: u32) -> Result<TraceIo> {
        let Some(head) = self.pending.pop_front() else {
            return Err(Error::MissingMmio {
                direction,
                address,
                size,
            });
        };
        if head.direction() != direction {
            return Err(Error::MmioDirection {
                address,
                dut: head.direction(),
                reference: direction,
            });
        }
        if head.address != address {
            return Err(Error::MmioAddress {
                dut: head.address,
                reference: address,
            });
        }
        if head.size != size {
            return Err(Error::MmioSize {
                address,
                dut: head.size,
                reference: size,
            });
        }
        Ok(head)
    }
}

const fn size_mask(size: u32) -> u64 {
    if size >= 8 {
        u64::MAX
    } else {
        (1u64 << (size * 8)) - 1
    }
}

fn pack_le(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    let len = bytes.len().min(8);
    buf[..len].copy_from_slice(&bytes[..len]);
    u64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn io(is_write: bool, address: u64, data: u64, size: u32) -> TraceIo {
        TraceIo {
            is_write,
            address,
            data,
            mask: 0xFFFF_FFFF,
            size,
            error: false,
        }
    }

    #[test]
    fn test_load_returns_truncated_data() {
        let mut queue = MmioQueue::new();
        queue.push(io(false, 0x1000_0000, 0xDEAD_BEEF_1234_5678, 2));
        assert_eq!(queue.match_load(0x1000_0000, 2).unwrap(), (0x5678, false));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_injected_error_is_reported() {
        let mut queue = MmioQueue::new();
        let mut failing = io(true, 0x1000_0010, 0xAB, 1);
        failing.error = true;
        queue.push(failing);
        assert!(queue.match_store(0x1000_0010, 1, &[0xAB]).unwrap());
    }

    #[test]
    fn test_store_compares_low_bytes() {
        let mut queue = MmioQueue::new();
        queue.push(io(true, 0x1000_0004, 0xFFFF_FF07, 1));
        assert!(!queue.match_store(0x1000_0004, 1, &[0x07]).unwrap());

        queue.push(io(true, 0x1000_0004, 0x7, 4));
        let err = queue
            .match_store(0x1000_0004, 4, &[0x08, 0, 0, 0])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MmioData {
                dut: 7,
                reference: 8,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_queue_is_missing_mmio() {
        let mut queue = MmioQueue::new();
        let err = queue.match_load(0x1000_0000, 4).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingMmio {
                direction: Direction::Read,
                address: 0x1000_0000,
                size: 4
            }
        ));
    }

    #[test]
    fn test_direction_address_and_size_checks() {
        let mut queue = MmioQueue::new();
        queue.push(io(true, 0x1000_0004, 7, 4));
        assert!(matches!(
            queue.match_load(0x1000_0004, 4).unwrap_err(),
            Error::MmioDirection {
                dut: Direction::Write,
                reference: Direction::Read,
                ..
            }
        ));

        queue.push(io(false, 0x1000_0004, 7, 4));
        assert!(matches!(
            queue.match_load(0x1000_0008, 4).unwrap_err(),
            Error::MmioAddress {
                dut: 0x1000_0004,
                reference: 0x1000_0008
            }
        ));

        queue.push(io(false, 0x1000_0004, 7, 4));
        assert!(matches!(
            queue.match_load(0x1000_0004, 8).unwrap_err(),
            Error::MmioSize {
                dut: 4,
                reference: 8,
                ..
            }
        ));
    }

    #[test]
    fn test_strict_fifo_order() {
        let mut queue = MmioQueue::new();
        queue.push(io(false, 0x1000_0000, 1, 4));
        queue.push(io(false, 0x1000_0004, 2, 4));
        assert_eq!(queue.len(), 2);
        // The second expectation cannot be consumed first.
        assert!(queue.match_load(0x1000_0004, 4).is_err());

        let mut queue = MmioQueue::new();
        queue.push(io(false, 0x1000_0000, 1, 4));
        queue.push(io(false, 0x1000_0004, 2, 4));
        assert_eq!(queue.match_load(0x1000_0000, 4).unwrap().0, 1);
        assert_eq!(queue.front().map(|io| io.address), Some(0x1000_0004));
        assert_eq!(queue.match_load(0x1000_0004, 4).unwrap().0, 2);
    }
}
