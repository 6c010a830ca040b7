//! Memory bus seen by the processor.

use std::convert::Infallible;

use crate::memory::Memory;

/// Outcome of a bus transaction that did not abort the step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusStatus {
    Ok,
    /// The target rejected the access; the processor raises an access fault.
    Fault,
}

impl BusStatus {
    #[must_use]
    pub const fn is_fault(self) -> bool {
        matches!(self, Self::Fault)
    }
}

/// Bus interface used for fetches, loads and stores.
///
/// A `BusStatus::Fault` is architectural and becomes a trap. An `Err` aborts
/// the step and is returned to the caller of [`crate::Processor::step`].
pub trait Bus {
    type Error;

    /// Read `buf.len()` bytes at `addr`.
    ///
    /// # Errors
    ///
    /// Implementation-defined; aborts the current step.
    fn load(&mut self, addr: u64, buf: &mut [u8]) -> Result<BusStatus, Self::Error>;

    /// Write `data` at `addr`.
    ///
    /// # Errors
    ///
    /// Implementation-defined; aborts the current step.
    fn store(&mut self, addr: u64, data: &[u8]) -> Result<BusStatus, Self::Error>;

    /// Instruction fetch of one parcel. Defaults to a load.
    ///
    /// # Errors
    ///
    /// Implementation-defined; aborts the current step.
    fn fetch(&mut self, addr: u64, buf: &mut [u8]) -> Result<BusStatus, Self::Error> {
        self.load(addr, buf)
    }
}

impl Bus for Memory {
    type Error = Infallible;

    fn load(&mut self, addr: u64, buf: &mut [u8]) -> Result<BusStatus, Self::Error> {
        self.read(addr, buf);
        Ok(BusStatus::Ok)
    }

    fn store(&mut self, addr: u64, data: &[u8]) -> Result<BusStatus, Self::Error> {
        self.write(addr, data);
        Ok(BusStatus::Ok)
    }
}
