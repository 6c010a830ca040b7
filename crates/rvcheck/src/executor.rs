//! Reference executor interface and memory routing.
//!
//! The checker drives any instruction-accurate model through
//! [`ReferenceExecutor`]. During a step the model reaches memory through a
//! [`MemoryPort`], which sends each access to the flat memory store, to the
//! hart's MMIO expectation queue, or rejects it as an access fault.

use rvcheck_isa::RegWrite;
use rvcheck_sim::{Bus, BusStatus, Memory, Processor, ProcessorConfig};
use tracing::warn;

use crate::config::{MemoryMap, Route};
use crate::error::{Error, Result};
use crate::metrics;
use crate::mmio::{Direction, MmioQueue};

/// An instruction-accurate model the DUT is compared against.
pub trait ReferenceExecutor {
    /// Force the program counter.
    fn set_pc(&mut self, pc: u64);

    /// PC of the next instruction to retire.
    fn pc(&self) -> u64;

    /// Retire exactly one instruction (or take one exception).
    ///
    /// # Errors
    ///
    /// Returns the error raised by the memory port, typically an MMIO
    /// mismatch.
    fn step(&mut self, port: &mut MemoryPort<'_>) -> Result<()>;

    /// Raw encoding of the instruction retired by the last step.
    fn last_instruction(&self) -> u64;

    /// Architectural register writes of the last step.
    fn register_writes(&self) -> &[RegWrite];
}

/// Creates one executor per hart.
pub trait ExecutorFactory {
    type Executor: ReferenceExecutor;

    /// Build the executor for a new hart.
    ///
    /// # Errors
    ///
    /// Returns an error if the ISA or privilege string is rejected.
    fn create(&mut self, hart_id: u32, isa: &str, privilege: &str) -> Result<Self::Executor>;
}

impl<E, F> ExecutorFactory for F
where
    E: ReferenceExecutor,
    F: FnMut(u32, &str, &str) -> Result<E>,
{
    type Executor = E;

    fn create(&mut self, hart_id: u32, isa: &str, privilege: &str) -> Result<E> {
        self(hart_id, isa, privilege)
    }
}

/// Factory for the bundled [`Processor`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessorFactory;

impl ExecutorFactory for ProcessorFactory {
    type Executor = Processor;

    fn create(&mut self, hart_id: u32, isa: &str, privilege: &str) -> Result<Processor> {
        let config = ProcessorConfig {
            isa: isa.to_string(),
            privilege: privilege.to_string(),
            hart_id: u64::from(hart_id),
        };
        Ok(Processor::new(&config)?)
    }
}

impl ReferenceExecutor for Processor {
    fn set_pc(&mut self, pc: u64) {
        Self::set_pc(self, pc);
    }

    fn pc(&self) -> u64 {
        Self::pc(self)
    }

    fn step(&mut self, port: &mut MemoryPort<'_>) -> Result<()> {
        Self::step(self, port)
    }

    fn last_instruction(&self) -> u64 {
        Self::last_instruction(self)
    }

    fn register_writes(&self) -> &[RegWrite] {
        Self::register_writes(self)
    }
}

/// Bus view handed to the executor for one step.
pub struct MemoryPort<'a> {
    memory: &'a mut Memory,
    mmio: &'a mut MmioQueue,
    map: MemoryMap,
}

impl<'a> MemoryPort<'a> {
    pub const fn new(memory: &'a mut Memory, mmio: &'a mut MmioQueue, map: MemoryMap) -> Self {
        Self { memory, mmio, map }
    }

    fn unmapped(direction: Direction, addr: u64, len: usize) -> BusStatus {
        warn!(
            addr = format!("{:#x}", addr),
            len,
            direction = direction.as_str(),
            "access outside memory and mmio window"
        );
        BusStatus::Fault
    }
}

const fn status(error: bool) -> BusStatus {
    if error { BusStatus::Fault } else { BusStatus::Ok }
}

fn access_size(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

impl Bus for MemoryPort<'_> {
    type Error = Error;

    fn load(&mut self, addr: u64, buf: &mut [u8]) -> Result<BusStatus> {
        match self.map.route(addr) {
            Route::Memory => {
                self.memory.read(addr, buf);
                Ok(BusStatus::Ok)
            }
            Route::Mmio => {
                let (data, error) = self.mmio.match_load(addr, access_size(buf.len()))?;
                let len = buf.len().min(8);
                buf[..len].copy_from_slice(&data.to_le_bytes()[..len]);
                metrics::record_mmio(Direction::Read);
                Ok(status(error))
            }
            Route::Unmapped => Ok(Self::unmapped(Direction::Read, addr, buf.len())),
        }
    }

    fn store(&mut self, addr: u64, data: &[u8]) -> Result<BusStatus> {
        match self.map.route(addr) {
            Route::Memory => {
                self.memory.write(addr, data);
                Ok(BusStatus::Ok)
            }
            Route::Mmio => {
                let error = self.mmio.match_store(addr, access_size(data.len()), data)?;
                metrics::record_mmio(Direction::Write);
                Ok(status(error))
            }
            Route::Unmapped => Ok(Self::unmapped(Direction::Write, addr, data.len())),
        }
    }
}
