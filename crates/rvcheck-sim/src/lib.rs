//! Reference RISC-V processor and flat memory for rvcheck.
//!
//! The [`Processor`] is an instruction-accurate interpreter for RV32/RV64
//! IMAC with Zicsr and Zifencei and M/S/U privilege modes. It reaches memory
//! only through the [`Bus`] trait so the checker can route each access.

mod bus;
pub mod csr;
mod memory;
mod processor;
mod trap;

pub use bus::{Bus, BusStatus};
pub use csr::CsrFile;
pub use memory::{Memory, PAGE_SIZE};
pub use processor::{Processor, ProcessorConfig, RESET_PC};
pub use trap::{Exception, Privilege, Trap};
