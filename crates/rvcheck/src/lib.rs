//! rvcheck - trace-driven differential checker for RISC-V cores.
//!
//! A DUT simulation emits one line per architectural event (commits,
//! register writes, MMIO transactions). The checker replays the trace on an
//! instruction-accurate reference and stops at the first mismatch.
//!
//! # Example
//!
//! ```ignore
//! use rvcheck::{CheckConfig, Checker};
//!
//! let config = CheckConfig::default();
//! let stats = Checker::new(&config)?.check_path("trace.txt".as_ref(), |_| {})?;
//! println!("{} commits verified", stats.commits);
//! ```

mod checker;
mod config;
mod context;
mod error;
mod event;
mod executor;
mod hart;
pub mod metrics;
mod mmio;

pub use checker::{CheckStats, Checker, LintReport, PROGRESS_INTERVAL, lint_reader, open_trace};
pub use config::{
    AuditSink, CheckConfig, DEFAULT_IO_MASK, DEFAULT_MMIO_END, DEFAULT_MMIO_START, MemoryMap,
    Route,
};
pub use context::Context;
pub use error::{Error, ErrorClass, Result};
pub use event::{TraceEvent, TraceIo, parse_line};
pub use executor::{ExecutorFactory, MemoryPort, ProcessorFactory, ReferenceExecutor};
pub use hart::{Hart, PendingWrites};
pub use mmio::{Direction, MmioQueue};

// Re-export from sub-crates
pub use rvcheck_elf::{ElfError, ElfImage};
pub use rvcheck_isa::{RegFile, RegTarget, RegWrite};
pub use rvcheck_sim::{Bus, BusStatus, Memory, Processor, ProcessorConfig};
