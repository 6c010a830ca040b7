use std::fmt;

use rvcheck_elf::ElfError;
use rvcheck_isa::{IsaError, RegFile};
use thiserror::Error;

use crate::mmio::Direction;

/// Checker errors.
///
/// Every variant except `Io`, `Elf` and `Isa` describes a verification
/// failure. None of them is recoverable: the first one ends the run.
#[derive(Error, Debug)]
pub enum Error {
    #[error("malformed trace line ({reason}): {text}")]
    Parse { text: String, reason: &'static str },
    #[error("line {line}: {source}")]
    AtLine { line: usize, source: Box<Self> },
    #[error("event for unknown hart {0}")]
    UnknownHart(u32),
    #[error("unknown register file {0} in trace")]
    UnknownRegisterFile(RegFile),
    #[error("duplicated CSR access: pending {pending:#x}, new {address:#x}")]
    DuplicatedCsrAccess { pending: u32, address: u32 },
    #[error("duplicated integer write: pending {pending:#x}, new {data:#x}")]
    DuplicatedIntegerWrite { pending: u64, data: u64 },
    #[error("PC mismatch DUT={dut:#x} REF={reference:#x}")]
    PcMismatch { dut: u64, reference: u64 },
    #[error("integer write missing: REF x{reg}={reference:#x}")]
    IntegerWriteMissing { reg: u32, reference: u64 },
    #[error("integer write mismatch on x{reg}: DUT={dut:#x} REF={reference:#x}")]
    IntegerWriteMismatch { reg: u32, dut: u64, reference: u64 },
    #[error("integer write spawned: DUT={data:#x} has no reference write")]
    IntegerWriteSpawned { data: u64 },
    #[error("CSR write missing: REF csr {csr:#x}")]
    CsrWriteMissing { csr: u32 },
    #[error("CSR write address DUT={dut:#x} REF={reference:#x}")]
    CsrWriteAddress { dut: u32, reference: u32 },
    #[error("CSR write data on csr {csr:#x}: DUT={dut:#x} REF={reference:#x}")]
    CsrWriteData { csr: u32, dut: u64, reference: u64 },
    #[error("missing mmio: REF {direction} at {address:#x} ({size} bytes)")]
    MissingMmio {
        direction: Direction,
        address: u64,
        size: u32,
    },
    #[error("mmio direction at {address:#x}: DUT={dut} REF={reference}")]
    MmioDirection {
        address: u64,
        dut: Direction,
        reference: Direction,
    },
    #[error("mmio address DUT={dut:#x} REF={reference:#x}")]
    MmioAddress { dut: u64, reference: u64 },
    #[error("mmio size at {address:#x}: DUT={dut} REF={reference}")]
    MmioSize { address: u64, dut: u32, reference: u32 },
    #[error("mmio data at {address:#x}: DUT={dut:#x} REF={reference:#x}")]
    MmioData { address: u64, dut: u64, reference: u64 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ELF error: {0}")]
    Elf(#[from] ElfError),
    #[error("invalid hart configuration: {0}")]
    Isa(#[from] IsaError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Broad category of an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Malformed or unrecognized trace line.
    Parse,
    /// The trace breaks the one-access-per-commit protocol.
    Protocol,
    /// DUT and reference disagree on PC or register state.
    Divergence,
    /// A bus transaction did not match the expectation queue.
    Mmio,
    Io,
    Elf,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Parse => "parse error",
            Self::Protocol => "protocol violation",
            Self::Divergence => "divergence",
            Self::Mmio => "mmio mismatch",
            Self::Io => "io error",
            Self::Elf => "image error",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Attach the 1-based trace line number.
    #[must_use]
    pub fn at_line(self, line: usize) -> Self {
        match self {
            Self::AtLine { .. } => self,
            other => Self::AtLine {
                line,
                source: Box::new(other),
            },
        }
    }

    /// The error without its line annotation.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::AtLine { source, .. } => source.root(),
            other => other,
        }
    }

    /// Trace line the error was raised on, if known.
    #[must_use]
    pub const fn line(&self) -> Option<usize> {
        match self {
            Self::AtLine { line, .. } => Some(*line),
            _ => None,
        }
    }

    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self.root() {
            Self::Parse { .. } => ErrorClass::Parse,
            Self::UnknownHart(_)
            | Self::UnknownRegisterFile(_)
            | Self::DuplicatedCsrAccess { .. }
            | Self::DuplicatedIntegerWrite { .. } => ErrorClass::Protocol,
            Self::PcMismatch { .. }
            | Self::IntegerWriteMissing { .. }
            | Self::IntegerWriteMismatch { .. }
            | Self::IntegerWriteSpawned { .. }
            | Self::CsrWriteMissing { .. }
            | Self::CsrWriteAddress { .. }
            | Self::CsrWriteData { .. } => ErrorClass::Divergence,
            Self::MissingMmio { .. }
            | Self::MmioDirection { .. }
            | Self::MmioAddress { .. }
            | Self::MmioSize { .. }
            | Self::MmioData { .. } => ErrorClass::Mmio,
            Self::Isa(_) => ErrorClass::Parse,
            Self::Io(_) => ErrorClass::Io,
            Self::Elf(_) => ErrorClass::Elf,
            Self::AtLine { source, .. } => source.class(),
        }
    }
}
