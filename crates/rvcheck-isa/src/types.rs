//! Core types for the RISC-V ISA.

use std::fmt;

/// Base integer register width.
///
/// Register values are always carried in a `u64`. For RV32 the upper half is zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Xlen {
    Rv32,
    #[default]
    Rv64,
}

impl Xlen {
    /// XLEN value (32 or 64).
    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            Self::Rv32 => 32,
            Self::Rv64 => 64,
        }
    }

    /// Shift amount mask (0x1F for RV32, 0x3F for RV64).
    #[must_use]
    pub const fn shift_mask(self) -> u32 {
        match self {
            Self::Rv32 => 0x1F,
            Self::Rv64 => 0x3F,
        }
    }

    /// Bytes per register.
    #[must_use]
    pub const fn reg_bytes(self) -> usize {
        match self {
            Self::Rv32 => 4,
            Self::Rv64 => 8,
        }
    }

    /// Truncate a value to register width.
    #[inline]
    #[must_use]
    pub const fn truncate(self, val: u64) -> u64 {
        match self {
            Self::Rv32 => val & 0xFFFF_FFFF,
            Self::Rv64 => val,
        }
    }

    /// Sign-extend a 32-bit value to register width.
    #[inline]
    #[must_use]
    pub const fn sign_extend_32(self, val: u32) -> u64 {
        match self {
            Self::Rv32 => val as u64,
            Self::Rv64 => val as i32 as i64 as u64,
        }
    }

    /// Sign-extend an arbitrary signed value to register width.
    #[inline]
    #[must_use]
    pub const fn from_signed(self, val: i64) -> u64 {
        self.truncate(val as u64)
    }

    /// Interpret a register value as a signed integer.
    #[inline]
    #[must_use]
    pub const fn to_signed(self, val: u64) -> i64 {
        match self {
            Self::Rv32 => val as u32 as i32 as i64,
            Self::Rv64 => val as i64,
        }
    }
}

impl fmt::Display for Xlen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rv{}", self.bits())
    }
}

/// Register file a logged write targets.
///
/// The numeric codes follow the commit-log convention of the reference
/// simulator: integer = 0, float = 1, vector = 2, CSR = 4.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegFile {
    Integer,
    Float,
    Vector,
    Csr,
    Other(u8),
}

impl RegFile {
    /// Map a raw register-file code to its kind.
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Integer,
            1 => Self::Float,
            2 => Self::Vector,
            4 => Self::Csr,
            other => Self::Other(other),
        }
    }

    /// Raw register-file code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Integer => 0,
            Self::Float => 1,
            Self::Vector => 2,
            Self::Csr => 4,
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for RegFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::Vector => write!(f, "vector"),
            Self::Csr => write!(f, "csr"),
            Self::Other(code) => write!(f, "rf{code}"),
        }
    }
}

/// Destination of a logged register write: register file plus index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RegTarget {
    pub kind: RegFile,
    pub index: u32,
}

impl RegTarget {
    #[must_use]
    pub const fn new(kind: RegFile, index: u32) -> Self {
        Self { kind, index }
    }

    /// Integer register `x{index}`.
    #[must_use]
    pub const fn integer(index: u8) -> Self {
        Self::new(RegFile::Integer, index as u32)
    }

    /// Control/status register at `address`.
    #[must_use]
    pub const fn csr(address: u16) -> Self {
        Self::new(RegFile::Csr, address as u32)
    }

    /// Unpack a commit-log key: kind in the low 4 bits, index above.
    #[must_use]
    pub const fn from_encoded(encoded: u64) -> Self {
        Self {
            kind: RegFile::from_code((encoded & 0xF) as u8),
            index: (encoded >> 4) as u32,
        }
    }

    /// Pack into a commit-log key.
    #[must_use]
    pub const fn encoded(self) -> u64 {
        ((self.index as u64) << 4) | (self.kind.code() as u64 & 0xF)
    }
}

impl fmt::Display for RegTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RegFile::Integer => write!(f, "x{}", self.index),
            RegFile::Float => write!(f, "f{}", self.index),
            RegFile::Vector => write!(f, "v{}", self.index),
            RegFile::Csr => write!(f, "csr {:#05x}", self.index),
            RegFile::Other(code) => write!(f, "rf{code}[{}]", self.index),
        }
    }
}

/// One architectural register write reported for a retired instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegWrite {
    pub target: RegTarget,
    pub value: u64,
}

/// Number of integer registers.
pub const NUM_REGS: usize = 32;
