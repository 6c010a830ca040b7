//! Privilege levels and synchronous exceptions.

use std::fmt;

/// Privilege level, encoded as in `mstatus.MPP`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Privilege {
    User = 0,
    Supervisor = 1,
    Machine = 3,
}

impl Privilege {
    #[must_use]
    pub const fn bits(self) -> u64 {
        self as u64
    }

    /// Decode a two-bit privilege field. The reserved value 2 maps to `None`.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Option<Self> {
        match bits & 0x3 {
            0 => Some(Self::User),
            1 => Some(Self::Supervisor),
            3 => Some(Self::Machine),
            _ => None,
        }
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "U"),
            Self::Supervisor => write!(f, "S"),
            Self::Machine => write!(f, "M"),
        }
    }
}

/// Synchronous exception cause codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Exception {
    InstructionAddressMisaligned = 0,
    InstructionAccessFault = 1,
    IllegalInstruction = 2,
    Breakpoint = 3,
    LoadAddressMisaligned = 4,
    LoadAccessFault = 5,
    StoreAddressMisaligned = 6,
    StoreAccessFault = 7,
    EcallFromU = 8,
    EcallFromS = 9,
    EcallFromM = 11,
}

impl Exception {
    /// Value written to `mcause`/`scause`.
    #[must_use]
    pub const fn code(self) -> u64 {
        self as u64
    }

    /// Environment call cause for the current privilege level.
    #[must_use]
    pub const fn ecall_from(prv: Privilege) -> Self {
        match prv {
            Privilege::User => Self::EcallFromU,
            Privilege::Supervisor => Self::EcallFromS,
            Privilege::Machine => Self::EcallFromM,
        }
    }
}

/// A pending exception with its trap value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Trap {
    pub cause: Exception,
    pub tval: u64,
}

impl Trap {
    #[must_use]
    pub const fn new(cause: Exception, tval: u64) -> Self {
        Self { cause, tval }
    }

    #[must_use]
    pub const fn illegal(raw: u64) -> Self {
        Self::new(Exception::IllegalInstruction, raw)
    }
}

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} (tval={:#x})", self.cause, self.tval)
    }
}
