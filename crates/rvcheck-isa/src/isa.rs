//! ISA and privilege-mode string parsing (`rv64gc`, `msu`).

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::Xlen;

/// ISA configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IsaError {
    #[error("invalid ISA string `{0}`")]
    InvalidIsa(String),
    #[error("ISA string `{0}` has no base integer extension (i, e or g)")]
    MissingBase(String),
    #[error("invalid privilege string `{0}` (expected letters from `msu`, including `m`)")]
    InvalidPrivilege(String),
}

fn isa_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^rv(32|64)([a-z]*)((?:_[a-z][a-z0-9]*)*)$").expect("valid ISA regex")
    })
}

/// Parsed ISA string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Isa {
    pub xlen: Xlen,
    /// One bit per single-letter extension, `a` at bit 0.
    letters: u32,
    /// Multi-letter extensions (`zicsr`, `zifencei`, ...), lower-case.
    named: Vec<String>,
}

impl Isa {
    /// Parse an ISA string such as `rv64gc` or `rv32imac_zicsr_zifencei`.
    ///
    /// # Errors
    ///
    /// Returns an error if the string does not start with `rv32`/`rv64`
    /// followed by a base extension.
    pub fn parse(isa: &str) -> Result<Self, IsaError> {
        let caps = isa_regex()
            .captures(isa)
            .ok_or_else(|| IsaError::InvalidIsa(isa.to_string()))?;

        let xlen = if &caps[1] == "32" { Xlen::Rv32 } else { Xlen::Rv64 };
        let single = caps[2].to_ascii_lowercase();
        if !matches!(single.chars().next(), Some('i' | 'e' | 'g')) {
            return Err(IsaError::MissingBase(isa.to_string()));
        }

        let mut letters = 0u32;
        let mut named: Vec<String> = caps[3]
            .split('_')
            .filter(|s| !s.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();

        for ch in single.chars() {
            if ch == 'g' {
                for implied in ['i', 'm', 'a', 'f', 'd'] {
                    letters |= letter_bit(implied);
                }
                named.push("zicsr".to_string());
                named.push("zifencei".to_string());
            } else {
                letters |= letter_bit(ch);
            }
        }

        Ok(Self { xlen, letters, named })
    }

    /// Check for a single-letter extension.
    #[must_use]
    pub fn has(&self, ext: char) -> bool {
        self.letters & letter_bit(ext.to_ascii_lowercase()) != 0
    }

    /// Check for a multi-letter extension.
    #[must_use]
    pub fn has_named(&self, ext: &str) -> bool {
        self.named.iter().any(|n| n.eq_ignore_ascii_case(ext))
    }

    /// Value of the `misa` CSR for this configuration.
    #[must_use]
    pub const fn misa(&self) -> u64 {
        let mxl = match self.xlen {
            Xlen::Rv32 => 1u64 << 30,
            Xlen::Rv64 => 2u64 << 62,
        };
        mxl | self.letters as u64
    }
}

const fn letter_bit(ch: char) -> u32 {
    if ch.is_ascii_lowercase() {
        1 << (ch as u32 - 'a' as u32)
    } else {
        0
    }
}

/// Privilege modes implemented by a hart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Privileges {
    pub supervisor: bool,
    pub user: bool,
}

impl Privileges {
    /// Parse a privilege string such as `msu` or `mu`. Machine mode is mandatory.
    ///
    /// # Errors
    ///
    /// Returns an error on unknown letters or when `m` is missing.
    pub fn parse(privileges: &str) -> Result<Self, IsaError> {
        let lower = privileges.to_ascii_lowercase();
        if !lower.contains('m') || lower.chars().any(|c| !matches!(c, 'm' | 's' | 'u')) {
            return Err(IsaError::InvalidPrivilege(privileges.to_string()));
        }
        Ok(Self {
            supervisor: lower.contains('s'),
            user: lower.contains('u'),
        })
    }
}

impl Default for Privileges {
    fn default() -> Self {
        Self {
            supervisor: true,
            user: true,
        }
    }
}
