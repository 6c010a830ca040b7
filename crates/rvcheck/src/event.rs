//! Trace events and the line parser.
//!
//! One event per line, whitespace separated:
//!
//! ```text
//! rv new <hart> <isa> <priv>
//! rv set pc <hart> <pc:hex>
//! rv commit <hart> <pc:hex>
//! rv rf w <hart> <kind> <address> <data:hex>
//! rv rf r <hart> <kind> <address> <data:hex>
//! rv io <hart> <write:0|1> <address:hex> <data:hex> <mask:hex> <size> <error:0|1>
//! elf load <path> <offset:hex>
//! ```
//!
//! Unmarked numeric fields are decimal. Blank lines and `#` comments are
//! skipped.

use std::path::PathBuf;
use std::str::SplitWhitespace;

use rvcheck_isa::RegFile;

use crate::error::{Error, Result};
use crate::mmio::Direction;

/// One expected bus transaction from an `rv io` line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceIo {
    pub is_write: bool,
    pub address: u64,
    /// Little-endian packed transfer data.
    pub data: u64,
    pub mask: u32,
    /// Transfer size in bytes.
    pub size: u32,
    /// The DUT saw a bus error response.
    pub error: bool,
}

impl TraceIo {
    #[must_use]
    pub const fn direction(&self) -> Direction {
        Direction::from_write(self.is_write)
    }
}

/// A parsed trace line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TraceEvent {
    NewHart {
        hart_id: u32,
        isa: String,
        privilege: String,
    },
    SetPc {
        hart_id: u32,
        pc: u64,
    },
    Commit {
        hart_id: u32,
        pc: u64,
    },
    RegisterWrite {
        hart_id: u32,
        kind: RegFile,
        address: u32,
        data: u64,
    },
    RegisterRead {
        hart_id: u32,
        kind: RegFile,
        address: u32,
        data: u64,
    },
    IoAccess {
        hart_id: u32,
        io: TraceIo,
    },
    ImageLoad {
        path: PathBuf,
        offset: u64,
    },
}

impl TraceEvent {
    /// Short name used for logging and metrics labels.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NewHart { .. } => "new",
            Self::SetPc { .. } => "set_pc",
            Self::Commit { .. } => "commit",
            Self::RegisterWrite { .. } => "rf_write",
            Self::RegisterRead { .. } => "rf_read",
            Self::IoAccess { .. } => "io",
            Self::ImageLoad { .. } => "elf_load",
        }
    }

    /// Hart the event is addressed to, if any.
    #[must_use]
    pub const fn hart_id(&self) -> Option<u32> {
        match self {
            Self::NewHart { hart_id, .. }
            | Self::SetPc { hart_id, .. }
            | Self::Commit { hart_id, .. }
            | Self::RegisterWrite { hart_id, .. }
            | Self::RegisterRead { hart_id, .. }
            | Self::IoAccess { hart_id, .. } => Some(*hart_id),
            Self::ImageLoad { .. } => None,
        }
    }
}

/// Parse one trace line.
///
/// Returns `Ok(None)` for blank lines and comments.
///
/// # Errors
///
/// Returns [`Error::Parse`] for unknown events and for missing, malformed or
/// trailing fields.
pub fn parse_line(line: &str) -> Result<Option<TraceEvent>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let mut f = Fields::new(trimmed);
    let event = match f.word()? {
        "rv" => match f.word()? {
            "new" => TraceEvent::NewHart {
                hart_id: f.dec_u32()?,
                isa: f.word()?.to_string(),
                privilege: f.word()?.to_string(),
            },
            "set" => {
                f.keyword("pc")?;
                TraceEvent::SetPc {
                    hart_id: f.dec_u32()?,
                    pc: f.hex()?,
                }
            }
            "commit" => TraceEvent::Commit {
                hart_id: f.dec_u32()?,
                pc: f.hex()?,
            },
            "rf" => {
                let write = match f.word()? {
                    "w" => true,
                    "r" => false,
                    _ => return Err(f.error("expected `w` or `r`")),
                };
                let hart_id = f.dec_u32()?;
                let kind = f.reg_file()?;
                let address = f.dec_u32()?;
                let data = f.hex()?;
                if write {
                    TraceEvent::RegisterWrite {
                        hart_id,
                        kind,
                        address,
                        data,
                    }
                } else {
                    TraceEvent::RegisterRead {
                        hart_id,
                        kind,
                        address,
                        data,
                    }
                }
            }
            "io" => TraceEvent::IoAccess {
                hart_id: f.dec_u32()?,
                io: TraceIo {
                    is_write: f.flag()?,
                    address: f.hex()?,
                    data: f.hex()?,
                    mask: f.hex_u32()?,
                    size: f.dec_u32()?,
                    error: f.flag()?,
                },
            },
            _ => return Err(f.error("unknown rv event")),
        },
        "elf" => {
            f.keyword("load")?;
            TraceEvent::ImageLoad {
                path: PathBuf::from(f.word()?),
                offset: f.hex()?,
            }
        }
        _ => return Err(f.error("unknown event")),
    };
    f.finish()?;
    Ok(Some(event))
}

/// Token cursor over one line.
struct Fields<'a> {
    line: &'a str,
    tokens: SplitWhitespace<'a>,
}

impl<'a> Fields<'a> {
    fn new(line: &'a str) -> Self {
        Self {
            line,
            tokens: line.split_whitespace(),
        }
    }

    fn error(&self, reason: &'static str) -> Error {
        Error::Parse {
            text: self.line.to_string(),
            reason,
        }
    }

    fn word(&mut self) -> Result<&'a str> {
        self.tokens
            .next()
            .ok_or_else(|| self.error("missing field"))
    }

    fn keyword(&mut self, expected: &str) -> Result<()> {
        if self.word()? == expected {
            Ok(())
        } else {
            Err(self.error("unexpected keyword"))
        }
    }

    fn hex(&mut self) -> Result<u64> {
        let token = self.word()?;
        parse_hex(token).ok_or_else(|| self.error("invalid hex number"))
    }

    fn hex_u32(&mut self) -> Result<u32> {
        let value = self.hex()?;
        u32::try_from(value).map_err(|_| self.error("hex number out of range"))
    }

    fn dec_u32(&mut self) -> Result<u32> {
        let token = self.word()?;
        let value = match strip_hex_prefix(token) {
            Some(digits) => u64::from_str_radix(digits, 16).ok(),
            None => token.parse::<u64>().ok(),
        };
        value
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| self.error("invalid decimal number"))
    }

    fn flag(&mut self) -> Result<bool> {
        match self.word()? {
            "0" => Ok(false),
            "1" => Ok(true),
            _ => Err(self.error("expected 0 or 1")),
        }
    }

    fn reg_file(&mut self) -> Result<RegFile> {
        let code = self.dec_u32()?;
        u8::try_from(code)
            .map(RegFile::from_code)
            .map_err(|_| self.error("register file kind out of range"))
    }

    fn finish(&mut self) -> Result<()> {
        match self.tokens.next() {
            Some(_) => Err(self.error("trailing fields")),
            None => Ok(()),
        }
    }
}

fn strip_hex_prefix(token: &str) -> Option<&str> {
    token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
}

fn parse_hex(token: &str) -> Option<u64> {
    let digits = strip_hex_prefix(token).unwrap_or(token);
    if digits.is_empty() || digits.starts_with('+') {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> TraceEvent {
        parse_line(line).unwrap().unwrap()
    }

    fn reason(line: &str) -> &'static str {
        match parse_line(line) {
            Err(Error::Parse { reason, text }) => {
                assert_eq!(text, line.trim());
                reason
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_hart_lifecycle_lines() {
        assert_eq!(
            parse("rv new 0 rv64gc msu"),
            TraceEvent::NewHart {
                hart_id: 0,
                isa: "rv64gc".into(),
                privilege: "msu".into(),
            }
        );
        assert_eq!(
            parse("rv set pc 1 0x80000000"),
            TraceEvent::SetPc {
                hart_id: 1,
                pc: 0x8000_0000
            }
        );
        assert_eq!(
            parse("rv commit 0 80000004"),
            TraceEvent::Commit {
                hart_id: 0,
                pc: 0x8000_0004
            }
        );
    }

    #[test]
    fn test_register_lines() {
        assert_eq!(
            parse("rv rf w 0 0 5 0x2a"),
            TraceEvent::RegisterWrite {
                hart_id: 0,
                kind: RegFile::Integer,
                address: 5,
                data: 0x2a,
            }
        );
        // The address field is decimal, but a prefixed hex value is accepted.
        assert_eq!(
            parse("rv rf w 0 4 0x300 0x1800"),
            TraceEvent::RegisterWrite {
                hart_id: 0,
                kind: RegFile::Csr,
                address: 0x300,
                data: 0x1800,
            }
        );
        assert_eq!(
            parse("rv rf r 2 4 768 ffffffffffffffff"),
            TraceEvent::RegisterRead {
                hart_id: 2,
                kind: RegFile::Csr,
                address: 768,
                data: u64::MAX,
            }
        );
        assert_eq!(
            parse("rv rf w 0 3 1 0"),
            TraceEvent::RegisterWrite {
                hart_id: 0,
                kind: RegFile::Other(3),
                address: 1,
                data: 0,
            }
        );
    }

    #[test]
    fn test_io_line() {
        let event = parse("rv io 0 1 0x10000004 0x7 0xffffffff 4 0");
        assert_eq!(
            event,
            TraceEvent::IoAccess {
                hart_id: 0,
                io: TraceIo {
                    is_write: true,
                    address: 0x1000_0004,
                    data: 7,
                    mask: 0xFFFF_FFFF,
                    size: 4,
                    error: false,
                },
            }
        );
        assert_eq!(event.kind(), "io");
        assert_eq!(event.hart_id(), Some(0));
    }

    #[test]
    fn test_elf_load_line() {
        let event = parse("elf load /tmp/fw.elf 0");
        assert_eq!(
            event,
            TraceEvent::ImageLoad {
                path: PathBuf::from("/tmp/fw.elf"),
                offset: 0,
            }
        );
        assert_eq!(event.hart_id(), None);
    }

    #[test]
    fn test_skips_blank_and_comment_lines() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   \t").unwrap(), None);
        assert_eq!(parse_line("# boot").unwrap(), None);
        assert!(parse_line("  rv commit 0 0x1000  ").unwrap().is_some());
    }

    #[test]
    fn test_rejects_malformed_lines() {
        assert_eq!(reason("rv jump 0 0x1000"), "unknown rv event");
        assert_eq!(reason("spike 0"), "unknown event");
        assert_eq!(reason("rv set sp 0 0x1000"), "unexpected keyword");
        assert_eq!(reason("elf store a.elf 0"), "unexpected keyword");
        assert_eq!(reason("rv rf x 0 0 1 0"), "expected `w` or `r`");
        assert_eq!(reason("rv commit 0"), "missing field");
        assert_eq!(reason("rv commit 0 0x1000 extra"), "trailing fields");
        assert_eq!(reason("rv commit 0 0xzz"), "invalid hex number");
        assert_eq!(reason("rv commit x 0x1000"), "invalid decimal number");
        assert_eq!(reason("rv io 0 2 0x0 0x0 0x0 4 0"), "expected 0 or 1");
        assert_eq!(reason("rv io 0 0 0x0 0x0 0x1ffffffff 4 0"), "hex number out of range");
        assert_eq!(reason("rv rf w 0 256 1 0"), "register file kind out of range");
    }
}
