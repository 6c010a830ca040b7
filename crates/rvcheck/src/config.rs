//! Checker configuration.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::str::FromStr;

/// Accesses with any of these address bits set go to plain memory.
pub const DEFAULT_IO_MASK: u64 = 0xE000_0000;
/// First address matched against the MMIO queue.
pub const DEFAULT_MMIO_START: u64 = 0x1000_0000;
/// Last address (inclusive) matched against the MMIO queue.
pub const DEFAULT_MMIO_END: u64 = 0x2000_0000;

/// Where a reference memory access is sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Memory,
    Mmio,
    /// Neither memory nor MMIO; the executor sees an access fault.
    Unmapped,
}

/// Address map used to route reference memory accesses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryMap {
    pub io_mask: u64,
    pub mmio_start: u64,
    pub mmio_end: u64,
}

impl Default for MemoryMap {
    fn default() -> Self {
        Self {
            io_mask: DEFAULT_IO_MASK,
            mmio_start: DEFAULT_MMIO_START,
            mmio_end: DEFAULT_MMIO_END,
        }
    }
}

impl MemoryMap {
    #[must_use]
    pub const fn route(&self, addr: u64) -> Route {
        if addr & self.io_mask != 0 {
            Route::Memory
        } else if addr >= self.mmio_start && addr <= self.mmio_end {
            Route::Mmio
        } else {
            Route::Unmapped
        }
    }
}

/// Destination of the per-commit audit records.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum AuditSink {
    #[default]
    Stdout,
    File(PathBuf),
    Disabled,
}

impl AuditSink {
    #[must_use]
    pub const fn is_stdout(&self) -> bool {
        matches!(self, Self::Stdout)
    }

    /// Open the sink for writing.
    ///
    /// # Errors
    ///
    /// Returns an error if the audit file cannot be created.
    pub fn open(&self) -> io::Result<Box<dyn Write>> {
        Ok(match self {
            Self::Stdout => Box::new(io::stdout()),
            Self::File(path) => Box::new(BufWriter::new(File::create(path)?)),
            Self::Disabled => Box::new(io::sink()),
        })
    }
}

impl FromStr for AuditSink {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err("empty audit destination".to_string()),
            "-" | "stdout" => Ok(Self::Stdout),
            "none" | "off" => Ok(Self::Disabled),
            path => Ok(Self::File(PathBuf::from(path))),
        }
    }
}

/// Options for one trace check.
#[derive(Clone, Debug, Default)]
pub struct CheckConfig {
    pub memory_map: MemoryMap,
    pub audit: AuditSink,
    /// Also compare CSR write data, not only the address.
    pub compare_csr_data: bool,
    /// Invoke the progress callback every `PROGRESS_INTERVAL` lines.
    pub progress: bool,
}

impl CheckConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the address map.
    #[must_use]
    pub fn with_memory_map(mut self, map: MemoryMap) -> Self {
        self.memory_map = map;
        self
    }

    /// Set the audit destination.
    #[must_use]
    pub fn with_audit(mut self, audit: AuditSink) -> Self {
        self.audit = audit;
        self
    }

    /// Enable CSR write data comparison.
    #[must_use]
    pub fn with_compare_csr_data(mut self, enabled: bool) -> Self {
        self.compare_csr_data = enabled;
        self
    }

    /// Enable progress reporting.
    #[must_use]
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_routing() {
        let map = MemoryMap::default();
        assert_eq!(map.route(0x8000_0000), Route::Memory);
        assert_eq!(map.route(0x2000_0000), Route::Memory);
        assert_eq!(map.route(0x1000_0000), Route::Mmio);
        assert_eq!(map.route(0x1000_0004), Route::Mmio);
        assert_eq!(map.route(0x0FFF_FFFC), Route::Unmapped);
        assert_eq!(map.route(0x1000), Route::Unmapped);
    }

    #[test]
    fn test_routing_ignores_upper_bits_outside_mask() {
        let map = MemoryMap::default();
        // Bit 32 is outside the mask, so the low window still decides.
        assert_eq!(map.route(0x1_1000_0000), Route::Unmapped);
        let wide = MemoryMap {
            io_mask: 0xFFFF_FFFF_E000_0000,
            ..MemoryMap::default()
        };
        assert_eq!(wide.route(0x1_1000_0000), Route::Memory);
    }

    #[test]
    fn test_audit_sink_parse() {
        assert_eq!("-".parse::<AuditSink>(), Ok(AuditSink::Stdout));
        assert_eq!("none".parse::<AuditSink>(), Ok(AuditSink::Disabled));
        assert_eq!(
            "out/audit.txt".parse::<AuditSink>(),
            Ok(AuditSink::File(PathBuf::from("out/audit.txt")))
        );
        assert!("".parse::<AuditSink>().is_err());
    }

    #[test]
    fn test_builder() {
        let config = CheckConfig::new()
            .with_audit(AuditSink::Disabled)
            .with_compare_csr_data(true);
        assert!(config.compare_csr_data);
        assert!(!config.progress);
        assert_eq!(config.memory_map, MemoryMap::default());
    }
}
