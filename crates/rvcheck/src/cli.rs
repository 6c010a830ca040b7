//! CLI definitions and argument types.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rvcheck::AuditSink;

/// Exit code for success.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for failure.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(name = "rvcheck")]
#[command(about = "RISC-V trace checker - replays DUT commit traces on a reference model")]
#[command(version)]
pub struct Cli {
    /// Show metrics summary after execution
    #[arg(long, global = true)]
    pub metrics: bool,

    /// Enable verbose output (sets RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output (only show errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub silent: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check a commit trace against the reference processor
    Check {
        /// Trace file (`-` for stdin, `.zst` files are decompressed)
        #[arg(value_name = "TRACE")]
        trace: PathBuf,

        /// Destination of committed PCs (`-` for stdout, `none` to disable)
        #[arg(long, value_name = "DEST", default_value = "-")]
        audit: AuditSink,

        /// Also compare CSR write data, not only the CSR address
        #[arg(long)]
        compare_csr_data: bool,

        /// Address bits that select plain memory
        #[arg(long, value_name = "HEX", value_parser = parse_hex, default_value = "0xe0000000")]
        io_mask: u64,

        /// First address of the MMIO window
        #[arg(long, value_name = "HEX", value_parser = parse_hex, default_value = "0x10000000")]
        mmio_start: u64,

        /// Last address of the MMIO window (inclusive)
        #[arg(long, value_name = "HEX", value_parser = parse_hex, default_value = "0x20000000")]
        mmio_end: u64,

        /// Show a spinner with the number of processed lines
        #[arg(long)]
        progress: bool,
    },
    /// Parse a trace without executing it and print its event histogram
    Lint {
        /// Trace file (`-` for stdin, `.zst` files are decompressed)
        #[arg(value_name = "TRACE")]
        trace: PathBuf,
    },
}

/// Parse a hex address with optional 0x prefix.
fn parse_hex(s: &str) -> Result<u64, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u64::from_str_radix(digits, 16).map_err(|e| format!("invalid hex value `{s}`: {e}"))
}
