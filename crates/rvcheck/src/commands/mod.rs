//! Command implementations.

mod check;
mod lint;

use rvcheck::{CheckConfig, MemoryMap};

use crate::cli::{Cli, Commands};

/// Dispatch CLI command to the appropriate handler.
pub fn run_command(cli: &Cli) -> i32 {
    match &cli.command {
        Commands::Check { .. } => handle_check(cli),
        Commands::Lint { .. } => handle_lint(cli),
    }
}

fn handle_check(cli: &Cli) -> i32 {
    let Commands::Check {
        trace,
        audit,
        compare_csr_data,
        io_mask,
        mmio_start,
        mmio_end,
        progress,
    } = &cli.command
    else {
        unreachable!("check command variant mismatch");
    };

    let config = CheckConfig::new()
        .with_memory_map(MemoryMap {
            io_mask: *io_mask,
            mmio_start: *mmio_start,
            mmio_end: *mmio_end,
        })
        .with_audit(audit.clone())
        .with_compare_csr_data(*compare_csr_data)
        // No spinner while audit records go to stdout.
        .with_progress(*progress && !audit.is_stdout());

    check::cmd_check(trace, &config)
}

fn handle_lint(cli: &Cli) -> i32 {
    let Commands::Lint { trace } = &cli.command else {
        unreachable!("lint command variant mismatch");
    };

    lint::cmd_lint(trace)
}
