//! rvcheck CLI - RISC-V trace checker

mod cli;
mod commands;
mod terminal;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use cli::Cli;

fn main() {
    let cli = Cli::parse();

    // Initialize metrics recorder if enabled
    let metrics_handle = if cli.metrics {
        rvcheck::metrics::CliRecorder::new().install()
    } else {
        None
    };

    rvcheck::metrics::init();

    // RUST_LOG wins over the flag-derived default
    let default_level = if cli.verbose {
        "rvcheck=debug,rvcheck_sim=debug"
    } else if cli.silent {
        "error"
    } else {
        "rvcheck=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    let exit_code = commands::run_command(&cli);

    if let Some(handle) = metrics_handle {
        handle.print_summary();
    }

    std::process::exit(exit_code);
}
