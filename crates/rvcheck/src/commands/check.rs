//! Check command.

use std::path::Path;
use std::time::Instant;

use rvcheck::{CheckConfig, Checker, metrics};
use tracing::error;

use crate::cli::{EXIT_FAILURE, EXIT_SUCCESS};
use crate::terminal::{self, Spinner};

/// Handle the `check` command.
pub fn cmd_check(trace: &Path, config: &CheckConfig) -> i32 {
    let mut checker = match Checker::new(config) {
        Ok(checker) => checker,
        Err(e) => {
            error!(error = %e, "failed to open audit destination");
            return EXIT_FAILURE;
        }
    };

    let spinner = config
        .progress
        .then(|| Spinner::new(format!("Checking {}", trace.display())));
    let start = Instant::now();
    let result = checker.check_path(trace, |stats| {
        if let Some(spinner) = &spinner {
            spinner.set_message(format!(
                "Checking {}: {} lines, {} commits",
                trace.display(),
                stats.lines,
                stats.commits
            ));
        }
    });
    metrics::record_check_time(start.elapsed().as_secs_f64());

    match result {
        Ok(stats) => {
            for hart in checker.context().harts() {
                if !hart.mmio().is_empty() {
                    terminal::warning(&format!(
                        "hart {} has {} unconsumed mmio expectations",
                        hart.id(),
                        hart.mmio().len()
                    ));
                }
            }
            let message = format!(
                "trace check passed: {} lines, {} commits, {} harts",
                stats.lines, stats.commits, stats.harts
            );
            match &spinner {
                Some(spinner) => spinner.finish_with_success(&message),
                None => terminal::success(&message),
            }
            EXIT_SUCCESS
        }
        Err(e) => {
            if let Some(spinner) = &spinner {
                spinner.finish_and_clear();
            }
            println!("\n*** {}: {} ***\n", e.class(), e);
            let stats = checker.stats();
            terminal::error(&format!(
                "trace check failed after {} commits",
                stats.commits
            ));
            EXIT_FAILURE
        }
    }
}
