//! Lint command.

use std::path::Path;

use rvcheck::{lint_reader, open_trace};
use tracing::error;

use crate::cli::{EXIT_FAILURE, EXIT_SUCCESS};
use crate::terminal::{self, Alignment, Table};

/// Handle the `lint` command.
pub fn cmd_lint(trace: &Path) -> i32 {
    let report = match open_trace(trace).and_then(lint_reader) {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, path = %trace.display(), "lint failed");
            terminal::error(&e.to_string());
            return EXIT_FAILURE;
        }
    };

    let mut table =
        Table::new(&["event", "count"]).with_alignments(vec![Alignment::Left, Alignment::Right]);
    for (kind, count) in &report.events {
        table.add_row(vec![(*kind).to_string(), count.to_string()]);
    }
    table.print();

    let harts = report
        .max_hart
        .map_or_else(|| "no hart events".to_string(), |max| format!("highest hart {max}"));
    terminal::success(&format!(
        "trace parsed: {} lines, {} events, {}",
        report.lines,
        report.total_events(),
        harts
    ));
    EXIT_SUCCESS
}
