//! Line-by-line trace driver.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use crate::config::CheckConfig;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::event::parse_line;
use crate::executor::{ExecutorFactory, ProcessorFactory};

/// Lines between two progress callbacks.
pub const PROGRESS_INTERVAL: usize = 1 << 14;

/// Totals of a finished (or interrupted) check.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CheckStats {
    pub lines: usize,
    pub events: usize,
    pub commits: u64,
    pub harts: usize,
    pub image_bytes: u64,
}

/// Open a trace for reading.
///
/// `-` reads standard input. Paths ending in `.zst` are decompressed.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or the zstd stream header is
/// invalid.
pub fn open_trace(path: &Path) -> Result<Box<dyn BufRead>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path)?;
    if path.extension().is_some_and(|ext| ext == "zst") {
        let decoder = zstd::stream::Decoder::new(file)?;
        Ok(Box::new(BufReader::new(decoder)))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Feeds trace lines into a [`Context`] until the trace ends or a check fails.
pub struct Checker<F: ExecutorFactory = ProcessorFactory> {
    context: Context<F>,
    progress: bool,
    stats: CheckStats,
}

impl Checker<ProcessorFactory> {
    /// Checker using the bundled reference processor.
    ///
    /// # Errors
    ///
    /// Returns an error if the audit destination cannot be opened.
    pub fn new(config: &CheckConfig) -> Result<Self> {
        Ok(Self::with_context(config, Context::new(config)?))
    }
}

impl<F: ExecutorFactory> Checker<F> {
    pub fn with_context(config: &CheckConfig, context: Context<F>) -> Self {
        Self {
            context,
            progress: config.progress,
            stats: CheckStats::default(),
        }
    }

    #[must_use]
    pub const fn context(&self) -> &Context<F> {
        &self.context
    }

    /// Statistics so far.
    #[must_use]
    pub fn stats(&self) -> CheckStats {
        CheckStats {
            commits: self.context.commits(),
            harts: self.context.hart_count(),
            image_bytes: self.context.image_bytes(),
            ..self.stats
        }
    }

    /// Check the trace at `path` (see [`open_trace`]).
    ///
    /// # Errors
    ///
    /// Returns the first failure, annotated with its line number.
    pub fn check_path(
        &mut self,
        path: &Path,
        progress: impl FnMut(&CheckStats),
    ) -> Result<CheckStats> {
        let reader = open_trace(path)?;
        self.check_reader(reader, progress)
    }

    /// Check every line of `reader`.
    ///
    /// `progress` is called every [`PROGRESS_INTERVAL`] lines when progress
    /// reporting is enabled.
    ///
    /// # Errors
    ///
    /// Returns the first failure, annotated with its line number.
    pub fn check_reader<R: BufRead>(
        &mut self,
        reader: R,
        mut progress: impl FnMut(&CheckStats),
    ) -> Result<CheckStats> {
        for (index, line) in reader.lines().enumerate() {
            let number = index + 1;
            let line = line.map_err(|e| Error::from(e).at_line(number))?;
            self.stats.lines = number;
            self.check_line(&line).map_err(|e| e.at_line(number))?;
            if self.progress && number % PROGRESS_INTERVAL == 0 {
                progress(&self.stats());
            }
        }
        self.context.flush()?;
        let stats = self.stats();
        debug!(
            lines = stats.lines,
            events = stats.events,
            commits = stats.commits,
            "trace exhausted"
        );
        Ok(stats)
    }

    fn check_line(&mut self, line: &str) -> Result<()> {
        let Some(event) = parse_line(line)? else {
            return Ok(());
        };
        self.stats.events += 1;
        self.context.apply(event)
    }
}

/// Event counts of a trace that was parsed but not executed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LintReport {
    pub lines: usize,
    pub events: BTreeMap<&'static str, usize>,
    /// Highest hart id referenced, if any.
    pub max_hart: Option<u32>,
}

impl LintReport {
    #[must_use]
    pub fn total_events(&self) -> usize {
        self.events.values().sum()
    }
}

/// Parse every line of `reader` without running the reference.
///
/// # Errors
///
/// Returns the first parse or read failure, annotated with its line number.
pub fn lint_reader<R: BufRead>(reader: R) -> Result<LintReport> {
    let mut report = LintReport::default();
    for (index, line) in reader.lines().enumerate() {
        let number = index + 1;
        let line = line.map_err(|e| Error::from(e).at_line(number))?;
        report.lines = number;
        if let Some(event) = parse_line(&line).map_err(|e| e.at_line(number))? {
            *report.events.entry(event.kind()).or_insert(0) += 1;
            if let Some(hart) = event.hart_id() {
                report.max_hart = Some(report.max_hart.map_or(hart, |max| max.max(hart)));
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuditSink;
    use crate::error::ErrorClass;

    fn checker() -> Checker {
        let config = CheckConfig::new()
            .with_audit(AuditSink::Disabled)
            .with_progress(true);
        Checker::new(&config).unwrap()
    }

    #[test]
    fn test_empty_trace_passes() {
        let stats = checker().check_reader(&b""[..], |_| {}).unwrap();
        assert_eq!(stats, CheckStats::default());
    }

    #[test]
    fn test_counts_lines_and_events() {
        let trace = "# header\nrv new 0 rv64gc msu\n\nrv set pc 0 0x80000000\n";
        let mut checker = checker();
        let stats = checker.check_reader(trace.as_bytes(), |_| {}).unwrap();
        assert_eq!(stats.lines, 4);
        assert_eq!(stats.events, 2);
        assert_eq!(stats.harts, 1);
        assert_eq!(stats.commits, 0);
    }

    #[test]
    fn test_error_carries_line_number() {
        let trace = "rv new 0 rv64gc msu\nrv bogus\n";
        let err = checker()
            .check_reader(trace.as_bytes(), |_| {})
            .unwrap_err();
        assert_eq!(err.line(), Some(2));
        assert_eq!(err.class(), ErrorClass::Parse);
    }

    #[test]
    fn test_progress_callback() {
        let trace = "# pad\n".repeat(PROGRESS_INTERVAL * 2 + 1);
        let mut calls = Vec::new();
        checker()
            .check_reader(trace.as_bytes(), |stats| calls.push(stats.lines))
            .unwrap();
        assert_eq!(calls, [PROGRESS_INTERVAL, PROGRESS_INTERVAL * 2]);
    }

    #[test]
    fn test_lint_histogram() {
        let trace =
            "rv new 0 rv64gc msu\nrv new 3 rv64gc msu\nrv commit 3 0x1000\nelf load a.elf 0\n";
        let report = lint_reader(trace.as_bytes()).unwrap();
        assert_eq!(report.lines, 4);
        assert_eq!(report.events.get("new"), Some(&2));
        assert_eq!(report.events.get("commit"), Some(&1));
        assert_eq!(report.events.get("elf_load"), Some(&1));
        assert_eq!(report.total_events(), 4);
        assert_eq!(report.max_hart, Some(3));
    }

    #[test]
    fn test_lint_rejects_bad_line() {
        let err = lint_reader("rv commit 0\n".as_bytes()).unwrap_err();
        assert_eq!(err.line(), Some(1));
    }
}
