//! Terminal UI utilities for progress indication and styled output.

use std::borrow::Cow;
use std::io::{self, Write};
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Spinner for indeterminate progress.
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        let bar = ProgressBar::new_spinner();
        let spinner_style = ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        bar.set_style(
            spinner_style
                .clone()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or(spinner_style),
        );
        bar.set_message(message);
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }

    pub fn set_message(&self, message: impl Into<Cow<'static, str>>) {
        self.bar.set_message(message);
    }

    /// Finish the spinner with a success message.
    pub fn finish_with_success(&self, message: &str) {
        self.bar.finish_and_clear();
        success(message);
    }

    /// Clear the spinner without a final message.
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

// ============================================================================
// Styled output helpers
// ============================================================================

/// Print a success message to stderr.
pub fn success(message: &str) {
    eprintln!("{} {}", style("✓").green().bold(), message);
}

/// Print an error message to stderr.
pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

/// Print a warning message to stderr.
pub fn warning(message: &str) {
    eprintln!("{} {}", style("!").yellow().bold(), message);
}

// ============================================================================
// Table output
// ============================================================================

/// Column alignment.
#[derive(Clone, Copy, Default)]
pub enum Alignment {
    #[default]
    Left,
    Right,
}

/// Markdown table builder.
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    alignments: Vec<Alignment>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| (*h).to_string()).collect(),
            rows: Vec::new(),
            alignments: vec![Alignment::Left; headers.len()],
        }
    }

    pub fn with_alignments(mut self, alignments: Vec<Alignment>) -> Self {
        self.alignments = alignments;
        self
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Render as a markdown table.
    pub fn render(&self) -> String {
        if self.headers.is_empty() {
            return String::new();
        }

        let mut widths: Vec<usize> = self.headers.iter().map(String::len).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.len());
            }
        }

        let mut output = String::new();

        output.push('|');
        for (header, &w) in self.headers.iter().zip(&widths) {
            output.push_str(&format!(" {header:<w$} |"));
        }
        output.push('\n');

        output.push('|');
        for (i, &w) in widths.iter().enumerate() {
            let sep = match self.alignments.get(i).copied().unwrap_or_default() {
                Alignment::Left => format!(":{:-<w$}|", "", w = w + 1),
                Alignment::Right => format!("{:-<w$}:|", "", w = w + 1),
            };
            output.push_str(&sep);
        }
        output.push('\n');

        for row in &self.rows {
            output.push('|');
            for (i, (cell, &w)) in row.iter().zip(&widths).enumerate() {
                let cell = match self.alignments.get(i).copied().unwrap_or_default() {
                    Alignment::Left => format!(" {cell:<w$} |"),
                    Alignment::Right => format!(" {cell:>w$} |"),
                };
                output.push_str(&cell);
            }
            output.push('\n');
        }

        output
    }

    /// Print the table to stdout.
    pub fn print(&self) {
        print!("{}", self.render());
        let _ = io::stdout().flush();
    }
}
