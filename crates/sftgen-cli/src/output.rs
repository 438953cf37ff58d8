//! Output formatting for the CLI.

use colored::*;
use sftgen_pipeline::{CaptionReport, ProcessReport, RunStatus};

/// Output formatter.
pub struct Formatter {
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(color_enabled: bool) -> Self {
        Self { color_enabled }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Status line for a document run, colored by outcome.
    pub fn run_summary(&self, report: &ProcessReport) -> String {
        let message = report.status_message();
        match &report.status {
            RunStatus::Complete { .. } => self.success(&message),
            RunStatus::Partial { .. } | RunStatus::Cancelled { .. } | RunStatus::NoValidSegments => {
                self.warning(&message)
            }
            _ => self.error(&message),
        }
    }

    /// Checkpoint failure note, if any.
    pub fn checkpoint_note(&self, report: &ProcessReport) -> Option<String> {
        (report.checkpoint_failures > 0).then(|| {
            self.warning(&format!(
                "{} checkpoint write(s) failed; use --output to choose a writable path",
                report.checkpoint_failures
            ))
        })
    }

    /// One line per caption plus the batch status.
    pub fn captions(&self, report: &CaptionReport) -> String {
        let mut out = String::new();
        for caption in &report.captions {
            let line = match &caption.error {
                Some(error) => self.error(&format!("[{}] {}", caption.index + 1, error)),
                None => format!("{} {}", self.colorize(&format!("[{}]", caption.index + 1), "cyan"), caption.text),
            };
            out.push_str(&line);
            out.push('\n');
        }
        out.push_str(&self.info(&report.status.to_string()));
        out
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            _ => text.to_string(),
        }
    }
}
