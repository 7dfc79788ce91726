//! Terminal styling helpers
//!
//! Output goes through `anstream`, which strips the escape codes when the
//! stream is not a terminal.

use indicatif::ProgressStyle;
use owo_colors::OwoColorize;
use std::fmt::Display;
use supports_hyperlinks::Stream;
use terminal_link::Link;

/// Check mark used in summaries
pub const CHECK: &str = "✓";

/// Cross used for failures
pub const CROSS: &str = "✗";

/// Color roles used across commands
pub trait Stylize {
    /// Secondary information
    fn muted(&self) -> String;
    /// Names the user should notice
    fn emphasis(&self) -> String;
    /// Numbers and identifiers
    fn accent(&self) -> String;
    /// Completed actions
    fn success(&self) -> String;
    /// Non-fatal problems
    fn warn(&self) -> String;
    /// Failures
    fn error(&self) -> String;
}

impl<T: Display> Stylize for T {
    fn muted(&self) -> String {
        self.dimmed().to_string()
    }

    fn emphasis(&self) -> String {
        self.bold().to_string()
    }

    fn accent(&self) -> String {
        self.cyan().to_string()
    }

    fn success(&self) -> String {
        self.green().to_string()
    }

    fn warn(&self) -> String {
        self.yellow().to_string()
    }

    fn error(&self) -> String {
        self.red().bold().to_string()
    }
}

/// Green check mark
pub fn check() -> String {
    CHECK.success()
}

/// Red cross
pub fn cross() -> String {
    CROSS.error()
}

/// Spinner style for network waits
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// `text` as a clickable link where the terminal supports it
pub fn hyperlink(text: &str, url: &str) -> String {
    if url.is_empty() {
        return text.to_string();
    }
    if supports_hyperlinks::on(Stream::Stderr) {
        Link::new(text, url).to_string()
    } else {
        format!("{text} ({url})")
    }
}
