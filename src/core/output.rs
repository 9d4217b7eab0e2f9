//! Colored console output for senzing-package
//!
//! Uses owo-colors for terminal colors and indicatif for the extraction spinner.
//! Every log line goes to stderr so that stdout carries only command results
//! (the bare version printed by `installed-version` and `package-version`).
//! Colors are used only when stderr is a terminal and `NO_COLOR` is unset.
//! Debug lines are suppressed unless [`set_debug`] has been switched on.

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::{OwoColorize, Style};
use std::io::IsTerminal;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

static DEBUG: AtomicBool = AtomicBool::new(false);

static COLOR: LazyLock<bool> =
    LazyLock::new(|| std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal());

/// Enable or disable debug lines for the rest of the process
pub fn set_debug(enabled: bool) {
    DEBUG.store(enabled, Ordering::Relaxed);
}

/// Whether debug lines are currently emitted
pub fn debug_enabled() -> bool {
    DEBUG.load(Ordering::Relaxed)
}

fn paint(text: &str, style: Style) -> String {
    if *COLOR {
        text.style(style).to_string()
    } else {
        text.to_string()
    }
}

/// Print an action header (blue, bold)
/// Example: "==> Installing downloads/Senzing_API.tgz"
pub fn action(message: &str) {
    eprintln!(
        "{} {}",
        paint("==>", Style::new().blue().bold()),
        paint(message, Style::new().bold())
    );
}

/// Print a detail line (dimmed)
/// Example: "     archived /opt/senzing to /opt/senzing-original"
pub fn detail(message: &str) {
    eprintln!("     {}", paint(message, Style::new().dimmed()));
}

/// Print a success message (green)
pub fn success(message: &str) {
    eprintln!(
        "{} {}",
        paint("==>", Style::new().green().bold()),
        paint(message, Style::new().green())
    );
}

/// Print an info message (cyan prefix)
pub fn info(message: &str) {
    eprintln!("{} {}", paint("::", Style::new().cyan()), message);
}

/// Print a warning message (yellow)
pub fn warning(message: &str) {
    eprintln!(
        "{} {}",
        paint("warning:", Style::new().yellow().bold()),
        paint(message, Style::new().yellow())
    );
}

/// Print an error message (red)
pub fn error(message: &str) {
    eprintln!(
        "{} {}",
        paint("error:", Style::new().red().bold()),
        paint(message, Style::new().red())
    );
}

/// Print a debug message (magenta), only when debug output is enabled
pub fn debug(message: &str) {
    if debug_enabled() {
        eprintln!(
            "{} {}",
            paint("debug:", Style::new().magenta()),
            paint(message, Style::new().dimmed())
        );
    }
}

/// Print a skip message (dimmed)
/// Example: "==> /opt/senzing already absent, nothing to delete"
pub fn skip(message: &str) {
    eprintln!(
        "{} {}",
        paint("==>", Style::new().dimmed()),
        paint(message, Style::new().dimmed())
    );
}

/// Create a simple spinner for long filesystem operations
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    // The template is a literal; fall back to the default style if it is ever rejected.
    let style = ProgressStyle::default_spinner()
        .template("     {spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Finish a progress bar and clear it
pub fn progress_done(pb: ProgressBar) {
    pb.finish_and_clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_creation() {
        let pb = spinner("extracting");
        progress_done(pb);
    }

    #[test]
    fn test_paint_plain_without_terminal() {
        // Plain text whenever stderr is not a terminal.
        if !std::io::stderr().is_terminal() {
            assert_eq!(paint("2.1.0", Style::new().cyan()), "2.1.0");
        }
    }

    #[test]
    fn test_debug_switch() {
        set_debug(true);
        assert!(debug_enabled());
        debug("visible");
        set_debug(false);
        assert!(!debug_enabled());
        debug("hidden");
    }
}
