//! User-facing notifications

use console::{style, Emoji};
use std::path::Path;

static CHECK: Emoji = Emoji("✓ ", "* ");
static CROSS: Emoji = Emoji("✗ ", "x ");
static INFO: Emoji = Emoji("ℹ ", "i ");

/// Where progress and failures are reported to the user.
pub trait StatusReporter: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
    fn rendered(&self, preview: &Path);
}

/// Prints to stderr, styled when the terminal supports it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl StatusReporter for ConsoleReporter {
    fn info(&self, message: &str) {
        eprintln!("{} {}", INFO, message);
    }

    fn error(&self, message: &str) {
        eprintln!("{} {}", CROSS, style(message).red());
    }

    fn rendered(&self, preview: &Path) {
        eprintln!("{} Preview updated: {}", CHECK, style(preview.display()).cyan());
    }
}
