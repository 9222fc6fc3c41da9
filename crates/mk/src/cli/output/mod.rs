//! Output formatting utilities for messages outside the console sink

use console::{style, Style};

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

/// Print a warning message
pub fn warning(message: &str) {
    eprintln!("{} {}", style("!").yellow().bold(), message);
}

/// Style for paths
pub fn path_style() -> Style {
    Style::new().cyan()
}

/// Style for commands the user can run next
pub fn command_style() -> Style {
    Style::new().cyan().bold()
}
