//! ui::output
//!
//! Human-facing output of the diagnostic binary.
//!
//! Reports go to stdout, diagnostics to stderr. `--quiet` silences
//! everything except errors and JSON, so scripts can rely on `--json -q`.
//! Library diagnostics do not pass through here; they use the `log` facade.

use std::fmt::Display;

use anyhow::{Context as _, Result};
use serde::Serialize;

/// How much the binary prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    /// Also print `[debug]` lines
    Debug,
}

impl Verbosity {
    /// `--quiet` wins over `--debug`.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        match (quiet, debug) {
            (true, _) => Verbosity::Quiet,
            (false, true) => Verbosity::Debug,
            (false, false) => Verbosity::Normal,
        }
    }

    fn is_quiet(self) -> bool {
        self == Verbosity::Quiet
    }
}

/// Report line on stdout.
pub fn print(message: impl Display, verbosity: Verbosity) {
    if !verbosity.is_quiet() {
        println!("{message}");
    }
}

/// `[debug]` line on stderr, with `--debug` only.
pub fn debug(message: impl Display, verbosity: Verbosity) {
    if verbosity == Verbosity::Debug {
        eprintln!("[debug] {message}");
    }
}

/// Shown even in quiet mode.
pub fn error(message: impl Display) {
    eprintln!("error: {message}");
}

pub fn warn(message: impl Display, verbosity: Verbosity) {
    if !verbosity.is_quiet() {
        eprintln!("warning: {message}");
    }
}

/// Final confirmation of a command, on stdout.
pub fn success(message: impl Display, verbosity: Verbosity) {
    print(message, verbosity);
}

/// Print `value` as pretty JSON.
pub fn json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", text);
    Ok(())
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Join names with `", "`, or `-` when there are none.
pub fn format_names<T: Display>(items: &[T]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items
            .iter()
            .map(|item| item.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
