//! cli
//!
//! Command-line interface for entitygraph.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install logging and load configuration
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It builds a [`Context`] from flags and config and
//! dispatches to [`commands`], which call into [`crate::core`] and
//! [`crate::graph`]. Configuration is read once per invocation.

pub mod args;
pub mod commands;

pub use args::Cli;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::core::config::Config;
use crate::core::verify::AdvisoryMode;
use crate::ui::output::{self, Verbosity};

/// Settings shared by every command of one invocation.
#[derive(Debug)]
pub struct Context {
    /// Working directory for project config
    pub cwd: PathBuf,
    pub verbosity: Verbosity,
    pub json: bool,
    pub config: Config,
}

impl Context {
    /// Advisory mode from config; `strict` forces failing mode.
    pub fn advisory_mode(&self, strict: bool) -> AdvisoryMode {
        if strict {
            AdvisoryMode::Fail
        } else {
            AdvisoryMode::from_flags(
                self.config.advisory_enabled(),
                self.config.advisory_fail_on_issue(),
            )
        }
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.debug);

    let ctx = build_context(&cli)?;
    commands::dispatch(cli.command, &ctx)
}

/// `--debug` raises the default filter; `RUST_LOG` wins over both.
fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    // A logger installed earlier (tests) stays in place.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}

fn build_context(cli: &Cli) -> Result<Context> {
    let cwd = match &cli.cwd {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };
    let verbosity = Verbosity::from_flags(cli.quiet, cli.debug);

    let loaded = match &cli.config {
        Some(path) => Config::load_file(path),
        None => Config::load(Some(Path::new(&cwd))),
    }
    .context("Failed to load configuration")?;

    for warning in &loaded.warnings {
        output::warn(
            format!("{} ({})", warning.message, warning.path.display()),
            verbosity,
        );
    }

    let json = cli.json || loaded.config.output() == "json";
    Ok(Context {
        cwd,
        verbosity,
        json,
        config: loaded.config,
    })
}
