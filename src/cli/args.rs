//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//! - `--json`: Machine-readable output
//! - `--config <path>`: Use this config file instead of the default locations

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// entitygraph - dependency ordering and state definition for entity graphs
#[derive(Parser, Debug)]
#[command(name = "entitygraph")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if entitygraph was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Read configuration from this file only
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show keys, navigations and principal counts of schema types
    #[command(
        name = "inspect",
        after_help = "\
EXAMPLES:
    # Every type of a schema
    entitygraph inspect schema.toml

    # One type, as JSON
    entitygraph inspect schema.toml --type Order --json"
    )]
    Inspect {
        /// Schema document (.toml, or JSON otherwise)
        schema: PathBuf,

        /// Only this entity type
        #[arg(long = "type", value_name = "TYPE")]
        type_name: Option<String>,
    },

    /// List types in processing order
    #[command(
        name = "order",
        long_about = "List types in processing order.\n\n\
            Types are sorted by ascending principal count, ties broken by name. \
            Inserting in this order puts every principal before its dependents."
    )]
    Order {
        /// Schema document
        schema: PathBuf,
    },

    /// Resolve the origin type of a foreign key
    #[command(
        name = "origin",
        long_about = "Resolve the origin type of a foreign key.\n\n\
            Follows one-to-one principal relationships from TYPE.KEY upward and \
            prints the topmost type the value comes from, or nothing when the \
            key is not a one-to-one foreign key."
    )]
    Origin {
        /// Schema document
        schema: PathBuf,

        /// Entity type
        #[arg(value_name = "TYPE")]
        type_name: String,

        /// Foreign key property
        key: String,
    },

    /// Check a schema for principal cycles and advisory issues
    #[command(
        name = "check",
        after_help = "\
EXAMPLES:
    # Cycles are errors, advisory findings follow the config
    entitygraph check schema.toml

    # Fail on advisory findings too
    entitygraph check schema.toml --strict"
    )]
    Check {
        /// Schema document
        schema: PathBuf,

        /// Fail on collection navigations without an inverse
        #[arg(long)]
        strict: bool,
    },

    /// Define the state of a batch and print its processing order
    #[command(
        name = "plan",
        long_about = "Define the state of a batch and print its processing order.\n\n\
            Loads the objects, links and persisted records of a batch document, \
            defines the state of every object reachable from the batch roots and \
            prints them in the order they must be processed."
    )]
    Plan {
        /// Schema document
        schema: PathBuf,

        /// Batch document
        batch: PathBuf,

        /// Only define the roots, their ancestors and state definers
        #[arg(long)]
        no_children: bool,
    },

    /// Get, set, or list configuration values
    #[command(
        name = "config",
        after_help = "\
KEYS:
    define_children          Define state of children by default (true)
    output                   text | json
    advisory.enabled         Report collection navigations without inverse
    advisory.fail_on_issue   Fail instead of reporting"
    )]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommand actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Value to set
        value: String,
        /// Write the global config instead of the project config
        #[arg(long)]
        global: bool,
    },
    /// List all configuration values
    List,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["entitygraph", "order", "s.toml", "--json", "-q"]).unwrap();
        assert!(cli.json);
        assert!(cli.quiet);
        assert!(matches!(cli.command, Command::Order { .. }));
    }

    #[test]
    fn plan_flags() {
        let cli =
            Cli::try_parse_from(["entitygraph", "plan", "s.toml", "b.toml", "--no-children"])
                .unwrap();
        match cli.command {
            Command::Plan {
                schema,
                batch,
                no_children,
            } => {
                assert_eq!(schema, PathBuf::from("s.toml"));
                assert_eq!(batch, PathBuf::from("b.toml"));
                assert!(no_children);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn origin_needs_type_and_key() {
        assert!(Cli::try_parse_from(["entitygraph", "origin", "s.toml", "Person"]).is_err());
    }
}
