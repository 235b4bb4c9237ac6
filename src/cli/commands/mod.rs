//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads the schema (and batch) documents named on the command line
//! 2. Calls the library to do the work
//! 3. Formats and displays output, as text or JSON
//!
//! Handlers never hold state across invocations.

mod check;
mod config_cmd;
mod inspect;
mod order;
mod origin;
mod plan;

pub use check::check;
pub use config_cmd::{get as config_get, list as config_list, set as config_set};
pub use inspect::inspect;
pub use order::order;
pub use origin::origin;
pub use plan::plan;

use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result};

use super::args::{Command, ConfigAction};
use super::Context;
use crate::core::metadata::schema::{parse_schema, DocumentFormat};
use crate::core::metadata::SchemaCatalog;
use crate::core::session::SchemaSession;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Inspect { schema, type_name } => inspect::inspect(ctx, &schema, type_name.as_deref()),
        Command::Order { schema } => order::order(ctx, &schema),
        Command::Origin {
            schema,
            type_name,
            key,
        } => origin::origin(ctx, &schema, &type_name, &key),
        Command::Check { schema, strict } => check::check(ctx, &schema, strict),
        Command::Plan {
            schema,
            batch,
            no_children,
        } => plan::plan(ctx, &schema, &batch, no_children),
        Command::Config { action } => match action {
            ConfigAction::Get { key } => config_cmd::get(ctx, &key),
            ConfigAction::Set { key, value, global } => config_cmd::set(ctx, &key, &value, global),
            ConfigAction::List => config_cmd::list(ctx),
        },
    }
}

/// Read a schema document and open a session over it.
pub(crate) fn load_session(path: &Path) -> Result<SchemaSession> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema {}", path.display()))?;
    let doc = parse_schema(&text, DocumentFormat::from_path(path))
        .with_context(|| format!("Invalid schema {}", path.display()))?;
    let catalog = SchemaCatalog::from_document(&doc)
        .with_context(|| format!("Invalid schema {}", path.display()))?;
    Ok(SchemaSession::new(catalog)?)
}
