//! order command - List types in processing order

use std::path::Path;

use anyhow::{Context as _, Result};

use super::load_session;
use crate::cli::Context;
use crate::core::graph::type_processing_order;
use crate::ui::output;

/// Print every type with its principal count, principals first.
pub fn order(ctx: &Context, schema: &Path) -> Result<()> {
    let session = load_session(schema)?;
    let ordered = type_processing_order(&session).context("Cannot order schema types")?;

    if ctx.json {
        return output::json(&ordered);
    }

    for entry in &ordered {
        output::print(
            format!("{:>3}  {}", entry.principal_count, entry.name),
            ctx.verbosity,
        );
    }
    Ok(())
}
