//! plan command - Define the state of a batch and print its processing order

use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result};

use super::load_session;
use crate::cli::Context;
use crate::core::metadata::schema::DocumentFormat;
use crate::graph::batch::parse_batch;
use crate::graph::{ObjectId, StatePlan};
use crate::ui::output;

/// Load `batch` against `schema`, define state from its roots and print
/// the resulting plan.
pub fn plan(ctx: &Context, schema: &Path, batch: &Path, no_children: bool) -> Result<()> {
    let session = load_session(schema)?;

    let text = fs::read_to_string(batch)
        .with_context(|| format!("Failed to read batch {}", batch.display()))?;
    let doc = parse_batch(&text, DocumentFormat::from_path(batch))
        .with_context(|| format!("Invalid batch {}", batch.display()))?;
    let mut loaded = doc
        .load(&session)
        .with_context(|| format!("Invalid batch {}", batch.display()))?;

    let define_children = !no_children && ctx.config.define_children();
    output::debug(
        format!(
            "{} roots, define_children = {}",
            loaded.roots.len(),
            define_children
        ),
        ctx.verbosity,
    );

    let roots = loaded.roots.clone();
    let plan = if roots.is_empty() {
        StatePlan::default()
    } else {
        loaded
            .context
            .define_state_many(&roots, define_children)
            .context("Cannot define state of batch")?
    };

    if ctx.json {
        return output::json(&plan);
    }

    let name = |id: ObjectId| -> String {
        plan.entry(id)
            .and_then(|e| e.label.clone())
            .unwrap_or_else(|| id.to_string())
    };
    for (position, entry) in plan.entries.iter().enumerate() {
        let duplicate = entry
            .duplicate_of
            .map(|other| format!("  (same as {})", name(other)))
            .unwrap_or_default();
        output::print(
            format!(
                "{:>3}  {:<20} {:<16} {}{}",
                position,
                entry.state.to_string(),
                entry.type_name.to_string(),
                name(entry.object),
                duplicate
            ),
            ctx.verbosity,
        );
    }
    Ok(())
}
