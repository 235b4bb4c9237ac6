//! origin command - Resolve the origin type of a foreign key

use std::path::Path;

use anyhow::Result;
use serde_json::json;

use super::load_session;
use crate::cli::Context;
use crate::ui::output;

/// Print the type `type_name.key` ultimately takes its value from.
///
/// Prints nothing (or `null`) when the key is not a one-to-one foreign key.
pub fn origin(ctx: &Context, schema: &Path, type_name: &str, key: &str) -> Result<()> {
    let session = load_session(schema)?;
    let origin = session.origin_of_foreign_key(type_name, key)?;

    if ctx.json {
        return output::json(&json!({
            "type": type_name,
            "key": key,
            "origin": origin,
        }));
    }

    match origin {
        Some(origin) => output::print(origin, ctx.verbosity),
        None => output::debug(
            format!("{type_name}.{key} has no one-to-one principal"),
            ctx.verbosity,
        ),
    }
    Ok(())
}
