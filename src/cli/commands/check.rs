//! check command - Verify a schema for principal cycles and advisory issues

use std::path::Path;

use anyhow::{bail, Result};
use serde::Serialize;

use super::load_session;
use crate::cli::Context;
use crate::core::verify::{verify_schema, VerifyError};
use crate::ui::output;

#[derive(Debug, Serialize)]
struct CheckReport {
    ok: bool,
    cycles: Vec<String>,
    advisories: Vec<String>,
}

/// Check `schema`.
///
/// Cycles always fail the command. Advisory findings are reported when
/// enabled in config and fail it with `--strict` or `fail_on_issue`.
pub fn check(ctx: &Context, schema: &Path, strict: bool) -> Result<()> {
    let session = load_session(schema)?;
    let mode = ctx.advisory_mode(strict);
    output::debug(format!("advisory mode: {mode:?}"), ctx.verbosity);

    let result = verify_schema(&session, mode)?;
    let (cycles, advisories): (Vec<&VerifyError>, Vec<&VerifyError>) = result
        .errors
        .iter()
        .partition(|e| matches!(e, VerifyError::CycleDetected(_)));
    let cycles: Vec<String> = cycles.iter().map(|e| e.to_string()).collect();
    let advisories: Vec<String> = advisories.iter().map(|e| e.to_string()).collect();

    if ctx.json {
        output::json(&CheckReport {
            ok: cycles.is_empty(),
            cycles: cycles.clone(),
            advisories: advisories.clone(),
        })?;
    } else {
        for advisory in &advisories {
            output::warn(advisory, ctx.verbosity);
        }
        if cycles.is_empty() {
            output::success("schema ok", ctx.verbosity);
        } else {
            output::print(output::format_list(&cycles, "  - "), ctx.verbosity);
        }
    }

    if !cycles.is_empty() {
        bail!("schema has {} principal cycle(s)", cycles.len());
    }
    Ok(())
}
