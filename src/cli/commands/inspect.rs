//! inspect command - Show keys, navigations and principal counts of types

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use super::load_session;
use crate::cli::Context;
use crate::core::error::GraphError;
use crate::core::session::{EntityTypeManager, SchemaSession};
use crate::core::types::{PropertyName, TypeName};
use crate::ui::output;

#[derive(Debug, Serialize)]
struct InspectReport {
    fingerprint: String,
    types: Vec<TypeView>,
}

#[derive(Debug, Serialize)]
struct TypeView {
    name: TypeName,
    keys: Vec<PropertyName>,
    key_store_generated: bool,
    properties: Vec<PropertyName>,
    unique: Vec<Vec<PropertyName>>,
    state_definers: Vec<PropertyName>,
    /// `None` when the type is on a principal cycle
    principal_count: Option<usize>,
    navigations: Vec<NavigationView>,
}

#[derive(Debug, Serialize)]
struct NavigationView {
    name: PropertyName,
    direction: String,
    target: TypeName,
    multiplicity: String,
    inverse: Option<PropertyName>,
}

/// Show the schema as the session sees it.
pub fn inspect(ctx: &Context, schema: &Path, only: Option<&str>) -> Result<()> {
    let session = load_session(schema)?;

    let names: Vec<String> = match only {
        Some(name) => vec![session.entity_type(name)?.name().to_string()],
        None => session.type_names().map(|n| n.to_string()).collect(),
    };

    let mut types = Vec::with_capacity(names.len());
    for name in &names {
        types.push(describe(&session, session.entity_type(name)?)?);
    }

    let report = InspectReport {
        fingerprint: session.fingerprint()?.to_string(),
        types,
    };

    if ctx.json {
        return output::json(&report);
    }

    output::print(
        format!("schema {}", &report.fingerprint[..12.min(report.fingerprint.len())]),
        ctx.verbosity,
    );
    for view in &report.types {
        print_type(ctx, view);
    }
    Ok(())
}

fn describe(session: &SchemaSession, manager: EntityTypeManager<'_>) -> Result<TypeView> {
    let principal_count = match session.principal_count(manager.name().as_str()) {
        Ok(count) => Some(count),
        Err(GraphError::DependencyCycle { .. }) => None,
        Err(err) => return Err(err.into()),
    };

    let detail = manager.navigation_detail()?;
    let navigations = detail
        .relations
        .iter()
        .map(|r| NavigationView {
            name: r.property_name.clone(),
            direction: r.direction.to_string(),
            target: r.target_type.clone(),
            multiplicity: format!("{} -> {}", r.source_multiplicity, r.target_multiplicity),
            inverse: r.inverse.clone(),
        })
        .collect();

    Ok(TypeView {
        name: manager.name().clone(),
        keys: manager.primary_keys().to_vec(),
        key_store_generated: manager.has_store_generated_key(),
        properties: manager.scalar_properties().to_vec(),
        unique: manager.unique_property_groups().to_vec(),
        state_definers: manager
            .state_definers()
            .iter()
            .map(|d| d.property.clone())
            .collect(),
        principal_count,
        navigations,
    })
}

fn print_type(ctx: &Context, view: &TypeView) {
    let count = view
        .principal_count
        .map_or_else(|| "cycle".to_string(), |c| c.to_string());
    let generated = if view.key_store_generated {
        " (generated)"
    } else {
        ""
    };

    output::print("", ctx.verbosity);
    output::print(format!("{}  principals: {}", view.name, count), ctx.verbosity);
    output::print(
        format!("  keys: {}{}", output::format_names(&view.keys), generated),
        ctx.verbosity,
    );
    output::print(
        format!("  properties: {}", output::format_names(&view.properties)),
        ctx.verbosity,
    );
    for group in &view.unique {
        output::print(
            format!("  unique: {}", output::format_names(group)),
            ctx.verbosity,
        );
    }
    if !view.state_definers.is_empty() {
        output::print(
            format!("  state definers: {}", output::format_names(&view.state_definers)),
            ctx.verbosity,
        );
    }
    for nav in &view.navigations {
        let inverse = nav
            .inverse
            .as_ref()
            .map(|i| format!(" (inverse {i})"))
            .unwrap_or_default();
        output::print(
            format!(
                "  {} {} {} [{}]{}",
                nav.name, nav.direction, nav.target, nav.multiplicity, inverse
            ),
            ctx.verbosity,
        );
    }
}
