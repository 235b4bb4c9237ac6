//! core::verify
//!
//! Schema verification.
//!
//! # Checks
//!
//! - **Principal cycles**: always run. A cycle among principal navigations
//!   (after the self-reference and state-definer exclusions) makes principal
//!   counting impossible.
//! - **Advisory**: opt-in. Reports every collection navigation that has no
//!   inverse navigation on the target type. Such a relationship cannot be
//!   walked from the dependent back to its principal. Never fatal unless
//!   failing mode is requested.
//!
//! # Invariants
//!
//! - Never mutates the session beyond filling its memo tables
//! - Must be deterministic: findings are sorted by type, then navigation

use log::warn;
use serde::Serialize;
use thiserror::Error;

use super::error::GraphError;
use super::graph::TypeGraph;
use super::session::SchemaSession;
use super::types::{PropertyName, TypeName};

/// Findings of schema verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("principal dependency cycle: {}", join_path(.0))]
    CycleDetected(Vec<TypeName>),

    #[error("{0}")]
    NavigationWithoutInverse(AdvisoryIssue),
}

fn join_path(path: &[TypeName]) -> String {
    path.iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// A collection navigation without an inverse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdvisoryIssue {
    pub type_name: TypeName,
    pub navigation: PropertyName,
    pub target_type: TypeName,
}

impl std::fmt::Display for AdvisoryIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{} is a collection of {} without an inverse navigation",
            self.type_name, self.navigation, self.target_type
        )
    }
}

/// How the advisory check runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AdvisoryMode {
    /// Skip the check
    #[default]
    Off,
    /// Report findings
    Report,
    /// Fail with `AdvisoryViolation` on any finding
    Fail,
}

impl AdvisoryMode {
    /// Mode from the two config switches.
    pub fn from_flags(enabled: bool, fail_on_issue: bool) -> Self {
        match (enabled, fail_on_issue) {
            (false, _) => Self::Off,
            (true, false) => Self::Report,
            (true, true) => Self::Fail,
        }
    }
}

/// Result of schema verification.
#[derive(Debug)]
pub struct VerifyResult {
    /// Whether verification passed
    pub ok: bool,
    /// Errors found during verification
    pub errors: Vec<VerifyError>,
}

impl VerifyResult {
    pub fn success() -> Self {
        Self {
            ok: true,
            errors: vec![],
        }
    }

    pub fn failure(errors: Vec<VerifyError>) -> Self {
        Self { ok: false, errors }
    }
}

/// Every collection navigation without an inverse.
pub fn collection_navigations_without_inverse(
    session: &SchemaSession,
) -> Result<Vec<AdvisoryIssue>, GraphError> {
    let mut issues = Vec::new();
    for name in session.type_names() {
        let detail = session.navigation_detail(name.as_str())?;
        for relation in &detail.relations {
            if relation.is_collection() && relation.inverse.is_none() {
                issues.push(AdvisoryIssue {
                    type_name: name.clone(),
                    navigation: relation.property_name.clone(),
                    target_type: relation.target_type.clone(),
                });
            }
        }
    }
    issues.sort_by(|a, b| {
        a.type_name
            .cmp(&b.type_name)
            .then_with(|| a.navigation.cmp(&b.navigation))
    });
    Ok(issues)
}

/// Run the advisory check in the given mode.
///
/// # Errors
///
/// `AdvisoryViolation` in [`AdvisoryMode::Fail`] when anything is found.
pub fn check_navigation_inverses(
    session: &SchemaSession,
    mode: AdvisoryMode,
) -> Result<Vec<AdvisoryIssue>, GraphError> {
    if mode == AdvisoryMode::Off {
        return Ok(Vec::new());
    }

    let issues = collection_navigations_without_inverse(session)?;
    for issue in &issues {
        warn!("advisory: {issue}");
    }

    if mode == AdvisoryMode::Fail && !issues.is_empty() {
        let listed: Vec<String> = issues
            .iter()
            .map(|i| format!("{}.{}", i.type_name, i.navigation))
            .collect();
        return Err(GraphError::AdvisoryViolation(format!(
            "collection navigations without inverse: {}",
            listed.join(", ")
        )));
    }

    Ok(issues)
}

/// Verify a schema session.
///
/// Provider failures and `Fail`-mode advisory findings are returned as
/// errors; cycles and reported findings end up in the result.
pub fn verify_schema(
    session: &SchemaSession,
    mode: AdvisoryMode,
) -> Result<VerifyResult, GraphError> {
    let mut errors = Vec::new();

    let graph = TypeGraph::from_session(session)?;
    if let Some(cycle) = graph.find_cycle() {
        errors.push(VerifyError::CycleDetected(cycle));
    }

    errors.extend(
        check_navigation_inverses(session, mode)?
            .into_iter()
            .map(VerifyError::NavigationWithoutInverse),
    );

    if errors.is_empty() {
        Ok(VerifyResult::success())
    } else {
        Ok(VerifyResult::failure(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::schema::{parse_schema, DocumentFormat};
    use crate::core::metadata::SchemaCatalog;

    fn session(body: &str) -> SchemaSession {
        let text = format!("kind = \"entitygraph.schema\"\nschema_version = 1\n{body}");
        let doc = parse_schema(&text, DocumentFormat::Toml).unwrap();
        SchemaSession::new(SchemaCatalog::from_document(&doc).unwrap()).unwrap()
    }

    const ONE_WAY: &str = r#"
[[entity]]
name = "Team"
keys = ["id"]

[[entity]]
name = "Player"
keys = ["id"]
properties = ["team_id"]

[[relationship]]
principal = "Team"
principal_keys = ["id"]
dependent = "Player"
dependent_keys = ["team_id"]
principal_navigation = "players"
"#;

    #[test]
    fn mode_from_flags() {
        assert_eq!(AdvisoryMode::from_flags(false, true), AdvisoryMode::Off);
        assert_eq!(AdvisoryMode::from_flags(true, false), AdvisoryMode::Report);
        assert_eq!(AdvisoryMode::from_flags(true, true), AdvisoryMode::Fail);
    }

    #[test]
    fn collection_without_inverse_reported() {
        let session = session(ONE_WAY);
        let issues = check_navigation_inverses(&session, AdvisoryMode::Report).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].type_name.as_str(), "Team");
        assert_eq!(issues[0].navigation.as_str(), "players");
        assert_eq!(
            issues[0].to_string(),
            "Team.players is a collection of Player without an inverse navigation"
        );
    }

    #[test]
    fn off_mode_reports_nothing() {
        let session = session(ONE_WAY);
        assert!(check_navigation_inverses(&session, AdvisoryMode::Off)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn fail_mode_is_advisory_violation() {
        let session = session(ONE_WAY);
        let err = check_navigation_inverses(&session, AdvisoryMode::Fail).unwrap_err();
        assert!(matches!(err, GraphError::AdvisoryViolation(ref m) if m.contains("Team.players")));
    }

    #[test]
    fn inverse_present_is_clean() {
        let session = session(&format!("{ONE_WAY}dependent_navigation = \"team\"\n"));
        let result = verify_schema(&session, AdvisoryMode::Fail).unwrap();
        assert!(result.ok);
    }

    #[test]
    fn cycle_is_a_verify_error() {
        let session = session(
            r#"
[[entity]]
name = "Left"
keys = ["id"]
properties = ["right_id"]

[[entity]]
name = "Right"
keys = ["id"]
properties = ["left_id"]

[[relationship]]
principal = "Right"
principal_keys = ["id"]
dependent = "Left"
dependent_keys = ["right_id"]
dependent_navigation = "right"

[[relationship]]
principal = "Left"
principal_keys = ["id"]
dependent = "Right"
dependent_keys = ["left_id"]
dependent_navigation = "left"
"#,
        );
        let result = verify_schema(&session, AdvisoryMode::Off).unwrap();
        assert!(!result.ok);
        assert!(matches!(result.errors[0], VerifyError::CycleDetected(_)));
        assert!(result.errors[0].to_string().starts_with("principal dependency cycle: "));
    }
}
