//! core::config::schema
//!
//! Configuration schema types.
//!
//! The same [`GraphConfig`] shape is used for the global file and the
//! project file; every field is optional so a project file only has to name
//! what it overrides.
//!
//! # Validation
//!
//! Values are validated after parsing: `output` must name a known format
//! and the advisory check cannot fail on issues while disabled.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Engine configuration (global or project scope).
///
/// # Example
///
/// ```toml
/// define_children = true
/// output = "text"
///
/// [advisory]
/// enabled = true
/// fail_on_issue = false
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GraphConfig {
    /// Whether state definition recurses into child objects by default
    pub define_children: Option<bool>,

    /// Output format ("text" or "json")
    pub output: Option<String>,

    /// Navigation-inverse advisory check
    pub advisory: Option<AdvisoryConfig>,
}

impl GraphConfig {
    /// Valid output formats.
    pub const VALID_OUTPUTS: &'static [&'static str] = &["text", "json"];

    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(output) = &self.output {
            if !Self::VALID_OUTPUTS.contains(&output.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid output '{}', must be one of: {}",
                    output,
                    Self::VALID_OUTPUTS.join(", ")
                )));
            }
        }

        if let Some(advisory) = &self.advisory {
            advisory.validate()?;
        }

        Ok(())
    }
}

/// Settings of the collection-navigation advisory check.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AdvisoryConfig {
    /// Run the check at all
    pub enabled: Option<bool>,

    /// Turn findings into an error
    pub fail_on_issue: Option<bool>,
}

impl AdvisoryConfig {
    /// Validate the advisory settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fail_on_issue == Some(true) && self.enabled == Some(false) {
            return Err(ConfigError::InvalidValue(
                "advisory.fail_on_issue requires advisory.enabled".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = GraphConfig::default();
        assert!(config.define_children.is_none());
        assert!(config.output.is_none());
        assert!(config.advisory.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn valid_output() {
        let config = GraphConfig {
            output: Some("json".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_output() {
        let config = GraphConfig {
            output: Some("yaml".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn fail_on_issue_while_disabled_rejected() {
        let config = GraphConfig {
            advisory: Some(AdvisoryConfig {
                enabled: Some(false),
                fail_on_issue: Some(true),
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn roundtrip() {
        let config = GraphConfig {
            define_children: Some(false),
            output: Some("text".to_string()),
            advisory: Some(AdvisoryConfig {
                enabled: Some(true),
                fail_on_issue: Some(true),
            }),
        };

        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: GraphConfig = toml::from_str(&toml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn reject_unknown_fields() {
        let toml = r#"
            define_children = true
            trunk = "main"
        "#;

        let result: Result<GraphConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }
}
