//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Project config file
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$ENTITYGRAPH_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/entitygraph/config.toml`
//! 3. `~/.entitygraph/config.toml` (canonical write location)
//!
//! # Project Config Locations
//!
//! Searched in order:
//! 1. `entitygraph.toml` (canonical)
//! 2. `.entitygraph/config.toml` (compatibility, warns)
//!
//! # Example
//!
//! ```no_run
//! use entitygraph::core::config::Config;
//! use std::path::Path;
//!
//! let result = Config::load(Some(Path::new("/path/to/project"))).unwrap();
//! let config = result.config;
//!
//! println!("Define children: {}", config.define_children());
//! println!("Advisory: {}", config.advisory_enabled());
//! ```

pub mod schema;

pub use schema::{AdvisoryConfig, GraphConfig};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    pub config: Config,
    pub warnings: Vec<ConfigWarning>,
}

/// Merged configuration from all sources.
///
/// Accessors apply precedence: project over global over defaults.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub global: GraphConfig,
    pub project: Option<GraphConfig>,
    global_path: Option<PathBuf>,
    project_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `project_dir` is provided, also loads the project config.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed, or if
    /// the merged values are inconsistent. Missing files are not an error.
    pub fn load(project_dir: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let (global, global_path) = Self::load_global()?;
        let (project, project_path) = match project_dir {
            Some(dir) => Self::load_project(dir, &mut warnings)?,
            None => (None, None),
        };

        let config = Config {
            global,
            project,
            global_path,
            project_path,
        };
        config.validate()?;

        Ok(ConfigLoadResult { config, warnings })
    }

    /// Load a single explicitly named file, ignoring the default locations.
    pub fn load_file(path: &Path) -> Result<ConfigLoadResult, ConfigError> {
        let project = Self::read_config(path)?;
        let config = Config {
            global: GraphConfig::default(),
            project: Some(project),
            global_path: None,
            project_path: Some(path.to_path_buf()),
        };
        config.validate()?;

        Ok(ConfigLoadResult {
            config,
            warnings: Vec::new(),
        })
    }

    /// First existing global file: `$ENTITYGRAPH_CONFIG`, then
    /// `$XDG_CONFIG_HOME/entitygraph/config.toml`, then the home directory.
    fn load_global() -> Result<(GraphConfig, Option<PathBuf>), ConfigError> {
        let candidates = [
            std::env::var_os("ENTITYGRAPH_CONFIG").map(PathBuf::from),
            std::env::var_os("XDG_CONFIG_HOME")
                .map(|xdg| PathBuf::from(xdg).join("entitygraph/config.toml")),
            dirs::home_dir().map(|home| home.join(".entitygraph/config.toml")),
        ];

        match candidates.into_iter().flatten().find(|path| path.exists()) {
            Some(path) => Ok((Self::read_config(&path)?, Some(path))),
            None => Ok((GraphConfig::default(), None)),
        }
    }

    fn load_project(
        project_dir: &Path,
        warnings: &mut Vec<ConfigWarning>,
    ) -> Result<(Option<GraphConfig>, Option<PathBuf>), ConfigError> {
        let canonical = Self::project_config_path(project_dir);
        if canonical.exists() {
            let config = Self::read_config(&canonical)?;
            return Ok((Some(config), Some(canonical)));
        }

        let legacy = project_dir.join(".entitygraph/config.toml");
        if legacy.exists() {
            warnings.push(ConfigWarning {
                message: format!(
                    "Using deprecated config location. Please move to '{}'",
                    canonical.display()
                ),
                path: legacy.clone(),
            });
            let config = Self::read_config(&legacy)?;
            return Ok((Some(config), Some(legacy)));
        }

        Ok((None, None))
    }

    fn read_config(path: &Path) -> Result<GraphConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: GraphConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the merged values.
    ///
    /// A project may enable failing mode only if the advisory check ends up
    /// enabled after merging.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.advisory_fail_on_issue() && !self.advisory_enabled() {
            return Err(ConfigError::InvalidValue(
                "advisory.fail_on_issue requires advisory.enabled".to_string(),
            ));
        }
        Ok(())
    }

    /// Canonical global config path: `~/.entitygraph/config.toml`.
    pub fn global_config_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".entitygraph/config.toml"))
    }

    /// Canonical project config path: `entitygraph.toml` in `project_dir`.
    pub fn project_config_path(project_dir: &Path) -> PathBuf {
        project_dir.join("entitygraph.toml")
    }

    /// Write global config atomically.
    pub fn write_global(config: &GraphConfig) -> Result<PathBuf, ConfigError> {
        let path = Self::global_config_path()?;
        Self::write_config_atomic(&path, config)?;
        Ok(path)
    }

    /// Write project config atomically.
    pub fn write_project(project_dir: &Path, config: &GraphConfig) -> Result<PathBuf, ConfigError> {
        let path = Self::project_config_path(project_dir);
        Self::write_config_atomic(&path, config)?;
        Ok(path)
    }

    /// Write to a temp file in the same directory, then rename over `path`.
    fn write_config_atomic(path: &Path, config: &GraphConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let contents =
            toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let failed = |at: &Path| {
            let at = at.to_path_buf();
            move |source: std::io::Error| ConfigError::WriteError { path: at, source }
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(failed(path))?;
        }

        let temp_path = path.with_extension("toml.tmp");
        let mut file = fs::File::create(&temp_path).map_err(failed(&temp_path))?;
        file.write_all(contents.as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(failed(&temp_path))?;
        fs::rename(&temp_path, path).map_err(failed(path))?;

        Ok(())
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    fn pick<T>(&self, field: impl Fn(&GraphConfig) -> Option<T>) -> Option<T> {
        self.project
            .as_ref()
            .and_then(&field)
            .or_else(|| field(&self.global))
    }

    /// Whether state definition recurses into children.
    ///
    /// Defaults to `true`.
    pub fn define_children(&self) -> bool {
        self.pick(|c| c.define_children).unwrap_or(true)
    }

    /// Output format. Defaults to `"text"`.
    pub fn output(&self) -> String {
        self.pick(|c| c.output.clone())
            .unwrap_or_else(|| "text".to_string())
    }

    /// Whether the advisory check runs. Defaults to `false`.
    pub fn advisory_enabled(&self) -> bool {
        self.pick(|c| c.advisory.as_ref().and_then(|a| a.enabled))
            .unwrap_or(false)
    }

    /// Whether advisory findings are errors. Defaults to `false`.
    pub fn advisory_fail_on_issue(&self) -> bool {
        self.pick(|c| c.advisory.as_ref().and_then(|a| a.fail_on_issue))
            .unwrap_or(false)
    }

    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    pub fn project_config_loaded_from(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }
}
