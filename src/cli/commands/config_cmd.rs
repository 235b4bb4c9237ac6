//! config command - Get, set, or list configuration values

use anyhow::{bail, Context as _, Result};

use crate::cli::Context;
use crate::core::config::schema::{AdvisoryConfig, GraphConfig};
use crate::core::config::Config;
use crate::ui::output;

const KEYS: [&str; 4] = [
    "define_children",
    "output",
    "advisory.enabled",
    "advisory.fail_on_issue",
];

fn effective(config: &Config, key: &str) -> Result<String> {
    let value = match key {
        "define_children" => config.define_children().to_string(),
        "output" => config.output(),
        "advisory.enabled" => config.advisory_enabled().to_string(),
        "advisory.fail_on_issue" => config.advisory_fail_on_issue().to_string(),
        _ => bail!("Unknown configuration key: {}", key),
    };
    Ok(value)
}

/// Get a configuration value.
pub fn get(ctx: &Context, key: &str) -> Result<()> {
    let value = effective(&ctx.config, key)?;
    println!("{}", value);
    Ok(())
}

/// Set a configuration value in the project config, or the global one.
pub fn set(ctx: &Context, key: &str, value: &str, global: bool) -> Result<()> {
    let mut config = if global {
        ctx.config.global.clone()
    } else {
        ctx.config.project.clone().unwrap_or_default()
    };
    apply(&mut config, key, value)?;

    let path = if global {
        Config::write_global(&config)
    } else {
        Config::write_project(&ctx.cwd, &config)
    }
    .context("Failed to write config")?;

    output::success(format!("{} = {} ({})", key, value, path.display()), ctx.verbosity);
    Ok(())
}

/// List all configuration values with their sources.
pub fn list(ctx: &Context) -> Result<()> {
    for key in KEYS {
        println!("{} = {}", key, effective(&ctx.config, key)?);
    }
    if let Some(path) = ctx.config.global_config_loaded_from() {
        output::debug(format!("global config: {}", path.display()), ctx.verbosity);
    }
    if let Some(path) = ctx.config.project_config_loaded_from() {
        output::debug(format!("project config: {}", path.display()), ctx.verbosity);
    }
    Ok(())
}

fn apply(config: &mut GraphConfig, key: &str, value: &str) -> Result<()> {
    let flag = || -> Result<bool> {
        value
            .parse::<bool>()
            .with_context(|| format!("{} expects true or false, got '{}'", key, value))
    };

    match key {
        "define_children" => config.define_children = Some(flag()?),
        "output" => config.output = Some(value.to_string()),
        "advisory.enabled" => {
            config
                .advisory
                .get_or_insert_with(AdvisoryConfig::default)
                .enabled = Some(flag()?)
        }
        "advisory.fail_on_issue" => {
            config
                .advisory
                .get_or_insert_with(AdvisoryConfig::default)
                .fail_on_issue = Some(flag()?)
        }
        _ => bail!("Unknown configuration key: {}", key),
    }

    config.validate().context("Invalid configuration")?;
    Ok(())
}
