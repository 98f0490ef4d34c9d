//! Configuration file loading and validation.

use crate::duration::parse_duration;
use crate::error::ConfigError;
use crate::settings::StrobeConfig;
use std::path::Path;

/// The configuration file name looked up in a project directory.
pub const CONFIG_FILE_NAME: &str = "strobe.toml";

/// Loads and validates `strobe.toml` from a project directory.
pub fn load_config(project_dir: &Path) -> Result<StrobeConfig, ConfigError> {
    load_config_file(&project_dir.join(CONFIG_FILE_NAME))
}

/// Loads and validates a configuration file at an explicit path.
pub fn load_config_file(path: &Path) -> Result<StrobeConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `strobe.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<StrobeConfig, ConfigError> {
    let config: StrobeConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks limits and clock definitions for consistency.
fn validate_config(config: &StrobeConfig) -> Result<(), ConfigError> {
    if config.sim.max_settle_iterations == 0 {
        return Err(ConfigError::ValidationError(
            "sim.max_settle_iterations must be at least 1".to_string(),
        ));
    }
    if let Some(limit) = &config.sim.time_limit {
        if parse_duration(limit).is_none() {
            return Err(ConfigError::InvalidValue {
                field: "sim.time_limit".to_string(),
                value: limit.clone(),
            });
        }
    }
    for (domain, clock) in &config.clocks {
        match (&clock.period, &clock.frequency) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::ValidationError(format!(
                    "clocks.{domain}: set either period or frequency, not both"
                )))
            }
            (None, None) => {
                return Err(ConfigError::MissingField(format!("clocks.{domain}.period")))
            }
            _ => {}
        }
    }
    Ok(())
}
