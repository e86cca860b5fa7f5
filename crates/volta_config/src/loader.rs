//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::{ProjectConfig, RefinementValue};
use std::path::Path;

/// Name of the project configuration file.
pub const CONFIG_FILE: &str = "volta.toml";

/// Loads and validates `volta.toml` from a project directory.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = std::fs::read_to_string(project_dir.join(CONFIG_FILE))?;
    load_config_from_str(&content)
}

/// Parses and validates a `volta.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    if config.project.top.is_empty() {
        return Err(ConfigError::MissingField("project.top".to_string()));
    }
    for (from, to) in &config.refinements.classes {
        if from.is_empty() || to.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "class refinement '{from}' -> '{to}' names an empty class"
            )));
        }
    }
    for (path, class) in &config.refinements.instances {
        if path.is_empty() || class.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "instance refinement '{path}' -> '{class}' is incomplete"
            )));
        }
    }
    for (path, value) in &config.refinements.values {
        if let RefinementValue::Range([lower, upper]) = value {
            if lower > upper {
                return Err(ConfigError::ValidationError(format!(
                    "value for '{path}' has lower bound {lower} above upper bound {upper}"
                )));
            }
        }
    }
    if matches!(config.compile.solver.as_deref(), Some("")) {
        return Err(ConfigError::ValidationError(
            "compile.solver must not be empty".to_string(),
        ));
    }
    Ok(())
}
