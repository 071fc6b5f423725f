//! Configuration validation
//!
//! This module provides validation logic for configuration files.

use crate::config::types::{Config, WatchConfig};
use crate::error::{ConfigError, ConfigResult};
use globset::Glob;

/// Validate a complete configuration
pub fn validate_config(config: &Config) -> ConfigResult<()> {
    if config.tasks_path.is_none() {
        return Err(ConfigError::MissingTasksPath);
    }

    if let Some(interpreter) = &config.interpreter {
        if interpreter.is_empty() || interpreter[0].trim().is_empty() {
            return Err(ConfigError::Invalid(
                "interpreter must name a program".to_string(),
            ));
        }
    }

    if let Some(name) = &config.name {
        if name.trim().is_empty() {
            return Err(ConfigError::Invalid("name must not be empty".to_string()));
        }
    }

    validate_watch(&config.watch)
}

/// Validate the watch section
fn validate_watch(watch: &WatchConfig) -> ConfigResult<()> {
    if watch.interval == Some(0) {
        return Err(ConfigError::Invalid(
            "watch.interval must be greater than zero".to_string(),
        ));
    }

    for pattern in watch.ignored.iter().flatten() {
        Glob::new(pattern).map_err(|e| {
            ConfigError::Invalid(format!("Invalid watch.ignored pattern '{}': {}", pattern, e))
        })?;
    }

    Ok(())
}
