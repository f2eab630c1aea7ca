//! # Configuration Loader
//!
//! ## Responsibilities
//!
//! - Read the TOML configuration file
//! - Parse it into the [`AppConfig`] DTO
//! - Report I/O and parse errors with context
//!
//! ## Prohibited
//!
//! - No validation logic
//! - No default values (see `AppConfig::with_defaults`)

use std::path::Path;

use anyhow::Context;

use ag_core::config::AppConfig;

/// Loads configuration from a TOML file, accepting whatever it contains.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid TOML.
pub fn load_config(config_path: &Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
    let toml_value: toml::Value =
        toml::from_str(&content).context("Failed to parse config as TOML")?;
    AppConfig::from_toml(&toml_value)
}
