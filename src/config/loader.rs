//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration from an optional TOML file, apply environment
/// overrides, and validate the result.
pub fn load_config(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => ProxyConfig::default(),
    };

    apply_env_overrides(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Recognized environment variables:
/// - `TARGET_URL`: absolute URL of the upstream origin
/// - `DEBUG`: enable verbose debug output
/// - `IGNORE_COMPATIBILITY_CHECKS`: skip startup self-checks
fn apply_env_overrides(config: &mut ProxyConfig) {
    if let Ok(target) = std::env::var("TARGET_URL") {
        if !target.is_empty() {
            config.upstream.target_url = target;
        }
    }
    if let Ok(debug) = std::env::var("DEBUG") {
        config.debug = env_truthy(&debug);
    }
    if let Ok(ignore) = std::env::var("IGNORE_COMPATIBILITY_CHECKS") {
        config.ignore_compatibility_checks = env_truthy(&ignore);
    }
}

/// Any non-empty value other than "0" and "false" counts as enabled.
fn env_truthy(value: &str) -> bool {
    !value.is_empty() && value != "0" && !value.eq_ignore_ascii_case("false")
}
