//! Configuration subsystem.
//!
//! # Responsibilities
//! - Define the typed configuration schema
//! - Load config from a TOML file and environment variables
//! - Validate before the config is accepted into the system

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ListenerConfig, ProxyConfig, RewriteConfig, RewriteRuleConfig, TimeoutConfig, UpstreamConfig,
};
