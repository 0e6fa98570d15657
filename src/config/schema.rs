//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.
//! The loaded value is immutable for the process lifetime and shared with
//! the pipeline via `Arc`.

use serde::{Deserialize, Serialize};

/// Root configuration for the rewriting proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, body limits).
    pub listener: ListenerConfig,

    /// Upstream origin configuration.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Word substitution rules applied to HTML leaf text.
    pub rewrite: RewriteConfig,

    /// Enable debug mode for every request. A `Proxy-Debug` request header
    /// enables it for a single request regardless of this flag.
    pub debug: bool,

    /// Skip the startup compatibility self-checks.
    pub ignore_compatibility_checks: bool,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum inbound body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Upstream origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Absolute base URL of the single origin every request is forwarded to.
    /// Overridden by the `TARGET_URL` environment variable.
    pub target_url: String,

    /// Maximum number of redirects to follow before giving up.
    pub max_redirects: u32,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            target_url: "https://news.ycombinator.com".to_string(),
            max_redirects: 10,
        }
    }
}

/// Timeout configuration for the outbound leg.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Total outbound request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Substitution rules applied to HTML leaf text nodes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Ordered (pattern, replacement) pairs. Patterns use regex syntax,
    /// replacements may reference capture groups (`$1`).
    pub rules: Vec<RewriteRuleConfig>,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            rules: vec![RewriteRuleConfig {
                pattern: r"(?i)(\w{6,})".to_string(),
                replacement: "${1}\u{2122}".to_string(),
            }],
        }
    }
}

/// A single pattern/replacement pair.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RewriteRuleConfig {
    pub pattern: String,
    pub replacement: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_decorate_long_words() {
        let config = ProxyConfig::default();
        assert_eq!(config.rewrite.rules.len(), 1);
        assert_eq!(config.rewrite.rules[0].pattern, r"(?i)(\w{6,})");
        assert_eq!(config.rewrite.rules[0].replacement, "${1}™");
    }

    #[test]
    fn test_empty_toml_parses_to_defaults() {
        let config: ProxyConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.upstream.max_redirects, 10);
        assert!(!config.debug);
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config: ProxyConfig = toml::from_str(
            r#"
            debug = true

            [upstream]
            target_url = "http://localhost:9000"
            "#,
        )
        .unwrap();
        assert!(config.debug);
        assert_eq!(config.upstream.target_url, "http://localhost:9000");
        assert_eq!(config.timeouts.request_secs, 30);
    }
}
