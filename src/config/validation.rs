//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the origin URL is a well-formed absolute http(s) URL
//! - Check substitution patterns compile
//! - Validate value ranges (timeouts > 0, bind address parses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::ProxyConfig;

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate the full configuration, collecting every error.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError {
            field: "listener.bind_address".to_string(),
            message: format!("'{}' is not a valid socket address", config.listener.bind_address),
        });
    }

    match Url::parse(&config.upstream.target_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => {
            errors.push(ValidationError {
                field: "upstream.target_url".to_string(),
                message: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        Err(e) => {
            errors.push(ValidationError {
                field: "upstream.target_url".to_string(),
                message: format!("'{}' is invalid: {}", config.upstream.target_url, e),
            });
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError {
            field: "timeouts.request_secs".to_string(),
            message: "must be greater than zero".to_string(),
        });
    }

    for (i, rule) in config.rewrite.rules.iter().enumerate() {
        if let Err(e) = regex::Regex::new(&rule.pattern) {
            errors.push(ValidationError {
                field: format!("rewrite.rules[{}].pattern", i),
                message: format!("does not compile: {}", e),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = "not-an-address".to_string();
        config.upstream.target_url = "::::".to_string();
        config.timeouts.request_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let mut config = ProxyConfig::default();
        config.upstream.target_url = "ftp://example.com".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "upstream.target_url");
    }

    #[test]
    fn test_rejects_bad_pattern() {
        let mut config = ProxyConfig::default();
        config.rewrite.rules[0].pattern = "(".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].field.starts_with("rewrite.rules[0]"));
    }
}
