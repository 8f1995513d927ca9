//! Configuration validation.
//!
//! Semantic checks on top of what serde guarantees syntactically. Pure
//! function over `ProxyConfig`; collects every problem instead of stopping
//! at the first.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    /// What is wrong with it.
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, returning all errors found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError {
            field: "listener.bind_address",
            message: format!("not a socket address: {:?}", config.listener.bind_address),
        });
    }

    let proxyme = &config.routing.proxyme_hostname;
    if proxyme.is_empty() {
        errors.push(ValidationError {
            field: "routing.proxyme_hostname",
            message: "must not be empty".to_string(),
        });
    } else if proxyme.contains(':') || proxyme.contains('/') {
        errors.push(ValidationError {
            field: "routing.proxyme_hostname",
            message: format!("must be a bare hostname, got {:?}", proxyme),
        });
    }

    if config.routing.blacklist_prefixes.iter().any(|p| p.is_empty()) {
        errors.push(ValidationError {
            field: "routing.blacklist_prefixes",
            message: "an empty prefix would match every URL".to_string(),
        });
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError {
            field: "timeouts.request_secs",
            message: "must be greater than zero".to_string(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError {
            field: "observability.metrics_address",
            message: format!(
                "not a socket address: {:?}",
                config.observability.metrics_address
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
