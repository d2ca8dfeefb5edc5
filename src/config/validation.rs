//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (backlog, wait, status code)
//! - Check that paths and secrets can be routed
//! - Check that every allow-list entry is a network range
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::config::schema::{ProxyConfig, ADMIN_KEY_PLACEHOLDER};
use crate::routing::EndpointPaths;
use crate::security::IpNetwork;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `broker.backlog`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn is_url_safe(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'))
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let broker = &config.broker;

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::new("listener.bind_address", "must be ip:port"));
    }
    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.is_empty() || tls.key_path.is_empty() {
            errors.push(ValidationError::new("listener.tls", "cert_path and key_path are required"));
        }
    }

    if broker.backlog == 0 {
        errors.push(ValidationError::new("broker.backlog", "must be at least 1"));
    }
    if broker.max_pending == 0 {
        errors.push(ValidationError::new("broker.max_pending", "must be at least 1"));
    }
    if broker.long_poll_wait_ms == 0 {
        errors.push(ValidationError::new("broker.long_poll_wait_ms", "must be greater than 0"));
    }
    if !(400..=599).contains(&broker.try_later_status) {
        errors.push(ValidationError::new(
            "broker.try_later_status",
            "must be a 4xx or 5xx status code",
        ));
    }
    if !is_url_safe(&broker.secret) {
        errors.push(ValidationError::new(
            "broker.secret",
            "may only contain letters, digits, '-', '_', '.' and '~'",
        ));
    }
    if !is_url_safe(&broker.hostname.replace(':', "")) {
        errors.push(ValidationError::new("broker.hostname", "is not a valid host name"));
    }

    for (field, path) in [
        ("broker.webhook_path", &broker.webhook_path),
        ("broker.poll_path", &broker.poll_path),
        ("broker.reply_path", &broker.reply_path),
    ] {
        if !path.starts_with('/') {
            errors.push(ValidationError::new(field, "must start with '/'"));
        } else if path.contains(['{', '}', '*']) {
            errors.push(ValidationError::new(field, "must not contain route wildcards"));
        }
    }

    let paths = EndpointPaths::from_config(broker);
    if paths.webhook == paths.poll || paths.webhook == paths.reply || paths.poll == paths.reply {
        errors.push(ValidationError::new("broker", "endpoint paths must be distinct"));
    }

    for (field, ranges) in [
        ("filtering.webhook_allow", &config.filtering.webhook_allow),
        ("filtering.poll_reply_allow", &config.filtering.poll_reply_allow),
    ] {
        for range in ranges {
            if let Err(err) = range.parse::<IpNetwork>() {
                errors.push(ValidationError::new(field, err.to_string()));
            }
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new("observability.metrics_address", "must be ip:port"));
    }

    if config.admin.enabled {
        if config.admin.api_key.is_empty() || config.admin.api_key == ADMIN_KEY_PLACEHOLDER {
            errors.push(ValidationError::new("admin.api_key", "must be set when admin is enabled"));
        }
        if config.admin.bind_address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(ValidationError::new("admin.bind_address", "must be ip:port"));
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

    fn fields(errors: &[ValidationError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&ProxyConfig::default()), Ok(()));
    }

    #[test]
    fn reports_every_error() {
        let mut config = ProxyConfig::default();
        config.broker.backlog = 0;
        config.broker.long_poll_wait_ms = 0;
        config.broker.try_later_status = 200;
        config.broker.secret = "a/b".into();
        config.filtering.webhook_allow.push("10.0.0.0/99".into());

        let errors = validate_config(&config).unwrap_err();
        let fields = fields(&errors);
        assert!(fields.contains(&"broker.backlog"));
        assert!(fields.contains(&"broker.long_poll_wait_ms"));
        assert!(fields.contains(&"broker.try_later_status"));
        assert!(fields.contains(&"broker.secret"));
        assert!(fields.contains(&"filtering.webhook_allow"));
    }

    #[test]
    fn colliding_paths_are_rejected() {
        let mut config = ProxyConfig::default();
        config.broker.poll_path = config.broker.webhook_path.clone();
        let errors = validate_config(&config).unwrap_err();
        assert!(fields(&errors).contains(&"broker"));
    }

    #[test]
    fn admin_requires_real_key() {
        let mut config = ProxyConfig::default();
        config.admin.enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert!(fields(&errors).contains(&"admin.api_key"));

        config.admin.api_key = "k3y".into();
        assert!(validate_config(&config).is_ok());
    }
}
