//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the broker.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the webhook proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Session matching, queueing and payload limits.
    pub broker: BrokerConfig,

    /// Network allow lists per endpoint group.
    pub filtering: FilteringConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Broker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Host the endpoints answer for. Empty = any host.
    pub hostname: String,

    /// Shared secret appended to every endpoint path.
    pub secret: String,

    /// Webhook endpoint path, before the secret.
    pub webhook_path: String,

    /// Poll endpoint path, before the secret.
    pub poll_path: String,

    /// Reply endpoint path, before the secret.
    pub reply_path: String,

    /// Delivery queue capacity (backpressure on webhook callers).
    pub backlog: usize,

    /// Pending sessions allowed before webhook calls are turned away.
    pub max_pending: usize,

    /// Longest any single wait may last, in milliseconds.
    pub long_poll_wait_ms: u64,

    /// Body size ceiling for both directions, in bytes.
    pub max_payload_bytes: u64,

    /// Status sent to webhook callers on overload, error and timeout.
    pub try_later_status: u16,

    /// Answer webhook callers immediately with an empty 200.
    pub autoreply: bool,

    /// Include diagnostic text in try-later responses.
    pub show_debug_info: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            secret: String::new(),
            webhook_path: "/webhook/".to_string(),
            poll_path: "/poll/".to_string(),
            reply_path: "/reply".to_string(),
            backlog: 100,
            max_pending: 50,
            long_poll_wait_ms: 30_000,
            max_payload_bytes: 1024 * 1024, // 1MB
            try_later_status: 503,
            autoreply: false,
            show_debug_info: false,
        }
    }
}

/// Network filtering configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilteringConfig {
    /// Master switch. When false every caller is admitted.
    pub enabled: bool,

    /// CIDR ranges allowed to call the webhook endpoint.
    pub webhook_allow: Vec<String>,

    /// CIDR ranges allowed to call the poll and reply endpoints.
    pub poll_reply_allow: Vec<String>,
}

fn loopback_ranges() -> Vec<String> {
    vec!["127.0.0.0/8".to_string(), "::1/128".to_string()]
}

impl Default for FilteringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            webhook_allow: loopback_ranges(),
            poll_reply_allow: loopback_ranges(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Placeholder admin key that validation refuses when admin is enabled.
pub const ADMIN_KEY_PLACEHOLDER: &str = "CHANGE_ME_IN_PRODUCTION";

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: ADMIN_KEY_PLACEHOLDER.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
