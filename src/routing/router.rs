//! Endpoint paths and host scoping.
//!
//! # Responsibilities
//! - Derive the webhook, poll and reply paths from configuration
//! - Reject requests addressed to a different host
//!
//! # Design Decisions
//! - Paths are computed once at startup and never change
//! - The shared secret is a path suffix, so a wrong secret is a plain 404
//! - Host mismatch is also a 404, indistinguishable from a missing route

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::matcher::HostMatcher;
use crate::config::BrokerConfig;

/// Concrete paths of the three broker endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointPaths {
    pub webhook: String,
    pub poll: String,
    pub reply: String,
}

impl EndpointPaths {
    pub fn from_config(config: &BrokerConfig) -> Self {
        Self {
            webhook: format!("{}{}", config.webhook_path, config.secret),
            poll: format!("{}{}", config.poll_path, config.secret),
            reply: format!("{}{}", config.reply_path, config.secret),
        }
    }
}

/// Middleware answering 404 unless the Host header matches.
pub async fn host_guard(
    State(matcher): State<Arc<HostMatcher>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if matcher.matches(request.headers()) {
        next.run(request).await
    } else {
        tracing::debug!(uri = %request.uri(), "Host did not match broker hostname");
        StatusCode::NOT_FOUND.into_response()
    }
}
