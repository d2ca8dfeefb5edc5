//! Host matching for host-scoped endpoints.
//!
//! # Responsibilities
//! - Match the Host header (exact match, case-insensitive)
//! - Ignore the port so `hooks.example.com:8443` still matches
//!
//! # Design Decisions
//! - Host matching is case-insensitive (RFC 9110)
//! - A request without a Host header never matches a configured host

use axum::http::header::HOST;
use axum::http::HeaderMap;

/// Matches the Host header against the configured broker hostname.
#[derive(Debug, Clone)]
pub struct HostMatcher {
    expected_host: String,
}

impl HostMatcher {
    /// Create a new host matcher.
    /// The host is normalized to lowercase for case-insensitive matching.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            expected_host: host.into().to_lowercase(),
        }
    }

    /// `None` for an empty hostname, i.e. any host is accepted.
    pub fn from_hostname(hostname: &str) -> Option<Self> {
        let trimmed = hostname.trim();
        (!trimmed.is_empty()).then(|| Self::new(trimmed))
    }

    pub fn matches(&self, headers: &HeaderMap) -> bool {
        headers
            .get(HOST)
            .and_then(|h| h.to_str().ok())
            .map(|h| strip_port(h).eq_ignore_ascii_case(&self.expected_host))
            .unwrap_or(false)
    }
}

fn strip_port(host: &str) -> &str {
    // Bracketed IPv6 literal: "[::1]:8080"
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn host(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_host_matcher() {
        let matcher = HostMatcher::new("hooks.example.com");

        assert!(matcher.matches(&host("hooks.example.com")));
        assert!(matcher.matches(&host("HOOKS.EXAMPLE.COM"))); // Case insensitive
        assert!(matcher.matches(&host("hooks.example.com:8443")));
        assert!(!matcher.matches(&host("other.com")));
        assert!(!matcher.matches(&HeaderMap::new()));
    }

    #[test]
    fn ipv6_literal_host() {
        let matcher = HostMatcher::new("::1");
        assert!(matcher.matches(&host("[::1]:8080")));
    }

    #[test]
    fn empty_hostname_disables_matching() {
        assert!(HostMatcher::from_hostname("  ").is_none());
        assert!(HostMatcher::from_hostname("hooks.example.com").is_some());
    }
}
