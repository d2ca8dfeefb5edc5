//! Access Control Middleware.
//! Admits callers by peer address against a configured allow list.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::network::IpNetwork;
use crate::observability::metrics;

/// Body of the 403 answer.
pub const FORBIDDEN_MESSAGE: &str = "IP not in allow list";

/// State required for access control.
#[derive(Clone, Debug)]
pub struct AllowList {
    /// Endpoint group name, for logs.
    pub scope: &'static str,
    /// When false every caller is admitted.
    pub enabled: bool,
    networks: Arc<[IpNetwork]>,
}

impl AllowList {
    pub fn new(scope: &'static str, enabled: bool, networks: Vec<IpNetwork>) -> Self {
        Self {
            scope,
            enabled,
            networks: networks.into(),
        }
    }

    /// Build from configured CIDR strings. Unparseable entries are skipped
    /// (and logged), which only ever narrows the list.
    pub fn from_ranges(scope: &'static str, enabled: bool, ranges: &[String]) -> Self {
        let networks = ranges
            .iter()
            .filter_map(|range| match range.parse::<IpNetwork>() {
                Ok(network) => Some(network),
                Err(err) => {
                    tracing::error!(scope, error = %err, "Ignoring allow list entry");
                    None
                }
            })
            .collect();
        Self::new(scope, enabled, networks)
    }

    /// Filtering disabled admits everyone; an empty enabled list admits no one.
    pub fn allows(&self, ip: IpAddr) -> bool {
        !self.enabled || self.networks.iter().any(|network| network.contains(ip))
    }

    pub fn networks(&self) -> &[IpNetwork] {
        &self.networks
    }
}

pub async fn allow_list_middleware(
    State(list): State<AllowList>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if list.allows(peer.ip()) {
        return next.run(request).await;
    }

    tracing::warn!(
        scope = list.scope,
        peer = %peer,
        uri = %request.uri(),
        "Caller not in allow list"
    );
    metrics::record_forbidden(list.scope);
    (StatusCode::FORBIDDEN, FORBIDDEN_MESSAGE).into_response()
}
