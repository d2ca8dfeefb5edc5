//! Response construction shared by the broker endpoints.
//!
//! # Responsibilities
//! - Build the try-later answer, with diagnostic text only in debug mode
//! - Re-emit held webhook headers on the poll response
//!
//! # Design Decisions
//! - Original headers are namespaced under `x-whheader-` so they can't
//!   collide with the poll response's own headers
//! - `Content-Type` and `Content-Encoding` pass through unprefixed so the
//!   consumer can decode the body

use std::fmt::Display;
use std::net::SocketAddr;

use axum::http::header::{CONTENT_ENCODING, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::broker::SessionId;

/// Correlation id the consumer must echo back in `X-InReplyTo`.
pub const X_REPLY_ID: &str = "x-replyid";
/// Address of the webhook caller that sent the delivery, not of the poll
/// consumer receiving it.
pub const X_WH_FROM: &str = "x-whfrom";
/// Seconds between the webhook arriving and the consumer picking it up.
pub const X_WH_DELAY_SECS: &str = "x-whdelaysecs";
/// Prefix for re-emitted webhook headers.
pub const FORWARDED_HEADER_PREFIX: &str = "x-whheader-";

/// Status-only response, or status plus `detail` when debug info is enabled.
pub fn try_later(status: StatusCode, show_debug_info: bool, detail: &dyn Display) -> Response {
    if show_debug_info {
        (status, detail.to_string()).into_response()
    } else {
        status.into_response()
    }
}

/// Headers describing a delivery to a poll consumer.
pub fn delivery_headers(
    id: SessionId,
    original: &HeaderMap,
    origin: SocketAddr,
    delay_secs: f64,
) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(original.len() + 3);

    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        headers.insert(X_REPLY_ID, value);
    }

    for (name, value) in original {
        if name == CONTENT_TYPE || name == CONTENT_ENCODING {
            headers.append(name.clone(), value.clone());
            continue;
        }
        let prefixed = format!("{FORWARDED_HEADER_PREFIX}{}", name.as_str());
        match HeaderName::from_bytes(prefixed.as_bytes()) {
            Ok(forwarded) => {
                headers.append(forwarded, value.clone());
            }
            Err(_) => tracing::warn!(header = %name, "Skipping header that cannot be re-emitted"),
        }
    }

    if let Ok(value) = HeaderValue::from_str(&origin.to_string()) {
        headers.insert(X_WH_FROM, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("{delay_secs:.5}")) {
        headers.insert(X_WH_DELAY_SECS, value);
    }

    headers
}
