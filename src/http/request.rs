//! Request-side conventions.
//!
//! # Responsibilities
//! - Name the correlation header consumers send on replies
//! - Stamp every request with an `x-request-id` for log correlation
//!
//! # Design Decisions
//! - Request ID added as early as possible so the trace span carries it
//! - An incoming `x-request-id` is kept, not overwritten

use axum::http::Request;
use tower_http::request_id::{
    MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};

/// Header carrying the correlation id on a reply call.
pub const X_IN_REPLY_TO: &str = "x-inreplyto";

/// Header carrying the per-request id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Layer assigning a UUID request id when the client sent none.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

/// Layer copying the request id onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

/// Request id of `request`, or `"unknown"`.
pub fn request_id<B>(request: &Request<B>) -> String {
    request
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}
