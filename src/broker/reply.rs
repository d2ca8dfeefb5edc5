//! Reply endpoint: route a consumer's reply to the held webhook call.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{info, warn};

use super::session::{Reply, ReplyRejected, SessionId, SESSION_ID_LEN};
use super::Broker;
use crate::http::request::X_IN_REPLY_TO;
use crate::observability::metrics;

/// `POST <hostname><reply_path><secret>`
pub async fn handle_reply(
    State(broker): State<Arc<Broker>>,
    ConnectInfo(consumer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    broker.reply(consumer, request).await
}

/// Ways a reply call can fail. Always answered with diagnostic text.
#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    #[error("Bad Request: Non-empty X-InReplyTo HTTP header required")]
    MissingCorrelation,

    #[error("Bad Request: Incorrect length X-InReplyTo HTTP header received")]
    MalformedCorrelation { length: usize },

    #[error("Bad Request: {0} X-InReplyTo not found")]
    UnknownSession(String),

    #[error("Bad Request: {0} reply already received")]
    AlreadyAnswered(String),

    #[error("Unable to send reply successfully")]
    DeliveryFailed,
}

impl ReplyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ReplyError::DeliveryFailed => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn outcome(&self) -> &'static str {
        match self {
            ReplyError::MissingCorrelation => "missing_header",
            ReplyError::MalformedCorrelation { .. } => "malformed_header",
            ReplyError::UnknownSession(_) => "unknown_session",
            ReplyError::AlreadyAnswered(_) => "duplicate",
            ReplyError::DeliveryFailed => "delivery_failed",
        }
    }
}

impl IntoResponse for ReplyError {
    fn into_response(self) -> Response {
        metrics::record_reply(self.outcome());
        (self.status(), self.to_string()).into_response()
    }
}

impl Broker {
    /// Deliver a reply and wait until the webhook caller has it.
    pub async fn reply(&self, consumer: SocketAddr, request: Request<Body>) -> Response {
        info!(peer = %consumer, "Call received to reply endpoint");
        match self.route_reply(consumer, request).await {
            Ok(()) => {
                metrics::record_reply("delivered");
                self.stats.reply_delivered();
                StatusCode::OK.into_response()
            }
            Err(err) => err.into_response(),
        }
    }

    async fn route_reply(&self, consumer: SocketAddr, request: Request<Body>) -> Result<(), ReplyError> {
        let reply_to = correlation_id(consumer, &request)?;

        info!(reply_to = %reply_to, "Looking up X-InReplyTo key");
        let session = SessionId::parse(&reply_to)
            .and_then(|id| self.registry.get(&id))
            .ok_or_else(|| {
                warn!(
                    reply_to = %reply_to,
                    peer = %consumer,
                    "X-InReplyTo not found, web hook caller may have left already"
                );
                ReplyError::UnknownSession(reply_to.clone())
            })?;

        let (reply, completion) = Reply::new(request.into_body());
        match session.send_reply(reply) {
            Ok(()) => {}
            Err(ReplyRejected::AlreadyAnswered) => {
                warn!(session_id = %session.id(), "Duplicate reply rejected");
                return Err(ReplyError::AlreadyAnswered(reply_to));
            }
            Err(ReplyRejected::CallerGone) => {
                warn!(session_id = %session.id(), "Web hook caller stopped waiting before the reply arrived");
                return Err(ReplyError::UnknownSession(reply_to));
            }
        }

        match tokio::time::timeout(self.settings.long_poll_wait, completion).await {
            Ok(Ok(true)) => Ok(()),
            Ok(Ok(false)) | Ok(Err(_)) => Err(ReplyError::DeliveryFailed),
            Err(_) => {
                warn!(session_id = %session.id(), "Timed out waiting for reply completion");
                Err(ReplyError::DeliveryFailed)
            }
        }
    }
}

/// Pull the correlation id out of the request, with the cheap format checks.
fn correlation_id(consumer: SocketAddr, request: &Request<Body>) -> Result<String, ReplyError> {
    let raw = request
        .headers()
        .get(X_IN_REPLY_TO)
        .map(|value| value.as_bytes())
        .unwrap_or_default();

    if raw.is_empty() {
        warn!(peer = %consumer, "Missing/empty X-InReplyTo header received");
        return Err(ReplyError::MissingCorrelation);
    }
    if raw.len() != SESSION_ID_LEN {
        warn!(peer = %consumer, length = raw.len(), "Incorrect length X-InReplyTo header received");
        return Err(ReplyError::MalformedCorrelation { length: raw.len() });
    }

    Ok(String::from_utf8_lossy(raw).into_owned())
}
