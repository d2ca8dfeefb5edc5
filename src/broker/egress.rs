//! Poll endpoint: hand the next held webhook to a long-polling consumer.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{debug, error, info};

use super::error::BrokerError;
use super::session::Session;
use super::Broker;
use crate::http::response::delivery_headers;
use crate::observability::metrics;
use crate::transfer::BoundedStream;

/// `GET <hostname><poll_path><secret>`
pub async fn handle_poll(
    State(broker): State<Arc<Broker>>,
    ConnectInfo(consumer): ConnectInfo<SocketAddr>,
) -> Response {
    broker.egress(consumer).await
}

/// Logs a poll that ended because the consumer went away.
struct PollWatch {
    consumer: SocketAddr,
    armed: bool,
}

impl Drop for PollWatch {
    fn drop(&mut self) {
        if self.armed {
            info!(peer = %self.consumer, "Poll client disconnected while waiting for a web hook");
            metrics::record_poll("disconnected");
        }
    }
}

impl Broker {
    /// Wait up to one long-poll period for a deliverable session.
    ///
    /// Each call yields at most one delivery. If the consumer disconnects the
    /// future is dropped while parked on the queue and nothing is consumed.
    pub async fn egress(&self, consumer: SocketAddr) -> Response {
        info!(peer = %consumer, "Poll client connected, waiting for a web hook");
        let mut watch = PollWatch {
            consumer,
            armed: true,
        };

        let next = tokio::time::timeout(self.settings.long_poll_wait, self.next_deliverable()).await;
        watch.armed = false;

        match next {
            Ok(Some((session, request))) => self.deliver(session, request),
            Ok(None) | Err(_) => {
                info!(
                    peer = %consumer,
                    wait_ms = self.settings.long_poll_wait.as_millis() as u64,
                    "No web hook waiting after long-poll wait"
                );
                metrics::record_poll("empty");
                StatusCode::NO_CONTENT.into_response()
            }
        }
    }

    /// Pop sessions until one still has a caller waiting and a request to give.
    async fn next_deliverable(&self) -> Option<(Arc<Session>, Request<Body>)> {
        loop {
            let session = self.queue.pop().await?;
            if session.is_abandoned() {
                debug!(session_id = %session.id(), "Discarding queued web hook, caller already left");
                metrics::record_poll("discarded");
                continue;
            }
            if let Some(request) = session.take_request() {
                return Some((session, request));
            }
        }
    }

    fn deliver(&self, session: Arc<Session>, request: Request<Body>) -> Response {
        let id = session.id();
        let delay = session.started_at().elapsed().as_secs_f64();
        info!(session_id = %id, "Proxying payload from web hook caller to poll client");
        info!(session_id = %id, latency_secs = delay, "Proxying pickup latency");
        metrics::record_pickup_latency(delay);
        metrics::record_poll("delivered");
        self.stats.delivered();

        let (parts, body) = request.into_parts();
        let headers = delivery_headers(id, &parts.headers, session.peer(), delay);

        let copy = BoundedStream::new(body.into_data_stream(), self.settings.max_payload)
            .on_finish(move |outcome| match outcome {
                Ok(written) => {
                    info!(session_id = %id, bytes = written, "Proxied web hook body to poll client");
                    metrics::record_bytes("webhook", *written);
                }
                Err(err) => {
                    error!(session_id = %id, error = %err, "Error proxying web hook body to poll client");
                    if !session.is_detached() {
                        session.fail(BrokerError::DeliveryFailed(err.to_string()));
                    }
                }
            });

        (StatusCode::OK, headers, Body::from_stream(copy)).into_response()
    }
}
