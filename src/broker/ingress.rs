//! Webhook endpoint: hold the caller until a reply comes back.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::Request;
use axum::response::Response;
use tracing::{error, info, warn};

use super::error::BrokerError;
use super::session::{Reply, Session, SessionId, SessionWaiter};
use super::Broker;
use crate::observability::metrics;
use crate::transfer::{collect_max, BoundedStream};

/// `POST <hostname><webhook_path><secret>`
pub async fn handle_webhook(
    State(broker): State<Arc<Broker>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    broker.ingress(peer, request).await
}

impl Broker {
    /// Admit a webhook call, queue it for a poll consumer and wait for the reply.
    pub async fn ingress(&self, peer: SocketAddr, request: Request<Body>) -> Response {
        info!(peer = %peer, uri = %request.uri(), "Web hook call received");
        self.stats.webhook_received();

        let (session, waiter) = Session::new(peer, request);
        let id = session.id();
        let _registration = self.registry.register(Arc::clone(&session));

        let pending = self.registry.len();
        if pending > self.settings.max_pending {
            warn!(
                session_id = %id,
                pending,
                max_pending = self.settings.max_pending,
                "Too many pending web hook calls, rejecting"
            );
            return self.reject(id, BrokerError::Overloaded);
        }
        info!(session_id = %id, "Web hook call assigned session id");

        if self.settings.autoreply {
            if let Err(err) = self.buffer_for_autoreply(&session).await {
                return self.reject(id, err);
            }
        }

        if let Err(err) = self
            .queue
            .push(Arc::clone(&session), self.settings.long_poll_wait)
            .await
        {
            return self.reject(id, err);
        }
        info!(session_id = %id, "Web hook call added to incoming queue, waiting for reply");

        if self.settings.autoreply {
            // The queued copy is still delivered; the caller is answered now.
            if session.send_reply(Reply::detached(Body::empty())).is_err() {
                warn!(session_id = %id, "Autoreply could not be handed to the session");
            }
        }

        self.await_reply(id, waiter).await
    }

    async fn await_reply(&self, id: SessionId, waiter: SessionWaiter) -> Response {
        let SessionWaiter { reply_rx, error_rx } = waiter;

        tokio::select! {
            Ok(reply) = reply_rx => {
                info!(session_id = %id, "Reply received, copying body");
                self.stream_reply(id, reply)
            }
            Ok(err) = error_rx => {
                error!(session_id = %id, error = %err, "Error during processing");
                self.reject(id, err)
            }
            _ = tokio::time::sleep(self.settings.long_poll_wait) => {
                info!(session_id = %id, "Timed out waiting for reply to return to web hook caller");
                self.reject(id, BrokerError::Timeout)
            }
        }
    }

    /// Stream the reply body to the webhook caller under the payload ceiling.
    ///
    /// The status line is already committed when the copy runs, so a failed
    /// copy ends the stream with an error and hyper aborts the connection.
    fn stream_reply(&self, id: SessionId, reply: Reply) -> Response {
        let Reply { body, completion } = reply;
        let copy = BoundedStream::new(body.into_data_stream(), self.settings.max_payload)
            .on_finish(move |outcome| {
                let ok = match outcome {
                    Ok(written) => {
                        info!(session_id = %id, bytes = written, "Completed reply to web hook caller");
                        metrics::record_bytes("reply", *written);
                        metrics::record_webhook("replied");
                        true
                    }
                    Err(err) => {
                        error!(session_id = %id, error = %err, "Error copying reply body to web hook caller");
                        metrics::record_webhook("reply_failed");
                        false
                    }
                };
                if let Some(completion) = completion {
                    let _ = completion.send(ok);
                }
            });

        Response::new(Body::from_stream(copy))
    }

    /// Read the whole webhook body up front so it survives the caller leaving.
    async fn buffer_for_autoreply(&self, session: &Session) -> Result<(), BrokerError> {
        let Some(request) = session.take_request() else {
            return Ok(());
        };
        let (parts, body) = request.into_parts();
        let bytes = collect_max(body.into_data_stream(), self.settings.max_payload).await?;
        session.restore_request(Request::from_parts(parts, Body::from(bytes)));
        session.detach();
        Ok(())
    }

    fn reject(&self, id: SessionId, err: BrokerError) -> Response {
        metrics::record_webhook(err.outcome());
        self.stats.try_later_sent();
        let response = self.try_later(&err);
        info!(
            session_id = %id,
            status = response.status().as_u16(),
            reason = err.outcome(),
            "Sent try-later status to web hook caller"
        );
        response
    }
}
