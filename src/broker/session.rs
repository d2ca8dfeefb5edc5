//! One webhook transaction and its one-shot hand-off points.
//!
//! # Responsibilities
//! - Own the held webhook request until exactly one poll consumer takes it
//! - Carry the reply from the reply endpoint to the waiting webhook task
//! - Carry delivery failures from the poll side to the webhook task
//!
//! # Design Decisions
//! - Every channel is a `tokio::sync::oneshot`: one value, never blocks the sender
//! - Senders live behind a mutex in the shared `Session`; taking them out
//!   enforces the single send
//! - Receivers belong to the webhook task (`SessionWaiter`); once it stops
//!   waiting the session is dead and late sends fail fast

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use axum::body::Body;
use axum::http::Request;
use tokio::sync::oneshot;
use uuid::Uuid;

use super::error::BrokerError;

/// Length of a rendered session id (hyphenated UUID).
pub const SESSION_ID_LEN: usize = 36;

/// Correlation id of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse the rendered form. Anything that is not a UUID yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw).ok().map(Self)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// A reply on its way from the reply endpoint to the webhook caller.
pub struct Reply {
    pub body: Body,
    /// Told whether the body reached the webhook caller in full.
    pub completion: Option<oneshot::Sender<bool>>,
}

impl Reply {
    /// A reply whose sender waits for the completion flag.
    pub fn new(body: Body) -> (Self, oneshot::Receiver<bool>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                body,
                completion: Some(tx),
            },
            rx,
        )
    }

    /// A synthesized reply nobody waits on.
    pub fn detached(body: Body) -> Self {
        Self {
            body,
            completion: None,
        }
    }
}

/// Why a reply could not be handed to its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyRejected {
    /// The session already received a reply.
    AlreadyAnswered,
    /// The webhook task stopped waiting.
    CallerGone,
}

/// Shared state of one webhook transaction.
pub struct Session {
    id: SessionId,
    peer: SocketAddr,
    started_at: Instant,
    detached: AtomicBool,
    request: Mutex<Option<Request<Body>>>,
    reply_tx: Mutex<Option<oneshot::Sender<Reply>>>,
    error_tx: Mutex<Option<oneshot::Sender<BrokerError>>>,
}

/// The webhook task's ends of the session channels.
pub struct SessionWaiter {
    pub reply_rx: oneshot::Receiver<Reply>,
    pub error_rx: oneshot::Receiver<BrokerError>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Session {
    /// Create a session for a webhook request received from `peer`.
    pub fn new(peer: SocketAddr, request: Request<Body>) -> (Arc<Self>, SessionWaiter) {
        let (reply_tx, reply_rx) = oneshot::channel();
        let (error_tx, error_rx) = oneshot::channel();

        let session = Arc::new(Self {
            id: SessionId::new(),
            peer,
            started_at: Instant::now(),
            detached: AtomicBool::new(false),
            request: Mutex::new(Some(request)),
            reply_tx: Mutex::new(Some(reply_tx)),
            error_tx: Mutex::new(Some(error_tx)),
        });

        (session, SessionWaiter { reply_rx, error_rx })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Address of the webhook caller.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Take the held request. Returns `None` once it was handed out.
    pub fn take_request(&self) -> Option<Request<Body>> {
        lock(&self.request).take()
    }

    /// Put a (re-buffered) request back before the session is queued.
    pub fn restore_request(&self, request: Request<Body>) {
        *lock(&self.request) = Some(request);
    }

    /// Mark the session as delivered regardless of the webhook task.
    pub fn detach(&self) {
        self.detached.store(true, Ordering::Release);
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    /// True when nobody would receive a reply for this session any more.
    pub fn is_abandoned(&self) -> bool {
        if self.is_detached() {
            return false;
        }
        lock(&self.reply_tx)
            .as_ref()
            .map_or(true, |tx| tx.is_closed())
    }

    /// Hand a reply to the waiting webhook task.
    pub fn send_reply(&self, reply: Reply) -> Result<(), ReplyRejected> {
        let tx = lock(&self.reply_tx)
            .take()
            .ok_or(ReplyRejected::AlreadyAnswered)?;
        tx.send(reply).map_err(|_| ReplyRejected::CallerGone)
    }

    /// Report a delivery failure. Returns false if nobody was listening.
    pub fn fail(&self, error: BrokerError) -> bool {
        match lock(&self.error_tx).take() {
            Some(tx) => tx.send(error).is_ok(),
            None => false,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("detached", &self.is_detached())
            .finish_non_exhaustive()
    }
}
