//! Bounded FIFO hand-off from webhook tasks to poll tasks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};

use super::error::BrokerError;
use super::session::Session;

/// Bounded queue of sessions awaiting a poll consumer.
///
/// Producers share the `mpsc::Sender`; consumers take turns on the receiver
/// behind a fair async mutex, so waiting pollers are served in arrival order.
/// `recv` is cancel safe: a poller that disconnects mid-wait loses nothing.
pub struct DeliveryQueue {
    tx: mpsc::Sender<Arc<Session>>,
    rx: Mutex<mpsc::Receiver<Arc<Session>>>,
    capacity: usize,
}

impl DeliveryQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Mutex::new(rx),
            capacity,
        }
    }

    /// Enqueue a session, waiting at most `wait` for a free slot.
    pub async fn push(&self, session: Arc<Session>, wait: Duration) -> Result<(), BrokerError> {
        match tokio::time::timeout(wait, self.tx.send(session)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) | Err(_) => Err(BrokerError::QueueFull),
        }
    }

    /// Wait for the next session in FIFO order.
    pub async fn pop(&self) -> Option<Arc<Session>> {
        self.rx.lock().await.recv().await
    }

    /// Sessions currently buffered.
    pub fn len(&self) -> usize {
        self.capacity - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
