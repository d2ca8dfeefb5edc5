//! Lifetime counters exposed through the admin API.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Monotonic counters of broker traffic since startup.
#[derive(Debug, Default)]
pub struct BrokerStats {
    webhooks_received: AtomicU64,
    try_later_sent: AtomicU64,
    deliveries: AtomicU64,
    replies_delivered: AtomicU64,
}

/// Point-in-time copy of [`BrokerStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub webhooks_received: u64,
    pub try_later_sent: u64,
    pub deliveries: u64,
    pub replies_delivered: u64,
}

impl BrokerStats {
    pub fn webhook_received(&self) {
        self.webhooks_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn try_later_sent(&self) {
        self.try_later_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn delivered(&self) {
        self.deliveries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reply_delivered(&self) {
        self.replies_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            webhooks_received: self.webhooks_received.load(Ordering::Relaxed),
            try_later_sent: self.try_later_sent.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            replies_delivered: self.replies_delivered.load(Ordering::Relaxed),
        }
    }
}
