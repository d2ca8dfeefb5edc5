//! Webhook-to-long-poll broker.
//!
//! # Data Flow
//! ```text
//! webhook caller ──▶ ingress.rs ──register──▶ registry.rs
//!                        │
//!                        └──push──▶ queue.rs ──pop──▶ egress.rs ──▶ poll consumer
//!                                                                       │
//! webhook caller ◀── ingress.rs ◀──reply channel── reply.rs ◀──────────┘
//!                        │                            ▲
//!                        └──────completion flag───────┘
//! ```
//!
//! # Design Decisions
//! - Every blocking point, enqueue included, is bounded by the long-poll wait
//! - A session lives in the registry exactly as long as its webhook task
//! - Poll consumers skip sessions whose webhook caller already left
//! - Body copies are streamed and bounded; a failure after the status line
//!   aborts the connection rather than sending a short body

pub mod egress;
pub mod error;
pub mod ingress;
pub mod queue;
pub mod registry;
pub mod reply;
pub mod session;
pub mod stats;

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::Response;

use crate::config::BrokerConfig;
use crate::http::response::try_later;

pub use error::BrokerError;
pub use queue::DeliveryQueue;
pub use registry::SessionRegistry;
pub use session::{Reply, Session, SessionId, SESSION_ID_LEN};
pub use stats::{BrokerStats, StatsSnapshot};

/// Runtime knobs of the broker, resolved from configuration.
#[derive(Debug, Clone)]
pub struct BrokerSettings {
    pub long_poll_wait: Duration,
    pub max_payload: u64,
    pub max_pending: usize,
    pub backlog: usize,
    pub try_later: StatusCode,
    pub autoreply: bool,
    pub show_debug_info: bool,
}

impl BrokerSettings {
    pub fn from_config(config: &BrokerConfig) -> Self {
        Self {
            long_poll_wait: Duration::from_millis(config.long_poll_wait_ms),
            max_payload: config.max_payload_bytes,
            max_pending: config.max_pending,
            backlog: config.backlog,
            try_later: StatusCode::from_u16(config.try_later_status)
                .unwrap_or(StatusCode::SERVICE_UNAVAILABLE),
            autoreply: config.autoreply,
            show_debug_info: config.show_debug_info,
        }
    }
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self::from_config(&BrokerConfig::default())
    }
}

/// Shared state behind the webhook, poll and reply endpoints.
pub struct Broker {
    registry: SessionRegistry,
    queue: DeliveryQueue,
    settings: BrokerSettings,
    stats: BrokerStats,
}

impl Broker {
    pub fn new(settings: BrokerSettings) -> Self {
        Self {
            registry: SessionRegistry::new(),
            queue: DeliveryQueue::new(settings.backlog),
            settings,
            stats: BrokerStats::default(),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn queue(&self) -> &DeliveryQueue {
        &self.queue
    }

    pub fn settings(&self) -> &BrokerSettings {
        &self.settings
    }

    pub fn stats(&self) -> &BrokerStats {
        &self.stats
    }

    /// The try-later answer for a failed webhook transaction.
    fn try_later(&self, error: &BrokerError) -> Response {
        try_later(self.settings.try_later, self.settings.show_debug_info, error)
    }
}

#[cfg(test)]
mod tests;
