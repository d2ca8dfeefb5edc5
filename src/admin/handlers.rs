use axum::{
    extract::State,
    Json,
};
use serde::{Deserialize, Serialize};
use crate::broker::StatsSnapshot;
use crate::http::server::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Webhook calls currently held open.
    pub pending_sessions: usize,
    /// Admission ceiling for pending sessions.
    pub max_pending: usize,
    /// Sessions waiting in the delivery queue.
    pub queued: usize,
    pub queue_capacity: usize,
    pub long_poll_wait_ms: u64,
    pub autoreply: bool,
    /// Traffic since startup.
    pub counters: StatsSnapshot,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "operational".to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

pub async fn get_sessions(State(state): State<AppState>) -> Json<SessionSummary> {
    let broker = &state.broker;
    let settings = broker.settings();

    Json(SessionSummary {
        pending_sessions: broker.registry().len(),
        max_pending: settings.max_pending,
        queued: broker.queue().len(),
        queue_capacity: broker.queue().capacity(),
        long_poll_wait_ms: settings.long_poll_wait.as_millis() as u64,
        autoreply: settings.autoreply,
        counters: broker.stats().snapshot(),
    })
}
