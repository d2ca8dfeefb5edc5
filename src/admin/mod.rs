pub mod handlers;
pub mod auth;

use std::time::Duration;

use axum::{
    routing::get,
    Router,
    middleware,
};
use tower_http::timeout::TimeoutLayer;
use crate::http::server::AppState;
use self::handlers::*;
use self::auth::admin_auth_middleware;

#[allow(deprecated)]
pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/sessions", get(get_sessions))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TimeoutLayer::new(Duration::from_secs(10)))
        .with_state(state)
}
