//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router for the webhook, poll and reply endpoints
//! - Wire up middleware (allow lists, host scoping, request ID, tracing)
//! - Bind the server to a plain or TLS listener
//! - Run the admin API on its own listener when enabled
//!
//! # Design Decisions
//! - No request timeout layer on broker routes; the long-poll wait bounds them
//! - Webhook and poll/reply endpoints carry separate allow lists
//! - Graceful shutdown waits for in-flight long polls

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::FromRef,
    http::Request,
    middleware,
    routing::{get, post},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::admin::setup_admin_router;
use crate::broker::egress::handle_poll;
use crate::broker::ingress::handle_webhook;
use crate::broker::reply::handle_reply;
use crate::broker::{Broker, BrokerSettings};
use crate::config::{AdminConfig, ProxyConfig};
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::routing::{host_guard, EndpointPaths, HostMatcher};
use crate::security::{allow_list_middleware, AllowList};

/// Application state injected into admin handlers.
#[derive(Clone)]
pub struct AppState {
    pub broker: Arc<Broker>,
    pub started_at: Instant,
    pub admin_api_key: String,
}

impl AppState {
    pub fn new(broker: Broker, admin_api_key: String) -> Self {
        Self::from_shared(Arc::new(broker), admin_api_key)
    }

    pub fn from_shared(broker: Arc<Broker>, admin_api_key: String) -> Self {
        Self {
            broker,
            started_at: Instant::now(),
            admin_api_key,
        }
    }
}

impl FromRef<AppState> for Arc<Broker> {
    fn from_ref(state: &AppState) -> Self {
        state.broker.clone()
    }
}

/// HTTP server for the broker.
pub struct HttpServer {
    router: Router,
    state: AppState,
    admin: AdminConfig,
    drain: Duration,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: &ProxyConfig) -> Self {
        let broker = Arc::new(Broker::new(BrokerSettings::from_config(&config.broker)));
        let state = AppState::from_shared(broker.clone(), config.admin.api_key.clone());

        if !config.filtering.enabled {
            tracing::warn!("Network filtering disabled, every caller is admitted");
        }

        let router = Self::build_router(config, broker);
        Self {
            router,
            state,
            admin: config.admin.clone(),
            drain: Duration::from_millis(config.broker.long_poll_wait_ms),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, broker: Arc<Broker>) -> Router {
        let paths = EndpointPaths::from_config(&config.broker);
        let filtering = &config.filtering;

        let webhook_allow = AllowList::from_ranges("webhook", filtering.enabled, &filtering.webhook_allow);
        let consumer_allow =
            AllowList::from_ranges("poll_reply", filtering.enabled, &filtering.poll_reply_allow);

        tracing::info!(
            webhook = %paths.webhook,
            poll = %paths.poll,
            reply = %paths.reply,
            hostname = %config.broker.hostname,
            "Broker endpoints configured"
        );

        let webhook_routes = Router::new()
            .route(&paths.webhook, post(handle_webhook))
            .route_layer(middleware::from_fn_with_state(webhook_allow, allow_list_middleware));

        let consumer_routes = Router::new()
            .route(&paths.poll, get(handle_poll))
            .route(&paths.reply, post(handle_reply))
            .route_layer(middleware::from_fn_with_state(consumer_allow, allow_list_middleware));

        let mut routes = webhook_routes.merge(consumer_routes);
        if let Some(matcher) = HostMatcher::from_hostname(&config.broker.hostname) {
            routes = routes.route_layer(middleware::from_fn_with_state(Arc::new(matcher), host_guard));
        }

        routes.with_state(broker).layer(
            ServiceBuilder::new()
                .layer(set_request_id_layer())
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id(request),
                    )
                }))
                .layer(propagate_request_id_layer()),
        )
    }

    /// The broker router, without connect info.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn broker(&self) -> Arc<Broker> {
        self.state.broker.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        self.spawn_admin(shutdown.resubscribe()).await?;

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server over TLS on `addr`.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, "HTTPS server starting");

        self.spawn_admin(shutdown.resubscribe()).await?;

        let handle = axum_server::Handle::new();
        let trigger = handle.clone();
        let drain = self.drain;
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTPS server draining");
            trigger.graceful_shutdown(Some(drain));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service_with_connect_info::<SocketAddr>())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    async fn spawn_admin(&self, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        if !self.admin.enabled {
            return Ok(());
        }

        let listener = TcpListener::bind(&self.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API starting");

        let app = setup_admin_router(self.state.clone());
        tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown.recv().await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "Admin API failed");
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::{header::HOST, StatusCode};
    use tower::ServiceExt;

    use crate::http::request::{X_IN_REPLY_TO, X_REQUEST_ID};
    use crate::security::access_control::FORBIDDEN_MESSAGE;

    fn config() -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.broker.secret = "s3cret".to_string();
        config.broker.long_poll_wait_ms = 50;
        config
    }

    fn app(config: &ProxyConfig, peer: &str) -> Router {
        let peer: SocketAddr = peer.parse().unwrap();
        HttpServer::new(config).router().layer(MockConnectInfo(peer))
    }

    async fn text(res: axum::response::Response) -> String {
        let body = axum::body::to_bytes(res.into_body(), 4096).await.unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    fn reply_request(id: Option<&str>) -> Request<Body> {
        let mut builder = Request::post("/replys3cret");
        if let Some(id) = id {
            builder = builder.header(X_IN_REPLY_TO, id);
        }
        builder.body(Body::from("answer")).unwrap()
    }

    #[tokio::test]
    async fn reply_without_correlation_is_bad_request() {
        let res = app(&config(), "127.0.0.1:4000").oneshot(reply_request(None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(!text(res).await.is_empty());
    }

    #[tokio::test]
    async fn reply_with_short_correlation_is_bad_request() {
        let res = app(&config(), "127.0.0.1:4000")
            .oneshot(reply_request(Some("abc")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn reply_to_unknown_session_is_bad_request() {
        let res = app(&config(), "127.0.0.1:4000")
            .oneshot(reply_request(Some("7c9e6679-7425-40de-944b-e07fc1f90ae7")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(text(res).await.contains("7c9e6679-7425-40de-944b-e07fc1f90ae7"));
    }

    #[tokio::test]
    async fn wrong_secret_is_not_found() {
        let res = app(&config(), "127.0.0.1:4000")
            .oneshot(Request::get("/poll/other").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn idle_poll_answers_no_content_with_request_id() {
        let res = app(&config(), "127.0.0.1:4000")
            .oneshot(Request::get("/poll/s3cret").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert!(res.headers().contains_key(X_REQUEST_ID));
    }

    #[tokio::test]
    async fn caller_outside_allow_list_is_forbidden() {
        let res = app(&config(), "10.1.2.3:4000")
            .oneshot(Request::post("/webhook/s3cret").body(Body::from("hi")).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert_eq!(text(res).await, FORBIDDEN_MESSAGE);
    }

    #[tokio::test]
    async fn webhook_and_consumer_lists_are_separate() {
        let mut config = config();
        config.filtering.webhook_allow = vec!["10.0.0.0/8".to_string()];

        let res = app(&config, "10.1.2.3:4000")
            .oneshot(Request::get("/poll/s3cret").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn disabled_filtering_admits_everyone() {
        let mut config = config();
        config.filtering.enabled = false;

        let res = app(&config, "203.0.113.9:4000")
            .oneshot(Request::get("/poll/s3cret").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn host_mismatch_is_not_found() {
        let mut config = config();
        config.broker.hostname = "hooks.example.com".to_string();

        let res = app(&config, "127.0.0.1:4000")
            .oneshot(
                Request::get("/poll/s3cret")
                    .header(HOST, "other.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = app(&config, "127.0.0.1:4000")
            .oneshot(
                Request::get("/poll/s3cret")
                    .header(HOST, "hooks.example.com:8080")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
    }
}
