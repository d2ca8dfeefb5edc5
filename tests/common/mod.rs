//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use webhook_proxy::broker::Broker;
use webhook_proxy::config::ProxyConfig;
use webhook_proxy::http::HttpServer;
use webhook_proxy::lifecycle::Shutdown;
use webhook_proxy_sdk::PollClient;

pub const SECRET: &str = "it-s3cret";

/// Config for a loopback test proxy with a short long-poll wait.
pub fn test_config(wait_ms: u64) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.broker.secret = SECRET.to_string();
    config.broker.long_poll_wait_ms = wait_ms;
    config.broker.show_debug_info = true;
    config
}

/// A proxy running on an ephemeral loopback port.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub broker: Arc<Broker>,
}

impl TestProxy {
    pub async fn start(config: ProxyConfig) -> Self {
        let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Shutdown::new();

        let server = HttpServer::new(&config);
        let broker = server.broker();
        let rx = shutdown.subscribe();
        tokio::spawn(async move {
            server.run(listener, rx).await.unwrap();
        });

        Self { addr, shutdown, broker }
    }

    pub fn webhook_url(&self) -> String {
        format!("http://{}/webhook/{}", self.addr, SECRET)
    }

    pub fn poll_url(&self) -> String {
        format!("http://{}/poll/{}", self.addr, SECRET)
    }

    pub fn reply_url(&self) -> String {
        format!("http://{}/reply{}", self.addr, SECRET)
    }

    pub fn consumer(&self) -> PollClient {
        PollClient::new(&self.poll_url(), &self.reply_url())
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}
