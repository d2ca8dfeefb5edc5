//! Webhook-to-long-poll broker library.
//!
//! Webhook callers are held open while poll consumers behind a firewall
//! long-poll for their requests and post replies back.

pub mod admin;
pub mod broker;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;
pub mod security;
pub mod transfer;

pub use broker::{Broker, BrokerSettings};
pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
