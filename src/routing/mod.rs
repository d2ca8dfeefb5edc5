//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path)
//!     → router.rs (host_guard: Host header vs configured hostname)
//!     → matcher.rs (case-insensitive host comparison)
//!     → axum path match: webhook / poll / reply + secret
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Exact paths only; no wildcards, no regex

pub mod matcher;
pub mod router;

pub use matcher::HostMatcher;
pub use router::{host_guard, EndpointPaths};
