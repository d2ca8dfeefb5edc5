//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → HTTP server stops accepting → in-flight long polls finish
//!             → admin server stops
//! ```
//!
//! # Design Decisions
//! - One broadcast trigger for every server task
//! - In-flight waits are bounded by the long-poll wait, so draining is too

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
