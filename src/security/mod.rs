//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → access_control.rs (peer address vs endpoint allow list)
//!     → network.rs (CIDR containment)
//!     → Pass to routing
//! ```
//!
//! # Design Decisions
//! - Separate allow lists for webhook senders and for poll consumers
//! - Fail closed: an enabled, empty list admits nobody
//! - Disabling filtering is explicit configuration, warned about at startup

pub mod access_control;
pub mod network;

pub use access_control::{allow_list_middleware, AllowList};
pub use network::IpNetwork;
