//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, allow lists, host scoping)
//!     → request.rs (request ID, correlation header)
//!     → [broker endpoint handles the call]
//!     → response.rs (delivery headers, try-later answers)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{X_IN_REPLY_TO, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
