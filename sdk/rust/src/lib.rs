//! Poll-consumer client for the webhook proxy.
//!
//! A consumer loops over [`PollClient::poll`], handles each [`Delivery`]
//! and answers it with [`PollClient::reply`].

pub mod client;

pub use client::{Delivery, PollClient, SdkResult};
