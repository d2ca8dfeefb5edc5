//! Bounded byte transfer.
//!
//! # Data Flow
//! ```text
//! webhook body  → stream.rs (BoundedStream) → poll consumer response
//! reply body    → stream.rs (BoundedStream) → webhook caller response
//! autoreply     → stream.rs (collect_max)   → buffered request body
//! reader/writer → copy.rs (copy_max)        → CLI payload loading
//! ```
//!
//! # Design Decisions
//! - One `Budget` type does the accounting for every copy path
//! - Exactly `limit` bytes is within budget; one byte more is an error
//! - Copies are loops over fixed-size chunks, never recursive

pub mod copy;
pub mod stream;

pub use copy::{copy_max, CHUNK_SIZE};
pub use stream::{collect_max, BoundedStream};

/// Failure of a bounded copy.
#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    /// The source produced more than the configured maximum.
    #[error("payload exceeds max transfer size of {limit} bytes")]
    Exceeded { limit: u64 },

    /// Reading the source or writing the sink failed.
    #[error("transfer i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The source stream reported an error.
    #[error("source stream error: {0}")]
    Source(String),

    /// The copy was dropped before the source was exhausted.
    #[error("transfer aborted before completion")]
    Aborted,
}

/// Remaining-byte accounting for a single transfer.
#[derive(Debug, Clone, Copy)]
pub struct Budget {
    limit: u64,
    used: u64,
}

impl Budget {
    pub fn new(limit: u64) -> Self {
        Self { limit, used: 0 }
    }

    /// Charge `n` bytes against the budget.
    pub fn consume(&mut self, n: u64) -> Result<(), CopyError> {
        let next = self.used.saturating_add(n);
        if next > self.limit {
            return Err(CopyError::Exceeded { limit: self.limit });
        }
        self.used = next;
        Ok(())
    }

    pub fn remaining(&self) -> u64 {
        self.limit - self.used
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }
}
