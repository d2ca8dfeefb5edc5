//! Failures that end a webhook transaction.

use crate::transfer::CopyError;

/// Why a held webhook call is answered with the try-later status.
///
/// The `Display` text is what the webhook caller sees when debug info is on.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// More sessions pending than the admission ceiling allows.
    #[error("Too busy")]
    Overloaded,

    /// The delivery queue stayed full for a whole long-poll wait.
    #[error("Queue full")]
    QueueFull,

    /// No reply arrived within the long-poll wait.
    #[error("Timed out")]
    Timeout,

    /// Buffering the webhook body failed (autoreply mode).
    #[error("Error: {0}")]
    Transfer(#[from] CopyError),

    /// Streaming the webhook body to the poll consumer failed.
    #[error("Error: delivery to poll client failed: {0}")]
    DeliveryFailed(String),
}

impl BrokerError {
    /// Short label used for metrics and structured logs.
    pub fn outcome(&self) -> &'static str {
        match self {
            BrokerError::Overloaded => "overloaded",
            BrokerError::QueueFull => "queue_full",
            BrokerError::Timeout => "timeout",
            BrokerError::Transfer(_) => "payload_error",
            BrokerError::DeliveryFailed(_) => "delivery_failed",
        }
    }
}
