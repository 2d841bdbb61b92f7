//! Errors

use atelier_common::OrderStatus;
use uuid::Uuid;

/// Atelier Error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown order
    #[error("Unknown order: {0}")]
    OrderNotFound(Uuid),
    /// Unknown job
    #[error("Unknown job: {0}")]
    JobNotFound(Uuid),
    /// Order payment has not been confirmed
    #[error("Payment for order {0} is not confirmed")]
    PaymentNotConfirmed(Uuid),
    /// Order is not in a retryable state
    #[error("Order {0} is in state {1}, not retryable")]
    NotRetryable(Uuid, OrderStatus),
    /// The queue channel is closed; the dispatcher has shut down
    #[error("Job queue is closed")]
    QueueClosed,
    /// Database Error
    #[error(transparent)]
    Database(#[from] atelier_common::database::Error),
    /// Ledger Error
    #[error(transparent)]
    Ledger(#[from] atelier_common::ledger::Error),
    /// Pinning Error
    #[error(transparent)]
    Pin(#[from] atelier_common::pin::Error),
    /// Invalid order status transition
    #[error(transparent)]
    State(#[from] atelier_common::state::Error),
    /// Serde Error
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}
