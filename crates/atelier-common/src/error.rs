//! Errors

/// Atelier common Error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database Error
    #[error(transparent)]
    Database(#[from] crate::database::Error),
    /// Ledger Error
    #[error(transparent)]
    Ledger(#[from] crate::ledger::Error),
    /// Pinning Error
    #[error(transparent)]
    Pin(#[from] crate::pin::Error),
    /// Invalid order status transition
    #[error(transparent)]
    State(#[from] crate::state::Error),
    /// Serde Error
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    /// Malformed token id
    #[error("Invalid token id: {0}")]
    InvalidTokenId(String),
    /// Unknown currency code
    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),
    /// Unknown order status string
    #[error("Unknown order status: {0}")]
    UnknownOrderStatus(String),
    /// Unknown job state string
    #[error("Unknown job state: {0}")]
    UnknownJobState(String),
}
