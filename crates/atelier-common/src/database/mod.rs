//! Fulfillment database

use async_trait::async_trait;

pub mod fulfillment;

pub use fulfillment::{
    Database as FulfillmentDatabase, DynFulfillmentStore, JobsDatabase, JobsTransaction,
    OrdersDatabase, OrdersTransaction, ReceiptsDatabase, ReceiptsTransaction, TokensDatabase,
    TokensTransaction, Transaction,
};

/// Fulfillment database Error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database Error
    #[error(transparent)]
    Database(Box<dyn std::error::Error + Send + Sync>),
    /// A row that must be unique per order already exists
    #[error("Duplicate entry")]
    Duplicate,
    /// Unknown order
    #[error("Unknown order")]
    OrderNotFound,
    /// Unknown job
    #[error("Unknown job")]
    JobNotFound,
    /// No pending receipt for the order
    #[error("Pending receipt not found")]
    ReceiptNotFound,
    /// Ownership row references an authenticity row that does not exist
    #[error("Authenticity token not found")]
    AuthenticityNotFound,
    /// Invalid state transition
    #[error("Invalid state transition")]
    InvalidStateTransition(crate::state::Error),
    /// Serde Error
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

impl From<crate::state::Error> for Error {
    fn from(state: crate::state::Error) -> Self {
        Error::InvalidStateTransition(state)
    }
}

/// Base database writer
#[async_trait]
pub trait DbTransactionFinalizer {
    /// Database Error
    type Err: Into<Error> + From<Error>;

    /// Commits all the changes into the database
    async fn commit(self: Box<Self>) -> Result<(), Self::Err>;

    /// Rollbacks the write transaction
    async fn rollback(self: Box<Self>) -> Result<(), Self::Err>;
}
