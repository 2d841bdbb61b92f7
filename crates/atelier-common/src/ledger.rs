//! Ledger connection trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::token::CollectionId;

/// Per-token metadata byte ceiling enforced by the ledger
///
/// Callers pass a pinned-content URL, never inline content.
pub const MAX_TOKEN_METADATA_BYTES: usize = 100;

/// Ledger connection Error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Submission did not complete within the configured timeout
    #[error("Ledger call timed out")]
    Timeout,
    /// Network or node transport failure
    #[error(transparent)]
    Transport(Box<dyn std::error::Error + Send + Sync>),
    /// The ledger rejected the transaction outright
    ///
    /// Not distinguished from transient errors by the retry layer; the
    /// status string is for operator diagnosis from logs.
    #[error("Ledger rejected transaction: {status}")]
    Rejected {
        /// Receipt status reported by the ledger
        status: String,
    },
    /// The receipt carried no serial numbers
    #[error("Mint receipt contained no serial numbers")]
    EmptySerials,
    /// Metadata exceeds [`MAX_TOKEN_METADATA_BYTES`]
    #[error("Token metadata is {len} bytes, ledger limit is {max}")]
    MetadataTooLarge {
        /// Actual payload length
        len: usize,
        /// Ledger limit
        max: usize,
    },
    /// Serde Error
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    /// AnyHow Error
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
    /// Custom
    #[error("`{0}`")]
    Custom(String),
}

/// Receipt of one confirmed mint submission
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintConfirmation {
    /// Ledger transaction id
    pub transaction_id: String,
    /// Serial numbers assigned by the ledger, in mint order
    pub serial_numbers: Vec<u64>,
}

/// Ledger connection trait
///
/// One call submits one mint: the backend freezes, signs, and submits the
/// transaction and waits for its receipt. Implementations hold no mutable
/// state other than the read-only signing credential and are safe for
/// concurrent use. Each submission consumes ledger fees whether or not the
/// caller later deems the attempt failed.
#[async_trait]
pub trait LedgerConnection {
    /// Ledger connection Error
    type Err: Into<Error> + From<Error>;

    /// Mint one token into `collection_id` and wait for the receipt
    async fn submit_token_mint(
        &self,
        collection_id: &CollectionId,
        metadata: Vec<u8>,
    ) -> Result<MintConfirmation, Self::Err>;
}

/// Type alias for a shared ledger connection
pub type DynLedgerConnection =
    std::sync::Arc<dyn LedgerConnection<Err = Error> + Send + Sync>;
