//! Atelier fulfillment core.
//!
//! Coordinates the dual-token mint saga behind a durable job queue: the
//! authenticity certificate is minted first, the transferable ownership
//! token second, and the order only reaches `fulfilled` once both records
//! are linked locally. Transaction submission retries at a fixed delay
//! inside [`LedgerMintClient`]; failed jobs are redelivered with
//! exponential backoff by the [`Dispatcher`].

pub mod admin;
pub mod error;
pub mod mint_client;
pub mod queue;
pub mod saga;

pub use error::Error;
pub use mint_client::{LedgerMintClient, MintClientConfig, MintReceipt};
pub use queue::{Dispatcher, DispatcherConfig, JobHandle, JobQueue, RetryPolicy};
pub use saga::{MintSaga, SagaConfig};
