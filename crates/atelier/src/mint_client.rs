//! Ledger mint client

use std::time::Duration;

use atelier_common::ledger::{self, DynLedgerConnection, MAX_TOKEN_METADATA_BYTES};
use atelier_common::CollectionId;
use tracing::instrument;

use crate::error::Error;

/// Retry configuration for [`LedgerMintClient`]
#[derive(Debug, Clone)]
pub struct MintClientConfig {
    /// Submission attempts before the last error is returned to the caller
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub retry_delay: Duration,
    /// Per-attempt submission timeout
    pub call_timeout: Duration,
}

impl Default for MintClientConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_millis(300),
            call_timeout: Duration::from_secs(30),
        }
    }
}

/// Receipt of a confirmed mint, reduced to the serial this saga uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintReceipt {
    /// Ledger transaction id
    pub transaction_id: String,
    /// First serial number assigned by the ledger
    pub serial_number: u64,
}

/// Mints one token into a collection with bounded, fixed-delay retries
///
/// Every attempt that reaches the ledger consumes transaction fees, even
/// when it is later deemed failed; that cost is accepted in exchange for
/// liveness. The wrapped connection is read-only shared state, so
/// concurrent mints are safe.
#[derive(Clone)]
pub struct LedgerMintClient {
    connection: DynLedgerConnection,
    config: MintClientConfig,
}

impl std::fmt::Debug for LedgerMintClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerMintClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LedgerMintClient {
    /// Create a new [`LedgerMintClient`]
    pub fn new(connection: DynLedgerConnection, config: MintClientConfig) -> Self {
        Self { connection, config }
    }

    /// Mint one token into `collection_id`, returning the first serial
    ///
    /// A non-final attempt's error is logged and retried after the fixed
    /// delay; the final attempt's error is returned verbatim. A timed-out
    /// attempt counts like any other transport failure.
    #[instrument(skip(self, metadata), fields(collection = %collection_id))]
    pub async fn mint(
        &self,
        collection_id: &CollectionId,
        metadata: Vec<u8>,
    ) -> Result<MintReceipt, Error> {
        if metadata.len() > MAX_TOKEN_METADATA_BYTES {
            return Err(ledger::Error::MetadataTooLarge {
                len: metadata.len(),
                max: MAX_TOKEN_METADATA_BYTES,
            }
            .into());
        }

        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let submission = self
                .connection
                .submit_token_mint(collection_id, metadata.clone());
            let result = match tokio::time::timeout(self.config.call_timeout, submission).await {
                Ok(result) => result,
                Err(_) => Err(ledger::Error::Timeout),
            };

            match result {
                Ok(confirmation) => {
                    let serial_number = confirmation
                        .serial_numbers
                        .first()
                        .copied()
                        .ok_or(ledger::Error::EmptySerials)?;
                    return Ok(MintReceipt {
                        transaction_id: confirmation.transaction_id,
                        serial_number,
                    });
                }
                Err(err) if attempt < max_attempts => {
                    tracing::warn!(
                        "Mint attempt {}/{} into {} failed: {}",
                        attempt,
                        max_attempts,
                        collection_id,
                        err
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use atelier_fake_ledger::FakeLedger;

    use super::*;

    fn client(ledger: Arc<FakeLedger>, max_attempts: u32) -> LedgerMintClient {
        LedgerMintClient::new(
            ledger,
            MintClientConfig {
                max_attempts,
                retry_delay: Duration::from_millis(300),
                call_timeout: Duration::from_secs(5),
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_final_attempt_after_transient_failures() {
        let ledger = Arc::new(FakeLedger::failing_times(2));
        let client = client(Arc::clone(&ledger), 3);

        let receipt = client
            .mint(&CollectionId::new("0.0.100"), b"ipfs://bafk1".to_vec())
            .await
            .expect("third attempt succeeds");
        assert_eq!(receipt.serial_number, 1);
        assert_eq!(ledger.invocations(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn returns_final_error_after_exactly_max_attempts() {
        let ledger = Arc::new(FakeLedger::always_failing());
        let client = client(Arc::clone(&ledger), 2);

        let err = client
            .mint(&CollectionId::new("0.0.100"), b"ipfs://bafk1".to_vec())
            .await
            .expect_err("retries exhausted");
        assert!(matches!(err, Error::Ledger(_)));
        assert_eq!(ledger.invocations(), 2);
    }

    #[tokio::test]
    async fn oversized_metadata_never_reaches_the_ledger() {
        let ledger = Arc::new(FakeLedger::new());
        let client = client(Arc::clone(&ledger), 3);

        let err = client
            .mint(
                &CollectionId::new("0.0.100"),
                vec![0u8; MAX_TOKEN_METADATA_BYTES + 1],
            )
            .await
            .expect_err("over the ceiling");
        assert!(matches!(
            err,
            Error::Ledger(ledger::Error::MetadataTooLarge { .. })
        ));
        assert_eq!(ledger.invocations(), 0);
    }
}
