//! Atelier fake ledger backend
//!
//! Used for testing where mints are auto-confirmed. Serial numbers are
//! assigned sequentially per collection, like the real ledger does, and a
//! failure plan can script transient or permanent outages.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use atelier_common::ledger::{
    self, LedgerConnection, MintConfirmation, MAX_TOKEN_METADATA_BYTES,
};
use atelier_common::util::unix_time;
use atelier_common::CollectionId;

mod pinner;

pub use pinner::FakePinner;

/// Account id the fake ledger signs with
const FAKE_OPERATOR: &str = "0.0.9127";

/// Fake ledger connection
///
/// Tracks every submission so tests can assert exact invocation counts.
#[derive(Debug, Default)]
pub struct FakeLedger {
    serials: Mutex<HashMap<String, u64>>,
    invocations: AtomicU64,
    remaining_failures: AtomicU64,
    fail_after: Option<u64>,
    always_fail: bool,
}

impl FakeLedger {
    /// Ledger where every submission confirms
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger where the first `n` submissions fail with a transport error
    pub fn failing_times(n: u64) -> Self {
        Self {
            remaining_failures: AtomicU64::new(n),
            ..Self::default()
        }
    }

    /// Ledger where every submission fails with a transport error
    pub fn always_failing() -> Self {
        Self {
            always_fail: true,
            ..Self::default()
        }
    }

    /// Ledger where the first `n` submissions confirm and every later one
    /// fails with a transport error
    pub fn failing_after(n: u64) -> Self {
        Self {
            fail_after: Some(n),
            ..Self::default()
        }
    }

    /// Total number of submissions seen, including failed ones
    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Number of tokens minted into a collection so far
    pub fn minted_count(&self, collection_id: &CollectionId) -> u64 {
        self.serials
            .lock()
            .map(|serials| serials.get(collection_id.as_str()).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn should_fail(&self, invocation: u64) -> bool {
        if self.always_fail {
            return true;
        }
        if let Some(n) = self.fail_after {
            return invocation > n;
        }
        self.remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl LedgerConnection for FakeLedger {
    type Err = ledger::Error;

    async fn submit_token_mint(
        &self,
        collection_id: &CollectionId,
        metadata: Vec<u8>,
    ) -> Result<MintConfirmation, Self::Err> {
        let invocation = self.invocations.fetch_add(1, Ordering::SeqCst) + 1;

        if metadata.len() > MAX_TOKEN_METADATA_BYTES {
            return Err(ledger::Error::Rejected {
                status: "METADATA_TOO_LONG".to_string(),
            });
        }

        if self.should_fail(invocation) {
            tracing::debug!("Fake ledger failing submission {}", invocation);
            return Err(ledger::Error::Custom(
                "simulated node unavailable".to_string(),
            ));
        }

        let serial = {
            let mut serials = self
                .serials
                .lock()
                .map_err(|_| ledger::Error::Custom("serial counter poisoned".to_string()))?;
            let serial = serials.entry(collection_id.as_str().to_string()).or_insert(0);
            *serial += 1;
            *serial
        };

        Ok(MintConfirmation {
            transaction_id: format!("{}@{}.{}", FAKE_OPERATOR, unix_time(), invocation),
            serial_numbers: vec![serial],
        })
    }
}
