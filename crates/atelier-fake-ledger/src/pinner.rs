//! Fake metadata pinner

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use atelier_common::pin::{self, MetadataPinner, PinnedContent};
use serde_json::Value;

/// Fake content-addressed pinner
///
/// Hashes the canonical JSON serialization so the same document always pins
/// to the same URL, which is what a real content-addressed store does.
#[derive(Debug, Default)]
pub struct FakePinner {
    pins: AtomicU64,
    always_fail: bool,
}

impl FakePinner {
    /// Pinner where every upload succeeds
    pub fn new() -> Self {
        Self::default()
    }

    /// Pinner where every upload fails with a transport error
    pub fn always_failing() -> Self {
        Self {
            always_fail: true,
            ..Self::default()
        }
    }

    /// Number of successful pins
    pub fn pins(&self) -> u64 {
        self.pins.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataPinner for FakePinner {
    type Err = pin::Error;

    async fn pin_json(&self, document: &Value) -> Result<PinnedContent, Self::Err> {
        if self.always_fail {
            return Err(pin::Error::Custom(
                "simulated pinning service outage".to_string(),
            ));
        }

        let serialized = serde_json::to_string(document)?;
        let mut hasher = DefaultHasher::new();
        serialized.hash(&mut hasher);
        let content_hash = format!("bafk{:016x}", hasher.finish());

        self.pins.fetch_add(1, Ordering::SeqCst);
        Ok(PinnedContent {
            url: format!("https://gateway.example.com/ipfs/{}", content_hash),
            content_hash,
        })
    }
}
