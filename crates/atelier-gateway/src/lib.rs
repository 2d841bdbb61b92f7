//! Atelier ledger backend for the mint gateway
//!
//! The gateway exposes `POST /v1/collections/{collection}/tokens`; one call
//! freezes, signs, and submits a single mint transaction with the signing
//! credential held by the gateway, then waits for the receipt. This client
//! is stateless apart from the connection pool, so it is safe to share
//! across concurrent mints.

use std::time::Duration;

use async_trait::async_trait;
use atelier_common::ledger::{self, LedgerConnection, MintConfirmation};
use atelier_common::CollectionId;
use serde::{Deserialize, Serialize};
use url::Url;

pub mod error;

pub use error::Error;

/// Mint gateway client
#[derive(Debug, Clone)]
pub struct MintGateway {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct MintTokenRequest<'a> {
    metadata: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MintTokenResponse {
    transaction_id: String,
    serial_numbers: Vec<u64>,
}

impl MintGateway {
    /// Create a new [`MintGateway`] client
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
            api_key,
        })
    }

    fn tokens_url(&self, collection_id: &CollectionId) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Gateway {
                status: 0,
                message: "gateway URL cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .extend(["v1", "collections", collection_id.as_str(), "tokens"]);
        Ok(url)
    }

    async fn submit(
        &self,
        collection_id: &CollectionId,
        metadata: &[u8],
    ) -> Result<MintConfirmation, Error> {
        let url = self.tokens_url(collection_id)?;
        let metadata = String::from_utf8_lossy(metadata);

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&MintTokenRequest {
                metadata: metadata.as_ref(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            let message = message.chars().take(512).collect::<String>();
            tracing::warn!(
                "Mint gateway rejected submission into {}: {} {}",
                collection_id,
                status,
                message
            );
            return Err(Error::Gateway {
                status: status.as_u16(),
                message,
            });
        }

        let receipt: MintTokenResponse = response.json().await?;
        Ok(MintConfirmation {
            transaction_id: receipt.transaction_id,
            serial_numbers: receipt.serial_numbers,
        })
    }
}

#[async_trait]
impl LedgerConnection for MintGateway {
    type Err = ledger::Error;

    async fn submit_token_mint(
        &self,
        collection_id: &CollectionId,
        metadata: Vec<u8>,
    ) -> Result<MintConfirmation, Self::Err> {
        Ok(self.submit(collection_id, &metadata).await?)
    }
}
