//! Metadata documents pinned for the two tokens

use atelier_common::{AuthenticityToken, MintJob, Order};
use serde::Serialize;
use serde_json::{json, Value};

/// Content type declared in the on-ledger token payload
const LEDGER_PAYLOAD_CONTENT_TYPE: &str = "application/json";

/// One entry in the ownership token's provenance trail
#[derive(Debug, Clone, Serialize)]
pub struct ProvenanceEvent {
    /// What happened
    pub event: ProvenanceEventKind,
    /// Unix time of the event
    pub at: u64,
    /// Transaction id, payment reference, or artwork id backing the event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// Provenance event kinds, in chain order
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvenanceEventKind {
    /// The artwork record was created
    Creation,
    /// The authenticity certificate was minted
    AuthenticityMint,
    /// The sale this fulfillment belongs to
    Purchase,
}

/// Document pinned for the authenticity certificate
pub(crate) fn authenticity_document(job: &MintJob) -> Value {
    let metadata = &job.metadata;
    json!({
        "name": metadata.name,
        "description": metadata.description,
        "image": metadata.image,
        "type": metadata.kind,
        "artworkId": job.artwork_id,
        "orderId": job.order_id,
        "buyer": {
            "name": metadata.buyer_name,
            "email": metadata.buyer_email,
        },
        "price": {
            "amount": metadata.price_cents,
            "currency": metadata.currency,
        },
    })
}

/// Document pinned for the ownership token
///
/// References the authenticity mint it attests to and carries the
/// provenance trail up to the purchase.
pub(crate) fn ownership_document(
    job: &MintJob,
    order: &Order,
    authenticity: &AuthenticityToken,
) -> Value {
    let provenance = vec![
        ProvenanceEvent {
            event: ProvenanceEventKind::Creation,
            at: order.created_time,
            reference: Some(job.artwork_id.to_string()),
        },
        ProvenanceEvent {
            event: ProvenanceEventKind::AuthenticityMint,
            at: authenticity.created_time,
            reference: Some(authenticity.transaction_id.clone()),
        },
        ProvenanceEvent {
            event: ProvenanceEventKind::Purchase,
            at: order.created_time,
            reference: Some(order.reference.clone()),
        },
    ];

    json!({
        "name": format!("{} (ownership)", job.metadata.name),
        "orderId": job.order_id,
        "authenticity": {
            "collection": authenticity.token_id.collection,
            "serial": authenticity.token_id.serial,
            "metadataUrl": authenticity.metadata_url,
            "transactionId": authenticity.transaction_id,
        },
        "provenance": provenance,
    })
}

/// On-ledger token payload: a pointer to the pinned content, never the
/// content itself, so it stays under the ledger's per-token byte ceiling
pub(crate) fn ledger_token_payload(content_hash: &str) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&json!({
        "url": format!("ipfs://{}", content_hash),
        "contentType": LEDGER_PAYLOAD_CONTENT_TYPE,
    }))
}
