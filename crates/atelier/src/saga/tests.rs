//! Tests for the dual-token mint saga
//!
//! Covers the success path, failure classification for each step, and
//! idempotent re-entry under duplicate delivery and operator retry.

use std::sync::Arc;
use std::time::Duration;

use atelier_common::database::{
    DbTransactionFinalizer, FulfillmentDatabase, OrdersDatabase, OrdersTransaction,
    ReceiptsDatabase, ReceiptsTransaction, TokensDatabase, TokensTransaction,
};
use atelier_common::ledger::LedgerConnection;
use atelier_common::{
    ArtworkMetadata, AuthenticityToken, CollectionId, Currency, MintJob, Order, OrderStatus,
    PaymentStatus, PendingOwnershipReceipt, TokenId,
};
use atelier_fake_ledger::{FakeLedger, FakePinner};
use atelier_memory_store::MemoryFulfillmentStore;
use uuid::Uuid;

use crate::error::Error;
use crate::mint_client::{LedgerMintClient, MintClientConfig};
use crate::saga::{MintSaga, SagaConfig};

const AUTH_COLLECTION: &str = "0.0.4100";
const OWN_COLLECTION: &str = "0.0.4200";

struct Harness {
    store: MemoryFulfillmentStore,
    ledger: Arc<FakeLedger>,
    pinner: Arc<FakePinner>,
    saga: MintSaga,
}

fn saga_config() -> SagaConfig {
    SagaConfig {
        authenticity_collection: CollectionId::new(AUTH_COLLECTION),
        ownership_collection: CollectionId::new(OWN_COLLECTION),
        minted_by: "atelier-mint".to_string(),
    }
}

fn harness(ledger: FakeLedger, pinner: FakePinner) -> Harness {
    let store = MemoryFulfillmentStore::new();
    let ledger = Arc::new(ledger);
    let pinner = Arc::new(pinner);
    let client = LedgerMintClient::new(
        ledger.clone(),
        MintClientConfig {
            max_attempts: 2,
            retry_delay: Duration::from_millis(10),
            call_timeout: Duration::from_secs(5),
        },
    );
    let saga = MintSaga::new(
        Arc::new(store.clone()),
        client,
        pinner.clone(),
        saga_config(),
    );
    Harness {
        store,
        ledger,
        pinner,
        saga,
    }
}

fn test_metadata() -> ArtworkMetadata {
    ArtworkMetadata {
        name: "Nightfall II".to_string(),
        description: "Oil on canvas, 80x120".to_string(),
        image: "https://cdn.example.com/nightfall-ii.png".to_string(),
        buyer_email: "buyer@example.com".to_string(),
        buyer_name: "A. Buyer".to_string(),
        price_cents: 250_000,
        currency: Currency::Usd,
        kind: "physical".to_string(),
    }
}

fn paid_order() -> Order {
    let mut order = Order::new(
        "pay_ref_123".to_string(),
        Uuid::new_v4(),
        Uuid::new_v4(),
        250_000,
        Currency::Usd,
    );
    order.payment_status = PaymentStatus::Paid;
    order
}

fn job_for(order: &Order) -> MintJob {
    MintJob {
        order_id: order.id,
        artwork_id: order.artwork_id,
        metadata: test_metadata(),
    }
}

async fn seed_order(store: &MemoryFulfillmentStore, order: Order) {
    let mut tx = store.begin_transaction().await.expect("tx");
    tx.add_order(order).await.expect("add order");
    tx.commit().await.expect("commit");
}

#[tokio::test]
async fn full_success_links_both_tokens() {
    let h = harness(FakeLedger::new(), FakePinner::new());
    let auth_collection = CollectionId::new(AUTH_COLLECTION);

    // Six earlier certificates so this order's serial is 7
    for _ in 0..6 {
        h.ledger
            .submit_token_mint(&auth_collection, b"ipfs://earlier".to_vec())
            .await
            .expect("pre-mint");
    }

    let order = paid_order();
    let job = job_for(&order);
    seed_order(&h.store, order.clone()).await;

    h.saga.execute(&job).await.expect("saga succeeds");

    let authenticity = h
        .store
        .get_authenticity_token(&order.id)
        .await
        .expect("read")
        .expect("certificate row");
    assert_eq!(authenticity.token_id.to_string(), "0.0.4100/7");
    assert_eq!(authenticity.minted_by, "atelier-mint");

    let ownership = h
        .store
        .get_ownership_token(&order.id)
        .await
        .expect("read")
        .expect("ownership row");
    assert_eq!(ownership.token_id.to_string(), "0.0.4200/1");
    assert_eq!(ownership.authenticity_id, authenticity.id);
    assert_eq!(ownership.owner_id, order.buyer_id);
    assert!(ownership.transferable);
    assert_eq!(ownership.fraction_count, 1);

    let stored = h
        .store
        .get_order(&order.id)
        .await
        .expect("read")
        .expect("order");
    assert_eq!(stored.status, OrderStatus::Fulfilled);
    assert!(h
        .store
        .get_pending_receipt(&order.id)
        .await
        .expect("read")
        .is_none());
    assert_eq!(h.pinner.pins(), 2);
}

#[tokio::test]
async fn pin_outage_classifies_as_mint_failed() {
    let h = harness(FakeLedger::new(), FakePinner::always_failing());
    let order = paid_order();
    let job = job_for(&order);
    seed_order(&h.store, order.clone()).await;

    let err = h.saga.execute(&job).await.expect_err("pin outage");
    assert!(matches!(err, Error::Pin(_)));

    let stored = h
        .store
        .get_order(&order.id)
        .await
        .expect("read")
        .expect("order");
    assert_eq!(stored.status, OrderStatus::MintFailed);
    assert!(h
        .store
        .get_authenticity_token(&order.id)
        .await
        .expect("read")
        .is_none());
    assert_eq!(h.ledger.invocations(), 0);
}

#[tokio::test]
async fn authenticity_exhaustion_leaves_no_rows() {
    let h = harness(FakeLedger::always_failing(), FakePinner::new());
    let order = paid_order();
    let job = job_for(&order);
    seed_order(&h.store, order.clone()).await;

    let err = h.saga.execute(&job).await.expect_err("retries exhausted");
    assert!(matches!(err, Error::Ledger(_)));
    // max_attempts = 2 in the harness client
    assert_eq!(h.ledger.invocations(), 2);

    let stored = h
        .store
        .get_order(&order.id)
        .await
        .expect("read")
        .expect("order");
    assert_eq!(stored.status, OrderStatus::MintFailed);
    assert!(h
        .store
        .get_authenticity_token(&order.id)
        .await
        .expect("read")
        .is_none());
    assert!(h
        .store
        .get_ownership_token(&order.id)
        .await
        .expect("read")
        .is_none());
}

#[tokio::test]
async fn ownership_exhaustion_keeps_the_certificate() {
    let h = harness(FakeLedger::failing_after(1), FakePinner::new());
    let order = paid_order();
    let job = job_for(&order);
    seed_order(&h.store, order.clone()).await;

    let err = h.saga.execute(&job).await.expect_err("retries exhausted");
    assert!(matches!(err, Error::Ledger(_)));
    // One confirmed authenticity mint plus two failed ownership attempts
    assert_eq!(h.ledger.invocations(), 3);

    let stored = h
        .store
        .get_order(&order.id)
        .await
        .expect("read")
        .expect("order");
    assert_eq!(stored.status, OrderStatus::OwnershipMintFailed);
    assert!(h
        .store
        .get_authenticity_token(&order.id)
        .await
        .expect("read")
        .is_some());
    assert!(h
        .store
        .get_ownership_token(&order.id)
        .await
        .expect("read")
        .is_none());
    assert!(h
        .store
        .get_pending_receipt(&order.id)
        .await
        .expect("read")
        .is_none());
}

#[tokio::test]
async fn retry_resumes_at_ownership_without_reminting() {
    let h = harness(FakeLedger::failing_after(1), FakePinner::new());
    let order = paid_order();
    let job = job_for(&order);
    seed_order(&h.store, order.clone()).await;

    h.saga.execute(&job).await.expect_err("first run fails");
    let certificate = h
        .store
        .get_authenticity_token(&order.id)
        .await
        .expect("read")
        .expect("certificate row");

    // Ledger back up; redelivery re-enters the saga
    let healthy = Arc::new(FakeLedger::new());
    let retry_saga = MintSaga::new(
        Arc::new(h.store.clone()),
        LedgerMintClient::new(healthy.clone(), MintClientConfig::default()),
        Arc::new(FakePinner::new()),
        saga_config(),
    );
    retry_saga.execute(&job).await.expect("resume succeeds");

    // Only the ownership mint ran; the certificate row is untouched
    assert_eq!(healthy.invocations(), 1);
    let after = h
        .store
        .get_authenticity_token(&order.id)
        .await
        .expect("read")
        .expect("certificate row");
    assert_eq!(after, certificate);

    let stored = h
        .store
        .get_order(&order.id)
        .await
        .expect("read")
        .expect("order");
    assert_eq!(stored.status, OrderStatus::Fulfilled);
    assert!(h
        .store
        .get_ownership_token(&order.id)
        .await
        .expect("read")
        .is_some());
}

#[tokio::test]
async fn duplicate_delivery_is_a_noop() {
    let h = harness(FakeLedger::new(), FakePinner::new());
    let order = paid_order();
    let job = job_for(&order);
    seed_order(&h.store, order.clone()).await;

    h.saga.execute(&job).await.expect("first delivery");
    let invocations = h.ledger.invocations();
    let certificate = h
        .store
        .get_authenticity_token(&order.id)
        .await
        .expect("read")
        .expect("certificate row");

    h.saga.execute(&job).await.expect("second delivery");
    assert_eq!(h.ledger.invocations(), invocations);
    let after = h
        .store
        .get_authenticity_token(&order.id)
        .await
        .expect("read")
        .expect("certificate row");
    assert_eq!(after, certificate);
}

#[tokio::test]
async fn link_failure_replays_the_receipt() {
    let h = harness(FakeLedger::new(), FakePinner::new());
    let order = paid_order();
    let job = job_for(&order);
    seed_order(&h.store, order.clone()).await;

    // Both mints confirmed, receipt persisted, finalize never committed
    let certificate = AuthenticityToken::new(
        order.id,
        TokenId::new(CollectionId::new(AUTH_COLLECTION), 3),
        "0.0.9127@170.1".to_string(),
        "https://gateway.example.com/ipfs/bafk01".to_string(),
        "atelier-mint".to_string(),
    );
    let receipt = PendingOwnershipReceipt::new(
        order.id,
        TokenId::new(CollectionId::new(OWN_COLLECTION), 9),
        "0.0.9127@170.2".to_string(),
        "https://gateway.example.com/ipfs/bafk02".to_string(),
    );
    let mut tx = h.store.begin_transaction().await.expect("tx");
    tx.update_order_status(&order.id, OrderStatus::Processing)
        .await
        .expect("to processing");
    tx.add_authenticity_token(certificate.clone())
        .await
        .expect("certificate");
    tx.add_pending_receipt(receipt.clone()).await.expect("receipt");
    tx.update_order_status(&order.id, OrderStatus::LinkFailed)
        .await
        .expect("to link_failed");
    tx.commit().await.expect("commit");

    h.saga.execute(&job).await.expect("replay succeeds");

    // Finalize only: no ledger submissions, no pins
    assert_eq!(h.ledger.invocations(), 0);
    assert_eq!(h.pinner.pins(), 0);

    let ownership = h
        .store
        .get_ownership_token(&order.id)
        .await
        .expect("read")
        .expect("ownership row");
    assert_eq!(ownership.token_id, receipt.token_id);
    assert_eq!(ownership.transaction_id, receipt.transaction_id);
    assert_eq!(ownership.authenticity_id, certificate.id);

    let stored = h
        .store
        .get_order(&order.id)
        .await
        .expect("read")
        .expect("order");
    assert_eq!(stored.status, OrderStatus::Fulfilled);
    assert!(h
        .store
        .get_pending_receipt(&order.id)
        .await
        .expect("read")
        .is_none());
}

#[tokio::test]
async fn unconfirmed_payment_is_rejected() {
    let h = harness(FakeLedger::new(), FakePinner::new());
    let order = Order::new(
        "pay_ref_456".to_string(),
        Uuid::new_v4(),
        Uuid::new_v4(),
        90_000,
        Currency::Gbp,
    );
    let job = job_for(&order);
    seed_order(&h.store, order.clone()).await;

    let err = h.saga.execute(&job).await.expect_err("payment pending");
    assert!(matches!(err, Error::PaymentNotConfirmed(id) if id == order.id));

    let stored = h
        .store
        .get_order(&order.id)
        .await
        .expect("read")
        .expect("order");
    assert_eq!(stored.status, OrderStatus::Created);
    assert_eq!(h.ledger.invocations(), 0);
}

#[tokio::test]
async fn unknown_order_is_an_error() {
    let h = harness(FakeLedger::new(), FakePinner::new());
    let job = MintJob {
        order_id: Uuid::new_v4(),
        artwork_id: Uuid::new_v4(),
        metadata: test_metadata(),
    };

    let err = h.saga.execute(&job).await.expect_err("no such order");
    assert!(matches!(err, Error::OrderNotFound(_)));
}
