//! Dual-token mint saga
//!
//! The saga spans two external systems (the ledger and the pinning
//! service) and the local database, so it cannot run under one ACID
//! transaction. Instead each step persists its outcome before the next
//! starts, and re-entry resumes from whatever is already persisted:
//!
//! 1. **Authenticity**: pin the artwork document, mint into the
//!    authenticity collection, persist the certificate row.
//! 2. **Ownership**: pin the ownership document (authenticity reference +
//!    provenance trail), mint into the ownership collection, persist the
//!    receipt.
//! 3. **Finalize**: insert the ownership row, delete the receipt, and move
//!    the order to `fulfilled` in a single local transaction.
//!
//! Failure classification reads persisted state, never the error that was
//! thrown: no authenticity row means `mint_failed`, an authenticity row
//! without a receipt means `ownership_mint_failed`, a pending receipt
//! means `link_failed`. Redelivery therefore resumes at the right step and
//! nothing is minted twice. The existence checks before each mint are the
//! correctness-critical idempotency guard for at-least-once delivery.

use atelier_common::database::{
    DbTransactionFinalizer, DynFulfillmentStore, FulfillmentDatabase, OrdersDatabase,
    OrdersTransaction, ReceiptsDatabase, ReceiptsTransaction, TokensDatabase, TokensTransaction,
};
use atelier_common::pin::DynMetadataPinner;
use atelier_common::{
    AuthenticityToken, CollectionId, MintJob, Order, OrderStatus, OwnershipToken, PaymentStatus,
    PendingOwnershipReceipt, TokenId,
};
use tracing::instrument;
use uuid::Uuid;

use crate::error::Error;
use crate::mint_client::LedgerMintClient;

mod metadata;

#[cfg(test)]
mod tests;

pub use metadata::{ProvenanceEvent, ProvenanceEventKind};

/// Collections and identity the saga mints with
#[derive(Debug, Clone)]
pub struct SagaConfig {
    /// Collection the authenticity certificates are minted into
    pub authenticity_collection: CollectionId,
    /// Collection the ownership tokens are minted into
    pub ownership_collection: CollectionId,
    /// Marker written on every authenticity record
    pub minted_by: String,
}

/// Coordinates the three mint steps for one order
///
/// Collaborators are injected at construction; the saga holds no mutable
/// state of its own and one instance serves all workers.
#[derive(Clone)]
pub struct MintSaga {
    store: DynFulfillmentStore,
    ledger: LedgerMintClient,
    pinner: DynMetadataPinner,
    config: SagaConfig,
}

impl std::fmt::Debug for MintSaga {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MintSaga")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MintSaga {
    /// Create a new [`MintSaga`]
    pub fn new(
        store: DynFulfillmentStore,
        ledger: LedgerMintClient,
        pinner: DynMetadataPinner,
        config: SagaConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            pinner,
            config,
        }
    }

    /// Execute the saga for one delivered job
    ///
    /// Safe to call again for an order that already progressed: a
    /// fulfilled order is a no-op and a partially fulfilled one resumes
    /// from its first incomplete step.
    #[instrument(skip_all, fields(order_id = %job.order_id))]
    pub async fn execute(&self, job: &MintJob) -> Result<(), Error> {
        let order = self
            .store
            .get_order(&job.order_id)
            .await?
            .ok_or(Error::OrderNotFound(job.order_id))?;

        if order.status == OrderStatus::Fulfilled {
            tracing::info!("Order {} already fulfilled, skipping delivery", order.id);
            return Ok(());
        }

        if order.payment_status != PaymentStatus::Paid {
            return Err(Error::PaymentNotConfirmed(order.id));
        }

        if order.status != OrderStatus::Processing {
            let mut tx = self.store.begin_transaction().await?;
            tx.update_order_status(&order.id, OrderStatus::Processing)
                .await?;
            tx.commit().await?;
        }
        let order = Order {
            status: OrderStatus::Processing,
            ..order
        };

        match self.run_steps(job, &order).await {
            Ok(()) => Ok(()),
            Err(err) => {
                let status = self.classify_failure(&order.id).await;
                self.mark_failed(&order.id, status, &err).await;
                Err(err)
            }
        }
    }

    async fn run_steps(&self, job: &MintJob, order: &Order) -> Result<(), Error> {
        let authenticity = match self.store.get_authenticity_token(&order.id).await? {
            Some(token) => {
                tracing::debug!("Authenticity token {} already minted", token.token_id);
                token
            }
            None => self.mint_authenticity(job, order).await?,
        };

        let receipt = match self.store.get_pending_receipt(&order.id).await? {
            Some(receipt) => {
                tracing::info!(
                    "Replaying persisted ownership receipt {} for order {}",
                    receipt.token_id,
                    order.id
                );
                receipt
            }
            None => self.mint_ownership(job, order, &authenticity).await?,
        };

        self.finalize(order, &authenticity, receipt).await
    }

    /// Step 1: pin the artwork document and mint the authenticity certificate
    #[instrument(skip_all)]
    async fn mint_authenticity(
        &self,
        job: &MintJob,
        order: &Order,
    ) -> Result<AuthenticityToken, Error> {
        let document = metadata::authenticity_document(job);
        let pinned = self.pinner.pin_json(&document).await?;
        let payload = metadata::ledger_token_payload(&pinned.content_hash)?;

        let receipt = self
            .ledger
            .mint(&self.config.authenticity_collection, payload)
            .await?;

        // The ledger is the source of truth; surface the receipt in the
        // log stream before the local row is committed.
        tracing::info!(
            transaction_id = %receipt.transaction_id,
            serial = receipt.serial_number,
            "Authenticity mint confirmed for order {}",
            order.id
        );

        let token = AuthenticityToken::new(
            order.id,
            TokenId::new(
                self.config.authenticity_collection.clone(),
                receipt.serial_number,
            ),
            receipt.transaction_id,
            pinned.url,
            self.config.minted_by.clone(),
        );

        let mut tx = self.store.begin_transaction().await?;
        tx.add_authenticity_token(token.clone()).await?;
        tx.commit().await?;

        Ok(token)
    }

    /// Step 2: pin the ownership document and mint the ownership token
    #[instrument(skip_all)]
    async fn mint_ownership(
        &self,
        job: &MintJob,
        order: &Order,
        authenticity: &AuthenticityToken,
    ) -> Result<PendingOwnershipReceipt, Error> {
        let document = metadata::ownership_document(job, order, authenticity);
        let pinned = self.pinner.pin_json(&document).await?;
        let payload = metadata::ledger_token_payload(&pinned.content_hash)?;

        let receipt = self
            .ledger
            .mint(&self.config.ownership_collection, payload)
            .await?;

        tracing::info!(
            transaction_id = %receipt.transaction_id,
            serial = receipt.serial_number,
            "Ownership mint confirmed for order {}",
            order.id
        );

        let pending = PendingOwnershipReceipt::new(
            order.id,
            TokenId::new(
                self.config.ownership_collection.clone(),
                receipt.serial_number,
            ),
            receipt.transaction_id,
            pinned.url,
        );

        let mut tx = self.store.begin_transaction().await?;
        tx.add_pending_receipt(pending.clone()).await?;
        tx.commit().await?;

        Ok(pending)
    }

    /// Step 3: link the ownership row to the certificate and close the order
    ///
    /// Purely local. The row insert, the receipt delete, and the status
    /// transition commit together so the token records and the order state
    /// can never diverge.
    #[instrument(skip_all)]
    async fn finalize(
        &self,
        order: &Order,
        authenticity: &AuthenticityToken,
        receipt: PendingOwnershipReceipt,
    ) -> Result<(), Error> {
        let token = OwnershipToken::from_receipt(&receipt, authenticity.id, order.buyer_id);

        let mut tx = self.store.begin_transaction().await?;
        tx.add_ownership_token(token).await?;
        tx.delete_pending_receipt(&order.id).await?;
        tx.update_order_status(&order.id, OrderStatus::Fulfilled)
            .await?;
        tx.commit().await?;

        tracing::info!("Order {} fulfilled", order.id);
        Ok(())
    }

    /// Decide the failure state from persisted rows, not from the error
    async fn classify_failure(&self, order_id: &Uuid) -> OrderStatus {
        let receipt = self
            .store
            .get_pending_receipt(order_id)
            .await
            .ok()
            .flatten();
        if receipt.is_some() {
            return OrderStatus::LinkFailed;
        }

        let authenticity = self
            .store
            .get_authenticity_token(order_id)
            .await
            .ok()
            .flatten();
        if authenticity.is_some() {
            OrderStatus::OwnershipMintFailed
        } else {
            OrderStatus::MintFailed
        }
    }

    /// Best-effort transition into a failure state
    ///
    /// The original error is what propagates to the dispatcher; a store
    /// that is down while marking is logged, not surfaced.
    async fn mark_failed(&self, order_id: &Uuid, status: OrderStatus, err: &Error) {
        tracing::error!(
            "Mint saga for order {} failed: {}; marking order {}",
            order_id,
            err,
            status
        );

        let mut tx = match self.store.begin_transaction().await {
            Ok(tx) => tx,
            Err(db_err) => {
                tracing::warn!(
                    "Could not open transaction to mark order {} as {}: {}",
                    order_id,
                    status,
                    db_err
                );
                return;
            }
        };
        if let Err(db_err) = tx.update_order_status(order_id, status).await {
            tracing::warn!("Could not mark order {} as {}: {}", order_id, status, db_err);
            if let Err(rb_err) = tx.rollback().await {
                tracing::warn!("Rollback failed for order {}: {}", order_id, rb_err);
            }
            return;
        }
        if let Err(db_err) = tx.commit().await {
            tracing::warn!(
                "Could not commit failure state {} for order {}: {}",
                status,
                order_id,
                db_err
            );
        }
    }
}
