//! Operator retry of failed orders

use atelier_common::database::{
    DbTransactionFinalizer, DynFulfillmentStore, FulfillmentDatabase, OrdersDatabase,
    OrdersTransaction,
};
use atelier_common::{ArtworkMetadata, MintJob, OrderStatus};
use tracing::instrument;
use uuid::Uuid;

use crate::error::Error;
use crate::queue::{JobHandle, JobQueue};

/// Reset a failed order and enqueue a fresh mint job for it
///
/// Rejected unless the order is currently in a failed terminal state. The
/// metadata is rebuilt by the caller from current order and artwork data;
/// which step the saga resumes at is decided by persisted state, not here:
/// an `ownership_mint_failed` order keeps its certificate and only the
/// ownership step reruns, a `mint_failed` order restarts from step one,
/// and a `link_failed` order replays its receipt.
#[instrument(skip(store, queue, metadata))]
pub async fn retry_failed_order(
    store: &DynFulfillmentStore,
    queue: &JobQueue,
    order_id: Uuid,
    metadata: ArtworkMetadata,
) -> Result<JobHandle, Error> {
    let order = store
        .get_order(&order_id)
        .await?
        .ok_or(Error::OrderNotFound(order_id))?;

    if !order.status.is_failed() {
        return Err(Error::NotRetryable(order_id, order.status));
    }

    let mut tx = store.begin_transaction().await?;
    tx.update_order_status(&order_id, OrderStatus::Processing)
        .await?;
    tx.commit().await?;

    tracing::info!(
        "Operator retry: order {} reset from {} to processing",
        order_id,
        order.status
    );

    queue
        .enqueue(MintJob {
            order_id,
            artwork_id: order.artwork_id,
            metadata,
        })
        .await
}
