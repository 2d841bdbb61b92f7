//! In-memory fulfillment store, mainly for testing purposes.
//!
//! Transactions clone the current state, stage writes against the clone,
//! and swap it back on commit while holding the store lock for the whole
//! transaction. That serializes writers, which is acceptable for tests and
//! the dev profile; production deployments put a relational database behind
//! the same traits.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use atelier_common::database::fulfillment::{
    Database, JobsDatabase, JobsTransaction, OrdersDatabase, OrdersTransaction, ReceiptsDatabase,
    ReceiptsTransaction, TokensDatabase, TokensTransaction, Transaction,
};
use atelier_common::database::{DbTransactionFinalizer, Error};
use atelier_common::state::check_order_state_transition;
use atelier_common::util::unix_time;
use atelier_common::{
    AuthenticityToken, JobRecord, JobState, Order, OrderStatus, OwnershipToken,
    PendingOwnershipReceipt,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct Inner {
    orders: HashMap<Uuid, Order>,
    authenticity: HashMap<Uuid, AuthenticityToken>,
    ownership: HashMap<Uuid, OwnershipToken>,
    receipts: HashMap<Uuid, PendingOwnershipReceipt>,
    jobs: HashMap<Uuid, JobRecord>,
}

/// In-memory [`Database`] implementation
#[derive(Debug, Clone, Default)]
pub struct MemoryFulfillmentStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryFulfillmentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with the given orders
    pub async fn new_with_orders(orders: Vec<Order>) -> Result<Self, Error> {
        let store = Self::new();
        {
            let mut inner = store.inner.lock().await;
            for order in orders {
                inner.orders.insert(order.id, order);
            }
        }
        Ok(store)
    }
}

/// Staged write transaction over the store
#[derive(Debug)]
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<Inner>,
    staged: Inner,
}

#[async_trait]
impl OrdersTransaction for MemoryTransaction {
    type Err = Error;

    async fn add_order(&mut self, order: Order) -> Result<(), Self::Err> {
        if self.staged.orders.contains_key(&order.id) {
            return Err(Error::Duplicate);
        }
        self.staged.orders.insert(order.id, order);
        Ok(())
    }

    async fn get_order(&mut self, order_id: &Uuid) -> Result<Option<Order>, Self::Err> {
        Ok(self.staged.orders.get(order_id).cloned())
    }

    async fn update_order_status(
        &mut self,
        order_id: &Uuid,
        new_status: OrderStatus,
    ) -> Result<OrderStatus, Self::Err> {
        let order = self
            .staged
            .orders
            .get_mut(order_id)
            .ok_or(Error::OrderNotFound)?;
        check_order_state_transition(order.status, new_status)?;
        let previous = order.status;
        order.status = new_status;
        order.updated_time = unix_time();
        Ok(previous)
    }
}

#[async_trait]
impl TokensTransaction for MemoryTransaction {
    type Err = Error;

    async fn add_authenticity_token(
        &mut self,
        token: AuthenticityToken,
    ) -> Result<(), Self::Err> {
        if self.staged.authenticity.contains_key(&token.order_id) {
            return Err(Error::Duplicate);
        }
        self.staged.authenticity.insert(token.order_id, token);
        Ok(())
    }

    async fn add_ownership_token(&mut self, token: OwnershipToken) -> Result<(), Self::Err> {
        if self.staged.ownership.contains_key(&token.order_id) {
            return Err(Error::Duplicate);
        }
        let parent_exists = self
            .staged
            .authenticity
            .get(&token.order_id)
            .is_some_and(|auth| auth.id == token.authenticity_id);
        if !parent_exists {
            return Err(Error::AuthenticityNotFound);
        }
        self.staged.ownership.insert(token.order_id, token);
        Ok(())
    }

    async fn get_authenticity_token(
        &mut self,
        order_id: &Uuid,
    ) -> Result<Option<AuthenticityToken>, Self::Err> {
        Ok(self.staged.authenticity.get(order_id).cloned())
    }

    async fn get_ownership_token(
        &mut self,
        order_id: &Uuid,
    ) -> Result<Option<OwnershipToken>, Self::Err> {
        Ok(self.staged.ownership.get(order_id).cloned())
    }
}

#[async_trait]
impl ReceiptsTransaction for MemoryTransaction {
    type Err = Error;

    async fn add_pending_receipt(
        &mut self,
        receipt: PendingOwnershipReceipt,
    ) -> Result<(), Self::Err> {
        if self.staged.receipts.contains_key(&receipt.order_id) {
            return Err(Error::Duplicate);
        }
        self.staged.receipts.insert(receipt.order_id, receipt);
        Ok(())
    }

    async fn get_pending_receipt(
        &mut self,
        order_id: &Uuid,
    ) -> Result<Option<PendingOwnershipReceipt>, Self::Err> {
        Ok(self.staged.receipts.get(order_id).cloned())
    }

    async fn delete_pending_receipt(&mut self, order_id: &Uuid) -> Result<(), Self::Err> {
        self.staged
            .receipts
            .remove(order_id)
            .map(|_| ())
            .ok_or(Error::ReceiptNotFound)
    }
}

#[async_trait]
impl JobsTransaction for MemoryTransaction {
    type Err = Error;

    async fn add_job(&mut self, record: JobRecord) -> Result<(), Self::Err> {
        if self.staged.jobs.contains_key(&record.id) {
            return Err(Error::Duplicate);
        }
        self.staged.jobs.insert(record.id, record);
        Ok(())
    }

    async fn get_job(&mut self, job_id: &Uuid) -> Result<Option<JobRecord>, Self::Err> {
        Ok(self.staged.jobs.get(job_id).cloned())
    }

    async fn update_job(
        &mut self,
        job_id: &Uuid,
        state: JobState,
        attempts: u32,
        last_error: Option<String>,
    ) -> Result<(), Self::Err> {
        let record = self.staged.jobs.get_mut(job_id).ok_or(Error::JobNotFound)?;
        record.state = state;
        record.attempts = attempts;
        record.last_error = last_error;
        record.updated_time = unix_time();
        Ok(())
    }

    async fn purge_finished_jobs(&mut self, older_than: u64) -> Result<u64, Self::Err> {
        let before = self.staged.jobs.len();
        self.staged
            .jobs
            .retain(|_, job| !(job.state.is_terminal() && job.updated_time < older_than));
        Ok((before - self.staged.jobs.len()) as u64)
    }
}

#[async_trait]
impl DbTransactionFinalizer for MemoryTransaction {
    type Err = Error;

    async fn commit(self: Box<Self>) -> Result<(), Self::Err> {
        let MemoryTransaction { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), Self::Err> {
        Ok(())
    }
}

impl Transaction<Error> for MemoryTransaction {}

#[async_trait]
impl OrdersDatabase for MemoryFulfillmentStore {
    type Err = Error;

    async fn get_order(&self, order_id: &Uuid) -> Result<Option<Order>, Self::Err> {
        Ok(self.inner.lock().await.orders.get(order_id).cloned())
    }

    async fn get_order_by_reference(&self, reference: &str) -> Result<Option<Order>, Self::Err> {
        Ok(self
            .inner
            .lock()
            .await
            .orders
            .values()
            .find(|order| order.reference == reference)
            .cloned())
    }
}

#[async_trait]
impl TokensDatabase for MemoryFulfillmentStore {
    type Err = Error;

    async fn get_authenticity_token(
        &self,
        order_id: &Uuid,
    ) -> Result<Option<AuthenticityToken>, Self::Err> {
        Ok(self.inner.lock().await.authenticity.get(order_id).cloned())
    }

    async fn get_ownership_token(
        &self,
        order_id: &Uuid,
    ) -> Result<Option<OwnershipToken>, Self::Err> {
        Ok(self.inner.lock().await.ownership.get(order_id).cloned())
    }
}

#[async_trait]
impl ReceiptsDatabase for MemoryFulfillmentStore {
    type Err = Error;

    async fn get_pending_receipt(
        &self,
        order_id: &Uuid,
    ) -> Result<Option<PendingOwnershipReceipt>, Self::Err> {
        Ok(self.inner.lock().await.receipts.get(order_id).cloned())
    }
}

#[async_trait]
impl JobsDatabase for MemoryFulfillmentStore {
    type Err = Error;

    async fn get_job(&self, job_id: &Uuid) -> Result<Option<JobRecord>, Self::Err> {
        Ok(self.inner.lock().await.jobs.get(job_id).cloned())
    }

    async fn get_jobs_by_state(&self, state: JobState) -> Result<Vec<JobRecord>, Self::Err> {
        Ok(self
            .inner
            .lock()
            .await
            .jobs
            .values()
            .filter(|job| job.state == state)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl Database<Error> for MemoryFulfillmentStore {
    async fn begin_transaction(
        &self,
    ) -> Result<Box<dyn Transaction<Error> + Send + Sync>, Error> {
        let guard = Arc::clone(&self.inner).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, staged }))
    }
}

#[cfg(test)]
mod tests {
    use atelier_common::{ArtworkMetadata, Currency, MintJob, TokenId};

    use super::*;

    fn test_order() -> Order {
        Order::new(
            "ord_ref_1".to_string(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            120_000,
            Currency::Eur,
        )
    }

    fn test_metadata() -> ArtworkMetadata {
        ArtworkMetadata {
            name: "Nightfall II".to_string(),
            description: "Oil on canvas".to_string(),
            image: "https://cdn.example.com/nightfall-ii.png".to_string(),
            buyer_email: "buyer@example.com".to_string(),
            buyer_name: "A. Buyer".to_string(),
            price_cents: 120_000,
            currency: Currency::Eur,
            kind: "physical".to_string(),
        }
    }

    #[tokio::test]
    async fn rollback_discards_staged_writes() {
        let store = MemoryFulfillmentStore::new();
        let order = test_order();
        let order_id = order.id;

        let mut tx = store.begin_transaction().await.expect("tx");
        tx.add_order(order).await.expect("add");
        tx.rollback().await.expect("rollback");

        assert!(store.get_order(&order_id).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn status_update_validates_transition() {
        let order = test_order();
        let order_id = order.id;
        let store = MemoryFulfillmentStore::new_with_orders(vec![order])
            .await
            .expect("store");

        let mut tx = store.begin_transaction().await.expect("tx");
        let previous = tx
            .update_order_status(&order_id, OrderStatus::Processing)
            .await
            .expect("valid transition");
        assert_eq!(previous, OrderStatus::Created);

        let err = tx
            .update_order_status(&order_id, OrderStatus::Created)
            .await
            .expect_err("invalid transition");
        assert!(matches!(err, Error::InvalidStateTransition(_)));
        tx.commit().await.expect("commit");

        let stored = store.get_order(&order_id).await.expect("get").expect("some");
        assert_eq!(stored.status, OrderStatus::Processing);
    }

    #[tokio::test]
    async fn ownership_requires_existing_authenticity_row() {
        let order = test_order();
        let order_id = order.id;
        let buyer_id = order.buyer_id;
        let store = MemoryFulfillmentStore::new_with_orders(vec![order])
            .await
            .expect("store");

        let ownership = OwnershipToken {
            id: Uuid::new_v4(),
            order_id,
            authenticity_id: Uuid::new_v4(),
            token_id: TokenId::new("0.0.200".into(), 1),
            transaction_id: "0.0.7@170.1".to_string(),
            metadata_url: "https://gateway.example.com/ipfs/Qm1".to_string(),
            transferable: true,
            fraction_count: 1,
            owner_id: buyer_id,
            created_time: 0,
        };

        let mut tx = store.begin_transaction().await.expect("tx");
        let err = tx
            .add_ownership_token(ownership.clone())
            .await
            .expect_err("no authenticity row yet");
        assert!(matches!(err, Error::AuthenticityNotFound));

        let auth = AuthenticityToken::new(
            order_id,
            TokenId::new("0.0.100".into(), 7),
            "0.0.7@170.0".to_string(),
            "https://gateway.example.com/ipfs/Qm0".to_string(),
            "atelier-mint".to_string(),
        );
        let auth_id = auth.id;
        tx.add_authenticity_token(auth).await.expect("add auth");

        let ownership = OwnershipToken {
            authenticity_id: auth_id,
            ..ownership
        };
        tx.add_ownership_token(ownership.clone())
            .await
            .expect("linked add");
        let err = tx
            .add_ownership_token(ownership)
            .await
            .expect_err("second row for same order");
        assert!(matches!(err, Error::Duplicate));
        tx.commit().await.expect("commit");
    }

    #[tokio::test]
    async fn purge_removes_only_old_terminal_jobs() {
        let store = MemoryFulfillmentStore::new();
        let job = MintJob {
            order_id: Uuid::new_v4(),
            artwork_id: Uuid::new_v4(),
            metadata: test_metadata(),
        };

        let mut completed = JobRecord::new(job.clone());
        completed.state = JobState::Completed;
        completed.updated_time = 1_000;
        let mut queued = JobRecord::new(job);
        queued.updated_time = 1_000;
        let queued_id = queued.id;

        let mut tx = store.begin_transaction().await.expect("tx");
        tx.add_job(completed).await.expect("add");
        tx.add_job(queued).await.expect("add");
        let purged = tx.purge_finished_jobs(2_000).await.expect("purge");
        assert_eq!(purged, 1);
        tx.commit().await.expect("commit");

        assert!(store.get_job(&queued_id).await.expect("get").is_some());
    }
}
