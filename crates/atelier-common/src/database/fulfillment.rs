//! Fulfillment store traits
//!
//! Trait-per-concern with a writer/reader split: `*Transaction` traits are
//! the writer side, scoped to one database transaction obtained from
//! [`Database::begin_transaction`]; the `*Database` traits are lock-free
//! reads against committed state.

use async_trait::async_trait;
use uuid::Uuid;

use super::{DbTransactionFinalizer, Error};
use crate::job::{JobRecord, JobState};
use crate::order::{Order, OrderStatus};
use crate::token::{AuthenticityToken, OwnershipToken, PendingOwnershipReceipt};

/// Order writer trait
#[async_trait]
pub trait OrdersTransaction {
    /// Orders Database Error
    type Err: Into<Error> + From<Error>;

    /// Add [`Order`]
    async fn add_order(&mut self, order: Order) -> Result<(), Self::Err>;

    /// Get [`Order`] for update within this transaction
    async fn get_order(&mut self, order_id: &Uuid) -> Result<Option<Order>, Self::Err>;

    /// Update the order status, validating the transition
    ///
    /// Implementations must apply
    /// [`crate::state::check_order_state_transition`] and refresh the
    /// order's `updated_time`. Returns the previous status.
    async fn update_order_status(
        &mut self,
        order_id: &Uuid,
        new_status: OrderStatus,
    ) -> Result<OrderStatus, Self::Err>;
}

/// Order reader trait
#[async_trait]
pub trait OrdersDatabase {
    /// Orders Database Error
    type Err: Into<Error> + From<Error>;

    /// Get [`Order`]
    async fn get_order(&self, order_id: &Uuid) -> Result<Option<Order>, Self::Err>;

    /// Get [`Order`] by its payment reference
    async fn get_order_by_reference(&self, reference: &str) -> Result<Option<Order>, Self::Err>;
}

/// Token writer trait
#[async_trait]
pub trait TokensTransaction {
    /// Tokens Database Error
    type Err: Into<Error> + From<Error>;

    /// Add [`AuthenticityToken`]
    ///
    /// Errors with [`Error::Duplicate`] if the order already has one.
    async fn add_authenticity_token(&mut self, token: AuthenticityToken)
        -> Result<(), Self::Err>;

    /// Add [`OwnershipToken`]
    ///
    /// Errors with [`Error::Duplicate`] if the order already has one and
    /// with [`Error::AuthenticityNotFound`] if the referenced authenticity
    /// row does not exist.
    async fn add_ownership_token(&mut self, token: OwnershipToken) -> Result<(), Self::Err>;

    /// Get [`AuthenticityToken`] by order id within this transaction
    async fn get_authenticity_token(
        &mut self,
        order_id: &Uuid,
    ) -> Result<Option<AuthenticityToken>, Self::Err>;

    /// Get [`OwnershipToken`] by order id within this transaction
    async fn get_ownership_token(
        &mut self,
        order_id: &Uuid,
    ) -> Result<Option<OwnershipToken>, Self::Err>;
}

/// Token reader trait
#[async_trait]
pub trait TokensDatabase {
    /// Tokens Database Error
    type Err: Into<Error> + From<Error>;

    /// Get [`AuthenticityToken`] by order id
    async fn get_authenticity_token(
        &self,
        order_id: &Uuid,
    ) -> Result<Option<AuthenticityToken>, Self::Err>;

    /// Get [`OwnershipToken`] by order id
    async fn get_ownership_token(
        &self,
        order_id: &Uuid,
    ) -> Result<Option<OwnershipToken>, Self::Err>;
}

/// Pending receipt writer trait
#[async_trait]
pub trait ReceiptsTransaction {
    /// Receipts Database Error
    type Err: Into<Error> + From<Error>;

    /// Add [`PendingOwnershipReceipt`]
    async fn add_pending_receipt(
        &mut self,
        receipt: PendingOwnershipReceipt,
    ) -> Result<(), Self::Err>;

    /// Get [`PendingOwnershipReceipt`] by order id within this transaction
    async fn get_pending_receipt(
        &mut self,
        order_id: &Uuid,
    ) -> Result<Option<PendingOwnershipReceipt>, Self::Err>;

    /// Delete the pending receipt for an order
    async fn delete_pending_receipt(&mut self, order_id: &Uuid) -> Result<(), Self::Err>;
}

/// Pending receipt reader trait
#[async_trait]
pub trait ReceiptsDatabase {
    /// Receipts Database Error
    type Err: Into<Error> + From<Error>;

    /// Get [`PendingOwnershipReceipt`] by order id
    async fn get_pending_receipt(
        &self,
        order_id: &Uuid,
    ) -> Result<Option<PendingOwnershipReceipt>, Self::Err>;
}

/// Job writer trait
#[async_trait]
pub trait JobsTransaction {
    /// Jobs Database Error
    type Err: Into<Error> + From<Error>;

    /// Add [`JobRecord`]
    async fn add_job(&mut self, record: JobRecord) -> Result<(), Self::Err>;

    /// Get [`JobRecord`] for update within this transaction
    async fn get_job(&mut self, job_id: &Uuid) -> Result<Option<JobRecord>, Self::Err>;

    /// Update delivery state, attempt count, and last error of a job
    async fn update_job(
        &mut self,
        job_id: &Uuid,
        state: JobState,
        attempts: u32,
        last_error: Option<String>,
    ) -> Result<(), Self::Err>;

    /// Delete terminal job records whose last update is older than the cutoff
    ///
    /// Returns the number of records removed.
    async fn purge_finished_jobs(&mut self, older_than: u64) -> Result<u64, Self::Err>;
}

/// Job reader trait
#[async_trait]
pub trait JobsDatabase {
    /// Jobs Database Error
    type Err: Into<Error> + From<Error>;

    /// Get [`JobRecord`]
    async fn get_job(&self, job_id: &Uuid) -> Result<Option<JobRecord>, Self::Err>;

    /// Get all [`JobRecord`]s in a given state
    async fn get_jobs_by_state(&self, state: JobState) -> Result<Vec<JobRecord>, Self::Err>;
}

/// Base database writer
pub trait Transaction<Error>:
    DbTransactionFinalizer<Err = Error>
    + OrdersTransaction<Err = Error>
    + TokensTransaction<Err = Error>
    + ReceiptsTransaction<Err = Error>
    + JobsTransaction<Err = Error>
{
}

/// Fulfillment Database trait
#[async_trait]
pub trait Database<Error>:
    OrdersDatabase<Err = Error>
    + TokensDatabase<Err = Error>
    + ReceiptsDatabase<Err = Error>
    + JobsDatabase<Err = Error>
{
    /// Begins a transaction
    async fn begin_transaction(&self) -> Result<Box<dyn Transaction<Error> + Send + Sync>, Error>;
}

/// Type alias for a shared fulfillment store
pub type DynFulfillmentStore = std::sync::Arc<dyn Database<Error> + Send + Sync>;
