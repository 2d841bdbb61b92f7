//! Durable job queue and dispatcher
//!
//! Submission (checkout, operator retry) is decoupled from execution: a
//! [`JobQueue`] persists a [`JobRecord`] and hands the id to a bounded
//! worker pool. Each worker delivers the job to the saga synchronously and
//! owns its redelivery: attempt N+1 never starts before attempt N
//! returned, with exponential backoff between attempts. Jobs that exhaust
//! the policy are marked failed and kept for operator inspection, never
//! dropped. Jobs left queued or running by a previous process are
//! re-enqueued at startup.

use std::sync::Arc;
use std::time::Duration;

use atelier_common::database::{
    DbTransactionFinalizer, DynFulfillmentStore, FulfillmentDatabase, JobsDatabase,
    JobsTransaction,
};
use atelier_common::util::unix_time;
use atelier_common::{JobRecord, JobState, MintJob};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use uuid::Uuid;

use crate::error::Error;
use crate::saga::MintSaga;


/// Redelivery policy applied per job by the dispatcher
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Deliveries before the job is terminally failed
    pub max_attempts: u32,
    /// Delay before the second delivery
    pub base_delay: Duration,
    /// Factor applied to the delay after each failed delivery
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Backoff before redelivering after the given failed attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as i32;
        Duration::from_secs_f64(
            self.base_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent),
        )
    }
}

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Worker pool width
    pub workers: usize,
    /// Redelivery policy
    pub retry: RetryPolicy,
    /// Cadence of the low-priority housekeeping task
    pub housekeeping_interval: Duration,
    /// Age after which terminal job records are purged
    pub finished_job_ttl: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            retry: RetryPolicy::default(),
            housekeeping_interval: Duration::from_secs(3_600),
            finished_job_ttl: Duration::from_secs(7 * 24 * 3_600),
        }
    }
}

/// Handle returned by [`JobQueue::enqueue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobHandle {
    /// Id of the persisted job record
    pub job_id: Uuid,
}

/// Submission side of the queue
#[derive(Clone)]
pub struct JobQueue {
    store: DynFulfillmentStore,
    sender: mpsc::UnboundedSender<Uuid>,
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue").finish_non_exhaustive()
    }
}

impl JobQueue {
    /// Persist a job and hand it to the worker pool
    #[instrument(skip_all, fields(order_id = %job.order_id))]
    pub async fn enqueue(&self, job: MintJob) -> Result<JobHandle, Error> {
        let record = JobRecord::new(job);
        let job_id = record.id;

        let mut tx = self.store.begin_transaction().await?;
        tx.add_job(record).await?;
        tx.commit().await?;

        self.sender.send(job_id).map_err(|_| Error::QueueClosed)?;
        tracing::debug!("Enqueued mint job {}", job_id);
        Ok(JobHandle { job_id })
    }
}

/// Delivers queued jobs to the saga with bounded concurrency
pub struct Dispatcher {
    store: DynFulfillmentStore,
    saga: Arc<MintSaga>,
    config: DispatcherConfig,
    sender: mpsc::UnboundedSender<Uuid>,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<Uuid>>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create a new [`Dispatcher`]
    pub fn new(store: DynFulfillmentStore, saga: Arc<MintSaga>, config: DispatcherConfig) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            store,
            saga,
            config,
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }

    /// Submission handle bound to this dispatcher's channel
    pub fn queue(&self) -> JobQueue {
        JobQueue {
            store: Arc::clone(&self.store),
            sender: self.sender.clone(),
        }
    }

    /// Re-enqueue jobs a previous process left queued or running
    ///
    /// A job found running was interrupted mid-delivery; the saga resumes
    /// it from persisted state, so handing it back to the pool is safe.
    #[instrument(skip_all)]
    pub async fn recover_pending_jobs(&self) -> Result<usize, Error> {
        let mut recovered = 0;
        for state in [JobState::Running, JobState::Queued] {
            for record in self.store.get_jobs_by_state(state).await? {
                if state == JobState::Running {
                    let mut tx = self.store.begin_transaction().await?;
                    tx.update_job(&record.id, JobState::Queued, record.attempts, None)
                        .await?;
                    tx.commit().await?;
                }
                self.sender.send(record.id).map_err(|_| Error::QueueClosed)?;
                recovered += 1;
            }
        }
        if recovered > 0 {
            tracing::info!("Recovered {} interrupted mint jobs", recovered);
        }
        Ok(recovered)
    }

    /// Run the worker pool and the housekeeping task until cancelled
    ///
    /// Workers drain the job they are on before exiting.
    #[instrument(skip_all)]
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), Error> {
        let mut join_set = JoinSet::new();

        for worker_id in 0..self.config.workers.max(1) {
            let receiver = Arc::clone(&self.receiver);
            let store = Arc::clone(&self.store);
            let saga = Arc::clone(&self.saga);
            let policy = self.config.retry.clone();
            let shutdown = shutdown.clone();

            join_set.spawn(async move {
                loop {
                    let job_id = {
                        let mut receiver = receiver.lock().await;
                        tokio::select! {
                            _ = shutdown.cancelled() => break,
                            job = receiver.recv() => match job {
                                Some(job_id) => job_id,
                                None => break,
                            },
                        }
                    };
                    if let Err(err) = deliver_with_backoff(&store, &saga, &policy, job_id).await {
                        tracing::warn!(
                            "Worker {}: mint job {} terminally failed: {}",
                            worker_id,
                            job_id,
                            err
                        );
                    }
                }
                tracing::info!("Mint worker {} stopped", worker_id);
            });
        }

        {
            let store = Arc::clone(&self.store);
            let interval = self.config.housekeeping_interval;
            let ttl = self.config.finished_job_ttl;
            let shutdown = shutdown.clone();
            join_set.spawn(async move {
                run_housekeeping(store, interval, ttl, shutdown).await;
            });
        }

        while let Some(result) = join_set.join_next().await {
            if let Err(err) = result {
                tracing::warn!("A dispatcher task failed: {:?}", err);
            }
        }
        Ok(())
    }
}

/// Deliver one job, redelivering with backoff until success or exhaustion
///
/// Redelivery of a given job is serialized here: the next attempt only
/// starts after the previous saga execution returned.
async fn deliver_with_backoff(
    store: &DynFulfillmentStore,
    saga: &MintSaga,
    policy: &RetryPolicy,
    job_id: Uuid,
) -> Result<(), Error> {
    let record = store
        .get_job(&job_id)
        .await?
        .ok_or(Error::JobNotFound(job_id))?;
    if record.state.is_terminal() {
        tracing::debug!("Job {} already {}, skipping", job_id, record.state);
        return Ok(());
    }

    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = record.attempts;
    loop {
        attempts += 1;
        set_job_state(store, &job_id, JobState::Running, attempts, None).await?;

        match saga.execute(&record.job).await {
            Ok(()) => {
                set_job_state(store, &job_id, JobState::Completed, attempts, None).await?;
                return Ok(());
            }
            Err(err) if attempts >= max_attempts => {
                set_job_state(store, &job_id, JobState::Failed, attempts, Some(err.to_string()))
                    .await?;
                return Err(err);
            }
            Err(err) => {
                let delay = policy.delay_for(attempts);
                tracing::warn!(
                    "Delivery {}/{} of job {} failed: {}; redelivering in {:?}",
                    attempts,
                    max_attempts,
                    job_id,
                    err,
                    delay
                );
                set_job_state(store, &job_id, JobState::Queued, attempts, Some(err.to_string()))
                    .await?;
                tokio::time::sleep(delay).await;
            }
        }
    }
}

async fn set_job_state(
    store: &DynFulfillmentStore,
    job_id: &Uuid,
    state: JobState,
    attempts: u32,
    last_error: Option<String>,
) -> Result<(), Error> {
    let mut tx = store.begin_transaction().await?;
    tx.update_job(job_id, state, attempts, last_error).await?;
    tx.commit().await?;
    Ok(())
}

/// Low-priority periodic purge of old terminal job records
async fn run_housekeeping(
    store: DynFulfillmentStore,
    interval: Duration,
    ttl: Duration,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }

        let cutoff = unix_time().saturating_sub(ttl.as_secs());
        let mut tx = match store.begin_transaction().await {
            Ok(tx) => tx,
            Err(err) => {
                tracing::warn!("Housekeeping could not open a transaction: {}", err);
                continue;
            }
        };
        match tx.purge_finished_jobs(cutoff).await {
            Ok(purged) => {
                if let Err(err) = tx.commit().await {
                    tracing::warn!("Housekeeping commit failed: {}", err);
                } else if purged > 0 {
                    tracing::info!("Housekeeping purged {} finished jobs", purged);
                }
            }
            Err(err) => {
                tracing::warn!("Housekeeping purge failed: {}", err);
                if let Err(rb_err) = tx.rollback().await {
                    tracing::warn!("Housekeeping rollback failed: {}", rb_err);
                }
            }
        }
    }
    tracing::info!("Housekeeping task stopped");
}
