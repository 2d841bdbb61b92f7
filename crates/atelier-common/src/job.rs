//! Mint job types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::order::ArtworkMetadata;
use crate::util::unix_time;

/// A message on the mint queue
///
/// Created once per order at checkout (or by an operator retry) and
/// consumed at-least-once by the dispatcher. Duplicate delivery is possible
/// and tolerated: the saga re-enters safely from persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintJob {
    /// Order to fulfill
    pub order_id: Uuid,
    /// Artwork being minted
    pub artwork_id: Uuid,
    /// Metadata payload pinned for the authenticity token
    pub metadata: ArtworkMetadata,
}

/// Delivery state of a queued job
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Waiting for a worker
    Queued,
    /// Delivered to a worker, saga in flight
    Running,
    /// Redelivery attempts exhausted; kept for operator inspection
    Failed,
    /// Saga returned success
    Completed,
}

impl JobState {
    /// Whether the job will receive no further deliveries
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Failed | JobState::Completed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Failed => "failed",
            JobState::Completed => "completed",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for JobState {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobState::Queued),
            "running" => Ok(JobState::Running),
            "failed" => Ok(JobState::Failed),
            "completed" => Ok(JobState::Completed),
            _ => Err(crate::Error::UnknownJobState(s.to_string())),
        }
    }
}

/// Durable record of a queued job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Job id
    pub id: Uuid,
    /// The queued message
    pub job: MintJob,
    /// Delivery state
    pub state: JobState,
    /// Delivery attempts made so far
    pub attempts: u32,
    /// Error returned by the most recent failed delivery
    pub last_error: Option<String>,
    /// Unix time the job was enqueued
    pub created_time: u64,
    /// Unix time of the last state change
    pub updated_time: u64,
}

impl JobRecord {
    /// Create a new [`JobRecord`] in the queued state
    pub fn new(job: MintJob) -> Self {
        let now = unix_time();
        Self {
            id: Uuid::new_v4(),
            job,
            state: JobState::Queued,
            attempts: 0,
            last_error: None,
            created_time: now,
            updated_time: now,
        }
    }
}
