//! Durable relay queue.
//!
//! Producers only see [`RelayQueue::enqueue`]. The consumer side lives on
//! [`SqliteQueue`]: `receive` hides a job for the visibility timeout, `ack`
//! deletes it, and a job that is never acked reappears and is delivered again.
//! Delivery is therefore at-least-once and unordered across jobs.

mod sqlite;

pub use sqlite::{QueueSettings, QueuedJob, SqliteQueue};

/// Enqueue side of the relay queue.
#[async_trait::async_trait]
pub trait RelayQueue: Send + Sync {
    /// Durably store `payload`. Returns the job id once the write is acknowledged.
    async fn enqueue(&self, payload: &[u8]) -> Result<String, QueueError>;
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Queue storage error: {0}")]
    Storage(String),

    #[error("Job not found: {0}")]
    NotFound(String),
}

impl From<sqlx::Error> for QueueError {
    fn from(e: sqlx::Error) -> Self {
        Self::Storage(e.to_string())
    }
}
