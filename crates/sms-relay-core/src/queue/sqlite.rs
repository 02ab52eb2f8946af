//! SQLite-backed relay queue.

use tracing::{debug, info, warn};

use super::{QueueError, RelayQueue};
use crate::storage::{RelayDatabase, unix_timestamp};

/// Consumer-side tuning.
#[derive(Debug, Clone, Copy)]
pub struct QueueSettings {
    /// How long a received job stays hidden before it is redelivered.
    pub visibility_timeout_secs: i64,
    /// Receives allowed before a job is moved to the dead-letter set.
    pub max_attempts: i64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            visibility_timeout_secs: 60,
            max_attempts: 5,
        }
    }
}

/// A job handed to a consumer.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub id: String,
    pub payload: Vec<u8>,
    /// 1 on first delivery.
    pub attempt: i64,
}

#[derive(sqlx::FromRow)]
struct JobRow {
    id: String,
    payload: Vec<u8>,
    attempts: i64,
}

#[derive(Clone)]
pub struct SqliteQueue {
    db: RelayDatabase,
    settings: QueueSettings,
}

impl SqliteQueue {
    pub const fn new(db: RelayDatabase, settings: QueueSettings) -> Self {
        Self { db, settings }
    }

    pub const fn settings(&self) -> QueueSettings {
        self.settings
    }

    /// Claim the next visible job, if any.
    ///
    /// Claiming is a conditional update on the attempt counter, so two
    /// consumers sharing the database never both receive the same delivery.
    pub async fn receive(&self) -> Result<Option<QueuedJob>, QueueError> {
        loop {
            let now = unix_timestamp();
            let candidate = sqlx::query_as::<_, JobRow>(
                "SELECT id, payload, attempts FROM relay_jobs WHERE dead = 0 AND visible_at <= ? ORDER BY visible_at ASC, created_at ASC LIMIT 1",
            )
            .bind(now)
            .fetch_optional(self.db.pool())
            .await?;

            let Some(row) = candidate else {
                return Ok(None);
            };

            if row.attempts >= self.settings.max_attempts {
                self.dead_letter(&row.id).await?;
                continue;
            }

            let claimed = sqlx::query(
                "UPDATE relay_jobs SET attempts = attempts + 1, visible_at = ? WHERE id = ? AND attempts = ? AND dead = 0",
            )
            .bind(now + self.settings.visibility_timeout_secs)
            .bind(&row.id)
            .bind(row.attempts)
            .execute(self.db.pool())
            .await?;

            if claimed.rows_affected() == 1 {
                debug!(job_id = %row.id, attempt = row.attempts + 1, "Relay job received");
                return Ok(Some(QueuedJob {
                    id: row.id,
                    payload: row.payload,
                    attempt: row.attempts + 1,
                }));
            }
        }
    }

    /// Delete a job after it has been processed.
    pub async fn ack(&self, id: &str) -> Result<(), QueueError> {
        let result = sqlx::query("DELETE FROM relay_jobs WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(QueueError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Record a failed attempt. The job stays hidden until its visibility
    /// timeout runs out and is then delivered again.
    pub async fn release(&self, id: &str, reason: &str) -> Result<(), QueueError> {
        sqlx::query("UPDATE relay_jobs SET last_error = ? WHERE id = ?")
            .bind(reason)
            .bind(id)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    async fn dead_letter(&self, id: &str) -> Result<(), QueueError> {
        sqlx::query("UPDATE relay_jobs SET dead = 1 WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        warn!(
            job_id = %id,
            max_attempts = self.settings.max_attempts,
            "Relay job exceeded max attempts, moved to dead letters"
        );
        Ok(())
    }

    /// Jobs waiting for delivery, visible or in flight.
    pub async fn pending_count(&self) -> Result<i64, QueueError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM relay_jobs WHERE dead = 0")
            .fetch_one(self.db.pool())
            .await?;
        Ok(row.0)
    }

    pub async fn dead_letter_count(&self) -> Result<i64, QueueError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM relay_jobs WHERE dead = 1")
            .fetch_one(self.db.pool())
            .await?;
        Ok(row.0)
    }
}

#[async_trait::async_trait]
impl RelayQueue for SqliteQueue {
    async fn enqueue(&self, payload: &[u8]) -> Result<String, QueueError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO relay_jobs (id, payload, attempts, visible_at, created_at) VALUES (?, ?, 0, ?, ?)",
        )
        .bind(&id)
        .bind(payload)
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await?;

        info!(job_id = %id, bytes = payload.len(), "Relay job enqueued");
        Ok(id)
    }
}
