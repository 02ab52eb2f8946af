//! Queue consumer.
//!
//! A worker receives one job at a time, forwards it under a timeout, and acks
//! it on success. Failed or timed-out jobs are released and come back after
//! the queue's visibility timeout; the queue dead-letters them once their
//! attempts run out. There is no in-process retry loop.

use std::sync::Arc;
use std::time::Duration;

use sms_relay_core::queue::QueueSettings;
use sms_relay_core::{QueueError, RelayRequest, SqliteQueue};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::forwarder::{ForwardReport, Forwarder};

#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    /// Sleep between polls when the queue is empty.
    pub poll_interval: Duration,
    /// Upper bound on one forward.
    pub invocation_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            invocation_timeout: Duration::from_secs(30),
        }
    }
}

impl WorkerConfig {
    /// A job must finish (or time out) before the queue makes it visible to
    /// another worker, otherwise one message is forwarded concurrently.
    pub fn fits_visibility(&self, settings: QueueSettings) -> bool {
        u64::try_from(settings.visibility_timeout_secs)
            .is_ok_and(|secs| self.invocation_timeout < Duration::from_secs(secs))
    }
}

#[derive(Debug)]
pub enum JobOutcome {
    /// Nothing visible in the queue.
    Idle,
    Completed {
        job_id: String,
        report: ForwardReport,
    },
    /// Released for redelivery.
    Failed { job_id: String, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

pub struct QueueWorker {
    id: usize,
    queue: SqliteQueue,
    forwarder: Arc<Forwarder>,
    config: WorkerConfig,
}

impl QueueWorker {
    pub const fn new(
        id: usize,
        queue: SqliteQueue,
        forwarder: Arc<Forwarder>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            id,
            queue,
            forwarder,
            config,
        }
    }

    /// Receive and process at most one job.
    #[instrument(skip(self), fields(worker = self.id))]
    pub async fn run_once(&self) -> Result<JobOutcome, WorkerError> {
        let Some(job) = self.queue.receive().await? else {
            return Ok(JobOutcome::Idle);
        };
        debug!(job_id = %job.id, attempt = job.attempt, "Processing relay job");

        let reason = match serde_json::from_slice::<RelayRequest>(&job.payload) {
            Err(e) => format!("Undecodable payload: {e}"),
            Ok(request) => {
                match tokio::time::timeout(
                    self.config.invocation_timeout,
                    self.forwarder.forward(&request),
                )
                .await
                {
                    Ok(Ok(report)) => {
                        self.queue.ack(&job.id).await?;
                        return Ok(JobOutcome::Completed {
                            job_id: job.id,
                            report,
                        });
                    }
                    Ok(Err(e)) => e.to_string(),
                    Err(_) => format!(
                        "Forwarding timed out after {}ms",
                        self.config.invocation_timeout.as_millis()
                    ),
                }
            }
        };

        warn!(job_id = %job.id, attempt = job.attempt, reason = %reason, "Relay job failed, releasing");
        self.queue.release(&job.id, &reason).await?;
        Ok(JobOutcome::Failed {
            job_id: job.id,
            reason,
        })
    }

    /// Poll until `shutdown` flips to true (or its sender is dropped).
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(worker = self.id, "Queue worker started");

        while !*shutdown.borrow() {
            let idle = match self.run_once().await {
                Ok(JobOutcome::Idle) => true,
                Ok(_) => false,
                Err(e) => {
                    error!(worker = self.id, error = %e, "Queue access failed");
                    true
                }
            };

            if idle {
                tokio::select! {
                    () = tokio::time::sleep(self.config.poll_interval) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        }

        info!(worker = self.id, "Queue worker stopped");
    }
}
