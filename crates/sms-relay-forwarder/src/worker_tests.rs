//! Tests for QueueWorker.

#![allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use sms_relay_core::queue::QueueSettings;
use sms_relay_core::{RelayDatabase, RelayQueue, SqliteQueue};

use crate::channel::{ChannelError, ChannelOutcome, DeliveryContext, ForwardChannel};
use crate::forwarder::Forwarder;
use crate::test_helpers::{RecordingMailer, email_forwarder, relay_request, seeded_db};
use crate::worker::{JobOutcome, QueueWorker, WorkerConfig};

/// Channel that never finishes.
struct StuckChannel;

#[async_trait::async_trait]
impl ForwardChannel for StuckChannel {
    fn name(&self) -> &'static str {
        "stuck"
    }

    async fn deliver(&self, _ctx: DeliveryContext<'_>) -> Result<ChannelOutcome, ChannelError> {
        std::future::pending().await
    }
}

fn config() -> WorkerConfig {
    WorkerConfig {
        poll_interval: Duration::from_millis(10),
        invocation_timeout: Duration::from_millis(200),
    }
}

async fn enqueue(queue: &SqliteQueue, phone_number_id: &str) -> String {
    let payload = serde_json::to_vec(&relay_request(phone_number_id)).unwrap();
    queue.enqueue(&payload).await.unwrap()
}

fn setup(
    db: &RelayDatabase,
    settings: QueueSettings,
    forwarder: Forwarder,
) -> (QueueWorker, SqliteQueue) {
    let queue = SqliteQueue::new(db.clone(), settings);
    (
        QueueWorker::new(0, queue.clone(), Arc::new(forwarder), config()),
        queue,
    )
}

#[tokio::test]
async fn empty_queue_is_idle() {
    let db = seeded_db().await;
    let (worker, _) = setup(
        &db,
        QueueSettings::default(),
        email_forwarder(db.clone(), Arc::new(RecordingMailer::default())),
    );
    assert!(matches!(worker.run_once().await.unwrap(), JobOutcome::Idle));
}

#[tokio::test]
async fn delivered_job_is_acked() {
    let db = seeded_db().await;
    let mailer = Arc::new(RecordingMailer::default());
    let (worker, queue) = setup(
        &db,
        QueueSettings::default(),
        email_forwarder(db.clone(), Arc::clone(&mailer)),
    );
    let job_id = enqueue(&queue, "P1").await;

    match worker.run_once().await.unwrap() {
        JobOutcome::Completed { job_id: done, report } => {
            assert_eq!(done, job_id);
            assert_eq!(report.delivered, vec!["email"]);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(queue.pending_count().await.unwrap(), 0);
    assert_eq!(mailer.sent().len(), 1);
}

#[tokio::test]
async fn job_without_destination_completes_without_sending() {
    let db = seeded_db().await;
    let mailer = Arc::new(RecordingMailer::default());
    let (worker, queue) = setup(
        &db,
        QueueSettings::default(),
        email_forwarder(db.clone(), Arc::clone(&mailer)),
    );
    enqueue(&queue, "P2").await;

    assert!(matches!(
        worker.run_once().await.unwrap(),
        JobOutcome::Completed { .. }
    ));
    assert_eq!(queue.pending_count().await.unwrap(), 0);
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn failed_job_is_redelivered_then_dead_lettered() {
    let db = seeded_db().await;
    let settings = QueueSettings {
        visibility_timeout_secs: 0,
        max_attempts: 2,
    };
    let (worker, queue) = setup(
        &db,
        settings,
        email_forwarder(db.clone(), Arc::new(RecordingMailer::failing())),
    );
    enqueue(&queue, "P1").await;

    for _ in 0..2 {
        assert!(matches!(
            worker.run_once().await.unwrap(),
            JobOutcome::Failed { .. }
        ));
        assert_eq!(queue.pending_count().await.unwrap(), 1);
    }

    assert!(matches!(worker.run_once().await.unwrap(), JobOutcome::Idle));
    assert_eq!(queue.pending_count().await.unwrap(), 0);
    assert_eq!(queue.dead_letter_count().await.unwrap(), 1);
}

#[tokio::test]
async fn timed_out_job_stays_queued_until_visible_again() {
    let db = seeded_db().await;
    let stuck: Arc<dyn ForwardChannel> = Arc::new(StuckChannel);
    let (worker, queue) = setup(
        &db,
        QueueSettings::default(),
        Forwarder::new(db.clone(), vec![stuck]),
    );
    enqueue(&queue, "P1").await;

    match worker.run_once().await.unwrap() {
        JobOutcome::Failed { reason, .. } => assert!(reason.contains("timed out"), "{reason}"),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(queue.pending_count().await.unwrap(), 1);
    assert!(matches!(worker.run_once().await.unwrap(), JobOutcome::Idle));
}

#[tokio::test]
async fn undecodable_payload_is_not_acked() {
    let db = seeded_db().await;
    let (worker, queue) = setup(
        &db,
        QueueSettings::default(),
        email_forwarder(db.clone(), Arc::new(RecordingMailer::default())),
    );
    queue.enqueue(b"not json").await.unwrap();

    match worker.run_once().await.unwrap() {
        JobOutcome::Failed { reason, .. } => assert!(reason.starts_with("Undecodable payload")),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(queue.pending_count().await.unwrap(), 1);
}

#[tokio::test]
async fn run_drains_queue_and_stops_on_shutdown() {
    let db = seeded_db().await;
    let mailer = Arc::new(RecordingMailer::default());
    let (worker, queue) = setup(
        &db,
        QueueSettings::default(),
        email_forwarder(db.clone(), Arc::clone(&mailer)),
    );
    enqueue(&queue, "P1").await;
    enqueue(&queue, "P1").await;

    let (tx, rx) = tokio::sync::watch::channel(false);
    let handle = tokio::spawn(async move { worker.run(rx).await });

    for _ in 0..200 {
        if queue.pending_count().await.unwrap() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(queue.pending_count().await.unwrap(), 0);
    assert_eq!(mailer.sent().len(), 2);

    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn invocation_timeout_must_be_shorter_than_visibility() {
    let settings = |visibility_timeout_secs| QueueSettings {
        visibility_timeout_secs,
        max_attempts: 5,
    };
    let config = WorkerConfig {
        poll_interval: Duration::from_secs(1),
        invocation_timeout: Duration::from_secs(30),
    };

    assert!(config.fits_visibility(settings(60)));
    assert!(!config.fits_visibility(settings(30)));
    assert!(!config.fits_visibility(settings(-1)));

    let queue = SqliteQueue::new(seeded_db().await, QueueSettings::default());
    assert!(WorkerConfig::default().fits_visibility(queue.settings()));
}
