//! SMS Relay Forwarder
//!
//! Drains the relay queue and delivers each message to the destinations
//! configured on its phone number.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use sms_relay_core::queue::QueueSettings;
use sms_relay_core::storage::pool_size_for_workers;
use sms_relay_core::tracing_init::init_tracing;
use sms_relay_core::{FileSecretProvider, RelayDatabase, SecretProvider, SqliteQueue};
use sms_relay_forwarder::channel::DEFAULT_SMTP_SECRET_NAME;
use sms_relay_forwarder::{
    EmailChannel, ForwardChannel, Forwarder, QueueWorker, SmtpMailer, WorkerConfig,
};

#[derive(Parser, Debug)]
#[command(name = "sms-relay-forwarder")]
#[command(version, about = "SMS Relay forwarder - delivers queued messages")]
struct Args {
    /// Path to SQLite database file (shared with the API server).
    #[arg(long, env = "SMS_RELAY_DB_PATH")]
    db_path: Option<PathBuf>,

    /// JSON file holding named secrets.
    #[arg(long, env = "SMS_RELAY_SECRETS_FILE")]
    secrets_file: PathBuf,

    /// SMTP server host name.
    #[arg(long, env = "SMTP_SERVER")]
    smtp_server: String,

    /// SMTP server port.
    #[arg(long, env = "SMTP_PORT")]
    smtp_port: u16,

    /// Connect with implicit TLS instead of plaintext.
    #[arg(long, env = "SMTP_TLS")]
    smtp_tls: bool,

    /// Secret holding the SMTP `username` and `password`.
    #[arg(long, env = "SMTP_SECRET_NAME", default_value = DEFAULT_SMTP_SECRET_NAME)]
    smtp_secret_name: String,

    /// Delay between polls of an empty queue, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    poll_interval_ms: u64,

    /// How long a received job stays hidden before redelivery, in seconds.
    #[arg(long, default_value_t = 60)]
    visibility_timeout_secs: i64,

    /// Upper bound on forwarding one job, in seconds.
    #[arg(long, default_value_t = 30)]
    invocation_timeout_secs: u64,

    /// Deliveries before a job is dead-lettered.
    #[arg(long, default_value_t = 5)]
    max_attempts: i64,

    /// Number of concurrent queue workers.
    #[arg(long, default_value_t = 1)]
    workers: usize,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing("sms_relay_forwarder=info,sms_relay_core=info", args.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        smtp_server = %args.smtp_server,
        smtp_port = args.smtp_port,
        smtp_tls = args.smtp_tls,
        workers = args.workers,
        "Starting sms-relay-forwarder"
    );

    let db_path = match args.db_path {
        Some(path) => path,
        None => default_db_path()?,
    };
    let db = RelayDatabase::open(&db_path, pool_size_for_workers(args.workers)).await?;

    let secrets: Arc<dyn SecretProvider> = Arc::new(FileSecretProvider::new(&args.secrets_file));
    let mailer = Arc::new(SmtpMailer::new(args.smtp_server, args.smtp_port, args.smtp_tls));
    let email: Arc<dyn ForwardChannel> =
        Arc::new(EmailChannel::new(secrets, args.smtp_secret_name, mailer));
    let forwarder = Arc::new(Forwarder::new(db.clone(), vec![email]));

    let queue = SqliteQueue::new(
        db,
        QueueSettings {
            visibility_timeout_secs: args.visibility_timeout_secs,
            max_attempts: args.max_attempts,
        },
    );
    let config = WorkerConfig {
        poll_interval: Duration::from_millis(args.poll_interval_ms),
        invocation_timeout: Duration::from_secs(args.invocation_timeout_secs),
    };
    if !config.fits_visibility(queue.settings()) {
        anyhow::bail!("--invocation-timeout-secs must be shorter than --visibility-timeout-secs");
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let mut handles = Vec::with_capacity(args.workers.max(1));
    for id in 0..args.workers.max(1) {
        let worker = QueueWorker::new(id, queue.clone(), Arc::clone(&forwarder), config);
        let rx = shutdown_rx.clone();
        handles.push(tokio::spawn(async move { worker.run(rx).await }));
    }

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");
    let _ = shutdown_tx.send(true);

    for handle in handles {
        if let Err(e) = handle.await {
            error!(error = %e, "Queue worker panicked");
        }
    }

    info!("Forwarder stopped");
    Ok(())
}

fn default_db_path() -> anyhow::Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".sms-relay").join("relay.db"))
}
