//! SMS Relay API server
//!
//! Serves `/login`, `/sms` and `/user`, and hands accepted messages to the
//! relay queue for the forwarder.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use sms_relay_api::auth::jwt::DEFAULT_TOKEN_VALIDITY_SECS;
use sms_relay_api::auth::signing_key::{DEFAULT_SECRET_KEY, DEFAULT_SECRET_NAME};
use sms_relay_api::auth::{JwtManager, SigningKeySource};
use sms_relay_api::server::{AppState, build_router};
use sms_relay_core::queue::QueueSettings;
use sms_relay_core::storage::DEFAULT_MAX_CONNECTIONS;
use sms_relay_core::tracing_init::init_tracing;
use sms_relay_core::{FileSecretProvider, RelayDatabase, SqliteQueue};

#[derive(Parser, Debug)]
#[command(name = "sms-relay-api")]
#[command(version, about = "SMS Relay API server - login and SMS submission")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "SMS_RELAY_ADDR", default_value = "0.0.0.0:8080")]
    addr: SocketAddr,

    /// Path to SQLite database file.
    #[arg(long, env = "SMS_RELAY_DB_PATH")]
    db_path: Option<PathBuf>,

    /// JSON file holding named secrets (signing key, SMTP credentials).
    #[arg(long, env = "SMS_RELAY_SECRETS_FILE")]
    secrets_file: PathBuf,

    /// Secret holding the token signing key.
    #[arg(long, env = "SMS_RELAY_JWT_SECRET_NAME", default_value = DEFAULT_SECRET_NAME)]
    jwt_secret_name: String,

    /// Key inside the signing key secret.
    #[arg(long, env = "SMS_RELAY_JWT_SECRET_KEY", default_value = DEFAULT_SECRET_KEY)]
    jwt_secret_key: String,

    /// Session token lifetime in seconds.
    #[arg(long, env = "SMS_RELAY_TOKEN_VALIDITY_SECS", default_value_t = DEFAULT_TOKEN_VALIDITY_SECS)]
    token_validity_secs: i64,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing("sms_relay_api=info,sms_relay_core=info,tower_http=info", args.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %args.addr,
        "Starting sms-relay-api"
    );

    let db_path = match args.db_path {
        Some(path) => path,
        None => default_db_path()?,
    };
    let db = RelayDatabase::open(&db_path, DEFAULT_MAX_CONNECTIONS).await?;

    let secrets = Arc::new(FileSecretProvider::new(&args.secrets_file));
    let queue = Arc::new(SqliteQueue::new(db.clone(), QueueSettings::default()));
    let jwt = JwtManager::new(args.token_validity_secs);
    let signing_key = SigningKeySource {
        secret_name: args.jwt_secret_name,
        secret_key: args.jwt_secret_key,
    };

    let app = build_router(AppState::new(db, secrets, queue, jwt, signing_key));
    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    info!(addr = %args.addr, "API server listening");

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("API server stopped");
    Ok(())
}

fn default_db_path() -> anyhow::Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".sms-relay").join("relay.db"))
}
