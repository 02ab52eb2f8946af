//! HTTP surface: `/login`, `/sms`, `/user` and `/health`.

mod error;
mod health;
mod login;
mod middleware;
mod sms;
mod user;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use sms_relay_core::{RelayDatabase, RelayQueue, SecretProvider};
use tower_http::trace::TraceLayer;

use crate::auth::{JwtManager, SigningKeySource};
use crate::authorizer::Authorizer;
use crate::dispatcher::RelayDispatcher;
use crate::ownership::OwnershipValidator;

pub use error::ApiError;
pub use login::{LoginRequest, LoginResponse};
pub use sms::{SmsRequest, SmsResponse};

/// Shared, read-only handles for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: RelayDatabase,
    pub secrets: Arc<dyn SecretProvider>,
    pub jwt: Arc<JwtManager>,
    pub signing_key: Arc<SigningKeySource>,
    pub authorizer: Arc<Authorizer>,
    pub ownership: OwnershipValidator,
    pub dispatcher: RelayDispatcher,
}

impl AppState {
    pub fn new(
        db: RelayDatabase,
        secrets: Arc<dyn SecretProvider>,
        queue: Arc<dyn RelayQueue>,
        jwt: JwtManager,
        signing_key: SigningKeySource,
    ) -> Self {
        let authorizer = Authorizer::new(Arc::clone(&secrets), jwt.clone(), signing_key.clone());
        Self {
            ownership: OwnershipValidator::new(db.clone()),
            dispatcher: RelayDispatcher::new(queue),
            db,
            secrets,
            jwt: Arc::new(jwt),
            signing_key: Arc::new(signing_key),
            authorizer: Arc::new(authorizer),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/sms", post(sms::submit_sms))
        .route("/user", get(user::get_user))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_identity,
        ));

    Router::new()
        .route("/login", post(login::login))
        .route("/health", get(health::health))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
