//! `POST /login`: exchange username and password for a session token.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sms_relay_core::{DatabaseError, User};
use tracing::{error, info, instrument, warn};

use super::AppState;
use super::error::ApiError;
use crate::auth::password;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
    /// RFC 3339, UTC.
    pub token_expire_after: String,
}

#[instrument(skip(state, body))]
pub async fn login(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<LoginResponse>, ApiError> {
    let req: LoginRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "Malformed login body");
        ApiError::BadRequest("Invalid request body")
    })?;
    if req.username.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest("Username and password are required"));
    }

    let user = match state.db.get_user_by_username(&req.username).await {
        Ok(user) => user,
        Err(DatabaseError::NotFound(_)) => {
            password::verify_decoy(&req.password);
            warn!(username = %req.username, "Login for unknown user");
            return Err(ApiError::IncorrectCredentials);
        }
        Err(e) => {
            error!(error = %e, "User lookup failed");
            return Err(ApiError::Internal);
        }
    };

    // An unreadable stored hash answers like a wrong password so accounts
    // with legacy or empty hashes stay indistinguishable from missing ones.
    let valid = password::verify_password(&req.password, &user.password_hash).unwrap_or_else(|e| {
        error!(user_id = %user.id, error = %e, "Stored password hash is unreadable");
        password::verify_decoy(&req.password);
        false
    });
    if !valid {
        warn!(username = %req.username, "Failed login attempt");
        return Err(ApiError::IncorrectCredentials);
    }

    let key = state
        .signing_key
        .fetch(state.secrets.as_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Signing key unavailable");
            ApiError::Internal
        })?;

    let expires_at = state.jwt.expiry_from_now();
    let token = state
        .jwt
        .issue(&user, key.as_bytes(), expires_at)
        .map_err(|e| {
            error!(error = %e, "Token creation failed");
            ApiError::Internal
        })?;
    let token_expire_after = DateTime::<Utc>::from_timestamp(expires_at, 0)
        .ok_or(ApiError::Internal)?
        .to_rfc3339_opts(SecondsFormat::Secs, true);

    info!(user_id = %user.id, username = %user.username, "User logged in");

    Ok(Json(LoginResponse {
        user,
        token,
        token_expire_after,
    }))
}
