//! `GET /user`: the authenticated account.

use axum::extract::State;
use axum::{Extension, Json};
use sms_relay_core::{DatabaseError, User};
use tracing::{error, instrument};

use super::AppState;
use super::error::ApiError;
use crate::authorizer::IdentityContext;

#[instrument(skip(state, identity), fields(principal = %identity.principal_id))]
pub async fn get_user(
    State(state): State<AppState>,
    Extension(identity): Extension<IdentityContext>,
) -> Result<Json<User>, ApiError> {
    if identity.principal_id.is_empty() {
        return Err(ApiError::BadRequest(
            "User ID not found in authorization context",
        ));
    }

    match state.db.get_user(&identity.principal_id).await {
        Ok(user) => Ok(Json(user)),
        Err(DatabaseError::NotFound(_)) => Err(ApiError::NotFound("User not found")),
        Err(e) => {
            error!(error = %e, "User lookup failed");
            Err(ApiError::Internal)
        }
    }
}
