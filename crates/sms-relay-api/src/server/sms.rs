//! `POST /sms`: a device submits a received message for forwarding.

use axum::body::Bytes;
use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use sms_relay_core::Sms;
use sms_relay_core::storage::unix_timestamp;
use tracing::{error, instrument, warn};

use super::AppState;
use super::error::ApiError;
use crate::authorizer::IdentityContext;
use crate::ownership::OwnershipError;

#[derive(Debug, Deserialize, Serialize)]
pub struct SmsRequest {
    /// Number the message was received on, E.164.
    pub phone_number: String,
    pub body: String,
    /// Sender; defaults to `phone_number` when absent.
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub received_at: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SmsResponse {
    pub job_id: String,
    pub sms_id: String,
}

#[instrument(skip(state, identity, body), fields(principal = %identity.principal_id))]
pub async fn submit_sms(
    State(state): State<AppState>,
    Extension(identity): Extension<IdentityContext>,
    body: Bytes,
) -> Result<Json<SmsResponse>, ApiError> {
    let device_id = match identity.device_id.as_deref() {
        Some(id) if identity.is_device() && !id.is_empty() => id,
        _ => {
            warn!(user_type = %identity.user_type, "Non-device identity submitted SMS");
            return Err(ApiError::BadRequest(
                "Invalid user type or device ID. Only devices can send SMS.",
            ));
        }
    };

    let req: SmsRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "Malformed SMS body");
        ApiError::BadRequest("Invalid request body")
    })?;
    if req.phone_number.is_empty() || req.body.is_empty() {
        return Err(ApiError::BadRequest("Phone number and body are required"));
    }

    let (device, phone_number) = state
        .ownership
        .validate(device_id, &req.phone_number)
        .await
        .map_err(|e| match e {
            OwnershipError::DeviceNotFound(_) => ApiError::NotFound("Device not found"),
            OwnershipError::PhoneNumberNotFound(_) => ApiError::NotFound("Phone number not found"),
            OwnershipError::NotAssociated { .. } => {
                ApiError::Forbidden("Phone number is not associated with the device")
            }
            OwnershipError::Storage(e) => {
                error!(error = %e, "Ownership lookup failed");
                ApiError::Internal
            }
        })?;

    let sms = Sms {
        id: uuid::Uuid::new_v4().to_string(),
        from: req.from.filter(|f| !f.is_empty()).unwrap_or(req.phone_number),
        body: req.body,
        phone_number_id: phone_number.id.clone(),
        received_at: req.received_at,
        created_at: unix_timestamp(),
    };
    let sms_id = sms.id.clone();

    let job_id = state
        .dispatcher
        .dispatch(&device, &phone_number, sms)
        .await
        .map_err(|e| {
            error!(error = %e, "Relay dispatch failed");
            ApiError::Internal
        })?;

    Ok(Json(SmsResponse { job_id, sms_id }))
}
