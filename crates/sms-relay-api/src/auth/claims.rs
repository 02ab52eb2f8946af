//! Session token claims.

use serde::{Deserialize, Serialize};
use sms_relay_core::UserType;

/// Claims embedded in every session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Token id, unique per issuance.
    pub jti: String,
    pub iss: String,
    /// User id.
    pub sub: String,
    pub iat: i64,
    /// Absolute expiry; the token is invalid at or after this instant.
    pub exp: i64,
    pub user_type: UserType,
    /// Display name of the user.
    pub user_name: String,
    /// Linked device for DEVICE accounts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

impl Claims {
    pub fn is_device(&self) -> bool {
        self.user_type == UserType::Device
    }
}
