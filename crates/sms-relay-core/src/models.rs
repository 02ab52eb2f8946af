//! Data models shared by the API server and the forwarder.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Kind of account behind a [`User`] row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum UserType {
    /// A human account that can log in and view data.
    User,
    /// The login identity of a relay device.
    Device,
}

impl UserType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Device => "DEVICE",
        }
    }
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    /// Argon2id hash. Never leaves the process.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub user_type: UserType,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    pub fn is_device(&self) -> bool {
        self.user_type == UserType::Device
    }
}

/// A relay endpoint. The paired [`User`] (with `user_type = DEVICE`) holds the
/// login credentials; this row holds the phone numbers it may relay for.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Device {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing, default)]
    pub token_hash: String,
    #[sqlx(skip)]
    pub phone_number_ids: HashSet<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Device {
    pub fn is_associated_with(&self, phone_number_id: &str) -> bool {
        self.phone_number_ids.contains(phone_number_id)
    }
}

/// Email forwarding target. An empty address means the channel is not configured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EmailDestination {
    #[sqlx(rename = "forward_email")]
    pub email: String,
}

impl EmailDestination {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.email.trim().is_empty()
    }
}

/// Where messages received on a phone number are forwarded to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ForwardDestinations {
    #[sqlx(flatten)]
    pub email: EmailDestination,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PhoneNumber {
    pub id: String,
    /// E.164, e.g. `+14155550100`.
    pub number: String,
    pub name: String,
    #[sqlx(flatten)]
    pub forward_destinations: ForwardDestinations,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Read-side grant: a device grant covers every number associated with that
/// device, a phone number grant covers that number only.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Acl {
    pub id: String,
    pub user_id: String,
    pub device_id: Option<String>,
    pub phone_number_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One received message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sms {
    pub id: String,
    /// Sender, E.164.
    pub from: String,
    pub body: String,
    /// Phone number the message was received on.
    pub phone_number_id: String,
    /// Reported by the device, unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<i64>,
    pub created_at: i64,
}

/// Queue payload for one relay job.
///
/// Only ids are carried: the forwarder resolves the device and phone number
/// again at delivery time, so destination edits made after enqueue apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayRequest {
    pub device_id: String,
    pub sms: Sms,
}
