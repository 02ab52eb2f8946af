//! Shared fixtures for forwarder and worker tests.

#![allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use serde_json::json;
use sms_relay_core::storage::NewPhoneNumber;
use sms_relay_core::{RelayDatabase, RelayRequest, SecretProvider, SecretStore, Sms};

use crate::channel::{EmailChannel, ForwardChannel};
use crate::forwarder::Forwarder;
use crate::mailer::{MailError, Mailer, OutboundEmail, SmtpCredentials};

pub const SMTP_USERNAME: &str = "relay@example.com";

/// Mailer that records every message instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutboundEmail>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        credentials: &SmtpCredentials,
        email: OutboundEmail,
    ) -> Result<(), MailError> {
        assert_eq!(credentials.username, SMTP_USERNAME);
        if self.fail {
            return Err(MailError::Transport("connection refused".into()));
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

pub fn smtp_secrets() -> Arc<dyn SecretProvider> {
    Arc::new(SecretStore::default().with_secret(
        "SMTPCredentials",
        json!({ "username": SMTP_USERNAME, "password": "smtp-password" }),
    ))
}

/// Device D1 relaying for P1 (emails alice@example.com) and P2 (no email).
pub async fn seeded_db() -> RelayDatabase {
    let db = RelayDatabase::open_in_memory().await.unwrap();
    db.create_device("D1", "Kitchen phone", "").await.unwrap();
    db.create_phone_number(&NewPhoneNumber {
        id: "P1",
        number: "+15550001",
        name: "Home",
        forward_email: Some("alice@example.com"),
    })
    .await
    .unwrap();
    db.create_phone_number(&NewPhoneNumber {
        id: "P2",
        number: "+15550002",
        name: "Work",
        forward_email: None,
    })
    .await
    .unwrap();
    db.associate_phone_number("D1", "P1").await.unwrap();
    db.associate_phone_number("D1", "P2").await.unwrap();
    db
}

pub fn relay_request(phone_number_id: &str) -> RelayRequest {
    RelayRequest {
        device_id: "D1".into(),
        sms: Sms {
            id: "sms-1".into(),
            from: "+15557777".into(),
            body: "Your code is 1234".into(),
            phone_number_id: phone_number_id.into(),
            received_at: None,
            created_at: 1_700_000_000,
        },
    }
}

pub fn email_forwarder(db: RelayDatabase, mailer: Arc<RecordingMailer>) -> Forwarder {
    let channel: Arc<dyn ForwardChannel> =
        Arc::new(EmailChannel::new(smtp_secrets(), "SMTPCredentials", mailer));
    Forwarder::new(db, vec![channel])
}
