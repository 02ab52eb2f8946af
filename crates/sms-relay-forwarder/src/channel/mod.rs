//! Forwarding destinations.
//!
//! Each [`ForwardChannel`] inspects the resolved records and either delivers
//! the message, reports that it has nothing to do, or fails.

mod email;

pub use email::{DEFAULT_SMTP_SECRET_NAME, EmailChannel};

use sms_relay_core::{Device, PhoneNumber, SecretError, Sms};

use crate::mailer::MailError;

/// Records a channel needs to deliver one message.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryContext<'a> {
    pub device: &'a Device,
    pub phone_number: &'a PhoneNumber,
    pub sms: &'a Sms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOutcome {
    Delivered,
    /// No destination configured for this channel.
    Skipped,
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Credentials unavailable: {0}")]
    Credentials(#[from] SecretError),

    #[error("Mail delivery failed: {0}")]
    Mail(#[from] MailError),
}

#[async_trait::async_trait]
pub trait ForwardChannel: Send + Sync {
    /// Short name used in logs and reports.
    fn name(&self) -> &'static str;

    async fn deliver(&self, ctx: DeliveryContext<'_>) -> Result<ChannelOutcome, ChannelError>;
}
