//! Email destination.

use std::sync::Arc;

use sms_relay_core::SecretProvider;
use tracing::{debug, info, instrument};

use super::{ChannelError, ChannelOutcome, DeliveryContext, ForwardChannel};
use crate::mailer::{Mailer, OutboundEmail, SmtpCredentials};

pub const DEFAULT_SMTP_SECRET_NAME: &str = "SMTPCredentials";

const USERNAME_KEY: &str = "username";
const PASSWORD_KEY: &str = "password";

pub struct EmailChannel {
    secrets: Arc<dyn SecretProvider>,
    secret_name: String,
    mailer: Arc<dyn Mailer>,
}

impl EmailChannel {
    pub fn new(
        secrets: Arc<dyn SecretProvider>,
        secret_name: impl Into<String>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            secrets,
            secret_name: secret_name.into(),
            mailer,
        }
    }

    async fn credentials(&self) -> Result<SmtpCredentials, ChannelError> {
        let username = self
            .secrets
            .get(&self.secret_name, Some(USERNAME_KEY))
            .await?;
        let password = self
            .secrets
            .get(&self.secret_name, Some(PASSWORD_KEY))
            .await?;
        Ok(SmtpCredentials { username, password })
    }
}

/// Compose the notification for one message. The sender is the SMTP account.
fn compose(ctx: DeliveryContext<'_>, from: &str, to: &str) -> OutboundEmail {
    let DeliveryContext {
        device,
        phone_number,
        sms,
    } = ctx;

    OutboundEmail {
        from: from.to_string(),
        to: to.to_string(),
        subject: format!("SMS Relay for {} - {}", device.name, phone_number.name),
        body: format!(
            "Device: {} ({})\nPhone Number: {} ({})\nFrom: {}\nMessage: {}",
            device.name, device.id, phone_number.name, phone_number.number, sms.from, sms.body
        ),
    }
}

#[async_trait::async_trait]
impl ForwardChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    #[instrument(skip(self, ctx), fields(sms_id = %ctx.sms.id))]
    async fn deliver(&self, ctx: DeliveryContext<'_>) -> Result<ChannelOutcome, ChannelError> {
        let destination = &ctx.phone_number.forward_destinations.email;
        if destination.is_empty() {
            debug!(phone_number_id = %ctx.phone_number.id, "No email destination, skipping");
            return Ok(ChannelOutcome::Skipped);
        }

        let credentials = self.credentials().await?;
        let email = compose(ctx, &credentials.username, destination.email.trim());
        self.mailer.send(&credentials, email).await?;

        info!(to = %destination.email, "SMS forwarded by email");
        Ok(ChannelOutcome::Delivered)
    }
}
