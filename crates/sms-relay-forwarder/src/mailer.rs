//! Outbound mail transport.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Clone)]
pub struct SmtpCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for SmtpCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid address {address}: {reason}")]
    Address { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),
}

#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        credentials: &SmtpCredentials,
        email: OutboundEmail,
    ) -> Result<(), MailError>;
}

/// SMTP delivery with PLAIN authentication.
///
/// With `tls` the session is wrapped in TLS from the first byte (SMTPS);
/// otherwise it is plaintext.
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    server: String,
    port: u16,
    tls: bool,
}

impl SmtpMailer {
    pub fn new(server: impl Into<String>, port: u16, tls: bool) -> Self {
        Self {
            server: server.into(),
            port,
            tls,
        }
    }

    fn transport(
        &self,
        credentials: &SmtpCredentials,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
        let builder = if self.tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.server)
                .map_err(|e| MailError::Transport(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.server)
        };

        Ok(builder
            .port(self.port)
            .credentials(Credentials::new(
                credentials.username.clone(),
                credentials.password.clone(),
            ))
            .authentication(vec![Mechanism::Plain])
            .build())
    }
}

fn mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|e: lettre::address::AddressError| MailError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait::async_trait]
impl Mailer for SmtpMailer {
    async fn send(
        &self,
        credentials: &SmtpCredentials,
        email: OutboundEmail,
    ) -> Result<(), MailError> {
        let message = Message::builder()
            .from(mailbox(&email.from)?)
            .to(mailbox(&email.to)?)
            .subject(email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body)
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport(credentials)?
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        debug!(server = %self.server, port = self.port, tls = self.tls, "Mail handed to SMTP server");
        Ok(())
    }
}
