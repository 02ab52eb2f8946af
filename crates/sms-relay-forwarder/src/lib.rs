//! SMS Relay Forwarder Library
//!
//! - Destination channels (email over SMTP)
//! - Forwarder that re-resolves a relay request and runs every channel
//! - Queue worker with per-job timeout, ack and redelivery

pub mod channel;
pub mod forwarder;
pub mod mailer;
pub mod worker;

#[cfg(test)]
mod test_helpers;
#[cfg(test)]
mod worker_tests;

pub use channel::{ChannelError, ChannelOutcome, DeliveryContext, EmailChannel, ForwardChannel};
pub use forwarder::{ForwardError, ForwardReport, Forwarder};
pub use mailer::{MailError, Mailer, OutboundEmail, SmtpCredentials, SmtpMailer};
pub use worker::{JobOutcome, QueueWorker, WorkerConfig, WorkerError};
