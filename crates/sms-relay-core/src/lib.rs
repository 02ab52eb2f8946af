//! SMS Relay Core Library
//!
//! Shared functionality for the SMS Relay API and forwarder:
//! - Account, device, phone number and relay request models
//! - SQLite storage (the credential store)
//! - Durable relay queue with at-least-once delivery
//! - Named secret lookup
//! - Tracing initialization

pub mod models;
pub mod queue;
pub mod secrets;
pub mod storage;
pub mod tracing_init;

pub use models::{
    Acl, Device, EmailDestination, ForwardDestinations, PhoneNumber, RelayRequest, Sms, User,
    UserType,
};
pub use queue::{QueueError, RelayQueue, SqliteQueue};
pub use secrets::{FileSecretProvider, SecretError, SecretProvider, SecretStore};
pub use storage::{DatabaseError, RelayDatabase};
