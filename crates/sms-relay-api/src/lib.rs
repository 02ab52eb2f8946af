//! SMS Relay API Library
//!
//! - Password hashing and signed session tokens
//! - Bearer token authorizer producing a typed identity context
//! - Device/phone number ownership validation
//! - Relay dispatch onto the durable queue
//! - HTTP routes (`/login`, `/sms`, `/user`)

pub mod auth;
pub mod authorizer;
pub mod dispatcher;
pub mod ownership;
pub mod server;

pub use authorizer::{AuthDecision, Authorizer, Effect, IdentityContext};
pub use dispatcher::{DispatchError, RelayDispatcher};
pub use ownership::{OwnershipError, OwnershipValidator};
