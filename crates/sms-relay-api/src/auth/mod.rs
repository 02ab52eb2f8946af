//! Authentication primitives: password hashing, token claims, token signing,
//! and signing key lookup.

pub mod claims;
pub mod jwt;
pub mod password;
pub mod signing_key;

pub use claims::Claims;
pub use jwt::{JwtManager, TokenError};
pub use signing_key::SigningKeySource;
