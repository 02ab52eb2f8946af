//! SQLite storage for SMS Relay.
//!
//! This is the credential store: users, devices, phone numbers, ACL grants,
//! and the relay job table backing [`crate::queue::SqliteQueue`].

mod db;
mod queries;
mod queries_acl;


pub use db::{
    DEFAULT_MAX_CONNECTIONS, DatabaseError, RelayDatabase, pool_size_for_workers, unix_timestamp,
};
pub use queries::{NewPhoneNumber, NewUser};
pub use queries_acl::AclTarget;
