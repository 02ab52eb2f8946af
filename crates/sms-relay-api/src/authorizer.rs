//! Bearer token authorizer.
//!
//! Turns an `Authorization` header into an [`AuthDecision`]. Every failure
//! (missing header, secret lookup, bad signature, expiry) produces the same
//! `Deny`; the specific reason is only logged.

use std::sync::Arc;

use sms_relay_core::{SecretProvider, UserType};
use tracing::{debug, warn};

use crate::auth::{Claims, JwtManager, SigningKeySource};

pub const UNKNOWN_PRINCIPAL: &str = "unknown";
pub const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Allow,
    Deny,
}

/// Verified caller identity, attached to requests that pass authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityContext {
    pub principal_id: String,
    pub user_type: UserType,
    pub display_name: String,
    pub device_id: Option<String>,
}

impl IdentityContext {
    pub fn is_device(&self) -> bool {
        self.user_type == UserType::Device
    }
}

impl From<Claims> for IdentityContext {
    fn from(claims: Claims) -> Self {
        Self {
            principal_id: claims.sub,
            user_type: claims.user_type,
            display_name: claims.user_name,
            device_id: claims.device_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthDecision {
    pub effect: Effect,
    pub principal_id: String,
    pub identity: Option<IdentityContext>,
}

impl AuthDecision {
    fn deny() -> Self {
        Self {
            effect: Effect::Deny,
            principal_id: UNKNOWN_PRINCIPAL.to_string(),
            identity: None,
        }
    }

    fn allow(identity: IdentityContext) -> Self {
        Self {
            effect: Effect::Allow,
            principal_id: identity.principal_id.clone(),
            identity: Some(identity),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.effect == Effect::Allow
    }
}

pub struct Authorizer {
    secrets: Arc<dyn SecretProvider>,
    jwt: JwtManager,
    signing_key: SigningKeySource,
}

impl Authorizer {
    pub fn new(
        secrets: Arc<dyn SecretProvider>,
        jwt: JwtManager,
        signing_key: SigningKeySource,
    ) -> Self {
        Self {
            secrets,
            jwt,
            signing_key,
        }
    }

    /// Decide whether `bearer_header` grants access to `resource`.
    pub async fn authorize(&self, bearer_header: Option<&str>, resource: &str) -> AuthDecision {
        let Some(token) = bearer_header.and_then(|h| h.strip_prefix(BEARER_PREFIX)) else {
            warn!(resource, "Missing or malformed authorization header");
            return AuthDecision::deny();
        };

        let key = match self.signing_key.fetch(self.secrets.as_ref()).await {
            Ok(key) => key,
            Err(e) => {
                warn!(resource, error = %e, "Signing key unavailable");
                return AuthDecision::deny();
            }
        };

        match self.jwt.verify(token, key.as_bytes()) {
            Ok(claims) => {
                debug!(resource, principal = %claims.sub, "Token accepted");
                AuthDecision::allow(claims.into())
            }
            Err(e) => {
                warn!(resource, error = %e, "Token rejected");
                AuthDecision::deny()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use sms_relay_core::storage::unix_timestamp;
    use sms_relay_core::{SecretStore, User};

    use super::*;

    const KEY: &str = "test-signing-key";

    fn secrets() -> Arc<dyn SecretProvider> {
        Arc::new(SecretStore::default().with_secret("JWTSecret", json!({ "JWTKey": KEY })))
    }

    fn authorizer(secrets: Arc<dyn SecretProvider>) -> Authorizer {
        Authorizer::new(secrets, JwtManager::default(), SigningKeySource::default())
    }

    fn device_user() -> User {
        User {
            id: "u-d1".into(),
            username: "d1".into(),
            password_hash: String::new(),
            user_type: UserType::Device,
            name: "Kitchen phone".into(),
            device_id: Some("d1".into()),
            email: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn bearer(expires_at: i64) -> String {
        let token = JwtManager::default()
            .issue(&device_user(), KEY.as_bytes(), expires_at)
            .unwrap();
        format!("Bearer {token}")
    }

    #[tokio::test]
    async fn valid_token_allows_with_identity() {
        let header = bearer(unix_timestamp() + 3600);
        let decision = authorizer(secrets()).authorize(Some(&header), "/sms").await;

        assert!(decision.is_allowed());
        assert_eq!(decision.principal_id, "u-d1");
        let identity = decision.identity.unwrap();
        assert!(identity.is_device());
        assert_eq!(identity.display_name, "Kitchen phone");
        assert_eq!(identity.device_id.as_deref(), Some("d1"));
    }

    #[tokio::test]
    async fn missing_header_denies() {
        let decision = authorizer(secrets()).authorize(None, "/sms").await;
        assert_eq!(decision.effect, Effect::Deny);
        assert_eq!(decision.principal_id, UNKNOWN_PRINCIPAL);
        assert!(decision.identity.is_none());
    }

    #[tokio::test]
    async fn non_bearer_scheme_denies() {
        let header = bearer(unix_timestamp() + 3600).replacen("Bearer ", "Basic ", 1);
        let decision = authorizer(secrets()).authorize(Some(&header), "/sms").await;
        assert!(!decision.is_allowed());
    }

    #[tokio::test]
    async fn missing_signing_key_fails_closed() {
        let header = bearer(unix_timestamp() + 3600);
        let empty: Arc<dyn SecretProvider> = Arc::new(SecretStore::default());
        let decision = authorizer(empty).authorize(Some(&header), "/sms").await;
        assert!(!decision.is_allowed());
    }

    #[tokio::test]
    async fn rotated_key_denies_old_tokens() {
        let header = bearer(unix_timestamp() + 3600);
        let rotated: Arc<dyn SecretProvider> = Arc::new(
            SecretStore::default().with_secret("JWTSecret", json!({ "JWTKey": "rotated" })),
        );
        let decision = authorizer(rotated).authorize(Some(&header), "/sms").await;
        assert!(!decision.is_allowed());
    }

    #[tokio::test]
    async fn expired_token_denies() {
        let header = bearer(unix_timestamp() - 10);
        let decision = authorizer(secrets()).authorize(Some(&header), "/sms").await;
        assert_eq!(decision.effect, Effect::Deny);
    }

    #[tokio::test]
    async fn tampered_signature_denies() {
        let header = bearer(unix_timestamp() + 3600);
        let idx = header.len() - 6;
        let flipped = if &header[idx..=idx] == "A" { "B" } else { "A" };
        let header = format!("{}{flipped}{}", &header[..idx], &header[idx + 1..]);
        let decision = authorizer(secrets()).authorize(Some(&header), "/sms").await;
        assert!(!decision.is_allowed());
    }
}
