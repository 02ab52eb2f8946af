//! Session token issuance and verification.
//!
//! Tokens are HMAC-signed JWTs. The signing key is not held here: callers
//! fetch it from the secret provider per call and pass it in.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sms_relay_core::User;
use sms_relay_core::storage::unix_timestamp;

use super::claims::Claims;

pub const ISSUER: &str = "sms-relay";

/// Seven days.
pub const DEFAULT_TOKEN_VALIDITY_SECS: i64 = 7 * 24 * 60 * 60;

const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Header algorithms accepted on verification. Anything outside the HMAC
/// family (RS*, ES*, PS*, EdDSA, `none`) is rejected before signature checks.
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,

    #[error("Unexpected signing algorithm: {0}")]
    InvalidAlgorithm(String),

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Token encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, Clone)]
pub struct JwtManager {
    issuer: String,
    validity_secs: i64,
}

impl Default for JwtManager {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_VALIDITY_SECS)
    }
}

impl JwtManager {
    pub fn new(validity_secs: i64) -> Self {
        Self {
            issuer: ISSUER.to_string(),
            validity_secs,
        }
    }

    pub const fn validity_secs(&self) -> i64 {
        self.validity_secs
    }

    /// Expiry for a token issued now.
    pub fn expiry_from_now(&self) -> i64 {
        unix_timestamp() + self.validity_secs
    }

    /// Sign a token for `user` that expires at `expires_at` (unix seconds).
    pub fn issue(&self, user: &User, secret: &[u8], expires_at: i64) -> Result<String, TokenError> {
        let claims = Claims {
            jti: uuid::Uuid::new_v4().to_string(),
            iss: self.issuer.clone(),
            sub: user.id.clone(),
            iat: unix_timestamp(),
            exp: expires_at,
            user_type: user.user_type,
            user_name: user.name.clone(),
            device_id: user.device_id.clone().filter(|d| !d.is_empty()),
        };

        jsonwebtoken::encode(
            &Header::new(SIGNING_ALGORITHM),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .map_err(|e| TokenError::Encode(e.to_string()))
    }

    /// Verify signature, algorithm, issuer and expiry, returning the claims.
    pub fn verify(&self, token: &str, secret: &[u8]) -> Result<Claims, TokenError> {
        let header =
            jsonwebtoken::decode_header(token).map_err(|e| TokenError::Invalid(e.to_string()))?;
        if !ACCEPTED_ALGORITHMS.contains(&header.alg) {
            return Err(TokenError::InvalidAlgorithm(format!("{:?}", header.alg)));
        }

        let mut validation = Validation::new(header.alg);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iat", "iss", "sub"]);

        let data =
            jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
                .map_err(|e| match e.kind() {
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    ErrorKind::InvalidAlgorithm => {
                        TokenError::InvalidAlgorithm(format!("{:?}", header.alg))
                    }
                    _ => TokenError::Invalid(e.to_string()),
                })?;

        // The library accepts exp == now; expiry here is exclusive.
        if data.claims.exp <= unix_timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use sms_relay_core::UserType;

    use super::*;

    const SECRET: &[u8] = b"test-signing-key-for-testing";

    fn user(user_type: UserType, device_id: Option<&str>) -> User {
        User {
            id: "u1".into(),
            username: "alice".into(),
            password_hash: String::new(),
            user_type,
            name: "Alice".into(),
            device_id: device_id.map(Into::into),
            email: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn issue_valid() -> String {
        let jwt = JwtManager::default();
        jwt.issue(&user(UserType::User, None), SECRET, jwt.expiry_from_now())
            .unwrap()
    }

    #[test]
    fn issue_and_verify_round_trips_identity() {
        let jwt = JwtManager::default();
        let exp = jwt.expiry_from_now();
        let token = jwt
            .issue(&user(UserType::Device, Some("d1")), SECRET, exp)
            .unwrap();

        let claims = jwt.verify(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.exp, exp);
        assert_eq!(claims.user_name, "Alice");
        assert_eq!(claims.device_id.as_deref(), Some("d1"));
        assert!(claims.is_device());
    }

    #[test]
    fn default_validity_is_seven_days() {
        let jwt = JwtManager::default();
        assert_eq!(jwt.validity_secs(), 604_800);
        let token = issue_valid();
        let claims = jwt.verify(&token, SECRET).unwrap();
        // iat is taken inside issue(), possibly a second after the expiry.
        assert!((604_799..=604_800).contains(&(claims.exp - claims.iat)));
    }

    #[test]
    fn empty_device_id_is_omitted() {
        let jwt = JwtManager::default();
        let token = jwt
            .issue(&user(UserType::User, Some("")), SECRET, jwt.expiry_from_now())
            .unwrap();
        assert!(jwt.verify(&token, SECRET).unwrap().device_id.is_none());
    }

    #[test]
    fn expired_token_rejected() {
        let jwt = JwtManager::default();
        let token = jwt
            .issue(&user(UserType::User, None), SECRET, unix_timestamp() - 1)
            .unwrap();
        assert!(matches!(jwt.verify(&token, SECRET), Err(TokenError::Expired)));
    }

    #[test]
    fn token_invalid_at_expiry_instant() {
        let jwt = JwtManager::default();
        let token = jwt
            .issue(&user(UserType::User, None), SECRET, unix_timestamp())
            .unwrap();
        assert!(matches!(jwt.verify(&token, SECRET), Err(TokenError::Expired)));
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = issue_valid();
        assert!(matches!(
            JwtManager::default().verify(&token, b"different-secret"),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn tampered_payload_rejected() {
        let token = issue_valid();
        let parts: Vec<&str> = token.split('.').collect();
        let payload = URL_SAFE_NO_PAD.decode(parts[1]).unwrap();
        let forged = String::from_utf8(payload)
            .unwrap()
            .replace("\"sub\":\"u1\"", "\"sub\":\"u2\"");
        let forged_token = format!(
            "{}.{}.{}",
            parts[0],
            URL_SAFE_NO_PAD.encode(forged.as_bytes()),
            parts[2]
        );

        assert!(JwtManager::default().verify(&forged_token, SECRET).is_err());
    }

    #[test]
    fn none_algorithm_rejected() {
        let token = issue_valid();
        let payload = token.split('.').nth(1).unwrap();
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let unsigned = format!("{header}.{payload}.");

        assert!(JwtManager::default().verify(&unsigned, SECRET).is_err());
    }

    #[test]
    fn asymmetric_algorithm_header_rejected() {
        let token = issue_valid();
        let parts: Vec<&str> = token.split('.').collect();
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let swapped = format!("{header}.{}.{}", parts[1], parts[2]);

        assert!(matches!(
            JwtManager::default().verify(&swapped, SECRET),
            Err(TokenError::InvalidAlgorithm(_))
        ));
    }

    #[test]
    fn other_hmac_variants_accepted() {
        let jwt = JwtManager::default();
        let claims = Claims {
            jti: "j".into(),
            iss: ISSUER.into(),
            sub: "u1".into(),
            iat: unix_timestamp(),
            exp: jwt.expiry_from_now(),
            user_type: UserType::User,
            user_name: "Alice".into(),
            device_id: None,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert_eq!(jwt.verify(&token, SECRET).unwrap(), claims);
    }

    #[test]
    fn foreign_issuer_rejected() {
        let jwt = JwtManager::default();
        let claims = Claims {
            jti: "j".into(),
            iss: "someone-else".into(),
            sub: "u1".into(),
            iat: unix_timestamp(),
            exp: jwt.expiry_from_now(),
            user_type: UserType::User,
            user_name: "Alice".into(),
            device_id: None,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert!(matches!(jwt.verify(&token, SECRET), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn garbage_rejected() {
        assert!(JwtManager::default().verify("not-a-token", SECRET).is_err());
    }
}
