//! Location of the token signing key in the secret provider.

use sms_relay_core::{SecretError, SecretProvider};

pub const DEFAULT_SECRET_NAME: &str = "JWTSecret";
pub const DEFAULT_SECRET_KEY: &str = "JWTKey";

#[derive(Debug, Clone)]
pub struct SigningKeySource {
    pub secret_name: String,
    pub secret_key: String,
}

impl Default for SigningKeySource {
    fn default() -> Self {
        Self {
            secret_name: DEFAULT_SECRET_NAME.into(),
            secret_key: DEFAULT_SECRET_KEY.into(),
        }
    }
}

impl SigningKeySource {
    /// Fetch the current key. An empty key is treated as malformed.
    pub async fn fetch(&self, secrets: &dyn SecretProvider) -> Result<String, SecretError> {
        let key = secrets
            .get(&self.secret_name, Some(&self.secret_key))
            .await?;
        if key.is_empty() {
            return Err(SecretError::Malformed {
                name: self.secret_name.clone(),
                reason: "signing key is empty".into(),
            });
        }
        Ok(key)
    }
}
