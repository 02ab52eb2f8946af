//! Named secret lookup.
//!
//! A secret is addressed by name and, optionally, by a key inside it. Values
//! behave like a secrets manager entry: either a plain string or a JSON object
//! of strings (stored inline or as a JSON-encoded string).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::warn;

#[async_trait::async_trait]
pub trait SecretProvider: Send + Sync {
    /// Fetch secret `name`, or the `key` entry inside it.
    async fn get(&self, name: &str, key: Option<&str>) -> Result<String, SecretError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("Secret {0} not found")]
    NotFound(String),

    #[error("Key {key} not found in secret {name}")]
    KeyNotFound { name: String, key: String },

    #[error("Secret {name} is malformed: {reason}")]
    Malformed { name: String, reason: String },

    #[error("I/O error reading secrets: {0}")]
    Io(String),
}

/// In-memory set of secrets.
#[derive(Debug, Clone, Default)]
pub struct SecretStore {
    secrets: HashMap<String, Value>,
}

impl SecretStore {
    /// Parse a JSON document whose top level maps secret names to values.
    pub fn from_json(json: &str) -> Result<Self, SecretError> {
        let secrets: HashMap<String, Value> =
            serde_json::from_str(json).map_err(|e| SecretError::Malformed {
                name: "<document>".into(),
                reason: e.to_string(),
            })?;
        Ok(Self { secrets })
    }

    /// Builder-style insert, handy in tests and seeding.
    #[must_use]
    pub fn with_secret(mut self, name: impl Into<String>, value: Value) -> Self {
        self.secrets.insert(name.into(), value);
        self
    }

    pub fn resolve(&self, name: &str, key: Option<&str>) -> Result<String, SecretError> {
        let value = self
            .secrets
            .get(name)
            .ok_or_else(|| SecretError::NotFound(name.to_string()))?;

        let Some(key) = key else {
            return Ok(match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
        };

        let parsed;
        let entries: &Map<String, Value> = match value {
            Value::Object(map) => map,
            Value::String(s) => {
                parsed = serde_json::from_str::<Map<String, Value>>(s).map_err(|e| {
                    SecretError::Malformed {
                        name: name.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                &parsed
            }
            _ => {
                return Err(SecretError::Malformed {
                    name: name.to_string(),
                    reason: "expected a JSON object".into(),
                });
            }
        };

        match entries.get(key) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(SecretError::Malformed {
                name: name.to_string(),
                reason: format!("value of {key} is not a string"),
            }),
            None => Err(SecretError::KeyNotFound {
                name: name.to_string(),
                key: key.to_string(),
            }),
        }
    }
}

#[async_trait::async_trait]
impl SecretProvider for SecretStore {
    async fn get(&self, name: &str, key: Option<&str>) -> Result<String, SecretError> {
        self.resolve(name, key)
    }
}

/// Secrets read from a JSON file on every lookup, so rotating a value only
/// requires rewriting the file.
#[derive(Debug, Clone)]
pub struct FileSecretProvider {
    path: PathBuf,
}

impl FileSecretProvider {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait::async_trait]
impl SecretProvider for FileSecretProvider {
    async fn get(&self, name: &str, key: Option<&str>) -> Result<String, SecretError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "Failed to read secrets file");
            SecretError::Io(e.to_string())
        })?;
        SecretStore::from_json(&content)?.resolve(name, key)
    }
}
