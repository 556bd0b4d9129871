//! Secret storage for the database password

use crate::error::Result;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Key under which the database password is stored.
pub const PASSWORD_KEY: &str = "dbPass";

/// Host-provided secure storage.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Look up a secret. `None` when nothing has been stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<SecretString>>;

    /// Store (or replace) a secret.
    async fn store(&self, key: &str, value: SecretString) -> Result<()>;
}

/// Process-local secret store.
#[derive(Default)]
pub struct MemorySecretStore {
    secrets: RwLock<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with the database password.
    pub fn with_password(password: impl Into<String>) -> Self {
        let mut secrets = HashMap::new();
        secrets.insert(PASSWORD_KEY.to_string(), password.into());
        Self {
            secrets: RwLock::new(secrets),
        }
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get(&self, key: &str) -> Result<Option<SecretString>> {
        let secrets = self.secrets.read().await;
        Ok(secrets.get(key).map(|s| SecretString::from(s.clone())))
    }

    async fn store(&self, key: &str, value: SecretString) -> Result<()> {
        let mut secrets = self.secrets.write().await;
        secrets.insert(key.to_string(), value.expose_secret().to_string());
        Ok(())
    }
}
