//! In-memory secret vault

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::traits::{SecretVault, VaultError, VaultResult};

/// In-memory vault for tests, fixtures and local development
///
/// # Thread Safety
///
/// The vault uses `RwLock` internally and is safe to use from multiple threads.
#[derive(Debug, Default)]
pub struct MemoryVault {
    secrets: RwLock<HashMap<(String, String), String>>,
}

impl MemoryVault {
    /// Create a new empty vault
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with_secret(
        self,
        path: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.insert(path, key, value);
        self
    }

    /// Store a secret
    pub fn insert(&self, path: impl Into<String>, key: impl Into<String>, value: impl Into<String>) {
        self.secrets
            .write()
            .insert((path.into(), key.into()), value.into());
    }

    /// Delete a secret, returning whether it existed
    pub fn remove(&self, path: &str, key: &str) -> bool {
        self.secrets
            .write()
            .remove(&(path.to_string(), key.to_string()))
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.secrets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SecretVault for MemoryVault {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, path: &str, key: &str) -> VaultResult<String> {
        self.secrets
            .read()
            .get(&(path.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| VaultError::not_found(path, key))
    }
}
