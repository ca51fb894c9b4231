//! Chained vault with fallback behavior

use std::sync::Arc;

use async_trait::async_trait;

use super::traits::{SecretVault, VaultError, VaultResult};

/// A vault that asks several backends in order
///
/// The first backend holding the secret wins. A `NotFound` moves on to the
/// next backend; any other failure is remembered and reported if nothing
/// later in the chain has the secret.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use confseal_core::vault::{ChainVault, MemoryVault, SecretVault};
///
/// let local = Arc::new(MemoryVault::new().with_secret("secret/db", "password", "local"));
/// let shared = Arc::new(MemoryVault::new());
///
/// let chain = ChainVault::new(vec![local, shared]);
/// assert_eq!(chain.vaults().len(), 2);
/// ```
pub struct ChainVault {
    vaults: Vec<Arc<dyn SecretVault>>,
}

impl ChainVault {
    pub fn new(vaults: Vec<Arc<dyn SecretVault>>) -> Self {
        Self { vaults }
    }

    /// Append a backend to the end of the chain
    pub fn push(mut self, vault: Arc<dyn SecretVault>) -> Self {
        self.vaults.push(vault);
        self
    }

    pub fn vaults(&self) -> &[Arc<dyn SecretVault>] {
        &self.vaults
    }
}

impl std::fmt::Debug for ChainVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.vaults.iter().map(|v| v.name()).collect();
        f.debug_struct("ChainVault").field("vaults", &names).finish()
    }
}

#[async_trait]
impl SecretVault for ChainVault {
    fn name(&self) -> &str {
        "chain"
    }

    async fn get(&self, path: &str, key: &str) -> VaultResult<String> {
        if self.vaults.is_empty() {
            return Err(VaultError::NotConfigured);
        }

        let mut first_failure: Option<VaultError> = None;

        for vault in &self.vaults {
            match vault.get(path, key).await {
                Ok(secret) => return Ok(secret),
                Err(VaultError::NotFound { .. }) => continue,
                Err(e) => {
                    first_failure.get_or_insert(e);
                }
            }
        }

        Err(first_failure.unwrap_or_else(|| VaultError::not_found(path, key)))
    }
}
