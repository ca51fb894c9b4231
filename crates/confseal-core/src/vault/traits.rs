//! Core traits and types for external secret vaults

use async_trait::async_trait;
use thiserror::Error;

/// Errors a vault lookup can report
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    #[error("Secret not found: {path}#{key}")]
    NotFound { path: String, key: String },

    #[error("Vault request timed out")]
    Timeout,

    #[error("Vault transport error: {0}")]
    Transport(String),

    #[error("No secret vault configured")]
    NotConfigured,
}

impl VaultError {
    pub fn not_found(path: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            path: path.into(),
            key: key.into(),
        }
    }

    /// Whether retrying the same lookup could succeed
    ///
    /// A definitive "not found" or a missing vault will not change on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, VaultError::Timeout | VaultError::Transport(_))
    }
}

pub type VaultResult<T> = Result<T, VaultError>;

/// Opaque key/value secret store reached as `get(path, key)`
///
/// Implementations:
/// - `MemoryVault`: In-memory, for tests and fixtures
/// - `HttpVault`: KV secrets engine over HTTP
/// - `KeychainVault`: OS keychain
/// - `ChainVault`: First backend that has the secret wins
/// - `DisabledVault`: Every lookup fails with `NotConfigured`
///
/// # Example
///
/// ```
/// use confseal_core::vault::{MemoryVault, SecretVault};
///
/// # tokio_test_block(async {
/// let vault = MemoryVault::new().with_secret("secret/db", "password", "s3cr3t");
/// assert_eq!(vault.get("secret/db", "password").await.unwrap(), "s3cr3t");
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[async_trait]
pub trait SecretVault: Send + Sync {
    /// Human-readable name of this vault
    fn name(&self) -> &str;

    /// Fetch the secret stored under `key` at `path`
    async fn get(&self, path: &str, key: &str) -> VaultResult<String>;
}

/// Vault used when none is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledVault;

#[async_trait]
impl SecretVault for DisabledVault {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn get(&self, _path: &str, _key: &str) -> VaultResult<String> {
        Err(VaultError::NotConfigured)
    }
}
