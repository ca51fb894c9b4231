//! System keychain vault
//!
//! Maps `${vault.PATH/KEY}` onto the OS credential store with the secret
//! path as the keychain service and the key as the account:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring, KWallet)

use async_trait::async_trait;
use keyring::Entry;

use super::traits::{SecretVault, VaultError, VaultResult};

/// Secret vault backed by the system keychain
///
/// Keychain access is blocking, so lookups run on tokio's blocking pool.
///
/// # Example
///
/// ```no_run
/// use confseal_core::vault::{KeychainVault, SecretVault};
///
/// # async fn demo() {
/// let vault = KeychainVault::new();
/// // service "secret/db", account "password"
/// let password = vault.get("secret/db", "password").await;
/// # }
/// ```
#[derive(Debug, Default, Clone)]
pub struct KeychainVault {
    service_prefix: Option<String>,
}

impl KeychainVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Namespace every service name as `{prefix}:{path}`
    pub fn with_service_prefix(prefix: impl Into<String>) -> Self {
        Self {
            service_prefix: Some(prefix.into()),
        }
    }

    /// Keychain service name for a secret path
    pub fn service_for(&self, path: &str) -> String {
        match &self.service_prefix {
            Some(prefix) => format!("{}:{}", prefix, path),
            None => path.to_string(),
        }
    }
}

#[async_trait]
impl SecretVault for KeychainVault {
    fn name(&self) -> &str {
        "keychain"
    }

    async fn get(&self, path: &str, key: &str) -> VaultResult<String> {
        let service = self.service_for(path);
        let account = key.to_string();

        let lookup = tokio::task::spawn_blocking(move || {
            let entry = Entry::new(&service, &account)?;
            entry.get_password()
        })
        .await
        .map_err(|e| VaultError::Transport(format!("keychain task failed: {}", e)))?;

        match lookup {
            Ok(secret) => Ok(secret),
            Err(keyring::Error::NoEntry) => Err(VaultError::not_found(path, key)),
            Err(e) => Err(VaultError::Transport(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_for() {
        assert_eq!(KeychainVault::new().service_for("secret/db"), "secret/db");
        assert_eq!(
            KeychainVault::with_service_prefix("confseal").service_for("secret/db"),
            "confseal:secret/db"
        );
    }

    #[test]
    fn test_name() {
        assert_eq!(KeychainVault::new().name(), "keychain");
    }
}
