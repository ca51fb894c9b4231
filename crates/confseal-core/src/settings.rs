//! Service settings file (YAML)
//!
//! Default location is `<config_dir>/confseal/confseal.yaml`
//! (`~/.config/confseal/confseal.yaml` on Linux). A missing file yields the
//! defaults. Key material is never stored here: the cipher passphrase and the
//! vault token are read from the environment variables the file names.

use std::collections::HashSet;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cipher::{AesGcmCipher, Cipher, DisabledCipher};
use crate::env::EnvLookup;
use crate::redact::{KeyPattern, RedactionPolicy};
use crate::resolver::RetryPolicy;
use crate::sources::{FileSourceLoader, SourceSpec};
use crate::vault::{DisabledVault, HttpVault, KeychainVault, KvVersion, MemoryVault, SecretVault};

/// Errors that can occur while loading settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid settings: {0}")]
    Invalid(String),
}

pub type SettingsResult<T> = Result<T, SettingsError>;

/// Top-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Address the HTTP server binds to
    pub listen: SocketAddr,

    /// File-backed sources, loaded at startup and on refresh
    pub sources: Vec<SourceSpec>,

    pub redaction: RedactionSettings,

    pub cipher: CipherSettings,

    pub vault: VaultSettings,

    pub endpoints: EndpointSettings,

    /// Upper bound for one HTTP request, resolve and export included
    pub request_timeout_ms: u64,

    /// Directory relative source paths are resolved against
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionSettings {
    /// Extra key patterns (`db.password`, `*.secret`, `secrets.*`)
    pub patterns: Vec<KeyPattern>,
    /// Also apply `RedactionPolicy::sensitive_defaults`
    pub include_defaults: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CipherSettings {
    /// Environment variable holding the passphrase
    pub key_env: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VaultKind {
    #[default]
    None,
    Memory,
    Http,
    Keychain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultSettings {
    pub kind: VaultKind,
    /// Base URL, required for `http`
    pub address: Option<String>,
    /// Environment variable holding the vault token
    pub token_env: String,
    /// KV engine version for `http` (1 or 2)
    pub kv_version: u8,
    /// Timeout of a single vault call
    pub timeout_ms: u64,
    /// Retries after a timeout or transport error
    pub retries: u32,
    /// Delay before the first retry; doubles on each further retry
    pub backoff_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointSettings {
    /// Expose `POST /decrypt`
    pub decrypt_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8888)),
            sources: Vec::new(),
            redaction: RedactionSettings::default(),
            cipher: CipherSettings::default(),
            vault: VaultSettings::default(),
            endpoints: EndpointSettings::default(),
            request_timeout_ms: 30_000,
            base_dir: None,
        }
    }
}

impl Default for RedactionSettings {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            include_defaults: true,
        }
    }
}

impl Default for CipherSettings {
    fn default() -> Self {
        Self {
            key_env: "CONFSEAL_ENCRYPT_KEY".to_string(),
        }
    }
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self {
            kind: VaultKind::None,
            address: None,
            token_env: "VAULT_TOKEN".to_string(),
            kv_version: 2,
            timeout_ms: 2_000,
            retries: 1,
            backoff_ms: 100,
        }
    }
}

impl Settings {
    /// `<config_dir>/confseal/confseal.yaml`
    pub fn default_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        config_dir.join("confseal").join("confseal.yaml")
    }

    /// Load settings from `path`, falling back to defaults if it does not exist
    ///
    /// Relative source paths are resolved against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> SettingsResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut settings: Settings = serde_yaml::from_str(&content).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        settings.base_dir = path.parent().map(Path::to_path_buf);
        settings.validate()?;
        Ok(settings)
    }

    /// Load from the default location
    pub fn load_default() -> SettingsResult<Self> {
        Self::load(Self::default_path())
    }

    /// Parse settings from YAML text
    pub fn from_yaml(content: &str) -> SettingsResult<Self> {
        let settings: Settings = serde_yaml::from_str(content).map_err(|e| SettingsError::Parse {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check cross-field constraints serde cannot express
    pub fn validate(&self) -> SettingsResult<()> {
        let mut names = HashSet::new();
        for spec in &self.sources {
            if !names.insert(spec.name.as_str()) {
                return Err(SettingsError::Invalid(format!("duplicate source name '{}'", spec.name)));
            }
        }

        if KvVersion::from_number(self.vault.kv_version).is_none() {
            return Err(SettingsError::Invalid(format!(
                "vault.kv_version must be 1 or 2, got {}",
                self.vault.kv_version
            )));
        }

        if self.vault.kind == VaultKind::Http && self.vault.address.is_none() {
            return Err(SettingsError::Invalid("vault.address is required for an http vault".to_string()));
        }

        Ok(())
    }

    /// Redaction policy built from the configured patterns
    pub fn redaction_policy(&self) -> RedactionPolicy {
        let policy = self
            .redaction
            .patterns
            .iter()
            .cloned()
            .fold(RedactionPolicy::new(), RedactionPolicy::with_pattern);

        if self.redaction.include_defaults {
            policy.merge(RedactionPolicy::sensitive_defaults())
        } else {
            policy
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.vault.retries, Duration::from_millis(self.vault.backoff_ms))
    }

    pub fn vault_timeout(&self) -> Duration {
        Duration::from_millis(self.vault.timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Loader for the configured file sources
    pub fn source_loader(&self) -> FileSourceLoader {
        let loader = FileSourceLoader::new(self.sources.clone());
        match &self.base_dir {
            Some(dir) => loader.with_base_dir(dir.clone()),
            None => loader,
        }
    }

    /// Cipher keyed by the passphrase in `cipher.key_env`
    ///
    /// An unset or empty variable disables encryption rather than failing.
    pub fn build_cipher(&self, env: &dyn EnvLookup) -> Arc<dyn Cipher> {
        match env.var(&self.cipher.key_env) {
            Some(passphrase) => match AesGcmCipher::from_passphrase(&passphrase) {
                Ok(cipher) => Arc::new(cipher),
                Err(_) => Arc::new(DisabledCipher),
            },
            None => Arc::new(DisabledCipher),
        }
    }

    /// Vault backend selected by `vault.kind`
    pub fn build_vault(&self, env: &dyn EnvLookup) -> SettingsResult<Arc<dyn SecretVault>> {
        let vault: Arc<dyn SecretVault> = match self.vault.kind {
            VaultKind::None => Arc::new(DisabledVault),
            VaultKind::Memory => Arc::new(MemoryVault::new()),
            VaultKind::Keychain => Arc::new(KeychainVault::new()),
            VaultKind::Http => {
                let address = self.vault.address.clone().ok_or_else(|| {
                    SettingsError::Invalid("vault.address is required for an http vault".to_string())
                })?;
                let kv_version = KvVersion::from_number(self.vault.kv_version).ok_or_else(|| {
                    SettingsError::Invalid(format!("unsupported kv_version {}", self.vault.kv_version))
                })?;
                let token = env.var(&self.vault.token_env).filter(|t| !t.is_empty());
                let vault = HttpVault::new(address, token, kv_version, self.vault_timeout())
                    .map_err(|e| SettingsError::Invalid(e.to_string()))?;
                Arc::new(vault)
            }
        };
        Ok(vault)
    }
}
