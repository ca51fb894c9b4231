//! KV secrets engine over HTTP
//!
//! Speaks the HashiCorp-style KV API:
//! - v1: `GET {address}/v1/{path}` → `{"data": {...}}`
//! - v2: `GET {address}/v1/{mount}/data/{rest}` → `{"data": {"data": {...}}}`
//!
//! The token travels in the `X-Vault-Token` header. `404` means the secret
//! does not exist; any other non-success status is a transport error.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::traits::{SecretVault, VaultError, VaultResult};

/// KV engine version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KvVersion {
    #[serde(rename = "1")]
    V1,
    #[default]
    #[serde(rename = "2")]
    V2,
}

impl KvVersion {
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(KvVersion::V1),
            2 => Some(KvVersion::V2),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct KvResponse {
    data: Value,
}

/// Secret vault reached over HTTP
pub struct HttpVault {
    client: reqwest::Client,
    address: String,
    token: Option<String>,
    kv_version: KvVersion,
}

impl HttpVault {
    /// Create a client for the vault at `address`
    ///
    /// `timeout` bounds every request, connect included.
    pub fn new(
        address: impl Into<String>,
        token: Option<String>,
        kv_version: KvVersion,
        timeout: Duration,
    ) -> VaultResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VaultError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            address: address.into().trim_end_matches('/').to_string(),
            token,
            kv_version,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// URL for a secret path
    pub fn url_for(&self, path: &str) -> VaultResult<String> {
        let path = path.trim_matches('/');
        match self.kv_version {
            KvVersion::V1 => Ok(format!("{}/v1/{}", self.address, path)),
            KvVersion::V2 => {
                let (mount, rest) = path.split_once('/').ok_or_else(|| {
                    VaultError::Transport(format!("KV v2 path '{}' needs a mount and a secret path", path))
                })?;
                Ok(format!("{}/v1/{}/data/{}", self.address, mount, rest))
            }
        }
    }

    fn extract(&self, body: KvResponse, path: &str, key: &str) -> VaultResult<String> {
        let data = match self.kv_version {
            KvVersion::V1 => body.data,
            KvVersion::V2 => body.data.get("data").cloned().unwrap_or(Value::Null),
        };

        match data.get(key) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Null) | None => Err(VaultError::not_found(path, key)),
            Some(other) => Ok(other.to_string()),
        }
    }
}

impl std::fmt::Debug for HttpVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpVault")
            .field("address", &self.address)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("kv_version", &self.kv_version)
            .finish()
    }
}

#[async_trait]
impl SecretVault for HttpVault {
    fn name(&self) -> &str {
        "http"
    }

    async fn get(&self, path: &str, key: &str) -> VaultResult<String> {
        let url = self.url_for(path)?;

        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.header("X-Vault-Token", token);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(VaultError::not_found(path, key));
        }
        if !status.is_success() {
            return Err(VaultError::Transport(format!("vault returned HTTP {}", status.as_u16())));
        }

        let body: KvResponse = response.json().await.map_err(map_reqwest_error)?;
        self.extract(body, path, key)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> VaultError {
    if e.is_timeout() {
        VaultError::Timeout
    } else {
        VaultError::Transport(e.to_string())
    }
}
