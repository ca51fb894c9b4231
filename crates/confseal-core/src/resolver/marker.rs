//! Indirection markers on raw property values
//!
//! | Raw value                | Marker                       |
//! |--------------------------|------------------------------|
//! | `{cipher}PAYLOAD`        | `Cipher { payload }`         |
//! | `${vault.PATH/KEY}`      | `Vault { path, key }`        |
//! | `${NAME}`                | `Environment { name, None }` |
//! | `${NAME:default}`        | `Environment { name, Some }` |
//! | anything else            | `Literal`                    |
//!
//! Only whole values are markers; `jdbc:${DB_HOST}` stays a literal.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cipher::CIPHER_PREFIX;

const REFERENCE_OPEN: &str = "${";
const REFERENCE_CLOSE: &str = "}";
const VAULT_PREFIX: &str = "vault.";

/// Indirection detected on a raw value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    /// `{cipher}PAYLOAD`
    Cipher { payload: String },
    /// `${NAME}` or `${NAME:default}`
    Environment { name: String, default: Option<String> },
    /// `${vault.PATH/KEY}`
    Vault { path: String, key: String },
    /// Plain value, used as-is
    Literal,
}

impl Marker {
    /// Detect the marker of a raw value
    pub fn parse(raw: &str) -> Self {
        let value = raw.trim();

        if let Some(payload) = value.strip_prefix(CIPHER_PREFIX) {
            return Marker::Cipher {
                payload: payload.to_string(),
            };
        }

        let inner = match value
            .strip_prefix(REFERENCE_OPEN)
            .and_then(|rest| rest.strip_suffix(REFERENCE_CLOSE))
        {
            Some(inner) if !inner.is_empty() && !inner.contains(REFERENCE_OPEN) => inner,
            _ => return Marker::Literal,
        };

        if let Some(reference) = inner.strip_prefix(VAULT_PREFIX) {
            return match reference.rsplit_once('/') {
                Some((path, key)) if !path.is_empty() && !key.is_empty() => Marker::Vault {
                    path: path.to_string(),
                    key: key.to_string(),
                },
                _ => Marker::Literal,
            };
        }

        let (name, default) = match inner.split_once(':') {
            Some((name, default)) => (name, Some(default.to_string())),
            None => (inner, None),
        };

        if name.is_empty() {
            return Marker::Literal;
        }

        Marker::Environment {
            name: name.to_string(),
            default,
        }
    }

    pub fn kind(&self) -> MarkerKind {
        match self {
            Marker::Cipher { .. } => MarkerKind::Cipher,
            Marker::Environment { .. } => MarkerKind::Environment,
            Marker::Vault { .. } => MarkerKind::Vault,
            Marker::Literal => MarkerKind::Literal,
        }
    }
}

/// Which path a value took through resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    Literal,
    Cipher,
    Environment,
    Vault,
}

impl MarkerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerKind::Literal => "literal",
            MarkerKind::Cipher => "cipher",
            MarkerKind::Environment => "environment",
            MarkerKind::Vault => "vault",
        }
    }
}

impl fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
