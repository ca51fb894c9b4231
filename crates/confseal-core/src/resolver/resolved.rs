//! Result of one resolution pass

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use super::marker::MarkerKind;

/// Why a single key could not be resolved
///
/// Messages carry names (variables, vault paths) and causes, never values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("DecryptionError: {0}")]
    Decryption(String),

    #[error("MissingEnvironmentVariable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("SecretUnavailable: {path}#{key}: {cause}")]
    SecretUnavailable {
        path: String,
        key: String,
        cause: String,
    },
}

impl ResolutionError {
    /// Stable name of the error class
    pub fn kind(&self) -> &'static str {
        match self {
            ResolutionError::Decryption(_) => "DecryptionError",
            ResolutionError::MissingEnvironmentVariable(_) => "MissingEnvironmentVariable",
            ResolutionError::SecretUnavailable { .. } => "SecretUnavailable",
        }
    }
}

/// A resolved value and where it came from
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedProperty {
    value: String,
    source: String,
    marker: MarkerKind,
}

impl ResolvedProperty {
    pub fn new(value: impl Into<String>, source: impl Into<String>, marker: MarkerKind) -> Self {
        Self {
            value: value.into(),
            source: source.into(),
            marker,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Name of the source the raw value came from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn marker(&self) -> MarkerKind {
        self.marker
    }
}

impl fmt::Debug for ResolvedProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedProperty")
            .field("value", &"[HIDDEN]")
            .field("source", &self.source)
            .field("marker", &self.marker)
            .finish()
    }
}

/// A key that failed to resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionFailure {
    pub key: String,
    pub source: String,
    pub error: ResolutionError,
}

impl ResolutionFailure {
    pub fn new(key: impl Into<String>, source: impl Into<String>, error: ResolutionError) -> Self {
        Self {
            key: key.into(),
            source: source.into(),
            error,
        }
    }

    /// Serializable `{key, source, reason}` view
    pub fn report(&self) -> FailureReport {
        FailureReport {
            key: self.key.clone(),
            source: self.source.clone(),
            reason: self.error.to_string(),
        }
    }
}

/// Unresolved key as it appears in exports and API responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReport {
    pub key: String,
    pub source: String,
    pub reason: String,
}

/// Flat, sorted mapping of resolved keys plus the keys that failed
///
/// A failed key never appears among the entries; it is listed in
/// `failures()` instead, ordered by key.
///
/// # Example
///
/// ```
/// use confseal_core::resolver::{MarkerKind, ResolvedConfig, ResolvedProperty};
///
/// let config = ResolvedConfig::new()
///     .with_property("db.user", ResolvedProperty::new("root", "base", MarkerKind::Literal));
///
/// assert_eq!(config.get("db.user"), Some("root"));
/// assert!(config.is_complete());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedConfig {
    entries: BTreeMap<String, ResolvedProperty>,
    failures: Vec<ResolutionFailure>,
}

impl ResolvedConfig {
    /// Create an empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a resolved entry
    pub fn with_property(mut self, key: impl Into<String>, property: ResolvedProperty) -> Self {
        self.insert(key.into(), property);
        self
    }

    /// Builder-style insert of a failure
    pub fn with_failure(mut self, failure: ResolutionFailure) -> Self {
        self.push_failure(failure);
        self
    }

    pub(crate) fn insert(&mut self, key: String, property: ResolvedProperty) {
        self.failures.retain(|f| f.key != key);
        self.entries.insert(key, property);
    }

    pub(crate) fn push_failure(&mut self, failure: ResolutionFailure) {
        self.entries.remove(&failure.key);
        self.failures.retain(|f| f.key != failure.key);
        let at = self.failures.partition_point(|f| f.key < failure.key);
        self.failures.insert(at, failure);
    }

    /// Resolved value of a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(ResolvedProperty::value)
    }

    /// Resolved value with provenance
    pub fn property(&self, key: &str) -> Option<&ResolvedProperty> {
        self.entries.get(key)
    }

    /// Resolved entries in key order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ResolvedProperty)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Keys that failed, in key order
    pub fn failures(&self) -> &[ResolutionFailure] {
        &self.failures
    }

    pub fn failure(&self, key: &str) -> Option<&ResolutionFailure> {
        self.failures.iter().find(|f| f.key == key)
    }

    /// Whether every key resolved
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of resolved keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
