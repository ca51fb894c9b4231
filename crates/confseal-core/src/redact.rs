//! Key patterns whose values never leave the system
//!
//! Patterns are matched against resolved keys, ASCII case-insensitively:
//! - `db.password`: exact key
//! - `*.password`: any key whose last segment is `password`, including the
//!   bare key `password`
//! - `secrets.*`: any key below `secrets.`
//! - `*`: every key
//!
//! Redaction only decides *whether* a value is replaced; the replacement is
//! always the fixed `REDACTED` marker, so nothing about the original value
//! (length, prefix) survives.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Marker emitted in place of a redacted value
pub const REDACTED: &str = "***REDACTED***";

/// Patterns enabled by `RedactionPolicy::sensitive_defaults`
pub const SENSITIVE_DEFAULTS: &[&str] = &["*.password", "*.secret", "*.token", "*.key", "*.credentials"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("Empty redaction pattern")]
    Empty,

    #[error("Invalid redaction pattern '{0}': '*' is only allowed as a whole leading or trailing segment")]
    Invalid(String),
}

/// One parsed redaction pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPattern {
    Exact(String),
    Suffix(String),
    Prefix(String),
    Any,
}

impl KeyPattern {
    pub fn matches(&self, key: &str) -> bool {
        let key = key.to_ascii_lowercase();
        match self {
            KeyPattern::Exact(exact) => key == *exact,
            KeyPattern::Suffix(suffix) => {
                key == *suffix
                    || key
                        .strip_suffix(suffix.as_str())
                        .is_some_and(|head| head.ends_with('.'))
            }
            KeyPattern::Prefix(prefix) => key
                .strip_prefix(prefix.as_str())
                .is_some_and(|tail| tail.starts_with('.') && tail.len() > 1),
            KeyPattern::Any => true,
        }
    }
}

impl FromStr for KeyPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let pattern = s.trim().to_ascii_lowercase();
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }
        if pattern == "*" {
            return Ok(KeyPattern::Any);
        }

        let (body, build): (&str, fn(String) -> KeyPattern) =
            if let Some(suffix) = pattern.strip_prefix("*.") {
                (suffix, KeyPattern::Suffix)
            } else if let Some(prefix) = pattern.strip_suffix(".*") {
                (prefix, KeyPattern::Prefix)
            } else {
                (pattern.as_str(), KeyPattern::Exact)
            };

        if body.is_empty() || body.contains('*') {
            return Err(PatternError::Invalid(s.to_string()));
        }
        Ok(build(body.to_string()))
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPattern::Exact(key) => f.write_str(key),
            KeyPattern::Suffix(suffix) => write!(f, "*.{}", suffix),
            KeyPattern::Prefix(prefix) => write!(f, "{}.*", prefix),
            KeyPattern::Any => f.write_str("*"),
        }
    }
}

impl Serialize for KeyPattern {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for KeyPattern {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Set of key patterns applied on every export path
///
/// # Example
///
/// ```
/// use confseal_core::redact::RedactionPolicy;
///
/// let policy = RedactionPolicy::from_patterns(["*.password", "api.key"]).unwrap();
/// assert!(policy.is_redacted("db.password"));
/// assert!(policy.is_redacted("DB.PASSWORD"));
/// assert!(policy.is_redacted("api.key"));
/// assert!(!policy.is_redacted("db.user"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RedactionPolicy {
    patterns: Vec<KeyPattern>,
}

impl RedactionPolicy {
    /// A policy that redacts nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a list of pattern strings
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut policy = Self::new();
        for pattern in patterns {
            policy.push(pattern.as_ref().parse()?);
        }
        Ok(policy)
    }

    /// Common secret-bearing key names
    pub fn sensitive_defaults() -> Self {
        Self {
            patterns: SENSITIVE_DEFAULTS
                .iter()
                .map(|p| KeyPattern::Suffix(p.trim_start_matches("*.").to_string()))
                .collect(),
        }
    }

    /// Builder-style add of an already parsed pattern
    pub fn with_pattern(mut self, pattern: KeyPattern) -> Self {
        self.push(pattern);
        self
    }

    /// Add every pattern of `other` not already present
    pub fn merge(mut self, other: RedactionPolicy) -> Self {
        for pattern in other.patterns {
            self.push(pattern);
        }
        self
    }

    fn push(&mut self, pattern: KeyPattern) {
        if !self.patterns.contains(&pattern) {
            self.patterns.push(pattern);
        }
    }

    pub fn patterns(&self) -> &[KeyPattern] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether the value of `key` must be hidden
    pub fn is_redacted(&self, key: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(key))
    }

    /// The value to emit for `key`
    pub fn apply<'a>(&self, key: &str, value: &'a str) -> &'a str {
        if self.is_redacted(key) {
            REDACTED
        } else {
            value
        }
    }
}
