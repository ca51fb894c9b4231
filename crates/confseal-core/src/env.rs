//! Environment variable lookup
//!
//! The resolver never reads `std::env` directly; it asks an `EnvLookup`.
//! Production code uses `ProcessEnv`, tests use `MapEnv` so results do not
//! depend on the machine running them.

use std::collections::HashMap;
use std::env;

/// Read-only view of environment variables
pub trait EnvLookup: Send + Sync {
    /// Value of `name`, or `None` if it is not set
    fn var(&self, name: &str) -> Option<String>;

    /// Check if a variable is set
    fn has(&self, name: &str) -> bool {
        self.var(name).is_some()
    }
}

/// Environment lookup backed by the current process environment
///
/// Variables that are set but not valid unicode count as unset.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl ProcessEnv {
    pub fn new() -> Self {
        Self
    }
}

impl EnvLookup for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        env::var(name).ok()
    }
}

/// Deterministic environment fixture
///
/// # Example
///
/// ```
/// use confseal_core::env::{EnvLookup, MapEnv};
///
/// let env = MapEnv::new().with_var("DB_HOST", "db.internal");
/// assert_eq!(env.var("DB_HOST"), Some("db.internal".to_string()));
/// assert_eq!(env.var("DB_PORT"), None);
/// ```
#[derive(Debug, Default, Clone)]
pub struct MapEnv {
    vars: HashMap<String, String>,
}

impl MapEnv {
    /// Create an empty environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an environment from existing pairs
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Add a variable
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl EnvLookup for MapEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_env_get_direct() {
        env::set_var("CONFSEAL_TEST_ENV_12345", "test_value");

        let lookup = ProcessEnv::new();
        assert_eq!(lookup.var("CONFSEAL_TEST_ENV_12345"), Some("test_value".to_string()));
        assert!(lookup.has("CONFSEAL_TEST_ENV_12345"));

        env::remove_var("CONFSEAL_TEST_ENV_12345");
    }

    #[test]
    fn test_process_env_missing() {
        let lookup = ProcessEnv::new();
        assert_eq!(lookup.var("CONFSEAL_NONEXISTENT_XYZ"), None);
    }

    #[test]
    fn test_map_env() {
        let lookup = MapEnv::from_pairs([("A", "1"), ("B", "")]);

        assert_eq!(lookup.var("A"), Some("1".to_string()));
        // Set-but-empty is still set
        assert_eq!(lookup.var("B"), Some(String::new()));
        assert!(!lookup.has("C"));
    }
}
