//! The property source value type

use std::collections::BTreeMap;
use std::fmt;

/// A named, prioritized collection of raw configuration values
///
/// Lower `priority` numbers win when two sources define the same key.
/// Sources are immutable once built; a refresh replaces them wholesale.
///
/// Raw values may hold plaintext secrets, so `Debug` only prints the
/// source's identity and its key count.
///
/// # Example
///
/// ```
/// use confseal_core::sources::PropertySource;
///
/// let base = PropertySource::new("base", 1)
///     .with_property("db.user", "root")
///     .with_property("db.host", "${DB_HOST:localhost}");
///
/// assert_eq!(base.get("db.user"), Some("root"));
/// assert_eq!(base.len(), 2);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct PropertySource {
    name: String,
    priority: i32,
    origin: Option<String>,
    properties: BTreeMap<String, String>,
}

impl PropertySource {
    /// Create an empty source
    pub fn new(name: impl Into<String>, priority: i32) -> Self {
        Self {
            name: name.into(),
            priority,
            origin: None,
            properties: BTreeMap::new(),
        }
    }

    /// Create a source from an existing key/value map
    pub fn from_map(
        name: impl Into<String>,
        priority: i32,
        properties: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        Self {
            name: name.into(),
            priority,
            origin: None,
            properties: properties.into_iter().collect(),
        }
    }

    /// Add a single raw property
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Record where the source was loaded from (file path, URL, ...)
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Same source, different priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Raw value for a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Keys in lexicographic order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Raw key/value pairs in key order
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl fmt::Debug for PropertySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertySource")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("origin", &self.origin)
            .field("keys", &self.properties.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let source = PropertySource::new("base", 3)
            .with_property("b", "2")
            .with_property("a", "1")
            .with_origin("config/base.yml");

        assert_eq!(source.name(), "base");
        assert_eq!(source.priority(), 3);
        assert_eq!(source.origin(), Some("config/base.yml"));
        assert_eq!(source.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(source.contains_key("a"));
        assert_eq!(source.get("missing"), None);
    }

    #[test]
    fn test_debug_hides_values() {
        let source = PropertySource::new("base", 0).with_property("db.password", "hunter2");
        let debug = format!("{:?}", source);

        assert!(debug.contains("base"));
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("db.password"));
    }

    #[test]
    fn test_with_priority() {
        let source = PropertySource::new("base", 0).with_priority(7);
        assert_eq!(source.priority(), 7);
    }
}
