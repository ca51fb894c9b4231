//! In-memory source loader

use async_trait::async_trait;
use parking_lot::RwLock;

use super::source::PropertySource;
use super::traits::{SourceLoader, SourceResult};

/// Source loader that hands out a fixed, replaceable set of sources
///
/// Useful for tests and for hosts that build sources programmatically.
#[derive(Debug, Default)]
pub struct MemorySourceLoader {
    sources: RwLock<Vec<PropertySource>>,
}

impl MemorySourceLoader {
    /// Create an empty loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a loader with initial sources
    pub fn with_sources(sources: Vec<PropertySource>) -> Self {
        Self {
            sources: RwLock::new(sources),
        }
    }

    /// Replace what the next `load()` returns
    pub fn set_sources(&self, sources: Vec<PropertySource>) {
        *self.sources.write() = sources;
    }

    pub fn clear(&self) {
        self.sources.write().clear();
    }
}

#[async_trait]
impl SourceLoader for MemorySourceLoader {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self) -> SourceResult<Vec<PropertySource>> {
        Ok(self.sources.read().clone())
    }
}
