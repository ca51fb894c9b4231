//! Source registry with atomic snapshot swaps
//!
//! Readers take an immutable snapshot (`all()`) and keep using it for the
//! whole resolution pass. Writers build a new list and swap it in, so an
//! in-flight resolution never observes a half-applied update.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use super::source::PropertySource;
use crate::logging::{NoOpLogger, SharedLogger};
use crate::{log_debug, log_info};

/// Immutable, priority-ordered view of the registry
pub type SourceSnapshot = Arc<Vec<Arc<PropertySource>>>;

/// How `replace` treats the priority of an existing source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriorityUpdate {
    /// Keep the priority the registered source already has
    #[default]
    Keep,
    /// Take the priority carried by the replacement
    Override,
}

/// Errors raised by registry updates
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Source already registered: {0}")]
    DuplicateSourceName(String),

    #[error("Source not found: {0}")]
    NotFound(String),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Ordered list of named property sources
///
/// # Example
///
/// ```
/// use confseal_core::sources::{PropertySource, SourceRegistry};
///
/// let registry = SourceRegistry::new();
/// registry.register(PropertySource::new("base", 10)).unwrap();
/// registry.register(PropertySource::new("override", 0)).unwrap();
///
/// let names: Vec<_> = registry.all().iter().map(|s| s.name().to_string()).collect();
/// assert_eq!(names, vec!["override", "base"]);
/// ```
pub struct SourceRegistry {
    sources: ArcSwap<Vec<Arc<PropertySource>>>,
    write_lock: Mutex<()>,
    logger: SharedLogger,
}

impl SourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            sources: ArcSwap::from_pointee(Vec::new()),
            write_lock: Mutex::new(()),
            logger: NoOpLogger::shared(),
        }
    }

    /// Attach a logger for registry updates
    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Register a new source
    ///
    /// Fails with `DuplicateSourceName` if a source of that name exists;
    /// use `replace` to swap a source out on purpose.
    pub fn register(&self, source: PropertySource) -> RegistryResult<()> {
        let _guard = self.write_lock.lock();
        let current = self.sources.load_full();

        if current.iter().any(|s| s.name() == source.name()) {
            return Err(RegistryError::DuplicateSourceName(source.name().to_string()));
        }

        log_info!(
            self.logger,
            "Registering source '{}' (priority {}, {} keys)",
            source.name(),
            source.priority(),
            source.len()
        );

        let mut next: Vec<Arc<PropertySource>> = current.as_ref().clone();
        next.push(Arc::new(source));
        sort_by_priority(&mut next);
        self.sources.store(Arc::new(next));
        Ok(())
    }

    /// Replace a source by name, inserting it if no source of that name exists
    ///
    /// The replacement keeps the registered position and, with
    /// `PriorityUpdate::Keep`, the registered priority.
    pub fn replace(&self, source: PropertySource, priority: PriorityUpdate) {
        let _guard = self.write_lock.lock();
        let current = self.sources.load_full();
        let mut next: Vec<Arc<PropertySource>> = current.as_ref().clone();

        match next.iter().position(|s| s.name() == source.name()) {
            Some(index) => {
                let source = match priority {
                    PriorityUpdate::Keep => {
                        let kept = next[index].priority();
                        source.with_priority(kept)
                    }
                    PriorityUpdate::Override => source,
                };
                log_info!(
                    self.logger,
                    "Replacing source '{}' (priority {}, {} keys)",
                    source.name(),
                    source.priority(),
                    source.len()
                );
                next[index] = Arc::new(source);
            }
            None => {
                log_info!(
                    self.logger,
                    "Replace of unknown source '{}' inserts it (priority {})",
                    source.name(),
                    source.priority()
                );
                next.push(Arc::new(source));
            }
        }

        sort_by_priority(&mut next);
        self.sources.store(Arc::new(next));
    }

    /// Swap in a complete new set of sources
    ///
    /// Names must be unique within `sources`; on error the current list
    /// stays in place.
    pub fn reload(&self, sources: Vec<PropertySource>) -> RegistryResult<()> {
        let mut next: Vec<Arc<PropertySource>> = Vec::with_capacity(sources.len());
        for source in sources {
            if next.iter().any(|s| s.name() == source.name()) {
                return Err(RegistryError::DuplicateSourceName(source.name().to_string()));
            }
            next.push(Arc::new(source));
        }
        sort_by_priority(&mut next);

        let _guard = self.write_lock.lock();
        log_info!(self.logger, "Reloading registry with {} sources", next.len());
        self.sources.store(Arc::new(next));
        Ok(())
    }

    /// Remove a source by name
    pub fn remove(&self, name: &str) -> RegistryResult<()> {
        let _guard = self.write_lock.lock();
        let current = self.sources.load_full();

        if !current.iter().any(|s| s.name() == name) {
            return Err(RegistryError::NotFound(name.to_string()));
        }

        let next: Vec<Arc<PropertySource>> = current
            .iter()
            .filter(|s| s.name() != name)
            .cloned()
            .collect();
        log_debug!(self.logger, "Removed source '{}'", name);
        self.sources.store(Arc::new(next));
        Ok(())
    }

    /// Snapshot of all sources, lowest priority number first
    ///
    /// Sources with equal priority keep their registration order.
    pub fn all(&self) -> SourceSnapshot {
        self.sources.load_full()
    }

    /// Look up a single source
    pub fn get(&self, name: &str) -> Option<Arc<PropertySource>> {
        self.sources.load().iter().find(|s| s.name() == name).cloned()
    }

    pub fn len(&self) -> usize {
        self.sources.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.all().iter().map(|s| s.name().to_string()).collect();
        f.debug_struct("SourceRegistry").field("sources", &names).finish()
    }
}

fn sort_by_priority(sources: &mut [Arc<PropertySource>]) {
    // Stable: equal priorities keep registration order
    sources.sort_by_key(|s| s.priority());
}
