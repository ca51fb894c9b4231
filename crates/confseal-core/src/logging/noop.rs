//! Silent logger

use std::sync::Arc;

use super::traits::{Logger, SharedLogger};

/// Discards every message
///
/// Registry, loaders, resolver and service all start with this logger;
/// hosts swap in a real one with `with_logger`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogger;

impl NoOpLogger {
    pub fn new() -> Self {
        Self
    }

    /// `SharedLogger` handle for a component's default
    pub fn shared() -> SharedLogger {
        Arc::new(Self)
    }
}

impl Logger for NoOpLogger {
    fn debug(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{PropertySource, SourceRegistry};

    #[test]
    fn test_components_run_with_silent_default() {
        let registry = SourceRegistry::new().with_logger(NoOpLogger::shared());
        registry.register(PropertySource::new("base", 0)).unwrap();
        crate::log_warn!(NoOpLogger::new(), "dropped {}", "message");
        assert_eq!(registry.len(), 1);
    }
}
