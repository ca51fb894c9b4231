//! Logger implementation backed by the `tracing` facade

use super::traits::Logger;

/// A logger that forwards every message to `tracing`
///
/// The host decides where events end up by installing a subscriber; the
/// `target` lets operators filter confseal output with `RUST_LOG`.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    component: &'static str,
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl TracingLogger {
    /// Create a tracing logger tagged with the default component name
    pub fn new() -> Self {
        Self {
            component: "confseal",
        }
    }

    /// Create a tracing logger tagged with a custom component name
    pub fn for_component(component: &'static str) -> Self {
        Self { component }
    }

    pub fn component(&self) -> &'static str {
        self.component
    }
}

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(component = self.component, "{}", message);
    }

    fn info(&self, message: &str) {
        tracing::info!(component = self.component, "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(component = self.component, "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(component = self.component, "{}", message);
    }
}
