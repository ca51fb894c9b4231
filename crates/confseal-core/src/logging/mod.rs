//! Logging abstractions so the core stays backend-agnostic

mod traits;
mod noop;
mod tracing_logger;

pub use traits::{Logger, SharedLogger};
pub use noop::NoOpLogger;
pub use tracing_logger::TracingLogger;

#[cfg(test)]
pub(crate) use traits::testing::CapturingLogger;
