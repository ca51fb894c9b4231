//! Resolution of raw property values into a flat, ordered configuration
//!
//! - `Marker`: indirection detected on a raw value
//! - `Resolver`: merges sources by priority and resolves markers
//! - `ResolvedConfig`: resolved entries plus per-key failures

mod marker;
mod resolved;
mod engine;

pub use marker::{Marker, MarkerKind};
pub use resolved::{FailureReport, ResolutionError, ResolutionFailure, ResolvedConfig, ResolvedProperty};
pub use engine::{Resolver, RetryPolicy, DEFAULT_VAULT_TIMEOUT};
