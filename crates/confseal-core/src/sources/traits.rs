//! Source loader trait and errors

use std::path::PathBuf;

use async_trait::async_trait;

use super::source::PropertySource;

/// Something that can produce a fresh set of property sources
///
/// Implementations:
/// - `MemorySourceLoader`: Fixed in-memory sources for tests and embedding
/// - `FileSourceLoader`: `.properties`, `.yaml`/`.yml` and `.json` files
///
/// A loader is called on startup and again on every refresh; the registry
/// swaps the full result in at once.
#[async_trait]
pub trait SourceLoader: Send + Sync {
    /// Human-readable name of this loader
    fn name(&self) -> &str;

    /// Load every source this loader knows about
    async fn load(&self) -> SourceResult<Vec<PropertySource>>;
}

/// Errors that can occur while loading sources
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Unsupported source file type: {0}")]
    UnsupportedFileType(PathBuf),
}

pub type SourceResult<T> = Result<T, SourceError>;
