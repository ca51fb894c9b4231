//! confseal core
//!
//! Layered configuration with secret indirection and redacted export.
//! This crate holds everything that does not depend on a transport, so the
//! same logic backs the HTTP server, the CLI and embedding applications.
//!
//! ## Resolution pipeline
//!
//! `SourceRegistry` → `Resolver` (calls `Cipher` / `SecretVault` /
//! `EnvLookup` as needed) → `Exporter`.
//!
//! ```rust
//! use std::sync::Arc;
//! use confseal_core::{
//!     ExportFormat, Exporter, MapEnv, PropertySource, RedactionPolicy, Resolver,
//! };
//!
//! # futures::executor::block_on(async {
//! let base = Arc::new(
//!     PropertySource::new("base", 1)
//!         .with_property("db.user", "root")
//!         .with_property("db.host", "${DB_HOST:localhost}")
//!         .with_property("db.password", "${DB_PASSWORD}"),
//! );
//! let overrides = Arc::new(PropertySource::new("override", 0).with_property("db.user", "admin"));
//!
//! let env = MapEnv::new().with_var("DB_PASSWORD", "hunter2");
//! let resolved = Resolver::default()
//!     .with_env(Arc::new(env))
//!     .resolve(&[base, overrides])
//!     .await;
//!
//! assert_eq!(resolved.get("db.user"), Some("admin"));
//! assert_eq!(resolved.get("db.host"), Some("localhost"));
//!
//! let bytes = Exporter::new()
//!     .export(&resolved, ExportFormat::Properties, &RedactionPolicy::sensitive_defaults())
//!     .unwrap();
//! assert!(!String::from_utf8(bytes).unwrap().contains("hunter2"));
//! # });
//! ```

pub mod logging;
pub mod env;
pub mod sources;
pub mod cipher;
pub mod vault;
pub mod resolver;
pub mod redact;
pub mod export;
pub mod settings;
pub mod service;
pub mod error;

// Re-export commonly used types
pub use error::{Error, Result};

pub use logging::{Logger, SharedLogger, NoOpLogger, TracingLogger};

pub use env::{EnvLookup, ProcessEnv, MapEnv};

pub use sources::{
    PropertySource, SourceRegistry, SourceSnapshot, PriorityUpdate, RegistryError,
    SourceLoader, SourceError, FileSourceLoader, MemorySourceLoader, SourceSpec,
};

pub use cipher::{Cipher, CipherError, AesGcmCipher, DisabledCipher};

pub use vault::{
    SecretVault, VaultError, MemoryVault, HttpVault, KeychainVault, ChainVault, DisabledVault,
};

pub use resolver::{
    Resolver, RetryPolicy, ResolvedConfig, ResolvedProperty, ResolutionError, ResolutionFailure,
    Marker, MarkerKind,
};

pub use redact::{RedactionPolicy, KeyPattern, REDACTED};

pub use export::{Exporter, ExportFormat, ExportError, LEAF_VALUE_KEY};

pub use settings::{Settings, SettingsError};

pub use service::{ConfigService, ExportOutput};
