//! Registry snapshot → resolve → export
//!
//! `ConfigService` is the one object an embedding application (or the HTTP
//! server) holds on to. It is cheap to share behind an `Arc`; every call
//! works on its own registry snapshot and builds its own `ResolvedConfig`.

use std::sync::Arc;

use crate::cipher::{Cipher, CipherResult};
use crate::env::EnvLookup;
use crate::error::Result;
use crate::export::{ExportFormat, ExportResult, Exporter};
use crate::logging::{NoOpLogger, SharedLogger};
use crate::redact::RedactionPolicy;
use crate::resolver::{ResolvedConfig, Resolver};
use crate::settings::Settings;
use crate::sources::{SourceLoader, SourceRegistry, SourceSnapshot};
use crate::{log_info, log_warn};

/// Bytes of one export plus what it contains
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutput {
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
    /// Number of resolved keys written
    pub resolved: usize,
    /// Number of keys listed as unresolved
    pub unresolved: usize,
}

/// Resolution and export over a shared source registry
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use confseal_core::env::MapEnv;
/// use confseal_core::export::ExportFormat;
/// use confseal_core::redact::RedactionPolicy;
/// use confseal_core::resolver::Resolver;
/// use confseal_core::service::ConfigService;
/// use confseal_core::sources::{PropertySource, SourceRegistry};
///
/// # futures::executor::block_on(async {
/// let registry = Arc::new(SourceRegistry::new());
/// registry
///     .register(PropertySource::new("base", 1).with_property("db.password", "hunter2"))
///     .unwrap();
///
/// let service = ConfigService::new(
///     registry,
///     Resolver::default().with_env(Arc::new(MapEnv::new())),
///     RedactionPolicy::sensitive_defaults(),
/// );
///
/// let output = service.export(ExportFormat::Properties).await.unwrap();
/// let text = String::from_utf8(output.bytes).unwrap();
/// assert!(text.contains("db.password=***REDACTED***"));
/// # });
/// ```
pub struct ConfigService {
    registry: Arc<SourceRegistry>,
    resolver: Resolver,
    exporter: Exporter,
    policy: RedactionPolicy,
    logger: SharedLogger,
}

impl ConfigService {
    pub fn new(registry: Arc<SourceRegistry>, resolver: Resolver, policy: RedactionPolicy) -> Self {
        Self {
            registry,
            resolver,
            exporter: Exporter::new(),
            policy,
            logger: NoOpLogger::shared(),
        }
    }

    /// Wire a service from settings
    ///
    /// The registry starts empty; call `refresh` with
    /// `settings.source_loader()` to load the configured files.
    pub fn from_settings(settings: &Settings, env: Arc<dyn EnvLookup>, logger: SharedLogger) -> Result<Self> {
        let cipher = settings.build_cipher(env.as_ref());
        let vault = settings.build_vault(env.as_ref())?;

        let resolver = Resolver::new(cipher, vault, env)
            .with_retry(settings.retry_policy())
            .with_vault_timeout(settings.vault_timeout())
            .with_logger(logger.clone());

        let registry = Arc::new(SourceRegistry::new().with_logger(logger.clone()));

        Ok(Self::new(registry, resolver, settings.redaction_policy()).with_logger(logger))
    }

    pub fn with_exporter(mut self, exporter: Exporter) -> Self {
        self.exporter = exporter;
        self
    }

    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }

    pub fn policy(&self) -> &RedactionPolicy {
        &self.policy
    }

    pub fn cipher(&self) -> &Arc<dyn Cipher> {
        self.resolver.cipher()
    }

    /// Resolve the current registry snapshot
    pub async fn resolve(&self) -> ResolvedConfig {
        let snapshot = self.registry.all();
        self.resolver.resolve(&snapshot).await
    }

    /// Resolve and export in `format`, applying the redaction policy
    ///
    /// Per-key failures do not fail the export; they are embedded in the
    /// output and counted in `ExportOutput::unresolved`.
    pub async fn export(&self, format: ExportFormat) -> ExportResult<ExportOutput> {
        let resolved = self.resolve().await;
        let bytes = self.exporter.export(&resolved, format, &self.policy)?;

        if !resolved.is_complete() {
            log_warn!(
                self.logger,
                "Exported {} with {} unresolved keys",
                format,
                resolved.failures().len()
            );
        }

        Ok(ExportOutput {
            format,
            bytes,
            resolved: resolved.len(),
            unresolved: resolved.failures().len(),
        })
    }

    /// Encrypt a value into its `{cipher}` form
    pub fn encrypt(&self, plaintext: &str) -> CipherResult<String> {
        self.cipher().encrypt(plaintext)
    }

    /// Decrypt a `{cipher}` value or bare payload
    pub fn decrypt(&self, ciphertext: &str) -> CipherResult<String> {
        self.cipher().decrypt(ciphertext)
    }

    /// Reload every source from `loader` and swap them in at once
    ///
    /// If loading fails the current sources stay live.
    pub async fn refresh(&self, loader: &dyn SourceLoader) -> Result<SourceSnapshot> {
        let sources = loader.load().await?;
        self.registry.reload(sources)?;

        let snapshot = self.registry.all();
        log_info!(
            self.logger,
            "Refreshed {} sources from {} loader",
            snapshot.len(),
            loader.name()
        );
        Ok(snapshot)
    }
}

impl std::fmt::Debug for ConfigService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigService")
            .field("sources", &self.registry.len())
            .field("resolver", &self.resolver)
            .field("policy", &self.policy)
            .finish()
    }
}
