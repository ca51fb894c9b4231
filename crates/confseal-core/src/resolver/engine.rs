//! Merging and marker resolution

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use super::marker::{Marker, MarkerKind};
use super::resolved::{ResolutionError, ResolutionFailure, ResolvedConfig, ResolvedProperty};
use crate::cipher::{Cipher, DisabledCipher};
use crate::env::{EnvLookup, ProcessEnv};
use crate::logging::{NoOpLogger, SharedLogger};
use crate::sources::PropertySource;
use crate::vault::{DisabledVault, SecretVault, VaultError};
use crate::{log_debug, log_info, log_warn};

/// Default timeout for a single vault call
pub const DEFAULT_VAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Retry budget for transient vault failures
///
/// Only timeouts and transport errors are retried. The n-th retry waits
/// `backoff * 2^(n-1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32, backoff: Duration) -> Self {
        Self { retries, backoff }
    }

    /// Give up on the first failure
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.backoff.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(1, Duration::from_millis(100))
    }
}

/// Merges property sources and resolves indirection markers
///
/// For every key the raw value comes from the source with the lowest
/// priority number; ties go to the source listed first. Keys resolve
/// concurrently and a failing key never affects the others.
///
/// Any executor can drive `resolve`; vault timeouts and retry backoff
/// take effect inside a Tokio runtime.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use confseal_core::env::MapEnv;
/// use confseal_core::resolver::Resolver;
/// use confseal_core::sources::PropertySource;
///
/// # futures::executor::block_on(async {
/// let resolver = Resolver::default().with_env(Arc::new(MapEnv::new()));
/// let base = Arc::new(PropertySource::new("base", 1).with_property("db.host", "${DB_HOST:localhost}"));
///
/// let resolved = resolver.resolve(&[base]).await;
/// assert_eq!(resolved.get("db.host"), Some("localhost"));
/// # });
/// ```
pub struct Resolver {
    cipher: Arc<dyn Cipher>,
    vault: Arc<dyn SecretVault>,
    env: Arc<dyn EnvLookup>,
    retry: RetryPolicy,
    vault_timeout: Duration,
    logger: SharedLogger,
}

impl Resolver {
    pub fn new(cipher: Arc<dyn Cipher>, vault: Arc<dyn SecretVault>, env: Arc<dyn EnvLookup>) -> Self {
        Self {
            cipher,
            vault,
            env,
            retry: RetryPolicy::default(),
            vault_timeout: DEFAULT_VAULT_TIMEOUT,
            logger: NoOpLogger::shared(),
        }
    }

    pub fn with_cipher(mut self, cipher: Arc<dyn Cipher>) -> Self {
        self.cipher = cipher;
        self
    }

    pub fn with_vault(mut self, vault: Arc<dyn SecretVault>) -> Self {
        self.vault = vault;
        self
    }

    pub fn with_env(mut self, env: Arc<dyn EnvLookup>) -> Self {
        self.env = env;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Upper bound for each individual vault call
    pub fn with_vault_timeout(mut self, timeout: Duration) -> Self {
        self.vault_timeout = timeout;
        self
    }

    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn cipher(&self) -> &Arc<dyn Cipher> {
        &self.cipher
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Resolve the merged view of `sources`
    ///
    /// `sources` need not be sorted; a registry snapshot already is.
    pub async fn resolve(&self, sources: &[Arc<PropertySource>]) -> ResolvedConfig {
        let merged = merge(sources);
        log_debug!(
            self.logger,
            "Resolving {} keys from {} sources",
            merged.len(),
            sources.len()
        );

        let outcomes = join_all(
            merged
                .iter()
                .map(|(key, (raw, source))| self.resolve_key(key, raw, source)),
        )
        .await;

        let mut resolved = ResolvedConfig::new();
        for ((key, (_, source)), outcome) in merged.iter().zip(outcomes) {
            match outcome {
                Ok(property) => resolved.insert((*key).to_string(), property),
                Err(error) => {
                    log_warn!(self.logger, "Unresolved key '{}' from '{}': {}", key, source, error);
                    resolved.push_failure(ResolutionFailure::new(*key, *source, error));
                }
            }
        }

        log_info!(
            self.logger,
            "Resolved {} keys, {} unresolved",
            resolved.len(),
            resolved.failures().len()
        );
        resolved
    }

    async fn resolve_key(
        &self,
        key: &str,
        raw: &str,
        source: &str,
    ) -> Result<ResolvedProperty, ResolutionError> {
        let marker = Marker::parse(raw);
        let kind = marker.kind();

        let value = match marker {
            Marker::Literal => raw.to_string(),
            Marker::Cipher { payload } => self
                .cipher
                .decrypt(&payload)
                .map_err(|e| ResolutionError::Decryption(e.to_string()))?,
            Marker::Environment { name, default } => match self.env.var(&name) {
                Some(value) => value,
                None => default.ok_or(ResolutionError::MissingEnvironmentVariable(name))?,
            },
            Marker::Vault { path, key: secret_key } => self
                .fetch_secret(&path, &secret_key)
                .await
                .map_err(|e| ResolutionError::SecretUnavailable {
                    path: path.clone(),
                    key: secret_key.clone(),
                    cause: e.to_string(),
                })?,
        };

        if kind != MarkerKind::Literal {
            log_debug!(self.logger, "Resolved '{}' from '{}' via {}", key, source, kind);
        }
        Ok(ResolvedProperty::new(value, source, kind))
    }

    /// Vault lookup with timeout and retry
    ///
    /// Timeouts and backoff delays need Tokio's timer. Under any other
    /// executor the call runs unbounded and retries follow immediately.
    async fn fetch_secret(&self, path: &str, key: &str) -> Result<String, VaultError> {
        let timed = tokio::runtime::Handle::try_current().is_ok();
        let mut attempt = 0;
        loop {
            let call = self.vault.get(path, key);
            let outcome = if timed {
                tokio::time::timeout(self.vault_timeout, call)
                    .await
                    .unwrap_or(Err(VaultError::Timeout))
            } else {
                call.await
            };

            match outcome {
                Err(e) if e.is_transient() && attempt < self.retry.retries => {
                    attempt += 1;
                    let delay = self.retry.delay_for(attempt);
                    log_debug!(
                        self.logger,
                        "Vault lookup {}#{} failed ({}), retry {} in {:?}",
                        path,
                        key,
                        e,
                        attempt,
                        delay
                    );
                    if timed {
                        tokio::time::sleep(delay).await;
                    }
                }
                other => return other,
            }
        }
    }
}

impl Default for Resolver {
    /// Process environment, no cipher key, no vault
    fn default() -> Self {
        Self::new(Arc::new(DisabledCipher), Arc::new(DisabledVault), Arc::new(ProcessEnv))
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("cipher", &self.cipher.name())
            .field("vault", &self.vault.name())
            .field("retry", &self.retry)
            .field("vault_timeout", &self.vault_timeout)
            .finish()
    }
}

/// Winning `(raw value, source name)` per key
fn merge(sources: &[Arc<PropertySource>]) -> BTreeMap<&str, (&str, &str)> {
    let mut ordered: Vec<&PropertySource> = sources.iter().map(Arc::as_ref).collect();
    ordered.sort_by_key(|s| s.priority());

    let mut merged = BTreeMap::new();
    for source in ordered {
        for (key, raw) in source.properties() {
            merged
                .entry(key.as_str())
                .or_insert((raw.as_str(), source.name()));
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use proptest::prelude::*;

    use crate::cipher::AesGcmCipher;
    use crate::env::MapEnv;
    use crate::logging::CapturingLogger;
    use crate::vault::{MemoryVault, VaultResult};

    fn source(name: &str, priority: i32, props: &[(&str, &str)]) -> Arc<PropertySource> {
        let mut source = PropertySource::new(name, priority);
        for (k, v) in props {
            source = source.with_property(*k, *v);
        }
        Arc::new(source)
    }

    fn resolver() -> Resolver {
        Resolver::default()
            .with_env(Arc::new(MapEnv::new()))
            .with_retry(RetryPolicy::none())
    }

    /// Fails with a transport error a fixed number of times, then answers
    struct FlakyVault {
        failures_left: AtomicUsize,
        calls: AtomicUsize,
    }

    impl FlakyVault {
        fn new(failures: usize) -> Self {
            Self {
                failures_left: AtomicUsize::new(failures),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SecretVault for FlakyVault {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn get(&self, _path: &str, _key: &str) -> VaultResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(VaultError::Transport("connection reset".to_string()));
            }
            Ok("recovered".to_string())
        }
    }

    struct HangingVault;

    #[async_trait]
    impl SecretVault for HangingVault {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn get(&self, _path: &str, _key: &str) -> VaultResult<String> {
            futures::future::pending::<()>().await;
            Ok(String::new())
        }
    }

    #[test]
    fn test_vault_lookup_without_tokio_runtime() {
        let vault = MemoryVault::new().with_secret("secret/db", "password", "s3cr3t");
        let sources = [source("base", 1, &[("db.password", "${vault.secret/db/password}")])];
        let resolver = resolver().with_vault(Arc::new(vault));

        let resolved = futures::executor::block_on(resolver.resolve(&sources));
        assert_eq!(resolved.get("db.password"), Some("s3cr3t"));
    }

    #[test]
    fn test_retry_without_tokio_runtime() {
        let vault = Arc::new(FlakyVault::new(1));
        let sources = [source("base", 1, &[("k", "${vault.p/k}")])];
        let resolver = resolver()
            .with_vault(vault.clone())
            .with_retry(RetryPolicy::new(1, Duration::from_millis(50)));

        let resolved = futures::executor::block_on(resolver.resolve(&sources));
        assert_eq!(resolved.get("k"), Some("recovered"));
        assert_eq!(vault.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_override_wins_and_cipher_failure_is_isolated() {
        let cipher = Arc::new(AesGcmCipher::from_passphrase("k").unwrap());
        let sources = [
            source("base", 1, &[("db.user", "root"), ("db.password", "{cipher}ABC")]),
            source("override", 0, &[("db.user", "admin")]),
        ];

        let resolved = resolver().with_cipher(cipher).resolve(&sources).await;

        assert_eq!(resolved.get("db.user"), Some("admin"));
        assert_eq!(resolved.property("db.user").unwrap().source(), "override");
        assert_eq!(resolved.get("db.password"), None);

        let failure = resolved.failure("db.password").unwrap();
        assert_eq!(failure.source, "base");
        assert!(matches!(failure.error, ResolutionError::Decryption(_)));
    }

    #[tokio::test]
    async fn test_cipher_values_decrypt() {
        let cipher = Arc::new(AesGcmCipher::from_passphrase("k").unwrap());
        let tagged = cipher.encrypt("s3cr3t").unwrap();
        let sources = [source("base", 1, &[("db.password", tagged.as_str())])];

        let resolved = resolver().with_cipher(cipher).resolve(&sources).await;
        assert_eq!(resolved.get("db.password"), Some("s3cr3t"));
        assert_eq!(resolved.property("db.password").unwrap().marker(), MarkerKind::Cipher);
    }

    #[tokio::test]
    async fn test_no_cipher_key_is_decryption_error() {
        let sources = [source("base", 1, &[("a", "{cipher}AAAA")])];
        let resolved = resolver().resolve(&sources).await;
        assert_eq!(
            resolved.failure("a").unwrap().error,
            ResolutionError::Decryption("No encryption key configured".to_string())
        );
    }

    #[tokio::test]
    async fn test_environment_defaults() {
        let sources = [source(
            "base",
            1,
            &[
                ("db.host", "${DB_HOST:localhost}"),
                ("db.port", "${DB_PORT}"),
                ("db.name", "${DB_NAME:}"),
                ("db.user", "${DB_USER}"),
            ],
        )];

        let env = MapEnv::new().with_var("DB_USER", "svc");
        let resolved = resolver().with_env(Arc::new(env)).resolve(&sources).await;

        assert_eq!(resolved.get("db.host"), Some("localhost"));
        assert_eq!(resolved.get("db.name"), Some(""));
        assert_eq!(resolved.get("db.user"), Some("svc"));
        assert_eq!(
            resolved.failure("db.port").unwrap().error,
            ResolutionError::MissingEnvironmentVariable("DB_PORT".to_string())
        );
        assert_eq!(resolved.failures().len(), 1);
    }

    #[tokio::test]
    async fn test_environment_value_beats_default() {
        let sources = [source("base", 1, &[("db.host", "${DB_HOST:localhost}")])];
        let env = MapEnv::new().with_var("DB_HOST", "db.internal");
        let resolved = resolver().with_env(Arc::new(env)).resolve(&sources).await;
        assert_eq!(resolved.get("db.host"), Some("db.internal"));
    }

    #[tokio::test]
    async fn test_missing_vault_secret_only_fails_that_key() {
        let vault = MemoryVault::new().with_secret("secret/db", "user", "svc");
        let sources = [source(
            "base",
            1,
            &[
                ("db.user", "${vault.secret/db/user}"),
                ("db.password", "${vault.secret/db/password}"),
                ("app.name", "demo"),
            ],
        )];

        let resolved = resolver().with_vault(Arc::new(vault)).resolve(&sources).await;

        assert_eq!(resolved.get("db.user"), Some("svc"));
        assert_eq!(resolved.get("app.name"), Some("demo"));
        assert_eq!(resolved.len(), 2);

        let failure = resolved.failure("db.password").unwrap();
        assert_eq!(failure.error.kind(), "SecretUnavailable");
        assert!(matches!(
            &failure.error,
            ResolutionError::SecretUnavailable { path, key, .. } if path == "secret/db" && key == "password"
        ));
    }

    #[tokio::test]
    async fn test_transient_vault_failure_is_retried() {
        let vault = Arc::new(FlakyVault::new(1));
        let sources = [source("base", 1, &[("k", "${vault.p/k}")])];

        let resolved = resolver()
            .with_vault(vault.clone())
            .with_retry(RetryPolicy::new(1, Duration::from_millis(1)))
            .resolve(&sources)
            .await;

        assert_eq!(resolved.get("k"), Some("recovered"));
        assert_eq!(vault.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_budget_exhausted() {
        let vault = Arc::new(FlakyVault::new(5));
        let sources = [source("base", 1, &[("k", "${vault.p/k}")])];

        let resolved = resolver()
            .with_vault(vault.clone())
            .with_retry(RetryPolicy::new(2, Duration::from_millis(1)))
            .resolve(&sources)
            .await;

        assert!(resolved.failure("k").is_some());
        assert_eq!(vault.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let sources = [source("base", 1, &[("k", "${vault.p/k}")])];
        let resolved = resolver()
            .with_vault(Arc::new(MemoryVault::new()))
            .with_retry(RetryPolicy::new(3, Duration::from_secs(60)))
            .resolve(&sources)
            .await;
        assert!(resolved.failure("k").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_vault_timeout() {
        let sources = [source("base", 1, &[("k", "${vault.p/k}"), ("other", "x")])];
        let resolved = resolver()
            .with_vault(Arc::new(HangingVault))
            .with_vault_timeout(Duration::from_millis(200))
            .with_retry(RetryPolicy::new(1, Duration::from_millis(100)))
            .resolve(&sources)
            .await;

        assert_eq!(resolved.get("other"), Some("x"));
        assert_eq!(
            resolved.failure("k").unwrap().error,
            ResolutionError::SecretUnavailable {
                path: "p".to_string(),
                key: "k".to_string(),
                cause: "Vault request timed out".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_equal_priority_first_listed_wins() {
        let sources = [
            source("first", 5, &[("k", "1")]),
            source("second", 5, &[("k", "2")]),
        ];
        let resolved = resolver().resolve(&sources).await;
        assert_eq!(resolved.get("k"), Some("1"));
    }

    #[tokio::test]
    async fn test_logs_never_contain_values() {
        let logger = Arc::new(CapturingLogger::default());
        let cipher = Arc::new(AesGcmCipher::from_passphrase("k").unwrap());
        let tagged = cipher.encrypt("cipher-plaintext").unwrap();
        let vault = MemoryVault::new().with_secret("secret/db", "password", "vault-plaintext");
        let env = MapEnv::new().with_var("API_TOKEN", "env-plaintext");

        let sources = [source(
            "base",
            1,
            &[
                ("a", tagged.as_str()),
                ("b", "${vault.secret/db/password}"),
                ("c", "${API_TOKEN}"),
                ("d", "literal-plaintext"),
                ("e", "${MISSING}"),
            ],
        )];

        let resolved = Resolver::new(cipher, Arc::new(vault), Arc::new(env))
            .with_logger(logger.clone())
            .resolve(&sources)
            .await;
        assert_eq!(resolved.len(), 4);

        let lines = logger.lines();
        assert!(!lines.is_empty());
        for line in lines {
            assert!(!line.contains("plaintext"), "leaked value in log line: {}", line);
        }
    }

    #[test]
    fn test_retry_delay_doubles() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
    }

    fn arb_sources() -> impl Strategy<Value = Vec<(i32, Vec<(String, String)>)>> {
        prop::collection::vec(
            (
                -3i32..3,
                prop::collection::vec(("[a-c]\\.[a-c]", "[a-z0-9]{1,6}"), 0..6),
            ),
            1..5,
        )
    }

    fn build(spec: &[(i32, Vec<(String, String)>)]) -> Vec<Arc<PropertySource>> {
        spec.iter()
            .enumerate()
            .map(|(i, (priority, props))| {
                Arc::new(PropertySource::from_map(
                    format!("s{}", i),
                    *priority,
                    props.iter().cloned(),
                ))
            })
            .collect()
    }

    proptest! {
        #[test]
        fn prop_lowest_priority_number_wins(spec in arb_sources()) {
            let sources = build(&spec);
            let resolved = futures::executor::block_on(resolver().resolve(&sources));

            for (key, property) in resolved.entries() {
                let winner = sources
                    .iter()
                    .filter(|s| s.contains_key(key))
                    .min_by_key(|s| s.priority())
                    .unwrap();
                prop_assert_eq!(property.source(), winner.name());
                prop_assert_eq!(Some(property.value()), winner.get(key));
            }
        }

        #[test]
        fn prop_resolution_is_deterministic(spec in arb_sources()) {
            let sources = build(&spec);
            let first = futures::executor::block_on(resolver().resolve(&sources));
            let second = futures::executor::block_on(resolver().resolve(&sources));
            prop_assert_eq!(first, second);
        }
    }
}
