//! End-to-end: files on disk → registry → resolver → export

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use confseal_core::cipher::{strip_tag, CipherResult};
use confseal_core::export::ExportFormat;
use confseal_core::resolver::ResolutionError;
use confseal_core::{
    AesGcmCipher, Cipher, CipherError, ConfigService, EnvLookup, FileSourceLoader, HttpVault, MapEnv,
    NoOpLogger, RedactionPolicy, Resolver, RetryPolicy, Settings, SourceRegistry, SourceSpec,
    REDACTED,
};
use confseal_core::vault::KvVersion;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write(dir: &TempDir, name: &str, content: &str) {
    fs::write(dir.path().join(name), content).unwrap();
}

/// Decrypts one known payload; everything else is rejected
struct FixedCipher;

impl Cipher for FixedCipher {
    fn name(&self) -> &str {
        "fixed"
    }

    fn encrypt(&self, _plaintext: &str) -> CipherResult<String> {
        Err(CipherError::Encrypt("fixed cipher is read-only".to_string()))
    }

    fn decrypt(&self, ciphertext: &str) -> CipherResult<String> {
        match strip_tag(ciphertext) {
            "ABC" => Ok("secret123".to_string()),
            other => Err(CipherError::Decrypt(format!("unknown payload {}", other))),
        }
    }
}

#[tokio::test]
async fn encrypted_override_wins_and_is_redacted() {
    let dir = TempDir::new().unwrap();
    write(&dir, "override.properties", "db.pw={cipher}ABC\n");
    write(&dir, "base.properties", "db.pw=plain\ndb.user=root\n");

    let loader = FileSourceLoader::new(vec![
        SourceSpec::new("override", 0, "override.properties"),
        SourceSpec::new("base", 1, "base.properties"),
    ])
    .with_base_dir(dir.path());

    let resolver = Resolver::new(
        Arc::new(FixedCipher),
        Arc::new(confseal_core::DisabledVault),
        Arc::new(MapEnv::new()),
    );
    let service = ConfigService::new(
        Arc::new(SourceRegistry::new()),
        resolver,
        RedactionPolicy::from_patterns(["*.pw"]).unwrap(),
    );
    service.refresh(&loader).await.unwrap();

    let resolved = service.resolve().await;
    assert_eq!(resolved.get("db.pw"), Some("secret123"));
    assert_eq!(resolved.property("db.pw").unwrap().source(), "override");
    assert_eq!(resolved.get("db.user"), Some("root"));
    assert!(resolved.is_complete());

    let output = service.export(ExportFormat::Properties).await.unwrap();
    let text = String::from_utf8(output.bytes).unwrap();
    assert!(text.contains("db.pw=***REDACTED***\n"));
    assert!(text.contains("db.user=root\n"));
    assert!(!text.contains("secret123"));
    assert!(!text.contains("plain"));
    assert_eq!(output.unresolved, 0);
}

#[tokio::test]
async fn override_beats_base_and_bad_cipher_is_reported() {
    let dir = TempDir::new().unwrap();
    write(&dir, "application.properties", "db.user=root\ndb.password={cipher}ABC\n");
    write(&dir, "override.yml", "db:\n  user: admin\n");

    let loader = FileSourceLoader::new(vec![
        SourceSpec::new("base", 1, "application.properties"),
        SourceSpec::new("override", 0, "override.yml"),
    ])
    .with_base_dir(dir.path());

    let cipher = Arc::new(AesGcmCipher::from_passphrase("k").unwrap());
    let resolver = Resolver::new(
        cipher,
        Arc::new(confseal_core::DisabledVault),
        Arc::new(MapEnv::new()),
    );
    let service = ConfigService::new(
        Arc::new(SourceRegistry::new()),
        resolver,
        RedactionPolicy::sensitive_defaults(),
    );
    service.refresh(&loader).await.unwrap();

    let resolved = service.resolve().await;
    assert_eq!(resolved.get("db.user"), Some("admin"));
    assert_eq!(resolved.get("db.password"), None);
    assert!(matches!(
        resolved.failure("db.password").map(|f| &f.error),
        Some(ResolutionError::Decryption(_))
    ));

    let output = service.export(ExportFormat::Properties).await.unwrap();
    let text = String::from_utf8(output.bytes).unwrap();
    assert!(text.contains("db.user=admin\n"));
    assert!(text.contains("# unresolved: db.password (base): DecryptionError"));
    assert_eq!(output.unresolved, 1);
}

#[tokio::test]
async fn environment_default_applies_when_unset() {
    let dir = TempDir::new().unwrap();
    write(&dir, "app.json", r#"{"db": {"host": "${DB_HOST:localhost}"}}"#);

    let loader = FileSourceLoader::new(vec![SourceSpec::new("base", 0, "app.json")]).with_base_dir(dir.path());
    let service = ConfigService::new(
        Arc::new(SourceRegistry::new()),
        Resolver::default().with_env(Arc::new(MapEnv::new())),
        RedactionPolicy::new(),
    );
    service.refresh(&loader).await.unwrap();

    let resolved = service.resolve().await;
    assert_eq!(resolved.get("db.host"), Some("localhost"));
    assert!(resolved.is_complete());
}

#[tokio::test]
async fn missing_vault_secret_fails_only_that_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/data/db"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "data": { "user": "svc" } }
        })))
        .mount(&server)
        .await;

    let vault = HttpVault::new(server.uri(), Some("t".to_string()), KvVersion::V2, Duration::from_secs(2)).unwrap();
    let registry = Arc::new(SourceRegistry::new());
    registry
        .register(
            confseal_core::PropertySource::new("vault-backed", 0)
                .with_property("db.user", "${vault.secret/db/user}")
                .with_property("db.password", "${vault.secret/db/password}")
                .with_property("app.name", "demo"),
        )
        .unwrap();

    let resolver = Resolver::default()
        .with_env(Arc::new(MapEnv::new()))
        .with_vault(Arc::new(vault))
        .with_retry(RetryPolicy::new(1, Duration::from_millis(5)));
    let service = ConfigService::new(registry, resolver, RedactionPolicy::sensitive_defaults());

    let output = service.export(ExportFormat::Json).await.unwrap();
    let doc: Value = serde_json::from_slice(&output.bytes).unwrap();

    assert_eq!(doc["properties"]["db"]["user"], "svc");
    assert_eq!(doc["properties"]["app"]["name"], "demo");
    assert!(doc["properties"]["db"].get("password").is_none());
    assert_eq!(doc["unresolved"][0]["key"], "db.password");
    assert_eq!(doc["unresolved"][0]["source"], "vault-backed");
    assert!(doc["unresolved"][0]["reason"]
        .as_str()
        .unwrap()
        .starts_with("SecretUnavailable"));
}

#[tokio::test]
async fn redaction_holds_in_every_format() {
    let env = MapEnv::new().with_var("API_TOKEN", "tok-123");
    let cipher = AesGcmCipher::from_passphrase("k").unwrap();
    let tagged = cipher.encrypt("pw-456").unwrap();

    let registry = Arc::new(SourceRegistry::new());
    registry
        .register(
            confseal_core::PropertySource::new("base", 0)
                .with_property("db.password", tagged)
                .with_property("api.token", "${API_TOKEN}")
                .with_property("Service.Secret", "plain-789")
                .with_property("db.user", "root"),
        )
        .unwrap();

    let resolver = Resolver::new(Arc::new(cipher), Arc::new(confseal_core::DisabledVault), Arc::new(env));
    let service = ConfigService::new(registry, resolver, RedactionPolicy::sensitive_defaults());

    for format in [ExportFormat::Properties, ExportFormat::Json, ExportFormat::Yaml] {
        let output = service.export(format).await.unwrap();
        let text = String::from_utf8(output.bytes).unwrap();
        for secret in ["tok-123", "pw-456", "plain-789"] {
            assert!(!text.contains(secret), "{} export leaked {}", format, secret);
        }
        assert!(text.contains(REDACTED));
        assert!(text.contains("root"));
    }
}

#[tokio::test]
async fn service_from_settings_file() {
    let dir = TempDir::new().unwrap();
    write(&dir, "base.properties", "app.name=demo\nsecrets.api=${API_KEY:none}\n");
    write(
        &dir,
        "confseal.yaml",
        "sources:\n  - { name: base, priority: 1, path: base.properties }\n  - { name: extra, priority: 0, path: missing.yml, optional: true }\nredaction:\n  patterns: ['secrets.*']\n",
    );

    let settings = Settings::load(dir.path().join("confseal.yaml")).unwrap();
    let env: Arc<dyn EnvLookup> = Arc::new(MapEnv::new());
    let service = ConfigService::from_settings(&settings, env, NoOpLogger::shared()).unwrap();
    let snapshot = service.refresh(&settings.source_loader()).await.unwrap();

    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[0].name(), "extra");
    assert!(snapshot[0].is_empty());

    let output = service.export(ExportFormat::Yaml).await.unwrap();
    let doc: serde_yaml::Value = serde_yaml::from_slice(&output.bytes).unwrap();
    assert_eq!(doc["properties"]["app"]["name"].as_str(), Some("demo"));
    assert_eq!(doc["properties"]["secrets"]["api"].as_str(), Some(REDACTED));
}
