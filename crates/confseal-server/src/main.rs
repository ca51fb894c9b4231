use std::io::Read;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use confseal_core::{ConfigService, EnvLookup, ExportFormat, ProcessEnv, Settings, TracingLogger};
use confseal_server::{create_router, AppState, Cli, Command, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let settings_path = cli.config.clone().unwrap_or_else(Settings::default_path);
    let settings = Settings::load(&settings_path)
        .with_context(|| format!("loading settings from {}", settings_path.display()))?;
    info!("Settings: {}", settings_path.display());

    let env: Arc<dyn EnvLookup> = Arc::new(ProcessEnv);
    let logger = Arc::new(TracingLogger::for_component("confseal-core"));
    let service = Arc::new(ConfigService::from_settings(&settings, env, logger)?);

    match cli.command {
        Command::Serve { listen } => serve(settings, service, listen).await,
        Command::Export { format, output } => export(&settings, &service, &format, output).await,
        Command::Encrypt { value } => encrypt(&service, value),
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn serve(
    settings: Settings,
    service: Arc<ConfigService>,
    listen: Option<std::net::SocketAddr>,
) -> anyhow::Result<()> {
    let loader = Arc::new(settings.source_loader());
    let sources = service.refresh(loader.as_ref()).await.context("loading sources")?;
    info!("Loaded {} source(s)", sources.len());

    if !service.cipher().is_available() {
        warn!(
            "No cipher key in ${}: {{cipher}} values will not resolve",
            settings.cipher.key_env
        );
    }

    let state = AppState::new(service, loader).with_decrypt(settings.endpoints.decrypt_enabled);
    let router = create_router(state, Some(settings.request_timeout()));

    let addr = listen.unwrap_or(settings.listen);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Shut down");
    Ok(())
}

async fn export(
    settings: &Settings,
    service: &ConfigService,
    format: &str,
    output: Option<std::path::PathBuf>,
) -> anyhow::Result<()> {
    let format: ExportFormat = format.parse()?;
    service
        .refresh(&settings.source_loader())
        .await
        .context("loading sources")?;

    let exported = service.export(format).await?;
    if exported.unresolved > 0 {
        warn!("{} key(s) could not be resolved", exported.unresolved);
    }

    match output {
        Some(path) => {
            std::fs::write(&path, &exported.bytes).with_context(|| format!("writing {}", path.display()))?;
            info!("Wrote {} keys to {}", exported.resolved, path.display());
        }
        None => {
            use std::io::Write;
            std::io::stdout().write_all(&exported.bytes)?;
        }
    }
    Ok(())
}

fn encrypt(service: &ConfigService, value: Option<String>) -> anyhow::Result<()> {
    let plaintext = match value {
        Some(value) => value,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    println!("{}", service.encrypt(&plaintext)?);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
