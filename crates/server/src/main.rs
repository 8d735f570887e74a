use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docket_core::{
    resolve_config, validate_config, CodeMappings, Config, ExtractionEngine, FsAttachmentStore,
    ProxyProcessor, SqliteTicketStore, StageOrchestrator, StageProcessor, TicketStore,
};

use docket_server::api::create_router;
use docket_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        // The subscriber may not be installed yet when config loading fails
        eprintln!("fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Config first: the log format flag decides how the subscriber is built
    let config = resolve_config().context("failed to load configuration")?;
    validate_config(&config).context("configuration validation failed")?;

    init_tracing(&config);

    info!(version = VERSION, "starting docketd");
    info!(path = %config.database.path.display(), "opening ticket store");

    let store: Arc<dyn TicketStore> = Arc::new(
        SqliteTicketStore::new(&config.database.path).context("failed to open ticket store")?,
    );

    let attachments = FsAttachmentStore::new(config.storage.attachments_dir.clone());

    let engine = ExtractionEngine::new(&config.extraction)
        .context("failed to build extraction engine")?;

    let mappings = match &config.processors.code_mappings {
        Some(path) => CodeMappings::from_json_file(path)
            .with_context(|| format!("failed to load code mappings from {}", path.display()))?,
        None => CodeMappings::builtin(),
    };

    let processor: Arc<dyn StageProcessor> = Arc::new(
        ProxyProcessor::new(&config.processors, mappings)
            .context("failed to build stage processors")?,
    );

    let orchestrator = StageOrchestrator::new(
        Arc::clone(&store),
        attachments,
        engine,
        processor,
        config.orchestrator.auto_extract,
    );

    let state = Arc::new(AppState::new(config.clone(), store, orchestrator));
    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!(%addr, "starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server shut down");
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.log.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
