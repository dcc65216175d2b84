use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vellum_core::{
    load_config, validate_config, ApsClient, ArtifactStorage, ConversionOrchestrator, FileStore,
    FsArtifactStorage, InMemoryFileStore, TokioSleeper, TranslationClient,
};
use vellum_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("VELLUM_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration; missing translation credentials stop startup here
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Translation service: {}", config.translation.base_url);
    info!("Upload storage: {:?}", config.upload.storage_dir);

    // Create translation client
    let translation: Arc<dyn TranslationClient> = Arc::new(
        ApsClient::new(config.translation.clone())
            .context("Failed to create translation client")?,
    );
    info!("Using translation client: {}", translation.name());

    // Create artifact storage
    let storage: Arc<dyn ArtifactStorage> = Arc::new(
        FsArtifactStorage::new(config.upload.storage_dir.clone())
            .await
            .context("Failed to create artifact storage")?,
    );
    info!("Artifact storage initialized");

    // Create file store
    let store: Arc<dyn FileStore> = Arc::new(InMemoryFileStore::new());

    // Create orchestrator
    let orchestrator = ConversionOrchestrator::new(
        config.orchestrator.clone(),
        config.translation.bucket_prefix.clone(),
        Arc::clone(&store),
        Arc::clone(&storage),
        translation,
        Arc::new(TokioSleeper),
    );
    info!(
        "Conversion orchestrator ready (poll every {:?}, up to {} attempts)",
        config.orchestrator.poll_interval(),
        config.orchestrator.max_poll_attempts
    );

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        store,
        storage,
        orchestrator.clone(),
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    let active = orchestrator.status().active_runs;
    if active > 0 {
        info!("Abandoning {} running conversion(s)", active);
    }
    info!("Server shut down");

    Ok(())
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
