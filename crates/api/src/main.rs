use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use klyra_core::store::{MemoryStore, ParkingStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use klyra_api::background::Scheduler;
use klyra_api::config::{ConfigError, ServerConfig, StoreBackend};
use klyra_api::router::build_app_router;
use klyra_api::state::AppState;

/// Anything that stops the server from coming up.
#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("invalid HOST address: {0}")]
    Host(#[from] std::net::AddrParseError),

    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "klyra_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Server failed to start");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    // --- Configuration ---
    let config = ServerConfig::from_env()?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        backend = ?config.store_backend,
        "Loaded server configuration",
    );

    // --- Store ---
    let store = open_store(&config).await?;

    // --- Monitors ---
    let state = AppState::new(store, config.clone());
    let scheduler = Scheduler::start(Arc::clone(&state.engine), &config.monitor);
    tracing::info!("Background monitors started");

    // --- Server ---
    let app = build_app_router(state, &config);
    let addr = SocketAddr::new(config.host.parse::<IpAddr>()?, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped accepting connections, stopping monitors");
    scheduler
        .shutdown(Duration::from_secs(config.shutdown_timeout_secs))
        .await;
    tracing::info!("Graceful shutdown complete");
    Ok(())
}

async fn open_store(config: &ServerConfig) -> Result<Arc<dyn ParkingStore>, StartupError> {
    match (config.store_backend, config.database_url.as_deref()) {
        (StoreBackend::Postgres, Some(url)) => {
            let pool = klyra_db::create_pool(url).await?;
            tracing::info!("Database connection pool created");

            klyra_db::health_check(&pool).await?;
            klyra_db::run_migrations(&pool).await?;
            tracing::info!("Database migrations applied");

            Ok(Arc::new(klyra_db::PgStore::new(pool)))
        }
        (StoreBackend::Postgres, None) => Err(ConfigError::Missing("DATABASE_URL").into()),
        (StoreBackend::Memory, _) => {
            tracing::warn!("Using the in-memory store; all data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Resolve on SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
