//! Waypoint Server - Main entry point

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use waypoint_core::{
    api::{self, AppState},
    config::Config,
    distance::GoogleDistanceMatrixClient,
    store::{InMemoryJobStore, JobStore, PgJobStore},
    telemetry,
};

/// Asynchronous route distance service.
#[derive(Parser, Debug)]
#[command(name = "waypoint-server", version, about)]
struct Args {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, env = "WAYPOINT_CONFIG")]
    config: Option<PathBuf>,

    /// Override the HTTP port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load environment variables
    dotenvy::dotenv().ok();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    if let Some(port) = args.port {
        config.server.port = port;
    }

    telemetry::init_logging(&config.logging, &config.environment)?;
    let metrics = telemetry::init_metrics(&config.metrics, "waypoint-server")?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        "Starting Waypoint Server"
    );

    let store: Arc<dyn JobStore> = match &config.database {
        Some(database) => {
            let store = PgJobStore::connect(database).await?;
            store.migrate().await?;
            tracing::info!("Connected to database, migrations applied");
            Arc::new(store)
        }
        None => {
            tracing::warn!("No database configured; jobs are kept in memory and lost on restart");
            Arc::new(InMemoryJobStore::new())
        }
    };

    let distance = Arc::new(GoogleDistanceMatrixClient::new(&config.distance)?);

    let state = AppState::new(store, distance, &config.jobs, metrics);
    let pool = state.pool.clone();
    let app = api::build_router(state);

    let addr = config.bind_address();
    tracing::info!(address = %addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let in-flight workers write their outcome before exiting
    pool.shutdown(config.jobs.shutdown_timeout).await;
    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
