use std::time::Duration;

use anyhow::{Context, Result};
use domain::ports::Backend;
use study_groups_api::app::{create_app, AppState};
use study_groups_api::config::{BackendDriver, Config};
use study_groups_api::jobs::{listen_auth_events, probe_backend, JobRunner, BACKEND_PROBE_INTERVAL};
use study_groups_api::middleware::{init_metrics, logging::init_logging};
use tracing::info;

async fn connect_backend(config: &Config) -> Result<Backend> {
    match config.database.driver {
        BackendDriver::Postgres => {
            let db_config = persistence::db::DatabaseConfig::from(&config.database);
            let pool = persistence::db::create_pool(&db_config)
                .await
                .context("Failed to connect to PostgreSQL")?;

            info!("Running database migrations...");
            sqlx::migrate!("../persistence/src/migrations")
                .run(&pool)
                .await?;
            info!("Migrations completed");

            Ok(persistence::postgres_backend(pool))
        }
        BackendDriver::Memory => {
            info!("Using in-memory backend; data is lost on restart");
            Ok(Backend::in_memory())
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    config.validate()?;

    init_logging(&config.logging);
    init_metrics().context("Failed to install Prometheus recorder")?;

    info!("Starting Study Groups API v{}", env!("CARGO_PKG_VERSION"));

    let backend = connect_backend(&config).await?;

    let mut jobs = JobRunner::new();
    let auth_events = backend.auth.subscribe();
    jobs.spawn("auth_events", move |shutdown| async move {
        let handled = listen_auth_events(auth_events, shutdown).await;
        info!(handled, "Auth event listener stopped");
    });
    let health = backend.health.clone();
    jobs.spawn("backend_health", move |shutdown| {
        probe_backend(health, BACKEND_PROBE_INTERVAL, shutdown)
    });

    let addr = config.socket_addr();
    let state = AppState::new(config, backend)?;
    let app = create_app(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    jobs.shutdown(Duration::from_secs(5)).await;
    Ok(())
}
