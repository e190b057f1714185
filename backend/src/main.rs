//! Dawn Patrol - Backend Server
//!
//! Serves katabatic wind predictions, advances their lifecycle on schedule
//! and records verification against observed wind.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use dawn_patrol::{clock::SystemClock, create_app, store::RecordStore, AppState, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dawn_patrol=debug,tower_http=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting Dawn Patrol Server");
    tracing::info!("Environment: {}", config.environment);

    // Open the record store and apply migrations
    tracing::info!("Opening record store...");
    let store = RecordStore::connect(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await?;
    tracing::info!("Record store ready");

    let state = AppState::build(config.clone(), store, Arc::new(SystemClock))?;

    if config.maintenance.enabled {
        let every = Duration::from_secs(config.maintenance.sweep_interval_secs.max(60));
        tracing::info!("Maintenance sweep every {}s", every.as_secs());
        state.maintenance.clone().spawn(every);
    }

    // Build application
    let app = create_app(state);

    // Start server
    let host: std::net::IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::new(host, config.server.port);
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
