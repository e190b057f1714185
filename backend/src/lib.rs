//! Dawn-patrol katabatic wind forecaster
//!
//! Scores pre-dawn downslope wind likelihood from weather signals, manages
//! the per-date prediction lifecycle and verifies locked predictions against
//! observed wind.

use std::sync::Arc;

use axum::{routing::get, Router};
use shared::ScoringEngine;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod services;
pub mod store;

pub use crate::config::Config;

use crate::clock::SharedClock;
use crate::error::{AppError, AppResult};
use crate::services::{LifecycleService, MaintenanceService, TrackingService};
use crate::store::RecordStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: Arc<Config>,
    pub engine: Arc<ScoringEngine>,
    pub lifecycle: LifecycleService,
    pub tracking: TrackingService,
    pub maintenance: MaintenanceService,
}

impl AppState {
    /// Wire services over an already migrated store
    pub fn build(config: Config, store: RecordStore, clock: SharedClock) -> AppResult<Self> {
        let engine = ScoringEngine::new(config.scoring.clone())
            .map_err(|e| AppError::Configuration(e.to_string()))?;
        let engine = Arc::new(engine);

        let schedule = config.lifecycle.schedule.clone();
        let tracking = TrackingService::new(
            store.clone(),
            schedule.clone(),
            config.verification.accuracy.clone(),
            clock.clone(),
        );
        let lifecycle = LifecycleService::new(
            store.clone(),
            engine.clone(),
            tracking.clone(),
            schedule,
            clock,
        );
        let maintenance = MaintenanceService::new(
            lifecycle.clone(),
            tracking.clone(),
            config.lifecycle.retention_days,
            config.verification.retention_days,
        );

        Ok(Self {
            db: store.pool().clone(),
            config: Arc::new(config),
            engine,
            lifecycle,
            tracking,
            maintenance,
        })
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Dawn Patrol Katabatic Forecast API v1.0"
}

/// Liveness endpoint
async fn health_check() -> &'static str {
    "OK"
}
