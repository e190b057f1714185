//! Route definitions for the dawn-patrol forecaster

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/predictions", prediction_routes())
        .nest("/verifications", verification_routes())
        .nest("/maintenance", maintenance_routes())
}

/// Prediction serving and locking
fn prediction_routes() -> Router<AppState> {
    Router::new()
        .route("/:date", post(handlers::request_prediction))
        .route("/:date/state", get(handlers::get_lifecycle_state))
        .route("/:date/lock", post(handlers::lock_prediction))
}

/// Verification and accuracy history
fn verification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_accuracy_history))
        .route("/summary", get(handlers::get_accuracy_summary))
        .route("/:date", post(handlers::verify_prediction))
}

fn maintenance_routes() -> Router<AppState> {
    Router::new().route("/purge", post(handlers::purge_stale_records))
}
