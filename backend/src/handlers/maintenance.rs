//! HTTP handler for on-demand retention purges

use axum::{extract::State, Json};

use crate::{error::AppResult, services::PurgeReport, AppState};

/// Run one retention sweep immediately
pub async fn purge_stale_records(State(state): State<AppState>) -> AppResult<Json<PurgeReport>> {
    let report = state.maintenance.sweep().await?;
    Ok(Json(report))
}
