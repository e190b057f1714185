//! HTTP handlers for verification and accuracy history

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use shared::{validate_observed, AccuracySummary, ObservedSignal, VerificationRecord};

use crate::{
    error::{AppError, AppResult},
    AppState,
};

const DEFAULT_HISTORY_LIMIT: u32 = 30;
const MAX_HISTORY_LIMIT: u32 = 365;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

impl HistoryQuery {
    fn limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT)
    }
}

/// Verify the locked prediction for a date against observed wind
pub async fn verify_prediction(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
    Json(observed): Json<ObservedSignal>,
) -> AppResult<Json<VerificationRecord>> {
    validate_observed(&observed).map_err(|e| AppError::validation("observed", e))?;
    let record = state.tracking.verify(date, &observed).await?;
    Ok(Json(record))
}

/// Most recent verification records, newest first
pub async fn get_accuracy_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<Vec<VerificationRecord>>> {
    let history = state.tracking.accuracy_history(query.limit()).await?;
    Ok(Json(history.collect()))
}

/// Aggregate accuracy over the most recent verifications
pub async fn get_accuracy_summary(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<AccuracySummary>> {
    let summary = state.tracking.accuracy_summary(query.limit()).await?;
    Ok(Json(summary))
}
