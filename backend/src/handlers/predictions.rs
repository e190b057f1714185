//! HTTP handlers for serving and locking predictions

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use shared::{validate_signal, LifecycleRecord, LockType, WeatherSignal};

use crate::{
    error::{AppError, AppResult},
    services::{LockOutcome, ServedPrediction},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct LockRequest {
    pub signal: WeatherSignal,
    pub lock_type: LockType,
}

/// Serve the prediction for a date, advancing its lifecycle as needed
pub async fn request_prediction(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
    Json(signal): Json<WeatherSignal>,
) -> AppResult<Json<ServedPrediction>> {
    validate_signal(&signal).map_err(|e| AppError::validation("signal", e))?;
    let served = state.lifecycle.request_prediction(date, &signal).await?;
    Ok(Json(served))
}

/// Current lifecycle record for a date
pub async fn get_lifecycle_state(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
) -> AppResult<Json<LifecycleRecord>> {
    let record = state.lifecycle.get_current_state(date).await?;
    Ok(Json(record))
}

/// Score a signal and lock the result
pub async fn lock_prediction(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
    Json(input): Json<LockRequest>,
) -> AppResult<Json<LockOutcome>> {
    validate_signal(&input.signal).map_err(|e| AppError::validation("signal", e))?;
    let prediction = state.lifecycle.score(date, &input.signal);
    let outcome = state
        .lifecycle
        .lock(date, prediction, input.lock_type)
        .await?;
    Ok(Json(outcome))
}
