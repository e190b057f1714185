//! WebAssembly module for the dawn-patrol forecaster
//!
//! Provides client-side computation for:
//! - Scoring a weather signal into a prediction
//! - Per-factor evaluation
//! - Lifecycle phase lookup
//! - Offline signal validation
//!
//! All structured inputs and outputs cross the boundary as JSON strings.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::validation::*;

use shared::{
    expected_speed, DataQuality, LifecycleSchedule, ScoringEngine, ScoringSettings,
    VerificationSettings, WeatherSignal,
};

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("Serialization failed: {}", e))
}

fn parse_date(target_date: &str) -> Result<NaiveDate, String> {
    target_date
        .parse::<NaiveDate>()
        .map_err(|e| format!("Invalid target date '{}': {}", target_date, e))
}

fn parse_signal(signal_json: &str) -> Result<WeatherSignal, String> {
    let signal: WeatherSignal = serde_json::from_str(signal_json)
        .map_err(|e| format!("Invalid signal JSON: {}", e))?;
    validate_signal(&signal)?;
    Ok(signal)
}

fn instant(now_ms: f64) -> Result<DateTime<Utc>, String> {
    DateTime::<Utc>::from_timestamp_millis(now_ms as i64)
        .ok_or_else(|| format!("Timestamp {} is out of range", now_ms))
}

fn build_engine(settings_json: Option<&str>) -> Result<ScoringEngine, String> {
    let settings = match settings_json.map(str::trim).filter(|json| !json.is_empty()) {
        Some(json) => serde_json::from_str::<ScoringSettings>(json)
            .map_err(|e| format!("Invalid settings JSON: {}", e))?,
        None => ScoringSettings::default(),
    };
    validate_scoring_settings(&settings)?;
    ScoringEngine::new(settings).map_err(|e| e.to_string())
}

fn score_signal_inner(
    target_date: &str,
    signal_json: &str,
    settings_json: Option<&str>,
    now_ms: f64,
) -> Result<Prediction, String> {
    let engine = build_engine(settings_json)?;
    let date = parse_date(target_date)?;
    let signal = parse_signal(signal_json)?;
    Ok(engine.predict(date, &signal, instant(now_ms)?))
}

fn evaluate_factors_inner(signal_json: &str, settings_json: Option<&str>) -> Result<String, String> {
    let engine = build_engine(settings_json)?;
    let signal = parse_signal(signal_json)?;
    to_json(&engine.evaluate(&signal))
}

fn lifecycle_phase_inner(
    target_date: &str,
    now_ms: f64,
    schedule_json: Option<&str>,
) -> Result<String, String> {
    let schedule = match schedule_json.map(str::trim).filter(|json| !json.is_empty()) {
        Some(json) => serde_json::from_str::<LifecycleSchedule>(json)
            .map_err(|e| format!("Invalid schedule JSON: {}", e))?,
        None => LifecycleSchedule::default(),
    };
    schedule.validate()?;
    let date = parse_date(target_date)?;
    Ok(schedule.phase_at(date, instant(now_ms)?).to_string())
}

/// Score a signal for a target date at an explicit instant (epoch millis)
#[wasm_bindgen]
pub fn score_signal_at(
    target_date: &str,
    signal_json: &str,
    settings_json: Option<String>,
    now_ms: f64,
) -> Result<String, JsValue> {
    score_signal_inner(target_date, signal_json, settings_json.as_deref(), now_ms)
        .and_then(|prediction| to_json(&prediction))
        .map_err(|e| JsValue::from_str(&e))
}

/// Score a signal for a target date using the browser clock
#[wasm_bindgen]
pub fn score_signal(
    target_date: &str,
    signal_json: &str,
    settings_json: Option<String>,
) -> Result<String, JsValue> {
    let prediction = score_signal_inner(
        target_date,
        signal_json,
        settings_json.as_deref(),
        js_sys::Date::now(),
    )
    .map_err(|e| JsValue::from_str(&e))?;

    if prediction.data_quality == DataQuality::Preliminary {
        for note in &prediction.notes {
            web_sys::console::warn_1(&JsValue::from_str(note));
        }
    }
    to_json(&prediction).map_err(|e| JsValue::from_str(&e))
}

/// Per-factor results for a signal, in registry order
#[wasm_bindgen]
pub fn evaluate_factors(signal_json: &str, settings_json: Option<String>) -> Result<String, JsValue> {
    evaluate_factors_inner(signal_json, settings_json.as_deref()).map_err(|e| JsValue::from_str(&e))
}

/// Lifecycle state a target date is in at `now_ms`
#[wasm_bindgen]
pub fn lifecycle_phase(
    target_date: &str,
    now_ms: f64,
    schedule_json: Option<String>,
) -> Result<String, JsValue> {
    lifecycle_phase_inner(target_date, now_ms, schedule_json.as_deref())
        .map_err(|e| JsValue::from_str(&e))
}

/// Validation message for a signal, or `None` when it is usable
#[wasm_bindgen]
pub fn validate_weather_signal(signal_json: &str) -> Option<String> {
    parse_signal(signal_json).err()
}

/// Wind speed a predicted probability implies under default verification settings
#[wasm_bindgen]
pub fn expected_wind_speed(probability: f64) -> f64 {
    expected_speed(probability, &VerificationSettings::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAVORABLE: &str = r#"{
        "precip_probability_analysis": 2.0,
        "precip_probability_target": 4.0,
        "sky_clear_percent": 90.0,
        "pressure_change": 3.5,
        "temperature_differential": 14.0,
        "transport_wind": { "speed": 10.0, "organization": "organized" }
    }"#;

    // 2026-03-14T19:00:00Z
    const EVENING_MS: f64 = 1_773_514_800_000.0;

    #[test]
    fn test_score_favorable_signal() {
        let prediction = score_signal_inner("2026-03-15", FAVORABLE, None, EVENING_MS).unwrap();
        assert_eq!(prediction.recommendation, Recommendation::Go);
        assert_eq!(prediction.data_quality, DataQuality::Complete);
        assert_eq!(prediction.factors.len(), 5);
    }

    #[test]
    fn test_learning_mode_settings_cap_probability() {
        let settings = r#"{ "learning_mode": true }"#;
        let prediction =
            score_signal_inner("2026-03-15", FAVORABLE, Some(settings), EVENING_MS).unwrap();
        assert!(prediction.probability <= 65.0);
    }

    #[test]
    fn test_evaluate_factors_lists_all_kinds() {
        let json = evaluate_factors_inner(FAVORABLE, None).unwrap();
        let factors: Vec<FactorResult> = serde_json::from_str(&json).unwrap();
        let kinds: Vec<FactorKind> = factors.iter().map(|f| f.kind).collect();
        assert_eq!(kinds, FactorKind::ALL.to_vec());
    }

    #[test]
    fn test_lifecycle_phase() {
        assert_eq!(
            lifecycle_phase_inner("2026-03-15", EVENING_MS, None).unwrap(),
            "locked-evening"
        );
        assert_eq!(
            lifecycle_phase_inner("2026-03-20", EVENING_MS, None).unwrap(),
            "preview"
        );
    }

    #[test]
    fn test_validate_weather_signal() {
        assert_eq!(validate_weather_signal(FAVORABLE), None);
        assert!(validate_weather_signal(r#"{ "sky_clear_percent": 150.0 }"#).is_some());
        assert!(validate_weather_signal("not json").is_some());
    }

    #[test]
    fn test_invalid_date_is_reported() {
        assert!(score_signal_inner("15/03/2026", FAVORABLE, None, EVENING_MS).is_err());
    }

    #[test]
    fn test_expected_wind_speed() {
        assert!((expected_wind_speed(100.0) - 15.0).abs() < 0.001);
        assert!((expected_wind_speed(0.0)).abs() < 0.001);
    }
}
