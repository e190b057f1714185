//! Validation utilities for forecaster inputs and settings

use rust_decimal::Decimal;

use crate::models::{ObservedSignal, WeatherSignal};
use crate::settings::{ScoringSettings, VerificationSettings};

// ============================================================================
// Signal Validations
// ============================================================================

fn validate_percent(value: Option<f64>, message: &'static str) -> Result<(), &'static str> {
    match value {
        Some(v) if !v.is_finite() || !(0.0..=100.0).contains(&v) => Err(message),
        _ => Ok(()),
    }
}

fn validate_finite(value: Option<f64>, message: &'static str) -> Result<(), &'static str> {
    match value {
        Some(v) if !v.is_finite() => Err(message),
        _ => Ok(()),
    }
}

/// Validate that a weather signal is unit-normalized
pub fn validate_signal(signal: &WeatherSignal) -> Result<(), &'static str> {
    validate_percent(
        signal.precip_probability_analysis,
        "Analysis-window precipitation probability must be between 0 and 100",
    )?;
    validate_percent(
        signal.precip_probability_target,
        "Target-window precipitation probability must be between 0 and 100",
    )?;
    validate_percent(
        signal.sky_clear_percent,
        "Sky-clear fraction must be between 0 and 100",
    )?;
    validate_finite(signal.pressure_change, "Pressure change must be a finite number")?;
    validate_finite(
        signal.temperature_differential,
        "Temperature differential must be a finite number",
    )?;
    if let Some(wind) = &signal.transport_wind {
        if !wind.speed.is_finite() || wind.speed < 0.0 {
            return Err("Transport wind speed must be a non-negative number");
        }
    }
    Ok(())
}

/// Validate an observed wind summary
pub fn validate_observed(observed: &ObservedSignal) -> Result<(), &'static str> {
    if !observed.average_speed.is_finite() || observed.average_speed < 0.0 {
        return Err("Observed average speed must be a non-negative number");
    }
    validate_finite(
        observed.average_direction_deg,
        "Observed direction must be a finite number",
    )?;
    Ok(())
}

// ============================================================================
// Settings Validations
// ============================================================================

/// Validate scoring settings before the engine is built
pub fn validate_scoring_settings(settings: &ScoringSettings) -> Result<(), &'static str> {
    if settings.weights.total() != Decimal::ONE {
        return Err("Factor weights must sum to 1");
    }
    let ramps = [
        settings.precipitation,
        settings.sky_clarity,
        settings.pressure_change,
        settings.temperature_differential,
    ];
    for ramp in ramps {
        if ramp.full_score_at == ramp.zero_score_at {
            return Err("Factor ramp endpoints must differ");
        }
    }
    let wind = &settings.transport_wind;
    if !(wind.calm_below < wind.min_speed
        && wind.min_speed <= wind.max_speed
        && wind.max_speed < wind.disorganizing_speed)
    {
        return Err("Transport wind speeds must increase: calm < min <= max < disorganizing");
    }
    if !(0.0..=100.0).contains(&settings.confidence_cap) {
        return Err("Confidence cap must be between 0 and 100");
    }
    if settings.penalty_strength < 0.0 {
        return Err("Penalty strength cannot be negative");
    }
    Ok(())
}

/// Validate verification settings
pub fn validate_verification_settings(settings: &VerificationSettings) -> Result<(), &'static str> {
    if settings.min_favorable_speed <= 0.0 || settings.expected_speed_at_certainty <= 0.0 {
        return Err("Verification speeds must be positive");
    }
    if settings.outcome_weight < 0.0 || settings.speed_weight < 0.0 {
        return Err("Accuracy weights cannot be negative");
    }
    if settings.outcome_weight + settings.speed_weight <= 0.0 {
        return Err("At least one accuracy weight must be positive");
    }
    Ok(())
}
