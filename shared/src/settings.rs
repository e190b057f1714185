//! Tunable constants for factor scoring and verification
//!
//! Every threshold, weight and bonus the engine uses lives here so it can be
//! recalibrated from configuration without touching the scoring logic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::FactorKind;

/// Linear score ramp for a single factor.
///
/// When `full_score_at` is above `zero_score_at` higher readings are better;
/// when it is below, lower readings are better.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RampSettings {
    pub full_score_at: f64,
    pub zero_score_at: f64,
    pub meets_at: f64,
}

impl RampSettings {
    pub const fn new(full_score_at: f64, zero_score_at: f64, meets_at: f64) -> Self {
        Self {
            full_score_at,
            zero_score_at,
            meets_at,
        }
    }

    pub fn higher_is_better(&self) -> bool {
        self.full_score_at > self.zero_score_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportWindSettings {
    /// Below this the flow provides no forcing
    pub calm_below: f64,
    /// Start of the favorable band
    pub min_speed: f64,
    /// End of the favorable band
    pub max_speed: f64,
    /// At or above this the flow disorganizes drainage completely
    pub disorganizing_speed: f64,
    /// Score used when no transport-wind data is available
    pub neutral_score: f64,
}

impl Default for TransportWindSettings {
    fn default() -> Self {
        Self {
            calm_below: 2.0,
            min_speed: 5.0,
            max_speed: 20.0,
            disorganizing_speed: 40.0,
            neutral_score: 50.0,
        }
    }
}

/// Per-factor weights; must sum to exactly one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorWeights {
    pub precipitation: Decimal,
    pub sky_clarity: Decimal,
    pub pressure_change: Decimal,
    pub temperature_differential: Decimal,
    pub transport_wind: Decimal,
}

impl FactorWeights {
    pub fn for_kind(&self, kind: FactorKind) -> Decimal {
        match kind {
            FactorKind::Precipitation => self.precipitation,
            FactorKind::SkyClarity => self.sky_clarity,
            FactorKind::PressureChange => self.pressure_change,
            FactorKind::TemperatureDifferential => self.temperature_differential,
            FactorKind::TransportWind => self.transport_wind,
        }
    }

    pub fn total(&self) -> Decimal {
        FactorKind::ALL.iter().map(|k| self.for_kind(*k)).sum()
    }
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            precipitation: Decimal::new(20, 2),
            sky_clarity: Decimal::new(20, 2),
            pressure_change: Decimal::new(15, 2),
            temperature_differential: Decimal::new(30, 2),
            transport_wind: Decimal::new(15, 2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BonusSettings {
    pub multi_factor_min_met: usize,
    pub multi_factor_bonus: f64,
    pub all_factor_bonus: f64,
}

impl Default for BonusSettings {
    fn default() -> Self {
        Self {
            multi_factor_min_met: 4,
            multi_factor_bonus: 20.0,
            all_factor_bonus: 25.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceSettings {
    pub high_min_met: usize,
    pub high_min_probability: f64,
    pub medium_min_met: usize,
    pub medium_min_probability: f64,
    /// Fewer available factors than this always yields low confidence
    pub min_available_factors: usize,
}

impl Default for ConfidenceSettings {
    fn default() -> Self {
        Self {
            high_min_met: 3,
            high_min_probability: 75.0,
            medium_min_met: 2,
            medium_min_probability: 50.0,
            min_available_factors: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationSettings {
    pub go_min_probability: f64,
    pub maybe_min_probability: f64,
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        Self {
            go_min_probability: 75.0,
            maybe_min_probability: 60.0,
        }
    }
}

/// Everything the factor evaluators and the weighted scoring engine read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    pub precipitation: RampSettings,
    pub sky_clarity: RampSettings,
    pub pressure_change: RampSettings,
    pub temperature_differential: RampSettings,
    pub transport_wind: TransportWindSettings,
    pub weights: FactorWeights,
    pub bonus: BonusSettings,
    /// How hard a missed threshold cuts the factor's contribution (0 disables)
    pub penalty_strength: f64,
    pub confidence: ConfidenceSettings,
    pub recommendation: RecommendationSettings,
    /// Uncalibrated model: cap the published probability at `confidence_cap`
    pub learning_mode: bool,
    pub confidence_cap: f64,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            precipitation: RampSettings::new(5.0, 21.0, 20.0),
            sky_clarity: RampSettings::new(80.0, 60.0, 70.0),
            pressure_change: RampSettings::new(3.0, 1.0, 2.0),
            temperature_differential: RampSettings::new(12.0, 6.0, 9.0),
            transport_wind: TransportWindSettings::default(),
            weights: FactorWeights::default(),
            bonus: BonusSettings::default(),
            penalty_strength: 1.0,
            confidence: ConfidenceSettings::default(),
            recommendation: RecommendationSettings::default(),
            learning_mode: false,
            confidence_cap: 65.0,
        }
    }
}

impl ScoringSettings {
    pub fn ramp_for(&self, kind: FactorKind) -> Option<RampSettings> {
        match kind {
            FactorKind::Precipitation => Some(self.precipitation),
            FactorKind::SkyClarity => Some(self.sky_clarity),
            FactorKind::PressureChange => Some(self.pressure_change),
            FactorKind::TemperatureDifferential => Some(self.temperature_differential),
            FactorKind::TransportWind => None,
        }
    }
}

/// Sector of favorable wind directions, clockwise from `from_deg` to `to_deg`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionSector {
    pub from_deg: f64,
    pub to_deg: f64,
}

impl DirectionSector {
    pub fn contains(&self, direction_deg: f64) -> bool {
        let d = direction_deg.rem_euclid(360.0);
        let from = self.from_deg.rem_euclid(360.0);
        let to = self.to_deg.rem_euclid(360.0);
        if from <= to {
            d >= from && d <= to
        } else {
            d >= from || d <= to
        }
    }
}

/// Constants for turning observed wind into an accuracy score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationSettings {
    /// Observed average speed at or above this counts as a session
    pub min_favorable_speed: f64,
    /// Speed implied by a 100% prediction
    pub expected_speed_at_certainty: f64,
    /// Optional drainage direction the observed flow must come from
    pub favorable_direction: Option<DirectionSector>,
    pub outcome_weight: f64,
    pub speed_weight: f64,
}

impl Default for VerificationSettings {
    fn default() -> Self {
        Self {
            min_favorable_speed: 8.0,
            expected_speed_at_certainty: 15.0,
            favorable_direction: None,
            outcome_weight: 0.6,
            speed_weight: 0.4,
        }
    }
}
