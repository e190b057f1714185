//! Factor models

use serde::{Deserialize, Serialize};

/// The closed set of factors the engine knows how to score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    Precipitation,
    SkyClarity,
    PressureChange,
    TemperatureDifferential,
    TransportWind,
}

impl FactorKind {
    /// Registration order used by the default evaluator set
    pub const ALL: [FactorKind; 5] = [
        FactorKind::Precipitation,
        FactorKind::SkyClarity,
        FactorKind::PressureChange,
        FactorKind::TemperatureDifferential,
        FactorKind::TransportWind,
    ];

    /// Absence of this factor forces low confidence
    pub fn is_critical(&self) -> bool {
        matches!(self, FactorKind::TemperatureDifferential)
    }

    /// Optional factors fall back to a neutral score when missing
    pub fn is_optional(&self) -> bool {
        matches!(self, FactorKind::TransportWind)
    }
}

impl std::fmt::Display for FactorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FactorKind::Precipitation => write!(f, "Precipitation"),
            FactorKind::SkyClarity => write!(f, "Sky clarity"),
            FactorKind::PressureChange => write!(f, "Pressure change"),
            FactorKind::TemperatureDifferential => write!(f, "Temperature differential"),
            FactorKind::TransportWind => write!(f, "Transport wind"),
        }
    }
}

/// Pass condition for a factor's raw value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FactorThreshold {
    AtMost { value: f64 },
    AtLeast { value: f64 },
    Within { min: f64, max: f64 },
}

impl FactorThreshold {
    /// Whether a raw reading passes this threshold
    pub fn is_met_by(&self, raw: f64) -> bool {
        match *self {
            FactorThreshold::AtMost { value } => raw <= value,
            FactorThreshold::AtLeast { value } => raw >= value,
            FactorThreshold::Within { min, max } => raw >= min && raw <= max,
        }
    }

    /// Relative distance by which a reading misses the threshold, in [0, 1].
    ///
    /// Zero when the threshold is met.
    pub fn shortfall(&self, raw: f64) -> f64 {
        if self.is_met_by(raw) {
            return 0.0;
        }
        let ratio = match *self {
            FactorThreshold::AtMost { value } => (raw - value) / value.abs().max(1.0),
            FactorThreshold::AtLeast { value } => (value - raw) / value.abs().max(1.0),
            FactorThreshold::Within { min, max } => {
                if raw < min {
                    (min - raw) / min.abs().max(1.0)
                } else {
                    (raw - max) / max.abs().max(1.0)
                }
            }
        };
        ratio.clamp(0.0, 1.0)
    }
}

impl std::fmt::Display for FactorThreshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FactorThreshold::AtMost { value } => write!(f, "≤{}", value),
            FactorThreshold::AtLeast { value } => write!(f, "≥{}", value),
            FactorThreshold::Within { min, max } => write!(f, "{}–{}", min, max),
        }
    }
}

/// Outcome of evaluating one factor against a signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorResult {
    pub kind: FactorKind,
    pub name: String,
    /// `None` when the input was missing from the signal
    pub raw_value: Option<f64>,
    pub threshold: FactorThreshold,
    pub meets: bool,
    /// Normalized score, 0–100
    pub score: f64,
    /// Share of the weighted sum, 0–1
    pub weight: f64,
    pub explanation: String,
}

impl FactorResult {
    pub fn is_available(&self) -> bool {
        self.raw_value.is_some()
    }
}
