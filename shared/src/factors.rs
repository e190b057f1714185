//! Factor evaluators
//!
//! Each evaluator turns one reading from a [`WeatherSignal`] into a
//! [`FactorResult`]. Evaluators are pure and independent; the ordered
//! [`FactorRegistry`] checks at construction that their weights sum to one.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{FactorKind, FactorResult, FactorThreshold, TransportWind, WeatherSignal};
use crate::settings::{RampSettings, ScoringSettings, TransportWindSettings};

/// Common interface for all factor evaluators
pub trait FactorEvaluator {
    fn kind(&self) -> FactorKind;

    fn weight(&self) -> Decimal;

    fn evaluate(&self, signal: &WeatherSignal) -> FactorResult;
}

/// Score used for a factor whose input is missing
pub const NEUTRAL_SCORE: f64 = 50.0;

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn weight_f64(weight: Decimal) -> f64 {
    weight.to_f64().unwrap_or(0.0)
}

/// Linear 0–100 score for a raw reading on a ramp
pub fn ramp_score(ramp: &RampSettings, raw: f64) -> f64 {
    let (full, zero) = (ramp.full_score_at, ramp.zero_score_at);
    let score = if ramp.higher_is_better() {
        if raw >= full {
            100.0
        } else if raw <= zero {
            0.0
        } else {
            (raw - zero) / (full - zero) * 100.0
        }
    } else if raw <= full {
        100.0
    } else if raw >= zero {
        0.0
    } else {
        (zero - raw) / (zero - full) * 100.0
    };
    round1(score.clamp(0.0, 100.0))
}

/// Threshold implied by a ramp's direction
pub fn ramp_threshold(ramp: &RampSettings) -> FactorThreshold {
    if ramp.higher_is_better() {
        FactorThreshold::AtLeast {
            value: ramp.meets_at,
        }
    } else {
        FactorThreshold::AtMost {
            value: ramp.meets_at,
        }
    }
}

// ============================================================================
// Ramp factors
// ============================================================================

/// Evaluator for the four factors scored on a linear ramp
#[derive(Debug, Clone)]
pub struct RampFactor {
    kind: FactorKind,
    ramp: RampSettings,
    weight: Decimal,
}

impl RampFactor {
    pub fn new(kind: FactorKind, ramp: RampSettings, weight: Decimal) -> Self {
        Self { kind, ramp, weight }
    }

    fn reading(&self, signal: &WeatherSignal) -> Option<f64> {
        let raw = match self.kind {
            FactorKind::Precipitation => signal.precip_probability(),
            FactorKind::SkyClarity => signal.sky_clear_percent,
            // Magnitude of change; the cooling interval can rise or fall
            FactorKind::PressureChange => signal.pressure_change.map(f64::abs),
            FactorKind::TemperatureDifferential => signal.temperature_differential,
            FactorKind::TransportWind => None,
        };
        raw.filter(|v| v.is_finite())
    }

    fn explain(&self, raw: Option<f64>, meets: bool) -> String {
        let threshold = ramp_threshold(&self.ramp);
        let Some(raw) = raw else {
            return match self.kind {
                FactorKind::TemperatureDifferential => {
                    "Temperature differential unavailable; confidence held at low".to_string()
                }
                _ => format!("{} data unavailable; scored neutral", self.kind),
            };
        };
        match (self.kind, meets) {
            (FactorKind::Precipitation, true) => {
                format!("Precipitation risk {:.0}% is low enough (needs {}%)", raw, threshold)
            }
            (FactorKind::Precipitation, false) => {
                format!("Precipitation risk {:.0}% is too high (needs {}%)", raw, threshold)
            }
            (FactorKind::SkyClarity, true) => format!(
                "Skies {:.0}% clear through the cooling window allow strong radiational cooling",
                raw
            ),
            (FactorKind::SkyClarity, false) => format!(
                "Skies only {:.0}% clear during cooling (needs {}%)",
                raw, threshold
            ),
            (FactorKind::PressureChange, true) => {
                format!("Pressure change of {:.1} supports drainage flow", raw)
            }
            (FactorKind::PressureChange, false) => {
                format!("Pressure change of {:.1} is weak (needs {})", raw, threshold)
            }
            (FactorKind::TemperatureDifferential, true) => format!(
                "Valley-to-ridge temperature differential of {:.1}° drives katabatic flow",
                raw
            ),
            (FactorKind::TemperatureDifferential, false) => format!(
                "Temperature differential of {:.1}° is too small (needs {}°)",
                raw, threshold
            ),
            (FactorKind::TransportWind, _) => String::new(),
        }
    }
}

impl FactorEvaluator for RampFactor {
    fn kind(&self) -> FactorKind {
        self.kind
    }

    fn weight(&self) -> Decimal {
        self.weight
    }

    fn evaluate(&self, signal: &WeatherSignal) -> FactorResult {
        let raw = self.reading(signal);
        let threshold = ramp_threshold(&self.ramp);
        let meets = raw.map(|v| threshold.is_met_by(v)).unwrap_or(false);
        let score = raw
            .map(|v| ramp_score(&self.ramp, v))
            .unwrap_or(NEUTRAL_SCORE);

        FactorResult {
            kind: self.kind,
            name: self.kind.to_string(),
            raw_value: raw,
            threshold,
            meets,
            score,
            weight: weight_f64(self.weight),
            explanation: self.explain(raw, meets),
        }
    }
}

// ============================================================================
// Transport wind
// ============================================================================

/// Rewards organized upper-level flow that is neither calm nor strong
#[derive(Debug, Clone)]
pub struct TransportWindFactor {
    settings: TransportWindSettings,
    weight: Decimal,
}

impl TransportWindFactor {
    pub fn new(settings: TransportWindSettings, weight: Decimal) -> Self {
        Self { settings, weight }
    }

    fn speed_score(&self, speed: f64) -> f64 {
        let s = &self.settings;
        const CALM_SCORE: f64 = 20.0;
        if speed <= s.calm_below {
            CALM_SCORE
        } else if speed < s.min_speed {
            CALM_SCORE + (speed - s.calm_below) / (s.min_speed - s.calm_below) * (100.0 - CALM_SCORE)
        } else if speed <= s.max_speed {
            100.0
        } else if speed < s.disorganizing_speed {
            (s.disorganizing_speed - speed) / (s.disorganizing_speed - s.max_speed) * 100.0
        } else {
            0.0
        }
    }

    fn explain(&self, wind: Option<&TransportWind>, meets: bool) -> String {
        let Some(wind) = wind.filter(|w| w.speed.is_finite()) else {
            return "Transport wind unavailable; scored neutral".to_string();
        };
        if meets {
            format!(
                "Transport wind {:.0} with {} flow supports drainage",
                wind.speed, wind.organization
            )
        } else if wind.speed < self.settings.min_speed {
            format!("Transport wind {:.0} is too light to organize drainage", wind.speed)
        } else {
            format!(
                "Transport wind {:.0} is strong enough to disrupt drainage",
                wind.speed
            )
        }
    }
}

impl FactorEvaluator for TransportWindFactor {
    fn kind(&self) -> FactorKind {
        FactorKind::TransportWind
    }

    fn weight(&self) -> Decimal {
        self.weight
    }

    fn evaluate(&self, signal: &WeatherSignal) -> FactorResult {
        let wind = signal.transport_wind.as_ref().filter(|w| w.speed.is_finite());
        let threshold = FactorThreshold::Within {
            min: self.settings.min_speed,
            max: self.settings.max_speed,
        };
        let raw = wind.map(|w| w.speed);
        let meets = raw.map(|v| threshold.is_met_by(v)).unwrap_or(false);
        let score = match wind {
            Some(w) => round1((self.speed_score(w.speed) * w.organization.multiplier()).clamp(0.0, 100.0)),
            None => self.settings.neutral_score.clamp(0.0, 100.0),
        };

        FactorResult {
            kind: FactorKind::TransportWind,
            name: FactorKind::TransportWind.to_string(),
            raw_value: raw,
            threshold,
            meets,
            score,
            weight: weight_f64(self.weight),
            explanation: self.explain(wind, meets),
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Closed set of evaluator implementations
#[derive(Debug, Clone)]
pub enum Evaluator {
    Ramp(RampFactor),
    TransportWind(TransportWindFactor),
}

impl FactorEvaluator for Evaluator {
    fn kind(&self) -> FactorKind {
        match self {
            Evaluator::Ramp(f) => f.kind(),
            Evaluator::TransportWind(f) => f.kind(),
        }
    }

    fn weight(&self) -> Decimal {
        match self {
            Evaluator::Ramp(f) => f.weight(),
            Evaluator::TransportWind(f) => f.weight(),
        }
    }

    fn evaluate(&self, signal: &WeatherSignal) -> FactorResult {
        match self {
            Evaluator::Ramp(f) => f.evaluate(signal),
            Evaluator::TransportWind(f) => f.evaluate(signal),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("No factor evaluators registered")]
    Empty,

    #[error("Factor registered twice: {0}")]
    DuplicateFactor(FactorKind),

    #[error("Weight {weight} for {kind} is outside 0..=1")]
    WeightOutOfRange { kind: FactorKind, weight: Decimal },

    #[error("Factor weights sum to {0}, expected 1")]
    WeightSum(Decimal),
}

/// Ordered list of evaluators whose weights sum to exactly one
#[derive(Debug, Clone)]
pub struct FactorRegistry {
    evaluators: Vec<Evaluator>,
}

impl FactorRegistry {
    pub fn new(evaluators: Vec<Evaluator>) -> Result<Self, RegistryError> {
        if evaluators.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut seen = Vec::with_capacity(evaluators.len());
        for evaluator in &evaluators {
            let kind = evaluator.kind();
            if seen.contains(&kind) {
                return Err(RegistryError::DuplicateFactor(kind));
            }
            seen.push(kind);

            let weight = evaluator.weight();
            if weight < Decimal::ZERO || weight > Decimal::ONE {
                return Err(RegistryError::WeightOutOfRange { kind, weight });
            }
        }

        let total: Decimal = evaluators.iter().map(|e| e.weight()).sum();
        if total != Decimal::ONE {
            return Err(RegistryError::WeightSum(total));
        }

        Ok(Self { evaluators })
    }

    /// Standard five-factor set in registration order
    pub fn from_settings(settings: &ScoringSettings) -> Result<Self, RegistryError> {
        let evaluators = FactorKind::ALL
            .iter()
            .map(|kind| {
                let weight = settings.weights.for_kind(*kind);
                match settings.ramp_for(*kind) {
                    Some(ramp) => Evaluator::Ramp(RampFactor::new(*kind, ramp, weight)),
                    None => Evaluator::TransportWind(TransportWindFactor::new(
                        settings.transport_wind,
                        weight,
                    )),
                }
            })
            .collect();

        Self::new(evaluators)
    }

    pub fn evaluate(&self, signal: &WeatherSignal) -> Vec<FactorResult> {
        self.evaluators.iter().map(|e| e.evaluate(signal)).collect()
    }

    pub fn kinds(&self) -> Vec<FactorKind> {
        self.evaluators.iter().map(|e| e.kind()).collect()
    }

    pub fn len(&self) -> usize {
        self.evaluators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluators.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FlowOrganization;
    use proptest::prelude::*;

    fn registry() -> FactorRegistry {
        FactorRegistry::from_settings(&ScoringSettings::default()).unwrap()
    }

    fn result_for(kind: FactorKind, signal: &WeatherSignal) -> FactorResult {
        registry()
            .evaluate(signal)
            .into_iter()
            .find(|r| r.kind == kind)
            .unwrap()
    }

    #[test]
    fn test_precipitation_ramp() {
        let settings = ScoringSettings::default();
        assert_eq!(ramp_score(&settings.precipitation, 5.0), 100.0);
        assert_eq!(ramp_score(&settings.precipitation, 0.0), 100.0);
        assert_eq!(ramp_score(&settings.precipitation, 13.0), 50.0);
        assert_eq!(ramp_score(&settings.precipitation, 21.0), 0.0);
        assert_eq!(ramp_score(&settings.precipitation, 60.0), 0.0);
    }

    #[test]
    fn test_precipitation_uses_worst_window() {
        let signal = WeatherSignal {
            precip_probability_analysis: Some(5.0),
            precip_probability_target: Some(25.0),
            ..Default::default()
        };
        let result = result_for(FactorKind::Precipitation, &signal);
        assert_eq!(result.raw_value, Some(25.0));
        assert!(!result.meets);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_sky_clarity_thresholds() {
        let settings = ScoringSettings::default();
        assert_eq!(ramp_score(&settings.sky_clarity, 85.0), 100.0);
        assert_eq!(ramp_score(&settings.sky_clarity, 70.0), 50.0);
        assert_eq!(ramp_score(&settings.sky_clarity, 59.0), 0.0);

        let signal = WeatherSignal {
            sky_clear_percent: Some(70.0),
            ..Default::default()
        };
        assert!(result_for(FactorKind::SkyClarity, &signal).meets);
    }

    #[test]
    fn test_pressure_change_uses_magnitude() {
        let signal = WeatherSignal {
            pressure_change: Some(-3.5),
            ..Default::default()
        };
        let result = result_for(FactorKind::PressureChange, &signal);
        assert_eq!(result.raw_value, Some(3.5));
        assert!(result.meets);
        assert_eq!(result.score, 100.0);
    }

    #[test]
    fn test_temperature_differential_ramp() {
        let settings = ScoringSettings::default();
        assert_eq!(ramp_score(&settings.temperature_differential, 13.0), 100.0);
        assert_eq!(ramp_score(&settings.temperature_differential, 9.0), 50.0);
        assert_eq!(ramp_score(&settings.temperature_differential, 4.0), 0.0);
        assert_eq!(ramp_score(&settings.temperature_differential, -3.0), 0.0);
    }

    #[test]
    fn test_missing_input_scores_neutral() {
        let result = result_for(FactorKind::SkyClarity, &WeatherSignal::default());
        assert_eq!(result.raw_value, None);
        assert_eq!(result.score, NEUTRAL_SCORE);
        assert!(!result.meets);
    }

    #[test]
    fn test_transport_wind_band() {
        let mut signal = WeatherSignal {
            transport_wind: Some(TransportWind {
                speed: 10.0,
                organization: FlowOrganization::Organized,
            }),
            ..Default::default()
        };
        let organized = result_for(FactorKind::TransportWind, &signal);
        assert!(organized.meets);
        assert_eq!(organized.score, 100.0);

        signal.transport_wind = Some(TransportWind {
            speed: 10.0,
            organization: FlowOrganization::Disorganized,
        });
        let disorganized = result_for(FactorKind::TransportWind, &signal);
        assert!(disorganized.meets);
        assert_eq!(disorganized.score, 40.0);

        signal.transport_wind = Some(TransportWind {
            speed: 45.0,
            organization: FlowOrganization::Organized,
        });
        let strong = result_for(FactorKind::TransportWind, &signal);
        assert!(!strong.meets);
        assert_eq!(strong.score, 0.0);
    }

    #[test]
    fn test_transport_wind_missing_is_neutral() {
        let result = result_for(FactorKind::TransportWind, &WeatherSignal::default());
        assert_eq!(result.score, 50.0);
        assert!(!result.meets);
        assert!(result.explanation.contains("unavailable"));
    }

    #[test]
    fn test_registry_rejects_bad_weight_sum() {
        let settings = ScoringSettings::default();
        let evaluators = vec![
            Evaluator::Ramp(RampFactor::new(
                FactorKind::Precipitation,
                settings.precipitation,
                Decimal::new(50, 2),
            )),
            Evaluator::Ramp(RampFactor::new(
                FactorKind::SkyClarity,
                settings.sky_clarity,
                Decimal::new(40, 2),
            )),
        ];
        assert_eq!(
            FactorRegistry::new(evaluators).unwrap_err(),
            RegistryError::WeightSum(Decimal::new(90, 2))
        );
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let settings = ScoringSettings::default();
        let factor = RampFactor::new(
            FactorKind::SkyClarity,
            settings.sky_clarity,
            Decimal::new(50, 2),
        );
        let evaluators = vec![Evaluator::Ramp(factor.clone()), Evaluator::Ramp(factor)];
        assert_eq!(
            FactorRegistry::new(evaluators).unwrap_err(),
            RegistryError::DuplicateFactor(FactorKind::SkyClarity)
        );
    }

    #[test]
    fn test_registry_order_is_stable() {
        assert_eq!(registry().kinds(), FactorKind::ALL.to_vec());
    }

    fn optional_reading(range: std::ops::Range<f64>) -> impl Strategy<Value = Option<f64>> {
        prop::option::of(range)
    }

    fn signal_strategy() -> impl Strategy<Value = WeatherSignal> {
        (
            optional_reading(0.0..100.0),
            optional_reading(0.0..100.0),
            optional_reading(0.0..100.0),
            optional_reading(-8.0..8.0),
            optional_reading(-10.0..25.0),
            prop::option::of((0.0..60.0f64, 0..3u8)),
        )
            .prop_map(|(pa, pt, sky, dp, dt, tw)| WeatherSignal {
                precip_probability_analysis: pa,
                precip_probability_target: pt,
                sky_clear_percent: sky,
                pressure_change: dp,
                temperature_differential: dt,
                transport_wind: tw.map(|(speed, org)| TransportWind {
                    speed,
                    organization: match org {
                        0 => FlowOrganization::Organized,
                        1 => FlowOrganization::Variable,
                        _ => FlowOrganization::Disorganized,
                    },
                }),
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_scores_bounded_and_meets_consistent(signal in signal_strategy()) {
            let results = registry().evaluate(&signal);
            let total_weight: f64 = results.iter().map(|r| r.weight).sum();
            prop_assert!((total_weight - 1.0).abs() < 1e-9);

            for result in results {
                prop_assert!(result.score >= 0.0 && result.score <= 100.0);
                match result.raw_value {
                    Some(raw) => prop_assert_eq!(result.meets, result.threshold.is_met_by(raw)),
                    None => prop_assert!(!result.meets),
                }
            }
        }
    }
}
