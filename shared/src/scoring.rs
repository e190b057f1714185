//! Weighted scoring engine
//!
//! Combines factor results into a single probability, derives the confidence
//! tier and recommendation, and assembles the explanation shown to users.
//! The order of operations is fixed: weighted sum with unmet-factor
//! penalties, then multi-factor bonuses, then the 0–100 clamp, then the
//! learning-mode cap.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::factors::{round1, FactorRegistry, RegistryError};
use crate::models::{
    Confidence, DataQuality, FactorKind, FactorResult, Prediction, Recommendation, WeatherSignal,
};
use crate::settings::ScoringSettings;

/// Evaluates signals and scores the resulting factors
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    settings: ScoringSettings,
    registry: FactorRegistry,
}

impl ScoringEngine {
    pub fn new(settings: ScoringSettings) -> Result<Self, RegistryError> {
        let registry = FactorRegistry::from_settings(&settings)?;
        Ok(Self { settings, registry })
    }

    pub fn settings(&self) -> &ScoringSettings {
        &self.settings
    }

    pub fn registry(&self) -> &FactorRegistry {
        &self.registry
    }

    pub fn evaluate(&self, signal: &WeatherSignal) -> Vec<FactorResult> {
        self.registry.evaluate(signal)
    }

    /// Evaluate and score a signal in one step
    pub fn predict(
        &self,
        target_date: NaiveDate,
        signal: &WeatherSignal,
        generated_at: DateTime<Utc>,
    ) -> Prediction {
        self.score(target_date, self.evaluate(signal), generated_at)
    }

    /// Weighted sum with proportional penalties for factors that miss their threshold
    pub fn weighted_base(&self, factors: &[FactorResult]) -> f64 {
        factors
            .iter()
            .map(|factor| {
                let mut contribution = factor.score * factor.weight;
                if !factor.meets {
                    if let Some(raw) = factor.raw_value {
                        let shortfall = factor.threshold.shortfall(raw);
                        contribution *= (1.0 - shortfall * self.settings.penalty_strength).max(0.0);
                    }
                }
                contribution.max(0.0)
            })
            .sum()
    }

    /// Final probability after bonuses, clamp and learning-mode cap
    pub fn probability(&self, factors: &[FactorResult]) -> f64 {
        let bonus = &self.settings.bonus;
        let met = factors.iter().filter(|f| f.meets).count();

        let mut probability = self.weighted_base(factors);
        if met >= bonus.multi_factor_min_met {
            probability += bonus.multi_factor_bonus;
        }
        if !factors.is_empty() && met == factors.len() {
            probability += bonus.all_factor_bonus;
        }

        let mut probability = probability.clamp(0.0, 100.0);
        if self.settings.learning_mode {
            probability = probability.min(self.settings.confidence_cap);
        }
        round1(probability)
    }

    pub fn confidence(&self, factors: &[FactorResult], probability: f64) -> Confidence {
        let tiers = &self.settings.confidence;
        let available = factors.iter().filter(|f| f.is_available()).count();
        let met = factors.iter().filter(|f| f.meets).count();
        let critical = factors
            .iter()
            .find(|f| f.kind == FactorKind::TemperatureDifferential);

        let Some(critical) = critical.filter(|f| f.is_available()) else {
            return Confidence::Low;
        };
        if available < tiers.min_available_factors {
            return Confidence::Low;
        }

        if met >= tiers.high_min_met && critical.meets && probability > tiers.high_min_probability {
            Confidence::High
        } else if met >= tiers.medium_min_met && probability > tiers.medium_min_probability {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn recommendation(&self, confidence: Confidence, probability: f64) -> Recommendation {
        let cutoffs = &self.settings.recommendation;
        if confidence == Confidence::High && probability > cutoffs.go_min_probability {
            Recommendation::Go
        } else if confidence >= Confidence::Medium && probability > cutoffs.maybe_min_probability {
            Recommendation::Maybe
        } else {
            Recommendation::Skip
        }
    }

    /// Combine evaluated factors into a new prediction
    pub fn score(
        &self,
        target_date: NaiveDate,
        factors: Vec<FactorResult>,
        generated_at: DateTime<Utc>,
    ) -> Prediction {
        let probability = self.probability(&factors);
        let confidence = self.confidence(&factors, probability);
        let recommendation = self.recommendation(confidence, probability);

        let available = factors.iter().filter(|f| f.is_available()).count();
        let mut notes: Vec<String> = factors
            .iter()
            .filter(|f| !f.is_available())
            .map(|f| {
                if f.kind.is_critical() {
                    format!("{} signal missing; confidence forced to low", f.name)
                } else {
                    format!("{} signal missing; scored neutral", f.name)
                }
            })
            .collect();
        if available < self.settings.confidence.min_available_factors {
            notes.push(format!("Only {} factor(s) had valid data", available));
        }

        let data_quality = if notes.is_empty() {
            DataQuality::Complete
        } else {
            DataQuality::Preliminary
        };

        let summary = self.summarize(&factors, probability, confidence, recommendation);

        Prediction {
            id: Uuid::new_v4(),
            target_date,
            probability,
            confidence,
            recommendation,
            factors,
            summary,
            generated_at,
            data_quality,
            notes,
        }
    }

    fn summarize(
        &self,
        factors: &[FactorResult],
        probability: f64,
        confidence: Confidence,
        recommendation: Recommendation,
    ) -> String {
        let mut summary = format!(
            "{:.0}% chance of katabatic flow with {} confidence: {}.",
            probability, confidence, recommendation
        );

        let limiting = factors
            .iter()
            .filter(|f| !f.meets && f.is_available())
            .min_by(|a, b| a.score.total_cmp(&b.score));

        match limiting {
            Some(factor) => {
                summary.push_str(&format!(
                    " Limiting factor: {}. {}.",
                    factor.name, factor.explanation
                ));
            }
            None => {
                let missing: Vec<&str> = factors
                    .iter()
                    .filter(|f| !f.is_available())
                    .map(|f| f.name.as_str())
                    .collect();
                if missing.is_empty() {
                    summary.push_str(" All factors meet their thresholds.");
                } else {
                    summary.push_str(&format!(
                        " All evaluated factors meet their thresholds; missing data: {}.",
                        missing.join(", ")
                    ));
                }
            }
        }

        if self.settings.learning_mode {
            summary.push_str(&format!(
                " Model is calibrating; probability capped at {:.0}%.",
                self.settings.confidence_cap
            ));
        }

        summary
    }
}
