//! Verification models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Recommendation;

/// Post-hoc comparison of a locked prediction against observed wind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub target_date: NaiveDate,
    pub prediction_id: Uuid,
    pub predicted_probability: f64,
    pub predicted_recommendation: Recommendation,
    pub observed_average_speed: f64,
    pub observed_direction_deg: Option<f64>,
    pub observed_conditions_met: bool,
    /// Speed implied by the predicted probability
    pub expected_speed: f64,
    /// 0–100
    pub accuracy_score: f64,
    pub verified_at: DateTime<Utc>,
}

impl VerificationRecord {
    /// Whether the go/maybe vs skip call matched what happened
    pub fn outcome_matched(&self) -> bool {
        (self.predicted_recommendation != Recommendation::Skip) == self.observed_conditions_met
    }
}

/// Aggregate accuracy over a window of verifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracySummary {
    pub sample_size: usize,
    pub mean_accuracy: Option<f64>,
    /// Share of verifications whose recommendation matched the outcome, 0–1
    pub hit_rate: Option<f64>,
    pub go_count: usize,
    pub maybe_count: usize,
    pub skip_count: usize,
}

impl AccuracySummary {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a VerificationRecord>) -> Self {
        let mut summary = AccuracySummary {
            sample_size: 0,
            mean_accuracy: None,
            hit_rate: None,
            go_count: 0,
            maybe_count: 0,
            skip_count: 0,
        };
        let mut accuracy_total = 0.0;
        let mut hits = 0usize;

        for record in records {
            summary.sample_size += 1;
            accuracy_total += record.accuracy_score;
            if record.outcome_matched() {
                hits += 1;
            }
            match record.predicted_recommendation {
                Recommendation::Go => summary.go_count += 1,
                Recommendation::Maybe => summary.maybe_count += 1,
                Recommendation::Skip => summary.skip_count += 1,
            }
        }

        if summary.sample_size > 0 {
            let n = summary.sample_size as f64;
            summary.mean_accuracy = Some(accuracy_total / n);
            summary.hit_rate = Some(hits as f64 / n);
        }

        summary
    }
}
