//! Prediction models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::FactorResult;

/// Coarse reliability label, distinct from the probability itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::Low => write!(f, "low"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::High => write!(f, "high"),
        }
    }
}

/// What the user should do about the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Go,
    Maybe,
    Skip,
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recommendation::Go => write!(f, "go"),
            Recommendation::Maybe => write!(f, "maybe"),
            Recommendation::Skip => write!(f, "skip"),
        }
    }
}

/// Whether the prediction was built from a full set of inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQuality {
    Preliminary,
    Complete,
}

/// A scored katabatic forecast for one dawn-patrol date.
///
/// Never mutated: every re-score produces a new value with a new `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: Uuid,
    pub target_date: NaiveDate,
    /// 0–100
    pub probability: f64,
    pub confidence: Confidence,
    pub recommendation: Recommendation,
    pub factors: Vec<FactorResult>,
    pub summary: String,
    pub generated_at: DateTime<Utc>,
    pub data_quality: DataQuality,
    /// Degradation notes (missing signals, synthesized locks)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl Prediction {
    /// Per-factor explanations in registration order, followed by the summary
    pub fn explanations(&self) -> Vec<String> {
        self.factors
            .iter()
            .map(|f| f.explanation.clone())
            .chain(std::iter::once(self.summary.clone()))
            .collect()
    }

    pub fn factors_met(&self) -> usize {
        self.factors.iter().filter(|f| f.meets).count()
    }

    /// Copy of this prediction downgraded to preliminary with an extra note.
    ///
    /// Used when a lock has to be synthesized after the refresh window closed.
    pub fn into_preliminary(mut self, note: impl Into<String>) -> Self {
        self.data_quality = DataQuality::Preliminary;
        self.notes.push(note.into());
        self
    }
}
