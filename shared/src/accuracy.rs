//! Accuracy scoring for verified predictions

use crate::factors::round1;
use crate::models::{ObservedSignal, Recommendation};
use crate::settings::VerificationSettings;

/// Intermediate values of an accuracy computation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccuracyBreakdown {
    pub conditions_met: bool,
    pub expected_speed: f64,
    /// 0–1, how close the observed speed came to the expectation
    pub speed_closeness: f64,
    /// 0–100
    pub score: f64,
}

/// Whether observed wind counts as a rideable katabatic session
pub fn observed_conditions_met(observed: &ObservedSignal, settings: &VerificationSettings) -> bool {
    if !observed.average_speed.is_finite() || observed.average_speed < settings.min_favorable_speed {
        return false;
    }
    match (settings.favorable_direction, observed.average_direction_deg) {
        (Some(sector), Some(direction)) => sector.contains(direction),
        _ => true,
    }
}

/// Wind speed a prediction of `probability` percent implies
pub fn expected_speed(probability: f64, settings: &VerificationSettings) -> f64 {
    settings.expected_speed_at_certainty * (probability.clamp(0.0, 100.0) / 100.0)
}

/// Score a prediction against what was observed.
///
/// Blends whether the go/skip call matched the outcome with how close the
/// observed average speed came to the speed the probability implied.
pub fn score_accuracy(
    probability: f64,
    recommendation: Recommendation,
    observed: &ObservedSignal,
    settings: &VerificationSettings,
) -> AccuracyBreakdown {
    let conditions_met = observed_conditions_met(observed, settings);
    let expected = expected_speed(probability, settings);

    let predicted_session = recommendation != Recommendation::Skip;
    let outcome = if predicted_session == conditions_met {
        1.0
    } else {
        0.0
    };

    let observed_speed = if observed.average_speed.is_finite() {
        observed.average_speed.max(0.0)
    } else {
        0.0
    };
    let scale = expected.max(settings.min_favorable_speed).max(f64::EPSILON);
    let speed_closeness = (1.0 - (observed_speed - expected).abs() / scale).clamp(0.0, 1.0);

    let weight_total = settings.outcome_weight + settings.speed_weight;
    let score = if weight_total > 0.0 {
        (settings.outcome_weight * outcome + settings.speed_weight * speed_closeness) / weight_total
            * 100.0
    } else {
        outcome * 100.0
    };

    AccuracyBreakdown {
        conditions_met,
        expected_speed: round1(expected),
        speed_closeness,
        score: round1(score.clamp(0.0, 100.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::DirectionSector;

    fn observed(speed: f64) -> ObservedSignal {
        ObservedSignal {
            average_speed: speed,
            average_direction_deg: None,
            sample_count: Some(24),
        }
    }

    #[test]
    fn test_go_followed_by_calm_scores_low() {
        let settings = VerificationSettings::default();
        let result = score_accuracy(100.0, Recommendation::Go, &observed(2.0), &settings);
        assert!(!result.conditions_met);
        assert!(result.score < 50.0);
    }

    #[test]
    fn test_go_followed_by_expected_wind_scores_high() {
        let settings = VerificationSettings::default();
        let result = score_accuracy(95.0, Recommendation::Go, &observed(14.0), &settings);
        assert!(result.conditions_met);
        assert!(result.score > 90.0);
    }

    #[test]
    fn test_skip_on_calm_morning_is_accurate() {
        let settings = VerificationSettings::default();
        let result = score_accuracy(15.0, Recommendation::Skip, &observed(2.0), &settings);
        assert!(!result.conditions_met);
        assert!(result.score >= 60.0);
    }

    #[test]
    fn test_direction_sector_gates_conditions() {
        let settings = VerificationSettings {
            favorable_direction: Some(DirectionSector {
                from_deg: 20.0,
                to_deg: 90.0,
            }),
            ..Default::default()
        };
        let mut wind = observed(12.0);
        wind.average_direction_deg = Some(45.0);
        assert!(observed_conditions_met(&wind, &settings));

        wind.average_direction_deg = Some(250.0);
        assert!(!observed_conditions_met(&wind, &settings));
    }
}
