//! Prediction lifecycle tests
//!
//! Covers the scheduled state machine end to end against an in-memory store:
//! - Checkpoint boundaries around the evening lock
//! - Lock synthesis when no request arrived before the final checkpoint
//! - Monotonic state progression and lock immutability
//! - No late locks once the verification checkpoint has passed
//! - Explicit evening and final locks
//! - Concurrent writers against the same date

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use dawn_patrol::{
    clock::ManualClock,
    error::AppError,
    services::{LockOutcome, LockRejection},
    store::RecordStore,
    AppState, Config,
};
use proptest::prelude::*;
use shared::{
    DataQuality, FlowOrganization, LifecycleState, LockType, ObservedSignal, TransportWind,
    WeatherSignal,
};

fn target_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
}

fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, minute, 0).unwrap()
}

fn favorable() -> WeatherSignal {
    WeatherSignal {
        precip_probability_analysis: Some(2.0),
        precip_probability_target: Some(4.0),
        sky_clear_percent: Some(90.0),
        pressure_change: Some(3.5),
        temperature_differential: Some(14.0),
        transport_wind: Some(TransportWind {
            speed: 10.0,
            organization: FlowOrganization::Organized,
        }),
    }
}

fn calm_morning() -> ObservedSignal {
    ObservedSignal {
        average_speed: 1.0,
        average_direction_deg: None,
        sample_count: Some(6),
    }
}

fn marginal() -> WeatherSignal {
    WeatherSignal {
        sky_clear_percent: Some(65.0),
        temperature_differential: Some(8.0),
        ..favorable()
    }
}

async fn harness(start: DateTime<Utc>) -> (AppState, ManualClock) {
    let clock = ManualClock::new(start);
    let store = RecordStore::in_memory().await.unwrap();
    let state = AppState::build(Config::default(), store, Arc::new(clock.clone())).unwrap();
    (state, clock)
}

// ============================================================================
// Checkpoint Tests
// ============================================================================

#[tokio::test]
async fn test_preview_just_before_evening_lock() {
    let (state, _clock) = harness(at(14, 17, 59)).await;

    let served = state
        .lifecycle
        .request_prediction(target_date(), &favorable())
        .await
        .unwrap();

    assert_eq!(served.state, LifecycleState::Preview);
    assert!(!served.frozen);
    assert_eq!(served.lock_type, None);

    let record = state.lifecycle.get_current_state(target_date()).await.unwrap();
    assert_eq!(record.state, LifecycleState::Preview);
    assert!(!record.has_lock());
    assert!(state
        .tracking
        .predictions_for(target_date())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_evening_lock_just_after_checkpoint() {
    let (state, _clock) = harness(at(14, 18, 1)).await;

    let served = state
        .lifecycle
        .request_prediction(target_date(), &favorable())
        .await
        .unwrap();

    assert_eq!(served.state, LifecycleState::LockedEvening);
    assert_eq!(served.lock_type, Some(LockType::Evening));

    let record = state.lifecycle.get_current_state(target_date()).await.unwrap();
    assert_eq!(record.state, LifecycleState::LockedEvening);
    assert_eq!(
        record.locked_prediction.as_ref().map(|p| p.id),
        Some(served.prediction.id)
    );
    assert_eq!(record.locked_at, Some(at(14, 18, 1)));

    let logged = state.tracking.predictions_for(target_date()).await.unwrap();
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].id, served.prediction.id);
}

#[tokio::test]
async fn test_state_for_unknown_date_is_unpersisted_preview() {
    let (state, _clock) = harness(at(14, 12, 0)).await;

    let record = state.lifecycle.get_current_state(target_date()).await.unwrap();
    assert_eq!(record.state, LifecycleState::Preview);
    assert!(record.transitions.is_empty());
    assert!(record.locked_prediction.is_none());
}

// ============================================================================
// Evening Refresh and Final Freeze
// ============================================================================

#[tokio::test]
async fn test_evening_requests_refresh_the_lock() {
    let (state, clock) = harness(at(14, 18, 5)).await;

    let first = state
        .lifecycle
        .request_prediction(target_date(), &marginal())
        .await
        .unwrap();
    clock.set(at(14, 20, 0));
    let second = state
        .lifecycle
        .request_prediction(target_date(), &favorable())
        .await
        .unwrap();

    assert_ne!(first.prediction.id, second.prediction.id);
    let record = state.lifecycle.get_current_state(target_date()).await.unwrap();
    assert_eq!(
        record.locked_prediction.as_ref().map(|p| p.id),
        Some(second.prediction.id)
    );
    assert_eq!(record.lock_type, Some(LockType::Evening));
    assert_eq!(state.tracking.predictions_for(target_date()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_final_checkpoint_freezes_evening_lock() {
    let (state, clock) = harness(at(14, 18, 30)).await;

    let evening = state
        .lifecycle
        .request_prediction(target_date(), &favorable())
        .await
        .unwrap();

    clock.set(at(14, 23, 30));
    let final_served = state
        .lifecycle
        .request_prediction(target_date(), &marginal())
        .await
        .unwrap();

    assert_eq!(final_served.state, LifecycleState::LockedFinal);
    assert!(final_served.frozen);
    assert_eq!(final_served.lock_type, Some(LockType::Final));
    assert_eq!(final_served.prediction.id, evening.prediction.id);

    clock.set(at(15, 6, 30));
    let active = state
        .lifecycle
        .request_prediction(target_date(), &WeatherSignal::default())
        .await
        .unwrap();

    assert_eq!(active.state, LifecycleState::Active);
    assert_eq!(active.prediction, evening.prediction);

    // Freezing the evening lock does not log the same prediction twice
    assert_eq!(state.tracking.predictions_for(target_date()).await.unwrap().len(), 1);
}

// ============================================================================
// Lock Synthesis
// ============================================================================

#[tokio::test]
async fn test_first_request_after_final_checkpoint_synthesizes_lock() {
    let (state, _clock) = harness(at(15, 6, 30)).await;

    let served = state
        .lifecycle
        .request_prediction(target_date(), &favorable())
        .await
        .unwrap();

    assert_eq!(served.state, LifecycleState::Active);
    assert!(served.frozen);
    assert_eq!(served.lock_type, Some(LockType::Final));
    assert_eq!(served.prediction.data_quality, DataQuality::Preliminary);
    assert!(served
        .prediction
        .notes
        .iter()
        .any(|note| note.contains("synthesized")));

    let record = state.lifecycle.get_current_state(target_date()).await.unwrap();
    assert_eq!(
        record.visited_states(),
        vec![
            LifecycleState::Preview,
            LifecycleState::LockedEvening,
            LifecycleState::LockedFinal,
            LifecycleState::Active,
        ]
    );
    assert_eq!(record.locked_at, Some(at(15, 6, 30)));
    assert_eq!(state.tracking.predictions_for(target_date()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_synthesized_lock_is_reused() {
    let (state, clock) = harness(at(15, 6, 30)).await;

    let first = state
        .lifecycle
        .request_prediction(target_date(), &favorable())
        .await
        .unwrap();
    clock.set(at(15, 7, 15));
    let second = state
        .lifecycle
        .request_prediction(target_date(), &marginal())
        .await
        .unwrap();

    assert_eq!(first.prediction, second.prediction);
}

// ============================================================================
// Monotonicity and Immutability
// ============================================================================

#[tokio::test]
async fn test_state_never_moves_backwards() {
    let (state, clock) = harness(at(15, 6, 30)).await;

    let active = state
        .lifecycle
        .request_prediction(target_date(), &favorable())
        .await
        .unwrap();

    // A clock that jumps back does not reopen earlier states
    clock.set(at(14, 17, 0));
    let served = state
        .lifecycle
        .request_prediction(target_date(), &marginal())
        .await
        .unwrap();

    assert_eq!(served.state, LifecycleState::Active);
    assert_eq!(served.prediction.id, active.prediction.id);
}

#[tokio::test]
async fn test_verified_checkpoint_is_reached() {
    let (state, clock) = harness(at(14, 19, 0)).await;

    state
        .lifecycle
        .request_prediction(target_date(), &favorable())
        .await
        .unwrap();
    clock.set(at(15, 8, 0));
    let served = state
        .lifecycle
        .request_prediction(target_date(), &favorable())
        .await
        .unwrap();

    assert_eq!(served.state, LifecycleState::Verified);
    let record = state.lifecycle.get_current_state(target_date()).await.unwrap();
    assert_eq!(record.visited_states().len(), 5);
}

#[tokio::test]
async fn test_request_after_verification_without_lock_is_untracked() {
    let (state, _clock) = harness(at(15, 10, 0)).await;

    let served = state
        .lifecycle
        .request_prediction(target_date(), &favorable())
        .await
        .unwrap();

    assert_eq!(served.state, LifecycleState::Verified);
    assert!(!served.frozen);
    assert_eq!(served.lock_type, None);
    assert_eq!(served.prediction.data_quality, DataQuality::Preliminary);

    let record = state.lifecycle.get_current_state(target_date()).await.unwrap();
    assert_eq!(record.state, LifecycleState::Verified);
    assert!(!record.has_lock());
    assert!(state
        .tracking
        .predictions_for(target_date())
        .await
        .unwrap()
        .is_empty());

    // Nothing was locked, so there is nothing to score against
    let verified = state.tracking.verify(target_date(), &calm_morning()).await;
    assert!(matches!(verified, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_repeated_requests_after_verification_stay_untracked() {
    let (state, clock) = harness(at(15, 10, 0)).await;

    let first = state
        .lifecycle
        .request_prediction(target_date(), &favorable())
        .await
        .unwrap();
    clock.set(at(15, 11, 0));
    let second = state
        .lifecycle
        .request_prediction(target_date(), &favorable())
        .await
        .unwrap();

    assert_ne!(first.prediction.id, second.prediction.id);
    assert!(!state.lifecycle.get_current_state(target_date()).await.unwrap().has_lock());
    assert!(state
        .tracking
        .predictions_for(target_date())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_final_lock_rejects_replacement() {
    let (state, clock) = harness(at(14, 18, 10)).await;

    let evening = state
        .lifecycle
        .request_prediction(target_date(), &favorable())
        .await
        .unwrap();
    clock.set(at(14, 23, 5));
    state
        .lifecycle
        .request_prediction(target_date(), &favorable())
        .await
        .unwrap();

    let replacement = state.lifecycle.score(target_date(), &marginal());
    let outcome = state
        .lifecycle
        .lock(target_date(), replacement, LockType::Final)
        .await
        .unwrap();

    match outcome {
        LockOutcome::Rejected { current, reason } => {
            assert_eq!(reason, LockRejection::AlreadyFinal);
            assert_eq!(
                current.locked_prediction.map(|p| p.id),
                Some(evening.prediction.id)
            );
        }
        LockOutcome::Applied { .. } => panic!("final lock must not be replaced"),
    }
}

// ============================================================================
// Explicit Locks
// ============================================================================

#[tokio::test]
async fn test_evening_lock_outside_window_is_rejected() {
    let (state, _clock) = harness(at(14, 12, 0)).await;

    let prediction = state.lifecycle.score(target_date(), &favorable());
    let outcome = state
        .lifecycle
        .lock(target_date(), prediction, LockType::Evening)
        .await
        .unwrap();

    assert!(!outcome.is_applied());
    match outcome {
        LockOutcome::Rejected { reason, .. } => assert_eq!(
            reason,
            LockRejection::OutsideWindow {
                state: LifecycleState::Preview,
                lock_type: LockType::Evening,
            }
        ),
        LockOutcome::Applied { .. } => unreachable!(),
    }
}

#[tokio::test]
async fn test_explicit_evening_lock_is_idempotent() {
    let (state, _clock) = harness(at(14, 19, 0)).await;

    let prediction = state.lifecycle.score(target_date(), &favorable());
    let first = state
        .lifecycle
        .lock(target_date(), prediction.clone(), LockType::Evening)
        .await
        .unwrap();
    let second = state
        .lifecycle
        .lock(target_date(), prediction.clone(), LockType::Evening)
        .await
        .unwrap();

    assert!(first.is_applied());
    assert!(second.is_applied());
    assert_eq!(first.record(), second.record());
    assert_eq!(state.tracking.predictions_for(target_date()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_final_lock_during_evening_is_rejected() {
    let (state, _clock) = harness(at(14, 20, 0)).await;

    let prediction = state.lifecycle.score(target_date(), &favorable());
    let outcome = state
        .lifecycle
        .lock(target_date(), prediction, LockType::Final)
        .await
        .unwrap();

    assert!(!outcome.is_applied());
}

#[tokio::test]
async fn test_final_lock_without_evening_lock_is_rejected() {
    let (state, clock) = harness(at(14, 23, 10)).await;

    let prediction = state.lifecycle.score(target_date(), &favorable());
    let outcome = state
        .lifecycle
        .lock(target_date(), prediction.clone(), LockType::Final)
        .await
        .unwrap();

    match outcome {
        LockOutcome::Rejected { current, reason } => {
            assert_eq!(
                reason,
                LockRejection::NothingToFreeze {
                    state: LifecycleState::LockedFinal,
                }
            );
            assert!(!current.has_lock());
        }
        LockOutcome::Applied { .. } => panic!("a final lock needs an evening lock to freeze"),
    }
    assert!(state
        .tracking
        .predictions_for(target_date())
        .await
        .unwrap()
        .is_empty());

    // Same after the verification checkpoint: no late lock, nothing to verify
    clock.set(at(15, 9, 0));
    let late = state
        .lifecycle
        .lock(target_date(), prediction, LockType::Final)
        .await
        .unwrap();
    assert!(!late.is_applied());
    assert!(!state.lifecycle.get_current_state(target_date()).await.unwrap().has_lock());

    let verified = state.tracking.verify(target_date(), &calm_morning()).await;
    assert!(matches!(verified, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_final_lock_freezes_evening_lock_not_given_prediction() {
    let (state, clock) = harness(at(14, 19, 0)).await;

    let evening = state
        .lifecycle
        .request_prediction(target_date(), &favorable())
        .await
        .unwrap();

    clock.set(at(14, 23, 10));
    let other = state.lifecycle.score(target_date(), &marginal());
    let outcome = state
        .lifecycle
        .lock(target_date(), other.clone(), LockType::Final)
        .await
        .unwrap();

    assert!(outcome.is_applied());
    let record = outcome.record();
    assert_eq!(record.state, LifecycleState::LockedFinal);
    assert_eq!(record.lock_type, Some(LockType::Final));
    assert_eq!(
        record.locked_prediction.as_ref().map(|p| p.id),
        Some(evening.prediction.id)
    );

    // Re-locking the frozen prediction is a no-op, anything else is refused
    let again = state
        .lifecycle
        .lock(target_date(), evening.prediction.clone(), LockType::Final)
        .await
        .unwrap();
    assert!(again.is_applied());

    let refused = state
        .lifecycle
        .lock(target_date(), other, LockType::Final)
        .await
        .unwrap();
    assert!(!refused.is_applied());
}

#[tokio::test]
async fn test_lock_for_mismatched_date_is_invalid() {
    let (state, _clock) = harness(at(14, 19, 0)).await;

    let other_date = NaiveDate::from_ymd_opt(2026, 3, 20).unwrap();
    let prediction = state.lifecycle.score(other_date, &favorable());
    let result = state
        .lifecycle
        .lock(target_date(), prediction, LockType::Evening)
        .await;

    assert!(result.is_err());
}

// ============================================================================
// Concurrent Writers
// ============================================================================

#[tokio::test]
async fn test_concurrent_evening_requests_both_land() {
    let (state, _clock) = harness(at(14, 19, 0)).await;

    let favorable_signal = favorable();
    let marginal_signal = marginal();
    let (first, second) = tokio::join!(
        state.lifecycle.request_prediction(target_date(), &favorable_signal),
        state.lifecycle.request_prediction(target_date(), &marginal_signal),
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    let record = state.lifecycle.get_current_state(target_date()).await.unwrap();
    let locked_id = record.locked_prediction.as_ref().map(|p| p.id);
    assert!(locked_id == Some(first.prediction.id) || locked_id == Some(second.prediction.id));

    let logged = state.tracking.predictions_for(target_date()).await.unwrap();
    assert_eq!(logged.len(), 2);
    assert!(logged.iter().any(|p| p.id == first.prediction.id));
    assert!(logged.iter().any(|p| p.id == second.prediction.id));
}

#[tokio::test]
async fn test_concurrent_evening_locks_keep_one_winner() {
    let (state, _clock) = harness(at(14, 19, 0)).await;
    let first = state.lifecycle.score(target_date(), &favorable());
    let second = state.lifecycle.score(target_date(), &marginal());

    let (a, b) = tokio::join!(
        state
            .lifecycle
            .lock(target_date(), first.clone(), LockType::Evening),
        state
            .lifecycle
            .lock(target_date(), second.clone(), LockType::Evening),
    );
    assert!(a.unwrap().is_applied());
    assert!(b.unwrap().is_applied());

    let record = state.lifecycle.get_current_state(target_date()).await.unwrap();
    let locked_id = record.locked_prediction.as_ref().map(|p| p.id);
    assert!(locked_id == Some(first.id) || locked_id == Some(second.id));
    assert_eq!(record.lock_type, Some(LockType::Evening));
}

// ============================================================================
// Retention
// ============================================================================

#[tokio::test]
async fn test_purge_removes_only_dates_past_retention() {
    let (state, clock) = harness(Utc.with_ymd_and_hms(2026, 2, 28, 19, 0, 0).unwrap()).await;
    let old_date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();

    state
        .lifecycle
        .request_prediction(old_date, &favorable())
        .await
        .unwrap();
    clock.set(at(14, 19, 0));
    state
        .lifecycle
        .request_prediction(target_date(), &favorable())
        .await
        .unwrap();

    clock.set(at(15, 9, 0));
    let report = state.maintenance.sweep().await.unwrap();
    assert_eq!(report.lifecycle_removed, 1);
    assert_eq!(report.prediction_log_removed, 1);
    assert_eq!(report.verification_removed, 0);

    let old = state.lifecycle.get_current_state(old_date).await.unwrap();
    assert!(old.transitions.is_empty());
    let kept = state.lifecycle.get_current_state(target_date()).await.unwrap();
    assert!(kept.has_lock());
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        /// Across any sequence of forward clock steps, states only advance
        /// and a final lock never changes once taken.
        #[test]
        fn prop_lifecycle_is_monotonic(steps in prop::collection::vec(1i64..=240, 1..12)) {
            tokio_test::block_on(async {
                let (state, clock) = harness(at(14, 12, 0)).await;
                let mut last_state = LifecycleState::Preview;
                let mut final_lock = None;

                for minutes in steps {
                    clock.advance(Duration::minutes(minutes));
                    let served = state
                        .lifecycle
                        .request_prediction(target_date(), &favorable())
                        .await
                        .unwrap();

                    assert!(served.state >= last_state);
                    last_state = served.state;

                    if served.lock_type == Some(LockType::Final) {
                        match final_lock {
                            Some(id) => assert_eq!(served.prediction.id, id),
                            None => final_lock = Some(served.prediction.id),
                        }
                    }
                }

                let record = state.lifecycle.get_current_state(target_date()).await.unwrap();
                let visited = record.visited_states();
                assert!(visited.windows(2).all(|pair| pair[0] < pair[1]));
                assert_eq!(visited.last().copied(), Some(record.state));
            });
        }
    }
}
