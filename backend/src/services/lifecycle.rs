//! Prediction lifecycle management
//!
//! Each target date moves preview → locked-evening → locked-final → active →
//! verified on a fixed schedule. The phase is derived from the clock on every
//! request, so a date that saw no traffic at a checkpoint catches up on the
//! next request. Once locked-final is reached the stored prediction never
//! changes again.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use shared::{
    LifecycleRecord, LifecycleSchedule, LifecycleState, LockType, Prediction, ScoringEngine,
    WeatherSignal,
};

use crate::{
    clock::SharedClock,
    error::{AppError, AppResult},
    services::TrackingService,
    store::{Collection, RecordStore, Versioned, WriteOutcome},
};

const MAX_WRITE_ATTEMPTS: usize = 3;

const SYNTHESIZED_LOCK_NOTE: &str =
    "No prediction was locked before the final checkpoint; this lock was synthesized from the first later request.";

const UNLOCKED_AFTER_VERIFICATION_NOTE: &str =
    "No prediction was locked for this date; this score was produced after the verification checkpoint and is not tracked.";

/// Lifecycle service owning the per-date state records
#[derive(Clone)]
pub struct LifecycleService {
    store: RecordStore,
    engine: Arc<ScoringEngine>,
    tracking: TrackingService,
    schedule: LifecycleSchedule,
    clock: SharedClock,
}

/// A prediction as served for a date, with the state it was served in
#[derive(Debug, Clone, Serialize)]
pub struct ServedPrediction {
    pub state: LifecycleState,
    /// Whether `prediction` is the frozen final lock rather than a fresh score.
    ///
    /// During locked-evening the fresh score is also stored as the evening
    /// lock but stays replaceable, so this is `false` there.
    pub frozen: bool,
    pub lock_type: Option<LockType>,
    pub prediction: Prediction,
}

/// Why a lock request was refused
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LockRejection {
    /// The date is not in a state that accepts this lock type
    OutsideWindow {
        state: LifecycleState,
        lock_type: LockType,
    },
    /// A final lock with a different prediction already exists
    AlreadyFinal,
    /// A final lock only freezes an existing evening lock
    NothingToFreeze { state: LifecycleState },
    /// The record kept changing between read and write
    Contended,
}

impl std::fmt::Display for LockRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockRejection::OutsideWindow { state, lock_type } => {
                write!(f, "{} lock not accepted while {}", lock_type, state)
            }
            LockRejection::AlreadyFinal => write!(f, "a final lock is already in place"),
            LockRejection::NothingToFreeze { state } => {
                write!(f, "no evening lock to freeze while {}", state)
            }
            LockRejection::Contended => write!(f, "record changed concurrently"),
        }
    }
}

/// Result of a lock request
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LockOutcome {
    Applied { record: LifecycleRecord },
    Rejected {
        current: LifecycleRecord,
        reason: LockRejection,
    },
}

impl LockOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, LockOutcome::Applied { .. })
    }

    pub fn record(&self) -> &LifecycleRecord {
        match self {
            LockOutcome::Applied { record } => record,
            LockOutcome::Rejected { current, .. } => current,
        }
    }
}

impl LifecycleService {
    pub fn new(
        store: RecordStore,
        engine: Arc<ScoringEngine>,
        tracking: TrackingService,
        schedule: LifecycleSchedule,
        clock: SharedClock,
    ) -> Self {
        Self {
            store,
            engine,
            tracking,
            schedule,
            clock,
        }
    }

    /// Score a signal without touching any lifecycle state
    pub fn score(&self, date: NaiveDate, signal: &WeatherSignal) -> Prediction {
        self.engine.predict(date, signal, self.clock.now())
    }

    /// Current record for a date.
    ///
    /// A date never requested before gets a fresh preview record that is not
    /// persisted. The stored state is reported as-is; catching up with the
    /// clock happens on the next prediction request.
    pub async fn get_current_state(&self, date: NaiveDate) -> AppResult<LifecycleRecord> {
        Ok(match self.load(date).await? {
            Some(entry) => entry.value,
            None => LifecycleRecord::new(date, self.clock.now()),
        })
    }

    /// Serve the prediction for `date`, applying every transition due by now.
    ///
    /// Recomputable states score the signal afresh; during locked-evening the
    /// result replaces the stored lock. Locked-final and active serve the
    /// stored lock, synthesizing a preliminary one if no lock was ever taken.
    /// Once verified, a date without a lock only gets an untracked
    /// preliminary score; no lock is created that late.
    pub async fn request_prediction(
        &self,
        date: NaiveDate,
        signal: &WeatherSignal,
    ) -> AppResult<ServedPrediction> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let now = self.clock.now();
            let phase = self.schedule.phase_at(date, now);

            let (mut record, version) = self.load_or_new(date, now).await?;
            let original = record.clone();
            record.advance_to(phase, now);

            let mut lock_event = false;
            let frozen;
            let prediction = match record.state {
                LifecycleState::Preview => {
                    frozen = false;
                    self.engine.predict(date, signal, now)
                }
                LifecycleState::LockedEvening => {
                    let fresh = self.engine.predict(date, signal, now);
                    record.locked_prediction = Some(fresh.clone());
                    record.locked_at = Some(now);
                    record.lock_type.get_or_insert(LockType::Evening);
                    record.updated_at = now;
                    lock_event = true;
                    frozen = false;
                    fresh
                }
                LifecycleState::Verified if record.locked_prediction.is_none() => {
                    tracing::warn!(%date, "No lock was taken before verification, serving an untracked score");
                    frozen = false;
                    self.engine
                        .predict(date, signal, now)
                        .into_preliminary(UNLOCKED_AFTER_VERIFICATION_NOTE)
                }
                _ => {
                    frozen = true;
                    match record.locked_prediction.clone() {
                        Some(lock) => {
                            // The final checkpoint freezes whatever the evening window left
                            if record.lock_type != Some(LockType::Final) {
                                record.lock_type = Some(LockType::Final);
                                record.updated_at = now;
                                lock_event = true;
                            }
                            lock
                        }
                        None => {
                            tracing::warn!(
                                %date,
                                state = %record.state,
                                "No lock in place after the final checkpoint, synthesizing one"
                            );
                            let synthesized = self
                                .engine
                                .predict(date, signal, now)
                                .into_preliminary(SYNTHESIZED_LOCK_NOTE);
                            record.locked_prediction = Some(synthesized.clone());
                            record.locked_at = Some(now);
                            record.lock_type = Some(LockType::Final);
                            record.updated_at = now;
                            lock_event = true;
                            synthesized
                        }
                    }
                }
            };

            if version.is_some() && record == original {
                return Ok(served(&record, frozen, prediction));
            }

            match self
                .store
                .put(Collection::Lifecycle, date, version, &record, now)
                .await?
            {
                WriteOutcome::Written { .. } => {
                    if original.state != record.state {
                        tracing::info!(
                            %date,
                            from = %original.state,
                            to = %record.state,
                            "Lifecycle advanced"
                        );
                    }
                    if lock_event {
                        if let Some(lock) = &record.locked_prediction {
                            self.tracking.record_prediction(lock).await?;
                        }
                    }
                    return Ok(served(&record, frozen, prediction));
                }
                WriteOutcome::Stale => {
                    tracing::warn!(%date, attempt, "Lifecycle record changed underneath, retrying");
                }
            }
        }

        Err(AppError::LockConflict {
            date,
            message: "lifecycle record kept changing during the request".to_string(),
        })
    }

    /// Explicitly lock a prediction for `date`.
    ///
    /// An evening lock is only accepted in locked-evening and may be replaced
    /// by later evening locks. A final lock is accepted from locked-final on
    /// and only freezes the existing evening lock, never storing the given
    /// prediction; a date without an evening lock is rejected. Re-locking the
    /// prediction already in place is a no-op.
    pub async fn lock(
        &self,
        date: NaiveDate,
        prediction: Prediction,
        lock_type: LockType,
    ) -> AppResult<LockOutcome> {
        if prediction.target_date != date {
            return Err(AppError::validation(
                "target_date",
                format!(
                    "prediction targets {} but the lock is for {}",
                    prediction.target_date, date
                ),
            ));
        }

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let now = self.clock.now();
            let phase = self.schedule.phase_at(date, now);

            let (mut record, version) = self.load_or_new(date, now).await?;
            let original = record.clone();
            record.advance_to(phase, now);

            let already_locked = record
                .locked_prediction
                .as_ref()
                .is_some_and(|p| p.id == prediction.id);

            match lock_type {
                LockType::Evening => {
                    if record.state != LifecycleState::LockedEvening {
                        return Ok(rejected(
                            original,
                            LockRejection::OutsideWindow {
                                state: record.state,
                                lock_type,
                            },
                        ));
                    }
                    if already_locked {
                        return Ok(LockOutcome::Applied { record: original });
                    }
                    record.locked_prediction = Some(prediction.clone());
                    record.locked_at = Some(now);
                    record.lock_type.get_or_insert(LockType::Evening);
                }
                LockType::Final => {
                    if !record.state.is_frozen() {
                        return Ok(rejected(
                            original,
                            LockRejection::OutsideWindow {
                                state: record.state,
                                lock_type,
                            },
                        ));
                    }
                    if record.lock_type == Some(LockType::Final) {
                        return Ok(if already_locked {
                            LockOutcome::Applied { record: original }
                        } else {
                            rejected(original, LockRejection::AlreadyFinal)
                        });
                    }
                    if record.locked_prediction.is_none() {
                        return Ok(rejected(
                            original,
                            LockRejection::NothingToFreeze {
                                state: record.state,
                            },
                        ));
                    }
                    record.lock_type = Some(LockType::Final);
                }
            }
            record.updated_at = now;

            match self
                .store
                .put(Collection::Lifecycle, date, version, &record, now)
                .await?
            {
                WriteOutcome::Written { .. } => {
                    if let Some(lock) = &record.locked_prediction {
                        tracing::info!(
                            %date,
                            %lock_type,
                            prediction_id = %lock.id,
                            probability = lock.probability,
                            "Prediction locked"
                        );
                        self.tracking.record_prediction(lock).await?;
                    }
                    return Ok(LockOutcome::Applied { record });
                }
                WriteOutcome::Stale => {
                    tracing::warn!(%date, attempt, "Lifecycle record changed underneath, retrying");
                }
            }
        }

        let current = self.get_current_state(date).await?;
        Ok(rejected(current, LockRejection::Contended))
    }

    /// Drop lifecycle records for dates more than `older_than_days` in the past
    pub async fn purge_stale(&self, older_than_days: i64) -> AppResult<u64> {
        let cutoff = self.schedule.local_date(self.clock.now()) - Duration::days(older_than_days);
        let removed = self
            .store
            .purge_before(Collection::Lifecycle, cutoff)
            .await?;

        if removed > 0 {
            tracing::info!(%cutoff, removed, "Purged stale lifecycle records");
        }
        Ok(removed)
    }

    async fn load(&self, date: NaiveDate) -> AppResult<Option<Versioned<LifecycleRecord>>> {
        self.store.get(Collection::Lifecycle, date).await
    }

    async fn load_or_new(
        &self,
        date: NaiveDate,
        now: chrono::DateTime<chrono::Utc>,
    ) -> AppResult<(LifecycleRecord, Option<i64>)> {
        Ok(match self.load(date).await? {
            Some(entry) => (entry.value, Some(entry.version)),
            None => (LifecycleRecord::new(date, now), None),
        })
    }
}

fn served(record: &LifecycleRecord, frozen: bool, prediction: Prediction) -> ServedPrediction {
    ServedPrediction {
        state: record.state,
        frozen,
        lock_type: record.lock_type,
        prediction,
    }
}

fn rejected(current: LifecycleRecord, reason: LockRejection) -> LockOutcome {
    tracing::warn!(date = %current.target_date, %reason, "Lock rejected");
    LockOutcome::Rejected { current, reason }
}
