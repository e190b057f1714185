//! Prediction log and post-hoc verification
//!
//! Every lock event appends the locked prediction to a per-date log. Once a
//! date reaches its verification checkpoint the locked prediction is scored
//! against observed wind, exactly once.

use chrono::{Duration, NaiveDate};
use shared::{
    score_accuracy, AccuracySummary, LifecycleRecord, LifecycleSchedule, LifecycleState,
    ObservedSignal, Prediction, VerificationRecord, VerificationSettings,
};

use crate::{
    clock::SharedClock,
    error::{AppError, AppResult},
    store::{Collection, RecordStore, WriteOutcome},
};

const MAX_WRITE_ATTEMPTS: usize = 3;

/// Tracking service for the prediction log and verification records
#[derive(Clone)]
pub struct TrackingService {
    store: RecordStore,
    schedule: LifecycleSchedule,
    settings: VerificationSettings,
    clock: SharedClock,
}

/// Rows removed by a tracking purge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct TrackingPurge {
    pub verification_removed: u64,
    pub prediction_log_removed: u64,
}

impl TrackingService {
    pub fn new(
        store: RecordStore,
        schedule: LifecycleSchedule,
        settings: VerificationSettings,
        clock: SharedClock,
    ) -> Self {
        Self {
            store,
            schedule,
            settings,
            clock,
        }
    }

    /// Append a locked prediction to its date's log.
    ///
    /// A prediction already present (same id) is not logged twice.
    pub async fn record_prediction(&self, prediction: &Prediction) -> AppResult<()> {
        let date = prediction.target_date;

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let now = self.clock.now();
            let stored = self
                .store
                .get::<Vec<Prediction>>(Collection::PredictionLog, date)
                .await?;
            let (mut log, version) = match stored {
                Some(entry) => (entry.value, Some(entry.version)),
                None => (Vec::new(), None),
            };

            if log.iter().any(|p| p.id == prediction.id) {
                tracing::debug!(%date, prediction_id = %prediction.id, "Prediction already logged");
                return Ok(());
            }
            log.push(prediction.clone());

            match self
                .store
                .put(Collection::PredictionLog, date, version, &log, now)
                .await?
            {
                WriteOutcome::Written { .. } => {
                    tracing::info!(
                        %date,
                        prediction_id = %prediction.id,
                        probability = prediction.probability,
                        "Prediction logged"
                    );
                    return Ok(());
                }
                WriteOutcome::Stale => {
                    tracing::warn!(%date, "Prediction log changed underneath, retrying");
                }
            }
        }

        Err(AppError::LockConflict {
            date,
            message: "prediction log kept changing during append".to_string(),
        })
    }

    /// Every prediction logged for a date, oldest first
    pub async fn predictions_for(&self, date: NaiveDate) -> AppResult<Vec<Prediction>> {
        Ok(self
            .store
            .get::<Vec<Prediction>>(Collection::PredictionLog, date)
            .await?
            .map(|entry| entry.value)
            .unwrap_or_default())
    }

    /// Score the locked prediction for `date` against observed wind.
    ///
    /// Verification happens once per date: later calls return the stored
    /// record unchanged.
    pub async fn verify(
        &self,
        date: NaiveDate,
        observed: &ObservedSignal,
    ) -> AppResult<VerificationRecord> {
        if let Some(existing) = self.stored_verification(date).await? {
            tracing::debug!(%date, "Verification already recorded");
            return Ok(existing);
        }

        let now = self.clock.now();
        if let Some(opens_at) = self.schedule.checkpoint(date, LifecycleState::Verified) {
            if now < opens_at {
                return Err(AppError::VerificationNotReady { date, opens_at });
            }
        }

        let prediction = self.verifiable_prediction(date).await?;
        let breakdown = score_accuracy(
            prediction.probability,
            prediction.recommendation,
            observed,
            &self.settings,
        );

        let record = VerificationRecord {
            target_date: date,
            prediction_id: prediction.id,
            predicted_probability: prediction.probability,
            predicted_recommendation: prediction.recommendation,
            observed_average_speed: observed.average_speed,
            observed_direction_deg: observed.average_direction_deg,
            observed_conditions_met: breakdown.conditions_met,
            expected_speed: breakdown.expected_speed,
            accuracy_score: breakdown.score,
            verified_at: now,
        };

        // Return what was stored, not what was computed, so repeat calls match
        let raw = serde_json::to_string(&record)?;
        match self
            .store
            .insert_new_raw(Collection::Verification, date, &raw, now)
            .await?
        {
            WriteOutcome::Written { .. } => {
                tracing::info!(
                    %date,
                    prediction_id = %record.prediction_id,
                    accuracy = record.accuracy_score,
                    conditions_met = record.observed_conditions_met,
                    "Prediction verified"
                );
                Ok(serde_json::from_str(&raw)?)
            }
            WriteOutcome::Stale => {
                tracing::debug!(%date, "Concurrent verification won, returning stored record");
                self.stored_verification(date)
                    .await?
                    .ok_or_else(|| AppError::Internal(format!("verification for {} vanished", date)))
            }
        }
    }

    /// Verification record for a date, if one exists
    pub async fn get_verification(&self, date: NaiveDate) -> AppResult<Option<VerificationRecord>> {
        self.stored_verification(date).await
    }

    /// Most recent verifications, newest target date first.
    ///
    /// Records are decoded as the iterator is consumed; undecodable rows are
    /// skipped with a warning.
    pub async fn accuracy_history(
        &self,
        limit: u32,
    ) -> AppResult<impl Iterator<Item = VerificationRecord>> {
        let rows = self
            .store
            .list_recent_raw(Collection::Verification, limit)
            .await?;

        Ok(rows.into_iter().filter_map(|raw| {
            match serde_json::from_str::<VerificationRecord>(&raw) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping undecodable verification record");
                    None
                }
            }
        }))
    }

    pub async fn accuracy_summary(&self, limit: u32) -> AppResult<AccuracySummary> {
        let records: Vec<VerificationRecord> = self.accuracy_history(limit).await?.collect();
        Ok(AccuracySummary::from_records(&records))
    }

    /// Drop verification records and prediction logs older than `older_than_days`
    pub async fn purge_stale(&self, older_than_days: i64) -> AppResult<TrackingPurge> {
        let cutoff = self.schedule.local_date(self.clock.now()) - Duration::days(older_than_days);

        let verification_removed = self
            .store
            .purge_before(Collection::Verification, cutoff)
            .await?;
        let prediction_log_removed = self
            .store
            .purge_before(Collection::PredictionLog, cutoff)
            .await?;

        if verification_removed + prediction_log_removed > 0 {
            tracing::info!(
                %cutoff,
                verification_removed,
                prediction_log_removed,
                "Purged stale tracking records"
            );
        }

        Ok(TrackingPurge {
            verification_removed,
            prediction_log_removed,
        })
    }

    async fn stored_verification(&self, date: NaiveDate) -> AppResult<Option<VerificationRecord>> {
        match self.store.get_raw(Collection::Verification, date).await? {
            Some((raw, _)) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// The locked prediction when one exists, otherwise the last logged one
    async fn verifiable_prediction(&self, date: NaiveDate) -> AppResult<Prediction> {
        let locked = self
            .store
            .get::<LifecycleRecord>(Collection::Lifecycle, date)
            .await?
            .and_then(|entry| entry.value.locked_prediction);

        if let Some(prediction) = locked {
            return Ok(prediction);
        }

        self.predictions_for(date)
            .await?
            .pop()
            .ok_or_else(|| AppError::NotFound(format!("Locked prediction for {}", date)))
    }
}
