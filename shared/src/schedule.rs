//! Wall-clock checkpoints that drive the prediction lifecycle

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::models::LifecycleState;

/// Lifecycle checkpoints in the local reporting timezone.
///
/// The evening and final locks fall on the evening before the target date;
/// the active and verified checkpoints fall on the target date itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleSchedule {
    /// Offset of the reporting timezone from UTC
    pub utc_offset_minutes: i32,
    pub evening_lock_hour: u32,
    pub final_lock_hour: u32,
    pub active_hour: u32,
    pub verified_hour: u32,
}

impl Default for LifecycleSchedule {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            evening_lock_hour: 18,
            final_lock_hour: 23,
            active_hour: 6,
            verified_hour: 8,
        }
    }
}

impl LifecycleSchedule {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.utc_offset_minutes.abs() >= 24 * 60 {
            return Err("UTC offset must be less than 24 hours");
        }
        let hours = [
            self.evening_lock_hour,
            self.final_lock_hour,
            self.active_hour,
            self.verified_hour,
        ];
        if hours.iter().any(|h| *h > 23) {
            return Err("Lifecycle checkpoint hours must be between 0 and 23");
        }
        if self.evening_lock_hour >= self.final_lock_hour {
            return Err("Evening lock must come before the final lock");
        }
        if self.active_hour >= self.verified_hour {
            return Err("Active checkpoint must come before the verified checkpoint");
        }
        Ok(())
    }

    fn offset_seconds(&self) -> i64 {
        i64::from(self.utc_offset_minutes) * 60
    }

    /// Local wall-clock time for an instant
    pub fn local_time(&self, now: DateTime<Utc>) -> NaiveDateTime {
        now.naive_utc() + Duration::seconds(self.offset_seconds())
    }

    /// Local calendar date for an instant
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        self.local_time(now).date()
    }

    fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        Utc.from_utc_datetime(&(local - Duration::seconds(self.offset_seconds())))
    }

    fn at_hour(date: NaiveDate, hour: u32) -> NaiveDateTime {
        date.and_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or_default())
    }

    /// Instant at which `state` begins for `target_date`; preview has no start
    pub fn checkpoint(&self, target_date: NaiveDate, state: LifecycleState) -> Option<DateTime<Utc>> {
        let eve = target_date.pred_opt().unwrap_or(target_date);
        let local = match state {
            LifecycleState::Preview => return None,
            LifecycleState::LockedEvening => Self::at_hour(eve, self.evening_lock_hour),
            LifecycleState::LockedFinal => Self::at_hour(eve, self.final_lock_hour),
            LifecycleState::Active => Self::at_hour(target_date, self.active_hour),
            LifecycleState::Verified => Self::at_hour(target_date, self.verified_hour),
        };
        Some(self.to_utc(local))
    }

    /// The state the clock says `target_date` should be in at `now`
    pub fn phase_at(&self, target_date: NaiveDate, now: DateTime<Utc>) -> LifecycleState {
        let mut phase = LifecycleState::Preview;
        while let Some(next) = phase.next() {
            match self.checkpoint(target_date, next) {
                Some(starts) if now >= starts => phase = next,
                _ => break,
            }
        }
        phase
    }

    /// Next dawn-patrol date that has not yet been verified at `now`.
    ///
    /// Once today's verified checkpoint passes, the relevant date is tomorrow.
    pub fn upcoming_target_date(&self, now: DateTime<Utc>) -> NaiveDate {
        let local = self.local_time(now);
        let today = local.date();
        if local.time() >= NaiveTime::from_hms_opt(self.verified_hour, 0, 0).unwrap_or_default() {
            today.succ_opt().unwrap_or(today)
        } else {
            today
        }
    }
}
