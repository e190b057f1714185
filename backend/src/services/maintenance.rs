//! Background retention sweep
//!
//! Periodically purges lifecycle, verification and prediction log records
//! for dates past their retention window.

use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::{
    error::AppResult,
    services::{LifecycleService, TrackingService},
};

#[derive(Clone)]
pub struct MaintenanceService {
    lifecycle: LifecycleService,
    tracking: TrackingService,
    lifecycle_retention_days: i64,
    verification_retention_days: i64,
}

/// Rows removed by one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub lifecycle_removed: u64,
    pub verification_removed: u64,
    pub prediction_log_removed: u64,
}

impl PurgeReport {
    pub fn total(&self) -> u64 {
        self.lifecycle_removed + self.verification_removed + self.prediction_log_removed
    }
}

impl MaintenanceService {
    pub fn new(
        lifecycle: LifecycleService,
        tracking: TrackingService,
        lifecycle_retention_days: i64,
        verification_retention_days: i64,
    ) -> Self {
        Self {
            lifecycle,
            tracking,
            lifecycle_retention_days,
            verification_retention_days,
        }
    }

    /// Run one purge across all collections
    pub async fn sweep(&self) -> AppResult<PurgeReport> {
        let lifecycle_removed = self
            .lifecycle
            .purge_stale(self.lifecycle_retention_days)
            .await?;
        let tracking = self
            .tracking
            .purge_stale(self.verification_retention_days)
            .await?;

        Ok(PurgeReport {
            lifecycle_removed,
            verification_removed: tracking.verification_removed,
            prediction_log_removed: tracking.prediction_log_removed,
        })
    }

    /// Sweep on a fixed interval until the runtime shuts down
    pub fn spawn(self, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match self.sweep().await {
                    Ok(report) if report.total() > 0 => {
                        tracing::info!(removed = report.total(), "Maintenance sweep finished");
                    }
                    Ok(_) => tracing::debug!("Maintenance sweep found nothing to purge"),
                    Err(e) => tracing::error!(error = %e, "Maintenance sweep failed"),
                }
            }
        })
    }
}
