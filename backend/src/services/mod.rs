//! Business logic services for the dawn-patrol forecaster

pub mod lifecycle;
pub mod maintenance;
pub mod tracking;

pub use lifecycle::{LifecycleService, LockOutcome, LockRejection, ServedPrediction};
pub use maintenance::{MaintenanceService, PurgeReport};
pub use tracking::{TrackingPurge, TrackingService};
