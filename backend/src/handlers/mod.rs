//! HTTP handlers for the dawn-patrol forecaster

pub mod health;
pub mod maintenance;
pub mod predictions;
pub mod verification;

pub use health::health_check;
pub use maintenance::purge_stale_records;
pub use predictions::{get_lifecycle_state, lock_prediction, request_prediction};
pub use verification::{get_accuracy_history, get_accuracy_summary, verify_prediction};
