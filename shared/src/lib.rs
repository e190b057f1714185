//! Shared types and scoring logic for the dawn-patrol katabatic forecaster
//!
//! This crate holds everything that does no I/O: the domain models, the
//! factor evaluators, the weighted scoring engine, the lifecycle schedule
//! and accuracy scoring. It is used by the backend service and, through
//! WASM, by clients that want to preview scores offline.

pub mod accuracy;
pub mod factors;
pub mod models;
pub mod schedule;
pub mod scoring;
pub mod settings;
pub mod validation;

pub use accuracy::*;
pub use factors::{FactorEvaluator, FactorRegistry, RegistryError, NEUTRAL_SCORE};
pub use models::*;
pub use schedule::*;
pub use scoring::*;
pub use settings::*;
pub use validation::*;
