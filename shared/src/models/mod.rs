//! Domain models for the dawn-patrol forecaster

mod factor;
mod lifecycle;
mod prediction;
mod signal;
mod verification;

pub use factor::*;
pub use lifecycle::*;
pub use prediction::*;
pub use signal::*;
pub use verification::*;
