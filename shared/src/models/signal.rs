//! Meteorological input models

use serde::{Deserialize, Serialize};

/// One normalized snapshot of the overnight inputs used for scoring.
///
/// Produced by the weather-data collaborator from provider payloads; values
/// are already unit-normalized (percent, pressure units, degrees). Every
/// reading is optional so that a timed-out or missing source degrades the
/// affected factor instead of failing the whole analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherSignal {
    /// Precipitation probability over the overnight analysis window (%)
    pub precip_probability_analysis: Option<f64>,
    /// Precipitation probability over the dawn target window (%)
    pub precip_probability_target: Option<f64>,
    /// Clear-sky fraction during the pre-dawn cooling interval (%)
    pub sky_clear_percent: Option<f64>,
    /// Signed pressure change across the cooling interval
    pub pressure_change: Option<f64>,
    /// Signed temperature differential, low-elevation minus high-elevation
    pub temperature_differential: Option<f64>,
    /// Upper-level transport wind, when a sounding or model level is available
    pub transport_wind: Option<TransportWind>,
}

impl WeatherSignal {
    /// Worst-case precipitation probability across both windows
    pub fn precip_probability(&self) -> Option<f64> {
        match (self.precip_probability_analysis, self.precip_probability_target) {
            (Some(a), Some(t)) => Some(a.max(t)),
            (a, t) => a.or(t),
        }
    }
}

/// Upper-level transport wind and how organized the flow is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportWind {
    pub speed: f64,
    pub organization: FlowOrganization,
}

/// Qualitative organization of the upper-level flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowOrganization {
    Organized,
    Variable,
    Disorganized,
}

impl FlowOrganization {
    /// Multiplier applied to the transport-wind speed score
    pub fn multiplier(&self) -> f64 {
        match self {
            FlowOrganization::Organized => 1.0,
            FlowOrganization::Variable => 0.7,
            FlowOrganization::Disorganized => 0.4,
        }
    }
}

impl std::fmt::Display for FlowOrganization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowOrganization::Organized => write!(f, "organized"),
            FlowOrganization::Variable => write!(f, "variable"),
            FlowOrganization::Disorganized => write!(f, "disorganized"),
        }
    }
}

/// Wind actually observed over the target window, supplied by the live-data collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedSignal {
    pub average_speed: f64,
    /// Mean direction in degrees (meteorological, "from")
    pub average_direction_deg: Option<f64>,
    pub sample_count: Option<u32>,
}
