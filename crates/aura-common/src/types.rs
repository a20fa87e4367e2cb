//! Shared domain types
//!
//! These types cross crate boundaries: the analyzer produces them, the cue
//! engine and actuator scheduler consume them, and the profile store scales
//! them. Everything here is plain data with serde derives.

use serde::{Deserialize, Serialize};

/// Autonomic stress level derived from the composite classifier score.
///
/// Ordering matters: `Optimal < Low < Moderate < High < NeedsAttention`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressLevel {
    /// Composite score ≤ 2: coherent, parasympathetically dominated state
    Optimal,

    /// Composite score ≤ 5: mild activation, no intervention warranted
    Low,

    /// Composite score ≤ 8: sustained activation worth a gentle cue
    Moderate,

    /// Composite score ≤ 11: strong sympathetic dominance
    High,

    /// Composite score > 11: disorganized signal, user attention warranted
    NeedsAttention,
}

impl StressLevel {
    /// Map a composite classifier score to a level.
    pub fn from_score(score: u32) -> Self {
        match score {
            0..=2 => StressLevel::Optimal,
            3..=5 => StressLevel::Low,
            6..=8 => StressLevel::Moderate,
            9..=11 => StressLevel::High,
            _ => StressLevel::NeedsAttention,
        }
    }

    /// True for the two levels that justify proactive intervention.
    pub fn is_elevated(&self) -> bool {
        matches!(self, StressLevel::High | StressLevel::NeedsAttention)
    }
}

/// Direction of the coherence trend across recent analysis windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Stable,
    Deteriorating,
}

/// Actuation modality on the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Vibration,
    Thermal,
}

/// Thermal half of a prescription: intensity and bounded duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermalPrescription {
    /// Duty-cycle percentage requested from the heating element
    pub intensity_pct: f32,
    /// Seconds of warmth; the actuator scheduler caps this at 60 s
    pub duration_s: u32,
}

/// Vibration half of a prescription: a wire pattern id plus intensity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VibrationPrescription {
    /// Wire pattern id (0 off, 1 single .. 6 alert)
    pub pattern_id: u8,
    pub intensity_pct: f32,
}

/// Per-snapshot intervention suggestion, before profile scaling.
///
/// `None` halves mean "this modality has nothing to offer for this window",
/// not that the modality is disabled; enable flags live in the profile.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Prescription {
    pub thermal: Option<ThermalPrescription>,
    pub vibration: Option<VibrationPrescription>,
}

impl Prescription {
    pub fn is_empty(&self) -> bool {
        self.thermal.is_none() && self.vibration.is_none()
    }
}
