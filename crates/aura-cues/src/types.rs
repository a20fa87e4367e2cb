//! Cue data types and sensitivity tables

use aura_profile::Sensitivity;
use serde::{Deserialize, Serialize};

/// What kind of intervention a cue requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CueType {
    Thermal,
    Vibration,
    Breathing,
    Combined,
    Alert,
    CheckFit,
}

/// Cue urgency; higher preempts lower at the actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CuePriority {
    Low,
    Normal,
    High,
    Alert,
}

/// A concrete intervention request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub cue_type: CueType,
    pub priority: CuePriority,
    pub thermal_intensity_pct: u8,
    pub thermal_duration_s: u16,
    /// Wire pattern id (0 off, 1 single, 2 double, 3 triple, 4 heartbeat,
    /// 5 breathing, 6 alert)
    pub vibration_pattern_id: u8,
    pub vibration_intensity_pct: u8,
    /// Cooldown this cue imposes on successors
    pub cooldown_ms: u64,
}

/// Per-sensitivity intensity envelope.
///
/// Cue intensities interpolate between `base` and `max` with the measured
/// deficit; durations scale by `duration_mult`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensitivityTable {
    pub thermal_base_pct: f64,
    pub thermal_max_pct: f64,
    pub vibration_base_pct: f64,
    pub vibration_max_pct: f64,
    pub duration_mult: f64,
}

impl SensitivityTable {
    /// The fixed table for a sensitivity personality.
    pub fn for_sensitivity(sensitivity: Sensitivity) -> Self {
        match sensitivity {
            Sensitivity::Subtle => Self {
                thermal_base_pct: 25.0,
                thermal_max_pct: 50.0,
                vibration_base_pct: 15.0,
                vibration_max_pct: 40.0,
                duration_mult: 0.7,
            },
            Sensitivity::Normal => Self {
                thermal_base_pct: 35.0,
                thermal_max_pct: 70.0,
                vibration_base_pct: 30.0,
                vibration_max_pct: 60.0,
                duration_mult: 1.0,
            },
            Sensitivity::Assertive => Self {
                thermal_base_pct: 45.0,
                thermal_max_pct: 85.0,
                vibration_base_pct: 45.0,
                vibration_max_pct: 80.0,
                duration_mult: 1.3,
            },
        }
    }

    /// Interpolate a thermal intensity for a deficit in [0, 1].
    pub fn thermal_for_deficit(&self, deficit: f64) -> u8 {
        let deficit = deficit.clamp(0.0, 1.0);
        (self.thermal_base_pct + (self.thermal_max_pct - self.thermal_base_pct) * deficit).round()
            as u8
    }

    /// Interpolate a vibration intensity for a deficit in [0, 1].
    pub fn vibration_for_deficit(&self, deficit: f64) -> u8 {
        let deficit = deficit.clamp(0.0, 1.0);
        (self.vibration_base_pct + (self.vibration_max_pct - self.vibration_base_pct) * deficit)
            .round() as u8
    }

    /// Scale a base duration (seconds).
    pub fn duration_s(&self, base_s: f64) -> u16 {
        (base_s * self.duration_mult).round() as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ordering() {
        assert!(CuePriority::Low < CuePriority::Normal);
        assert!(CuePriority::Normal < CuePriority::High);
        assert!(CuePriority::High < CuePriority::Alert);
    }

    #[test]
    fn test_sensitivity_tables_are_monotone() {
        let subtle = SensitivityTable::for_sensitivity(Sensitivity::Subtle);
        let normal = SensitivityTable::for_sensitivity(Sensitivity::Normal);
        let assertive = SensitivityTable::for_sensitivity(Sensitivity::Assertive);
        assert!(subtle.thermal_max_pct < normal.thermal_max_pct);
        assert!(normal.thermal_max_pct < assertive.thermal_max_pct);
        assert!(subtle.duration_mult < normal.duration_mult);
        assert!(normal.duration_mult < assertive.duration_mult);
    }

    #[test]
    fn test_deficit_interpolation() {
        let table = SensitivityTable::for_sensitivity(Sensitivity::Normal);
        assert_eq!(table.thermal_for_deficit(0.0), 35);
        assert_eq!(table.thermal_for_deficit(1.0), 70);
        assert_eq!(table.vibration_for_deficit(0.5), 45);
        // Out-of-range deficits clamp
        assert_eq!(table.thermal_for_deficit(3.0), 70);
    }

    #[test]
    fn test_duration_scaling() {
        let subtle = SensitivityTable::for_sensitivity(Sensitivity::Subtle);
        assert_eq!(subtle.duration_s(20.0), 14);
        let assertive = SensitivityTable::for_sensitivity(Sensitivity::Assertive);
        assert_eq!(assertive.duration_s(20.0), 26);
    }
}
