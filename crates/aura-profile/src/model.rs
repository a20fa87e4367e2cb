//! Typed profile model
//!
//! Structures for everything the ring knows about its wearer: demographic
//! hints, calibrated physiological baselines and intervention preferences.
//! New fields always carry serde defaults so older persisted profiles load
//! cleanly through migration.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Current schema version of the persisted profile envelope.
pub const PROFILE_SCHEMA_VERSION: u32 = 2;

/// Self-reported activity level, used to seed population baselines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    #[default]
    Moderate,
    Active,
    Athlete,
}

/// Optional demographic hints; everything works without them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Demographic {
    #[serde(default)]
    pub age_years: Option<u8>,

    #[serde(default)]
    pub activity: ActivityLevel,
}

/// How far along this user's calibration is.
///
/// Partial calibrations are permanent until an explicit re-calibration;
/// there is no automatic demotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationStatus {
    #[default]
    Uncalibrated,
    Partial,
    Complete,
}

/// Physiological baseline, calibrated or population-derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub resting_hr_bpm: f64,
    pub rmssd_ms: f64,

    /// 10th percentile of calibration coherence
    pub coherence_floor: f64,

    /// 90th percentile of calibration coherence
    pub coherence_ceiling: f64,

    /// Breaths per minute
    #[serde(default = "default_resp_rate")]
    pub respiratory_rate_cpm: f64,

    #[serde(default)]
    pub calibration: CalibrationStatus,

    /// Cumulative samples fed into calibration
    #[serde(default)]
    pub calibration_samples: u32,
}

fn default_resp_rate() -> f64 {
    15.0
}

impl Default for Baseline {
    fn default() -> Self {
        Self {
            resting_hr_bpm: 65.0,
            rmssd_ms: 42.0,
            coherence_floor: 0.30,
            coherence_ceiling: 0.70,
            respiratory_rate_cpm: default_resp_rate(),
            calibration: CalibrationStatus::Uncalibrated,
            calibration_samples: 0,
        }
    }
}

impl Baseline {
    /// Population default adjusted by age and activity level.
    ///
    /// RMSSD declines with age and rises with fitness; athletes run slower
    /// resting heart and breathing rates.
    pub fn population_default(demographic: &Demographic) -> Self {
        let mut baseline = Self::default();

        if let Some(age) = demographic.age_years {
            let decades_past_30 = (age.saturating_sub(30)) as f64 / 10.0;
            baseline.rmssd_ms = (baseline.rmssd_ms - 3.5 * decades_past_30).max(15.0);
            baseline.resting_hr_bpm += decades_past_30;
        }

        match demographic.activity {
            ActivityLevel::Sedentary => {
                baseline.rmssd_ms = (baseline.rmssd_ms - 5.0).max(12.0);
                baseline.resting_hr_bpm += 5.0;
            }
            ActivityLevel::Moderate => {}
            ActivityLevel::Active => {
                baseline.rmssd_ms += 5.0;
                baseline.resting_hr_bpm -= 5.0;
            }
            ActivityLevel::Athlete => {
                baseline.rmssd_ms += 12.0;
                baseline.resting_hr_bpm -= 12.0;
                baseline.respiratory_rate_cpm = 11.0;
            }
        }
        baseline
    }
}

/// Partial baseline mutation; `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BaselineUpdate {
    pub resting_hr_bpm: Option<f64>,
    pub rmssd_ms: Option<f64>,
    pub coherence_floor: Option<f64>,
    pub coherence_ceiling: Option<f64>,
    pub respiratory_rate_cpm: Option<f64>,
}

/// Daily quiet window in local hours; `start == end` disables it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietHours {
    pub start_hour: u8,
    pub end_hour: u8,
}

impl QuietHours {
    /// Whether `hour` falls inside the window. A start after the end means
    /// the window wraps overnight ("≥ start or < end").
    pub fn contains(&self, hour: u8) -> bool {
        if self.start_hour == self.end_hour {
            return false;
        }
        if self.start_hour > self.end_hour {
            hour >= self.start_hour || hour < self.end_hour
        } else {
            hour >= self.start_hour && hour < self.end_hour
        }
    }
}

/// Cue sensitivity personality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    Subtle,
    #[default]
    Normal,
    Assertive,
}

/// Intervention preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Master switch over all cues
    #[serde(default = "default_true")]
    pub cues_enabled: bool,

    #[serde(default = "default_true")]
    pub thermal_enabled: bool,

    #[serde(default = "default_true")]
    pub vibration_enabled: bool,

    #[serde(default = "default_true")]
    pub breathing_enabled: bool,

    /// Thermal intensity multiplier, clamped to [0.5, 2.0]
    #[serde(default = "default_unit_scale")]
    pub thermal_intensity_scale: f64,

    /// Vibration intensity multiplier, clamped to [0.5, 2.0]
    #[serde(default = "default_unit_scale")]
    pub vibration_intensity_scale: f64,

    /// Duration multiplier, clamped to [0.5, 1.5]
    #[serde(default = "default_unit_scale")]
    pub duration_scale: f64,

    #[serde(default)]
    pub quiet_hours: Option<QuietHours>,

    /// Maximum cue activations per local day
    #[serde(default = "default_daily_cap")]
    pub daily_activation_cap: u32,

    /// IANA zone name for quiet hours and the daily counter
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default)]
    pub sensitivity: Sensitivity,
}

fn default_true() -> bool {
    true
}
fn default_unit_scale() -> f64 {
    1.0
}
fn default_daily_cap() -> u32 {
    40
}
fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            cues_enabled: true,
            thermal_enabled: true,
            vibration_enabled: true,
            breathing_enabled: true,
            thermal_intensity_scale: 1.0,
            vibration_intensity_scale: 1.0,
            duration_scale: 1.0,
            quiet_hours: None,
            daily_activation_cap: default_daily_cap(),
            timezone: default_timezone(),
            sensitivity: Sensitivity::Normal,
        }
    }
}

/// One wearer's complete profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,

    #[serde(default)]
    pub demographic: Demographic,

    #[serde(default)]
    pub baseline: Baseline,

    #[serde(default)]
    pub preferences: Preferences,

    /// Schema version this profile was last written at
    #[serde(default)]
    pub version: u32,

    /// Cue activations so far on `activation_day`
    #[serde(default)]
    pub activations_today: u32,

    /// Local date the daily counter belongs to
    #[serde(default)]
    pub activation_day: Option<NaiveDate>,
}

impl UserProfile {
    /// Fresh profile seeded from population defaults.
    pub fn new(user_id: impl Into<String>, demographic: Demographic) -> Self {
        Self {
            user_id: user_id.into(),
            demographic,
            baseline: Baseline::population_default(&demographic),
            preferences: Preferences::default(),
            version: PROFILE_SCHEMA_VERSION,
            activations_today: 0,
            activation_day: None,
        }
    }
}
