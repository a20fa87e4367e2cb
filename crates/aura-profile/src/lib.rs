//! Aura Profile – the single mutator of per-user data
//!
//! Every other component observes profiles copy-on-read; only this store
//! writes them. Profiles are created lazily with population defaults on
//! first use and never auto-deleted. Persistence is a versioned JSON
//! envelope with a migration step that fills fields older versions lacked.

mod model;
pub use model::*;

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Minimum RR samples for any calibration pass.
pub const CALIBRATION_MIN_SAMPLES: usize = 50;

/// Cumulative samples at which calibration is considered complete.
pub const CALIBRATION_COMPLETE_SAMPLES: u32 = 300;

/// EMA weight for respiratory-baseline updates.
pub const RESP_BASELINE_ALPHA: f64 = 0.1;

/// Clamp range for scaled thermal prescriptions (%).
pub const THERMAL_SCALE_RANGE: (f64, f64) = (5.0, 60.0);

/// Clamp range for scaled vibration prescriptions (%).
pub const VIBRATION_SCALE_RANGE: (f64, f64) = (5.0, 50.0);

/// Clamp range for the duration multiplier.
pub const DURATION_SCALE_RANGE: (f64, f64) = (0.5, 1.5);

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("unknown user: {0}")]
    UnknownUser(String),

    #[error("calibration needs at least {need} samples, got {got}")]
    CalibrationTooSmall { got: usize, need: usize },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unsupported profile schema version {0}")]
    UnsupportedVersion(u32),
}

pub type Result<T> = std::result::Result<T, ProfileError>;

/// Actuation modality, for prescription scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleModality {
    Thermal,
    Vibration,
}

/// Versioned on-disk envelope.
#[derive(Debug, Serialize, Deserialize)]
struct ProfileEnvelope {
    version: u32,
    profiles: HashMap<String, UserProfile>,
}

/// In-memory profile store.
#[derive(Debug, Default)]
pub struct ProfileStore {
    profiles: HashMap<String, UserProfile>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy-on-read fetch.
    pub fn get(&self, user_id: &str) -> Option<UserProfile> {
        self.profiles.get(user_id).cloned()
    }

    /// Fetch, creating lazily from population defaults when absent.
    pub fn get_or_create(&mut self, user_id: &str) -> UserProfile {
        self.ensure(user_id).clone()
    }

    /// Insert or replace a profile wholesale.
    pub fn set(&mut self, profile: UserProfile) {
        self.profiles.insert(profile.user_id.clone(), profile);
    }

    /// Remove a profile. The core never calls this on its own; deletion is
    /// always an explicit user action.
    pub fn delete(&mut self, user_id: &str) -> bool {
        self.profiles.remove(user_id).is_some()
    }

    pub fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.profiles.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// The user's baseline, or a demographic-adjusted population default
    /// when the user is unknown.
    pub fn get_baseline(&self, user_id: &str) -> Baseline {
        match self.profiles.get(user_id) {
            Some(profile) => profile.baseline,
            None => Baseline::population_default(&Demographic::default()),
        }
    }

    /// Apply a partial baseline mutation.
    pub fn update_baseline(&mut self, user_id: &str, update: BaselineUpdate) -> Baseline {
        let profile = self.ensure(user_id);
        let baseline = &mut profile.baseline;
        if let Some(v) = update.resting_hr_bpm {
            baseline.resting_hr_bpm = v;
        }
        if let Some(v) = update.rmssd_ms {
            baseline.rmssd_ms = v;
        }
        if let Some(v) = update.coherence_floor {
            baseline.coherence_floor = v;
        }
        if let Some(v) = update.coherence_ceiling {
            baseline.coherence_ceiling = v;
        }
        if let Some(v) = update.respiratory_rate_cpm {
            baseline.respiratory_rate_cpm = v;
        }
        *baseline
    }

    /// Fold a calibration batch into the baseline.
    ///
    /// Needs at least 50 RR samples. Computes resting HR and RMSSD from the
    /// batch and the 10th/90th percentile coherence floor/ceiling; the
    /// calibration advances to partial, and to complete once the cumulative
    /// sample count reaches 300.
    pub fn process_calibration(
        &mut self,
        user_id: &str,
        rr_ms: &[f64],
        coherences: &[f64],
    ) -> Result<Baseline> {
        if rr_ms.len() < CALIBRATION_MIN_SAMPLES {
            return Err(ProfileError::CalibrationTooSmall {
                got: rr_ms.len(),
                need: CALIBRATION_MIN_SAMPLES,
            });
        }

        let mean_rr = rr_ms.iter().sum::<f64>() / rr_ms.len() as f64;
        let mut sum_sq = 0.0;
        for pair in rr_ms.windows(2) {
            let diff = pair[1] - pair[0];
            sum_sq += diff * diff;
        }
        let rmssd = (sum_sq / (rr_ms.len() - 1) as f64).sqrt();

        let profile = self.ensure(user_id);
        let baseline = &mut profile.baseline;
        baseline.resting_hr_bpm = 60_000.0 / mean_rr;
        baseline.rmssd_ms = rmssd;
        if !coherences.is_empty() {
            baseline.coherence_floor = percentile(coherences, 0.10);
            baseline.coherence_ceiling = percentile(coherences, 0.90);
        }

        baseline.calibration_samples += rr_ms.len() as u32;
        baseline.calibration = if baseline.calibration_samples >= CALIBRATION_COMPLETE_SAMPLES {
            CalibrationStatus::Complete
        } else {
            CalibrationStatus::Partial
        };

        info!(
            user = user_id,
            samples = baseline.calibration_samples,
            status = ?baseline.calibration,
            "calibration processed"
        );
        Ok(*baseline)
    }

    /// Exponential moving average over detected respiratory rates.
    pub fn update_respiratory_baseline(&mut self, user_id: &str, rate_cpm: f64) -> f64 {
        let baseline = &mut self.ensure(user_id).baseline;
        baseline.respiratory_rate_cpm = (1.0 - RESP_BASELINE_ALPHA) * baseline.respiratory_rate_cpm
            + RESP_BASELINE_ALPHA * rate_cpm;
        baseline.respiratory_rate_cpm
    }

    /// Scale a prescribed intensity by the user's preference and clamp it
    /// into the modality's safe envelope.
    pub fn scale_prescription(&self, user_id: &str, base_pct: f64, modality: ScaleModality) -> f64 {
        let preferences = self.preferences_or_default(user_id);
        let (scale, range) = match modality {
            ScaleModality::Thermal => (preferences.thermal_intensity_scale, THERMAL_SCALE_RANGE),
            ScaleModality::Vibration => {
                (preferences.vibration_intensity_scale, VIBRATION_SCALE_RANGE)
            }
        };
        (base_pct * scale.clamp(0.5, 2.0)).clamp(range.0, range.1)
    }

    /// Scale a prescribed duration by the user's preference.
    pub fn scale_duration(&self, user_id: &str, base_ms: u64) -> u64 {
        let preferences = self.preferences_or_default(user_id);
        let factor = preferences
            .duration_scale
            .clamp(DURATION_SCALE_RANGE.0, DURATION_SCALE_RANGE.1);
        (base_ms as f64 * factor).round() as u64
    }

    /// Quiet-hours check in the user's IANA zone.
    pub fn is_in_quiet_hours(&self, user_id: &str, now: DateTime<Utc>) -> bool {
        let preferences = self.preferences_or_default(user_id);
        let Some(window) = preferences.quiet_hours else {
            return false;
        };
        let hour = local_hour(&preferences.timezone, now);
        window.contains(hour)
    }

    /// Whether a cue may activate right now: outside quiet hours and under
    /// the daily cap.
    pub fn can_activate_cue(&self, user_id: &str, now: DateTime<Utc>) -> bool {
        !self.is_in_quiet_hours(user_id, now) && self.under_daily_cap(user_id, now)
    }

    /// The daily-cap half of the activation policy, for callers that have
    /// already settled quiet hours from an injected hour.
    pub fn under_daily_cap(&self, user_id: &str, now: DateTime<Utc>) -> bool {
        let Some(profile) = self.profiles.get(user_id) else {
            return true;
        };
        let today = local_date(&profile.preferences.timezone, now);
        if profile.activation_day != Some(today) {
            return true;
        }
        profile.activations_today < profile.preferences.daily_activation_cap
    }

    /// Count one activation against today's cap.
    pub fn record_activation(&mut self, user_id: &str, now: DateTime<Utc>) -> u32 {
        let profile = self.ensure(user_id);
        let today = local_date(&profile.preferences.timezone, now);
        if profile.activation_day != Some(today) {
            profile.activation_day = Some(today);
            profile.activations_today = 0;
        }
        profile.activations_today += 1;
        debug!(
            user = user_id,
            today = profile.activations_today,
            "cue activation recorded"
        );
        profile.activations_today
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Serialize to the versioned envelope.
    pub fn to_json(&self) -> Result<String> {
        let envelope = ProfileEnvelope {
            version: PROFILE_SCHEMA_VERSION,
            profiles: self.profiles.clone(),
        };
        Ok(serde_json::to_string_pretty(&envelope)?)
    }

    /// Load from a persisted envelope, migrating older versions.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut envelope: ProfileEnvelope = serde_json::from_str(json)?;
        if envelope.version > PROFILE_SCHEMA_VERSION {
            return Err(ProfileError::UnsupportedVersion(envelope.version));
        }
        if envelope.version < PROFILE_SCHEMA_VERSION {
            info!(
                from = envelope.version,
                to = PROFILE_SCHEMA_VERSION,
                "migrating profile store"
            );
            for profile in envelope.profiles.values_mut() {
                migrate_profile(profile);
            }
        }
        Ok(Self {
            profiles: envelope.profiles,
        })
    }

    fn ensure(&mut self, user_id: &str) -> &mut UserProfile {
        self.profiles
            .entry(user_id.to_string())
            .or_insert_with(|| {
                info!(user = user_id, "creating profile from population defaults");
                UserProfile::new(user_id, Demographic::default())
            })
    }

    fn preferences_or_default(&self, user_id: &str) -> Preferences {
        self.profiles
            .get(user_id)
            .map(|p| p.preferences.clone())
            .unwrap_or_default()
    }
}

/// Fill anything a pre-v2 profile is missing. Serde defaults already
/// populated absent fields; this pass fixes semantically-empty ones.
fn migrate_profile(profile: &mut UserProfile) {
    if profile.baseline.respiratory_rate_cpm <= 0.0 {
        profile.baseline.respiratory_rate_cpm =
            Baseline::population_default(&profile.demographic).respiratory_rate_cpm;
    }
    if profile.baseline.coherence_ceiling <= profile.baseline.coherence_floor {
        let defaults = Baseline::default();
        profile.baseline.coherence_floor = defaults.coherence_floor;
        profile.baseline.coherence_ceiling = defaults.coherence_ceiling;
    }
    profile.version = PROFILE_SCHEMA_VERSION;
}

/// Linear-interpolated percentile, `q ∈ [0, 1]`.
fn percentile(values: &[f64], q: f64) -> f64 {
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    if sorted.len() == 1 {
        return sorted[0];
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

fn resolve_tz(name: &str) -> Tz {
    name.parse().unwrap_or_else(|_| {
        warn!(timezone = name, "unknown IANA zone, falling back to UTC");
        Tz::UTC
    })
}

fn local_hour(timezone: &str, now: DateTime<Utc>) -> u8 {
    now.with_timezone(&resolve_tz(timezone)).hour() as u8
}

fn local_date(timezone: &str, now: DateTime<Utc>) -> chrono::NaiveDate {
    now.with_timezone(&resolve_tz(timezone)).date_naive()
}
