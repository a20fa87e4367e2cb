//! Analysis result types
//!
//! Everything the pipeline computes per window ends up in a [`Snapshot`].
//! All fields are plain values so snapshots can cross task boundaries as
//! immutable copies.

use aura_common::{Prescription, StressLevel, TrendDirection};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classical time-domain HRV metrics. Requires at least two RR samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeDomainMetrics {
    /// Mean RR interval in milliseconds
    pub mean_rr_ms: f64,

    /// Standard deviation of NN intervals (ms)
    pub sdnn: f64,

    /// Root mean square of successive differences (ms)
    pub rmssd: f64,

    /// Count of successive differences exceeding 50 ms
    pub nn50: u32,

    /// `100 · nn50 / (n − 1)`
    pub pnn50: f64,

    /// `60000 / mean_rr`
    pub hr_bpm: f64,
}

/// One frequency band, `[low_hz, high_hz)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub low_hz: f64,
    pub high_hz: f64,
}

impl FrequencyBand {
    pub fn new(low_hz: f64, high_hz: f64) -> Self {
        Self { low_hz, high_hz }
    }

    pub fn width(&self) -> f64 {
        self.high_hz - self.low_hz
    }
}

/// LF/HF band layout in effect for a window.
///
/// Standard bands are LF `[0.04, 0.15]`, HF `[0.15, 0.40]`. When a reliable
/// respiratory rate is detected the HF band centers on it, widening the
/// system's valid range beyond the 15-breaths/min default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveBands {
    pub lf: FrequencyBand,
    pub hf: FrequencyBand,
    pub is_adapted: bool,
    pub detected_resp_hz: Option<f32>,
}

impl AdaptiveBands {
    /// The fixed fallback layout.
    pub fn standard() -> Self {
        Self {
            lf: FrequencyBand::new(0.04, 0.15),
            hf: FrequencyBand::new(0.15, 0.40),
            is_adapted: false,
            detected_resp_hz: None,
        }
    }
}

impl Default for AdaptiveBands {
    fn default() -> Self {
        Self::standard()
    }
}

/// Outcome of respiratory-rate detection on the window spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RespiratoryDetection {
    /// Detected breathing frequency; absent when prominence < 0.3
    pub frequency_hz: Option<f32>,

    /// `(peak − mean_in_range) / peak`
    pub prominence: f32,

    /// `(prominence + peak_sharpness) / 2`
    pub confidence: f32,
}

/// Frequency-domain metrics over the active band layout. Powers are ms².
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyDomainMetrics {
    pub lf_power: f64,
    pub hf_power: f64,
    /// `lf / hf` when `hf > 0`, else 0
    pub lf_hf_ratio: f64,
    pub total_power: f64,
    /// Frequency of the strongest LF bin, 0 when the band is empty
    pub peak_lf_hz: f64,
    /// Frequency of the strongest HF bin, 0 when the band is empty
    pub peak_hf_hz: f64,
    pub adaptive_bands: AdaptiveBands,
    pub respiratory_detection: RespiratoryDetection,
}

/// Read-only stream statistics embedded in each snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StreamStateSummary {
    pub buffered: usize,
    pub artifact_rate: f32,
}

/// Per-window diagnostics, mostly for the companion app's debug view.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SnapshotDiagnostics {
    pub window_len: usize,
    pub clean_len: usize,
    pub clean_fraction: f32,
    pub artifact_count: usize,
    /// True when the window failed the 60 % clean-fraction gate and the
    /// snapshot carries neutral defaults
    pub degraded: bool,
    pub relaxation_suggested: bool,
    /// RR drift slope clamped to [−1, 1] ms/sample
    pub drift: f32,
    /// Raw composite classifier score behind `stress_level`
    pub stress_score: u32,
    pub sample_entropy: f32,
    pub mean_rr_ms: f32,
    pub rmssd_ms: f32,
}

/// One accepted analysis window, fully scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub processed_at: DateTime<Utc>,
    pub stream_state: StreamStateSummary,
    /// Composite autonomic load, 0–100
    pub load_score: u8,
    pub stress_level: StressLevel,
    /// `hf / (lf + hf)` clamped to [0, 1]
    pub coherence: f32,
    /// Phase disorganization of the respiratory band, 0–1
    pub micro_variability: f32,
    /// Analysis confidence, 0–1
    pub confidence: f32,
    pub trend: TrendDirection,
    pub adaptive_bands: AdaptiveBands,
    pub respiratory_detection: RespiratoryDetection,
    pub prescription: Prescription,
    pub diagnostics: SnapshotDiagnostics,
}
