//! Coherence, micro-variability and composite stress classification

use crate::types::{FrequencyBand, FrequencyDomainMetrics, TimeDomainMetrics};
use aura_common::{StressLevel, TrendDirection};
use aura_dsp::{analytic_phase, bandpass_zero_phase, resample_uniform, sample_entropy};
use tracing::debug;

/// Minimum cleaned samples for a meaningful spectral coherence.
pub const COHERENCE_MIN_SAMPLES: usize = 32;

/// SDNN below this is treated as a flat line (sensor stuck, not calm).
pub const SDNN_FLATLINE_MS: f64 = 1.0;

/// Drift slope below which a trend is circadian, not acute (ms/sample).
pub const DRIFT_SLOPE_MAX: f64 = 0.2;

/// Artifact rate above which drift compensation is not trusted.
pub const DRIFT_ARTIFACT_MAX: f64 = 0.15;

/// Respiratory-band phase coherence, `hf / (lf + hf)` clamped to [0, 1].
///
/// Returns the neutral 0.5 when the window is too short or flat-lined, and
/// exactly 0 when the bands carry no power at all.
pub fn coherence(lf_power: f64, hf_power: f64, cleaned_len: usize, sdnn: f64) -> f64 {
    if cleaned_len < COHERENCE_MIN_SAMPLES || sdnn < SDNN_FLATLINE_MS {
        return 0.5;
    }
    let total = lf_power + hf_power;
    if total <= 0.0 {
        return 0.0;
    }
    (hf_power / total).clamp(0.0, 1.0)
}

/// Phase micro-variability of the respiratory band, 0–1.
///
/// Bandpass the resampled tachogram over the active HF band, take the
/// analytic phase, wrap its first differences to `(−π, π]` and measure
/// their spread around the mean step. Edge samples are excluded; the
/// Hilbert reconstruction is unreliable there.
pub fn micro_variability(rr_ms: &[f64], hf_band: FrequencyBand, fs_hz: f64) -> f64 {
    let signal = resample_uniform(rr_ms, fs_hz);
    if signal.len() < 32 {
        return 0.0;
    }

    let filtered = bandpass_zero_phase(&signal, fs_hz, hf_band.low_hz, hf_band.high_hz);
    let phase = analytic_phase(&filtered);

    // Keep only the middle half: both the zero-phase filter and the
    // Hilbert reconstruction ring near the window edges
    let trim = (phase.len() / 4).max(8);
    if phase.len() <= 2 * trim + 2 {
        return 0.0;
    }
    let interior = &phase[trim..phase.len() - trim];

    let mut steps = Vec::with_capacity(interior.len() - 1);
    for pair in interior.windows(2) {
        let mut d = pair[1] - pair[0];
        while d > std::f64::consts::PI {
            d -= 2.0 * std::f64::consts::PI;
        }
        while d <= -std::f64::consts::PI {
            d += 2.0 * std::f64::consts::PI;
        }
        steps.push(d);
    }

    let mean = steps.iter().sum::<f64>() / steps.len() as f64;
    let rms = (steps.iter().map(|d| (d - mean) * (d - mean)).sum::<f64>() / steps.len() as f64)
        .sqrt();
    (rms / 0.5).min(1.0)
}

/// Everything the classifier derives for one window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassificationOutcome {
    pub coherence: f64,
    pub micro_variability: f64,
    pub sample_entropy: f64,
    /// Composite ordinal score behind the level
    pub stress_score: u32,
    pub stress_level: StressLevel,
    /// Raw RR slope in ms/sample, clamped to [−1, 1] for reporting
    pub drift: f64,
    pub confidence: f64,
    /// 0–100 autonomic load
    pub load_score: u8,
}

/// Stateless composite stress classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct StressClassifier;

impl StressClassifier {
    /// Score one cleaned window.
    pub fn classify(
        &self,
        cleaned: &[f64],
        time: &TimeDomainMetrics,
        freq: &FrequencyDomainMetrics,
        artifact_rate: f64,
        fs_hz: f64,
    ) -> ClassificationOutcome {
        let coherence = coherence(
            freq.lf_power,
            freq.hf_power,
            cleaned.len(),
            time.sdnn,
        );
        let micro = micro_variability(cleaned, freq.adaptive_bands.hf, fs_hz);
        let entropy = sample_entropy(cleaned, 2, 0.2);

        let score = stress_components(micro, freq.hf_power, time.rmssd, entropy);
        let slope = rr_slope(cleaned);
        let level = apply_drift_compensation(StressLevel::from_score(score), slope, artifact_rate);

        let confidence = confidence_weight(cleaned.len(), artifact_rate, time.rmssd, freq.hf_power);

        let load = 0.4 * micro + 0.4 * (1.0 - coherence) + 0.2 * (score as f64 / 11.0);
        let load_score = (100.0 * load.clamp(0.0, 1.0)).round() as u8;

        ClassificationOutcome {
            coherence,
            micro_variability: micro,
            sample_entropy: entropy,
            stress_score: score,
            stress_level: level,
            drift: slope.clamp(-1.0, 1.0),
            confidence,
            load_score,
        }
    }
}

/// Drift compensation: a slow monotone trend with a clean signal is
/// circadian drift, not acute stress, so elevated levels step back to
/// moderate.
pub fn apply_drift_compensation(level: StressLevel, slope: f64, artifact_rate: f64) -> StressLevel {
    if slope.abs() < DRIFT_SLOPE_MAX && artifact_rate < DRIFT_ARTIFACT_MAX && level.is_elevated() {
        debug!(slope, artifact_rate, "drift compensation downgrade");
        return StressLevel::Moderate;
    }
    level
}

/// The four-row ordinal scoring table.
fn stress_components(micro: f64, hf_power: f64, rmssd: f64, entropy: f64) -> u32 {
    let micro_score = if micro < 0.02 {
        0
    } else if micro < 0.05 {
        1
    } else if micro < 0.08 {
        2
    } else {
        3
    };
    let hf_score = if hf_power > 1000.0 {
        0
    } else if hf_power > 250.0 {
        1
    } else {
        2
    };
    let rmssd_score = if rmssd > 50.0 {
        0
    } else if rmssd > 20.0 {
        1
    } else {
        2
    };
    let entropy_score = if entropy > 1.5 {
        0
    } else if entropy > 1.0 {
        1
    } else {
        2
    };
    micro_score + hf_score + rmssd_score + entropy_score
}

/// Least-squares slope of RR against beat index (ms/sample).
fn rr_slope(rr_ms: &[f64]) -> f64 {
    let n = rr_ms.len();
    if n < 2 {
        return 0.0;
    }
    let idx_mean = (n - 1) as f64 / 2.0;
    let rr_mean = rr_ms.iter().sum::<f64>() / n as f64;
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, &rr) in rr_ms.iter().enumerate() {
        let di = i as f64 - idx_mean;
        num += di * (rr - rr_mean);
        den += di * di;
    }
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// Weighted signal-quality confidence, 0–1.
fn confidence_weight(clean_len: usize, artifact_rate: f64, rmssd: f64, hf_power: f64) -> f64 {
    0.25 * (clean_len as f64 / 100.0).min(1.0)
        + 0.30 * (1.0 - (2.0 * artifact_rate).min(1.0))
        + 0.25 * (rmssd / 10.0).min(1.0)
        + 0.20 * (hf_power / 100.0).min(1.0)
}

/// Trend across history: the latest window's micro-variability against the
/// third-most-recent, with ±0.01 hysteresis.
pub fn trend_from_history(latest_micro: f64, third_most_recent_micro: f64) -> TrendDirection {
    let delta = latest_micro - third_most_recent_micro;
    if delta > 0.01 {
        TrendDirection::Deteriorating
    } else if delta < -0.01 {
        TrendDirection::Improving
    } else {
        TrendDirection::Stable
    }
}
