//! Frequency-domain analysis with adaptive respiratory bands
//!
//! The tachogram is resampled to a uniform grid, mean-removed, windowed and
//! transformed; band powers are integrated over either the standard LF/HF
//! layout or bands re-centered on the detected breathing frequency.

use crate::types::{AdaptiveBands, FrequencyBand, FrequencyDomainMetrics, RespiratoryDetection};
use aura_dsp::{band_power, power_spectrum, resample_uniform, spectrum::band_peak};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Search range for the respiratory peak (Hz): 3 to 30 breaths per minute.
pub const RESP_RANGE_HZ: (f64, f64) = (0.05, 0.50);

/// Minimum spectral prominence for a respiratory detection to count.
pub const RESP_PROMINENCE_MIN: f64 = 0.30;

/// Half-width of the adapted HF band (total bandwidth 0.10 Hz).
const HF_HALF_WIDTH_HZ: f64 = 0.05;

/// Classical lower edge of the LF band.
const LF_FLOOR_HZ: f64 = 0.04;

/// Guard gap between the LF upper edge and the HF lower edge.
const LF_HF_GAP_HZ: f64 = 0.02;

/// Frequency-analysis configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FrequencyConfig {
    /// Re-center the HF band on the detected breathing frequency
    #[serde(default = "default_adaptive_enabled")]
    pub adaptive_bands_enabled: bool,

    /// Uniform resampling rate for spectral analysis
    #[serde(default = "default_resample_fs")]
    pub resample_fs_hz: f64,
}

fn default_adaptive_enabled() -> bool {
    true
}

fn default_resample_fs() -> f64 {
    4.0
}

impl Default for FrequencyConfig {
    fn default() -> Self {
        Self {
            adaptive_bands_enabled: default_adaptive_enabled(),
            resample_fs_hz: default_resample_fs(),
        }
    }
}

/// Stateless frequency-domain analyzer (configuration only).
#[derive(Debug, Clone, Default)]
pub struct FrequencyAnalyzer {
    config: FrequencyConfig,
}

impl FrequencyAnalyzer {
    pub fn new(config: FrequencyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FrequencyConfig {
        &self.config
    }

    /// Full frequency-domain pass over a cleaned RR window.
    pub fn analyze(&self, rr_ms: &[f64]) -> FrequencyDomainMetrics {
        let fs = self.config.resample_fs_hz;
        let signal = resample_uniform(rr_ms, fs);
        let (freqs, power) = power_spectrum(&signal, fs);

        let respiratory = detect_respiration(&freqs, &power);
        let bands = derive_bands(&respiratory, self.config.adaptive_bands_enabled);

        let lf_power = band_power(&freqs, &power, bands.lf.low_hz, bands.lf.high_hz);
        let hf_power = band_power(&freqs, &power, bands.hf.low_hz, bands.hf.high_hz);
        let total_power = band_power(&freqs, &power, 0.0033, RESP_RANGE_HZ.1);

        let peak_lf_hz = band_peak(&freqs, &power, bands.lf.low_hz, bands.lf.high_hz)
            .map(|(f, _)| f)
            .unwrap_or(0.0);
        let peak_hf_hz = band_peak(&freqs, &power, bands.hf.low_hz, bands.hf.high_hz)
            .map(|(f, _)| f)
            .unwrap_or(0.0);

        let lf_hf_ratio = if hf_power > 0.0 { lf_power / hf_power } else { 0.0 };

        if bands.is_adapted {
            debug!(
                resp_hz = ?bands.detected_resp_hz,
                hf_low = bands.hf.low_hz,
                hf_high = bands.hf.high_hz,
                "adaptive bands in effect"
            );
        }

        FrequencyDomainMetrics {
            lf_power,
            hf_power,
            lf_hf_ratio,
            total_power,
            peak_lf_hz,
            peak_hf_hz,
            adaptive_bands: bands,
            respiratory_detection: respiratory,
        }
    }
}

/// Locate the respiratory peak in the window spectrum.
///
/// `prominence` compares the peak against the mean power of the search
/// range; `peak_sharpness` compares it against its ±3-bin neighborhood.
/// The detection only carries a frequency when prominence reaches 0.3.
pub fn detect_respiration(freqs: &[f64], power: &[f64]) -> RespiratoryDetection {
    let in_range: Vec<usize> = freqs
        .iter()
        .enumerate()
        .filter(|(_, &f)| f >= RESP_RANGE_HZ.0 && f < RESP_RANGE_HZ.1)
        .map(|(i, _)| i)
        .collect();
    if in_range.len() < 8 {
        return RespiratoryDetection::default();
    }

    let peak_idx = *in_range
        .iter()
        .max_by(|&&a, &&b| power[a].total_cmp(&power[b]))
        .expect("non-empty range");
    let peak = power[peak_idx];
    if peak <= 0.0 {
        return RespiratoryDetection::default();
    }

    let mean_in_range =
        in_range.iter().map(|&i| power[i]).sum::<f64>() / in_range.len() as f64;
    let prominence = ((peak - mean_in_range) / peak).max(0.0);

    let lo = peak_idx.saturating_sub(3);
    let hi = (peak_idx + 4).min(power.len());
    let neighbors: Vec<f64> = (lo..hi).filter(|&i| i != peak_idx).map(|i| power[i]).collect();
    let neighbor_mean = neighbors.iter().sum::<f64>() / neighbors.len().max(1) as f64;
    let peak_sharpness = ((peak - neighbor_mean) / peak).max(0.0);

    let confidence = ((prominence + peak_sharpness) / 2.0).clamp(0.0, 1.0);

    RespiratoryDetection {
        frequency_hz: if prominence >= RESP_PROMINENCE_MIN {
            Some(freqs[peak_idx] as f32)
        } else {
            None
        },
        prominence: prominence as f32,
        confidence: confidence as f32,
    }
}

/// Derive the band layout from a respiratory detection.
///
/// Without a reliable detection (or with adaptation disabled) the standard
/// layout applies. Otherwise HF is a 0.10 Hz band centered on the breathing
/// frequency; LF normally spans `[0.04, hf.low − 0.02]`. For slow breathers
/// whose HF reaches into the classical LF floor, LF slides underneath the
/// adapted HF band rather than discarding the adaptation.
pub fn derive_bands(detection: &RespiratoryDetection, adaptive_enabled: bool) -> AdaptiveBands {
    let freq = match detection.frequency_hz {
        Some(f) if adaptive_enabled => f as f64,
        _ => return AdaptiveBands::standard(),
    };

    let center = freq.clamp(RESP_RANGE_HZ.0, RESP_RANGE_HZ.1);
    let hf_low = (center - HF_HALF_WIDTH_HZ).max(0.02);
    let hf_high = (center + HF_HALF_WIDTH_HZ).min(RESP_RANGE_HZ.1);

    let mut lf_low = LF_FLOOR_HZ;
    let mut lf_high = hf_low - LF_HF_GAP_HZ;
    if lf_high <= lf_low {
        // Slow breather: the classical LF floor would collapse the band
        lf_high = hf_low - 0.005;
        lf_low = (hf_low * 0.25).max(0.005);
    }
    if lf_high <= lf_low {
        return AdaptiveBands::standard();
    }

    AdaptiveBands {
        lf: FrequencyBand::new(lf_low, lf_high),
        hf: FrequencyBand::new(hf_low, hf_high),
        is_adapted: true,
        detected_resp_hz: Some(freq as f32),
    }
}
