//! FFT power spectrum and band integration
//!
//! One-sided power spectrum of a uniformly resampled tachogram. The series
//! is mean-removed and Hanning-windowed, zero-padded to the next power of
//! two, and normalized by `N · window_power` with `window_power = N/2` for
//! the Hanning window. Band integration multiplies by the bin width and 1e6
//! so that second-valued input yields ms² band powers.

use crate::{hanning, next_pow2};
use num_complex::Complex;
use rustfft::FftPlanner;

/// Compute the one-sided power spectrum of `x` sampled at `fs_hz`.
///
/// Returns `(freqs, power)` for bins 0..=Nyquist. Fewer than four samples
/// yield empty vectors.
pub fn power_spectrum(x: &[f64], fs_hz: f64) -> (Vec<f64>, Vec<f64>) {
    let n = x.len();
    if n < 4 || fs_hz <= 0.0 {
        return (Vec::new(), Vec::new());
    }

    let mean = x.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = x.iter().map(|&v| v - mean).collect();
    let windowed = hanning(&centered);

    let nfft = next_pow2(n);
    let mut buf: Vec<Complex<f64>> = windowed
        .iter()
        .map(|&v| Complex::new(v, 0.0))
        .collect();
    buf.resize(nfft, Complex::new(0.0, 0.0));

    FftPlanner::new().plan_fft_forward(nfft).process(&mut buf);

    let window_power = n as f64 / 2.0;
    let norm = n as f64 * window_power;
    let half = nfft / 2;

    let mut freqs = Vec::with_capacity(half + 1);
    let mut power = Vec::with_capacity(half + 1);
    for (k, bin) in buf.iter().take(half + 1).enumerate() {
        freqs.push(k as f64 * fs_hz / nfft as f64);
        power.push(bin.norm_sqr() / norm);
    }
    (freqs, power)
}

/// Integrate spectral power over `[low_hz, high_hz)` into ms².
///
/// `Σ power · df · 1e6`; the half-open interval keeps adjacent bands from
/// double-counting their shared edge.
pub fn band_power(freqs: &[f64], power: &[f64], low_hz: f64, high_hz: f64) -> f64 {
    if freqs.len() < 2 {
        return 0.0;
    }
    let df = freqs[1] - freqs[0];
    freqs
        .iter()
        .zip(power.iter())
        .filter(|(&f, _)| f >= low_hz && f < high_hz)
        .map(|(_, &p)| p * df * 1e6)
        .sum()
}

/// Frequency and power of the strongest bin within `[low_hz, high_hz)`.
pub fn band_peak(freqs: &[f64], power: &[f64], low_hz: f64, high_hz: f64) -> Option<(f64, f64)> {
    freqs
        .iter()
        .zip(power.iter())
        .filter(|(&f, _)| f >= low_hz && f < high_hz)
        .map(|(&f, &p)| (f, p))
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, fs: f64, n: usize, amp: f64) -> Vec<f64> {
        (0..n)
            .map(|i| amp * (2.0 * std::f64::consts::PI * freq * i as f64 / fs).sin())
            .collect()
    }

    #[test]
    fn test_spectrum_peak_at_signal_frequency() {
        let x = sine(0.25, 4.0, 256, 0.05);
        let (freqs, power) = power_spectrum(&x, 4.0);
        let (peak_hz, _) = band_peak(&freqs, &power, 0.01, 2.0).unwrap();
        assert!(
            (peak_hz - 0.25).abs() < 0.02,
            "peak at {peak_hz}, expected 0.25"
        );
    }

    #[test]
    fn test_band_power_concentrated_around_peak() {
        let x = sine(0.25, 4.0, 256, 0.05);
        let (freqs, power) = power_spectrum(&x, 4.0);
        let in_band = band_power(&freqs, &power, 0.15, 0.40);
        let out_band = band_power(&freqs, &power, 0.04, 0.15);
        assert!(in_band > 0.0);
        assert!(in_band > 20.0 * out_band.max(1e-12));
    }

    #[test]
    fn test_mean_removal_suppresses_dc() {
        let x: Vec<f64> = sine(0.25, 4.0, 256, 0.05)
            .iter()
            .map(|v| v + 0.85)
            .collect();
        let (freqs, power) = power_spectrum(&x, 4.0);
        // DC bin should carry essentially nothing after mean removal
        assert!(power[0] < 1e-6);
        let (peak_hz, _) = band_peak(&freqs, &power, 0.01, 2.0).unwrap();
        assert!((peak_hz - 0.25).abs() < 0.02);
    }

    #[test]
    fn test_degenerate_input() {
        let (f, p) = power_spectrum(&[1.0, 2.0], 4.0);
        assert!(f.is_empty() && p.is_empty());
        assert_eq!(band_power(&f, &p, 0.0, 1.0), 0.0);
    }
}
