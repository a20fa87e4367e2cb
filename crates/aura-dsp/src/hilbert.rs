//! Hilbert transform and instantaneous phase
//!
//! The analytic signal is built in the frequency domain: positive bins are
//! doubled (DC and Nyquist pass through), negative bins are zeroed, and the
//! inverse transform yields the complex trajectory whose angle is the
//! instantaneous phase. Micro-variability statistics downstream need the
//! phase trajectory to be continuous sample-to-sample, which this
//! construction guarantees for band-limited input.

use crate::next_pow2;
use num_complex::Complex;
use rustfft::FftPlanner;

/// Instantaneous phase of the analytic signal of `x`, in radians.
///
/// Output has the same length as the input. A single sample yields phase 0.
pub fn analytic_phase(x: &[f64]) -> Vec<f64> {
    let n = x.len();
    if n == 0 {
        return Vec::new();
    }
    if n < 4 {
        return vec![0.0; n];
    }

    let nfft = next_pow2(n);
    let mut buf: Vec<Complex<f64>> = x.iter().map(|&v| Complex::new(v, 0.0)).collect();
    buf.resize(nfft, Complex::new(0.0, 0.0));

    let mut planner = FftPlanner::new();
    planner.plan_fft_forward(nfft).process(&mut buf);

    // Analytic-signal weighting: DC and Nyquist untouched, positive bins
    // doubled, negative bins zeroed.
    for bin in buf.iter_mut().take(nfft / 2).skip(1) {
        *bin = bin.scale(2.0);
    }
    for bin in buf.iter_mut().skip(nfft / 2 + 1) {
        *bin = Complex::new(0.0, 0.0);
    }

    planner.plan_fft_inverse(nfft).process(&mut buf);

    let scale = 1.0 / nfft as f64;
    buf.iter()
        .take(n)
        .map(|c| (c.im * scale).atan2(c.re * scale))
        .collect()
}
