//! Hanning window

/// Apply a Hanning window: `y[n] = x[n] · 0.5·(1 − cos(2πn/(N−1)))`.
pub fn hanning(x: &[f64]) -> Vec<f64> {
    let n = x.len();
    if n < 2 {
        return x.to_vec();
    }
    let denom = (n - 1) as f64;
    x.iter()
        .enumerate()
        .map(|(i, &v)| v * 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / denom).cos()))
        .collect()
}
