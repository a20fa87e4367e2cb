//! Natural cubic-spline resampling of the RR tachogram
//!
//! RR intervals are an irregularly sampled series: each beat arrives at the
//! cumulative sum of the intervals before it. Spectral analysis needs a
//! uniform time base, so the tachogram is interpolated with a natural cubic
//! spline and sampled at a fixed rate.

/// Resample an RR series (milliseconds) onto a uniform `fs_hz` grid.
///
/// The beat-time axis is the cumulative RR sum in seconds; interval values
/// are emitted in seconds as well, so downstream band powers convert to ms²
/// with a single 1e6 factor. Output covers the span between the first and
/// last beat. Returns an empty vector for fewer than two beats.
pub fn resample_uniform(rr_ms: &[f64], fs_hz: f64) -> Vec<f64> {
    let n = rr_ms.len();
    if n < 2 || fs_hz <= 0.0 {
        return Vec::new();
    }

    // Beat-time axis (s) and interval values (s)
    let mut t = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    let mut acc = 0.0;
    for &rr in rr_ms {
        acc += rr / 1000.0;
        t.push(acc);
        y.push(rr / 1000.0);
    }

    let coeffs = natural_spline(&t, &y);

    let step = 1.0 / fs_hz;
    let t_start = t[0];
    let t_end = t[n - 1];
    let count = ((t_end - t_start) / step).floor() as usize + 1;

    let mut out = Vec::with_capacity(count);
    let mut seg = 0usize;
    for i in 0..count {
        let x = t_start + i as f64 * step;
        while seg + 1 < n - 1 && x > t[seg + 1] {
            seg += 1;
        }
        let dx = x - t[seg];
        let SplineCoeffs { a, b, c, d } = coeffs[seg];
        out.push(a + b * dx + c * dx * dx + d * dx * dx * dx);
    }
    out
}

#[derive(Clone, Copy)]
struct SplineCoeffs {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
}

/// Solve the natural-spline tridiagonal system (`l`, `mu`, `z`, then `b`,
/// `c`, `d` by back-substitution; endpoint curvature `c[0] = c[n-1] = 0`).
fn natural_spline(t: &[f64], y: &[f64]) -> Vec<SplineCoeffs> {
    let n = t.len();
    if n == 2 {
        // Two points degenerate to the connecting line
        let slope = (y[1] - y[0]) / (t[1] - t[0]);
        return vec![SplineCoeffs {
            a: y[0],
            b: slope,
            c: 0.0,
            d: 0.0,
        }];
    }

    let m = n - 1;
    let h: Vec<f64> = (0..m).map(|i| t[i + 1] - t[i]).collect();

    let mut alpha = vec![0.0; n];
    for i in 1..m {
        alpha[i] = 3.0 / h[i] * (y[i + 1] - y[i]) - 3.0 / h[i - 1] * (y[i] - y[i - 1]);
    }

    let mut l = vec![0.0; n];
    let mut mu = vec![0.0; n];
    let mut z = vec![0.0; n];
    l[0] = 1.0;
    for i in 1..m {
        l[i] = 2.0 * (t[i + 1] - t[i - 1]) - h[i - 1] * mu[i - 1];
        mu[i] = h[i] / l[i];
        z[i] = (alpha[i] - h[i - 1] * z[i - 1]) / l[i];
    }
    l[m] = 1.0;

    let mut c = vec![0.0; n];
    let mut b = vec![0.0; m];
    let mut d = vec![0.0; m];
    for j in (0..m).rev() {
        c[j] = z[j] - mu[j] * c[j + 1];
        b[j] = (y[j + 1] - y[j]) / h[j] - h[j] * (c[j + 1] + 2.0 * c[j]) / 3.0;
        d[j] = (c[j + 1] - c[j]) / (3.0 * h[j]);
    }

    (0..m)
        .map(|j| SplineCoeffs {
            a: y[j],
            b: b[j],
            c: c[j],
            d: d[j],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_constant_series_is_flat() {
        let rr = vec![800.0; 30];
        let out = resample_uniform(&rr, 4.0);
        assert!(!out.is_empty());
        for &v in &out {
            assert!((v - 0.8).abs() < 1e-9, "expected 0.8 s, got {v}");
        }
    }

    #[test]
    fn test_resample_interpolates_through_knots() {
        // Linearly increasing intervals: the spline must stay close to the
        // underlying trend between knots.
        let rr: Vec<f64> = (0..40).map(|i| 700.0 + i as f64 * 5.0).collect();
        let out = resample_uniform(&rr, 4.0);
        assert!(out.len() > 50);
        assert!(out.first().unwrap() - 0.700 < 0.02);
        assert!(out.iter().all(|v| *v > 0.6 && *v < 1.0));
    }

    #[test]
    fn test_resample_sample_count_matches_duration() {
        let rr = vec![1000.0; 11]; // 10 s span between first and last beat
        let out = resample_uniform(&rr, 4.0);
        assert_eq!(out.len(), 41); // inclusive endpoint at 4 Hz
    }

    #[test]
    fn test_resample_degenerate_input() {
        assert!(resample_uniform(&[], 4.0).is_empty());
        assert!(resample_uniform(&[800.0], 4.0).is_empty());
        let two = resample_uniform(&[800.0, 820.0], 4.0);
        assert!(!two.is_empty());
    }
}
