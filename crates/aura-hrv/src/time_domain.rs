//! Time-domain HRV metrics

use crate::types::TimeDomainMetrics;

/// Compute the classical time-domain metrics over a cleaned RR window.
///
/// Returns `None` for fewer than two samples (no successive differences).
pub fn time_domain_metrics(rr_ms: &[f64]) -> Option<TimeDomainMetrics> {
    let n = rr_ms.len();
    if n < 2 {
        return None;
    }

    let mean = rr_ms.iter().sum::<f64>() / n as f64;
    let sdnn = (rr_ms.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1) as f64).sqrt();

    let mut sum_sq_diff = 0.0;
    let mut nn50 = 0u32;
    for pair in rr_ms.windows(2) {
        let diff = pair[1] - pair[0];
        sum_sq_diff += diff * diff;
        if diff.abs() > 50.0 {
            nn50 += 1;
        }
    }
    let rmssd = (sum_sq_diff / (n - 1) as f64).sqrt();
    let pnn50 = 100.0 * nn50 as f64 / (n - 1) as f64;

    Some(TimeDomainMetrics {
        mean_rr_ms: mean,
        sdnn,
        rmssd,
        nn50,
        pnn50,
        hr_bpm: 60_000.0 / mean,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_series() {
        let m = time_domain_metrics(&[800.0; 30]).unwrap();
        assert!((m.mean_rr_ms - 800.0).abs() < 1e-9);
        assert!(m.sdnn.abs() < 1e-9);
        assert!(m.rmssd.abs() < 1e-9);
        assert_eq!(m.nn50, 0);
        assert!((m.hr_bpm - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_alternating_series_rmssd() {
        // 700, 800, 700, 800 ... successive differences all ±100
        let rr: Vec<f64> = (0..20)
            .map(|i| if i % 2 == 0 { 700.0 } else { 800.0 })
            .collect();
        let m = time_domain_metrics(&rr).unwrap();
        assert!((m.rmssd - 100.0).abs() < 1e-9);
        assert_eq!(m.nn50, 19);
        assert!((m.pnn50 - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_requires_two_samples() {
        assert!(time_domain_metrics(&[]).is_none());
        assert!(time_domain_metrics(&[800.0]).is_none());
        assert!(time_domain_metrics(&[800.0, 820.0]).is_some());
    }
}
