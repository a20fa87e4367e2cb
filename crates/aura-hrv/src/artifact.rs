//! Three-stage artifact corrector
//!
//! Kubios-style cleaning of a raw RR window:
//!
//! 1. **Physiological filter** – drop everything outside [300, 2000] ms
//! 2. **Median filter** – 5-sample centered median, truncated at the edges
//! 3. **Threshold correction** – replace samples deviating from their local
//!    median by more than 20 % with that median
//!
//! The corrector itself never refuses a window; the orchestrator applies
//! the 60 % clean-fraction gate on the report.

use tracing::debug;

/// Lower physiological bound for an RR interval (ms).
pub const RR_MIN_MS: f64 = 300.0;

/// Upper physiological bound for an RR interval (ms).
pub const RR_MAX_MS: f64 = 2000.0;

/// Relative deviation from the local median that marks an artifact.
pub const MEDIAN_DEVIATION_MAX: f64 = 0.20;

/// Windows whose cleaned length falls below this fraction of the input are
/// refused downstream.
pub const MIN_CLEAN_FRACTION: f64 = 0.60;

/// Result of one correction pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrectionReport {
    /// Samples surviving all three stages, corrections applied
    pub cleaned: Vec<f64>,

    /// Originals replaced in stage 3
    pub artifacts: Vec<f64>,

    /// The medians substituted for each entry of `artifacts`, same order
    pub corrections: Vec<f64>,

    /// Stage-1 drops (outside the physiological window)
    pub out_of_bounds: Vec<f64>,
}

impl CorrectionReport {
    /// Fraction of input samples that survived cleaning.
    pub fn clean_fraction(&self, input_len: usize) -> f64 {
        if input_len == 0 {
            return 0.0;
        }
        self.cleaned.len() as f64 / input_len as f64
    }

    /// True when the window is usable for full analysis.
    pub fn is_acceptable(&self, input_len: usize) -> bool {
        self.clean_fraction(input_len) >= MIN_CLEAN_FRACTION
    }
}

/// Run the three correction stages over a raw RR window.
pub fn correct_artifacts(rr_ms: &[f64]) -> CorrectionReport {
    let mut report = CorrectionReport::default();

    // Stage 1: physiological bounds
    let mut in_bounds = Vec::with_capacity(rr_ms.len());
    for &rr in rr_ms {
        if (RR_MIN_MS..=RR_MAX_MS).contains(&rr) {
            in_bounds.push(rr);
        } else {
            report.out_of_bounds.push(rr);
        }
    }

    if in_bounds.is_empty() {
        return report;
    }

    // Stage 2: centered 5-sample medians
    let medians = rolling_median5(&in_bounds);

    // Stage 3: threshold correction against the local median
    report.cleaned = Vec::with_capacity(in_bounds.len());
    for (&x, &median) in in_bounds.iter().zip(medians.iter()) {
        if (x - median).abs() / median > MEDIAN_DEVIATION_MAX {
            report.artifacts.push(x);
            report.corrections.push(median);
            report.cleaned.push(median);
        } else {
            report.cleaned.push(x);
        }
    }

    if !report.artifacts.is_empty() || !report.out_of_bounds.is_empty() {
        debug!(
            dropped = report.out_of_bounds.len(),
            corrected = report.artifacts.len(),
            window = rr_ms.len(),
            "artifact correction applied"
        );
    }
    report
}

/// Median of a 5-sample window centered on each index, truncated at edges.
fn rolling_median5(x: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let lo = i.saturating_sub(2);
        let hi = (i + 3).min(n);
        let mut window: Vec<f64> = x[lo..hi].to_vec();
        window.sort_by(|a, b| a.total_cmp(b));
        let mid = window.len() / 2;
        let median = if window.len() % 2 == 1 {
            window[mid]
        } else {
            (window[mid - 1] + window[mid]) / 2.0
        };
        out.push(median);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_series_passes_untouched() {
        let rr: Vec<f64> = (0..40).map(|i| 800.0 + (i % 5) as f64 * 10.0).collect();
        let report = correct_artifacts(&rr);
        assert_eq!(report.cleaned, rr);
        assert!(report.artifacts.is_empty());
        assert!(report.out_of_bounds.is_empty());
    }

    #[test]
    fn test_out_of_bounds_dropped() {
        let rr = vec![800.0, 250.0, 810.0, 2500.0, 820.0];
        let report = correct_artifacts(&rr);
        assert_eq!(report.out_of_bounds, vec![250.0, 2500.0]);
        assert_eq!(report.cleaned.len(), 3);
    }

    #[test]
    fn test_spike_replaced_by_median() {
        let mut rr = vec![800.0; 20];
        rr[10] = 1100.0; // 37% above the local median
        let report = correct_artifacts(&rr);
        assert_eq!(report.artifacts, vec![1100.0]);
        assert_eq!(report.corrections, vec![800.0]);
        assert_eq!(report.cleaned[10], 800.0);
    }

    #[test]
    fn test_threshold_property_holds_for_every_corrected_sample() {
        let rr: Vec<f64> = (0..60)
            .map(|i| {
                if i % 13 == 0 {
                    1400.0
                } else {
                    820.0 + (i % 7) as f64 * 6.0
                }
            })
            .collect();
        let report = correct_artifacts(&rr);
        assert!(!report.artifacts.is_empty());
        assert_eq!(report.artifacts.len(), report.corrections.len());
        for (orig, med) in report.artifacts.iter().zip(report.corrections.iter()) {
            assert!((orig - med).abs() / med > MEDIAN_DEVIATION_MAX);
        }
    }

    #[test]
    fn test_edge_windows_are_truncated() {
        // 3 samples: every median window is shorter than 5
        let rr = vec![800.0, 805.0, 810.0];
        let report = correct_artifacts(&rr);
        assert_eq!(report.cleaned.len(), 3);
    }

    #[test]
    fn test_acceptability_gate() {
        let report = correct_artifacts(&[800.0, 100.0, 100.0, 100.0, 810.0]);
        assert!(report.clean_fraction(5) < MIN_CLEAN_FRACTION);
        assert!(!report.is_acceptable(5));

        let report = correct_artifacts(&[800.0; 10]);
        assert!(report.is_acceptable(10));
    }
}
