//! Aura HRV – heart-rate-variability analysis for the wellness core
//!
//! Takes a window of RR intervals (milliseconds between successive beats)
//! and produces the metrics the cue engine runs on:
//!
//! - **Artifact correction**: three-stage Kubios-style cleaning
//! - **Time domain**: SDNN, RMSSD, NN50/pNN50, heart rate
//! - **Frequency domain**: Welch-like band periodogram with LF/HF bands
//!   adapted to the detected respiratory rate
//! - **Nonlinear**: phase micro-variability and sample entropy
//! - **Classification**: composite stress scoring with drift compensation,
//!   confidence weighting and trend detection

pub mod artifact;
pub mod classify;
pub mod frequency;
pub mod time_domain;
pub mod types;

pub use artifact::{correct_artifacts, CorrectionReport, MIN_CLEAN_FRACTION};
pub use classify::{
    apply_drift_compensation, coherence, micro_variability, trend_from_history,
    ClassificationOutcome, StressClassifier,
};
pub use frequency::{FrequencyAnalyzer, FrequencyConfig};
pub use time_domain::time_domain_metrics;
pub use types::*;
