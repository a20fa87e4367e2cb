//! Prescription generators
//!
//! Raw per-window suggestions from `(load, coherence, confidence)`; the
//! profile store scales and clamps them per user, and per-modality enable
//! flags are honored by the orchestrator before they land in a snapshot.

use aura_common::{ThermalPrescription, VibrationPrescription};

/// Below this confidence no prescription is generated at all.
const PRESCRIPTION_CONFIDENCE_MIN: f64 = 0.60;

/// Suggest warmth when coherence sags.
///
/// Intensity and duration grow with the coherence deficit below 0.5.
pub fn thermal_prescription(
    load_score: u8,
    coherence: f64,
    confidence: f64,
) -> Option<ThermalPrescription> {
    if confidence < PRESCRIPTION_CONFIDENCE_MIN {
        return None;
    }
    if coherence >= 0.5 && load_score <= 70 {
        return None;
    }
    let deficit = ((0.5 - coherence) / 0.5).clamp(0.0, 1.0);
    Some(ThermalPrescription {
        intensity_pct: (30.0 + 30.0 * deficit) as f32,
        duration_s: (20.0 + 20.0 * deficit) as u32,
    })
}

/// Suggest a vibration nudge when load runs high.
pub fn vibration_prescription(
    load_score: u8,
    _coherence: f64,
    confidence: f64,
) -> Option<VibrationPrescription> {
    if confidence < PRESCRIPTION_CONFIDENCE_MIN {
        return None;
    }
    if load_score <= 60 {
        return None;
    }
    let severe = load_score > 80;
    Some(VibrationPrescription {
        pattern_id: if severe { 2 } else { 1 },
        intensity_pct: if severe { 40.0 } else { 25.0 },
    })
}
