//! Aura Cues – turning snapshots into interventions
//!
//! The decision engine walks a fixed priority cascade over each analysis
//! snapshot: safety gates first (master switch, quiet hours, rate limit,
//! confidence, artifacts), then intervention triggers from most to least
//! urgent. The first clause that fires wins. Suppressions are structured
//! results, never errors, so callers can count and log them.

mod engine;
mod types;

pub use engine::{CueContext, CueDecision, CueEngine, SuppressReason};
pub use types::{Cue, CuePriority, CueType, SensitivityTable};
