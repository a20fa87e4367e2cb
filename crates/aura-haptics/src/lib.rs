//! Aura Haptics – the ring's signature "feel"
//!
//! Every cue resolves to one of ten named patterns: fixed step sequences
//! with organic easing curves, played against the vibration and thermal
//! output ports. Patterns are data, the player is the only state machine,
//! and per-modality safety caps are enforced at the last write.

mod ease;
mod patterns;
mod player;

pub use ease::{ease, EaseCurve};
pub use patterns::{SignaturePatternId, Step};
pub use player::{PatternPlayer, RAMP_DOWN_MS, THERMAL_CAP_PCT, VIBRATION_CAP_PCT};
