//! The fixed signature pattern table
//!
//! Ten patterns, each a finite step sequence. Targets are nominal
//! percentages before the player applies its intensity scale and the
//! per-modality safety caps. Only the breathing guide loops.

use crate::ease::EaseCurve;
use aura_common::Modality;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One segment of a signature pattern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub duration_ms: u32,
    pub target_intensity_pct: f32,
    pub curve: EaseCurve,
    pub modality: Modality,
}

const fn step(duration_ms: u32, target: f32, curve: EaseCurve, modality: Modality) -> Step {
    Step {
        duration_ms,
        target_intensity_pct: target,
        curve,
        modality,
    }
}

/// The ten signature patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignaturePatternId {
    GroundingPulse,
    AttentionTap,
    PresenceCheck,
    Heartbeat,
    BreathingGuide,
    WarmExhale,
    GroundingWarmth,
    SafetyEmbrace,
    GentleAlert,
    FullReset,
}

use EaseCurve::*;
use Modality::{Thermal, Vibration};

/// Two slow, grounding vibration pulses.
const GROUNDING_PULSE: &[Step] = &[
    step(600, 45.0, EaseInOutSine, Vibration),
    step(500, 10.0, EaseOutSine, Vibration),
    step(600, 45.0, EaseInOutSine, Vibration),
    step(700, 0.0, EaseOutSine, Vibration),
];

/// One crisp tap.
const ATTENTION_TAP: &[Step] = &[
    step(80, 60.0, EaseOutQuad, Vibration),
    step(140, 0.0, EaseOutSine, Vibration),
];

/// Three soft taps, the fit-check signature.
const PRESENCE_CHECK: &[Step] = &[
    step(100, 30.0, EaseOutQuad, Vibration),
    step(130, 0.0, Linear, Vibration),
    step(100, 30.0, EaseOutQuad, Vibration),
    step(130, 0.0, Linear, Vibration),
    step(100, 30.0, EaseOutQuad, Vibration),
    step(200, 0.0, EaseOutSine, Vibration),
];

/// Lub-dub, twice.
const HEARTBEAT: &[Step] = &[
    step(120, 55.0, EaseInQuad, Vibration),
    step(100, 15.0, EaseOutQuad, Vibration),
    step(120, 62.0, EaseInQuad, Vibration),
    step(350, 0.0, EaseOutSine, Vibration),
    step(120, 55.0, EaseInQuad, Vibration),
    step(100, 15.0, EaseOutQuad, Vibration),
    step(120, 62.0, EaseInQuad, Vibration),
    step(400, 0.0, EaseOutSine, Vibration),
];

/// One full breath cycle; the only looping pattern.
const BREATHING_GUIDE: &[Step] = &[step(10_000, 55.0, Breath, Vibration)];

/// Warmth that blooms and slowly releases.
const WARM_EXHALE: &[Step] = &[
    step(1_500, 55.0, EaseInSine, Thermal),
    step(3_500, 15.0, EaseOutQuad, Thermal),
    step(1_000, 0.0, EaseOutSine, Thermal),
];

/// Sustained plateau of warmth.
const GROUNDING_WARMTH: &[Step] = &[
    step(2_000, 50.0, EaseInOutSine, Thermal),
    step(6_000, 50.0, Linear, Thermal),
    step(1_500, 0.0, EaseOutSine, Thermal),
];

/// Warmth with a soft pulse folded in.
const SAFETY_EMBRACE: &[Step] = &[
    step(1_200, 45.0, EaseInSine, Thermal),
    step(150, 35.0, EaseOutQuad, Vibration),
    step(250, 0.0, EaseOutSine, Vibration),
    step(4_000, 45.0, Linear, Thermal),
    step(1_200, 0.0, EaseOutSine, Thermal),
];

/// Escalating taps that stay polite.
const GENTLE_ALERT: &[Step] = &[
    step(100, 48.0, EaseOutQuad, Vibration),
    step(100, 0.0, Linear, Vibration),
    step(100, 56.0, EaseOutQuad, Vibration),
    step(100, 0.0, Linear, Vibration),
    step(150, 64.0, EaseOutQuad, Vibration),
    step(300, 0.0, EaseOutSine, Vibration),
];

/// The long wind-down: warmth bracketing two soft pulses.
const FULL_RESET: &[Step] = &[
    step(1_000, 40.0, EaseInSine, Thermal),
    step(150, 40.0, EaseOutQuad, Vibration),
    step(250, 0.0, EaseOutSine, Vibration),
    step(5_000, 55.0, EaseInOutSine, Thermal),
    step(150, 40.0, EaseOutQuad, Vibration),
    step(250, 0.0, EaseOutSine, Vibration),
    step(2_000, 0.0, EaseOutSine, Thermal),
];

impl SignaturePatternId {
    pub const ALL: [SignaturePatternId; 10] = [
        SignaturePatternId::GroundingPulse,
        SignaturePatternId::AttentionTap,
        SignaturePatternId::PresenceCheck,
        SignaturePatternId::Heartbeat,
        SignaturePatternId::BreathingGuide,
        SignaturePatternId::WarmExhale,
        SignaturePatternId::GroundingWarmth,
        SignaturePatternId::SafetyEmbrace,
        SignaturePatternId::GentleAlert,
        SignaturePatternId::FullReset,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SignaturePatternId::GroundingPulse => "grounding_pulse",
            SignaturePatternId::AttentionTap => "attention_tap",
            SignaturePatternId::PresenceCheck => "presence_check",
            SignaturePatternId::Heartbeat => "heartbeat",
            SignaturePatternId::BreathingGuide => "breathing_guide",
            SignaturePatternId::WarmExhale => "warm_exhale",
            SignaturePatternId::GroundingWarmth => "grounding_warmth",
            SignaturePatternId::SafetyEmbrace => "safety_embrace",
            SignaturePatternId::GentleAlert => "gentle_alert",
            SignaturePatternId::FullReset => "full_reset",
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        static BY_NAME: Lazy<HashMap<&'static str, SignaturePatternId>> = Lazy::new(|| {
            SignaturePatternId::ALL
                .iter()
                .map(|id| (id.name(), *id))
                .collect()
        });
        BY_NAME.get(name).copied()
    }

    /// The step sequence; the end of the slice is the pattern's sentinel.
    pub fn steps(&self) -> &'static [Step] {
        match self {
            SignaturePatternId::GroundingPulse => GROUNDING_PULSE,
            SignaturePatternId::AttentionTap => ATTENTION_TAP,
            SignaturePatternId::PresenceCheck => PRESENCE_CHECK,
            SignaturePatternId::Heartbeat => HEARTBEAT,
            SignaturePatternId::BreathingGuide => BREATHING_GUIDE,
            SignaturePatternId::WarmExhale => WARM_EXHALE,
            SignaturePatternId::GroundingWarmth => GROUNDING_WARMTH,
            SignaturePatternId::SafetyEmbrace => SAFETY_EMBRACE,
            SignaturePatternId::GentleAlert => GENTLE_ALERT,
            SignaturePatternId::FullReset => FULL_RESET,
        }
    }

    /// Only the breathing guide repeats until stopped.
    pub fn is_looping(&self) -> bool {
        matches!(self, SignaturePatternId::BreathingGuide)
    }

    /// Map a wire vibration-pattern id (0 off, 1 single, 2 double,
    /// 3 triple, 4 heartbeat, 5 breathing, 6 alert) onto the table.
    pub fn from_wire(id: u8) -> Option<Self> {
        match id {
            1 => Some(SignaturePatternId::AttentionTap),
            2 => Some(SignaturePatternId::GroundingPulse),
            3 => Some(SignaturePatternId::PresenceCheck),
            4 => Some(SignaturePatternId::Heartbeat),
            5 => Some(SignaturePatternId::BreathingGuide),
            6 => Some(SignaturePatternId::GentleAlert),
            _ => None,
        }
    }
}
