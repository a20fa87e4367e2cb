//! Easing curves
//!
//! All interpolation the player does goes through [`ease`]. The breath
//! curve is the one two-phase special: 40 % inhale on an ease-in-out sine,
//! 60 % exhale on a quadratic ease-out, returning to the starting level
//! within a single step.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Interpolation shape for one pattern step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EaseCurve {
    Linear,
    EaseInSine,
    EaseOutSine,
    EaseInOutSine,
    EaseInQuad,
    EaseOutQuad,
    /// 40 % inhale (ease-in-out sine) then 60 % exhale (quadratic ease-out)
    Breath,
}

/// Interpolate from `from` to `to` at progress `t ∈ [0, 1]`.
pub fn ease(from: f32, to: f32, curve: EaseCurve, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    let shape = match curve {
        EaseCurve::Linear => t,
        EaseCurve::EaseInSine => 1.0 - (t * PI / 2.0).cos(),
        EaseCurve::EaseOutSine => (t * PI / 2.0).sin(),
        EaseCurve::EaseInOutSine => -((PI * t).cos() - 1.0) / 2.0,
        EaseCurve::EaseInQuad => t * t,
        EaseCurve::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
        EaseCurve::Breath => {
            if t < 0.4 {
                let inhale = t / 0.4;
                -((PI * inhale).cos() - 1.0) / 2.0
            } else {
                let exhale = (t - 0.4) / 0.6;
                1.0 - (1.0 - (1.0 - exhale) * (1.0 - exhale))
            }
        }
    };
    from + (to - from) * shape
}
