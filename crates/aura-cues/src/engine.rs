//! The cue decision cascade

use crate::types::{Cue, CuePriority, CueType, SensitivityTable};
use aura_profile::Preferences;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info};

/// Rolling-hour cue budget.
pub const MAX_CUES_PER_HOUR: u32 = 12;

/// Length of one rate-limit bucket (ms).
pub const HOUR_MS: u64 = 3_600_000;

/// Confidence (0–100) below which snapshots are not acted on.
pub const CONFIDENCE_GATE_PCT: u8 = 60;

/// Low-confidence streak that triggers a fit check.
pub const CHECK_FIT_STREAK: u32 = 3;

/// Artifact rate above which the window is too dirty to act on.
pub const ARTIFACT_GATE: f32 = 0.25;

/// Coherence history ring length.
const COHERENCE_RING_LEN: usize = 8;

// Per-type cooldowns (ms)
pub const ALERT_COOLDOWN_MS: u64 = 600_000;
pub const COMBINED_COOLDOWN_MS: u64 = 180_000;
pub const BREATHING_COOLDOWN_MS: u64 = 180_000;
pub const VIBRATION_COOLDOWN_MS: u64 = 30_000;
pub const THERMAL_COOLDOWN_MS: u64 = 120_000;
pub const PREVENTIVE_COOLDOWN_MS: u64 = 180_000;

/// Fit-check spacing: twice the vibration cooldown.
pub const CHECK_FIT_COOLDOWN_MS: u64 = 2 * VIBRATION_COOLDOWN_MS;

/// Everything one decision needs, pre-scaled to the engine's integer
/// domains. The hour is injected so the engine never touches a wall clock.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CueContext {
    /// Autonomic load, 0–100
    pub stress_pct: u8,
    /// Coherence, 0–100
    pub coherence_pct: u8,
    /// Analysis confidence, 0–100
    pub confidence_pct: u8,
    /// Micro-variability × 10000
    pub micro_var_scaled: u32,
    /// Window artifact rate, 0–1
    pub artifact_rate: f32,
    /// Local hour of day, 0–23
    pub hour: u8,
    /// Monotonic time
    pub now_ms: u64,
}

/// Stability threshold for the breathing-guide clause (0–100).
pub const STABILITY_BREATHING_PCT: f64 = 40.0;

/// Why no cue was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressReason {
    Disabled,
    QuietHours,
    RateLimited,
    LowConfidence,
    HighArtifact,
    CoolingDown,
}

/// Outcome of one cascade walk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CueDecision {
    /// A cue should be delivered
    Emit(Cue),
    /// A trigger matched but a gate held it back
    Suppressed(SuppressReason),
    /// Nothing to do
    Idle,
}

impl CueDecision {
    pub fn cue(&self) -> Option<&Cue> {
        match self {
            CueDecision::Emit(cue) => Some(cue),
            _ => None,
        }
    }
}

/// Single-owner cue decision engine.
pub struct CueEngine {
    last_cue_ms: Option<u64>,
    last_cue_type: Option<CueType>,
    last_cue_cooldown_ms: u64,
    consecutive_low_confidence: u32,
    last_check_fit_ms: Option<u64>,
    hour_start_ms: u64,
    cues_this_hour: u32,
    coherence_ring: VecDeque<u8>,
    suppressed_total: u64,
}

impl CueEngine {
    pub fn new() -> Self {
        Self {
            last_cue_ms: None,
            last_cue_type: None,
            last_cue_cooldown_ms: 0,
            consecutive_low_confidence: 0,
            last_check_fit_ms: None,
            hour_start_ms: 0,
            cues_this_hour: 0,
            coherence_ring: VecDeque::with_capacity(COHERENCE_RING_LEN),
            suppressed_total: 0,
        }
    }

    /// Clear all history: the next eligible cue bypasses every cooldown.
    pub fn reset(&mut self) {
        *self = Self::new();
        info!("cue engine reset");
    }

    /// Total decisions suppressed by any gate since construction.
    pub fn suppressed_total(&self) -> u64 {
        self.suppressed_total
    }

    /// Walk the cascade for one snapshot. First clause that fires wins.
    pub fn decide(&mut self, ctx: &CueContext, preferences: &Preferences) -> CueDecision {
        // 1. Master switch
        if !preferences.cues_enabled {
            return self.suppress(SuppressReason::Disabled);
        }

        // 2. Quiet hours (overnight wrap supported; start == end disables)
        if let Some(window) = preferences.quiet_hours {
            if window.contains(ctx.hour) {
                return self.suppress(SuppressReason::QuietHours);
            }
        }

        // 3. Rolling-hour rate limit
        if ctx.now_ms.saturating_sub(self.hour_start_ms) >= HOUR_MS {
            self.hour_start_ms = ctx.now_ms;
            self.cues_this_hour = 0;
        }
        if self.cues_this_hour >= MAX_CUES_PER_HOUR {
            return self.suppress(SuppressReason::RateLimited);
        }

        // 4. History update
        self.coherence_ring.push_back(ctx.coherence_pct);
        while self.coherence_ring.len() > COHERENCE_RING_LEN {
            self.coherence_ring.pop_front();
        }

        // 5. Confidence gate with fit-check escape hatch
        if ctx.confidence_pct < CONFIDENCE_GATE_PCT {
            self.consecutive_low_confidence += 1;
            let fit_check_due = self
                .last_check_fit_ms
                .map_or(true, |last| ctx.now_ms.saturating_sub(last) >= CHECK_FIT_COOLDOWN_MS);
            if self.consecutive_low_confidence >= CHECK_FIT_STREAK
                && preferences.vibration_enabled
                && fit_check_due
            {
                self.last_check_fit_ms = Some(ctx.now_ms);
                let cue = Cue {
                    cue_type: CueType::CheckFit,
                    priority: CuePriority::Low,
                    thermal_intensity_pct: 0,
                    thermal_duration_s: 0,
                    vibration_pattern_id: 3, // three soft taps
                    vibration_intensity_pct: 20,
                    cooldown_ms: CHECK_FIT_COOLDOWN_MS,
                };
                return self.emit(ctx.now_ms, cue);
            }
            return self.suppress(SuppressReason::LowConfidence);
        }
        self.consecutive_low_confidence = 0;

        // 6. Artifact gate
        if ctx.artifact_rate > ARTIFACT_GATE {
            return self.suppress(SuppressReason::HighArtifact);
        }

        let table = SensitivityTable::for_sensitivity(preferences.sensitivity);

        // 7. Alert: acute load or severe disorganization
        if ctx.stress_pct > 90 || ctx.micro_var_scaled > 1200 {
            let cue = Cue {
                cue_type: CueType::Alert,
                priority: CuePriority::Alert,
                thermal_intensity_pct: table.thermal_for_deficit(1.0),
                thermal_duration_s: table.duration_s(10.0),
                vibration_pattern_id: 6,
                vibration_intensity_pct: table.vibration_for_deficit(1.0),
                cooldown_ms: ALERT_COOLDOWN_MS,
            };
            return self.gated_emit(ctx.now_ms, cue);
        }

        // 8. Combined: low coherence together with disorganized rhythm
        if ctx.coherence_pct < 30 && ctx.micro_var_scaled > 500 {
            let deficit = (30 - ctx.coherence_pct) as f64 / 30.0;
            let cue = Cue {
                cue_type: CueType::Combined,
                priority: CuePriority::High,
                thermal_intensity_pct: table.thermal_for_deficit(deficit),
                thermal_duration_s: table.duration_s(20.0 + 20.0 * deficit),
                vibration_pattern_id: 4, // heartbeat
                vibration_intensity_pct: table.vibration_for_deficit(deficit),
                cooldown_ms: COMBINED_COOLDOWN_MS,
            };
            return self.gated_emit(ctx.now_ms, cue);
        }

        // 9. Breathing guide for persistently unstable coherence
        if self.ring_stability_pct() < STABILITY_BREATHING_PCT
            && preferences.breathing_enabled
            && preferences.vibration_enabled
        {
            let cue = Cue {
                cue_type: CueType::Breathing,
                priority: CuePriority::Normal,
                thermal_intensity_pct: 0,
                thermal_duration_s: 0,
                vibration_pattern_id: 5, // breathing guide
                vibration_intensity_pct: table.vibration_for_deficit(0.3),
                cooldown_ms: BREATHING_COOLDOWN_MS,
            };
            return self.gated_emit(ctx.now_ms, cue);
        }

        // 10. Vibration nudge on elevated micro-variability
        if ctx.micro_var_scaled > 500 && preferences.vibration_enabled {
            let severe = ctx.micro_var_scaled > 800;
            let cue = Cue {
                cue_type: CueType::Vibration,
                priority: CuePriority::Normal,
                thermal_intensity_pct: 0,
                thermal_duration_s: 0,
                vibration_pattern_id: if severe { 2 } else { 1 },
                vibration_intensity_pct: table.vibration_for_deficit(if severe { 0.6 } else { 0.3 }),
                cooldown_ms: VIBRATION_COOLDOWN_MS,
            };
            return self.gated_emit(ctx.now_ms, cue);
        }

        // 11. Thermal support for low coherence
        if ctx.coherence_pct < 50 && preferences.thermal_enabled {
            let deficit = (50 - ctx.coherence_pct) as f64 / 50.0;
            let cue = Cue {
                cue_type: CueType::Thermal,
                priority: CuePriority::Normal,
                thermal_intensity_pct: table.thermal_for_deficit(deficit),
                thermal_duration_s: table.duration_s(20.0 + 20.0 * deficit),
                vibration_pattern_id: 0,
                vibration_intensity_pct: 0,
                cooldown_ms: THERMAL_COOLDOWN_MS,
            };
            return self.gated_emit(ctx.now_ms, cue);
        }

        // 12. Preventive warmth on a deteriorating coherence trend
        if self.coherence_trend_deteriorating() && preferences.thermal_enabled {
            let cue = Cue {
                cue_type: CueType::Thermal,
                priority: CuePriority::Low,
                thermal_intensity_pct: table.thermal_for_deficit(0.0),
                thermal_duration_s: table.duration_s(15.0),
                vibration_pattern_id: 0,
                vibration_intensity_pct: 0,
                cooldown_ms: PREVENTIVE_COOLDOWN_MS,
            };
            return self.gated_emit(ctx.now_ms, cue);
        }

        CueDecision::Idle
    }

    /// Rhythm stability: the rolling mean of the coherence ring (0–100).
    /// Smoother than the instantaneous coherence, so one clean window does
    /// not mask a persistently disorganized stretch.
    fn ring_stability_pct(&self) -> f64 {
        if self.coherence_ring.is_empty() {
            return 100.0;
        }
        self.coherence_ring.iter().map(|&c| c as f64).sum::<f64>() / self.coherence_ring.len() as f64
    }

    /// First vs. second half of the coherence ring: a drop of more than
    /// 10 % counts as deteriorating. Needs a full ring.
    fn coherence_trend_deteriorating(&self) -> bool {
        if self.coherence_ring.len() < COHERENCE_RING_LEN {
            return false;
        }
        let half = COHERENCE_RING_LEN / 2;
        let older: f64 = self.coherence_ring.iter().take(half).map(|&c| c as f64).sum::<f64>()
            / half as f64;
        let newer: f64 = self.coherence_ring.iter().skip(half).map(|&c| c as f64).sum::<f64>()
            / half as f64;
        older > 0.0 && newer < older * 0.90
    }

    /// Emit unless the previous cue's cooldown still applies.
    ///
    /// Same-type successors (and anything following a combined cue) wait
    /// the full cooldown; cross-type successors wait half of it.
    fn gated_emit(&mut self, now_ms: u64, cue: Cue) -> CueDecision {
        if let (Some(last_ms), Some(last_type)) = (self.last_cue_ms, self.last_cue_type) {
            let required = if last_type == cue.cue_type || last_type == CueType::Combined {
                self.last_cue_cooldown_ms
            } else {
                self.last_cue_cooldown_ms / 2
            };
            if now_ms.saturating_sub(last_ms) < required {
                debug!(
                    elapsed = now_ms.saturating_sub(last_ms),
                    required,
                    cue_type = ?cue.cue_type,
                    "cue held back by cooldown"
                );
                return self.suppress(SuppressReason::CoolingDown);
            }
        }
        self.emit(now_ms, cue)
    }

    fn emit(&mut self, now_ms: u64, cue: Cue) -> CueDecision {
        self.last_cue_ms = Some(now_ms);
        self.last_cue_type = Some(cue.cue_type);
        self.last_cue_cooldown_ms = cue.cooldown_ms;
        self.cues_this_hour += 1;
        info!(
            cue_type = ?cue.cue_type,
            priority = ?cue.priority,
            this_hour = self.cues_this_hour,
            "cue emitted"
        );
        CueDecision::Emit(cue)
    }

    fn suppress(&mut self, reason: SuppressReason) -> CueDecision {
        self.suppressed_total += 1;
        debug!(?reason, "cue suppressed");
        CueDecision::Suppressed(reason)
    }
}

impl Default for CueEngine {
    fn default() -> Self {
        Self::new()
    }
}
