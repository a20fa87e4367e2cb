//! The signature pattern player
//!
//! Single state machine driving both output ports. Externally ticked with
//! monotonic milliseconds; between ticks nothing moves. Writes are skipped
//! when the level has not changed, and every write is clamped by the
//! per-modality safety cap regardless of pattern data or intensity scale.

use crate::ease::{ease, EaseCurve};
use crate::patterns::SignaturePatternId;
use aura_common::{Modality, OutputPort};
use tracing::{debug, info};

/// Hard vibration ceiling (%), applied after intensity scaling.
pub const VIBRATION_CAP_PCT: f32 = 65.0;

/// Hard thermal ceiling (%), applied after intensity scaling.
pub const THERMAL_CAP_PCT: f32 = 70.0;

/// Graceful fade-out duration.
pub const RAMP_DOWN_MS: u32 = 600;

/// Writes closer than this to the last value are skipped.
const WRITE_EPSILON: f32 = 0.25;

#[derive(Debug, Clone, Copy)]
struct Playing {
    pattern: SignaturePatternId,
    step_index: usize,
    step_start_ms: u64,
    step_from_pct: f32,
}

#[derive(Debug, Clone, Copy)]
struct Fading {
    start_ms: u64,
    from_vib_pct: f32,
    from_thermal_pct: f32,
}

/// Step-sequenced pattern player over two output ports.
pub struct PatternPlayer {
    vib_port: Box<dyn OutputPort>,
    thermal_port: Box<dyn OutputPort>,
    playing: Option<Playing>,
    fading: Option<Fading>,
    /// Pattern amplitude, 0–100 % of nominal step targets
    intensity_scale: f32,
    last_vib_pct: f32,
    last_thermal_pct: f32,
}

impl PatternPlayer {
    pub fn new(vib_port: Box<dyn OutputPort>, thermal_port: Box<dyn OutputPort>) -> Self {
        Self {
            vib_port,
            thermal_port,
            playing: None,
            fading: None,
            intensity_scale: 100.0,
            last_vib_pct: 0.0,
            last_thermal_pct: 0.0,
        }
    }

    /// Begin a pattern at the given intensity scale (0–100).
    ///
    /// Replaces whatever was playing; the new pattern's first step eases
    /// from the current output level, so switchovers stay smooth.
    pub fn start(&mut self, pattern: SignaturePatternId, intensity_scale: f32, now_ms: u64) {
        self.intensity_scale = intensity_scale.clamp(0.0, 100.0);
        self.fading = None;
        let from = match pattern.steps()[0].modality {
            Modality::Vibration => self.last_vib_pct,
            Modality::Thermal => self.last_thermal_pct,
        };
        self.playing = Some(Playing {
            pattern,
            step_index: 0,
            step_start_ms: now_ms,
            step_from_pct: from,
        });
        info!(
            pattern = pattern.name(),
            scale = self.intensity_scale,
            "pattern started"
        );
    }

    /// Whether a pattern is playing or fading out.
    pub fn is_active(&self) -> bool {
        self.playing.is_some() || self.fading.is_some()
    }

    /// Last levels written, `(vibration, thermal)`.
    pub fn outputs(&self) -> (f32, f32) {
        (self.last_vib_pct, self.last_thermal_pct)
    }

    /// Begin a graceful fade to zero.
    pub fn stop(&mut self, now_ms: u64) {
        if self.playing.is_none() && self.fading.is_none() {
            return;
        }
        self.begin_fade(now_ms);
    }

    /// Zero both outputs and drop all state at once.
    pub fn stop_immediate(&mut self) {
        self.playing = None;
        self.fading = None;
        self.write(Modality::Vibration, 0.0);
        self.write(Modality::Thermal, 0.0);
        info!("pattern stopped immediately");
    }

    /// Advance the player to `now_ms`.
    pub fn tick(&mut self, now_ms: u64) {
        if let Some(fade) = self.fading {
            let t = now_ms.saturating_sub(fade.start_ms) as f32 / RAMP_DOWN_MS as f32;
            if t >= 1.0 {
                self.fading = None;
                self.write(Modality::Vibration, 0.0);
                self.write(Modality::Thermal, 0.0);
                debug!("fade complete");
            } else {
                self.write(
                    Modality::Vibration,
                    ease(fade.from_vib_pct, 0.0, EaseCurve::EaseOutSine, t),
                );
                self.write(
                    Modality::Thermal,
                    ease(fade.from_thermal_pct, 0.0, EaseCurve::EaseOutSine, t),
                );
            }
            return;
        }

        let Some(mut playing) = self.playing else {
            return;
        };

        let steps = playing.pattern.steps();
        let step = steps[playing.step_index];
        let elapsed = now_ms.saturating_sub(playing.step_start_ms);
        let t = elapsed as f32 / step.duration_ms.max(1) as f32;

        let target = step.target_intensity_pct * self.intensity_scale / 100.0;
        let level = ease(playing.step_from_pct, target, step.curve, t);
        self.write(step.modality, level);

        if elapsed >= step.duration_ms as u64 {
            playing.step_index += 1;
            playing.step_start_ms = now_ms;
            if playing.step_index >= steps.len() {
                if playing.pattern.is_looping() {
                    playing.step_index = 0;
                    playing.step_from_pct = self.last_level(steps[0].modality);
                    self.playing = Some(playing);
                } else {
                    self.playing = None;
                    self.begin_fade(now_ms);
                }
            } else {
                playing.step_from_pct = self.last_level(steps[playing.step_index].modality);
                self.playing = Some(playing);
            }
        } else {
            self.playing = Some(playing);
        }
    }

    fn begin_fade(&mut self, now_ms: u64) {
        self.playing = None;
        self.fading = Some(Fading {
            start_ms: now_ms,
            from_vib_pct: self.last_vib_pct,
            from_thermal_pct: self.last_thermal_pct,
        });
        debug!(
            from_vib = self.last_vib_pct,
            from_thermal = self.last_thermal_pct,
            "graceful fade started"
        );
    }

    fn last_level(&self, modality: Modality) -> f32 {
        match modality {
            Modality::Vibration => self.last_vib_pct,
            Modality::Thermal => self.last_thermal_pct,
        }
    }

    /// Clamp to the modality cap and skip redundant writes.
    fn write(&mut self, modality: Modality, level_pct: f32) {
        match modality {
            Modality::Vibration => {
                let level = level_pct.clamp(0.0, VIBRATION_CAP_PCT);
                if (level - self.last_vib_pct).abs() >= WRITE_EPSILON
                    || (level == 0.0 && self.last_vib_pct != 0.0)
                {
                    self.vib_port.write(level);
                    self.last_vib_pct = level;
                }
            }
            Modality::Thermal => {
                let level = level_pct.clamp(0.0, THERMAL_CAP_PCT);
                if (level - self.last_thermal_pct).abs() >= WRITE_EPSILON
                    || (level == 0.0 && self.last_thermal_pct != 0.0)
                {
                    self.thermal_port.write(level);
                    self.last_thermal_pct = level;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_common::mock::{peak_level, MockPort};
    use std::sync::{Arc, Mutex};

    fn player() -> (PatternPlayer, Arc<Mutex<Vec<f32>>>, Arc<Mutex<Vec<f32>>>) {
        let vib = MockPort::new();
        let thermal = MockPort::new();
        let vib_log = vib.log_handle();
        let thermal_log = thermal.log_handle();
        (
            PatternPlayer::new(Box::new(vib), Box::new(thermal)),
            vib_log,
            thermal_log,
        )
    }

    fn run(player: &mut PatternPlayer, from_ms: u64, to_ms: u64, step_ms: u64) {
        let mut now = from_ms;
        while now <= to_ms {
            player.tick(now);
            now += step_ms;
        }
    }

    #[test]
    fn test_attention_tap_plays_and_finishes() {
        let (mut player, vib_log, _) = player();
        player.start(SignaturePatternId::AttentionTap, 100.0, 0);
        run(&mut player, 0, 2_000, 10);

        assert!(!player.is_active());
        let peak = peak_level(&vib_log);
        assert!(peak > 40.0, "tap should reach near its 60% target, got {peak}");
        assert_eq!(player.outputs(), (0.0, 0.0));
    }

    #[test]
    fn test_intensity_scale_halves_output() {
        let (mut player, vib_log, _) = player();
        player.start(SignaturePatternId::AttentionTap, 50.0, 0);
        run(&mut player, 0, 2_000, 10);
        let peak = peak_level(&vib_log);
        assert!(peak <= 30.5, "half scale should halve the 60% target, got {peak}");
    }

    #[test]
    fn test_safety_caps_hold_for_every_pattern() {
        for id in SignaturePatternId::ALL {
            let (mut player, vib_log, thermal_log) = player();
            player.start(id, 100.0, 0);
            run(&mut player, 0, 30_000, 10);
            assert!(
                peak_level(&vib_log) <= VIBRATION_CAP_PCT,
                "{} vibration exceeded cap",
                id.name()
            );
            assert!(
                peak_level(&thermal_log) <= THERMAL_CAP_PCT,
                "{} thermal exceeded cap",
                id.name()
            );
        }
    }

    #[test]
    fn test_breathing_guide_loops_until_stopped() {
        let (mut player, vib_log, _) = player();
        player.start(SignaturePatternId::BreathingGuide, 100.0, 0);

        // Two full cycles in: still active
        run(&mut player, 0, 25_000, 50);
        assert!(player.is_active());
        assert!(peak_level(&vib_log) > 30.0);

        player.stop(25_050);
        run(&mut player, 25_100, 26_500, 50);
        assert!(!player.is_active());
        assert_eq!(player.outputs().0, 0.0);
    }

    #[test]
    fn test_stop_fades_instead_of_cutting() {
        let (mut player, _, thermal_log) = player();
        player.start(SignaturePatternId::GroundingWarmth, 100.0, 0);
        run(&mut player, 0, 4_000, 50); // mid-plateau at 50%

        player.stop(4_050);
        player.tick(4_350); // halfway through the 600 ms fade
        let mid_fade = player.outputs().1;
        assert!(mid_fade > 0.0 && mid_fade < 50.0, "mid-fade level {mid_fade}");

        player.tick(4_700);
        assert!(!player.is_active());
        assert_eq!(player.outputs().1, 0.0);
        assert!(peak_level(&thermal_log) <= THERMAL_CAP_PCT);
    }

    #[test]
    fn test_stop_immediate_zeroes_now() {
        let (mut player, _, _) = player();
        player.start(SignaturePatternId::GroundingWarmth, 100.0, 0);
        run(&mut player, 0, 3_000, 50);
        assert!(player.outputs().1 > 0.0);

        player.stop_immediate();
        assert!(!player.is_active());
        assert_eq!(player.outputs(), (0.0, 0.0));
    }

    #[test]
    fn test_redundant_writes_are_skipped() {
        let (mut player, _, thermal_log) = player();
        player.start(SignaturePatternId::GroundingWarmth, 100.0, 0);
        // The 6-second plateau holds a constant 50%: tick densely and count
        run(&mut player, 0, 7_500, 10);
        let writes = thermal_log.lock().unwrap().len();
        assert!(
            writes < 300,
            "plateau should not rewrite every tick ({writes} writes)"
        );
    }
}
