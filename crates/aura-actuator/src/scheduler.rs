//! Actuator scheduler
//!
//! One place arbitrates everything that reaches the motors: commands are
//! validated against the safety envelope, lower-priority cues yield to an
//! active higher-priority one, vibration rides the pattern player, and all
//! heat goes through the thermal state machine.

use crate::error::{ActuatorError, Result};
use crate::thermal::{FaultKind, ThermalStateMachine};
use aura_common::{OutputPort, TemperatureSource};
use aura_cues::{Cue, CuePriority, CueType};
use aura_haptics::{PatternPlayer, SignaturePatternId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// No single command may run longer than this.
pub const MAX_COMMAND_DURATION_MS: u64 = 60_000;

/// Intensities below this are imperceptible and rejected (except 0).
pub const MIN_PERCEPTIBLE_PCT: u8 = 5;

/// Vibration ceiling while thermal output is also active.
pub const COMBINED_VIBRATION_CAP_PCT: u8 = 60;

/// A validated request against the actuators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActuatorCommand {
    pub cue_type: CueType,
    pub priority: CuePriority,
    pub thermal_intensity_pct: u8,
    pub vibration_intensity_pct: u8,
    pub duration_ms: u64,
    pub thermal_pattern: Option<SignaturePatternId>,
    pub vibration_pattern: Option<SignaturePatternId>,
}

impl From<Cue> for ActuatorCommand {
    fn from(cue: Cue) -> Self {
        Self {
            cue_type: cue.cue_type,
            priority: cue.priority,
            thermal_intensity_pct: cue.thermal_intensity_pct,
            vibration_intensity_pct: cue.vibration_intensity_pct,
            duration_ms: (cue.thermal_duration_s as u64 * 1_000).max(
                // Vibration-only cues run exactly as long as their pattern
                SignaturePatternId::from_wire(cue.vibration_pattern_id)
                    .map(|p| p.steps().iter().map(|s| s.duration_ms as u64).sum())
                    .unwrap_or(0),
            ),
            thermal_pattern: None,
            vibration_pattern: SignaturePatternId::from_wire(cue.vibration_pattern_id),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ActiveCue {
    priority: CuePriority,
    end_ms: u64,
}

/// Exclusive owner of the actuator paths.
pub struct ActuatorScheduler {
    player: PatternPlayer,
    thermal: ThermalStateMachine,
    active: Option<ActiveCue>,
}

impl ActuatorScheduler {
    /// Build against the physical ports. The thermal port is owned by the
    /// state machine; the player's thermal writes are routed through it as
    /// requests.
    pub fn new(
        vibration_port: Box<dyn OutputPort>,
        thermal_port: Box<dyn OutputPort>,
        temperature: Arc<dyn TemperatureSource>,
    ) -> Self {
        let thermal = ThermalStateMachine::new(thermal_port, temperature);
        let player = PatternPlayer::new(vibration_port, Box::new(thermal.request_port()));
        Self {
            player,
            thermal,
            active: None,
        }
    }

    /// Latched thermal fault, if any (surfaces in the device-state flags).
    pub fn thermal_fault(&self) -> Option<FaultKind> {
        self.thermal.fault()
    }

    /// Explicitly clear a latched thermal fault.
    pub fn clear_thermal_fault(&mut self, now_ms: u64) -> Result<()> {
        self.thermal.clear_fault(now_ms)
    }

    /// Whether any cue is currently occupying the actuators.
    pub fn is_active(&self, now_ms: u64) -> bool {
        self.active.is_some_and(|a| now_ms < a.end_ms)
    }

    /// Validate and apply a command.
    pub fn apply(&mut self, cmd: ActuatorCommand, now_ms: u64) -> Result<()> {
        validate_intensity(cmd.thermal_intensity_pct)?;
        validate_intensity(cmd.vibration_intensity_pct)?;
        if cmd.duration_ms > MAX_COMMAND_DURATION_MS {
            return Err(ActuatorError::DurationTooLong(cmd.duration_ms));
        }

        if let Some(active) = self.active {
            if now_ms < active.end_ms && cmd.priority < active.priority {
                debug!(?cmd.priority, active = ?active.priority, "command preempted");
                return Err(ActuatorError::LowerPriority);
            }
        }

        // Combined output keeps vibration from overwhelming the warmth
        let vibration_intensity = if cmd.thermal_intensity_pct > 0 && cmd.vibration_intensity_pct > 0
        {
            cmd.vibration_intensity_pct.min(COMBINED_VIBRATION_CAP_PCT)
        } else {
            cmd.vibration_intensity_pct
        };

        if cmd.thermal_intensity_pct >= MIN_PERCEPTIBLE_PCT {
            self.thermal.start(
                cmd.thermal_intensity_pct as f32,
                cmd.duration_ms,
                cmd.thermal_pattern.is_some(),
                now_ms,
            )?;
        }

        let pattern = cmd.vibration_pattern.or(cmd.thermal_pattern);
        if let Some(pattern) = pattern {
            let scale = if pattern.steps().iter().any(|s| s.modality == aura_common::Modality::Vibration)
            {
                vibration_intensity as f32
            } else {
                cmd.thermal_intensity_pct as f32
            };
            self.player.start(pattern, scale, now_ms);
        }

        self.active = Some(ActiveCue {
            priority: cmd.priority,
            end_ms: now_ms + cmd.duration_ms,
        });
        info!(cue_type = ?cmd.cue_type, priority = ?cmd.priority, duration_ms = cmd.duration_ms, "command applied");
        Ok(())
    }

    /// Apply the 4-byte BLE actuator-control record.
    pub fn apply_ble(
        &mut self,
        thermal_pct: u8,
        thermal_duration_s: u8,
        vibration_pattern: u8,
        vibration_pct: u8,
        now_ms: u64,
    ) -> Result<()> {
        let duration_ms =
            ((thermal_duration_s as u64) * 1_000).clamp(0, MAX_COMMAND_DURATION_MS);
        let cmd = ActuatorCommand {
            cue_type: CueType::Combined,
            priority: CuePriority::Normal,
            thermal_intensity_pct: thermal_pct,
            vibration_intensity_pct: vibration_pct,
            duration_ms: if duration_ms == 0 { 10_000 } else { duration_ms },
            thermal_pattern: None,
            vibration_pattern: SignaturePatternId::from_wire(vibration_pattern),
        };
        self.apply(cmd, now_ms)
    }

    /// Advance both actuator paths; expire the active cue when its window
    /// closes.
    pub fn tick(&mut self, now_ms: u64) {
        self.player.tick(now_ms);
        self.thermal.tick(now_ms);

        if let Some(active) = self.active {
            if now_ms >= active.end_ms {
                if self.player.is_active() {
                    self.player.stop(now_ms);
                }
                self.thermal.stop(now_ms);
                self.active = None;
                debug!("active cue expired");
            }
        }
    }

    /// Hard stop: zero outputs now, thermal to cooldown if it was hot.
    pub fn stop_all(&mut self, now_ms: u64) {
        warn!("stop_all requested");
        self.player.stop_immediate();
        self.thermal.stop(now_ms);
        self.active = None;
    }

    /// Last written output levels `(vibration, thermal-request)`, for
    /// diagnostics.
    pub fn outputs(&self) -> (f32, f32) {
        self.player.outputs()
    }
}

fn validate_intensity(intensity_pct: u8) -> Result<()> {
    if intensity_pct > 100 {
        return Err(ActuatorError::IntensityOutOfRange(intensity_pct));
    }
    if intensity_pct > 0 && intensity_pct < MIN_PERCEPTIBLE_PCT {
        return Err(ActuatorError::Imperceptible(intensity_pct));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_common::mock::{MockPort, MockThermometer};
    use std::sync::Mutex;

    fn scheduler() -> (
        ActuatorScheduler,
        Arc<Mutex<Vec<f32>>>,
        Arc<Mutex<Vec<f32>>>,
        Arc<MockThermometer>,
    ) {
        let vib = MockPort::new();
        let thermal = MockPort::new();
        let vib_log = vib.log_handle();
        let thermal_log = thermal.log_handle();
        let thermo = MockThermometer::at(33.0);
        (
            ActuatorScheduler::new(Box::new(vib), Box::new(thermal), thermo.clone()),
            vib_log,
            thermal_log,
            thermo,
        )
    }

    fn thermal_cmd(intensity: u8, duration_ms: u64, priority: CuePriority) -> ActuatorCommand {
        ActuatorCommand {
            cue_type: CueType::Thermal,
            priority,
            thermal_intensity_pct: intensity,
            vibration_intensity_pct: 0,
            duration_ms,
            thermal_pattern: None,
            vibration_pattern: None,
        }
    }

    #[test]
    fn test_rejects_out_of_range_intensity() {
        let (mut scheduler, ..) = scheduler();
        let err = scheduler
            .apply(thermal_cmd(101, 10_000, CuePriority::Normal), 0)
            .unwrap_err();
        assert_eq!(err, ActuatorError::IntensityOutOfRange(101));
    }

    #[test]
    fn test_rejects_imperceptible_intensity() {
        let (mut scheduler, ..) = scheduler();
        for intensity in 1..5u8 {
            let err = scheduler
                .apply(thermal_cmd(intensity, 10_000, CuePriority::Normal), 0)
                .unwrap_err();
            assert_eq!(err, ActuatorError::Imperceptible(intensity));
        }
    }

    #[test]
    fn test_rejects_over_long_duration() {
        let (mut scheduler, ..) = scheduler();
        let err = scheduler
            .apply(thermal_cmd(40, 60_001, CuePriority::Normal), 0)
            .unwrap_err();
        assert_eq!(err, ActuatorError::DurationTooLong(60_001));
    }

    #[test]
    fn test_priority_preemption() {
        let (mut scheduler, ..) = scheduler();
        scheduler
            .apply(thermal_cmd(40, 30_000, CuePriority::High), 0)
            .unwrap();

        // Lower priority while the high cue is active: rejected
        let err = scheduler
            .apply(thermal_cmd(30, 10_000, CuePriority::Normal), 5_000)
            .unwrap_err();
        assert_eq!(err, ActuatorError::LowerPriority);

        // After expiry the lower-priority cue is welcome again, though the
        // thermal path itself is still cooling down
        scheduler.tick(30_000);
        let err = scheduler
            .apply(thermal_cmd(30, 10_000, CuePriority::Normal), 31_000)
            .unwrap_err();
        assert_eq!(err, ActuatorError::CoolingDown);
    }

    #[test]
    fn test_combined_caps_vibration_at_sixty() {
        let (mut scheduler, vib_log, ..) = scheduler();
        let cmd = ActuatorCommand {
            cue_type: CueType::Combined,
            priority: CuePriority::High,
            thermal_intensity_pct: 50,
            vibration_intensity_pct: 95,
            duration_ms: 20_000,
            thermal_pattern: None,
            vibration_pattern: Some(SignaturePatternId::Heartbeat),
        };
        scheduler.apply(cmd, 0).unwrap();
        let mut now = 0;
        while now <= 5_000 {
            scheduler.tick(now);
            now += 20;
        }
        let peak = aura_common::mock::peak_level(&vib_log);
        assert!(peak <= 60.0, "combined vibration peaked at {peak}");
    }

    #[test]
    fn test_ble_write_drives_both_paths() {
        let (mut scheduler, vib_log, thermal_log, _) = scheduler();
        scheduler.apply_ble(45, 20, 4, 50, 0).unwrap();

        let mut now = 0;
        while now <= 5_000 {
            scheduler.tick(now);
            now += 50;
        }
        assert!(aura_common::mock::peak_level(&vib_log) > 0.0);
        assert!(aura_common::mock::peak_level(&thermal_log) > 0.0);
    }

    #[test]
    fn test_stop_all_zeroes_and_cools() {
        let (mut scheduler, vib_log, ..) = scheduler();
        scheduler.apply_ble(45, 20, 5, 50, 0).unwrap();
        let mut now = 0;
        while now <= 4_000 {
            scheduler.tick(now);
            now += 50;
        }

        scheduler.stop_all(4_050);
        assert_eq!(*vib_log.lock().unwrap().last().unwrap(), 0.0);
        assert!(!scheduler.is_active(4_100));
        assert!(matches!(
            scheduler.thermal.state(),
            crate::thermal::ThermalState::Cooldown { .. }
        ));
    }

    #[test]
    fn test_active_record_clears_after_end() {
        let (mut scheduler, ..) = scheduler();
        scheduler
            .apply(thermal_cmd(40, 10_000, CuePriority::Normal), 0)
            .unwrap();
        assert!(scheduler.is_active(5_000));
        scheduler.tick(10_000);
        assert!(!scheduler.is_active(10_001));
    }

    #[test]
    fn test_thermal_fault_blocks_new_thermal_cues() {
        let (mut scheduler, _, _, thermo) = scheduler();
        scheduler
            .apply(thermal_cmd(60, 30_000, CuePriority::Normal), 0)
            .unwrap();
        let mut now = 0;
        while now <= 3_000 {
            scheduler.tick(now);
            now += 100;
        }
        thermo.set(43.0);
        scheduler.tick(3_500);
        scheduler.tick(4_000);
        assert_eq!(scheduler.thermal_fault(), Some(FaultKind::OverTemp));

        let err = scheduler
            .apply(thermal_cmd(40, 10_000, CuePriority::Alert), 40_000)
            .unwrap_err();
        assert_eq!(err, ActuatorError::ThermalFault(FaultKind::OverTemp));

        thermo.set(36.0);
        scheduler.clear_thermal_fault(41_000).unwrap();
        scheduler
            .apply(thermal_cmd(40, 10_000, CuePriority::Alert), 41_100)
            .unwrap();
    }
}
