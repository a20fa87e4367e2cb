//! Thermal actuator state machine
//!
//! Heating on skin is the one actuator that can hurt. The state machine
//! soft-starts every activation, polls skin temperature while heat is on,
//! latches a fault on over-temperature, thermal runaway or a dead sensor,
//! and enforces a mandatory cooldown between activations. A latched fault
//! zeroes the output and is only cleared explicitly, and only once the
//! skin has cooled well below the trip point.

use crate::error::{ActuatorError, Result};
use aura_common::{OutputPort, TemperatureSource};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Linear soft-start duration.
pub const THERMAL_RAMP_MS: u64 = 2_000;

/// Absolute ceiling on the commanded thermal target (%).
pub const THERMAL_TARGET_CAP_PCT: f32 = 80.0;

/// Mandatory pause after any activation.
pub const THERMAL_COOLDOWN_MS: u64 = 30_000;

/// Skin temperature that trips the over-temperature fault (°C).
pub const SKIN_TEMP_MAX_C: f32 = 42.0;

/// Heating rate that trips the runaway fault (°C per second).
pub const RUNAWAY_C_PER_S: f32 = 2.0;

/// Skin-temperature polling interval while heat is on.
pub const TEMP_POLL_INTERVAL_MS: u64 = 500;

/// A fault clears only when skin is at least this far below the trip point.
pub const FAULT_CLEAR_MARGIN_C: f32 = 5.0;

/// Watchdog on a single activation. The scheduler already rejects
/// over-long commands; heat still on past this point means something
/// bypassed it, and that latches instead of cooling down quietly.
pub const THERMAL_TIMEOUT_MS: u64 = 60_000 + THERMAL_RAMP_MS;

/// Why the thermal path latched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    OverTemp,
    Runaway,
    SensorFail,
    Timeout,
}

/// Thermal path state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThermalState {
    Off,
    Ramping {
        target_pct: f32,
        started_ms: u64,
        end_ms: u64,
    },
    Active {
        target_pct: f32,
        end_ms: u64,
    },
    Cooldown {
        until_ms: u64,
    },
    Fault {
        kind: FaultKind,
    },
}

/// Port adapter that turns pattern-player thermal writes into level
/// requests the state machine arbitrates.
pub struct ThermalRequestPort {
    requested: Arc<Mutex<f32>>,
}

impl OutputPort for ThermalRequestPort {
    fn write(&mut self, level_pct: f32) {
        *self.requested.lock().unwrap() = level_pct;
    }
}

/// The single owner of the physical heater port.
pub struct ThermalStateMachine {
    port: Box<dyn OutputPort>,
    temperature: Arc<dyn TemperatureSource>,
    state: ThermalState,
    /// Level most recently requested by a playing thermal pattern
    pattern_request: Arc<Mutex<f32>>,
    /// When true, `Active` follows the pattern request instead of the
    /// flat command target
    pattern_driven: bool,
    activation_started_ms: u64,
    last_poll: Option<(u64, f32)>,
    last_written: f32,
}

impl ThermalStateMachine {
    pub fn new(port: Box<dyn OutputPort>, temperature: Arc<dyn TemperatureSource>) -> Self {
        Self {
            port,
            temperature,
            state: ThermalState::Off,
            pattern_request: Arc::new(Mutex::new(0.0)),
            pattern_driven: false,
            activation_started_ms: 0,
            last_poll: None,
            last_written: 0.0,
        }
    }

    /// Adapter for the pattern player's thermal output.
    pub fn request_port(&self) -> ThermalRequestPort {
        ThermalRequestPort {
            requested: Arc::clone(&self.pattern_request),
        }
    }

    pub fn state(&self) -> ThermalState {
        self.state
    }

    pub fn fault(&self) -> Option<FaultKind> {
        match self.state {
            ThermalState::Fault { kind } => Some(kind),
            _ => None,
        }
    }

    /// Begin an activation: soft-start to `target_pct` (capped at 80 %),
    /// hold until `duration_ms` elapses, then cool down.
    pub fn start(
        &mut self,
        target_pct: f32,
        duration_ms: u64,
        pattern_driven: bool,
        now_ms: u64,
    ) -> Result<()> {
        match self.state {
            ThermalState::Fault { kind } => return Err(ActuatorError::ThermalFault(kind)),
            ThermalState::Cooldown { until_ms } if now_ms < until_ms => {
                return Err(ActuatorError::CoolingDown)
            }
            _ => {}
        }
        let target = target_pct.clamp(0.0, THERMAL_TARGET_CAP_PCT);
        self.pattern_driven = pattern_driven;
        self.activation_started_ms = now_ms;
        self.last_poll = None;
        self.state = ThermalState::Ramping {
            target_pct: target,
            started_ms: now_ms,
            end_ms: now_ms + duration_ms,
        };
        info!(target, duration_ms, pattern_driven, "thermal activation started");
        Ok(())
    }

    /// End the activation early: straight to cooldown when heat was on.
    pub fn stop(&mut self, now_ms: u64) {
        match self.state {
            ThermalState::Ramping { .. } | ThermalState::Active { .. } => {
                self.write(0.0);
                self.state = ThermalState::Cooldown {
                    until_ms: now_ms + THERMAL_COOLDOWN_MS,
                };
                debug!("thermal stopped into cooldown");
            }
            _ => {}
        }
    }

    /// Clear a latched fault. Honored only when the skin has cooled at
    /// least 5 °C below the trip threshold.
    pub fn clear_fault(&mut self, _now_ms: u64) -> Result<()> {
        let ThermalState::Fault { .. } = self.state else {
            return Err(ActuatorError::NoFault);
        };
        match self.temperature.skin_temp_c() {
            Some(temp) if temp <= SKIN_TEMP_MAX_C - FAULT_CLEAR_MARGIN_C => {
                info!(temp, "thermal fault cleared");
                self.state = ThermalState::Off;
                self.last_poll = None;
                Ok(())
            }
            Some(temp) => Err(ActuatorError::UnsafeClear(temp)),
            None => Err(ActuatorError::ThermalFault(FaultKind::SensorFail)),
        }
    }

    /// Advance the machine to `now_ms`.
    pub fn tick(&mut self, now_ms: u64) {
        match self.state {
            ThermalState::Off | ThermalState::Fault { .. } => {}

            ThermalState::Cooldown { until_ms } => {
                if now_ms >= until_ms {
                    self.state = ThermalState::Off;
                    debug!("thermal cooldown complete");
                }
            }

            ThermalState::Ramping {
                target_pct,
                started_ms,
                end_ms,
            } => {
                if self.check_watchdog(now_ms) || self.check_temperature(now_ms) {
                    return;
                }
                let elapsed = now_ms.saturating_sub(started_ms);
                if elapsed >= THERMAL_RAMP_MS {
                    self.state = ThermalState::Active {
                        target_pct,
                        end_ms,
                    };
                    self.write(target_pct);
                } else {
                    let fraction = elapsed as f32 / THERMAL_RAMP_MS as f32;
                    self.write(target_pct * fraction);
                }
            }

            ThermalState::Active { target_pct, end_ms } => {
                if self.check_watchdog(now_ms) || self.check_temperature(now_ms) {
                    return;
                }
                if now_ms >= end_ms {
                    self.write(0.0);
                    self.state = ThermalState::Cooldown {
                        until_ms: now_ms + THERMAL_COOLDOWN_MS,
                    };
                    debug!("thermal duration elapsed, cooling down");
                    return;
                }
                let level = if self.pattern_driven {
                    *self.pattern_request.lock().unwrap()
                } else {
                    target_pct
                };
                self.write(level.clamp(0.0, THERMAL_TARGET_CAP_PCT));
            }
        }
    }

    /// Returns true when the activation outlived the watchdog and latched.
    fn check_watchdog(&mut self, now_ms: u64) -> bool {
        if now_ms.saturating_sub(self.activation_started_ms) > THERMAL_TIMEOUT_MS {
            self.latch(FaultKind::Timeout);
            return true;
        }
        false
    }

    /// Poll the thermistor on its interval. Returns true when a fault was
    /// latched this tick.
    fn check_temperature(&mut self, now_ms: u64) -> bool {
        let due = self
            .last_poll
            .map_or(true, |(last_ms, _)| now_ms.saturating_sub(last_ms) >= TEMP_POLL_INTERVAL_MS);
        if !due {
            return false;
        }

        let Some(temp) = self.temperature.skin_temp_c() else {
            self.latch(FaultKind::SensorFail);
            return true;
        };

        if temp >= SKIN_TEMP_MAX_C {
            self.latch(FaultKind::OverTemp);
            return true;
        }

        if let Some((last_ms, last_temp)) = self.last_poll {
            let dt_s = now_ms.saturating_sub(last_ms) as f32 / 1000.0;
            if dt_s > 0.0 && (temp - last_temp) / dt_s > RUNAWAY_C_PER_S {
                self.latch(FaultKind::Runaway);
                return true;
            }
        }

        self.last_poll = Some((now_ms, temp));
        false
    }

    fn latch(&mut self, kind: FaultKind) {
        warn!(?kind, "thermal fault latched");
        self.write(0.0);
        self.state = ThermalState::Fault { kind };
    }

    fn write(&mut self, level_pct: f32) {
        if (level_pct - self.last_written).abs() >= f32::EPSILON {
            self.port.write(level_pct);
            self.last_written = level_pct;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_common::mock::{last_level, peak_level, MockPort, MockThermometer};

    fn machine() -> (
        ThermalStateMachine,
        Arc<Mutex<Vec<f32>>>,
        Arc<MockThermometer>,
    ) {
        let port = MockPort::new();
        let log = port.log_handle();
        let thermo = MockThermometer::at(33.0);
        (
            ThermalStateMachine::new(Box::new(port), thermo.clone()),
            log,
            thermo,
        )
    }

    fn run(machine: &mut ThermalStateMachine, from_ms: u64, to_ms: u64, step_ms: u64) {
        let mut now = from_ms;
        while now <= to_ms {
            machine.tick(now);
            now += step_ms;
        }
    }

    #[test]
    fn test_ramp_then_active_then_cooldown() {
        let (mut machine, log, _) = machine();
        machine.start(60.0, 10_000, false, 0).unwrap();

        // Mid-ramp: roughly half the target
        machine.tick(1_000);
        let mid = last_level(&log);
        assert!(mid > 20.0 && mid < 40.0, "mid-ramp level {mid}");

        machine.tick(2_000);
        assert!(matches!(machine.state(), ThermalState::Active { .. }));
        assert_eq!(last_level(&log), 60.0);

        machine.tick(10_000);
        assert!(matches!(machine.state(), ThermalState::Cooldown { .. }));
        assert_eq!(last_level(&log), 0.0);

        machine.tick(40_000);
        assert_eq!(machine.state(), ThermalState::Off);
    }

    #[test]
    fn test_target_capped_at_eighty() {
        let (mut machine, log, _) = machine();
        machine.start(95.0, 10_000, false, 0).unwrap();
        run(&mut machine, 0, 5_000, 100);
        assert!(peak_level(&log) <= THERMAL_TARGET_CAP_PCT);
    }

    #[test]
    fn test_over_temperature_latches() {
        let (mut machine, log, thermo) = machine();
        machine.start(60.0, 30_000, false, 0).unwrap();
        run(&mut machine, 0, 3_000, 100);
        assert!(matches!(machine.state(), ThermalState::Active { .. }));

        thermo.set(42.5);
        run(&mut machine, 3_100, 4_000, 100);
        assert_eq!(machine.fault(), Some(FaultKind::OverTemp));
        assert_eq!(last_level(&log), 0.0);

        // Faults reject new activations
        assert_eq!(
            machine.start(40.0, 5_000, false, 5_000),
            Err(ActuatorError::ThermalFault(FaultKind::OverTemp))
        );
    }

    #[test]
    fn test_runaway_latches() {
        let (mut machine, _, thermo) = machine();
        machine.start(60.0, 30_000, false, 0).unwrap();
        machine.tick(0); // first poll at 33.0

        // +3 °C in 500 ms: 6 °C/s, far past the 2 °C/s limit
        thermo.set(36.0);
        machine.tick(500);
        assert_eq!(machine.fault(), Some(FaultKind::Runaway));
    }

    #[test]
    fn test_sensor_failure_latches() {
        let (mut machine, _, thermo) = machine();
        machine.start(60.0, 30_000, false, 0).unwrap();
        machine.tick(0);
        thermo.fail();
        machine.tick(600);
        assert_eq!(machine.fault(), Some(FaultKind::SensorFail));
    }

    #[test]
    fn test_fault_clear_requires_cool_skin() {
        let (mut machine, _, thermo) = machine();
        machine.start(60.0, 30_000, false, 0).unwrap();
        machine.tick(0);
        thermo.set(43.0);
        machine.tick(600);
        assert_eq!(machine.fault(), Some(FaultKind::OverTemp));

        // Still warm: refused
        thermo.set(39.0);
        assert_eq!(
            machine.clear_fault(10_000),
            Err(ActuatorError::UnsafeClear(39.0))
        );

        // 5 °C below the threshold: honored
        thermo.set(36.5);
        machine.clear_fault(11_000).unwrap();
        assert_eq!(machine.state(), ThermalState::Off);
    }

    #[test]
    fn test_cooldown_rejects_restart() {
        let (mut machine, _, _) = machine();
        machine.start(50.0, 4_000, false, 0).unwrap();
        run(&mut machine, 0, 4_500, 100);
        assert!(matches!(machine.state(), ThermalState::Cooldown { .. }));

        assert_eq!(
            machine.start(50.0, 4_000, false, 5_000),
            Err(ActuatorError::CoolingDown)
        );

        // After the 30 s cooldown a new activation is fine
        run(&mut machine, 5_000, 35_000, 500);
        machine.start(50.0, 4_000, false, 35_100).unwrap();
    }

    #[test]
    fn test_pattern_driven_levels_follow_request() {
        let (mut machine, log, _) = machine();
        let mut request_port = machine.request_port();
        machine.start(70.0, 20_000, true, 0).unwrap();
        run(&mut machine, 0, 2_500, 100); // through the ramp

        request_port.write(25.0);
        machine.tick(3_000);
        assert_eq!(last_level(&log), 25.0);

        request_port.write(55.0);
        machine.tick(3_200);
        assert_eq!(last_level(&log), 55.0);
    }

    #[test]
    fn test_runaway_duration_latches_timeout() {
        let (mut machine, log, _) = machine();
        // A duration past the command cap can only appear if scheduler
        // validation was bypassed; the state machine still refuses to
        // keep heating
        machine.start(50.0, 600_000, false, 0).unwrap();
        run(&mut machine, 0, 61_000, 500);
        assert!(matches!(machine.state(), ThermalState::Active { .. }));

        run(&mut machine, 61_500, 63_000, 500);
        assert_eq!(machine.fault(), Some(FaultKind::Timeout));
        assert_eq!(last_level(&log), 0.0);
    }

    #[test]
    fn test_stop_enters_cooldown() {
        let (mut machine, log, _) = machine();
        machine.start(50.0, 30_000, false, 0).unwrap();
        run(&mut machine, 0, 3_000, 100);
        machine.stop(3_100);
        assert!(matches!(machine.state(), ThermalState::Cooldown { .. }));
        assert_eq!(last_level(&log), 0.0);
    }
}
