//! Capability ports
//!
//! The core is polymorphic over the capability set
//! `{vibration port, thermal port, clock, temperature source}`. Concrete
//! implementations (PWM drivers, a BLE command emitter, the fakes in
//! [`crate::mock`]) live outside the core and are injected at construction.

/// Monotonic millisecond time source.
///
/// Cooldowns, debounce and ramp timing all run off this clock so tests can
/// drive time explicitly and firmware can feed a hardware timer.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Skin temperature under the ring band, in °C.
///
/// Returns `None` when the thermistor read fails; the thermal state machine
/// treats that as a sensor fault.
pub trait TemperatureSource: Send + Sync {
    fn skin_temp_c(&self) -> Option<f32>;
}

/// Single-writer sink for one actuation channel (vibration motor or heater).
///
/// Levels are duty-cycle percentages in `[0, 100]`. Implementations must
/// tolerate repeated identical writes, but callers skip redundant ones.
pub trait OutputPort: Send {
    fn write(&mut self, level_pct: f32);
}
