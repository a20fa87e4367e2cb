//! Mock port implementations for host-side tests
//!
//! Mirrors the live/mock split of the hardware bridge: tests construct the
//! core against these fakes and drive time and temperature by hand.

use crate::ports::{Clock, OutputPort, TemperatureSource};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Manually advanced millisecond clock.
#[derive(Debug, Default)]
pub struct MockClock {
    now_ms: AtomicU64,
}

impl MockClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn starting_at(ms: u64) -> Arc<Self> {
        let clock = Self::default();
        clock.now_ms.store(ms, Ordering::SeqCst);
        Arc::new(clock)
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Settable skin thermometer; `fail()` simulates a broken thermistor.
#[derive(Debug)]
pub struct MockThermometer {
    temp_c: Mutex<Option<f32>>,
}

impl MockThermometer {
    pub fn at(temp_c: f32) -> Arc<Self> {
        Arc::new(Self {
            temp_c: Mutex::new(Some(temp_c)),
        })
    }

    pub fn set(&self, temp_c: f32) {
        *self.temp_c.lock().unwrap() = Some(temp_c);
    }

    pub fn fail(&self) {
        *self.temp_c.lock().unwrap() = None;
    }
}

impl TemperatureSource for MockThermometer {
    fn skin_temp_c(&self) -> Option<f32> {
        *self.temp_c.lock().unwrap()
    }
}

/// Output port that records every write for later assertions.
#[derive(Debug, Default)]
pub struct MockPort {
    log: Arc<Mutex<Vec<f32>>>,
}

impl MockPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the write log; clone before moving the port into
    /// the component under test.
    pub fn log_handle(&self) -> Arc<Mutex<Vec<f32>>> {
        Arc::clone(&self.log)
    }
}

impl OutputPort for MockPort {
    fn write(&mut self, level_pct: f32) {
        self.log.lock().unwrap().push(level_pct);
    }
}

/// Convenience: the last level written to a recorded log, or 0.
pub fn last_level(log: &Arc<Mutex<Vec<f32>>>) -> f32 {
    log.lock().unwrap().last().copied().unwrap_or(0.0)
}

/// Convenience: the maximum level ever written to a recorded log.
pub fn peak_level(log: &Arc<Mutex<Vec<f32>>>) -> f32 {
    log.lock()
        .unwrap()
        .iter()
        .fold(0.0f32, |acc, &level| acc.max(level))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_clock_advances() {
        let clock = MockClock::new();
        assert_eq!(clock.now_ms(), 0);
        clock.advance(250);
        assert_eq!(clock.now_ms(), 250);
        clock.set(1_000);
        assert_eq!(clock.now_ms(), 1_000);
    }

    #[test]
    fn test_mock_port_records_writes() {
        let mut port = MockPort::new();
        let log = port.log_handle();
        port.write(10.0);
        port.write(35.5);
        assert_eq!(log.lock().unwrap().len(), 2);
        assert_eq!(last_level(&log), 35.5);
        assert_eq!(peak_level(&log), 35.5);
    }

    #[test]
    fn test_mock_thermometer_failure() {
        let thermo = MockThermometer::at(33.0);
        assert_eq!(thermo.skin_temp_c(), Some(33.0));
        thermo.fail();
        assert_eq!(thermo.skin_temp_c(), None);
    }
}
