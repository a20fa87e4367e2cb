//! Aura Stream – bounded RR-interval buffering ahead of analysis
//!
//! Accepts beat intervals in arrival order, rejects the physiologically
//! impossible ones at the gate, and signals readiness once a full analysis
//! window has accumulated past the debounce interval. The buffer is
//! single-owner; the orchestrator drains it window by window, optionally
//! retaining a tail for overlap between consecutive windows.

use aura_common::Clock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info};

/// Stream gating configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Hard cap on buffered samples; FIFO drop beyond this
    #[serde(default = "default_capacity_max")]
    pub capacity_max: usize,

    /// Samples required before a window is ready
    #[serde(default = "default_min_window")]
    pub min_window: usize,

    /// Minimum spacing between drains (ms)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Intervals above this signal a sensor gap, not a beat (ms)
    #[serde(default = "default_reset_threshold_ms")]
    pub reset_threshold_ms: f64,

    /// Intervals below this are flagged as artifacts (ms)
    #[serde(default = "default_min_threshold_ms")]
    pub min_threshold_ms: f64,

    /// Maximum relative change vs. the previous accepted interval
    #[serde(default = "default_max_rate_change")]
    pub max_rate_change: f64,
}

fn default_capacity_max() -> usize {
    256
}
fn default_min_window() -> usize {
    64
}
fn default_debounce_ms() -> u64 {
    250
}
fn default_reset_threshold_ms() -> f64 {
    2000.0
}
fn default_min_threshold_ms() -> f64 {
    300.0
}
fn default_max_rate_change() -> f64 {
    0.20
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            capacity_max: default_capacity_max(),
            min_window: default_min_window(),
            debounce_ms: default_debounce_ms(),
            reset_threshold_ms: default_reset_threshold_ms(),
            min_threshold_ms: default_min_threshold_ms(),
            max_rate_change: default_max_rate_change(),
        }
    }
}

/// Typed events produced by the intake gate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StreamEvent {
    /// Interval exceeded the reset threshold: sensor gap, continuity broken
    Reset { rr_ms: f64 },

    /// Interval rejected as an artifact (too short or rate change too steep)
    Artifact { rr_ms: f64 },

    /// A full window is buffered and the debounce interval has elapsed
    Ready { buffered: usize },
}

/// Read-only view of the stream state.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StreamStats {
    pub ready_for_process: bool,
    pub buffered: usize,
    /// Artifacts since the last drain over samples since the last drain
    pub artifact_rate: f64,
    pub mean_rr_ms: f64,
    pub hr_bpm: f64,
    pub total_samples: u64,
    pub total_artifacts: u64,
    pub resets: u32,
}

/// Bounded, gated RR stream buffer.
pub struct RrStream {
    config: StreamConfig,
    clock: Arc<dyn Clock>,
    buffer: VecDeque<f64>,
    last_accepted: Option<f64>,
    /// `None` until the first drain: the first window is never debounced
    last_drain_ms: Option<u64>,
    samples_this_window: u64,
    artifacts_this_window: u64,
    total_samples: u64,
    total_artifacts: u64,
    resets: u32,
    reset_times_ms: VecDeque<u64>,
}

/// Reset timestamps retained for diagnostics.
const RESET_HISTORY_MAX: usize = 10;

impl RrStream {
    pub fn new(config: StreamConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            buffer: VecDeque::with_capacity(config.capacity_max),
            config,
            last_accepted: None,
            last_drain_ms: None,
            samples_this_window: 0,
            artifacts_this_window: 0,
            total_samples: 0,
            total_artifacts: 0,
            resets: 0,
            reset_times_ms: VecDeque::with_capacity(RESET_HISTORY_MAX),
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Push one interval through the gate.
    ///
    /// Returns the event the push produced, if any; `Ready` doubles as the
    /// "window available" signal.
    pub fn push(&mut self, rr_ms: f64) -> Option<StreamEvent> {
        self.samples_this_window += 1;
        self.total_samples += 1;

        if rr_ms > self.config.reset_threshold_ms {
            // A gap this long means missed beats, not a slow heart
            debug!(rr_ms, "interval above reset threshold rejected");
            return Some(StreamEvent::Reset { rr_ms });
        }

        let too_short = rr_ms < self.config.min_threshold_ms;
        let too_steep = self.last_accepted.is_some_and(|prev| {
            (rr_ms - prev).abs() / prev > self.config.max_rate_change
        });
        if too_short || too_steep {
            self.artifacts_this_window += 1;
            self.total_artifacts += 1;
            debug!(rr_ms, too_short, too_steep, "interval flagged as artifact");
            return Some(StreamEvent::Artifact { rr_ms });
        }

        self.buffer.push_back(rr_ms);
        self.last_accepted = Some(rr_ms);
        while self.buffer.len() > self.config.capacity_max {
            self.buffer.pop_front();
        }

        if self.is_ready() {
            Some(StreamEvent::Ready {
                buffered: self.buffer.len(),
            })
        } else {
            None
        }
    }

    /// Push a batch in order, collecting the produced events.
    pub fn push_batch(&mut self, rrs_ms: &[f64]) -> Vec<StreamEvent> {
        rrs_ms.iter().filter_map(|&rr| self.push(rr)).collect()
    }

    /// True when a window is buffered and the debounce interval has passed.
    pub fn is_ready(&self) -> bool {
        if self.buffer.len() < self.config.min_window {
            return false;
        }
        match self.last_drain_ms {
            None => true,
            Some(last) => self.clock.now_ms().saturating_sub(last) >= self.config.debounce_ms,
        }
    }

    /// Copy of the current buffer without consuming it.
    pub fn peek(&self) -> Vec<f64> {
        self.buffer.iter().copied().collect()
    }

    /// Take the buffered window, retaining `floor(len · overlap)` trailing
    /// samples for continuity with the next window.
    ///
    /// `overlap` is clamped to `[0.0, 0.9]`; zero clears the buffer
    /// entirely. Resets the debounce clock and the per-window artifact
    /// counter.
    pub fn drain(&mut self, overlap: f64) -> Vec<f64> {
        let window: Vec<f64> = self.buffer.iter().copied().collect();

        let overlap = overlap.clamp(0.0, 0.9);
        let keep = (window.len() as f64 * overlap).floor() as usize;
        let tail_start = window.len() - keep;
        self.buffer = window[tail_start..].iter().copied().collect();

        self.last_drain_ms = Some(self.clock.now_ms());
        self.samples_this_window = 0;
        self.artifacts_this_window = 0;

        debug!(drained = window.len(), kept = keep, "window drained");
        window
    }

    /// Discard everything buffered and record the reset.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.last_accepted = None;
        self.samples_this_window = 0;
        self.artifacts_this_window = 0;
        self.resets += 1;
        self.reset_times_ms.push_back(self.clock.now_ms());
        while self.reset_times_ms.len() > RESET_HISTORY_MAX {
            self.reset_times_ms.pop_front();
        }
        info!(resets = self.resets, "stream reset");
    }

    /// Timestamps of recent resets (most recent last, capped at 10).
    pub fn reset_times_ms(&self) -> Vec<u64> {
        self.reset_times_ms.iter().copied().collect()
    }

    /// Read-only stats view.
    pub fn snapshot(&self) -> StreamStats {
        let buffered = self.buffer.len();
        let mean_rr_ms = if buffered == 0 {
            0.0
        } else {
            self.buffer.iter().sum::<f64>() / buffered as f64
        };
        StreamStats {
            ready_for_process: self.is_ready(),
            buffered,
            artifact_rate: self.artifacts_this_window as f64
                / (self.samples_this_window.max(1)) as f64,
            mean_rr_ms,
            hr_bpm: if mean_rr_ms > 0.0 { 60_000.0 / mean_rr_ms } else { 0.0 },
            total_samples: self.total_samples,
            total_artifacts: self.total_artifacts,
            resets: self.resets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_common::mock::MockClock;

    fn stream() -> (RrStream, Arc<MockClock>) {
        let clock = MockClock::new();
        let stream = RrStream::new(StreamConfig::default(), clock.clone());
        (stream, clock)
    }

    #[test]
    fn test_accepts_physiological_intervals() {
        let (mut stream, _) = stream();
        assert_eq!(stream.push(800.0), None);
        assert_eq!(stream.push(820.0), None);
        assert_eq!(stream.snapshot().buffered, 2);
    }

    #[test]
    fn test_reset_event_rejects_gap_interval() {
        let (mut stream, _) = stream();
        stream.push(800.0);
        assert_eq!(
            stream.push(2500.0),
            Some(StreamEvent::Reset { rr_ms: 2500.0 })
        );
        assert_eq!(stream.snapshot().buffered, 1);
        // The rate-change chain still anchors on the last accepted beat
        assert_eq!(
            stream.push(1200.0),
            Some(StreamEvent::Artifact { rr_ms: 1200.0 })
        );
        assert_eq!(stream.push(900.0), None);
        assert_eq!(stream.snapshot().buffered, 2);
    }

    #[test]
    fn test_short_interval_is_artifact() {
        let (mut stream, _) = stream();
        assert_eq!(
            stream.push(200.0),
            Some(StreamEvent::Artifact { rr_ms: 200.0 })
        );
        assert_eq!(stream.snapshot().buffered, 0);
        assert_eq!(stream.snapshot().total_artifacts, 1);
    }

    #[test]
    fn test_steep_rate_change_is_artifact() {
        let (mut stream, _) = stream();
        stream.push(800.0);
        // 25% jump: rejected, buffer unchanged
        assert_eq!(
            stream.push(1000.0),
            Some(StreamEvent::Artifact { rr_ms: 1000.0 })
        );
        assert_eq!(stream.snapshot().buffered, 1);
        // 15% jump: accepted
        assert_eq!(stream.push(920.0), None);
        assert_eq!(stream.snapshot().buffered, 2);
    }

    #[test]
    fn test_fifo_trim_at_capacity() {
        let config = StreamConfig {
            capacity_max: 8,
            min_window: 100, // never ready in this test
            ..StreamConfig::default()
        };
        let mut stream = RrStream::new(config, MockClock::new());
        for i in 0..12 {
            stream.push(800.0 + i as f64);
        }
        assert_eq!(stream.snapshot().buffered, 8);
        assert_eq!(stream.peek()[0], 804.0);
    }

    #[test]
    fn test_ready_after_min_window() {
        let (mut stream, _) = stream();
        let mut ready = None;
        for i in 0..64 {
            ready = stream.push(800.0 + (i % 3) as f64);
        }
        assert_eq!(ready, Some(StreamEvent::Ready { buffered: 64 }));
    }

    #[test]
    fn test_debounce_blocks_back_to_back_windows() {
        let (mut stream, clock) = stream();
        for i in 0..64 {
            stream.push(800.0 + (i % 3) as f64);
        }
        stream.drain(0.5);

        // Refill to min_window immediately: still debounced
        for i in 0..32 {
            stream.push(800.0 + (i % 3) as f64);
        }
        assert!(!stream.is_ready());

        clock.advance(250);
        assert!(stream.is_ready());
    }

    #[test]
    fn test_drain_zero_clears_buffer() {
        let (mut stream, _) = stream();
        for _ in 0..64 {
            stream.push(800.0);
        }
        let window = stream.drain(0.0);
        assert_eq!(window.len(), 64);
        assert_eq!(stream.snapshot().buffered, 0);
    }

    #[test]
    fn test_drain_overlap_keeps_tail() {
        let (mut stream, _) = stream();
        for i in 0..64 {
            stream.push(800.0 + i as f64 * 0.5);
        }
        let window = stream.drain(0.25);
        assert_eq!(window.len(), 64);
        assert_eq!(stream.snapshot().buffered, 16);
        assert_eq!(stream.peek(), window[48..].to_vec());
    }

    #[test]
    fn test_drain_overlap_clamped_to_090() {
        let (mut stream, _) = stream();
        for _ in 0..64 {
            stream.push(800.0);
        }
        stream.drain(2.0);
        assert_eq!(stream.snapshot().buffered, 57); // floor(64 · 0.9)
    }

    #[test]
    fn test_reset_clears_and_records() {
        let (mut stream, clock) = stream();
        for _ in 0..10 {
            stream.push(800.0);
        }
        clock.set(5_000);
        stream.reset();
        assert_eq!(stream.snapshot().buffered, 0);
        assert_eq!(stream.snapshot().resets, 1);
        assert_eq!(stream.reset_times_ms(), vec![5_000]);

        // History capped at 10
        for _ in 0..15 {
            stream.reset();
        }
        assert_eq!(stream.reset_times_ms().len(), 10);
    }

    #[test]
    fn test_artifact_rate_per_window() {
        let (mut stream, _) = stream();
        stream.push(800.0);
        stream.push(200.0); // artifact
        stream.push(810.0);
        stream.push(250.0); // artifact
        let stats = stream.snapshot();
        assert!((stats.artifact_rate - 0.5).abs() < 1e-12);

        stream.drain(0.0);
        assert_eq!(stream.snapshot().artifact_rate, 0.0);
    }
}
