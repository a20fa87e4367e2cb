//! Integration and property tests for the RR stream gate

use aura_common::mock::MockClock;
use aura_stream::{RrStream, StreamConfig, StreamEvent};
use proptest::prelude::*;

#[test]
fn test_window_lifecycle_end_to_end() {
    let clock = MockClock::new();
    let mut stream = RrStream::new(StreamConfig::default(), clock.clone());

    // A minute of slightly varying beats
    let mut ready_count = 0;
    for i in 0..80 {
        let rr = 800.0 + 30.0 * ((i as f64) * 0.4).sin();
        if matches!(stream.push(rr), Some(StreamEvent::Ready { .. })) {
            ready_count += 1;
        }
    }
    assert!(ready_count > 0, "stream should signal readiness");

    let window = stream.drain(0.5);
    assert_eq!(window.len(), 80);
    assert_eq!(stream.snapshot().buffered, 40);

    // Next window reuses the retained tail
    clock.advance(300);
    for i in 0..24 {
        stream.push(800.0 + (i % 4) as f64);
    }
    assert!(stream.is_ready());
}

#[test]
fn test_drain_zero_always_empties() {
    let mut stream = RrStream::new(StreamConfig::default(), MockClock::new());
    for _ in 0..100 {
        stream.push(750.0);
    }
    stream.drain(0.0);
    assert_eq!(stream.snapshot().buffered, 0);
    assert!(stream.peek().is_empty());
}

proptest! {
    #[test]
    fn prop_accepted_samples_stay_physiological(
        rrs in prop::collection::vec(100.0f64..2600.0, 0..300)
    ) {
        let mut stream = RrStream::new(StreamConfig::default(), MockClock::new());
        stream.push_batch(&rrs);
        for &rr in &stream.peek() {
            prop_assert!((300.0..=2000.0).contains(&rr));
        }
    }

    #[test]
    fn prop_accepted_neighbors_within_rate_change(
        rrs in prop::collection::vec(100.0f64..2600.0, 0..300)
    ) {
        let mut stream = RrStream::new(StreamConfig::default(), MockClock::new());
        stream.push_batch(&rrs);
        for pair in stream.peek().windows(2) {
            prop_assert!((pair[1] - pair[0]).abs() / pair[0] <= 0.20 + 1e-9);
        }
    }

    #[test]
    fn prop_buffer_never_exceeds_capacity(
        rrs in prop::collection::vec(700.0f64..900.0, 0..600)
    ) {
        let mut stream = RrStream::new(StreamConfig::default(), MockClock::new());
        for &rr in &rrs {
            stream.push(rr);
            prop_assert!(stream.snapshot().buffered <= 256);
        }
    }

    #[test]
    fn prop_drain_overlap_retention(
        overlap in 0.0f64..1.5,
        count in 10usize..200
    ) {
        let mut stream = RrStream::new(StreamConfig::default(), MockClock::new());
        for _ in 0..count {
            stream.push(800.0);
        }
        let buffered = stream.snapshot().buffered;
        stream.drain(overlap);
        let expected = (buffered as f64 * overlap.clamp(0.0, 0.9)).floor() as usize;
        prop_assert_eq!(stream.snapshot().buffered, expected);
    }
}
