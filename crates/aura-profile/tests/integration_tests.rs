//! Integration tests for the profile store lifecycle

use aura_profile::*;
use chrono::{TimeZone, Utc};

#[test]
fn test_full_user_lifecycle() {
    let mut store = ProfileStore::new();

    // Lazy creation with demographic defaults
    let profile = store.get_or_create("marin");
    assert_eq!(profile.baseline.calibration, CalibrationStatus::Uncalibrated);

    // Calibrate across three sessions
    let rr: Vec<f64> = (0..120).map(|i| 820.0 + 25.0 * (i as f64 * 0.7).sin()).collect();
    let coherences: Vec<f64> = (0..60).map(|i| 0.3 + (i % 10) as f64 * 0.05).collect();
    store.process_calibration("marin", &rr, &coherences).unwrap();
    assert_eq!(
        store.get_baseline("marin").calibration,
        CalibrationStatus::Partial
    );

    store.process_calibration("marin", &rr, &coherences).unwrap();
    store.process_calibration("marin", &rr, &coherences).unwrap();
    let baseline = store.get_baseline("marin");
    assert_eq!(baseline.calibration, CalibrationStatus::Complete);
    assert!(baseline.coherence_floor < baseline.coherence_ceiling);

    // Persist, reload, and verify nothing drifted
    let json = store.to_json().unwrap();
    let restored = ProfileStore::from_json(&json).unwrap();
    assert_eq!(restored.get_baseline("marin"), baseline);
}

#[test]
fn test_scaling_invariants_across_preferences() {
    let mut store = ProfileStore::new();
    for (scale, user) in [(0.5, "a"), (1.0, "b"), (2.0, "c"), (5.0, "d")] {
        let mut profile = store.get_or_create(user);
        profile.preferences.thermal_intensity_scale = scale;
        profile.preferences.vibration_intensity_scale = scale;
        store.set(profile);
    }

    for user in ["a", "b", "c", "d", "unknown"] {
        for base in [0.0, 10.0, 35.0, 80.0, 200.0] {
            let thermal = store.scale_prescription(user, base, ScaleModality::Thermal);
            assert!((5.0..=60.0).contains(&thermal), "thermal {thermal}");
            let vibration = store.scale_prescription(user, base, ScaleModality::Vibration);
            assert!((5.0..=50.0).contains(&vibration), "vibration {vibration}");
        }
    }
}

#[test]
fn test_quiet_hours_block_activation() {
    let mut store = ProfileStore::new();
    let mut profile = store.get_or_create("marin");
    profile.preferences.quiet_hours = Some(QuietHours {
        start_hour: 22,
        end_hour: 7,
    });
    profile.preferences.timezone = "UTC".to_string();
    store.set(profile);

    let night = Utc.with_ymd_and_hms(2025, 6, 15, 23, 30, 0).unwrap();
    assert!(!store.can_activate_cue("marin", night));

    let afternoon = Utc.with_ymd_and_hms(2025, 6, 15, 14, 0, 0).unwrap();
    assert!(store.can_activate_cue("marin", afternoon));
}
