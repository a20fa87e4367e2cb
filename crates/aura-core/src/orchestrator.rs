//! Window-by-window wellness orchestration
//!
//! Exclusive owner of the RR stream, the analyzer configuration and the
//! snapshot history ring. Each `Ready` window drains through artifact
//! correction and the full metric chain into one immutable [`Snapshot`].

use crate::prescribe::{thermal_prescription, vibration_prescription};
use aura_common::{Clock, Prescription, StressLevel, ThermalPrescription, TrendDirection,
    VibrationPrescription};
use aura_hrv::{
    correct_artifacts, time_domain_metrics, trend_from_history, AdaptiveBands, FrequencyAnalyzer,
    FrequencyConfig, RespiratoryDetection, Snapshot, SnapshotDiagnostics, StreamStateSummary,
    StressClassifier,
};
use aura_profile::{ProfileStore, ScaleModality};
use aura_stream::{RrStream, StreamConfig, StreamEvent};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Snapshot history high-water mark.
const HISTORY_CAP: usize = 1000;

/// History length after a trim.
const HISTORY_TRIM_TO: usize = 500;

/// Respiratory detections below this confidence never touch the baseline.
const RESP_BASELINE_CONFIDENCE_MIN: f32 = 0.5;

/// Orchestrator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_user_id")]
    pub user_id: String,

    #[serde(default)]
    pub stream: StreamConfig,

    #[serde(default)]
    pub frequency: FrequencyConfig,

    /// Window overlap retained across drains, clamped to [0, 0.9]
    #[serde(default = "default_overlap")]
    pub overlap: f64,
}

fn default_user_id() -> String {
    "default".to_string()
}

fn default_overlap() -> f64 {
    0.5
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            stream: StreamConfig::default(),
            frequency: FrequencyConfig::default(),
            overlap: default_overlap(),
        }
    }
}

/// Drives the analysis pipeline window by window.
pub struct WellnessOrchestrator {
    config: OrchestratorConfig,
    stream: RrStream,
    analyzer: FrequencyAnalyzer,
    classifier: StressClassifier,
    history: VecDeque<Snapshot>,
    profiles: Arc<RwLock<ProfileStore>>,
}

impl WellnessOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        clock: Arc<dyn Clock>,
        profiles: Arc<RwLock<ProfileStore>>,
    ) -> Self {
        let stream = RrStream::new(config.stream, clock);
        let analyzer = FrequencyAnalyzer::new(config.frequency);
        Self {
            config,
            stream,
            analyzer,
            classifier: StressClassifier,
            history: VecDeque::new(),
            profiles,
        }
    }

    /// Push one RR interval; a `Snapshot` comes back whenever the stream
    /// declares a window ready.
    pub async fn ingest(&mut self, rr_ms: u16) -> Option<Snapshot> {
        match self.stream.push(rr_ms as f64) {
            Some(StreamEvent::Ready { buffered }) => {
                debug!(buffered, "window ready");
                let stats = self.stream.snapshot();
                let window = self.stream.drain(self.config.overlap);
                Some(self.process_window(window, stats.artifact_rate).await)
            }
            _ => None,
        }
    }

    /// Push a batch in order, collecting every snapshot produced.
    pub async fn ingest_batch(&mut self, rrs_ms: &[u16]) -> Vec<Snapshot> {
        let mut snapshots = Vec::new();
        for &rr in rrs_ms {
            if let Some(snapshot) = self.ingest(rr).await {
                snapshots.push(snapshot);
            }
        }
        snapshots
    }

    /// Run the full metric chain over one raw window.
    ///
    /// Public so recorded windows can be replayed without a stream.
    pub async fn process_window(
        &mut self,
        window: Vec<f64>,
        stream_artifact_rate: f64,
    ) -> Snapshot {
        let report = correct_artifacts(&window);
        let clean_fraction = report.clean_fraction(window.len());

        if !report.is_acceptable(window.len()) {
            warn!(
                window = window.len(),
                clean = report.cleaned.len(),
                "window refused: too few clean samples"
            );
            return self.finish(self.degraded_snapshot(&window, &report.cleaned, clean_fraction));
        }

        let cleaned = report.cleaned;
        let Some(time) = time_domain_metrics(&cleaned) else {
            return self.finish(self.degraded_snapshot(&window, &cleaned, clean_fraction));
        };

        let correction_rate = report.artifacts.len() as f64 / window.len().max(1) as f64;
        let artifact_rate = (stream_artifact_rate + correction_rate).min(1.0);

        let freq = self.analyzer.analyze(&cleaned);
        let fs = self.analyzer.config().resample_fs_hz;
        let outcome = self
            .classifier
            .classify(&cleaned, &time, &freq, artifact_rate, fs);

        let trend = if self.history.len() >= 2 {
            let third_most_recent = &self.history[self.history.len() - 2];
            trend_from_history(
                outcome.micro_variability,
                third_most_recent.micro_variability as f64,
            )
        } else {
            TrendDirection::Stable
        };

        let prescription = self
            .embed_prescription(outcome.load_score, outcome.coherence, outcome.confidence)
            .await;
        self.feed_respiratory_baseline(&freq.respiratory_detection)
            .await;

        let snapshot = Snapshot {
            processed_at: Utc::now(),
            stream_state: StreamStateSummary {
                buffered: self.stream.snapshot().buffered,
                artifact_rate: artifact_rate as f32,
            },
            load_score: outcome.load_score,
            stress_level: outcome.stress_level,
            coherence: outcome.coherence as f32,
            micro_variability: outcome.micro_variability as f32,
            confidence: outcome.confidence as f32,
            trend,
            adaptive_bands: freq.adaptive_bands,
            respiratory_detection: freq.respiratory_detection,
            prescription,
            diagnostics: SnapshotDiagnostics {
                window_len: window.len(),
                clean_len: cleaned.len(),
                clean_fraction: clean_fraction as f32,
                artifact_count: report.artifacts.len() + report.out_of_bounds.len(),
                degraded: false,
                relaxation_suggested: prescription.thermal.is_some(),
                drift: outcome.drift as f32,
                stress_score: outcome.stress_score,
                sample_entropy: outcome.sample_entropy as f32,
                mean_rr_ms: time.mean_rr_ms as f32,
                rmssd_ms: time.rmssd as f32,
            },
        };

        info!(
            stress = ?snapshot.stress_level,
            coherence = snapshot.coherence,
            confidence = snapshot.confidence,
            load = snapshot.load_score,
            "snapshot emitted"
        );
        self.finish(snapshot)
    }

    /// Most recent snapshot, if any window has completed.
    pub fn latest(&self) -> Option<&Snapshot> {
        self.history.back()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Discard buffered samples without emitting anything.
    pub fn reset_stream(&mut self) {
        self.stream.reset();
    }

    /// Read-only stream statistics.
    pub fn stream_stats(&self) -> aura_stream::StreamStats {
        self.stream.snapshot()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    fn finish(&mut self, snapshot: Snapshot) -> Snapshot {
        self.history.push_back(snapshot.clone());
        if self.history.len() > HISTORY_CAP {
            let excess = self.history.len() - HISTORY_TRIM_TO;
            self.history.drain(..excess);
            debug!(trimmed_to = self.history.len(), "history trimmed");
        }
        snapshot
    }

    /// Neutral snapshot for a window that failed the clean-fraction gate:
    /// moderate defaults, confidence pinned to signal quality, nothing
    /// prescribed.
    fn degraded_snapshot(
        &self,
        window: &[f64],
        cleaned: &[f64],
        clean_fraction: f64,
    ) -> Snapshot {
        Snapshot {
            processed_at: Utc::now(),
            stream_state: StreamStateSummary {
                buffered: self.stream.snapshot().buffered,
                artifact_rate: (1.0 - clean_fraction) as f32,
            },
            load_score: 50,
            stress_level: StressLevel::Moderate,
            coherence: 0.5,
            micro_variability: 0.0,
            confidence: clean_fraction as f32,
            trend: TrendDirection::Stable,
            adaptive_bands: AdaptiveBands::standard(),
            respiratory_detection: RespiratoryDetection::default(),
            prescription: Prescription::default(),
            diagnostics: SnapshotDiagnostics {
                window_len: window.len(),
                clean_len: cleaned.len(),
                clean_fraction: clean_fraction as f32,
                artifact_count: window.len().saturating_sub(cleaned.len()),
                degraded: true,
                ..SnapshotDiagnostics::default()
            },
        }
    }

    /// Generate prescriptions and let the profile store personalize them.
    async fn embed_prescription(
        &self,
        load_score: u8,
        coherence: f64,
        confidence: f64,
    ) -> Prescription {
        let store = self.profiles.read().await;
        let user = &self.config.user_id;
        let preferences = store
            .get(user)
            .map(|p| p.preferences)
            .unwrap_or_default();

        let mut prescription = Prescription::default();

        if preferences.thermal_enabled {
            if let Some(thermal) = thermal_prescription(load_score, coherence, confidence) {
                prescription.thermal = Some(ThermalPrescription {
                    intensity_pct: store.scale_prescription(
                        user,
                        thermal.intensity_pct as f64,
                        ScaleModality::Thermal,
                    ) as f32,
                    duration_s: (store.scale_duration(user, thermal.duration_s as u64 * 1_000)
                        / 1_000) as u32,
                });
            }
        }

        if preferences.vibration_enabled {
            if let Some(vibration) = vibration_prescription(load_score, coherence, confidence) {
                prescription.vibration = Some(VibrationPrescription {
                    pattern_id: vibration.pattern_id,
                    intensity_pct: store.scale_prescription(
                        user,
                        vibration.intensity_pct as f64,
                        ScaleModality::Vibration,
                    ) as f32,
                });
            }
        }

        prescription
    }

    /// Fold confident respiratory detections into the user's baseline.
    async fn feed_respiratory_baseline(&self, detection: &RespiratoryDetection) {
        if detection.confidence < RESP_BASELINE_CONFIDENCE_MIN {
            return;
        }
        let Some(frequency_hz) = detection.frequency_hz else {
            return;
        };
        let rate_cpm = frequency_hz as f64 * 60.0;
        self.profiles
            .write()
            .await
            .update_respiratory_baseline(&self.config.user_id, rate_cpm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_common::mock::MockClock;

    fn orchestrator() -> WellnessOrchestrator {
        WellnessOrchestrator::new(
            OrchestratorConfig::default(),
            MockClock::new(),
            Arc::new(RwLock::new(ProfileStore::new())),
        )
    }

    fn rr_sine(n: usize, base: f64, amp: f64, omega: f64) -> Vec<u16> {
        (0..n)
            .map(|i| (base + amp * (i as f64 * omega).sin()) as u16)
            .collect()
    }

    #[tokio::test]
    async fn test_snapshot_after_full_window() {
        let mut orchestrator = orchestrator();
        let snapshots = orchestrator
            .ingest_batch(&rr_sine(80, 850.0, 50.0, 1.335))
            .await;
        assert!(!snapshots.is_empty());
        let snapshot = &snapshots[0];
        assert!(!snapshot.diagnostics.degraded);
        assert!(snapshot.coherence > 0.8);
        assert!(orchestrator.latest().is_some());
    }

    #[tokio::test]
    async fn test_degraded_window_has_no_prescription() {
        let mut orchestrator = orchestrator();
        // Replay a recorded window where half the beats are non-physiological
        let mut window = vec![800.0; 40];
        for i in (0..40).step_by(2) {
            window[i] = 150.0;
        }
        let snapshot = orchestrator.process_window(window, 0.0).await;
        assert!(snapshot.diagnostics.degraded);
        assert!(snapshot.prescription.is_empty());
        assert_eq!(snapshot.stress_level, StressLevel::Moderate);
        assert!(snapshot.confidence <= 0.5 + 1e-6);
    }

    #[tokio::test]
    async fn test_history_trims_at_cap() {
        let mut orchestrator = orchestrator();
        let window: Vec<f64> = (0..64).map(|i| 800.0 + (i % 3) as f64).collect();
        for _ in 0..1_001 {
            orchestrator.process_window(window.clone(), 0.0).await;
        }
        assert!(orchestrator.history_len() <= 1_000);
        assert!(orchestrator.history_len() >= 500);
    }

    #[tokio::test]
    async fn test_respiratory_baseline_updates_from_detection() {
        let profiles = Arc::new(RwLock::new(ProfileStore::new()));
        let mut orchestrator = WellnessOrchestrator::new(
            OrchestratorConfig::default(),
            MockClock::new(),
            profiles.clone(),
        );
        orchestrator
            .ingest_batch(&rr_sine(80, 850.0, 50.0, 1.335))
            .await;

        let baseline = profiles.read().await.get_baseline("default");
        // One EMA step from 15 cpm toward the detected ~15 breaths/min
        // (0.25 Hz): the value moves, and stays physiological
        assert!(baseline.respiratory_rate_cpm > 5.0);
        assert!(baseline.respiratory_rate_cpm < 30.0);
    }
}
