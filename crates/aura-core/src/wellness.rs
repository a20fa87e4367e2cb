//! Top-level wiring: stream → orchestrator → cue engine → scheduler
//!
//! `WellnessCore` owns every component and enforces the unidirectional
//! data flow. The profile store is the one shared resource, read-mostly
//! behind an async lock; the store itself remains the sole mutator of
//! user data.

use crate::events::WellnessEvent;
use crate::orchestrator::{OrchestratorConfig, WellnessOrchestrator};
use aura_actuator::{ActuatorScheduler, FaultKind};
use aura_common::{Clock, OutputPort, TemperatureSource};
use aura_cues::{CueContext, CueDecision, CueEngine, SuppressReason};
use aura_hrv::Snapshot;
use aura_profile::ProfileStore;
use aura_wire::CoherencePacket;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WellnessCoreConfig {
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// What one ingested interval produced.
#[derive(Debug, Clone)]
pub struct CoreOutcome {
    pub snapshot: Snapshot,
    pub decision: CueDecision,
}

/// The assembled wellness core.
pub struct WellnessCore {
    orchestrator: WellnessOrchestrator,
    cue_engine: CueEngine,
    scheduler: ActuatorScheduler,
    profiles: Arc<RwLock<ProfileStore>>,
    clock: Arc<dyn Clock>,
    user_id: String,
    subscribers: Vec<mpsc::UnboundedSender<WellnessEvent>>,
    fault_announced: bool,
}

impl WellnessCore {
    /// Assemble the core against injected capability ports.
    pub fn new(
        config: WellnessCoreConfig,
        vibration_port: Box<dyn OutputPort>,
        thermal_port: Box<dyn OutputPort>,
        temperature: Arc<dyn TemperatureSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let profiles = Arc::new(RwLock::new(ProfileStore::new()));
        let user_id = config.orchestrator.user_id.clone();
        let orchestrator =
            WellnessOrchestrator::new(config.orchestrator, clock.clone(), profiles.clone());
        let scheduler = ActuatorScheduler::new(vibration_port, thermal_port, temperature);
        Self {
            orchestrator,
            cue_engine: CueEngine::new(),
            scheduler,
            profiles,
            clock,
            user_id,
            subscribers: Vec::new(),
            fault_announced: false,
        }
    }

    /// Shared handle to the profile store (the sole mutator of user data).
    pub fn profiles(&self) -> Arc<RwLock<ProfileStore>> {
        self.profiles.clone()
    }

    /// Replace the profile store from a persisted envelope. The platform
    /// owns storage; this is the load seam it calls on boot.
    pub async fn import_profiles(&self, json: &str) -> anyhow::Result<()> {
        let store = ProfileStore::from_json(json)?;
        *self.profiles.write().await = store;
        info!("profile store imported");
        Ok(())
    }

    /// Serialize the profile store for the platform to persist.
    pub async fn export_profiles(&self) -> anyhow::Result<String> {
        Ok(self.profiles.read().await.to_json()?)
    }

    /// Subscribe to the typed event stream.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<WellnessEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Ingest one RR interval. `hour` is the wearer's local hour, injected
    /// so the cue engine never consults a wall clock.
    pub async fn ingest(&mut self, rr_ms: u16, hour: u8) -> Option<CoreOutcome> {
        let snapshot = self.orchestrator.ingest(rr_ms).await?;
        self.publish(WellnessEvent::Snapshot(snapshot.clone()));
        let decision = self.decide_and_apply(&snapshot, hour).await;
        Some(CoreOutcome { snapshot, decision })
    }

    /// Ingest a batch in order.
    pub async fn ingest_batch(&mut self, rrs_ms: &[u16], hour: u8) -> Vec<CoreOutcome> {
        let mut outcomes = Vec::new();
        for &rr in rrs_ms {
            if let Some(outcome) = self.ingest(rr, hour).await {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    /// Periodic driver for the actuator paths.
    pub fn tick(&mut self, now_ms: u64) {
        self.scheduler.tick(now_ms);
        match self.scheduler.thermal_fault() {
            Some(kind) if !self.fault_announced => {
                self.fault_announced = true;
                self.publish(WellnessEvent::ActuatorFault(kind));
            }
            None => self.fault_announced = false,
            _ => {}
        }
    }

    /// Immediately silence the actuators; thermal cools down if it was hot.
    pub fn stop_all(&mut self) {
        self.scheduler.stop_all(self.clock.now_ms());
    }

    /// Clear cue history; the next eligible cue bypasses cooldowns.
    pub fn reset_cue_engine(&mut self) {
        self.cue_engine.reset();
    }

    /// Discard buffered RR samples without emitting snapshots.
    pub fn reset_stream(&mut self) {
        self.orchestrator.reset_stream();
    }

    /// Latched thermal fault for the device-state error flags.
    pub fn thermal_fault(&self) -> Option<FaultKind> {
        self.scheduler.thermal_fault()
    }

    /// Explicitly clear a latched thermal fault.
    pub fn clear_thermal_fault(&mut self) -> aura_actuator::Result<()> {
        self.scheduler.clear_thermal_fault(self.clock.now_ms())
    }

    /// Direct BLE actuator write (already clamped at the wire layer).
    pub fn apply_ble(
        &mut self,
        thermal_pct: u8,
        thermal_duration_s: u8,
        vibration_pattern: u8,
        vibration_pct: u8,
    ) -> aura_actuator::Result<()> {
        self.scheduler.apply_ble(
            thermal_pct,
            thermal_duration_s,
            vibration_pattern,
            vibration_pct,
            self.clock.now_ms(),
        )
    }

    /// The 12-byte coherence notify record for the latest snapshot.
    pub fn coherence_packet(&self) -> Option<CoherencePacket> {
        let snapshot = self.orchestrator.latest()?;
        let resp_cpm_x10 = snapshot
            .respiratory_detection
            .frequency_hz
            .map(|hz| (hz * 600.0).round() as u16)
            .unwrap_or(0);
        Some(CoherencePacket {
            stress: snapshot.load_score,
            coherence: (snapshot.coherence * 100.0).round() as u8,
            confidence: (snapshot.confidence * 100.0).round() as u8,
            variability: (snapshot.micro_variability * 100.0).round() as u8,
            mean_rr_ms: snapshot.diagnostics.mean_rr_ms.round() as u16,
            rmssd_ms: snapshot.diagnostics.rmssd_ms.round() as u16,
            resp_rate_cpm_x10: resp_cpm_x10,
            reserved: 0,
        })
    }

    pub fn latest_snapshot(&self) -> Option<&Snapshot> {
        self.orchestrator.latest()
    }

    async fn decide_and_apply(&mut self, snapshot: &Snapshot, hour: u8) -> CueDecision {
        let preferences = {
            let store = self.profiles.read().await;
            store
                .get(&self.user_id)
                .map(|p| p.preferences)
                .unwrap_or_default()
        };

        let ctx = CueContext {
            stress_pct: snapshot.load_score,
            coherence_pct: (snapshot.coherence * 100.0).round() as u8,
            confidence_pct: (snapshot.confidence * 100.0).round() as u8,
            micro_var_scaled: (snapshot.micro_variability * 10_000.0).round() as u32,
            artifact_rate: snapshot.stream_state.artifact_rate,
            hour,
            now_ms: self.clock.now_ms(),
        };

        let decision = self.cue_engine.decide(&ctx, &preferences);
        match decision {
            CueDecision::Emit(cue) => {
                // Quiet hours were already settled by the cascade from the
                // injected hour; the store only arbitrates the daily cap.
                let now_utc = Utc::now();
                let allowed = self
                    .profiles
                    .read()
                    .await
                    .under_daily_cap(&self.user_id, now_utc);
                if !allowed {
                    debug!("cue blocked by daily activation policy");
                    self.publish(WellnessEvent::CueSuppressed(SuppressReason::RateLimited));
                    return CueDecision::Suppressed(SuppressReason::RateLimited);
                }

                match self.scheduler.apply(cue.into(), ctx.now_ms) {
                    Ok(()) => {
                        self.profiles
                            .write()
                            .await
                            .record_activation(&self.user_id, now_utc);
                        info!(cue_type = ?cue.cue_type, "cue delivered to actuators");
                        self.publish(WellnessEvent::CueIssued(cue));
                        CueDecision::Emit(cue)
                    }
                    Err(err) => {
                        warn!(%err, "actuator rejected cue");
                        if let aura_actuator::ActuatorError::ThermalFault(kind) = err {
                            self.publish(WellnessEvent::ActuatorFault(kind));
                        }
                        self.publish(WellnessEvent::CueSuppressed(SuppressReason::CoolingDown));
                        CueDecision::Suppressed(SuppressReason::CoolingDown)
                    }
                }
            }
            CueDecision::Suppressed(reason) => {
                self.publish(WellnessEvent::CueSuppressed(reason));
                CueDecision::Suppressed(reason)
            }
            CueDecision::Idle => CueDecision::Idle,
        }
    }

    fn publish(&mut self, event: WellnessEvent) {
        self.subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}
