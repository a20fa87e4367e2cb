//! Aura Core – the wellness orchestrator
//!
//! Owns the data path end to end: RR intervals stream in, windows drain
//! through artifact correction and the HRV analyzers, snapshots feed the
//! cue engine, and accepted cues land on the actuator scheduler. All
//! mutable state has exactly one owner; everything components share is
//! either an immutable snapshot or the read-mostly profile store.
//!
//! ```text
//! RR (u16 ms) → RrStream ─Ready→ Orchestrator ─Snapshot→ CueEngine
//!                                     │                      │
//!                                 ProfileStore ──────────────┤
//!                                                            ▼
//!                                                  ActuatorScheduler
//! ```

mod events;
mod orchestrator;
mod prescribe;
mod wellness;

pub use crate::wellness::{CoreOutcome, WellnessCore, WellnessCoreConfig};
pub use events::WellnessEvent;
pub use orchestrator::{OrchestratorConfig, WellnessOrchestrator};
pub use prescribe::{thermal_prescription, vibration_prescription};
