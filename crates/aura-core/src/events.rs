//! Typed event stream
//!
//! The upgrade path from the callbacks of old: subscribers receive typed
//! events over an unbounded channel and can lag or disappear without ever
//! blocking the processing path.

use aura_actuator::FaultKind;
use aura_cues::{Cue, SuppressReason};
use aura_hrv::Snapshot;
use serde::{Deserialize, Serialize};

/// Everything the core announces to the outside world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WellnessEvent {
    /// A window finished analysis
    Snapshot(Snapshot),

    /// A cue passed every gate and reached the actuators
    CueIssued(Cue),

    /// The cascade matched but a gate held the cue back
    CueSuppressed(SuppressReason),

    /// The thermal path latched a fault
    ActuatorFault(FaultKind),
}
