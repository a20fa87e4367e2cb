use crate::thermal::FaultKind;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ActuatorError {
    #[error("intensity {0}% is out of range")]
    IntensityOutOfRange(u8),

    #[error("intensity {0}% is below the perceptible floor")]
    Imperceptible(u8),

    #[error("duration {0} ms exceeds the command cap")]
    DurationTooLong(u64),

    #[error("a higher-priority cue is active")]
    LowerPriority,

    #[error("thermal path is in mandatory cooldown")]
    CoolingDown,

    #[error("thermal fault latched: {0:?}")]
    ThermalFault(FaultKind),

    #[error("skin temperature {0} °C is too high to clear the fault")]
    UnsafeClear(f32),

    #[error("no fault to clear")]
    NoFault,
}

pub type Result<T> = std::result::Result<T, ActuatorError>;
