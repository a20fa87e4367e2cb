//! Aura Wire – packed records crossing the BLE boundary
//!
//! The transport itself lives outside the core; this crate only defines
//! the byte-exact record layouts (little-endian throughout), the service
//! constants and the device error-flag bits, with encode/decode pairs the
//! integration wraps in whatever GATT stack the platform provides.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Primary GATT service UUID. Characteristic UUIDs increment the last
/// group.
pub const PRIMARY_SERVICE_UUID: &str = "4e2a6c10-9f44-4b2e-9d31-5c7e1a0b0001";

// Vibration pattern ids shared with the actuator control record
pub const VIB_PATTERN_OFF: u8 = 0;
pub const VIB_PATTERN_SINGLE: u8 = 1;
pub const VIB_PATTERN_DOUBLE: u8 = 2;
pub const VIB_PATTERN_TRIPLE: u8 = 3;
pub const VIB_PATTERN_HEARTBEAT: u8 = 4;
pub const VIB_PATTERN_BREATHING: u8 = 5;
pub const VIB_PATTERN_ALERT: u8 = 6;

// Device-state error-flag bits. Bits 5–7 are reserved.
pub const ERR_PPG: u8 = 1 << 0;
pub const ERR_TEMP_SENSOR: u8 = 1 << 1;
pub const ERR_BATTERY_LOW: u8 = 1 << 2;
pub const ERR_THERMAL_FAULT: u8 = 1 << 3;
pub const ERR_STORAGE_FULL: u8 = 1 << 4;

/// Maximum RR intervals per notify payload.
pub const RR_MAX_INTERVALS: usize = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("payload truncated: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },

    #[error("RR payload length {0} is not a multiple of two")]
    OddLength(usize),

    #[error("RR payload carries {0} intervals, the cap is 10")]
    TooManyIntervals(usize),

    #[error("RR payload is empty")]
    Empty,

    #[error("{field} value {value} is out of range")]
    FieldOutOfRange { field: &'static str, value: u8 },
}

pub type Result<T> = std::result::Result<T, WireError>;

// ============================================================================
// RR characteristic (notify): little-endian u16 array, 2–20 bytes
// ============================================================================

/// Decode an RR notify payload into interval milliseconds.
pub fn decode_rr_payload(payload: &[u8]) -> Result<Vec<u16>> {
    if payload.is_empty() {
        return Err(WireError::Empty);
    }
    if payload.len() % 2 != 0 {
        return Err(WireError::OddLength(payload.len()));
    }
    let count = payload.len() / 2;
    if count > RR_MAX_INTERVALS {
        return Err(WireError::TooManyIntervals(count));
    }
    Ok(payload
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Encode up to ten RR intervals for the notify characteristic.
pub fn encode_rr_payload(intervals_ms: &[u16]) -> Result<Vec<u8>> {
    if intervals_ms.is_empty() {
        return Err(WireError::Empty);
    }
    if intervals_ms.len() > RR_MAX_INTERVALS {
        return Err(WireError::TooManyIntervals(intervals_ms.len()));
    }
    let mut out = Vec::with_capacity(intervals_ms.len() * 2);
    for &rr in intervals_ms {
        out.extend_from_slice(&rr.to_le_bytes());
    }
    Ok(out)
}

// ============================================================================
// Coherence characteristic (notify): 12-byte packed record
// ============================================================================

/// Per-window wellness summary pushed to the companion app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoherencePacket {
    pub stress: u8,
    pub coherence: u8,
    pub confidence: u8,
    pub variability: u8,
    pub mean_rr_ms: u16,
    pub rmssd_ms: u16,
    /// Breaths per minute × 10
    pub resp_rate_cpm_x10: u16,
    pub reserved: u16,
}

impl CoherencePacket {
    pub const SIZE: usize = 12;

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0] = self.stress;
        out[1] = self.coherence;
        out[2] = self.confidence;
        out[3] = self.variability;
        out[4..6].copy_from_slice(&self.mean_rr_ms.to_le_bytes());
        out[6..8].copy_from_slice(&self.rmssd_ms.to_le_bytes());
        out[8..10].copy_from_slice(&self.resp_rate_cpm_x10.to_le_bytes());
        out[10..12].copy_from_slice(&self.reserved.to_le_bytes());
        out
    }

    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() < Self::SIZE {
            return Err(WireError::Truncated {
                expected: Self::SIZE,
                got: payload.len(),
            });
        }
        Ok(Self {
            stress: payload[0],
            coherence: payload[1],
            confidence: payload[2],
            variability: payload[3],
            mean_rr_ms: u16::from_le_bytes([payload[4], payload[5]]),
            rmssd_ms: u16::from_le_bytes([payload[6], payload[7]]),
            resp_rate_cpm_x10: u16::from_le_bytes([payload[8], payload[9]]),
            reserved: u16::from_le_bytes([payload[10], payload[11]]),
        })
    }
}

// ============================================================================
// Actuator control characteristic (write): 4-byte record
// ============================================================================

/// Direct actuator request from the companion app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorControl {
    pub thermal_pct: u8,
    pub thermal_duration_s: u8,
    pub vibration_pattern: u8,
    pub vibration_pct: u8,
}

impl ActuatorControl {
    pub const SIZE: usize = 4;

    pub fn encode(&self) -> [u8; Self::SIZE] {
        [
            self.thermal_pct,
            self.thermal_duration_s,
            self.vibration_pattern,
            self.vibration_pct,
        ]
    }

    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() < Self::SIZE {
            return Err(WireError::Truncated {
                expected: Self::SIZE,
                got: payload.len(),
            });
        }
        Ok(Self {
            thermal_pct: payload[0],
            thermal_duration_s: payload[1],
            vibration_pattern: payload[2],
            vibration_pct: payload[3],
        })
    }

    /// Clamp the request into the configured maxima before it reaches the
    /// scheduler.
    pub fn clamped(&self, thermal_max_pct: u8, vibration_max_pct: u8) -> Self {
        Self {
            thermal_pct: self.thermal_pct.min(thermal_max_pct),
            thermal_duration_s: self.thermal_duration_s.min(60),
            vibration_pattern: self.vibration_pattern.min(VIB_PATTERN_ALERT),
            vibration_pct: self.vibration_pct.min(vibration_max_pct),
        }
    }
}

// ============================================================================
// Device-state characteristic (read + notify): 8-byte record
// ============================================================================

/// Device health summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    pub battery_pct: u8,
    pub charging_state: u8,
    pub connection_state: u8,
    pub streaming_flags: u8,
    pub skin_temp_c: i8,
    pub error_flags: u8,
    pub uptime_min: u16,
}

impl DeviceState {
    pub const SIZE: usize = 8;

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0] = self.battery_pct;
        out[1] = self.charging_state;
        out[2] = self.connection_state;
        out[3] = self.streaming_flags;
        out[4] = self.skin_temp_c as u8;
        out[5] = self.error_flags;
        out[6..8].copy_from_slice(&self.uptime_min.to_le_bytes());
        out
    }

    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() < Self::SIZE {
            return Err(WireError::Truncated {
                expected: Self::SIZE,
                got: payload.len(),
            });
        }
        Ok(Self {
            battery_pct: payload[0],
            charging_state: payload[1],
            connection_state: payload[2],
            streaming_flags: payload[3],
            skin_temp_c: payload[4] as i8,
            error_flags: payload[5],
            uptime_min: u16::from_le_bytes([payload[6], payload[7]]),
        })
    }
}

// ============================================================================
// Configuration characteristic (read + write): 16-byte record
// ============================================================================

/// Device configuration, validated on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRecord {
    /// RR streaming rate, 1..=10 Hz
    pub stream_rate_hz: u8,
    /// Coherence notify interval, 5..=60 s
    pub coherence_update_s: u8,
    pub thermal_max_pct: u8,
    pub vibration_max_pct: u8,
    pub quiet_start_h: u8,
    pub quiet_end_h: u8,
    pub led_brightness: u8,
    pub reserved: [u8; 9],
}

impl Default for ConfigRecord {
    fn default() -> Self {
        Self {
            stream_rate_hz: 4,
            coherence_update_s: 30,
            thermal_max_pct: 60,
            vibration_max_pct: 50,
            quiet_start_h: 22,
            quiet_end_h: 7,
            led_brightness: 128,
            reserved: [0; 9],
        }
    }
}

impl ConfigRecord {
    pub const SIZE: usize = 16;

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0] = self.stream_rate_hz;
        out[1] = self.coherence_update_s;
        out[2] = self.thermal_max_pct;
        out[3] = self.vibration_max_pct;
        out[4] = self.quiet_start_h;
        out[5] = self.quiet_end_h;
        out[6] = self.led_brightness;
        out[7..16].copy_from_slice(&self.reserved);
        out
    }

    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() < Self::SIZE {
            return Err(WireError::Truncated {
                expected: Self::SIZE,
                got: payload.len(),
            });
        }
        let record = Self {
            stream_rate_hz: payload[0],
            coherence_update_s: payload[1],
            thermal_max_pct: payload[2],
            vibration_max_pct: payload[3],
            quiet_start_h: payload[4],
            quiet_end_h: payload[5],
            led_brightness: payload[6],
            reserved: payload[7..16].try_into().expect("slice length checked"),
        };
        record.validate()?;
        Ok(record)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=10).contains(&self.stream_rate_hz) {
            return Err(WireError::FieldOutOfRange {
                field: "stream_rate_hz",
                value: self.stream_rate_hz,
            });
        }
        if !(5..=60).contains(&self.coherence_update_s) {
            return Err(WireError::FieldOutOfRange {
                field: "coherence_update_s",
                value: self.coherence_update_s,
            });
        }
        if self.thermal_max_pct > 100 {
            return Err(WireError::FieldOutOfRange {
                field: "thermal_max_pct",
                value: self.thermal_max_pct,
            });
        }
        if self.vibration_max_pct > 100 {
            return Err(WireError::FieldOutOfRange {
                field: "vibration_max_pct",
                value: self.vibration_max_pct,
            });
        }
        if self.quiet_start_h > 23 {
            return Err(WireError::FieldOutOfRange {
                field: "quiet_start_h",
                value: self.quiet_start_h,
            });
        }
        if self.quiet_end_h > 23 {
            return Err(WireError::FieldOutOfRange {
                field: "quiet_end_h",
                value: self.quiet_end_h,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_uuid_suffix() {
        assert!(PRIMARY_SERVICE_UUID.ends_with("0001"));
    }

    #[test]
    fn test_rr_payload_round_trip() {
        let intervals = vec![812u16, 795, 1020, 640];
        let payload = encode_rr_payload(&intervals).unwrap();
        assert_eq!(payload.len(), 8);
        assert_eq!(decode_rr_payload(&payload).unwrap(), intervals);
    }

    #[test]
    fn test_rr_payload_little_endian() {
        let payload = encode_rr_payload(&[0x0102]).unwrap();
        assert_eq!(payload, vec![0x02, 0x01]);
    }

    #[test]
    fn test_rr_payload_rejects_bad_shapes() {
        assert_eq!(decode_rr_payload(&[]), Err(WireError::Empty));
        assert_eq!(decode_rr_payload(&[1, 2, 3]), Err(WireError::OddLength(3)));
        let too_many = vec![0u8; 22];
        assert_eq!(
            decode_rr_payload(&too_many),
            Err(WireError::TooManyIntervals(11))
        );
        assert!(encode_rr_payload(&[0u16; 11]).is_err());
    }

    #[test]
    fn test_coherence_packet_round_trip() {
        let packet = CoherencePacket {
            stress: 42,
            coherence: 77,
            confidence: 91,
            variability: 12,
            mean_rr_ms: 843,
            rmssd_ms: 47,
            resp_rate_cpm_x10: 152,
            reserved: 0,
        };
        let bytes = packet.encode();
        assert_eq!(bytes.len(), 12);
        assert_eq!(CoherencePacket::decode(&bytes).unwrap(), packet);
    }

    #[test]
    fn test_coherence_packet_truncation() {
        assert_eq!(
            CoherencePacket::decode(&[0u8; 11]),
            Err(WireError::Truncated {
                expected: 12,
                got: 11
            })
        );
    }

    #[test]
    fn test_actuator_control_round_trip_and_clamp() {
        let control = ActuatorControl {
            thermal_pct: 90,
            thermal_duration_s: 120,
            vibration_pattern: 9,
            vibration_pct: 80,
        };
        let decoded = ActuatorControl::decode(&control.encode()).unwrap();
        assert_eq!(decoded, control);

        let clamped = decoded.clamped(60, 50);
        assert_eq!(clamped.thermal_pct, 60);
        assert_eq!(clamped.thermal_duration_s, 60);
        assert_eq!(clamped.vibration_pattern, VIB_PATTERN_ALERT);
        assert_eq!(clamped.vibration_pct, 50);
    }

    #[test]
    fn test_device_state_negative_temperature() {
        let state = DeviceState {
            battery_pct: 83,
            charging_state: 0,
            connection_state: 1,
            streaming_flags: 0b11,
            skin_temp_c: -4,
            error_flags: ERR_BATTERY_LOW | ERR_THERMAL_FAULT,
            uptime_min: 5_432,
        };
        let decoded = DeviceState::decode(&state.encode()).unwrap();
        assert_eq!(decoded, state);
        assert_eq!(decoded.skin_temp_c, -4);
        assert!(decoded.error_flags & ERR_THERMAL_FAULT != 0);
        // Reserved bits stay clear
        assert_eq!(decoded.error_flags & 0b1110_0000, 0);
    }

    #[test]
    fn test_config_record_round_trip() {
        let config = ConfigRecord::default();
        let bytes = config.encode();
        assert_eq!(bytes.len(), 16);
        assert_eq!(ConfigRecord::decode(&bytes).unwrap(), config);
    }

    #[test]
    fn test_config_record_range_validation() {
        let mut config = ConfigRecord::default();
        config.stream_rate_hz = 11;
        assert!(matches!(
            ConfigRecord::decode(&config.encode()),
            Err(WireError::FieldOutOfRange {
                field: "stream_rate_hz",
                ..
            })
        ));

        let mut config = ConfigRecord::default();
        config.quiet_end_h = 24;
        assert!(config.validate().is_err());

        let mut config = ConfigRecord::default();
        config.coherence_update_s = 4;
        assert!(config.validate().is_err());
    }
}
