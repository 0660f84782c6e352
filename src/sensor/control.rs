//! Control record validation and BLE wire format.
//!
//! Layout (4 bytes):
//! ```text
//! Byte 0: Gain code (SAADC register value, 0 = 1/6 ... 7 = 4)
//! Byte 1: Enable (0x00 = off, 0x01 = on)
//! Byte 2-3: Sample period in ms (u16, little-endian)
//! ```

use super::{Gain, SensorControl};
use crate::config::{MAX_SAMPLE_PERIOD_MS, MIN_SAMPLE_PERIOD_MS};
use crate::error::ControlError;

/// Control record size in bytes.
pub const CONTROL_PAYLOAD_SIZE: usize = 4;

impl SensorControl {
    /// Check the record against what the sampler can run.
    ///
    /// Pure: a rejected record never touches any state.
    pub fn validate(&self) -> Result<(), ControlError> {
        if self.sample_period_ms < MIN_SAMPLE_PERIOD_MS {
            return Err(ControlError::PeriodTooShort(self.sample_period_ms));
        }
        if self.sample_period_ms > MAX_SAMPLE_PERIOD_MS {
            return Err(ControlError::PeriodTooLong(self.sample_period_ms));
        }
        // Gain is one of the SAADC steps by construction; raw codes are
        // checked in `decode`.
        Ok(())
    }

    /// Serialise into a byte slice for the control characteristic.
    /// Returns the number of bytes written (0 if `buf` is too small).
    pub fn encode(&self, buf: &mut [u8]) -> usize {
        if buf.len() < CONTROL_PAYLOAD_SIZE {
            return 0;
        }
        let period = self.sample_period_ms.to_le_bytes();
        buf[0] = self.gain.code();
        buf[1] = self.enable as u8;
        buf[2] = period[0];
        buf[3] = period[1];
        CONTROL_PAYLOAD_SIZE
    }

    /// Fixed-size encoding, handy for characteristic initial values.
    pub fn to_bytes(&self) -> [u8; CONTROL_PAYLOAD_SIZE] {
        let mut buf = [0u8; CONTROL_PAYLOAD_SIZE];
        self.encode(&mut buf);
        buf
    }

    /// Parse a control characteristic write.
    ///
    /// Only the layout is checked here; range checks are `validate`'s job.
    pub fn decode(data: &[u8]) -> Result<Self, ControlError> {
        if data.len() != CONTROL_PAYLOAD_SIZE {
            return Err(ControlError::BadLength(data.len()));
        }
        let gain = Gain::from_code(data[0]).ok_or(ControlError::UnknownGain(data[0]))?;
        let enable = match data[1] {
            0 => false,
            1 => true,
            other => return Err(ControlError::InvalidEnable(other)),
        };
        Ok(Self {
            gain,
            enable,
            sample_period_ms: u16::from_le_bytes([data[2], data[3]]),
        })
    }
}

/// Predicate form of [`SensorControl::validate`].
pub fn is_control_valid(ctrl: &SensorControl) -> bool {
    ctrl.validate().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctrl(gain: Gain, enable: bool, sample_period_ms: u16) -> SensorControl {
        SensorControl {
            gain,
            enable,
            sample_period_ms,
        }
    }

    #[test]
    fn period_bounds() {
        assert!(is_control_valid(&ctrl(Gain::Gain1, true, 1)));
        assert!(is_control_valid(&ctrl(Gain::Gain1, true, MAX_SAMPLE_PERIOD_MS)));
        assert_eq!(
            ctrl(Gain::Gain1, true, 0).validate(),
            Err(ControlError::PeriodTooShort(0))
        );
        assert_eq!(
            ctrl(Gain::Gain1, true, MAX_SAMPLE_PERIOD_MS + 1).validate(),
            Err(ControlError::PeriodTooLong(MAX_SAMPLE_PERIOD_MS + 1))
        );
    }

    #[test]
    fn disabled_record_still_needs_a_sane_period() {
        assert!(!is_control_valid(&ctrl(Gain::Gain1_6, false, 0)));
    }

    #[test]
    fn encode_layout() {
        let bytes = ctrl(Gain::Gain1_4, true, 0x01F4).to_bytes();
        assert_eq!(bytes, [0x02, 0x01, 0xF4, 0x01]);
    }

    #[test]
    fn encode_buffer_too_small() {
        let mut buf = [0u8; 3];
        assert_eq!(ctrl(Gain::Gain1, true, 200).encode(&mut buf), 0);
    }

    #[test]
    fn decode_rejects_bad_length() {
        assert_eq!(SensorControl::decode(&[]), Err(ControlError::BadLength(0)));
        assert_eq!(
            SensorControl::decode(&[0, 1, 200, 0, 0]),
            Err(ControlError::BadLength(5))
        );
    }

    #[test]
    fn decode_rejects_unknown_gain_and_enable() {
        assert_eq!(
            SensorControl::decode(&[8, 1, 200, 0]),
            Err(ControlError::UnknownGain(8))
        );
        assert_eq!(
            SensorControl::decode(&[0, 2, 200, 0]),
            Err(ControlError::InvalidEnable(2))
        );
    }

    #[test]
    fn decode_accepts_out_of_range_period() {
        // Layout is fine, validation is a separate step.
        let parsed = SensorControl::decode(&[5, 0, 0, 0]).unwrap();
        assert_eq!(parsed.sample_period_ms, 0);
        assert!(!is_control_valid(&parsed));
    }

    #[test]
    fn wire_roundtrip_every_gain() {
        for code in 0..8u8 {
            let gain = Gain::from_code(code).unwrap();
            let original = ctrl(gain, code % 2 == 0, 50 + code as u16);
            let parsed = SensorControl::decode(&original.to_bytes()).unwrap();
            assert_eq!(parsed, original);
            assert!(is_control_valid(&parsed));
        }
    }
}
