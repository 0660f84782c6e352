//! Smart-mask sensor firmware library.
//!
//! Everything that does not touch a peripheral lives here so it can be
//! tested on the host:
//!
//! - [`sensor`] - sensor table, control records, sample buffers
//! - [`sampling`] - the sampling engine and its hardware traits
//! - [`ble`] - the Sensor Measurement GATT service
//!
//! Usage: `cargo test --lib`
//!
//! The nRF52840 binary (`src/main.rs`, `embedded` feature) adds the
//! SoftDevice, SAADC and timer bindings in `platform` on top of this.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod ble;
pub mod config;
pub mod error;
pub mod sampling;
pub mod sensor;

#[cfg(test)]
mod testing;

pub use error::Error;

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::ble::vendor_uuid;
    use super::config::*;
    use super::sensor::control::is_control_valid;
    use super::sensor::SensorId;

    #[test]
    fn default_control_is_valid() {
        assert!(is_control_valid(&DEFAULT_SENSOR_CONTROL));
        assert_eq!(
            u32::from(DEFAULT_SENSOR_CONTROL.sample_period_ms),
            INITIAL_SAMPLE_RATE_MS
        );
    }

    #[test]
    fn sensor_hardware_uses_distinct_channels_and_pins() {
        for (i, a) in SENSOR_HARDWARE.iter().enumerate() {
            assert!((a.adc_channel as usize) < ADC_CHANNEL_COUNT);
            for b in &SENSOR_HARDWARE[i + 1..] {
                assert_ne!(a.adc_channel, b.adc_channel);
                assert_ne!(a.power_pin, b.power_pin);
                assert_ne!(a.analog_input, b.analog_input);
            }
        }
    }

    #[test]
    fn characteristic_uuids_interleave_value_and_control() {
        for sensor in SensorId::ALL {
            let i = sensor.index() as u16;
            assert_eq!(SMS_UUID_VALS_CHARS[sensor.index()], SMS_UUID_SERVICE + 1 + 2 * i);
            assert_eq!(SMS_UUID_CTRL_CHARS[sensor.index()], SMS_UUID_SERVICE + 2 + 2 * i);
        }
    }

    #[test]
    fn vendor_uuid_patches_short_id_into_base() {
        let uuid = vendor_uuid(0x1600);
        assert_eq!(uuid[12], 0x00);
        assert_eq!(uuid[13], 0x16);
        assert_eq!(uuid[..12], SMS_UUID_BASE[..12]);
        assert_eq!(uuid[14..], SMS_UUID_BASE[14..]);
    }

    #[test]
    fn sensor_ids_round_trip_through_index() {
        for sensor in SensorId::ALL {
            assert_eq!(SensorId::from_index(sensor.index()), Some(sensor));
            assert_eq!(sensor.number() as usize, sensor.index() + 1);
        }
        assert_eq!(SensorId::from_index(SENSORS_COUNT), None);
    }
}
