//! Integration tests for smart-mask host-testable logic.

use smart_mask::ble::service::{encode_samples, VALUE_PAYLOAD_MAX};
use smart_mask::config::{DEFAULT_SENSOR_CONTROL, SENSOR_VAL_AMOUNT_NOTIF};
use smart_mask::error::{ControlError, Error};
use smart_mask::sensor::registry::SensorRegistry;
use smart_mask::sensor::{Gain, SensorControl, SensorId};

#[test]
fn control_record_wire_roundtrip() {
    let record = SensorControl {
        gain: Gain::Gain1_2,
        enable: true,
        sample_period_ms: 1_500,
    };
    let bytes = record.to_bytes();
    assert_eq!(bytes, [0x04, 0x01, 0xDC, 0x05]);
    assert_eq!(SensorControl::decode(&bytes), Ok(record));
}

#[test]
fn out_of_range_control_write_is_refused() {
    // Well-formed, but period 60001 ms.
    let bytes = [0x00, 0x01, 0x61, 0xEA];
    let record = SensorControl::decode(&bytes).expect("layout is valid");
    assert_eq!(record.validate(), Err(ControlError::PeriodTooLong(60_001)));

    let err: Error = ControlError::PeriodTooShort(0).into();
    assert_eq!(err, Error::InvalidControl(ControlError::PeriodTooShort(0)));
}

#[test]
fn registry_batches_become_value_payloads() {
    let mut registry = SensorRegistry::with_defaults();
    for value in 0..25 {
        registry.add_value(SensorId::Sensor4, value - 10);
    }

    // Two full batches arrived; the ring only keeps the newest ten.
    let batch = registry
        .take_batch(SensorId::Sensor4)
        .expect("expected a full batch");
    assert_eq!(batch.samples.len(), SENSOR_VAL_AMOUNT_NOTIF);
    assert_eq!(batch.samples.first(), Some(&5));
    assert_eq!(batch.samples.last(), Some(&14));

    let mut payload = [0u8; VALUE_PAYLOAD_MAX];
    let written = encode_samples(&batch.samples, &mut payload);
    assert_eq!(written, VALUE_PAYLOAD_MAX);
    assert_eq!(payload[..2], 5i16.to_le_bytes());
    assert_eq!(payload[18..], 14i16.to_le_bytes());
}

#[test]
fn registry_refuses_invalid_control() {
    let mut registry = SensorRegistry::with_defaults();
    let bad = SensorControl {
        sample_period_ms: 0,
        ..DEFAULT_SENSOR_CONTROL
    };
    assert!(registry.set_control(SensorId::Sensor1, bad).is_err());
    assert_eq!(*registry.control(SensorId::Sensor1), DEFAULT_SENSOR_CONTROL);
}
