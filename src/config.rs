//! Application-wide constants and compile-time configuration.
//!
//! All hardware pin assignments, timing parameters, and protocol
//! constants live here so they can be tuned in one place.

use crate::sensor::{Gain, SensorControl, SensorHardware};

// Sensors

/// Number of analog sensor channels on the mask.
pub const SENSORS_COUNT: usize = 4;

/// Samples kept per sensor and sent together in one notification.
pub const SENSOR_VAL_AMOUNT_NOTIF: usize = 10;

/// Sampling period used until a peer writes a control record (ms).
pub const INITIAL_SAMPLE_RATE_MS: u32 = 200;

/// Bounds accepted for `SensorControl::sample_period_ms`.
pub const MIN_SAMPLE_PERIOD_MS: u16 = 1;
pub const MAX_SAMPLE_PERIOD_MS: u16 = 60_000;

/// Time the sensor bias needs after its power pin goes high (ms).
pub const SENSOR_SETTLE_MS: u32 = 1;

/// Control settings every sensor boots with.
pub const DEFAULT_SENSOR_CONTROL: SensorControl = SensorControl {
    gain: Gain::Gain1_6,
    enable: true,
    sample_period_ms: INITIAL_SAMPLE_RATE_MS as u16,
};

// GPIO / SAADC assignments
//
//   Sensor 1  → AIN0 (P0.02), power P0.11
//   Sensor 2  → AIN1 (P0.03), power P0.12
//   Sensor 3  → AIN2 (P0.04), power P0.24
//   Sensor 4  → AIN3 (P0.05), power P0.25
//
// The typed `embassy_nrf::peripherals::*` pins are picked in `main.rs`;
// keep both places in sync.

/// Hardware descriptor per sensor, indexed by `SensorId::index()`.
pub const SENSOR_HARDWARE: [SensorHardware; SENSORS_COUNT] = [
    SensorHardware { analog_input: 0, adc_channel: 0, power_pin: 11 },
    SensorHardware { analog_input: 1, adc_channel: 1, power_pin: 12 },
    SensorHardware { analog_input: 2, adc_channel: 2, power_pin: 24 },
    SensorHardware { analog_input: 3, adc_channel: 3, power_pin: 25 },
];

/// Number of SAADC channels on the nRF52 (CH[0]..CH[7]).
pub const ADC_CHANNEL_COUNT: usize = 8;

// Task queues

/// Pending timer ticks the sampler may lag behind before ticks are dropped.
pub const SAMPLE_QUEUE_DEPTH: usize = 4;

/// Control writes waiting to be applied by the sampler.
pub const CONTROL_QUEUE_DEPTH: usize = 4;

/// Sample batches waiting to be notified.
pub const BATCH_QUEUE_DEPTH: usize = 8;

// BLE

/// GAP device name, also used in the advertisement.
pub const BLE_DEVICE_NAME: &str = "SmartMask";

/// Vendor-specific 128-bit base UUID (little-endian, as the SoftDevice
/// expects it). Bytes 12 and 13 carry the 16-bit service/characteristic id.
pub const SMS_UUID_BASE: [u8; 16] = [
    0x24, 0xD1, 0xBC, 0xEA, 0x5F, 0x78, 0x23, 0x15, 0xDE, 0xEF, 0x12, 0x12, 0x00, 0x00, 0x00, 0x00,
];

/// 16-bit id of the sensor measurement service.
pub const SMS_UUID_SERVICE: u16 = 0x1600;

/// Value characteristic ids, one per sensor.
pub const SMS_UUID_VALS_CHARS: [u16; SENSORS_COUNT] = [0x1601, 0x1603, 0x1605, 0x1607];

/// Control characteristic ids, one per sensor.
pub const SMS_UUID_CTRL_CHARS: [u16; SENSORS_COUNT] = [0x1602, 0x1604, 0x1606, 0x1608];

/// Connection interval range (in 1.25 ms units). 24..40 = 30..50 ms.
pub const BLE_CONN_INTERVAL_MIN: u16 = 24;
pub const BLE_CONN_INTERVAL_MAX: u16 = 40;

/// Slave latency (connection events the peripheral may skip).
pub const BLE_SLAVE_LATENCY: u16 = 0;

/// Supervision timeout (in 10 ms units). 400 = 4 s.
pub const BLE_SUP_TIMEOUT: u16 = 400;

/// Advertising interval (in 0.625 ms units). 160 = 100 ms.
pub const BLE_ADV_INTERVAL: u32 = 160;

// Watchdog

/// Watchdog timeout (seconds). The main loop pets it every second.
pub const WATCHDOG_TIMEOUT_SECS: u32 = 5;
