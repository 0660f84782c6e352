//! Sensor data model: identities, hardware descriptors, control records.
//!
//! The mask carries four fixed analog sensors. Each one has a static
//! hardware descriptor, a mutable control record (written over BLE) and a
//! rolling buffer of raw samples.

pub mod buffer;
pub mod control;
pub mod registry;

use crate::config::SENSORS_COUNT;

/// One of the four sensor channels, sampled in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorId {
    Sensor1,
    Sensor2,
    Sensor3,
    Sensor4,
}

impl SensorId {
    /// All sensors in sampling order.
    pub const ALL: [SensorId; SENSORS_COUNT] = [
        SensorId::Sensor1,
        SensorId::Sensor2,
        SensorId::Sensor3,
        SensorId::Sensor4,
    ];

    /// Zero-based index into per-sensor tables.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Human-facing sensor number (1..=4).
    pub const fn number(self) -> u8 {
        self as u8 + 1
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// SAADC gain steps. Discriminants are the CH[n].CONFIG.GAIN register codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Gain {
    Gain1_6 = 0,
    Gain1_5 = 1,
    Gain1_4 = 2,
    Gain1_3 = 3,
    Gain1_2 = 4,
    Gain1 = 5,
    Gain2 = 6,
    Gain4 = 7,
}

impl Gain {
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Map a register code back to a gain step; `None` for codes the
    /// SAADC does not support.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Gain::Gain1_6),
            1 => Some(Gain::Gain1_5),
            2 => Some(Gain::Gain1_4),
            3 => Some(Gain::Gain1_3),
            4 => Some(Gain::Gain1_2),
            5 => Some(Gain::Gain1),
            6 => Some(Gain::Gain2),
            7 => Some(Gain::Gain4),
            _ => None,
        }
    }
}

/// Fixed wiring of one sensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorHardware {
    /// SAADC analog input (AIN index).
    pub analog_input: u8,
    /// SAADC channel the input is routed through.
    pub adc_channel: u8,
    /// GPIO number (port 0) that powers the sensor.
    pub power_pin: u8,
}

/// Runtime settings of one sensor, as written by the BLE peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorControl {
    pub gain: Gain,
    pub enable: bool,
    pub sample_period_ms: u16,
}

/// A full notification's worth of samples taken from one sensor.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorBatch {
    pub sensor: SensorId,
    pub samples: heapless::Vec<i16, { crate::config::SENSOR_VAL_AMOUNT_NOTIF }>,
}
