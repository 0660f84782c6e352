//! Sensor handle registry - the statically allocated table of sensors.
//!
//! Owns, per sensor: the hardware descriptor, the active control record
//! and the sample buffer. The sampling engine is its only writer.

use super::buffer::SampleBuffer;
use super::{SensorBatch, SensorControl, SensorHardware, SensorId};
use crate::config::{DEFAULT_SENSOR_CONTROL, SENSORS_COUNT, SENSOR_HARDWARE};
use crate::error::ControlError;

struct SensorSlot {
    hardware: SensorHardware,
    control: SensorControl,
    buffer: SampleBuffer,
}

impl SensorSlot {
    const fn new(hardware: SensorHardware, control: SensorControl) -> Self {
        Self {
            hardware,
            control,
            buffer: SampleBuffer::new(),
        }
    }
}

pub struct SensorRegistry {
    slots: [SensorSlot; SENSORS_COUNT],
}

impl SensorRegistry {
    pub const fn new(
        hardware: [SensorHardware; SENSORS_COUNT],
        controls: [SensorControl; SENSORS_COUNT],
    ) -> Self {
        Self {
            slots: [
                SensorSlot::new(hardware[0], controls[0]),
                SensorSlot::new(hardware[1], controls[1]),
                SensorSlot::new(hardware[2], controls[2]),
                SensorSlot::new(hardware[3], controls[3]),
            ],
        }
    }

    /// Board wiring from `config` with every sensor at the boot defaults.
    pub const fn with_defaults() -> Self {
        Self::new(SENSOR_HARDWARE, [DEFAULT_SENSOR_CONTROL; SENSORS_COUNT])
    }

    pub fn hardware(&self, sensor: SensorId) -> &SensorHardware {
        &self.slots[sensor.index()].hardware
    }

    pub fn control(&self, sensor: SensorId) -> &SensorControl {
        &self.slots[sensor.index()].control
    }

    /// Replace a sensor's control record. Invalid records are refused and
    /// leave the stored one untouched.
    pub fn set_control(
        &mut self,
        sensor: SensorId,
        control: SensorControl,
    ) -> Result<(), ControlError> {
        control.validate()?;
        self.slots[sensor.index()].control = control;
        Ok(())
    }

    /// All control records, in sensor order.
    pub fn controls(&self) -> [SensorControl; SENSORS_COUNT] {
        SensorId::ALL.map(|s| *self.control(s))
    }

    pub fn add_value(&mut self, sensor: SensorId, value: i16) {
        self.slots[sensor.index()].buffer.push(value);
    }

    pub fn buffer(&self, sensor: SensorId) -> &SampleBuffer {
        &self.slots[sensor.index()].buffer
    }

    /// Take the pending notification batch of `sensor`, if one is complete.
    pub fn take_batch(&mut self, sensor: SensorId) -> Option<SensorBatch> {
        self.slots[sensor.index()]
            .buffer
            .take_batch()
            .map(|samples| SensorBatch { sensor, samples })
    }
}

impl Default for SensorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::Gain;

    #[test]
    fn defaults_follow_board_config() {
        let reg = SensorRegistry::with_defaults();
        for s in SensorId::ALL {
            assert_eq!(*reg.hardware(s), SENSOR_HARDWARE[s.index()]);
            assert_eq!(*reg.control(s), DEFAULT_SENSOR_CONTROL);
            assert!(reg.buffer(s).is_empty());
        }
    }

    #[test]
    fn set_control_rejects_invalid_record() {
        let mut reg = SensorRegistry::with_defaults();
        let bad = SensorControl {
            gain: Gain::Gain4,
            enable: true,
            sample_period_ms: 0,
        };
        assert!(reg.set_control(SensorId::Sensor2, bad).is_err());
        assert_eq!(*reg.control(SensorId::Sensor2), DEFAULT_SENSOR_CONTROL);
    }

    #[test]
    fn values_land_in_their_own_buffer() {
        let mut reg = SensorRegistry::with_defaults();
        reg.add_value(SensorId::Sensor3, 42);
        assert_eq!(reg.buffer(SensorId::Sensor3).snapshot().as_slice(), &[42]);
        assert!(reg.buffer(SensorId::Sensor1).is_empty());
    }

    #[test]
    fn batch_carries_sensor_id() {
        let mut reg = SensorRegistry::with_defaults();
        for v in 0..10 {
            reg.add_value(SensorId::Sensor4, v);
        }
        let batch = reg.take_batch(SensorId::Sensor4).unwrap();
        assert_eq!(batch.sensor, SensorId::Sensor4);
        assert_eq!(batch.samples.len(), 10);
        assert!(reg.take_batch(SensorId::Sensor4).is_none());
    }
}
