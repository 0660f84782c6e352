//! Rolling per-sensor sample buffer.
//!
//! A ring of the last `SENSOR_VAL_AMOUNT_NOTIF` raw readings. When full,
//! the oldest sample is overwritten. The buffer also counts readings that
//! have not been handed to BLE yet; every `SENSOR_VAL_AMOUNT_NOTIF` fresh
//! readings form a batch.

use crate::config::SENSOR_VAL_AMOUNT_NOTIF;
use heapless::{HistoryBuffer, Vec};

/// Fixed-capacity ring of raw ADC samples (oldest-overwrite).
pub struct SampleBuffer {
    ring: HistoryBuffer<i16, SENSOR_VAL_AMOUNT_NOTIF>,
    fresh: usize,
}

impl SampleBuffer {
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuffer::new(),
            fresh: 0,
        }
    }

    /// Append a reading, evicting the oldest one if the ring is full.
    pub fn push(&mut self, value: i16) {
        self.ring.write(value);
        self.fresh = (self.fresh + 1).min(SENSOR_VAL_AMOUNT_NOTIF);
    }

    /// Samples currently held (saturates at capacity).
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.len() == 0
    }

    /// Copy of the ring content, oldest first.
    pub fn snapshot(&self) -> Vec<i16, SENSOR_VAL_AMOUNT_NOTIF> {
        self.ring.oldest_ordered().copied().collect()
    }

    /// A full batch of readings is waiting to be notified.
    pub fn batch_ready(&self) -> bool {
        self.fresh >= SENSOR_VAL_AMOUNT_NOTIF
    }

    /// Hand the current batch to BLE and restart the fresh count.
    pub fn take_batch(&mut self) -> Option<Vec<i16, SENSOR_VAL_AMOUNT_NOTIF>> {
        if !self.batch_ready() {
            return None;
        }
        self.fresh = 0;
        Some(self.snapshot())
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let buf = SampleBuffer::new();
        assert!(buf.is_empty());
        assert!(buf.snapshot().is_empty());
        assert!(!buf.batch_ready());
    }

    #[test]
    fn overwrites_oldest_when_full() {
        let mut buf = SampleBuffer::new();
        for v in 0..(SENSOR_VAL_AMOUNT_NOTIF as i16 + 3) {
            buf.push(v);
        }
        assert_eq!(buf.len(), SENSOR_VAL_AMOUNT_NOTIF);
        let snap = buf.snapshot();
        assert_eq!(snap.first(), Some(&3));
        assert_eq!(snap.last(), Some(&12));
    }

    #[test]
    fn batch_every_ten_fresh_samples() {
        let mut buf = SampleBuffer::new();
        for v in 0..9 {
            buf.push(v);
        }
        assert!(buf.take_batch().is_none());

        buf.push(9);
        let batch = buf.take_batch().unwrap();
        assert_eq!(batch.as_slice(), &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert!(!buf.batch_ready());
        // Ring keeps its content after a batch is taken.
        assert_eq!(buf.len(), SENSOR_VAL_AMOUNT_NOTIF);

        for v in 10..20 {
            buf.push(v);
        }
        let batch = buf.take_batch().unwrap();
        assert_eq!(batch.first(), Some(&10));
    }
}
