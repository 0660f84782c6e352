//! SoftDevice entropy.
//!
//! The SoftDevice owns the RNG peripheral while it is enabled, so random
//! bytes come out of its pool instead.

use core::num::NonZeroU32;

use nrf_softdevice::Softdevice;

const POOL_EMPTY: NonZeroU32 = match NonZeroU32::new(rand_core::Error::CUSTOM_START) {
    Some(code) => code,
    None => panic!(),
};

const FILL_ATTEMPTS: u32 = 16;
/// About 1 ms at 64 MHz.
const POOL_REFILL_CYCLES: u32 = 64_000;

pub struct SdRng {
    sd: &'static Softdevice,
}

impl SdRng {
    pub fn new(sd: &'static Softdevice) -> Self {
        Self { sd }
    }
}

impl rand_core::RngCore for SdRng {
    fn next_u32(&mut self) -> u32 {
        let mut buf = [0u8; 4];
        self.fill_bytes(&mut buf);
        u32::from_le_bytes(buf)
    }

    fn next_u64(&mut self) -> u64 {
        let mut buf = [0u8; 8];
        self.fill_bytes(&mut buf);
        u64::from_le_bytes(buf)
    }

    /// Retries while the pool refills and panics if it stays empty. Use
    /// [`try_fill_bytes`](rand_core::RngCore::try_fill_bytes) where running
    /// dry must not halt the firmware.
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for _ in 0..FILL_ATTEMPTS {
            if self.try_fill_bytes(dest).is_ok() {
                return;
            }
            cortex_m::asm::delay(POOL_REFILL_CYCLES);
        }
        defmt::panic!("softdevice entropy pool stayed empty");
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        nrf_softdevice::random_bytes(self.sd, dest).map_err(|_| rand_core::Error::from(POOL_EMPTY))
    }
}
