//! nRF52840 bindings for the hardware-independent library.
//!
//! - [`saadc`] - [`AdcDriver`](smart_mask::sampling::hal::AdcDriver) over the SAADC
//! - [`timer`] - [`SampleTimer`](smart_mask::sampling::hal::SampleTimer) and the tick task
//! - [`gatt`] - SoftDevice GATT server, advertising and notification task
//! - [`rng`] - SoftDevice entropy for the mock front-end

pub mod gatt;
pub mod rng;
pub mod saadc;
pub mod timer;
