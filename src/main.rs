//! Smart-mask firmware entry point (nRF52840 + S140).
//!
//! Task layout:
//!
//! ```text
//!  tick ──SampleNow──▶ sampler ──SensorBatch──▶ ble ──notify──▶ central
//!                        ▲   │                    │
//!                        │   └─ControlApplied─▶ control_sync (characteristic value)
//!                        └──────ControlUpdate─────┘ (control writes)
//! ```

#![no_std]
#![no_main]

mod platform;

use defmt::{info, unwrap, warn};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_nrf::interrupt::{self, InterruptExt, Priority};
use embassy_nrf::wdt::{self, Watchdog};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::Timer;
use nrf_softdevice::{raw, Softdevice};
use panic_probe as _;
use static_cell::StaticCell;

use smart_mask::ble::service;
use smart_mask::config::{
    BATCH_QUEUE_DEPTH, BLE_DEVICE_NAME, CONTROL_QUEUE_DEPTH, SAMPLE_QUEUE_DEPTH,
    WATCHDOG_TIMEOUT_SECS,
};
use smart_mask::error::Error;
use smart_mask::sampling::{ControlApplied, ControlUpdate, SampleNow, SamplingEngine};
use smart_mask::sensor::registry::SensorRegistry;
use smart_mask::sensor::{SensorBatch, SensorControl, SensorId};

use platform::gatt::{MaskServer, SdRegistry};
use platform::timer::{TickerTimer, TimerSignal};

#[cfg(not(feature = "mock-adc"))]
type Frontend = smart_mask::sampling::AdcFrontend<
    platform::saadc::NrfSaadc,
    embassy_nrf::gpio::Output<'static>,
    embassy_time::Delay,
>;
#[cfg(feature = "mock-adc")]
type Frontend = smart_mask::sampling::MockFrontend<platform::rng::SdRng>;

type Engine = SamplingEngine<Frontend, TickerTimer>;

static SAMPLE_REQUESTS: Channel<CriticalSectionRawMutex, SampleNow, SAMPLE_QUEUE_DEPTH> =
    Channel::new();
static CONTROL_UPDATES: Channel<CriticalSectionRawMutex, ControlUpdate, CONTROL_QUEUE_DEPTH> =
    Channel::new();
static CONTROL_REPORTS: Channel<CriticalSectionRawMutex, ControlApplied, CONTROL_QUEUE_DEPTH> =
    Channel::new();
static BATCHES: Channel<CriticalSectionRawMutex, SensorBatch, BATCH_QUEUE_DEPTH> = Channel::new();
static TIMER_COMMANDS: TimerSignal = TimerSignal::new();

static SERVER: StaticCell<MaskServer> = StaticCell::new();

/// Control characteristic write handler. Runs in the BLE task, so it only
/// validates and queues; the sampler applies the record.
fn queue_control_update(sensor: SensorId, control: SensorControl) -> Result<(), Error> {
    control.validate()?;
    CONTROL_UPDATES
        .try_send(ControlUpdate { sensor, control })
        .map_err(|_| Error::QueueFull)
}

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

#[embassy_executor::task]
async fn tick_task() -> ! {
    platform::timer::run(&TIMER_COMMANDS, SAMPLE_REQUESTS.sender()).await
}

#[embassy_executor::task]
async fn ble_task(sd: &'static Softdevice, server: &'static MaskServer) -> ! {
    platform::gatt::run(sd, server, BATCHES.receiver()).await
}

#[embassy_executor::task]
async fn control_sync_task(server: &'static MaskServer) -> ! {
    platform::gatt::sync_controls(server, CONTROL_REPORTS.receiver()).await
}

#[embassy_executor::task]
async fn sampler_task(mut engine: Engine) -> ! {
    if let Err(e) = engine.init().and_then(|()| engine.start()) {
        defmt::panic!("sampler init failed: {:?}", e);
    }

    loop {
        match select(CONTROL_UPDATES.receive(), SAMPLE_REQUESTS.receive()).await {
            Either::First(update) => {
                match engine.update_sensor_control(update.sensor, update.control) {
                    Ok(()) => {}
                    Err(Error::Faulted) => defmt::panic!("sampler faulted"),
                    Err(e) => warn!(
                        "sensor {} control not applied: {:?}",
                        update.sensor.number(),
                        e
                    ),
                }
                CONTROL_REPORTS.send(engine.applied(update.sensor)).await;
            }
            Either::Second(SampleNow) => {
                let report = match engine.on_tick().await {
                    Ok(report) => report,
                    Err(e) => defmt::panic!("sampling failed: {:?}", e),
                };
                for sensor in report.ready {
                    let Some(batch) = engine.take_batch(sensor) else {
                        continue;
                    };
                    if BATCHES.try_send(batch).is_err() {
                        warn!("sensor {} batch dropped, queue full", sensor.number());
                    }
                }
            }
        }
    }
}

fn softdevice_config() -> nrf_softdevice::Config {
    nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 23 }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: BLE_DEVICE_NAME.as_ptr() as _,
            current_len: BLE_DEVICE_NAME.len() as u16,
            max_len: BLE_DEVICE_NAME.len() as u16,
            write_perm: unsafe { core::mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("smart-mask starting");

    // Priorities 0, 1 and 4 belong to the SoftDevice.
    let mut nrf_config = embassy_nrf::config::Config::default();
    nrf_config.gpiote_interrupt_priority = Priority::P2;
    nrf_config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(nrf_config);
    interrupt::SAADC.set_priority(Priority::P3);

    let sd = Softdevice::enable(&softdevice_config());

    let registry = SensorRegistry::with_defaults();
    let controls = registry.controls();
    let handles = match service::register(&mut SdRegistry(&mut *sd), &controls) {
        Ok(handles) => handles,
        Err(e) => defmt::panic!("sensor service registration failed: {:?}", e),
    };
    let sd: &'static Softdevice = sd;
    let server: &'static MaskServer =
        SERVER.init(MaskServer::new(sd, handles, queue_control_update, controls));

    #[cfg(not(feature = "mock-adc"))]
    let frontend = {
        use embassy_nrf::gpio::{Level, Output, OutputDrive};
        use embassy_nrf::saadc::Input as _;

        let inputs = [
            p.P0_02.degrade_saadc(),
            p.P0_03.degrade_saadc(),
            p.P0_04.degrade_saadc(),
            p.P0_05.degrade_saadc(),
        ];
        let power_pins = [
            Output::new(p.P0_11, Level::Low, OutputDrive::Standard),
            Output::new(p.P0_12, Level::Low, OutputDrive::Standard),
            Output::new(p.P0_24, Level::Low, OutputDrive::Standard),
            Output::new(p.P0_25, Level::Low, OutputDrive::Standard),
        ];
        let adc = platform::saadc::NrfSaadc::new(p.SAADC, inputs);
        match Frontend::new(adc, power_pins, embassy_time::Delay) {
            Ok(frontend) => frontend,
            Err(e) => defmt::panic!("sensor power pins: {:?}", e),
        }
    };
    #[cfg(feature = "mock-adc")]
    let frontend = {
        info!("mock sensors enabled");
        Frontend::new(platform::rng::SdRng::new(sd))
    };

    let engine = SamplingEngine::new(frontend, TickerTimer::new(&TIMER_COMMANDS), registry);

    unwrap!(spawner.spawn(softdevice_task(sd)));
    unwrap!(spawner.spawn(tick_task()));
    unwrap!(spawner.spawn(sampler_task(engine)));
    unwrap!(spawner.spawn(ble_task(sd, server)));
    unwrap!(spawner.spawn(control_sync_task(server)));

    let mut wdt_config = wdt::Config::default();
    wdt_config.timeout_ticks = 32_768 * WATCHDOG_TIMEOUT_SECS;
    let (_wdt, [mut watchdog]) = match Watchdog::try_new(p.WDT, wdt_config) {
        Ok(wdt) => wdt,
        Err(_) => defmt::panic!("watchdog already running with another config"),
    };

    info!("smart-mask running");
    loop {
        Timer::after_secs(1).await;
        watchdog.pet();
    }
}
