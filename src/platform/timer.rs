//! Sampling timer on top of `embassy-time`.
//!
//! [`TickerTimer`] is the engine's handle: it only posts [`TimerCommand`]s.
//! [`run`] owns the actual `Ticker` and turns every period into a
//! [`SampleNow`] request for the sampler task.

use defmt::{debug, trace};
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Sender;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Ticker};

use smart_mask::config::SAMPLE_QUEUE_DEPTH;
use smart_mask::error::DriverError;
use smart_mask::sampling::hal::SampleTimer;
use smart_mask::sampling::SampleNow;

#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum TimerCommand {
    Run(Duration),
    Stop,
}

pub type TimerSignal = Signal<CriticalSectionRawMutex, TimerCommand>;

pub struct TickerTimer {
    commands: &'static TimerSignal,
    initialized: bool,
    period: Option<Duration>,
}

impl TickerTimer {
    pub fn new(commands: &'static TimerSignal) -> Self {
        Self {
            commands,
            initialized: false,
            period: None,
        }
    }
}

impl SampleTimer for TickerTimer {
    fn init(&mut self) -> Result<(), DriverError> {
        if self.initialized {
            return Err(DriverError::TimerState);
        }
        self.initialized = true;
        Ok(())
    }

    fn uninit(&mut self) {
        self.commands.signal(TimerCommand::Stop);
        self.initialized = false;
        self.period = None;
    }

    fn ms_to_ticks(&self, ms: u32) -> u64 {
        Duration::from_millis(u64::from(ms)).as_ticks()
    }

    fn arm(&mut self, ticks: u64) -> Result<(), DriverError> {
        if !self.initialized {
            return Err(DriverError::TimerState);
        }
        if ticks == 0 {
            return Err(DriverError::InvalidPeriod);
        }
        self.period = Some(Duration::from_ticks(ticks));
        Ok(())
    }

    fn enable(&mut self) {
        if let Some(period) = self.period {
            self.commands.signal(TimerCommand::Run(period));
        }
    }

    fn disable(&mut self) {
        self.commands.signal(TimerCommand::Stop);
    }
}

/// Tick loop. A full request queue means the sampler is behind; the tick
/// is dropped rather than queued.
pub async fn run(
    commands: &'static TimerSignal,
    requests: Sender<'static, CriticalSectionRawMutex, SampleNow, SAMPLE_QUEUE_DEPTH>,
) -> ! {
    let mut period = None;
    let mut dropped: u32 = 0;
    loop {
        let Some(every) = period else {
            if let TimerCommand::Run(every) = commands.wait().await {
                period = Some(every);
            }
            continue;
        };

        debug!("sample timer running every {} ms", every.as_millis());
        let mut ticker = Ticker::every(every);
        loop {
            match select(ticker.next(), commands.wait()).await {
                Either::First(()) => {
                    if requests.try_send(SampleNow).is_err() {
                        dropped = dropped.wrapping_add(1);
                        trace!("sample request dropped ({} so far)", dropped);
                    }
                }
                Either::Second(TimerCommand::Run(next)) => {
                    period = Some(next);
                    break;
                }
                Either::Second(TimerCommand::Stop) => {
                    debug!("sample timer stopped");
                    period = None;
                    break;
                }
            }
        }
    }
}
