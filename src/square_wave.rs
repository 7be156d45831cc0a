//! The one-second tick source: the RTC's 1 Hz square-wave output, or an internal timer.

use embassy_executor::Spawner;
use embassy_rp::Peri;
use embassy_rp::gpio::{Input, Pin, Pull};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};
use embassy_time::Ticker;

use crate::Result;
use crate::clock_sync::{ClockSignal, TickSource};
use crate::constants::ONE_SECOND;
use crate::word_clock::WordClockStatic;

/// Static for the [`SquareWave`] device.
pub struct SquareWaveStatic(Signal<CriticalSectionRawMutex, ()>);

/// Posts [`ClockSignal::Tick`] to the clock once a second after [`SquareWave::enable`].
pub struct SquareWave<'a>(&'a SquareWaveStatic);

impl SquareWave<'_> {
    #[must_use]
    pub const fn new_static() -> SquareWaveStatic {
        SquareWaveStatic(Signal::new())
    }

    /// Create the tick source and spawn its task.
    ///
    /// `sqw_pin` is wired to the DS1307's open-drain SQW/OUT pin and is only read when
    /// `tick_source` is [`TickSource::SquareWave`].
    ///
    /// # Errors
    ///
    /// Returns an error if the task cannot be spawned.
    pub fn new(
        square_wave_static: &'static SquareWaveStatic,
        sqw_pin: Peri<'static, impl Pin>,
        tick_source: TickSource,
        word_clock_static: &'static WordClockStatic,
        spawner: Spawner,
    ) -> Result<Self> {
        let sqw = Input::new(sqw_pin, Pull::Up);
        let token = tick_loop(sqw, tick_source, &square_wave_static.0, word_clock_static)?;
        spawner.spawn(token);
        Ok(Self(&square_wave_static.0))
    }

    /// Start ticking. Later calls do nothing.
    pub fn enable(&self) {
        self.0.signal(());
    }
}

#[embassy_executor::task]
async fn tick_loop(
    mut sqw: Input<'static>,
    tick_source: TickSource,
    enabled: &'static Signal<CriticalSectionRawMutex, ()>,
    word_clock_static: &'static WordClockStatic,
) -> ! {
    enabled.wait().await;
    info!("One-second tick from {:?}", tick_source);
    let mut ticker = Ticker::every(ONE_SECOND);
    loop {
        match tick_source {
            TickSource::SquareWave => sqw.wait_for_falling_edge().await,
            TickSource::Timer => ticker.next().await,
        }
        word_clock_static.signals().send(ClockSignal::Tick).await;
    }
}
