//! A device abstraction for the word clock: owns the [`ClockSync`] state machine, its signal
//! queue, the reply guard and the hardware watchdog.
//!
//! See [`WordClock`] for usage.

use core::convert::Infallible;

use cortex_m::peripheral::SCB;
use embassy_executor::Spawner;
use embassy_futures::select::{Either, select};
use embassy_rp::watchdog::Watchdog;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Instant, Timer};

use crate::Result;
use crate::bus::BusRequest;
use crate::clock_sync::{ClockConfig, ClockEffects, ClockSignal, ClockSync};
use crate::constants::{CLOCK_QUEUE_DEPTH, WATCHDOG_TIMEOUT};
use crate::raw_time::{SemanticTime, TimeOverride};
use crate::rtc_bus::RtcBus;
use crate::square_wave::SquareWave;
use crate::word_leds::WordLeds;
use crate::words::Phrase;

/// The clock's inbound queue. Ticks, bus replies, commands and watchdog requests all arrive here,
/// in the order they were posted.
pub type ClockSignals = Channel<CriticalSectionRawMutex, ClockSignal, CLOCK_QUEUE_DEPTH>;

/// Static for the [`WordClock`] device.
pub struct WordClockStatic(ClockSignals);

impl WordClockStatic {
    pub(crate) const fn signals(&self) -> &ClockSignals {
        &self.0
    }
}

/// A device abstraction for the word clock.
///
/// The RTC bus and the tick source post into this clock's queue, so create the static first and
/// hand it to them.
///
/// ```no_run
/// # #![no_std]
/// # #![no_main]
/// use word_clock::{
///     ClockConfig, OutputArray, RtcBus, RtcBusStatic, SquareWave, SquareWaveStatic, WordClock,
///     WordClockStatic, WordLeds, WordLedsStatic,
/// };
/// # #[panic_handler]
/// # fn panic(_info: &core::panic::PanicInfo) -> ! { loop {} }
///
/// async fn example(
///     p: embassy_rp::Peripherals,
///     lamps: OutputArray<'static, 20>,
///     spawner: embassy_executor::Spawner,
/// ) -> word_clock::Result<()> {
///     static WORD_CLOCK_STATIC: WordClockStatic = WordClock::new_static();
///     static RTC_BUS_STATIC: RtcBusStatic = RtcBus::new_static();
///     static SQUARE_WAVE_STATIC: SquareWaveStatic = SquareWave::new_static();
///     static WORD_LEDS_STATIC: WordLedsStatic = WordLeds::new_static();
///
///     let config = ClockConfig::from_env();
///     let rtc_bus = RtcBus::new(&RTC_BUS_STATIC, p.I2C0, p.PIN_5, p.PIN_4, &WORD_CLOCK_STATIC, spawner)?;
///     let square_wave =
///         SquareWave::new(&SQUARE_WAVE_STATIC, p.PIN_3, config.tick_source, &WORD_CLOCK_STATIC, spawner)?;
///     let word_leds = WordLeds::new(&WORD_LEDS_STATIC, lamps, spawner)?;
///     let watchdog = embassy_rp::watchdog::Watchdog::new(p.WATCHDOG);
///
///     let word_clock = WordClock::new(
///         &WORD_CLOCK_STATIC, config, rtc_bus, square_wave, word_leds, watchdog, spawner,
///     )?;
///     word_clock.pet_watchdog().await;
///     Ok(())
/// }
/// ```
pub struct WordClock<'a>(&'a ClockSignals);

impl WordClock<'_> {
    #[must_use]
    pub const fn new_static() -> WordClockStatic {
        WordClockStatic(Channel::new())
    }

    /// Start the hardware watchdog and spawn the clock task.
    ///
    /// # Errors
    ///
    /// Returns an error if the task cannot be spawned.
    pub fn new(
        word_clock_static: &'static WordClockStatic,
        config: ClockConfig,
        rtc_bus: RtcBus<'static>,
        square_wave: SquareWave<'static>,
        word_leds: WordLeds<'static>,
        mut watchdog: Watchdog,
        spawner: Spawner,
    ) -> Result<Self> {
        watchdog.start(WATCHDOG_TIMEOUT);
        let effects = DeviceEffects {
            rtc_bus,
            square_wave,
            word_leds,
            watchdog,
            deadline: None,
        };
        let token = clock_loop(word_clock_static.signals(), ClockSync::new(config), effects)?;
        spawner.spawn(token);
        Ok(Self(word_clock_static.signals()))
    }

    /// Set the RTC to `time` at the next one-second tick.
    pub async fn apply_time(&self, time: &SemanticTime) {
        self.apply_raw_time(TimeOverride::from_time(time).bytes()).await;
    }

    /// Set the RTC to these seconds, minutes and hours registers at the next one-second tick.
    ///
    /// Malformed registers are logged and dropped by the clock.
    pub async fn apply_raw_time(&self, raw: [u8; 3]) {
        self.0.send(ClockSignal::ApplyTime(raw)).await;
    }

    /// Ask the clock task to feed the hardware watchdog.
    ///
    /// Call this more often than the watchdog timeout. If the clock task stops draining its
    /// queue the feeding stops too, and the watchdog resets the board.
    pub async fn pet_watchdog(&self) {
        self.0.send(ClockSignal::Watchdog).await;
    }
}

/// The state machine's view of the hardware.
struct DeviceEffects {
    rtc_bus: RtcBus<'static>,
    square_wave: SquareWave<'static>,
    word_leds: WordLeds<'static>,
    watchdog: Watchdog,
    deadline: Option<Instant>,
}

impl ClockEffects for DeviceEffects {
    fn issue(&mut self, request: BusRequest) {
        if !self.rtc_bus.try_issue(request) {
            // The reply guard turns the lost request into a timeout.
            warn!("RTC bus queue full, dropped {:?}", request);
        }
    }

    fn show(&mut self, phrase: &Phrase) {
        self.word_leds.show(phrase);
    }

    fn enable_tick(&mut self) {
        self.square_wave.enable();
    }

    #[expect(
        clippy::arithmetic_side_effects,
        reason = "Instants are microseconds since boot and cannot overflow"
    )]
    fn arm_guard(&mut self, timeout: Duration) {
        self.deadline = Some(Instant::now() + timeout);
    }

    fn disarm_guard(&mut self) {
        self.deadline = None;
    }

    fn forward_watchdog(&mut self) {
        self.watchdog.feed();
    }
}

#[embassy_executor::task]
async fn clock_loop(
    signals: &'static ClockSignals,
    clock_sync: ClockSync,
    effects: DeviceEffects,
) -> ! {
    let Err(err) = inner_clock_loop(signals, clock_sync, effects).await;
    error!("Word clock failed, restarting: {:?}", err);
    SCB::sys_reset();
}

async fn inner_clock_loop(
    signals: &'static ClockSignals,
    mut clock_sync: ClockSync,
    mut effects: DeviceEffects,
) -> Result<Infallible> {
    info!("Word clock started: {:?}", clock_sync.config());
    clock_sync.start(&mut effects)?;
    loop {
        let signal = match effects.deadline {
            None => signals.receive().await,
            Some(deadline) => match select(signals.receive(), Timer::at(deadline)).await {
                Either::First(signal) => signal,
                Either::Second(()) => {
                    effects.deadline = None;
                    ClockSignal::ReplyTimeout
                }
            },
        };
        clock_sync.dispatch(signal, &mut effects)?;
    }
}
