//! Word clock on a Pico 1: DS1307 on I2C0, its SQW output on GP3, and twenty word lamps.

#![no_std]
#![no_main]
#![allow(clippy::future_not_send, reason = "single-threaded")]

use core::convert::Infallible;

use defmt::info;
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::watchdog::Watchdog;
use embassy_time::Timer;
use panic_probe as _;
use word_clock::constants::WATCHDOG_PET_INTERVAL;
use word_clock::{
    ClockConfig, OutputArray, Result, RtcBus, RtcBusStatic, SquareWave, SquareWaveStatic,
    WordClock, WordClockStatic, WordLeds, WordLedsStatic,
};

#[embassy_executor::main]
pub async fn main(spawner: Spawner) -> ! {
    // If it returns, something went wrong.
    let Err(err) = inner_main(spawner).await;
    core::panic!("{err}");
}

async fn inner_main(spawner: Spawner) -> Result<Infallible> {
    let config = ClockConfig::from_env();
    info!("Starting word clock: {:?}", config);

    let p = embassy_rp::init(Default::default());

    // The clock's queue receives from the bus and the tick source, so its static comes first.
    static WORD_CLOCK_STATIC: WordClockStatic = WordClock::new_static();

    static RTC_BUS_STATIC: RtcBusStatic = RtcBus::new_static();
    let rtc_bus = RtcBus::new(
        &RTC_BUS_STATIC,
        p.I2C0,
        p.PIN_5, // SCL
        p.PIN_4, // SDA
        &WORD_CLOCK_STATIC,
        spawner,
    )?;

    static SQUARE_WAVE_STATIC: SquareWaveStatic = SquareWave::new_static();
    let square_wave = SquareWave::new(
        &SQUARE_WAVE_STATIC,
        p.PIN_3,
        config.tick_source,
        &WORD_CLOCK_STATIC,
        spawner,
    )?;

    // Lamp order follows `Word::ALL`.
    let lamps = OutputArray::new([
        Output::new(p.PIN_6, Level::Low),  // one
        Output::new(p.PIN_7, Level::Low),  // two
        Output::new(p.PIN_8, Level::Low),  // three
        Output::new(p.PIN_9, Level::Low),  // four
        Output::new(p.PIN_10, Level::Low), // five
        Output::new(p.PIN_11, Level::Low), // six
        Output::new(p.PIN_12, Level::Low), // seven
        Output::new(p.PIN_13, Level::Low), // eight
        Output::new(p.PIN_14, Level::Low), // nine
        Output::new(p.PIN_15, Level::Low), // ten
        Output::new(p.PIN_16, Level::Low), // eleven
        Output::new(p.PIN_17, Level::Low), // twelve
        Output::new(p.PIN_18, Level::Low), // o'clock
        Output::new(p.PIN_19, Level::Low), // five (minutes)
        Output::new(p.PIN_20, Level::Low), // ten (minutes)
        Output::new(p.PIN_21, Level::Low), // quarter
        Output::new(p.PIN_22, Level::Low), // twenty
        Output::new(p.PIN_26, Level::Low), // half
        Output::new(p.PIN_27, Level::Low), // past
        Output::new(p.PIN_28, Level::Low), // to
    ]);
    static WORD_LEDS_STATIC: WordLedsStatic = WordLeds::new_static();
    let word_leds = WordLeds::new(&WORD_LEDS_STATIC, lamps, spawner)?;

    let watchdog = Watchdog::new(p.WATCHDOG);

    let word_clock = WordClock::new(
        &WORD_CLOCK_STATIC,
        config,
        rtc_bus,
        square_wave,
        word_leds,
        watchdog,
        spawner,
    )?;

    info!("Entering watchdog loop");
    loop {
        Timer::after(WATCHDOG_PET_INTERVAL).await;
        word_clock.pet_watchdog().await;
    }
}
