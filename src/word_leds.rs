//! A device abstraction for the lamps behind the words of the face.
//!
//! See [`WordLeds`] for usage.

use core::convert::Infallible;

use embassy_executor::Spawner;
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};

use crate::Result;
use crate::output_array::OutputArray;
use crate::words::{LitWords, Phrase, WORD_COUNT, set_display_words};

/// Static for the [`WordLeds`] device.
pub struct WordLedsStatic(Signal<CriticalSectionRawMutex, LitWords>);

impl WordLedsStatic {
    const fn new() -> Self {
        Self(Signal::new())
    }

    fn signal(&self, lit: LitWords) {
        self.0.signal(lit);
    }

    async fn wait(&self) -> LitWords {
        self.0.wait().await
    }
}

/// A device abstraction for the word lamps.
///
/// Only the latest request matters: if several arrive before the task runs, the face goes
/// straight to the last one.
///
/// # Example
///
/// ```no_run
/// # #![no_std]
/// # #![no_main]
/// use word_clock::{OutputArray, WordLeds, WordLedsStatic, render};
/// use embassy_rp::gpio::{Level, Output};
/// # #[panic_handler]
/// # fn panic(_info: &core::panic::PanicInfo) -> ! { loop {} }
///
/// async fn example(p: embassy_rp::Peripherals, spawner: embassy_executor::Spawner) -> word_clock::Result<()> {
///     let lamps = OutputArray::new([
///         Output::new(p.PIN_6, Level::Low),
///         Output::new(p.PIN_7, Level::Low),
///         Output::new(p.PIN_8, Level::Low),
///         Output::new(p.PIN_9, Level::Low),
///         Output::new(p.PIN_10, Level::Low),
///         Output::new(p.PIN_11, Level::Low),
///         Output::new(p.PIN_12, Level::Low),
///         Output::new(p.PIN_13, Level::Low),
///         Output::new(p.PIN_14, Level::Low),
///         Output::new(p.PIN_15, Level::Low),
///         Output::new(p.PIN_16, Level::Low),
///         Output::new(p.PIN_17, Level::Low),
///         Output::new(p.PIN_18, Level::Low),
///         Output::new(p.PIN_19, Level::Low),
///         Output::new(p.PIN_20, Level::Low),
///         Output::new(p.PIN_21, Level::Low),
///         Output::new(p.PIN_22, Level::Low),
///         Output::new(p.PIN_26, Level::Low),
///         Output::new(p.PIN_27, Level::Low),
///         Output::new(p.PIN_28, Level::Low),
///     ]);
///
///     static WORD_LEDS_STATIC: WordLedsStatic = WordLeds::new_static();
///     let word_leds = WordLeds::new(&WORD_LEDS_STATIC, lamps, spawner)?;
///
///     // "twenty-five to ten"
///     word_leds.show(&render(9, 35)?);
///     Ok(())
/// }
/// ```
pub struct WordLeds<'a>(&'a WordLedsStatic);

impl WordLeds<'_> {
    /// Creates static resources for the lamps.
    #[must_use]
    pub const fn new_static() -> WordLedsStatic {
        WordLedsStatic::new()
    }

    /// Creates the lamp device and spawns its background task.
    ///
    /// # Errors
    ///
    /// Returns an error if the task cannot be spawned.
    pub fn new(
        word_leds_static: &'static WordLedsStatic,
        lamps: OutputArray<'static, WORD_COUNT>,
        spawner: Spawner,
    ) -> Result<Self> {
        let token = device_loop(lamps, word_leds_static)?;
        spawner.spawn(token);
        Ok(Self(word_leds_static))
    }

    /// Light exactly the words of `phrase`.
    pub fn show(&self, phrase: &Phrase) {
        self.0.signal(phrase.lit_words());
    }

    /// Switch every lamp off.
    pub fn clear(&self) {
        self.0.signal(LitWords::EMPTY);
    }
}

#[embassy_executor::task]
async fn device_loop(
    lamps: OutputArray<'static, WORD_COUNT>,
    word_leds_static: &'static WordLedsStatic,
) -> ! {
    let Err(err) = inner_device_loop(lamps, word_leds_static).await;
    panic!("{err}");
}

async fn inner_device_loop(
    mut lamps: OutputArray<'static, WORD_COUNT>,
    word_leds_static: &'static WordLedsStatic,
) -> Result<Infallible> {
    loop {
        let lit = word_leds_static.wait().await;
        set_display_words(&mut lamps, lit)?;
    }
}
