//! A word clock for the Raspberry Pi Pico: keeps a DS1307 real-time clock set, polls it in step
//! with its own seconds, and lights the words that tell the time ("twenty-five to ten").
//!
//! The core ([`raw_time`], [`words`], [`drift`], [`bus`], [`clock_sync`]) is hardware-free and
//! builds with the `host` feature for testing. The device modules wire it to embassy tasks.
#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible in every module below.
mod fmt;

pub mod bus;
pub mod clock_sync;
pub mod constants;
pub mod drift;
mod error;
pub mod raw_time;
pub mod words;

#[cfg(not(feature = "host"))]
mod output_array;
#[cfg(not(feature = "host"))]
mod rtc_bus;
#[cfg(not(feature = "host"))]
mod square_wave;
#[cfg(not(feature = "host"))]
mod word_clock;
#[cfg(not(feature = "host"))]
mod word_leds;

// Re-export commonly used items
pub use bus::{BusReply, BusRequest, BusStatus, RequestId, Transfer, perform};
pub use clock_sync::{
    ClockConfig, ClockEffects, ClockSignal, ClockSync, OperatingState, TickSource,
};
pub use drift::{Countdown, PollCountdown, next_countdown, phase_error};
pub use error::{ContractViolation, Error, Result};
pub use raw_time::{DEFAULT_REGISTERS, Hour, RawRegisterBlock, SemanticTime, TimeOverride};
pub use words::{LitWords, Phrase, Word, WordOutputs, render, render_time, set_display_words};

#[cfg(not(feature = "host"))]
pub use output_array::OutputArray;
#[cfg(not(feature = "host"))]
pub use rtc_bus::{RtcBus, RtcBusStatic};
#[cfg(not(feature = "host"))]
pub use square_wave::{SquareWave, SquareWaveStatic};
#[cfg(not(feature = "host"))]
pub use word_clock::{ClockSignals, WordClock, WordClockStatic};
#[cfg(not(feature = "host"))]
pub use word_leds::{WordLeds, WordLedsStatic};
