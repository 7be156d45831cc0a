//! Conversion between the DS1307's packed-decimal registers and a plain time of day.
//!
//! The RTC keeps each field as two decimal digits packed into one byte: the "tens" digit in the
//! upper bits and the "ones" digit in the low nibble. The hours register also carries the
//! 12/24-hour mode flag and, in 12-hour mode, the AM/PM flag.
//!
//! See [`SemanticTime`] for decoding and encoding.

use core::fmt;

use crate::error::ContractViolation;

/// Register index of the seconds register (bit 7 is the clock-halt flag).
pub const SECONDS_REGISTER: u8 = 0;
/// Register index of the minutes register.
pub const MINUTES_REGISTER: u8 = 1;
/// Register index of the hours register.
pub const HOURS_REGISTER: u8 = 2;
/// Register index of the weekday register.
pub const WEEKDAY_REGISTER: u8 = 3;
/// Register index of the control register.
pub const CONTROL_REGISTER: u8 = 7;

/// Number of timekeeping and control registers written on a full clock set.
pub const REGISTER_COUNT: usize = 8;

const CLOCK_HALT: u8 = 0b_1000_0000;
const TWELVE_HOUR_MODE: u8 = 0b_0100_0000;
const PM: u8 = 0b_0010_0000;
const ONES: u8 = 0b_0000_1111;
const SECONDS_MINUTES_TENS: u8 = 0b_0111_0000;
const TWELVE_HOUR_TENS: u8 = 0b_0001_0000;
const TWENTY_FOUR_HOUR_TENS: u8 = 0b_0011_0000;

/// Control register: output enabled, square wave enabled at 1 Hz.
pub const CONTROL_SQW_1HZ: u8 = 0b_1001_0000;

/// The register block written when no time has been supplied from outside.
///
/// 5:59:50 PM in 12-hour mode with the oscillator running, Sunday the 1st of January 2001, and a
/// 1 Hz square wave on the SQW pin.
pub const DEFAULT_REGISTERS: RawRegisterBlock = RawRegisterBlock([
    0x50,           // CH=0, seconds = 50
    0x59,           // 59 minutes
    0x65,           // 12-hour mode, 5 PM
    0x07,           // Sunday
    0x01,           // 1st
    0x01,           // January
    0x01,           // 2001
    CONTROL_SQW_1HZ,
]);

/// The RTC's native register contents, seconds register first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawRegisterBlock(pub [u8; REGISTER_COUNT]);

impl RawRegisterBlock {
    /// The seconds, minutes and hours registers.
    #[must_use]
    pub const fn time_bytes(&self) -> [u8; 3] {
        let [seconds, minutes, hours, ..] = self.0;
        [seconds, minutes, hours]
    }

    /// All registers as a byte slice, ready to follow the register pointer on the wire.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// The hour as the RTC holds it: either 12-hour with a meridiem flag or 24-hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Hour {
    /// 1 through 12, with `pm` set in the afternoon.
    Twelve { hour: u8, pm: bool },
    /// 0 through 23.
    TwentyFour(u8),
}

/// A decoded time of day.
///
/// Only produced by [`SemanticTime::decode`] or the validating constructors, so every value in
/// range is guaranteed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SemanticTime {
    hour: Hour,
    minutes: u8,
    seconds: u8,
}

impl SemanticTime {
    /// A 12-hour time.
    ///
    /// # Errors
    ///
    /// Returns a [`ContractViolation`] if any field is out of range.
    pub const fn twelve_hour(
        hour: u8,
        pm: bool,
        minutes: u8,
        seconds: u8,
    ) -> Result<Self, ContractViolation> {
        if hour < 1 || hour > 12 {
            return Err(ContractViolation::HourOutOfRange { hour, raw: hour });
        }
        Self::checked(Hour::Twelve { hour, pm }, minutes, seconds)
    }

    /// A 24-hour time.
    ///
    /// # Errors
    ///
    /// Returns a [`ContractViolation`] if any field is out of range.
    pub const fn twenty_four_hour(
        hour: u8,
        minutes: u8,
        seconds: u8,
    ) -> Result<Self, ContractViolation> {
        if hour > 23 {
            return Err(ContractViolation::HourOutOfRange { hour, raw: hour });
        }
        Self::checked(Hour::TwentyFour(hour), minutes, seconds)
    }

    const fn checked(hour: Hour, minutes: u8, seconds: u8) -> Result<Self, ContractViolation> {
        if minutes > 59 {
            return Err(ContractViolation::TensDigitOutOfRange {
                register: MINUTES_REGISTER,
                tens: minutes / 10,
                raw: minutes,
            });
        }
        if seconds > 59 {
            return Err(ContractViolation::TensDigitOutOfRange {
                register: SECONDS_REGISTER,
                tens: seconds / 10,
                raw: seconds,
            });
        }
        Ok(Self {
            hour,
            minutes,
            seconds,
        })
    }

    /// Decode the seconds, minutes and hours registers.
    ///
    /// The clock-halt flag in the seconds register is ignored; see [`clock_halted`].
    ///
    /// # Errors
    ///
    /// Returns a [`ContractViolation`] if a ones digit is above 9, a tens digit is beyond what its
    /// register allows, or the hour is out of range for its mode.
    pub fn decode(raw: [u8; 3]) -> Result<Self, ContractViolation> {
        let [seconds_raw, minutes_raw, hours_raw] = raw;
        let seconds = unpack(SECONDS_REGISTER, seconds_raw, SECONDS_MINUTES_TENS, 5)?;
        let minutes = unpack(MINUTES_REGISTER, minutes_raw, SECONDS_MINUTES_TENS, 5)?;

        let hour = if hours_raw & TWELVE_HOUR_MODE == 0 {
            let hour = unpack(HOURS_REGISTER, hours_raw, TWENTY_FOUR_HOUR_TENS, 2)?;
            if hour > 23 {
                return Err(ContractViolation::HourOutOfRange {
                    hour,
                    raw: hours_raw,
                });
            }
            Hour::TwentyFour(hour)
        } else {
            let hour = unpack(HOURS_REGISTER, hours_raw, TWELVE_HOUR_TENS, 1)?;
            if !(1..=12).contains(&hour) {
                return Err(ContractViolation::HourOutOfRange {
                    hour,
                    raw: hours_raw,
                });
            }
            Hour::Twelve {
                hour,
                pm: hours_raw & PM != 0,
            }
        };

        Ok(Self {
            hour,
            minutes,
            seconds,
        })
    }

    /// Encode as the seconds, minutes and hours registers, with the oscillator running.
    #[must_use]
    pub const fn encode(&self) -> [u8; 3] {
        let hours = match self.hour {
            Hour::Twelve { hour, pm } => {
                let meridiem = if pm { PM } else { 0 };
                TWELVE_HOUR_MODE | meridiem | pack(hour)
            }
            Hour::TwentyFour(hour) => pack(hour),
        };
        [pack(self.seconds), pack(self.minutes), hours]
    }

    #[must_use]
    pub const fn hour(&self) -> Hour {
        self.hour
    }

    #[must_use]
    pub const fn minutes(&self) -> u8 {
        self.minutes
    }

    #[must_use]
    pub const fn seconds(&self) -> u8 {
        self.seconds
    }

    /// The hour as shown on a 12-hour face, 1 through 12.
    #[must_use]
    #[expect(
        clippy::arithmetic_side_effects,
        clippy::integer_division_remainder_used,
        reason = "hour < 24, so the remainder cannot overflow"
    )]
    pub const fn face_hour(&self) -> u8 {
        match self.hour {
            Hour::Twelve { hour, .. } => hour,
            Hour::TwentyFour(hour) => match hour % 12 {
                0 => 12,
                face_hour => face_hour,
            },
        }
    }

    /// True exactly at the top of a five-minute interval (seconds zero, minutes a multiple of five).
    #[must_use]
    #[expect(
        clippy::integer_division_remainder_used,
        reason = "Five-minute boundaries are defined by the remainder"
    )]
    pub const fn is_five_minute_boundary(&self) -> bool {
        self.seconds == 0 && self.minutes % 5 == 0
    }
}

impl fmt::Display for SemanticTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.hour {
            Hour::Twelve { hour, pm } => write!(
                f,
                "{hour}:{:02}:{:02} {}",
                self.minutes,
                self.seconds,
                if pm { "PM" } else { "AM" }
            ),
            Hour::TwentyFour(hour) => {
                write!(f, "{hour}:{:02}:{:02} (24)", self.minutes, self.seconds)
            }
        }
    }
}

/// True when the seconds register has the clock-halt flag set (oscillator stopped).
#[must_use]
pub const fn clock_halted(raw_seconds: u8) -> bool {
    raw_seconds & CLOCK_HALT != 0
}

/// An externally supplied time waiting to be written to the RTC.
///
/// Holds the seconds, minutes and hours registers in native encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeOverride([u8; 3]);

impl TimeOverride {
    /// Accept a raw payload after checking that it decodes.
    ///
    /// # Errors
    ///
    /// Returns a [`ContractViolation`] describing the first malformed register.
    pub fn new(raw: [u8; 3]) -> Result<Self, ContractViolation> {
        SemanticTime::decode(raw)?;
        Ok(Self(raw))
    }

    /// Build the payload for a time that is already known to be valid.
    #[must_use]
    pub const fn from_time(time: &SemanticTime) -> Self {
        Self(time.encode())
    }

    #[must_use]
    pub const fn bytes(&self) -> [u8; 3] {
        self.0
    }

    /// The time this override will set.
    ///
    /// # Errors
    ///
    /// Cannot fail for a value built through [`TimeOverride::new`] or [`TimeOverride::from_time`];
    /// the `Result` keeps the codec the single judge of validity.
    pub fn time(&self) -> Result<SemanticTime, ContractViolation> {
        SemanticTime::decode(self.0)
    }
}

#[expect(
    clippy::arithmetic_side_effects,
    reason = "tens <= 7 and ones <= 9 after the checks, so tens * 10 + ones <= 79"
)]
const fn unpack(register: u8, raw: u8, tens_mask: u8, max_tens: u8) -> Result<u8, ContractViolation> {
    let ones = raw & ONES;
    let tens = (raw & tens_mask) >> 4;
    if ones > 9 {
        return Err(ContractViolation::OnesDigitOutOfRange {
            register,
            ones,
            raw,
        });
    }
    if tens > max_tens {
        return Err(ContractViolation::TensDigitOutOfRange {
            register,
            tens,
            raw,
        });
    }
    Ok(tens * 10 + ones)
}

#[expect(
    clippy::integer_division_remainder_used,
    reason = "Digit extraction needs division; value <= 59"
)]
const fn pack(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}
