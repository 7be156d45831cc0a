//! Keeps the five-second RTC poll aligned with the RTC's own five-second boundaries.
//!
//! Each read of the seconds register tells us how far the poll has slipped. The next countdown is
//! shortened or lengthened by that amount, so the following read lands back on a boundary.

use crate::constants::{MAX_COUNTDOWN, MIN_COUNTDOWN, POLL_INTERVAL};
use crate::error::ContractViolation;

const ONES: u8 = 0b_0000_1111;

/// Signed distance, in seconds, from the nearest five-second boundary.
///
/// Positive means the read came late (after the boundary), negative means early. A residual of
/// 3 or 4 seconds past a boundary is read as 2 or 1 seconds before the next one.
#[must_use]
#[expect(
    clippy::integer_division_remainder_used,
    reason = "The residual is defined by the remainder"
)]
pub const fn phase_error(raw_seconds: u8) -> i8 {
    match (raw_seconds & ONES) % 10 % 5 {
        1 => 1,
        2 => 2,
        3 => -2,
        4 => -1,
        _ => 0,
    }
}

/// The countdown until the next poll: five seconds, corrected by `phase_error`.
///
/// # Errors
///
/// Returns [`ContractViolation::PhaseError`] if `phase_error` is outside -2..=2.
#[expect(
    clippy::arithmetic_side_effects,
    reason = "phase_error is checked to be -2..=2 first"
)]
pub const fn next_countdown(phase_error: i8) -> Result<PollCountdown, ContractViolation> {
    if phase_error < -2 || phase_error > 2 {
        return Err(ContractViolation::PhaseError(phase_error));
    }
    #[expect(clippy::cast_possible_wrap, reason = "POLL_INTERVAL is 5")]
    let countdown = POLL_INTERVAL as i8 - phase_error;
    PollCountdown::corrected(countdown)
}

/// One-second ticks remaining before the next RTC read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollCountdown(u8);

/// What a tick did to the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Countdown {
    /// Reached zero: time to read the RTC.
    Expired,
    /// Still waiting, this many ticks left.
    Waiting(u8),
}

impl PollCountdown {
    /// The countdown set after the RTC has been written.
    pub const AFTER_WRITE: Self = Self(POLL_INTERVAL);

    /// Fire on the very next tick. Used to retry a poll that could not be issued.
    pub const NEXT_TICK: Self = Self(1);

    /// A drift-corrected countdown.
    ///
    /// # Errors
    ///
    /// Returns [`ContractViolation::Countdown`] if `ticks` is outside 3..=7.
    #[expect(clippy::cast_sign_loss, reason = "ticks is checked to be 3..=7 first")]
    #[expect(clippy::cast_possible_wrap, reason = "The bounds are 3 and 7")]
    pub const fn corrected(ticks: i8) -> Result<Self, ContractViolation> {
        if ticks < MIN_COUNTDOWN as i8 || ticks > MAX_COUNTDOWN as i8 {
            return Err(ContractViolation::Countdown(ticks));
        }
        Ok(Self(ticks as u8))
    }

    #[must_use]
    pub const fn ticks(self) -> u8 {
        self.0
    }

    /// Count one tick down. An expired countdown stays expired.
    #[must_use]
    pub const fn tick(&mut self) -> Countdown {
        self.0 = self.0.saturating_sub(1);
        match self.0 {
            0 => Countdown::Expired,
            ticks => Countdown::Waiting(ticks),
        }
    }
}
