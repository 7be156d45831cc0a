//! The word clock's state machine: keep the RTC set, poll it, and keep the face current.
//!
//! [`ClockSync`] is a pure run-to-completion state machine. It is fed one [`ClockSignal`] at a
//! time through [`ClockSync::dispatch`] and acts on the outside world only through
//! [`ClockEffects`]. The device task in `word_clock` owns the queue, the timers and the
//! collaborators; tests drive the same machine with a recording fake.
//!
//! There are two operating states:
//!
//! - [`OperatingState::SettingClock`] writes either a pending [`TimeOverride`] or the built-in
//!   default registers to the RTC, shows the written time and moves on to `Running`.
//! - [`OperatingState::Running`] counts one-second ticks down and then reads the seconds register
//!   and the minutes/hours block together. When both replies are in, the display is refreshed on
//!   five-minute boundaries and the countdown is corrected for drift.

use embassy_time::Duration;

use crate::bus::{BusReply, BusRequest, BusStatus, RequestId, Transfer};
use crate::constants::{REPLY_GUARD, SQUARE_WAVE_TICK, TRACE_REPLIES};
use crate::drift::{Countdown, PollCountdown, next_countdown, phase_error};
use crate::error::Result;
use crate::raw_time::{DEFAULT_REGISTERS, SemanticTime, TimeOverride, clock_halted};
use crate::words::{Phrase, render_time};

/// Which state the clock is in. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatingState {
    /// Writing a time to the RTC.
    SettingClock,
    /// Polling the RTC and updating the face.
    Running,
}

/// Everything the clock reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockSignal {
    /// One second passed.
    Tick,
    /// The bus driver finished a request.
    BusReply(BusReply),
    /// Set the RTC to these seconds, minutes and hours registers at the next tick.
    ApplyTime([u8; 3]),
    /// The hardware watchdog wants feeding.
    Watchdog,
    /// The liveness guard armed with the last request expired.
    ReplyTimeout,
}

/// Where the one-second tick comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickSource {
    /// Falling edges of the RTC's 1 Hz square-wave output.
    SquareWave,
    /// An internal one-second timer.
    Timer,
}

/// Runtime settings for [`ClockSync`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockConfig {
    /// Log every time-block reply and refresh the face on every poll, not just on boundaries.
    pub trace_replies: bool,
    pub tick_source: TickSource,
}

impl ClockConfig {
    /// The settings chosen at build time (`WORD_CLOCK_TRACE`, `WORD_CLOCK_SQW`).
    #[must_use]
    pub const fn from_env() -> Self {
        Self {
            trace_replies: TRACE_REPLIES,
            tick_source: if SQUARE_WAVE_TICK {
                TickSource::SquareWave
            } else {
                TickSource::Timer
            },
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// The ways the state machine reaches the outside world.
pub trait ClockEffects {
    /// Hand a request to the bus driver. The reply comes back as [`ClockSignal::BusReply`].
    fn issue(&mut self, request: BusRequest);
    /// Replace everything on the face with `phrase`.
    fn show(&mut self, phrase: &Phrase);
    /// Start the one-second tick. Called on every entry to `Running`.
    fn enable_tick(&mut self);
    /// Post [`ClockSignal::ReplyTimeout`] after `timeout` unless disarmed first.
    fn arm_guard(&mut self, timeout: Duration);
    fn disarm_guard(&mut self);
    /// Feed the hardware watchdog.
    fn forward_watchdog(&mut self);
}

/// A request in flight and, once it arrived, its reply.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Outstanding {
    request: BusRequest,
    reply: Option<BusReply>,
}

impl Outstanding {
    const fn new(request: BusRequest) -> Self {
        Self {
            request,
            reply: None,
        }
    }

    /// The reply, or a timed-out stand-in if none arrived.
    fn into_reply(self) -> BusReply {
        self.reply
            .unwrap_or_else(|| BusReply::without_data(&self.request, BusStatus::TimedOut))
    }
}

/// The two reads of one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PollCycle {
    seconds: Outstanding,
    block: Outstanding,
}

impl PollCycle {
    const fn is_complete(&self) -> bool {
        self.seconds.reply.is_some() && self.block.reply.is_some()
    }
}

/// A write in flight and the time it sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingWrite {
    request: BusRequest,
    time: SemanticTime,
}

/// The word clock's state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockSync {
    config: ClockConfig,
    state: OperatingState,
    countdown: PollCountdown,
    pending_override: Option<TimeOverride>,
    elapsed_ticks: u32,
    next_id: RequestId,
    write: Option<PendingWrite>,
    poll: Option<PollCycle>,
}

impl ClockSync {
    #[must_use]
    pub const fn new(config: ClockConfig) -> Self {
        Self {
            config,
            state: OperatingState::SettingClock,
            countdown: PollCountdown::AFTER_WRITE,
            pending_override: None,
            elapsed_ticks: 0,
            next_id: RequestId(0),
            write: None,
            poll: None,
        }
    }

    /// Take the initial transition: set the RTC to the built-in default time.
    ///
    /// # Errors
    ///
    /// Returns a contract violation if the time to write does not decode.
    pub fn start(&mut self, effects: &mut impl ClockEffects) -> Result<()> {
        self.enter_setting_clock(effects)
    }

    /// Process one signal to completion.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Contract`] when the RTC hands back a register that does not
    /// decode, or when drift correction computes an impossible countdown. Neither can be
    /// recovered from locally; the caller restarts.
    pub fn dispatch(&mut self, signal: ClockSignal, effects: &mut impl ClockEffects) -> Result<()> {
        match (self.state, signal) {
            (_, ClockSignal::Watchdog) => {
                effects.forward_watchdog();
                Ok(())
            }
            (OperatingState::SettingClock, ClockSignal::BusReply(reply)) => {
                self.on_write_reply(reply, effects)
            }
            (OperatingState::SettingClock, ClockSignal::ReplyTimeout) => self.on_write_timeout(effects),
            (OperatingState::SettingClock, ClockSignal::Tick) => Ok(()),
            (OperatingState::SettingClock, ClockSignal::ApplyTime(raw)) => {
                warn!("Apply time {=[u8]:#04x} ignored while setting clock", raw.as_slice());
                Ok(())
            }
            (OperatingState::Running, ClockSignal::Tick) => self.on_tick(effects),
            (OperatingState::Running, ClockSignal::BusReply(reply)) => self.on_read_reply(reply, effects),
            (OperatingState::Running, ClockSignal::ReplyTimeout) => self.on_read_timeout(effects),
            (OperatingState::Running, ClockSignal::ApplyTime(raw)) => {
                self.on_apply_time(raw);
                Ok(())
            }
        }
    }

    #[must_use]
    pub const fn state(&self) -> OperatingState {
        self.state
    }

    #[must_use]
    pub const fn countdown(&self) -> PollCountdown {
        self.countdown
    }

    #[must_use]
    pub const fn pending_override(&self) -> Option<TimeOverride> {
        self.pending_override
    }

    /// One-second ticks seen in `Running` since the display was last refreshed on a five-minute
    /// boundary.
    #[must_use]
    pub const fn elapsed_ticks(&self) -> u32 {
        self.elapsed_ticks
    }

    /// True while a poll is waiting for one or both of its replies.
    #[must_use]
    pub const fn poll_in_flight(&self) -> bool {
        self.poll.is_some()
    }

    #[must_use]
    pub const fn config(&self) -> ClockConfig {
        self.config
    }

    fn request(&mut self, transfer: Transfer) -> BusRequest {
        let id = self.next_id;
        self.next_id = id.next();
        BusRequest { id, transfer }
    }

    // SettingClock

    fn enter_setting_clock(&mut self, effects: &mut impl ClockEffects) -> Result<()> {
        info!("Setting clock");
        self.state = OperatingState::SettingClock;

        let (transfer, time) = match self.pending_override {
            Some(time_override) => (Transfer::WriteTime(time_override), time_override.time()?),
            None => (
                Transfer::WriteRegisters(DEFAULT_REGISTERS),
                SemanticTime::decode(DEFAULT_REGISTERS.time_bytes())?,
            ),
        };
        let request = self.request(transfer);
        self.write = Some(PendingWrite { request, time });
        effects.issue(request);
        effects.arm_guard(REPLY_GUARD);
        Ok(())
    }

    fn on_write_reply(&mut self, reply: BusReply, effects: &mut impl ClockEffects) -> Result<()> {
        let Some(write) = self.write.filter(|write| write.request.id == reply.id) else {
            unexpected_reply(self.state, &reply);
            return Ok(());
        };
        effects.disarm_guard();
        info!("Write reply: {:?}", reply.status);

        if reply.status.is_ok() {
            show_time(&write.time, effects)?;
        } else {
            warn!("Setting the clock failed: {:?}", reply.status);
        }
        self.transition_to_running(effects);
        Ok(())
    }

    fn on_write_timeout(&mut self, effects: &mut impl ClockEffects) -> Result<()> {
        let Some(write) = self.write else {
            debug!("Stale reply timeout while setting clock");
            return Ok(());
        };
        let reply = BusReply::without_data(&write.request, BusStatus::TimedOut);
        warn!("Timed out waiting for the write reply");
        self.on_write_reply(reply, effects)
    }

    fn exit_setting_clock(&mut self) {
        self.countdown = PollCountdown::AFTER_WRITE;
        self.pending_override = None;
        self.write = None;
    }

    // Running

    fn transition_to_running(&mut self, effects: &mut impl ClockEffects) {
        self.exit_setting_clock();
        self.state = OperatingState::Running;
        info!("Running");
        effects.enable_tick();
    }

    fn on_apply_time(&mut self, raw: [u8; 3]) {
        match TimeOverride::new(raw) {
            Ok(time_override) => {
                info!("Apply time {:?} at the next tick", time_override);
                self.pending_override = Some(time_override);
            }
            Err(violation) => {
                warn!(
                    "Rejected apply time {=[u8]:#04x}: {:?}",
                    raw.as_slice(),
                    violation
                );
            }
        }
    }

    fn on_tick(&mut self, effects: &mut impl ClockEffects) -> Result<()> {
        self.elapsed_ticks = self.elapsed_ticks.saturating_add(1);

        if self.pending_override.is_some() {
            if self.poll.is_some() {
                debug!("Setting clock after the poll in flight completes");
                return Ok(());
            }
            return self.enter_setting_clock(effects);
        }

        match self.countdown.tick() {
            Countdown::Waiting(_) => {}
            Countdown::Expired if self.poll.is_some() => {
                warn!("Poll due while the previous poll is in flight; retrying next tick");
                self.countdown = PollCountdown::NEXT_TICK;
            }
            Countdown::Expired => self.start_poll(effects),
        }
        Ok(())
    }

    fn start_poll(&mut self, effects: &mut impl ClockEffects) {
        let seconds = self.request(Transfer::ReadSeconds);
        let block = self.request(Transfer::ReadTimeBlock);
        self.poll = Some(PollCycle {
            seconds: Outstanding::new(seconds),
            block: Outstanding::new(block),
        });
        effects.issue(seconds);
        effects.issue(block);
        effects.arm_guard(REPLY_GUARD);
    }

    fn on_read_reply(&mut self, reply: BusReply, effects: &mut impl ClockEffects) -> Result<()> {
        let Some(poll) = self.poll.as_mut() else {
            unexpected_reply(self.state, &reply);
            return Ok(());
        };
        let slot = if reply.id == poll.seconds.request.id {
            &mut poll.seconds
        } else if reply.id == poll.block.request.id {
            &mut poll.block
        } else {
            unexpected_reply(self.state, &reply);
            return Ok(());
        };
        debug!("{:?} reply: {:?}", reply.transfer, reply.status);
        slot.reply = Some(reply);

        if poll.is_complete() {
            self.complete_poll(effects)?;
        }
        Ok(())
    }

    fn on_read_timeout(&mut self, effects: &mut impl ClockEffects) -> Result<()> {
        if self.poll.is_none() {
            debug!("Stale reply timeout");
            return Ok(());
        }
        warn!("Timed out waiting for the RTC");
        self.complete_poll(effects)
    }

    /// Both reads are in (or the guard expired): refresh the face and correct the countdown.
    fn complete_poll(&mut self, effects: &mut impl ClockEffects) -> Result<()> {
        let Some(poll) = self.poll.take() else {
            return Ok(());
        };
        effects.disarm_guard();
        let seconds = poll.seconds.into_reply();
        let block = poll.block.into_reply();

        let raw_seconds = seconds.first_byte();
        let time = match (raw_seconds, block.status.is_ok(), block.data.as_slice()) {
            (Some(seconds_register), true, &[minutes, hours, _weekday]) => {
                Some(self.on_time_block([seconds_register, minutes, hours], effects)?)
            }
            _ => {
                warn!(
                    "RTC read failed: seconds {:?}, time block {:?}",
                    seconds.status,
                    block.status
                );
                None
            }
        };

        self.countdown = match raw_seconds {
            Some(seconds_register) => {
                let drift = phase_error(seconds_register);
                if drift != 0 {
                    info!(
                        "Drift {=i8} s at {:?}, {=u32} ticks since the last boundary",
                        drift,
                        time.flatten(),
                        self.elapsed_ticks
                    );
                }
                next_countdown(drift)?
            }
            None => PollCountdown::AFTER_WRITE,
        };
        Ok(())
    }

    /// Handle a successfully read time. Returns the decoded time unless the oscillator is halted.
    fn on_time_block(
        &mut self,
        raw: [u8; 3],
        effects: &mut impl ClockEffects,
    ) -> Result<Option<SemanticTime>> {
        let [raw_seconds, ..] = raw;
        if clock_halted(raw_seconds) {
            warn!("Time block {=[u8]:#04x}: clock disabled", raw.as_slice());
            return Ok(None);
        }
        let time = SemanticTime::decode(raw)?;

        if self.config.trace_replies {
            info!("Time block {=[u8]:#04x}: {:?}", raw.as_slice(), time);
            show_time(&time, effects)?;
        } else if time.is_five_minute_boundary() {
            self.elapsed_ticks = 0;
            show_time(&time, effects)?;
        }
        Ok(Some(time))
    }
}

fn show_time(time: &SemanticTime, effects: &mut impl ClockEffects) -> Result<()> {
    let phrase = render_time(time)?;
    let text = phrase.text()?;
    info!("Showing \"{=str}\" for {:?}", text.as_str(), time);
    effects.show(&phrase);
    Ok(())
}

fn unexpected_reply(state: OperatingState, reply: &BusReply) {
    warn!(
        "Unexpected reply in {:?}: id {:?}, {:?}, {:?}",
        state,
        reply.id,
        reply.transfer,
        reply.status
    );
}
