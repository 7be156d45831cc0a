#![cfg(feature = "host")]
//! Host-level tests for the clock state machine, driven through a recording fake.

use embassy_time::Duration;
use word_clock::constants::REPLY_GUARD;
use word_clock::{
    BusReply, BusRequest, BusStatus, ClockConfig, ClockEffects, ClockSignal, ClockSync,
    ContractViolation, DEFAULT_REGISTERS, Error, OperatingState, Phrase, RequestId, TickSource,
    TimeOverride, Transfer,
};

#[derive(Default)]
struct Recorder {
    issued: Vec<BusRequest>,
    shown: Vec<String>,
    tick_enables: usize,
    guard: Option<Duration>,
    watchdog_feeds: usize,
}

impl ClockEffects for Recorder {
    fn issue(&mut self, request: BusRequest) {
        self.issued.push(request);
    }

    fn show(&mut self, phrase: &Phrase) {
        self.shown.push(phrase.to_string());
    }

    fn enable_tick(&mut self) {
        self.tick_enables += 1;
    }

    fn arm_guard(&mut self, timeout: Duration) {
        self.guard = Some(timeout);
    }

    fn disarm_guard(&mut self) {
        self.guard = None;
    }

    fn forward_watchdog(&mut self) {
        self.watchdog_feeds += 1;
    }
}

const QUIET: ClockConfig = ClockConfig {
    trace_replies: false,
    tick_source: TickSource::SquareWave,
};

const TRACING: ClockConfig = ClockConfig {
    trace_replies: true,
    tick_source: TickSource::Timer,
};

fn ok(request: &BusRequest, data: &[u8]) -> ClockSignal {
    ClockSignal::BusReply(BusReply::with_data(request, data))
}

fn failed(request: &BusRequest, status: BusStatus) -> ClockSignal {
    ClockSignal::BusReply(BusReply::without_data(request, status))
}

fn send(clock: &mut ClockSync, effects: &mut Recorder, signal: ClockSignal) {
    clock.dispatch(signal, effects).expect("no contract violation");
}

/// Boot, acknowledge the default write, and forget what that took.
fn running(config: ClockConfig) -> (ClockSync, Recorder) {
    let mut clock = ClockSync::new(config);
    let mut effects = Recorder::default();
    clock.start(&mut effects).expect("default time is valid");
    let write = effects.issued[0];
    send(&mut clock, &mut effects, ok(&write, &[]));
    assert_eq!(clock.state(), OperatingState::Running);
    effects.issued.clear();
    effects.shown.clear();
    (clock, effects)
}

/// Tick until the countdown runs out; returns the seconds and time-block reads.
fn tick_until_poll(clock: &mut ClockSync, effects: &mut Recorder) -> (BusRequest, BusRequest) {
    for _ in 0..clock.countdown().ticks() {
        assert!(effects.issued.is_empty());
        send(clock, effects, ClockSignal::Tick);
    }
    let [seconds, block] = effects.issued[..] else {
        panic!("expected two reads, got {:?}", effects.issued);
    };
    effects.issued.clear();
    (seconds, block)
}

#[test]
fn boot_writes_the_default_registers() {
    let mut clock = ClockSync::new(QUIET);
    let mut effects = Recorder::default();
    clock.start(&mut effects).expect("default time is valid");

    assert_eq!(clock.state(), OperatingState::SettingClock);
    assert_eq!(effects.issued.len(), 1);
    assert_eq!(
        effects.issued[0].transfer,
        Transfer::WriteRegisters(DEFAULT_REGISTERS)
    );
    assert_eq!(effects.guard, Some(REPLY_GUARD));
    assert!(effects.shown.is_empty());
    assert_eq!(effects.tick_enables, 0);
}

#[test]
fn boot_with_default_time_ends_running_and_shows_it() {
    let mut clock = ClockSync::new(QUIET);
    let mut effects = Recorder::default();
    clock.start(&mut effects).expect("default time is valid");
    let write = effects.issued[0];
    send(&mut clock, &mut effects, ok(&write, &[]));

    assert_eq!(clock.state(), OperatingState::Running);
    // 5:59:50 PM rounds down to 5:55.
    assert_eq!(effects.shown, ["five to six"]);
    assert_eq!(effects.tick_enables, 1);
    assert_eq!(effects.guard, None);
    assert_eq!(clock.countdown().ticks(), 5);
    assert_eq!(clock.pending_override(), None);
}

#[test]
fn failed_write_still_moves_on_without_showing() {
    let mut clock = ClockSync::new(QUIET);
    let mut effects = Recorder::default();
    clock.start(&mut effects).expect("default time is valid");
    let write = effects.issued[0];
    send(&mut clock, &mut effects, failed(&write, BusStatus::NoAcknowledge));

    assert_eq!(clock.state(), OperatingState::Running);
    assert!(effects.shown.is_empty());
    assert_eq!(clock.countdown().ticks(), 5);
}

#[test]
fn write_timeout_moves_on_without_showing() {
    let mut clock = ClockSync::new(QUIET);
    let mut effects = Recorder::default();
    clock.start(&mut effects).expect("default time is valid");
    send(&mut clock, &mut effects, ClockSignal::ReplyTimeout);

    assert_eq!(clock.state(), OperatingState::Running);
    assert!(effects.shown.is_empty());
}

#[test]
fn ticks_while_setting_the_clock_are_ignored() {
    let mut clock = ClockSync::new(QUIET);
    let mut effects = Recorder::default();
    clock.start(&mut effects).expect("default time is valid");
    send(&mut clock, &mut effects, ClockSignal::Tick);
    send(&mut clock, &mut effects, ClockSignal::Tick);

    assert_eq!(clock.state(), OperatingState::SettingClock);
    assert_eq!(effects.issued.len(), 1);
}

#[test]
fn fifth_tick_issues_both_reads_and_arms_the_guard() {
    let (mut clock, mut effects) = running(QUIET);
    for _ in 0..4 {
        send(&mut clock, &mut effects, ClockSignal::Tick);
    }
    assert!(effects.issued.is_empty());
    assert_eq!(effects.guard, None);

    send(&mut clock, &mut effects, ClockSignal::Tick);
    let transfers: Vec<Transfer> = effects.issued.iter().map(|request| request.transfer).collect();
    assert_eq!(transfers, [Transfer::ReadSeconds, Transfer::ReadTimeBlock]);
    assert_ne!(effects.issued[0].id, effects.issued[1].id);
    assert_eq!(effects.guard, Some(REPLY_GUARD));
    assert_eq!(REPLY_GUARD, Duration::from_millis(1500));
    assert!(clock.poll_in_flight());
}

#[test]
fn apply_time_while_running_sets_the_clock_at_the_next_tick() {
    let (mut clock, mut effects) = running(QUIET);
    // seconds 00, minutes 30, 12-hour mode PM 9
    send(&mut clock, &mut effects, ClockSignal::ApplyTime([0x00, 0x30, 0x69]));
    assert_eq!(clock.state(), OperatingState::Running);
    assert!(effects.issued.is_empty());
    assert_eq!(
        clock.pending_override(),
        Some(TimeOverride::new([0x00, 0x30, 0x69]).expect("valid"))
    );

    send(&mut clock, &mut effects, ClockSignal::Tick);
    assert_eq!(clock.state(), OperatingState::SettingClock);
    let write = effects.issued[0];
    assert_eq!(
        write.transfer,
        Transfer::WriteTime(TimeOverride::new([0x00, 0x30, 0x69]).expect("valid"))
    );

    send(&mut clock, &mut effects, ok(&write, &[]));
    assert_eq!(clock.state(), OperatingState::Running);
    assert_eq!(effects.shown, ["half past nine"]);
    assert_eq!(clock.pending_override(), None);
    assert_eq!(clock.countdown().ticks(), 5);
    assert_eq!(effects.tick_enables, 2);
}

#[test]
fn malformed_apply_time_is_dropped() {
    let (mut clock, mut effects) = running(QUIET);
    send(&mut clock, &mut effects, ClockSignal::ApplyTime([0x00, 0x30, 0x29]));
    assert_eq!(clock.pending_override(), None);
    send(&mut clock, &mut effects, ClockSignal::Tick);
    assert_eq!(clock.state(), OperatingState::Running);
}

#[test]
fn apply_time_while_setting_the_clock_is_dropped() {
    let mut clock = ClockSync::new(QUIET);
    let mut effects = Recorder::default();
    clock.start(&mut effects).expect("default time is valid");
    send(&mut clock, &mut effects, ClockSignal::ApplyTime([0x00, 0x30, 0x69]));
    assert_eq!(clock.pending_override(), None);
}

#[test]
fn boundary_read_refreshes_the_display() {
    let (mut clock, mut effects) = running(QUIET);
    let (seconds, block) = tick_until_poll(&mut clock, &mut effects);
    send(&mut clock, &mut effects, ok(&seconds, &[0x00]));
    assert!(effects.shown.is_empty());
    assert_eq!(effects.guard, Some(REPLY_GUARD));

    send(&mut clock, &mut effects, ok(&block, &[0x35, 0x49, 0x01]));
    assert_eq!(effects.shown, ["twenty-five to ten"]);
    assert_eq!(clock.countdown().ticks(), 5);
    assert_eq!(clock.elapsed_ticks(), 0);
    assert_eq!(effects.guard, None);
    assert!(!clock.poll_in_flight());
}

#[test]
fn off_boundary_read_only_corrects_the_countdown() {
    let (mut clock, mut effects) = running(QUIET);
    let (seconds, block) = tick_until_poll(&mut clock, &mut effects);
    send(&mut clock, &mut effects, ok(&seconds, &[0x32]));
    send(&mut clock, &mut effects, ok(&block, &[0x35, 0x49, 0x01]));

    assert!(effects.shown.is_empty());
    assert_eq!(clock.countdown().ticks(), 3);
    assert_eq!(clock.elapsed_ticks(), 5);
}

#[test]
fn tracing_refreshes_on_every_read() {
    let (mut clock, mut effects) = running(TRACING);
    let (seconds, block) = tick_until_poll(&mut clock, &mut effects);
    send(&mut clock, &mut effects, ok(&seconds, &[0x32]));
    send(&mut clock, &mut effects, ok(&block, &[0x35, 0x49, 0x01]));

    assert_eq!(effects.shown, ["twenty-five to ten"]);
    assert_eq!(clock.countdown().ticks(), 3);
}

#[test]
fn replies_may_arrive_in_either_order() {
    let (mut clock, mut effects) = running(QUIET);
    let (seconds, block) = tick_until_poll(&mut clock, &mut effects);
    send(&mut clock, &mut effects, ok(&block, &[0x10, 0x52, 0x03]));
    assert!(clock.poll_in_flight());
    assert_eq!(clock.countdown().ticks(), 0);

    send(&mut clock, &mut effects, ok(&seconds, &[0x00]));
    assert_eq!(effects.shown, ["ten past twelve"]);
    assert_eq!(clock.countdown().ticks(), 5);
}

#[test]
fn drift_correction_keeps_polling_on_the_rtc_boundaries() {
    let (mut clock, mut effects) = running(QUIET);

    let (seconds, block) = tick_until_poll(&mut clock, &mut effects);
    send(&mut clock, &mut effects, ok(&seconds, &[0x44]));
    send(&mut clock, &mut effects, ok(&block, &[0x12, 0x49, 0x01]));
    assert_eq!(clock.countdown().ticks(), 6);

    let (seconds, block) = tick_until_poll(&mut clock, &mut effects);
    send(&mut clock, &mut effects, ok(&seconds, &[0x51]));
    send(&mut clock, &mut effects, ok(&block, &[0x12, 0x49, 0x01]));
    assert_eq!(clock.countdown().ticks(), 4);
}

#[test]
fn failed_read_keeps_the_display() {
    let (mut clock, mut effects) = running(QUIET);
    let (seconds, block) = tick_until_poll(&mut clock, &mut effects);
    send(&mut clock, &mut effects, ok(&seconds, &[0x00]));
    send(&mut clock, &mut effects, failed(&block, BusStatus::NoAcknowledge));

    assert!(effects.shown.is_empty());
    assert_eq!(clock.countdown().ticks(), 5);
    assert!(!clock.poll_in_flight());
    assert_eq!(effects.guard, None);
}

#[test]
fn failed_seconds_read_keeps_the_display() {
    let (mut clock, mut effects) = running(QUIET);
    let (seconds, block) = tick_until_poll(&mut clock, &mut effects);
    send(&mut clock, &mut effects, failed(&seconds, BusStatus::Bus));
    send(&mut clock, &mut effects, ok(&block, &[0x00, 0x49, 0x01]));

    assert!(effects.shown.is_empty());
    assert_eq!(clock.countdown().ticks(), 5);
}

#[test]
fn halted_oscillator_does_not_refresh() {
    let (mut clock, mut effects) = running(TRACING);
    let (seconds, block) = tick_until_poll(&mut clock, &mut effects);
    send(&mut clock, &mut effects, ok(&seconds, &[0x80]));
    send(&mut clock, &mut effects, ok(&block, &[0x00, 0x49, 0x01]));

    assert!(effects.shown.is_empty());
    assert_eq!(clock.countdown().ticks(), 5);
}

#[test]
fn guard_expiry_completes_the_poll() {
    let (mut clock, mut effects) = running(QUIET);
    let (seconds, _block) = tick_until_poll(&mut clock, &mut effects);
    send(&mut clock, &mut effects, ok(&seconds, &[0x03]));
    send(&mut clock, &mut effects, ClockSignal::ReplyTimeout);

    assert!(!clock.poll_in_flight());
    assert!(effects.shown.is_empty());
    // The seconds sample still corrects the countdown.
    assert_eq!(clock.countdown().ticks(), 7);
}

#[test]
fn guard_expiry_with_nothing_back_retries_in_five() {
    let (mut clock, mut effects) = running(QUIET);
    tick_until_poll(&mut clock, &mut effects);
    send(&mut clock, &mut effects, ClockSignal::ReplyTimeout);

    assert!(!clock.poll_in_flight());
    assert_eq!(clock.countdown().ticks(), 5);
    let (_seconds, _block) = tick_until_poll(&mut clock, &mut effects);
}

#[test]
fn late_reply_after_timeout_is_dropped() {
    let (mut clock, mut effects) = running(QUIET);
    let (seconds, block) = tick_until_poll(&mut clock, &mut effects);
    send(&mut clock, &mut effects, ClockSignal::ReplyTimeout);
    send(&mut clock, &mut effects, ok(&seconds, &[0x00]));
    send(&mut clock, &mut effects, ok(&block, &[0x00, 0x49, 0x01]));

    assert!(effects.shown.is_empty());
    assert_eq!(clock.countdown().ticks(), 5);
}

#[test]
fn stale_timeout_is_ignored() {
    let (mut clock, mut effects) = running(QUIET);
    send(&mut clock, &mut effects, ClockSignal::ReplyTimeout);
    assert_eq!(clock.state(), OperatingState::Running);
    assert_eq!(clock.countdown().ticks(), 5);
}

#[test]
fn reply_with_an_unknown_id_is_ignored() {
    let (mut clock, mut effects) = running(QUIET);
    let (seconds, _block) = tick_until_poll(&mut clock, &mut effects);
    let stranger = BusRequest {
        id: RequestId(seconds.id.0.wrapping_add(100)),
        transfer: Transfer::ReadTimeBlock,
    };
    send(&mut clock, &mut effects, ok(&stranger, &[0x00, 0x49, 0x01]));

    assert!(clock.poll_in_flight());
    assert!(effects.shown.is_empty());
}

#[test]
fn poll_due_while_busy_retries_next_tick() {
    let (mut clock, mut effects) = running(QUIET);
    let (seconds, block) = tick_until_poll(&mut clock, &mut effects);
    send(&mut clock, &mut effects, ClockSignal::Tick);

    assert!(effects.issued.is_empty());
    assert_eq!(clock.countdown().ticks(), 1);

    send(&mut clock, &mut effects, ok(&seconds, &[0x00]));
    send(&mut clock, &mut effects, ok(&block, &[0x00, 0x49, 0x01]));
    assert_eq!(clock.countdown().ticks(), 5);
}

#[test]
fn apply_time_waits_for_the_poll_in_flight() {
    let (mut clock, mut effects) = running(QUIET);
    let (seconds, block) = tick_until_poll(&mut clock, &mut effects);
    send(&mut clock, &mut effects, ClockSignal::ApplyTime([0x00, 0x30, 0x69]));
    send(&mut clock, &mut effects, ClockSignal::Tick);
    assert_eq!(clock.state(), OperatingState::Running);
    assert!(effects.issued.is_empty());

    send(&mut clock, &mut effects, ok(&seconds, &[0x00]));
    send(&mut clock, &mut effects, ok(&block, &[0x00, 0x49, 0x01]));
    send(&mut clock, &mut effects, ClockSignal::Tick);
    assert_eq!(clock.state(), OperatingState::SettingClock);
    assert!(matches!(effects.issued[0].transfer, Transfer::WriteTime(_)));
}

#[test]
fn elapsed_ticks_count_until_a_boundary_refresh() {
    let (mut clock, mut effects) = running(QUIET);
    let (seconds, block) = tick_until_poll(&mut clock, &mut effects);
    send(&mut clock, &mut effects, ok(&seconds, &[0x22]));
    send(&mut clock, &mut effects, ok(&block, &[0x04, 0x49, 0x01]));
    assert_eq!(clock.elapsed_ticks(), 5);

    let (seconds, block) = tick_until_poll(&mut clock, &mut effects);
    assert_eq!(clock.elapsed_ticks(), 8);
    send(&mut clock, &mut effects, ok(&seconds, &[0x00]));
    send(&mut clock, &mut effects, ok(&block, &[0x05, 0x49, 0x01]));
    assert_eq!(clock.elapsed_ticks(), 0);
    assert_eq!(effects.shown, ["five past nine"]);
}

#[test]
fn watchdog_is_forwarded_in_every_state() {
    let mut clock = ClockSync::new(QUIET);
    let mut effects = Recorder::default();
    clock.start(&mut effects).expect("default time is valid");
    send(&mut clock, &mut effects, ClockSignal::Watchdog);
    assert_eq!(effects.watchdog_feeds, 1);

    let (mut clock, mut effects) = running(QUIET);
    send(&mut clock, &mut effects, ClockSignal::Watchdog);
    assert_eq!(effects.watchdog_feeds, 1);
}

#[test]
fn corrupt_time_block_is_a_contract_violation() {
    let (mut clock, mut effects) = running(QUIET);
    let (seconds, block) = tick_until_poll(&mut clock, &mut effects);
    send(&mut clock, &mut effects, ok(&seconds, &[0x00]));
    let result = clock.dispatch(ok(&block, &[0x5A, 0x49, 0x01]), &mut effects);

    assert!(matches!(
        result,
        Err(Error::Contract(ContractViolation::OnesDigitOutOfRange {
            register: 1,
            ones: 0xA,
            raw: 0x5A
        }))
    ));
    assert!(effects.shown.is_empty());
}
