use embassy_time::Duration;

/// Duration representing one second.
pub const ONE_SECOND: Duration = Duration::from_secs(1);

/// Seven-bit bus address of the DS1307 real-time clock.
pub const RTC_ADDRESS: u8 = 0x68;

/// Number of one-second ticks between RTC reads when the clock is in phase.
pub const POLL_INTERVAL: u8 = 5;

/// The smallest countdown the drift corrector may hand back.
pub const MIN_COUNTDOWN: u8 = 3;

/// The largest countdown the drift corrector may hand back.
pub const MAX_COUNTDOWN: u8 = 7;

/// Length of one guard unit.
pub const GUARD_UNIT: Duration = Duration::from_millis(50);

/// The liveness guard armed with every RTC request: 30 guard units.
pub const REPLY_GUARD: Duration = Duration::from_millis(30 * 50);

/// How long the hardware watchdog waits for a feed before resetting the board.
pub const WATCHDOG_TIMEOUT: Duration = Duration::from_secs(8);

/// How often the application asks the clock to feed the watchdog.
pub const WATCHDOG_PET_INTERVAL: Duration = Duration::from_secs(2);

/// Depth of the clock's inbound signal queue.
pub const CLOCK_QUEUE_DEPTH: usize = 5;

/// Depth of the bus driver's request queue.
pub const BUS_QUEUE_DEPTH: usize = 4;

/// Largest transfer the clock ever issues: the register pointer plus all eight registers.
pub const MAX_TRANSFER: usize = 9;

/// Reply tracing, set at build time through `WORD_CLOCK_TRACE`.
pub const TRACE_REPLIES: bool = matches!(env!("WORD_CLOCK_TRACE").as_bytes(), b"1");

/// Whether the one-second tick comes from the RTC square-wave pin, set at build time through
/// `WORD_CLOCK_SQW`.
pub const SQUARE_WAVE_TICK: bool = !matches!(env!("WORD_CLOCK_SQW").as_bytes(), b"0");
