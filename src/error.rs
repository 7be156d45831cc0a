use derive_more::derive::{Display, Error};

/// A specialized `Result` where the error is this crate's `Error` type.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Define a unified error type for this crate.
#[expect(missing_docs, reason = "The variants are self-explanatory.")]
#[derive(Debug, Display, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // `#[error(not(source))]` below tells `derive_more` that `embassy_executor::SpawnError` does
    // not implement Rust's `core::error::Error` trait.
    #[cfg(feature = "pico1")]
    #[display("{_0:?}")]
    TaskSpawn(#[error(not(source))] embassy_executor::SpawnError),

    #[display("Contract violation: {_0}")]
    Contract(ContractViolation),

    #[display("Index out of bounds")]
    IndexOutOfBounds,

    #[display("Format error")]
    FormatError,
}

/// A broken precondition inside the clock core.
///
/// These are never retried. They mean the RTC handed back corrupted register contents or that
/// the firmware itself computed something impossible, so the clock task answers them with a full
/// restart.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ContractViolation {
    #[display("register {register} has ones digit {ones} (raw 0x{raw:02X})")]
    OnesDigitOutOfRange { register: u8, ones: u8, raw: u8 },

    #[display("register {register} has tens digit {tens} (raw 0x{raw:02X})")]
    TensDigitOutOfRange { register: u8, tens: u8, raw: u8 },

    #[display("hour {hour} is out of range for its mode (raw 0x{raw:02X})")]
    HourOutOfRange { hour: u8, raw: u8 },

    #[display("cannot render hour {_0}")]
    RenderHour(#[error(not(source))] u8),

    #[display("cannot render minutes {_0}")]
    RenderMinutes(#[error(not(source))] u8),

    #[display("phase error {_0} is outside -2..=2")]
    PhaseError(#[error(not(source))] i8),

    #[display("poll countdown {_0} is outside 3..=7")]
    Countdown(#[error(not(source))] i8),
}

impl From<ContractViolation> for Error {
    fn from(violation: ContractViolation) -> Self {
        Self::Contract(violation)
    }
}

#[cfg(feature = "pico1")]
impl From<embassy_executor::SpawnError> for Error {
    fn from(err: embassy_executor::SpawnError) -> Self {
        Self::TaskSpawn(err)
    }
}
