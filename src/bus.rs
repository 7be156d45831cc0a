//! Requests the clock sends to the RTC and the replies it gets back.
//!
//! The clock never talks to the bus directly. It hands a [`BusRequest`] to the bus driver and
//! later receives a [`BusReply`] carrying the same [`RequestId`]. [`perform`] runs one request
//! against any `embedded-hal-async` I2C bus.

use embedded_hal_async::i2c::{Error as _, ErrorKind, I2c};
use heapless::Vec;

use crate::constants::{MAX_TRANSFER, RTC_ADDRESS};
use crate::raw_time::{
    MINUTES_REGISTER, RawRegisterBlock, SECONDS_REGISTER, TimeOverride,
};

/// Longest read the clock issues: minutes, hours and weekday.
pub const MAX_READ: usize = 3;

/// Tags a request so its reply can be matched up, and stale replies recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RequestId(pub u8);

impl RequestId {
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// What a request does on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transfer {
    /// Read the seconds register (one byte).
    ReadSeconds,
    /// Read minutes, hours and weekday (three bytes from register 1).
    ReadTimeBlock,
    /// Write all eight timekeeping and control registers.
    WriteRegisters(RawRegisterBlock),
    /// Write seconds, minutes and hours only.
    WriteTime(TimeOverride),
}

impl Transfer {
    /// The register the transfer starts at.
    #[must_use]
    pub const fn register(&self) -> u8 {
        match self {
            Self::ReadTimeBlock => MINUTES_REGISTER,
            Self::ReadSeconds | Self::WriteRegisters(_) | Self::WriteTime(_) => SECONDS_REGISTER,
        }
    }

    /// The bytes transferred after the register pointer.
    #[must_use]
    pub const fn len(&self) -> usize {
        match self {
            Self::ReadSeconds => 1,
            Self::ReadTimeBlock => MAX_READ,
            Self::WriteRegisters(block) => block.as_bytes().len(),
            Self::WriteTime(time) => time.bytes().len(),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub const fn is_read(&self) -> bool {
        matches!(self, Self::ReadSeconds | Self::ReadTimeBlock)
    }
}

/// One transaction for the bus driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusRequest {
    pub id: RequestId,
    pub transfer: Transfer,
}

impl BusRequest {
    /// The 8-bit address byte on the wire: the 7-bit address shifted left, read/write in bit 0.
    #[must_use]
    pub const fn address_byte(&self) -> u8 {
        (RTC_ADDRESS << 1) | if self.transfer.is_read() { 1 } else { 0 }
    }
}

/// How a transaction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusStatus {
    Ok,
    NoAcknowledge,
    ArbitrationLoss,
    Bus,
    Overrun,
    Other,
    /// No reply arrived before the liveness guard expired.
    TimedOut,
}

impl BusStatus {
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl From<ErrorKind> for BusStatus {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NoAcknowledge(_) => Self::NoAcknowledge,
            ErrorKind::ArbitrationLoss => Self::ArbitrationLoss,
            ErrorKind::Bus => Self::Bus,
            ErrorKind::Overrun => Self::Overrun,
            _ => Self::Other,
        }
    }
}

/// The outcome of a [`BusRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusReply {
    pub id: RequestId,
    pub transfer: Transfer,
    pub status: BusStatus,
    /// Bytes read; empty for writes and failed reads.
    pub data: Vec<u8, MAX_READ>,
}

impl BusReply {
    /// A reply that carries no data.
    #[must_use]
    pub const fn without_data(request: &BusRequest, status: BusStatus) -> Self {
        Self {
            id: request.id,
            transfer: request.transfer,
            status,
            data: Vec::new(),
        }
    }

    /// A successful read.
    #[must_use]
    pub fn with_data(request: &BusRequest, data: &[u8]) -> Self {
        Self {
            id: request.id,
            transfer: request.transfer,
            status: BusStatus::Ok,
            data: Vec::from_slice(data).unwrap_or_default(),
        }
    }

    /// The first byte read, if the read succeeded.
    #[must_use]
    pub fn first_byte(&self) -> Option<u8> {
        if self.status.is_ok() {
            self.data.first().copied()
        } else {
            None
        }
    }
}

/// Run one request against the RTC and describe the outcome.
///
/// Reads are a register-pointer write followed by a repeated-start read; writes send the
/// register pointer followed by the payload in one transfer.
pub async fn perform<B: I2c>(bus: &mut B, request: &BusRequest) -> BusReply {
    let register = request.transfer.register();
    let result = match request.transfer {
        Transfer::ReadSeconds => {
            let mut buffer = [0_u8; 1];
            bus.write_read(RTC_ADDRESS, &[register], &mut buffer)
                .await
                .map(|()| BusReply::with_data(request, &buffer))
        }
        Transfer::ReadTimeBlock => {
            let mut buffer = [0_u8; MAX_READ];
            bus.write_read(RTC_ADDRESS, &[register], &mut buffer)
                .await
                .map(|()| BusReply::with_data(request, &buffer))
        }
        Transfer::WriteRegisters(block) => {
            let [b0, b1, b2, b3, b4, b5, b6, b7] = block.0;
            let frame: [u8; MAX_TRANSFER] = [register, b0, b1, b2, b3, b4, b5, b6, b7];
            bus.write(RTC_ADDRESS, &frame)
                .await
                .map(|()| BusReply::without_data(request, BusStatus::Ok))
        }
        Transfer::WriteTime(time) => {
            let [seconds, minutes, hours] = time.bytes();
            bus.write(RTC_ADDRESS, &[register, seconds, minutes, hours])
                .await
                .map(|()| BusReply::without_data(request, BusStatus::Ok))
        }
    };
    result.unwrap_or_else(|err| BusReply::without_data(request, err.kind().into()))
}
