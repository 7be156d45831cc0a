//! The bus driver: runs [`BusRequest`]s against the DS1307 on I2C0 and posts the replies back to
//! the clock.

use embassy_executor::Spawner;
use embassy_rp::Peri;
use embassy_rp::i2c::{self, Config as I2cConfig, InterruptHandler, SclPin, SdaPin};
use embassy_rp::peripherals::I2C0;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::Result;
use crate::bus::{BusRequest, perform};
use crate::clock_sync::ClockSignal;
use crate::constants::BUS_QUEUE_DEPTH;
use crate::word_clock::WordClockStatic;

::embassy_rp::bind_interrupts! {
    struct I2c0Irqs {
        I2C0_IRQ => InterruptHandler<I2C0>;
    }
}

type BusRequests = Channel<CriticalSectionRawMutex, BusRequest, BUS_QUEUE_DEPTH>;

/// Static for the [`RtcBus`] device.
pub struct RtcBusStatic(BusRequests);

/// Handle for queueing requests to the RTC.
pub struct RtcBus<'a>(&'a BusRequests);

impl RtcBus<'_> {
    #[must_use]
    pub const fn new_static() -> RtcBusStatic {
        RtcBusStatic(Channel::new())
    }

    /// Create the bus driver on I2C0 and spawn its task.
    ///
    /// Replies go to the clock whose static is `word_clock_static`. SCL and SDA can be any pins
    /// compatible with I2C0. The DS1307 tops out at 100 kHz, which is the default bus speed.
    ///
    /// # Errors
    ///
    /// Returns an error if the task cannot be spawned.
    pub fn new<SCL, SDA>(
        rtc_bus_static: &'static RtcBusStatic,
        i2c_peripheral: Peri<'static, I2C0>,
        scl: Peri<'static, SCL>,
        sda: Peri<'static, SDA>,
        word_clock_static: &'static WordClockStatic,
        spawner: Spawner,
    ) -> Result<Self>
    where
        SCL: SclPin<I2C0>,
        SDA: SdaPin<I2C0>,
    {
        let i2c = i2c::I2c::new_async(i2c_peripheral, scl, sda, I2c0Irqs, I2cConfig::default());
        let token = bus_loop(i2c, &rtc_bus_static.0, word_clock_static)?;
        spawner.spawn(token);
        Ok(Self(&rtc_bus_static.0))
    }

    /// Queue a request without waiting. Returns `false` if the queue is full.
    #[must_use]
    pub fn try_issue(&self, request: BusRequest) -> bool {
        self.0.try_send(request).is_ok()
    }
}

#[embassy_executor::task]
async fn bus_loop(
    mut i2c: i2c::I2c<'static, I2C0, i2c::Async>,
    requests: &'static BusRequests,
    word_clock_static: &'static WordClockStatic,
) -> ! {
    info!("RTC bus started");
    loop {
        let request = requests.receive().await;
        let reply = perform(&mut i2c, &request).await;
        if !reply.status.is_ok() {
            warn!(
                "Bus request {:?} to {=u8:#04x} failed: {:?}",
                request.transfer,
                request.address_byte(),
                reply.status
            );
        }
        word_clock_static
            .signals()
            .send(ClockSignal::BusReply(reply))
            .await;
    }
}
