//! Bus transports
//!
//! A [`FlashBus`] moves single bytes between the host and the chip inside
//! select/deselect brackets. The command engine in [`crate::protocol`] is
//! written against this trait only, so any bus variant that can frame a
//! transaction and shift bytes can carry the 25-series command set.
//!
//! Only the single-lane bit-banged bus ([`BitbangSpi`]) is implemented. The
//! dual, quad and two-wire variants exist as typed placeholders that refuse
//! every transfer with [`crate::Error::UnsupportedInterface`].

pub mod bitbang;
#[cfg(test)]
pub(crate) mod mock;
mod placeholder;

pub use bitbang::{BitbangLines, BitbangSpi};
pub use placeholder::{DualSpi, QuadSpi, TwoWire};

use crate::chip::ChipId;
use crate::device::BusInterface;
use crate::error::Result;

/// Byte-level access to a flash chip
///
/// Every method except [`interface`](FlashBus::interface) returns a
/// `Result` so placeholder variants can refuse to run. The bit-banged bus
/// never fails.
pub trait FlashBus {
    /// Bus variant this transport drives
    fn interface(&self) -> BusInterface;

    /// Derive bit, clock and byte delays from a target clock (0 = no delay)
    fn set_clock_khz(&mut self, khz: u32) -> Result<()>;

    /// Drive the write-protect line (`true` = protected)
    fn set_write_protect(&mut self, protect: bool) -> Result<()>;

    /// Assert chip select, opening a transaction
    fn start(&mut self) -> Result<()>;

    /// Deassert chip select, closing the transaction
    fn stop(&mut self) -> Result<()>;

    /// Shift one byte out
    fn write_byte(&mut self, byte: u8) -> Result<()>;

    /// Shift one byte in
    fn read_byte(&mut self) -> Result<u8>;

    /// Shift several bytes out in order
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        for &byte in bytes {
            self.write_byte(byte)?;
        }
        Ok(())
    }

    /// Read the identification triple
    fn read_id(&mut self) -> Result<ChipId>;
}

impl<B: FlashBus + ?Sized> FlashBus for &mut B {
    fn interface(&self) -> BusInterface {
        (**self).interface()
    }

    fn set_clock_khz(&mut self, khz: u32) -> Result<()> {
        (**self).set_clock_khz(khz)
    }

    fn set_write_protect(&mut self, protect: bool) -> Result<()> {
        (**self).set_write_protect(protect)
    }

    fn start(&mut self) -> Result<()> {
        (**self).start()
    }

    fn stop(&mut self) -> Result<()> {
        (**self).stop()
    }

    fn write_byte(&mut self, byte: u8) -> Result<()> {
        (**self).write_byte(byte)
    }

    fn read_byte(&mut self) -> Result<u8> {
        (**self).read_byte()
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_bytes(bytes)
    }

    fn read_id(&mut self) -> Result<ChipId> {
        (**self).read_id()
    }
}

/// Delays applied by the bit-banged bus, in microseconds
///
/// A value of 0 means no delay call at all: the host toggles the lines as
/// fast as it can.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timing {
    /// After each clock edge
    pub half_clock_us: u32,
    /// Between driving or sampling data and the rising clock edge
    pub bit_us: u32,
    /// After each byte and after each select change
    pub byte_us: u32,
}

impl Timing {
    /// No artificial delay
    pub const UNTHROTTLED: Timing = Timing {
        half_clock_us: 0,
        bit_us: 0,
        byte_us: 0,
    };

    /// Delays for a target clock in kHz
    ///
    /// The half period is `500 / khz` whole microseconds, floored at 1 us
    /// since the host cannot resolve shorter waits. Rounding down the
    /// frequency keeps the bus at or below the requested rate.
    pub const fn from_khz(khz: u32) -> Self {
        if khz == 0 {
            return Self::UNTHROTTLED;
        }
        let half = 500 / khz;
        let half = if half < 1 { 1 } else { half };
        Timing {
            half_clock_us: half,
            bit_us: half,
            byte_us: half,
        }
    }
}

/// Build the transport for a bus variant
///
/// Only [`BusInterface::Spi`] gets a working bus; the other variants get
/// their placeholder and the GPIO handle is released.
#[cfg(feature = "alloc")]
pub fn open<'a, G: crate::gpio::Gpio + 'a>(
    interface: BusInterface,
    gpio: G,
    pins: crate::gpio::Pinout,
) -> alloc::boxed::Box<dyn FlashBus + 'a> {
    use alloc::boxed::Box;

    match interface {
        BusInterface::Spi => Box::new(BitbangSpi::new(gpio, pins)),
        BusInterface::DualSpi => Box::new(DualSpi),
        BusInterface::QuadSpi => Box::new(QuadSpi),
        BusInterface::I2c => Box::new(TwoWire),
    }
}
