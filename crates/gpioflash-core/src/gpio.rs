//! GPIO capability
//!
//! The bit-banged transport only needs four things from the host: set a
//! line's direction, drive it, sample it, and wait a number of
//! microseconds. Backends (Linux character device, the pin-level emulator
//! used in tests) implement [`Gpio`]; acquiring and releasing the lines is
//! the backend's business and happens when it is constructed and dropped.
//!
//! All methods are infallible by contract. A backend that hits an I/O
//! fault logs it and carries on, the same way a memory-mapped GPIO block
//! cannot report failure.

/// GPIO line number (BCM numbering on a Raspberry Pi)
pub type Pin = u32;

/// Logic level on a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Driven or read as 0
    Low,
    /// Driven or read as 1
    High,
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl From<Level> for bool {
    fn from(level: Level) -> Self {
        level == Level::High
    }
}

/// Line direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Sampled by the host
    Input,
    /// Driven by the host
    Output,
}

/// Pin-level access used by the bit-banged transport
pub trait Gpio {
    /// Configure a line as input or output
    fn set_direction(&mut self, pin: Pin, direction: Direction);

    /// Drive an output line
    fn write(&mut self, pin: Pin, level: Level);

    /// Sample a line
    fn read(&mut self, pin: Pin) -> Level;

    /// Busy the calling thread for `us` microseconds
    fn delay_us(&mut self, us: u32);
}

impl<G: Gpio + ?Sized> Gpio for &mut G {
    fn set_direction(&mut self, pin: Pin, direction: Direction) {
        (**self).set_direction(pin, direction)
    }

    fn write(&mut self, pin: Pin, level: Level) {
        (**self).write(pin, level)
    }

    fn read(&mut self, pin: Pin) -> Level {
        (**self).read(pin)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}

/// Lines used by the single-lane SPI bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pinout {
    /// Serial clock
    pub sck: Pin,
    /// Host to chip data
    pub mosi: Pin,
    /// Chip to host data
    pub miso: Pin,
    /// Chip select (active low)
    pub cs: Pin,
    /// Write protect (active low)
    pub wp: Pin,
    /// Hold (active low), held inactive when wired
    pub hold: Option<Pin>,
}

impl Default for Pinout {
    /// Raspberry Pi header wiring
    fn default() -> Self {
        Self {
            sck: 2,
            miso: 3,
            mosi: 4,
            hold: Some(17),
            wp: 22,
            cs: 27,
        }
    }
}

impl Pinout {
    /// Every line in the pinout, outputs first, MISO last
    pub fn lines(&self) -> impl Iterator<Item = Pin> + '_ {
        [self.sck, self.mosi, self.cs, self.wp]
            .into_iter()
            .chain(self.hold)
            .chain(core::iter::once(self.miso))
    }
}
