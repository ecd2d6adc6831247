//! Placeholder transports for bus variants without a driver yet
//!
//! A real dual or quad driver would shift 2 or 4 bits per clock on the
//! same select/byte framing as [`super::BitbangSpi`]; a two-wire driver
//! would frame transactions with start/stop conditions and device
//! addressing instead of a select line. Until one exists, each variant
//! answers every call with [`Error::UnsupportedInterface`] so nothing ever
//! reaches the pins.

use super::FlashBus;
use crate::chip::ChipId;
use crate::device::BusInterface;
use crate::error::{Error, Result};

macro_rules! placeholder_bus {
    ($(#[$meta:meta])* $name:ident => $interface:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl FlashBus for $name {
            fn interface(&self) -> BusInterface {
                $interface
            }

            fn set_clock_khz(&mut self, _khz: u32) -> Result<()> {
                Err(Error::UnsupportedInterface($interface))
            }

            fn set_write_protect(&mut self, _protect: bool) -> Result<()> {
                Err(Error::UnsupportedInterface($interface))
            }

            fn start(&mut self) -> Result<()> {
                Err(Error::UnsupportedInterface($interface))
            }

            fn stop(&mut self) -> Result<()> {
                Err(Error::UnsupportedInterface($interface))
            }

            fn write_byte(&mut self, _byte: u8) -> Result<()> {
                Err(Error::UnsupportedInterface($interface))
            }

            fn read_byte(&mut self) -> Result<u8> {
                Err(Error::UnsupportedInterface($interface))
            }

            fn read_id(&mut self) -> Result<ChipId> {
                Err(Error::UnsupportedInterface($interface))
            }
        }
    };
}

placeholder_bus!(
    /// Dual-lane SPI (IO0/IO1 bidirectional)
    DualSpi => BusInterface::DualSpi
);

placeholder_bus!(
    /// Quad-lane SPI (IO0..IO3 bidirectional)
    QuadSpi => BusInterface::QuadSpi
);

placeholder_bus!(
    /// Two-wire bus for 24-series parts
    TwoWire => BusInterface::I2c
);
