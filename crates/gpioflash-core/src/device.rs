//! Device descriptor
//!
//! A [`Device`] carries the parameters of one operation: which bus and
//! command set to use, how fast to clock it, and which byte range to touch.
//! The flash operations read it and only ever write the identification
//! field.

use core::fmt;

use crate::chip::ChipId;
use crate::error::{Error, Result};

/// Largest transfer a single operation accepts (256 MiB)
pub const MAX_BYTES: u32 = 256 * 1024 * 1024;

/// Fastest clock the bit-banged bus is asked to run at, in kHz
pub const MAX_CLOCK_KHZ: u32 = 1000;

/// Clock used when the caller does not pick one, in kHz
pub const DEFAULT_CLOCK_KHZ: u32 = 100;

/// First address that no longer fits in a 3-byte address
pub const ADDRESS_SPACE: u32 = 1 << 24;

/// Physical bus variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusInterface {
    /// Single-lane SPI (1-1-1)
    #[default]
    Spi,
    /// Dual-lane SPI
    DualSpi,
    /// Quad-lane SPI
    QuadSpi,
    /// Two-wire (I2C-style) bus
    I2c,
}

impl BusInterface {
    /// Short name as accepted on the command line
    pub const fn name(self) -> &'static str {
        match self {
            Self::Spi => "spi",
            Self::DualSpi => "dspi",
            Self::QuadSpi => "qspi",
            Self::I2c => "i2c",
        }
    }

    /// Command set the bus variant speaks
    pub const fn default_protocol(self) -> Protocol {
        match self {
            Self::I2c => Protocol::S24,
            _ => Protocol::S25,
        }
    }
}

impl fmt::Display for BusInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Flash command set family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    /// 24-series two-wire EEPROMs
    S24,
    /// 25-series SPI NOR flash
    #[default]
    S25,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::S24 => f.write_str("24-series"),
            Self::S25 => f.write_str("25-series"),
        }
    }
}

/// Parameters of one flash operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Bus variant to drive
    pub interface: BusInterface,
    /// Command set to speak on it
    pub protocol: Protocol,
    /// Target clock in kHz, 0 for as fast as the host can toggle pins
    pub clock_khz: u32,
    /// Number of bytes to read or program
    pub byte_count: u32,
    /// First flash address touched
    pub offset: u32,
    /// Optional cap on status polls while the chip is busy.
    /// `None` polls forever.
    pub busy_poll_limit: Option<u32>,
    chip_id: Option<ChipId>,
}

impl Default for Device {
    fn default() -> Self {
        Self {
            interface: BusInterface::Spi,
            protocol: Protocol::S25,
            clock_khz: DEFAULT_CLOCK_KHZ,
            byte_count: 0,
            offset: 0,
            busy_poll_limit: None,
            chip_id: None,
        }
    }
}

impl Device {
    /// Create a descriptor for the given bus, using its native protocol
    pub fn new(interface: BusInterface) -> Self {
        Self {
            interface,
            protocol: interface.default_protocol(),
            ..Default::default()
        }
    }

    /// Set the clock in kHz (0 = unconstrained)
    pub fn with_clock_khz(mut self, khz: u32) -> Self {
        self.clock_khz = khz;
        self
    }

    /// Set the byte range
    pub fn with_range(mut self, offset: u32, byte_count: u32) -> Self {
        self.offset = offset;
        self.byte_count = byte_count;
        self
    }

    /// Cap the number of status polls per busy wait
    pub fn with_busy_poll_limit(mut self, limit: Option<u32>) -> Self {
        self.busy_poll_limit = limit;
        self
    }

    /// Identification from the last successful identify, if any
    pub fn chip_id(&self) -> Option<ChipId> {
        self.chip_id
    }

    /// True once an identify has completed since the last reset
    pub fn chip_id_valid(&self) -> bool {
        self.chip_id.is_some()
    }

    pub(crate) fn set_chip_id(&mut self, id: ChipId) {
        self.chip_id = Some(id);
    }

    /// Drop any stored identification
    pub fn reset_chip_id(&mut self) {
        self.chip_id = None;
    }

    /// Whether the flash operations implement this interface/protocol pair
    pub fn is_supported(&self) -> bool {
        self.interface == BusInterface::Spi && self.protocol == Protocol::S25
    }

    /// Reject interface/protocol pairs that have no command engine
    pub fn check_supported(&self) -> Result<()> {
        if self.is_supported() {
            Ok(())
        } else {
            Err(Error::UnsupportedCombination {
                interface: self.interface,
                protocol: self.protocol,
            })
        }
    }

    /// Reject `len` bytes from `offset` that would run past the last
    /// 3-byte address
    ///
    /// Addresses above 24 bits are truncated on the wire, so such a range
    /// would wrap around to the bottom of the chip.
    pub fn check_address_range(&self, len: u32) -> Result<()> {
        if self.offset as u64 + len as u64 > ADDRESS_SPACE as u64 {
            return Err(Error::OutOfRange {
                offset: self.offset,
                len,
            });
        }
        Ok(())
    }

    /// Check the parameters a caller is about to hand to the flash operations
    ///
    /// Program and erase check the address range themselves; callers run
    /// this first to have every limit enforced before the bus is opened.
    pub fn validate(&self) -> Result<()> {
        if self.clock_khz > MAX_CLOCK_KHZ {
            return Err(Error::InvalidClock(self.clock_khz));
        }
        if self.byte_count > MAX_BYTES || self.offset >= ADDRESS_SPACE {
            return Err(Error::OutOfRange {
                offset: self.offset,
                len: self.byte_count,
            });
        }
        self.check_address_range(self.byte_count)
    }
}
