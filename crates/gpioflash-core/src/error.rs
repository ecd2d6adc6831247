//! Error types for gpioflash-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate. File I/O details are logged where they happen;
//! the error only carries which side of the stream failed.

use core::fmt;

use crate::device::{BusInterface, Protocol};
use crate::stream::StreamMode;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Configuration errors
    /// The interface/protocol pair has no command engine
    UnsupportedCombination {
        /// Selected bus variant
        interface: BusInterface,
        /// Selected command set
        protocol: Protocol,
    },
    /// A placeholder transport was asked to move bytes
    UnsupportedInterface(BusInterface),
    /// The stream was opened in the other direction
    WrongStreamMode {
        /// Mode the operation needs
        expected: StreamMode,
        /// Mode the stream was opened in
        found: StreamMode,
    },
    /// Clock frequency above the bit-bang ceiling
    InvalidClock(u32),
    /// Offset or byte count outside what a transfer can address
    OutOfRange {
        /// Start address
        offset: u32,
        /// Requested byte count
        len: u32,
    },

    // Stream errors
    /// Reading from the underlying source failed
    StreamRead,
    /// Writing to the underlying destination failed
    StreamWrite,

    // Protocol errors
    /// The busy flag stayed set past the configured poll limit
    Timeout {
        /// Number of status reads issued
        polls: u32,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedCombination {
                interface,
                protocol,
            } => write!(
                f,
                "{} interface with {} protocol is not implemented",
                interface, protocol
            ),
            Self::UnsupportedInterface(interface) => {
                write!(f, "{} transport is not implemented", interface)
            }
            Self::WrongStreamMode { expected, found } => write!(
                f,
                "stream opened for {} but operation needs {}",
                found, expected
            ),
            Self::InvalidClock(khz) => {
                write!(f, "clock of {} kHz exceeds the 1000 kHz maximum", khz)
            }
            Self::OutOfRange { offset, len } => write!(
                f,
                "{} bytes at offset 0x{:06X} is outside the addressable range",
                len, offset
            ),
            Self::StreamRead => write!(f, "failed to read from source file"),
            Self::StreamWrite => write!(f, "failed to write to destination file"),
            Self::Timeout { polls } => {
                write!(f, "chip still busy after {} status polls", polls)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
