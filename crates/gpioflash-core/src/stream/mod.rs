//! Byte streams feeding and draining the flash operations
//!
//! The engine moves one byte at a time: a read pushes each byte as it is
//! shifted in, a program pulls each byte just before it is shifted out. A
//! [`ByteStream`] is opened in exactly one direction and refuses the
//! other.
//!
//! With `std`, [`BufferedStream`] implements the trait over any
//! `Read + Write` backend, batching bytes so a 256 MiB transfer does not
//! turn into 256 Mi system calls.

use core::fmt;

use crate::error::Result;

#[cfg(feature = "std")]
mod buffered;

#[cfg(feature = "std")]
pub use buffered::{BufferedStream, FileStream, DEFAULT_CAPACITY};

/// Direction a stream was opened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// Source: bytes are pulled out of it
    Read,
    /// Destination: bytes are pushed into it
    Write,
}

impl fmt::Display for StreamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("reading"),
            Self::Write => f.write_str("writing"),
        }
    }
}

/// One-directional byte stream
pub trait ByteStream {
    /// Direction fixed at open time
    fn mode(&self) -> StreamMode;

    /// Append a byte (write mode only)
    fn push(&mut self, byte: u8) -> Result<()>;

    /// Take the next byte (read mode only)
    ///
    /// `Ok(None)` marks the end of the input. Once returned, every later
    /// call returns it again.
    fn pull(&mut self) -> Result<Option<u8>>;

    /// Write out anything buffered (no-op in read mode)
    fn flush(&mut self) -> Result<()>;
}

impl<S: ByteStream + ?Sized> ByteStream for &mut S {
    fn mode(&self) -> StreamMode {
        (**self).mode()
    }

    fn push(&mut self, byte: u8) -> Result<()> {
        (**self).push(byte)
    }

    fn pull(&mut self) -> Result<Option<u8>> {
        (**self).pull()
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}
