//! Buffered file stream
//!
//! In write mode bytes accumulate until the buffer holds `capacity` of
//! them, then go out in one write. In read mode the buffer is refilled
//! with one read of up to `capacity` bytes whenever it runs dry; a refill
//! that returns nothing is the end of the input.
//!
//! Capacity only changes how often the backend is called, never what
//! comes out of the stream.

use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Read, Write};
use std::path::Path;

use super::{ByteStream, StreamMode};
use crate::error::{Error, Result};

/// Default batch size (10 MiB)
pub const DEFAULT_CAPACITY: usize = 10 * 1024 * 1024;

/// Buffered stream over a file on disk
pub type FileStream = BufferedStream<File>;

/// Buffered one-directional stream over an I/O backend
///
/// Dropping a write-mode stream flushes what is left; use
/// [`into_inner`](Self::into_inner) to see flush errors instead of having
/// them logged.
pub struct BufferedStream<T: Read + Write> {
    inner: Option<T>,
    mode: StreamMode,
    buf: Vec<u8>,
    capacity: usize,
    /// Next byte to hand out (read mode)
    pos: usize,
    /// Bytes of `buf` filled by the last refill (read mode)
    filled: usize,
    eof: bool,
}

impl BufferedStream<File> {
    /// Create or truncate `path` and open it as a destination
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())?;
        log::debug!("stream: writing to {}", path.as_ref().display());
        Ok(Self::new(file, StreamMode::Write, DEFAULT_CAPACITY))
    }

    /// Open an existing `path` as a source
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path.as_ref())?;
        log::debug!("stream: reading from {}", path.as_ref().display());
        Ok(Self::new(file, StreamMode::Read, DEFAULT_CAPACITY))
    }
}

impl<T: Read + Write> BufferedStream<T> {
    /// Wrap a backend; a capacity of 0 is treated as 1
    pub fn new(inner: T, mode: StreamMode, capacity: usize) -> Self {
        Self {
            inner: Some(inner),
            mode,
            buf: Vec::new(),
            capacity: capacity.max(1),
            pos: 0,
            filled: 0,
            eof: false,
        }
    }

    /// Destination stream with the default capacity
    pub fn writer(inner: T) -> Self {
        Self::new(inner, StreamMode::Write, DEFAULT_CAPACITY)
    }

    /// Source stream with the default capacity
    pub fn reader(inner: T) -> Self {
        Self::new(inner, StreamMode::Read, DEFAULT_CAPACITY)
    }

    /// Batch size
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes pushed but not yet written out
    pub fn pending(&self) -> usize {
        match self.mode {
            StreamMode::Write => self.buf.len(),
            StreamMode::Read => 0,
        }
    }

    /// Flush and hand the backend back
    pub fn into_inner(mut self) -> Result<T> {
        self.flush()?;
        self.inner.take().ok_or(Error::StreamWrite)
    }

    fn write_out(&mut self) -> Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let inner = self.inner.as_mut().ok_or(Error::StreamWrite)?;
        inner.write_all(&self.buf).map_err(|e| {
            log::error!("stream: write of {} bytes failed: {}", self.buf.len(), e);
            Error::StreamWrite
        })?;
        self.buf.clear();
        Ok(())
    }

    fn refill(&mut self) -> Result<usize> {
        let inner = self.inner.as_mut().ok_or(Error::StreamRead)?;
        if self.buf.len() != self.capacity {
            self.buf.resize(self.capacity, 0);
        }
        let n = loop {
            match inner.read(&mut self.buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::error!("stream: read failed: {}", e);
                    return Err(Error::StreamRead);
                }
            }
        };
        self.pos = 0;
        self.filled = n;
        Ok(n)
    }
}

impl<T: Read + Write> ByteStream for BufferedStream<T> {
    fn mode(&self) -> StreamMode {
        self.mode
    }

    fn push(&mut self, byte: u8) -> Result<()> {
        if self.mode != StreamMode::Write {
            return Err(Error::WrongStreamMode {
                expected: StreamMode::Write,
                found: self.mode,
            });
        }
        if self.buf.len() >= self.capacity {
            self.write_out()?;
        }
        self.buf.push(byte);
        Ok(())
    }

    fn pull(&mut self) -> Result<Option<u8>> {
        if self.mode != StreamMode::Read {
            return Err(Error::WrongStreamMode {
                expected: StreamMode::Read,
                found: self.mode,
            });
        }
        if self.eof {
            return Ok(None);
        }
        if self.pos >= self.filled && self.refill()? == 0 {
            self.eof = true;
            return Ok(None);
        }
        let byte = self.buf[self.pos];
        self.pos += 1;
        Ok(Some(byte))
    }

    fn flush(&mut self) -> Result<()> {
        if self.mode != StreamMode::Write {
            return Ok(());
        }
        self.write_out()?;
        if let Some(inner) = self.inner.as_mut() {
            inner.flush().map_err(|e| {
                log::error!("stream: flush failed: {}", e);
                Error::StreamWrite
            })?;
        }
        Ok(())
    }
}

impl<T: Read + Write> Drop for BufferedStream<T> {
    fn drop(&mut self) {
        if self.inner.is_some() && self.pending() > 0 {
            if let Err(e) = self.flush() {
                log::error!("stream: {} bytes lost on close: {}", self.buf.len(), e);
            }
        }
    }
}
