//! SPI25 protocol implementation
//!
//! This module implements the common 25-series flash command sequences
//! on top of a byte-level [`FlashBus`]. Every program or erase command is
//! preceded by its own Write Enable transaction, and every program or
//! sector erase is followed by a busy wait on the WIP bit.
//!
//! The busy wait has no limit unless the caller passes one: a chip that
//! never clears WIP keeps the engine polling.

use crate::chip::ChipId;
use crate::error::{Error, Result};
use crate::spi::{address_3b, opcodes, Status};
use crate::stream::ByteStream;
use crate::transport::FlashBus;

/// Run `body` between a chip select assert and deassert
///
/// Select is released even when `body` fails, so the chip never sees a
/// half-finished command turn into the next one.
pub fn transaction<B, T, F>(bus: &mut B, body: F) -> Result<T>
where
    B: FlashBus + ?Sized,
    F: FnOnce(&mut B) -> Result<T>,
{
    bus.start()?;
    let result = body(bus);
    let stopped = bus.stop();
    let value = result?;
    stopped?;
    Ok(value)
}

/// Read the JEDEC ID from a flash chip
///
/// One transaction: RDID followed by three received bytes.
pub fn read_jedec_id<B: FlashBus + ?Sized>(bus: &mut B) -> Result<ChipId> {
    transaction(bus, |bus| {
        bus.write_byte(opcodes::RDID)?;
        let mut id = [0u8; 3];
        for byte in id.iter_mut() {
            *byte = bus.read_byte()?;
        }
        Ok(ChipId::from_bytes(id))
    })
}

/// Read the status register 1
pub fn read_status<B: FlashBus + ?Sized>(bus: &mut B) -> Result<Status> {
    transaction(bus, |bus| {
        bus.write_byte(opcodes::RDSR)?;
        Ok(Status::from_bits_retain(bus.read_byte()?))
    })
}

/// Send the Write Enable command
pub fn write_enable<B: FlashBus + ?Sized>(bus: &mut B) -> Result<()> {
    transaction(bus, |bus| bus.write_byte(opcodes::WREN))
}

/// Wait for the WIP (Write In Progress) bit to clear
///
/// Polls the status register back to back until WIP reads 0 and returns
/// the number of status reads issued. With `poll_limit` set, gives up
/// with [`Error::Timeout`] after that many busy reads; with `None` it never
/// gives up.
pub fn wait_ready<B: FlashBus + ?Sized>(bus: &mut B, poll_limit: Option<u32>) -> Result<u32> {
    let mut polls = 0u32;
    loop {
        let status = read_status(bus)?;
        polls = polls.saturating_add(1);
        if !status.is_busy() {
            return Ok(polls);
        }
        if let Some(limit) = poll_limit {
            if polls >= limit {
                return Err(Error::Timeout { polls });
            }
        }
    }
}

/// Read `len` bytes starting at `addr` into a stream
///
/// The whole transfer is a single READ transaction: select stays asserted
/// from the opcode to the last byte, and each byte is pushed to `sink` as
/// soon as it is shifted in.
pub fn read_3b<B, S>(bus: &mut B, addr: u32, len: u32, sink: &mut S) -> Result<()>
where
    B: FlashBus + ?Sized,
    S: ByteStream + ?Sized,
{
    transaction(bus, |bus| {
        bus.write_byte(opcodes::READ)?;
        bus.write_bytes(&address_3b(addr))?;
        for _ in 0..len {
            sink.push(bus.read_byte()?)?;
        }
        Ok(())
    })
}

/// Program a single page (up to page size bytes)
///
/// The data must not cross a page boundary; the chip would wrap to the
/// start of the page. Sends WREN, the PP transaction, then waits for WIP.
pub fn program_page_3b<B: FlashBus + ?Sized>(
    bus: &mut B,
    addr: u32,
    data: &[u8],
    poll_limit: Option<u32>,
) -> Result<u32> {
    write_enable(bus)?;
    transaction(bus, |bus| {
        bus.write_byte(opcodes::PP)?;
        bus.write_bytes(&address_3b(addr))?;
        bus.write_bytes(data)
    })?;
    wait_ready(bus, poll_limit)
}

/// Erase the 4 KiB sector containing `addr` and wait for completion
pub fn sector_erase_3b<B: FlashBus + ?Sized>(
    bus: &mut B,
    addr: u32,
    poll_limit: Option<u32>,
) -> Result<u32> {
    write_enable(bus)?;
    transaction(bus, |bus| {
        bus.write_byte(opcodes::SE_20)?;
        bus.write_bytes(&address_3b(addr))
    })?;
    wait_ready(bus, poll_limit)
}

/// Start a whole-chip erase
///
/// Returns as soon as the command is issued. Chip erase runs for seconds
/// to minutes; callers that need to know when it is done poll with
/// [`wait_ready`].
pub fn chip_erase<B: FlashBus + ?Sized>(bus: &mut B) -> Result<()> {
    write_enable(bus)?;
    transaction(bus, |bus| bus.write_byte(opcodes::CE_C7))
}
