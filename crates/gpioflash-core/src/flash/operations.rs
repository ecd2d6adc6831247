//! Identify, read, program and erase

use crate::chip::ChipId;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::protocol;
use crate::spi::{PAGE_SIZE, SECTOR_SIZE};
use crate::stream::{ByteStream, StreamMode};
use crate::transport::FlashBus;

fn require_mode<S: ByteStream + ?Sized>(stream: &S, expected: StreamMode) -> Result<()> {
    let found = stream.mode();
    if found == expected {
        Ok(())
    } else {
        Err(Error::WrongStreamMode { expected, found })
    }
}

/// Read the identification triple and record it in `dev`
///
/// Any identification from an earlier call is dropped first, so `dev`
/// only reports a chip ID when this call succeeded.
pub fn identify<B: FlashBus + ?Sized>(dev: &mut Device, bus: &mut B) -> Result<ChipId> {
    dev.reset_chip_id();
    dev.check_supported()?;

    bus.set_clock_khz(dev.clock_khz)?;
    let id = bus.read_id()?;
    dev.set_chip_id(id);

    log::debug!("identify: {}", id);
    Ok(id)
}

/// Read `dev.byte_count` bytes from `dev.offset` into `dest`
///
/// The transfer is one READ transaction with chip select held for its
/// whole length. `dest` is flushed at the end.
pub fn read_to_stream<B, S>(dev: &Device, bus: &mut B, dest: &mut S) -> Result<()>
where
    B: FlashBus + ?Sized,
    S: ByteStream + ?Sized,
{
    dev.check_supported()?;
    require_mode(dest, StreamMode::Write)?;

    log::debug!(
        "read: {} bytes from 0x{:06X} at {} kHz",
        dev.byte_count,
        dev.offset,
        dev.clock_khz
    );

    bus.set_clock_khz(dev.clock_khz)?;
    protocol::read_3b(bus, dev.offset, dev.byte_count, dest)?;
    dest.flush()?;

    log::info!("Read {} bytes from 0x{:06X}", dev.byte_count, dev.offset);
    Ok(())
}

/// Program `dev.byte_count` bytes from `src` starting at `dev.offset`
///
/// Data goes out one page program per page, each preceded by Write Enable
/// and followed by a busy wait. A chunk never crosses a page boundary, so
/// for a page-aligned offset the chunks are `min(remaining, 256)` bytes.
///
/// If `src` runs dry, the bytes already pulled are programmed and the
/// operation stops there. Returns the number of bytes programmed.
///
/// Fails with [`Error::OutOfRange`] before touching the bus if the range
/// runs past the 3-byte address space.
pub fn program_from_stream<B, S>(dev: &Device, bus: &mut B, src: &mut S) -> Result<u32>
where
    B: FlashBus + ?Sized,
    S: ByteStream + ?Sized,
{
    dev.check_supported()?;
    require_mode(src, StreamMode::Read)?;
    dev.check_address_range(dev.byte_count)?;

    log::debug!(
        "program: {} bytes to 0x{:06X} at {} kHz",
        dev.byte_count,
        dev.offset,
        dev.clock_khz
    );

    bus.set_clock_khz(dev.clock_khz)?;
    bus.set_write_protect(false)?;

    let mut page = [0u8; PAGE_SIZE as usize];
    let mut addr = dev.offset;
    let mut remaining = dev.byte_count;

    while remaining > 0 {
        let room = PAGE_SIZE - addr % PAGE_SIZE;
        let chunk = remaining.min(room) as usize;

        // Pull the whole chunk before selecting the chip so file refills
        // never stall a transaction
        let mut filled = 0;
        while filled < chunk {
            match src.pull()? {
                Some(byte) => {
                    page[filled] = byte;
                    filled += 1;
                }
                None => break,
            }
        }
        if filled == 0 {
            break;
        }

        protocol::program_page_3b(bus, addr, &page[..filled], dev.busy_poll_limit)?;
        log::trace!("program: {} bytes at 0x{:06X}", filled, addr);

        addr += filled as u32;
        remaining -= filled as u32;
        if filled < chunk {
            break;
        }
    }

    let written = dev.byte_count - remaining;
    if remaining > 0 {
        log::warn!(
            "Source ended after {} of {} bytes, stopped at 0x{:06X}",
            written,
            dev.byte_count,
            addr
        );
    } else {
        log::info!("Programmed {} bytes at 0x{:06X}", written, dev.offset);
    }
    Ok(written)
}

/// Erase the whole chip (`byte_count == 0`) or a sector-aligned range
///
/// A ranged erase issues 4 KiB sector erases from `dev.offset` rounded
/// down to a sector boundary, stepping 4096 bytes while below
/// `dev.offset + byte_count`, with a busy wait after each. A range that
/// runs past the 3-byte address space is rejected before any command is
/// sent. A whole-chip erase only issues the command; see [`wait_ready`].
pub fn erase_range<B: FlashBus + ?Sized>(dev: &Device, bus: &mut B, byte_count: u32) -> Result<()> {
    dev.check_supported()?;
    if byte_count != 0 {
        dev.check_address_range(byte_count)?;
    }

    bus.set_clock_khz(dev.clock_khz)?;
    bus.set_write_protect(false)?;

    if byte_count == 0 {
        protocol::chip_erase(bus)?;
        log::info!("Chip erase started");
        return Ok(());
    }

    let end = dev.offset as u64 + byte_count as u64;
    let mut addr = (dev.offset & !(SECTOR_SIZE - 1)) as u64;
    let mut sectors = 0u32;
    while addr < end {
        protocol::sector_erase_3b(bus, addr as u32, dev.busy_poll_limit)?;
        log::trace!("erase: sector at 0x{:06X}", addr);
        addr += SECTOR_SIZE as u64;
        sectors += 1;
    }

    log::info!(
        "Erased {} sectors covering 0x{:06X}..0x{:06X}",
        sectors,
        dev.offset,
        end
    );
    Ok(())
}

/// Poll status until the chip is idle
///
/// Honors `dev.busy_poll_limit`. Returns the number of status reads.
pub fn wait_ready<B: FlashBus + ?Sized>(dev: &Device, bus: &mut B) -> Result<u32> {
    dev.check_supported()?;
    protocol::wait_ready(bus, dev.busy_poll_limit)
}
