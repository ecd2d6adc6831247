//! Read command implementation

use super::progress::{transfer_bar, ProgressStream};
use super::CommandError;
use gpioflash_core::flash;
use gpioflash_core::stream::FileStream;
use gpioflash_core::transport::FlashBus;
use gpioflash_core::Device;
use std::path::Path;

/// Identify the chip, then dump `dev.byte_count` bytes from `dev.offset`
pub fn run_read(
    dev: &mut Device,
    bus: &mut dyn FlashBus,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    if dev.byte_count == 0 {
        return Err(CommandError::ZeroLength.into());
    }

    let id = flash::identify(dev, bus)?;
    if id.is_blank() {
        log::warn!("JEDEC ID reads {}, is a chip connected?", id);
    } else {
        log::info!(
            "Found {} chip, JEDEC ID {}",
            id.manufacturer_name().unwrap_or("unknown"),
            id
        );
    }

    let file = FileStream::create(output)?;
    let pb = transfer_bar(dev.byte_count as u64, "Reading")?;
    let mut dest = ProgressStream::new(file, pb);

    flash::read_to_stream(dev, bus, &mut dest)?;
    // Surface flush errors instead of leaving them to Drop
    dest.finish().into_inner()?;

    println!(
        "Dumped {} KiB ({} bytes) from 0x{:06X} to {}",
        dev.byte_count / 1024,
        dev.byte_count,
        dev.offset,
        output.display()
    );
    Ok(())
}
