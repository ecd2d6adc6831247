//! Probe command implementation

use super::CommandError;
use gpioflash_core::flash;
use gpioflash_core::transport::FlashBus;
use gpioflash_core::Device;

/// Read the JEDEC ID and print what it decodes to
pub fn run_probe(
    dev: &mut Device,
    bus: &mut dyn FlashBus,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = flash::identify(dev, bus)?;
    if id.is_blank() {
        return Err(CommandError::NoChip(id).into());
    }

    println!("Found flash chip:");
    println!("  JEDEC ID: {}", id);
    println!("  Vendor:   {}", id.manufacturer_name().unwrap_or("unknown"));
    match id.size_hint() {
        Some(size) => println!("  Size:     {} bytes ({} KiB)", size, size / 1024),
        None => println!("  Size:     unknown (capacity code 0x{:02X})", id.capacity),
    }
    Ok(())
}
