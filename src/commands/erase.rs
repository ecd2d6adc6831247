//! Erase command implementation

use super::CommandError;
use gpioflash_core::flash;
use gpioflash_core::spi::SECTOR_SIZE;
use gpioflash_core::transport::FlashBus;
use gpioflash_core::Device;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

fn spinner(message: String) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Erase the whole chip (`bytes` is `None`) or the sectors covering a range
///
/// A whole-chip erase returns from the engine as soon as the command is
/// issued; this waits for the chip to go idle before reporting success.
pub fn run_erase(
    dev: &Device,
    bus: &mut dyn FlashBus,
    bytes: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    match bytes {
        None => {
            let pb = spinner("Erasing whole chip (this may take a while)...".to_string())?;
            flash::erase_range(dev, bus, 0)?;
            let polls = flash::wait_ready(dev, bus)?;
            log::debug!("Chip erase finished after {} status polls", polls);
            pb.finish_with_message("Chip erase complete");
        }
        Some(0) => return Err(CommandError::ZeroLength.into()),
        Some(len) => {
            let start = dev.offset & !(SECTOR_SIZE - 1);
            let end = dev.offset as u64 + len as u64;
            let pb = spinner(format!("Erasing 0x{:06X}..0x{:06X}...", start, end))?;
            flash::erase_range(dev, bus, len)?;
            pb.finish_with_message(format!(
                "Erased {} sectors from 0x{:06X}",
                (end - start as u64).div_ceil(SECTOR_SIZE as u64),
                start
            ));
        }
    }
    Ok(())
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;
    use gpioflash_core::spi::opcodes;
    use gpioflash_core::transport::BitbangSpi;
    use gpioflash_dummy::{DummyChip, DummyConfig};

    fn programmed_chip(busy_polls: u32) -> DummyChip {
        let config = DummyConfig {
            size: 64 * 1024,
            busy_polls,
            ..DummyConfig::default()
        };
        DummyChip::with_data(config, &[0u8; 64 * 1024])
    }

    #[test]
    fn test_chip_erase_waits() {
        let mut chip = programmed_chip(4);
        let pins = chip.config().pins;
        let dev = Device::default().with_clock_khz(0);
        {
            let mut bus = BitbangSpi::new(&mut chip, pins);
            run_erase(&dev, &mut bus, None).unwrap();
        }
        assert!(chip.data().iter().all(|&b| b == 0xFF));
        assert!(!chip.status().is_busy());
        assert_eq!(chip.transactions_with(opcodes::RDSR).count(), 5);
    }

    #[test]
    fn test_range_erase() {
        let mut chip = programmed_chip(0);
        let pins = chip.config().pins;
        let dev = Device::default().with_clock_khz(0).with_range(0x1800, 0x1000);
        {
            let mut bus = BitbangSpi::new(&mut chip, pins);
            run_erase(&dev, &mut bus, Some(0x1000)).unwrap();
        }
        // 0x1800..0x2800 touches the sectors at 0x1000 and 0x2000
        assert!(chip.data()[..0x1000].iter().all(|&b| b == 0));
        assert!(chip.data()[0x1000..0x3000].iter().all(|&b| b == 0xFF));
        assert!(chip.data()[0x3000..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_zero_length_rejected() {
        let mut chip = programmed_chip(0);
        let pins = chip.config().pins;
        let dev = Device::default();
        {
            let mut bus = BitbangSpi::new(&mut chip, pins);
            assert!(run_erase(&dev, &mut bus, Some(0)).is_err());
        }
        assert!(chip.transactions().is_empty());
    }
}
