//! Write command implementation

use super::progress::{transfer_bar, ProgressStream};
use super::CommandError;
use gpioflash_core::device::MAX_BYTES;
use gpioflash_core::flash;
use gpioflash_core::stream::FileStream;
use gpioflash_core::transport::FlashBus;
use gpioflash_core::Device;
use std::path::Path;

/// Size of the input file, checked against the transfer limit
pub fn input_length(input: &Path) -> Result<u32, Box<dyn std::error::Error>> {
    let len = std::fs::metadata(input)?.len();
    if len == 0 {
        return Err(CommandError::EmptyInput(input.to_path_buf()).into());
    }
    u32::try_from(len)
        .ok()
        .filter(|&len| len <= MAX_BYTES)
        .ok_or_else(|| {
            format!(
                "{} is {} bytes, more than the 256 MiB limit",
                input.display(),
                len
            )
            .into()
        })
}

/// Program `dev.byte_count` bytes of `input` at `dev.offset`
pub fn run_write(
    dev: &Device,
    bus: &mut dyn FlashBus,
    input: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    if dev.byte_count == 0 {
        return Err(CommandError::ZeroLength.into());
    }

    let file = FileStream::open(input)?;
    let pb = transfer_bar(dev.byte_count as u64, "Writing")?;
    let mut src = ProgressStream::new(file, pb);

    let written = flash::program_from_stream(dev, bus, &mut src)?;
    src.finish();

    if written < dev.byte_count {
        return Err(CommandError::ShortInput {
            path: input.to_path_buf(),
            written,
            requested: dev.byte_count,
        }
        .into());
    }

    println!(
        "Programmed {} KiB ({} bytes) at 0x{:06X} from {}",
        written / 1024,
        written,
        dev.offset,
        input.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_length() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("gpioflash-input-{}.bin", std::process::id()));

        std::fs::write(&path, [0u8; 300]).unwrap();
        assert_eq!(input_length(&path).unwrap(), 300);

        std::fs::write(&path, b"").unwrap();
        assert!(input_length(&path).unwrap_err().to_string().contains("empty"));

        std::fs::remove_file(&path).unwrap();
        assert!(input_length(&path).is_err());
    }
}

#[cfg(all(test, feature = "dummy"))]
mod emulator_tests {
    use super::*;
    use gpioflash_core::spi::opcodes;
    use gpioflash_core::transport::BitbangSpi;
    use gpioflash_dummy::DummyChip;

    #[test]
    fn test_write_file() {
        let data: Vec<u8> = (0..700u32).map(|i| (i % 251) as u8).collect();
        let path =
            std::env::temp_dir().join(format!("gpioflash-write-{}.bin", std::process::id()));
        std::fs::write(&path, &data).unwrap();

        let mut chip = DummyChip::new_default();
        let pins = chip.config().pins;
        {
            let mut bus = BitbangSpi::new(&mut chip, pins);
            let len = input_length(&path).unwrap();
            let dev = Device::default().with_clock_khz(0).with_range(0x3000, len);
            run_write(&dev, &mut bus, &path).unwrap();
        }
        std::fs::remove_file(&path).unwrap();

        assert_eq!(&chip.data()[0x3000..0x3000 + 700], &data[..]);
        assert_eq!(chip.transactions_with(opcodes::PP).count(), 3);
    }

    #[test]
    fn test_short_input_fails() {
        let path =
            std::env::temp_dir().join(format!("gpioflash-short-{}.bin", std::process::id()));
        std::fs::write(&path, [0x5Au8; 300]).unwrap();

        let mut chip = DummyChip::new_default();
        let pins = chip.config().pins;
        let err = {
            let mut bus = BitbangSpi::new(&mut chip, pins);
            let dev = Device::default().with_clock_khz(0).with_range(0, 600);
            run_write(&dev, &mut bus, &path).unwrap_err()
        };
        std::fs::remove_file(&path).unwrap();

        assert!(
            err.to_string().contains("after 300 of 600 bytes"),
            "{}",
            err
        );
        // What the file held is still on the chip
        assert!(chip.data()[..300].iter().all(|&b| b == 0x5A));
        assert_eq!(chip.data()[300], 0xFF);
    }

    #[test]
    fn test_write_past_top_rejected() {
        let path =
            std::env::temp_dir().join(format!("gpioflash-top-{}.bin", std::process::id()));
        std::fs::write(&path, [0u8; 0x200]).unwrap();

        let mut chip = DummyChip::new_default();
        let pins = chip.config().pins;
        let result = {
            let mut bus = BitbangSpi::new(&mut chip, pins);
            let dev = Device::default()
                .with_clock_khz(0)
                .with_range(0xFFFF00, 0x200);
            run_write(&dev, &mut bus, &path)
        };
        std::fs::remove_file(&path).unwrap();

        assert!(result.is_err());
        assert_eq!(chip.transactions_with(opcodes::PP).count(), 0);
        assert!(chip.data()[..0x100].iter().all(|&b| b == 0xFF));
    }
}
