//! gpioflash-linux-gpio - GPIO lines through the Linux character device
//!
//! This crate implements the [`gpioflash_core::gpio::Gpio`] capability on
//! top of `/dev/gpiochipN` using the gpiocdev crate, a pure Rust
//! implementation of the GPIO character device interface.
//!
//! # Example
//!
//! ```no_run
//! use gpioflash_core::flash;
//! use gpioflash_core::transport::BitbangSpi;
//! use gpioflash_core::Device;
//! use gpioflash_linux_gpio::{LinuxGpio, LinuxGpioConfig};
//!
//! let config = LinuxGpioConfig::default();
//! let gpio = LinuxGpio::open(&config)?;
//! let mut bus = BitbangSpi::new(gpio, config.pins);
//!
//! let mut dev = Device::default();
//! let id = flash::identify(&mut dev, &mut bus)?;
//! println!("JEDEC ID: {}", id);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Usage with the gpioflash CLI
//!
//! ```bash
//! # Default Raspberry Pi wiring on /dev/gpiochip0
//! gpioflash probe
//!
//! # Other chip and lines
//! gpioflash probe --gpio gpiochip=1,sck=11,mosi=10,miso=9,cs=8,wp=25,hold=none
//! ```
//!
//! # GPIO Pin Wiring
//!
//! | Flash Pin | Default line | Description |
//! |-----------|--------------|-------------|
//! | CLK       | 2            | Serial Clock |
//! | DO/MISO   | 3            | Chip to host data |
//! | DI/MOSI   | 4            | Host to chip data |
//! | HOLD#     | 17           | Driven high (or strap high and pass `hold=none`) |
//! | WP#       | 22           | Driven low until a program or erase |
//! | CS#       | 27           | Chip Select |
//! | VCC       | 3.3V         | Power supply |
//! | GND       | GND          | Ground |
//!
//! # System Requirements
//!
//! - Linux kernel 4.8+ with GPIO character device support (kernel 5.5+ for v2 API)
//! - Access to `/dev/gpiochipN` devices (may require root or udev rules)

pub mod device;
pub mod error;

// Re-exports
pub use device::{parse_options, LinuxGpio, LinuxGpioConfig, DEFAULT_DEVICE};
pub use error::{LinuxGpioError, Result};

/// Parse an option list and open the lines it names
///
/// Convenience for the CLI: `options` are the `key=value` pairs of the
/// `--gpio` argument. Returns the handle together with the pinout to
/// drive it with.
pub fn open_linux_gpio(
    options: &[(&str, &str)],
) -> std::result::Result<(LinuxGpio, gpioflash_core::gpio::Pinout), Box<dyn std::error::Error>> {
    let config = parse_options(options)?;
    let gpio = LinuxGpio::open(&config)?;
    Ok((gpio, config.pins))
}
