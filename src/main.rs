//! gpioflash - SPI flash dumper and programmer over bit-banged GPIO
//!
//! Drives a 25-series SPI flash chip wired straight to GPIO lines (a
//! Raspberry Pi header, for instance) and moves data between the chip and
//! files on disk.
//!
//! # Architecture
//!
//! - `gpioflash-core` holds the device descriptor, the bit-banged bus, the
//!   25-series command engine and the buffered file stream
//! - a GPIO backend (`gpioflash-linux-gpio`, or the `gpioflash-dummy`
//!   emulator) provides the lines
//! - this binary parses arguments, opens the backend for the duration of
//!   one command and reports progress

mod backends;
mod cli;
mod commands;

use clap::Parser;
use cli::{BusArgs, Cli, Commands};
use gpioflash_core::Device;

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Descriptor for one command, checked before any line is requested
fn device_for(
    bus: &BusArgs,
    offset: u32,
    byte_count: u32,
) -> Result<Device, Box<dyn std::error::Error>> {
    let dev = Device::new(bus.interface.into())
        .with_clock_khz(bus.speed)
        .with_range(offset, byte_count)
        .with_busy_poll_limit(bus.busy_poll_limit);
    dev.validate()?;
    dev.check_supported()?;
    log::debug!(
        "{} ({}) at {} kHz, {} bytes from 0x{:06X}",
        dev.interface,
        dev.protocol,
        dev.clock_khz,
        dev.byte_count,
        dev.offset
    );
    Ok(dev)
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Probe { bus } => {
            let mut dev = device_for(&bus, 0, 0)?;
            backends::with_bus(&bus.gpio, dev.interface, |flash_bus| {
                commands::run_probe(&mut dev, flash_bus)
            })
        }
        Commands::Read {
            bus,
            output,
            bytes,
            offset,
        } => {
            let mut dev = device_for(&bus, offset, bytes)?;
            backends::with_bus(&bus.gpio, dev.interface, |flash_bus| {
                commands::run_read(&mut dev, flash_bus, &output)
            })
        }
        Commands::Write {
            bus,
            input,
            bytes,
            offset,
        } => {
            let bytes = match bytes {
                Some(bytes) => bytes,
                None => commands::input_length(&input)?,
            };
            let dev = device_for(&bus, offset, bytes)?;
            backends::with_bus(&bus.gpio, dev.interface, |flash_bus| {
                commands::run_write(&dev, flash_bus, &input)
            })
        }
        Commands::Erase { bus, bytes, offset } => {
            let dev = device_for(&bus, offset, bytes.unwrap_or(0))?;
            backends::with_bus(&bus.gpio, dev.interface, |flash_bus| {
                commands::run_erase(&dev, flash_bus, bytes)
            })
        }
    }
}
