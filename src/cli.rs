//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use gpioflash_core::device::{BusInterface, DEFAULT_CLOCK_KHZ, MAX_BYTES, MAX_CLOCK_KHZ};
use std::path::PathBuf;

/// Parse a byte count or address: decimal, `0x` hex, optional `K`/`M` suffix
pub fn parse_size(s: &str) -> Result<u32, String> {
    let s = s.trim();
    let (digits, unit) = match s.as_bytes().last() {
        Some(b'k' | b'K') => (&s[..s.len() - 1], 1024u64),
        Some(b'm' | b'M') => (&s[..s.len() - 1], 1024 * 1024),
        _ => (s, 1),
    };

    let value = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value '{}': {}", s, e))?
    } else {
        digits
            .parse::<u64>()
            .map_err(|e| format!("Invalid number '{}': {}", s, e))?
    };

    value
        .checked_mul(unit)
        .filter(|&bytes| bytes <= MAX_BYTES as u64)
        .map(|bytes| bytes as u32)
        .ok_or_else(|| format!("'{}' exceeds the 256 MiB limit", s))
}

/// Parse a clock in kHz, or `max` for no delays at all
pub fn parse_speed(s: &str) -> Result<u32, String> {
    if s.eq_ignore_ascii_case("max") {
        return Ok(0);
    }
    let khz: u32 = s
        .parse()
        .map_err(|e| format!("Invalid speed '{}': {}", s, e))?;
    if khz == 0 || khz > MAX_CLOCK_KHZ {
        return Err(format!(
            "Speed must be between 1 and {} kHz, or 'max'",
            MAX_CLOCK_KHZ
        ));
    }
    Ok(khz)
}

#[derive(Parser)]
#[command(name = "gpioflash")]
#[command(
    author,
    version,
    about = "Dump, program and erase SPI flash chips over bit-banged GPIO",
    long_about = None
)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Bus wiring
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum InterfaceArg {
    /// Single-lane SPI (25-series)
    Spi,
    /// Dual SPI (25-series, not implemented)
    Dspi,
    /// Quad SPI (25-series, not implemented)
    Qspi,
    /// Two-wire bus (24-series, not implemented)
    I2c,
}

impl From<InterfaceArg> for BusInterface {
    fn from(arg: InterfaceArg) -> Self {
        match arg {
            InterfaceArg::Spi => BusInterface::Spi,
            InterfaceArg::Dspi => BusInterface::DualSpi,
            InterfaceArg::Qspi => BusInterface::QuadSpi,
            InterfaceArg::I2c => BusInterface::I2c,
        }
    }
}

/// Bus options shared across commands
#[derive(clap::Args, Debug, Clone)]
pub struct BusArgs {
    /// GPIO backend and lines, e.g. "gpiochip=0,sck=2,mosi=4,miso=3,cs=27,wp=22,hold=17"
    /// or "dummy" for the emulated chip
    #[arg(short, long, default_value = "linux_gpio")]
    pub gpio: String,

    /// Bus interface
    #[arg(short, long, value_enum, default_value_t = InterfaceArg::Spi)]
    pub interface: InterfaceArg,

    /// Clock in kHz (1-1000), or "max" to toggle lines as fast as possible
    #[arg(short, long, default_value_t = DEFAULT_CLOCK_KHZ, value_parser = parse_speed)]
    pub speed: u32,

    /// Give up after this many consecutive busy status reads (default: wait forever)
    #[arg(long)]
    pub busy_poll_limit: Option<u32>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read and print the chip's JEDEC ID
    Probe {
        #[command(flatten)]
        bus: BusArgs,
    },

    /// Dump flash contents to a file
    Read {
        #[command(flatten)]
        bus: BusArgs,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Number of bytes to read (e.g. 16M, 0x1000)
        #[arg(short, long, value_parser = parse_size)]
        bytes: u32,

        /// First flash address to read
        #[arg(long, default_value = "0", value_parser = parse_size)]
        offset: u32,
    },

    /// Program a file to flash (the range must already be erased)
    Write {
        #[command(flatten)]
        bus: BusArgs,

        /// Input file path
        #[arg(short = 'f', long)]
        input: PathBuf,

        /// Number of bytes to program (default: the file size)
        #[arg(short, long, value_parser = parse_size)]
        bytes: Option<u32>,

        /// First flash address to program
        #[arg(long, default_value = "0", value_parser = parse_size)]
        offset: u32,
    },

    /// Erase the whole chip, or the 4 KiB sectors covering a range
    Erase {
        #[command(flatten)]
        bus: BusArgs,

        /// Number of bytes to erase (default: whole chip)
        #[arg(short, long, value_parser = parse_size)]
        bytes: Option<u32>,

        /// Start of the range to erase
        #[arg(long, default_value = "0", value_parser = parse_size)]
        offset: u32,
    },
}
