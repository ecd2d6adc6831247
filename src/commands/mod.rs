//! CLI command implementations
//!
//! Each command runs against an already opened bus and a [`Device`]
//! describing the job. Configuration errors (unsupported interface,
//! out-of-range parameters) are reported before the bus is touched.
//!
//! [`Device`]: gpioflash_core::Device

mod erase;
mod probe;
mod progress;
mod read;
mod write;

pub use erase::run_erase;
pub use probe::run_probe;
pub use read::run_read;
pub use write::{input_length, run_write};

use thiserror::Error;

/// Failures the commands detect themselves
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("No flash chip detected (JEDEC ID reads {0})")]
    NoChip(gpioflash_core::ChipId),

    #[error("Nothing to do: {0} is empty")]
    EmptyInput(std::path::PathBuf),

    #[error("Byte count must not be zero")]
    ZeroLength,

    #[error("{path} ended after {written} of {requested} bytes; flash was programmed up to that point")]
    ShortInput {
        path: std::path::PathBuf,
        written: u32,
        requested: u32,
    },
}
