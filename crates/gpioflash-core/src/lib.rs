//! gpioflash-core - Bit-banged SPI flash programming
//!
//! This crate drives a 25-series SPI flash chip from plain GPIO lines. It
//! contains everything between the pins and the image file:
//!
//! - [`gpio`] - the pin capability the transport is built on
//! - [`transport`] - the bit-banged single-lane SPI bus, plus typed
//!   placeholders for the dual, quad and two-wire variants
//! - [`protocol`] - the 25-series command sequences (write enable, page
//!   program, sector/chip erase, status polling, identification)
//! - [`flash`] - the caller-facing operations that validate a [`Device`]
//!   and stream a whole transfer through a [`stream::ByteStream`]
//! - [`stream`] - the byte stream seam and, with `std`, the buffered file
//!   stream that batches file I/O
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`) and the
//!   buffered file stream
//! - `alloc` - Enable boxed transports via [`transport::open`]
//!
//! # Example
//!
//! ```ignore
//! use gpioflash_core::{flash, transport::BitbangSpi, Device};
//!
//! fn probe<G: gpioflash_core::gpio::Gpio>(gpio: &mut G) -> gpioflash_core::Result<()> {
//!     let mut dev = Device::default();
//!     let mut bus = BitbangSpi::new(gpio, Default::default());
//!     let id = flash::identify(&mut dev, &mut bus)?;
//!     println!("JEDEC ID: {}", id);
//!     Ok(())
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod chip;
pub mod device;
pub mod error;
pub mod flash;
pub mod gpio;
pub mod protocol;
pub mod spi;
pub mod stream;
pub mod transport;

pub use chip::ChipId;
pub use device::{BusInterface, Device, Protocol};
pub use error::{Error, Result};
