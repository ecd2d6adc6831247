//! Protocol implementations
//!
//! This module contains the 25-series command sequences. Each function is
//! one or more complete select/deselect transactions on a [`crate::transport::FlashBus`].

mod spi25;

pub use spi25::*;
