//! 25-series SPI command definitions
//!
//! Opcodes, the status register layout, and the 3-byte address encoding
//! shared by the read, program and erase commands.

pub mod opcodes;

use bitflags::bitflags;

/// Bytes written by one page program command
pub const PAGE_SIZE: u32 = 256;

/// Smallest erasable unit
pub const SECTOR_SIZE: u32 = 4096;

bitflags! {
    /// Status register 1 as returned by RDSR (0x05)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Status: u8 {
        /// Write in progress (erase or program running)
        const WIP  = 1 << 0;
        /// Write enable latch
        const WEL  = 1 << 1;
        /// Block protect bit 0
        const BP0  = 1 << 2;
        /// Block protect bit 1
        const BP1  = 1 << 3;
        /// Block protect bit 2
        const BP2  = 1 << 4;
        /// Top/bottom protect
        const TB   = 1 << 5;
        /// Sector/block protect
        const SEC  = 1 << 6;
        /// Status register protect
        const SRP0 = 1 << 7;
    }
}

impl Status {
    /// True while an erase or program is still running
    pub fn is_busy(self) -> bool {
        self.contains(Status::WIP)
    }
}

/// Encode an address as the three big-endian bytes that follow an opcode
///
/// Bits above 23 are dropped, matching what the chip sees.
pub const fn address_3b(addr: u32) -> [u8; 3] {
    [(addr >> 16) as u8, (addr >> 8) as u8, addr as u8]
}
