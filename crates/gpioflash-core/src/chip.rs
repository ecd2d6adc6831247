//! JEDEC identification triple

use core::fmt;

/// Identification bytes returned by the RDID (0x9F) command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChipId {
    /// JEDEC manufacturer code
    pub manufacturer: u8,
    /// Memory type code
    pub memory_type: u8,
    /// Capacity code
    pub capacity: u8,
}

/// Manufacturer codes seen on common 25-series parts (bank 0 only)
const MANUFACTURERS: &[(u8, &str)] = &[
    (0x01, "Spansion"),
    (0x1C, "EON"),
    (0x1F, "Atmel/Adesto"),
    (0x20, "Micron/ST"),
    (0x37, "AMIC"),
    (0x5E, "Zbit"),
    (0x62, "ON Semiconductor"),
    (0x68, "Boya"),
    (0x85, "Puya"),
    (0x9D, "ISSI"),
    (0xBF, "SST"),
    (0xC2, "Macronix"),
    (0xC8, "GigaDevice"),
    (0xEF, "Winbond"),
];

impl ChipId {
    /// Build an ID from the three bytes in the order the chip sends them
    pub const fn from_bytes(bytes: [u8; 3]) -> Self {
        Self {
            manufacturer: bytes[0],
            memory_type: bytes[1],
            capacity: bytes[2],
        }
    }

    /// The three bytes in wire order
    pub const fn to_bytes(self) -> [u8; 3] {
        [self.manufacturer, self.memory_type, self.capacity]
    }

    /// Vendor name for the manufacturer code, if it is a known one
    pub fn manufacturer_name(&self) -> Option<&'static str> {
        MANUFACTURERS
            .iter()
            .find(|(code, _)| *code == self.manufacturer)
            .map(|(_, name)| *name)
    }

    /// Chip size implied by the capacity code
    ///
    /// Most vendors encode the size as `2^capacity` bytes. Codes outside the
    /// 64 KiB..256 MiB window are not decoded.
    pub fn size_hint(&self) -> Option<u32> {
        match self.capacity {
            0x10..=0x1C => Some(1u32 << self.capacity),
            _ => None,
        }
    }

    /// A bus with nothing attached reads all ones or all zeros
    pub fn is_blank(&self) -> bool {
        matches!(self.to_bytes(), [0xFF, 0xFF, 0xFF] | [0x00, 0x00, 0x00])
    }
}

impl fmt::Display for ChipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X} {:02X} {:02X}",
            self.manufacturer, self.memory_type, self.capacity
        )
    }
}
