//! gpioflash-dummy - Pin-level flash emulator for testing
//!
//! [`DummyChip`] implements the GPIO capability and behaves like a
//! 25-series SPI flash wired to those lines: it latches MOSI on rising
//! clock edges, shifts MISO out on falling edges and acts on a command
//! when chip select goes back high. Driving it through the real
//! bit-banged transport exercises the whole stack without hardware.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;

use gpioflash_core::gpio::{Direction, Gpio, Level, Pin, Pinout};
use gpioflash_core::spi::{opcodes, Status, PAGE_SIZE, SECTOR_SIZE};
use gpioflash_core::ChipId;

/// Configuration for the emulated chip
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// JEDEC manufacturer ID
    pub manufacturer_id: u8,
    /// JEDEC device ID (memory type, capacity)
    pub device_id: u16,
    /// Flash size in bytes
    pub size: usize,
    /// Lines the chip is wired to
    pub pins: Pinout,
    /// Status reads that report busy after each program or erase
    pub busy_polls: u32,
    /// Refuse program and erase while WP# is low
    pub honor_write_protect: bool,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            manufacturer_id: 0xEF, // Winbond
            device_id: 0x4018,     // W25Q128FV
            size: 16 * 1024 * 1024,
            pins: Pinout::default(),
            busy_polls: 0,
            honor_write_protect: true,
        }
    }
}

impl DummyConfig {
    /// Identification triple the chip answers RDID with
    pub fn chip_id(&self) -> ChipId {
        ChipId::from_bytes([
            self.manufacturer_id,
            (self.device_id >> 8) as u8,
            self.device_id as u8,
        ])
    }
}

/// One completed select/deselect bracket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// First byte clocked in
    pub opcode: u8,
    /// Address for commands that carry one
    pub address: Option<u32>,
    /// Whole bytes clocked after the opcode and address
    pub data_len: usize,
}

/// Bytes and bits of the transaction in progress
#[derive(Debug, Default)]
struct Frame {
    received: Vec<u8>,
    in_shift: u8,
    bits: u8,
    out_shift: u8,
}

fn has_address(opcode: u8) -> bool {
    matches!(
        opcode,
        opcodes::READ | opcodes::PP | opcodes::SE_20 | opcodes::BE_52 | opcodes::BE_D8
    )
}

/// Emulated SPI flash chip driven through GPIO lines
pub struct DummyChip {
    config: DummyConfig,
    data: Vec<u8>,
    directions: Vec<(Pin, Direction)>,
    cs: Level,
    sck: Level,
    mosi: Level,
    miso: Level,
    wp: Level,
    hold: Level,
    frame: Option<Frame>,
    write_enabled: bool,
    busy_remaining: u32,
    transactions: Vec<Transaction>,
    delay_calls: u64,
    delay_total_us: u64,
}

impl DummyChip {
    /// Create an erased chip with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        let data = vec![0xFF; config.size];
        Self {
            config,
            data,
            directions: Vec::new(),
            cs: Level::High,
            sck: Level::Low,
            mosi: Level::Low,
            miso: Level::High,
            wp: Level::Low,
            hold: Level::High,
            frame: None,
            write_enabled: false,
            busy_remaining: 0,
            transactions: Vec::new(),
            delay_calls: 0,
            delay_total_us: 0,
        }
    }

    /// Create an erased chip with the default configuration (W25Q128FV)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create a chip with pre-filled data
    pub fn with_data(config: DummyConfig, initial_data: &[u8]) -> Self {
        let mut chip = Self::new(config);
        let len = core::cmp::min(initial_data.len(), chip.data.len());
        chip.data[..len].copy_from_slice(&initial_data[..len]);
        chip
    }

    /// Get a reference to the flash data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get a mutable reference to the flash data
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Every transaction completed so far
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Completed transactions with the given opcode
    pub fn transactions_with(&self, opcode: u8) -> impl Iterator<Item = &Transaction> + '_ {
        self.transactions.iter().filter(move |t| t.opcode == opcode)
    }

    /// Forget recorded transactions
    pub fn clear_transactions(&mut self) {
        self.transactions.clear();
    }

    /// Status register as RDSR would report it now
    pub fn status(&self) -> Status {
        let mut status = Status::empty();
        status.set(Status::WIP, self.busy_remaining > 0);
        status.set(Status::WEL, self.write_enabled);
        status
    }

    /// Level the host last drove on `pin`, or MISO as presented by the chip
    pub fn level(&self, pin: Pin) -> Option<Level> {
        let pins = &self.config.pins;
        if pin == pins.cs {
            Some(self.cs)
        } else if pin == pins.sck {
            Some(self.sck)
        } else if pin == pins.mosi {
            Some(self.mosi)
        } else if pin == pins.miso {
            Some(self.miso)
        } else if pin == pins.wp {
            Some(self.wp)
        } else if Some(pin) == pins.hold {
            Some(self.hold)
        } else {
            None
        }
    }

    /// Direction the host last configured for `pin`
    pub fn direction(&self, pin: Pin) -> Option<Direction> {
        self.directions
            .iter()
            .find(|&&(p, _)| p == pin)
            .map(|&(_, d)| d)
    }

    /// Number of delay calls and their total length in microseconds
    pub fn delays(&self) -> (u64, u64) {
        (self.delay_calls, self.delay_total_us)
    }

    fn set_cs(&mut self, level: Level) {
        if level == self.cs {
            return;
        }
        self.cs = level;
        match level {
            Level::Low => {
                self.frame = Some(Frame {
                    out_shift: 0xFF,
                    ..Frame::default()
                });
                self.miso = Level::High;
            }
            Level::High => {
                if let Some(frame) = self.frame.take() {
                    self.finish(frame.received);
                }
                self.miso = Level::High;
            }
        }
    }

    fn set_sck(&mut self, level: Level) {
        if level == self.sck {
            return;
        }
        self.sck = level;
        if self.hold == Level::Low {
            return;
        }
        let mosi = self.mosi;
        let Some(frame) = self.frame.as_mut() else {
            return;
        };

        match level {
            Level::High => {
                frame.in_shift = (frame.in_shift << 1) | bool::from(mosi) as u8;
                frame.bits += 1;
            }
            Level::Low => {
                if frame.bits == 8 {
                    frame.received.push(frame.in_shift);
                    frame.in_shift = 0;
                    frame.bits = 0;
                    let next = self.next_out();
                    if let Some(frame) = self.frame.as_mut() {
                        frame.out_shift = next;
                    }
                } else {
                    frame.out_shift <<= 1;
                }
                if let Some(frame) = self.frame.as_ref() {
                    self.miso = Level::from(frame.out_shift & 0x80 != 0);
                }
            }
        }
    }

    /// Byte to shift out after the byte just received
    fn next_out(&self) -> u8 {
        let Some(frame) = self.frame.as_ref() else {
            return 0xFF;
        };
        let received = &frame.received;
        let n = received.len();

        match received[0] {
            opcodes::RDID => match self.config.chip_id().to_bytes().get(n - 1) {
                Some(&b) => b,
                None => 0xFF,
            },
            opcodes::RDSR => self.status().bits(),
            opcodes::READ if n >= 4 => {
                let addr = address(&received[1..4]) as usize;
                self.data[(addr + n - 4) % self.data.len()]
            }
            _ => 0xFF,
        }
    }

    fn finish(&mut self, received: Vec<u8>) {
        let Some(&opcode) = received.first() else {
            return;
        };
        let address = if has_address(opcode) && received.len() >= 4 {
            Some(address(&received[1..4]))
        } else {
            None
        };
        let header = if address.is_some() { 4 } else { 1 };
        let transaction = Transaction {
            opcode,
            address,
            data_len: received.len().saturating_sub(header),
        };
        log::trace!("dummy: {:?}", transaction);
        self.transactions.push(transaction);

        if opcode == opcodes::RDSR {
            self.busy_remaining = self.busy_remaining.saturating_sub(1);
            return;
        }
        if self.busy_remaining > 0 {
            log::warn!("dummy: opcode 0x{:02X} ignored while busy", opcode);
            return;
        }

        match (opcode, address) {
            (opcodes::WREN, _) => self.write_enabled = true,
            (opcodes::PP, Some(addr)) => {
                if self.begin_write(opcode) {
                    self.program(addr, &received[4..]);
                }
            }
            (opcodes::SE_20, Some(addr)) => self.erase_block(opcode, addr, SECTOR_SIZE as usize),
            (opcodes::BE_52, Some(addr)) => self.erase_block(opcode, addr, 32 * 1024),
            (opcodes::BE_D8, Some(addr)) => self.erase_block(opcode, addr, 64 * 1024),
            (opcodes::CE_C7, _) if received.len() == 1 => {
                if self.begin_write(opcode) {
                    self.data.fill(0xFF);
                }
            }
            _ => {}
        }
    }

    /// Check the write enable latch and WP#, then start the busy period
    fn begin_write(&mut self, opcode: u8) -> bool {
        if !self.write_enabled {
            log::warn!("dummy: opcode 0x{:02X} without write enable", opcode);
            return false;
        }
        self.write_enabled = false;
        if self.config.honor_write_protect && self.wp == Level::Low {
            log::warn!("dummy: opcode 0x{:02X} refused, WP# asserted", opcode);
            return false;
        }
        self.busy_remaining = self.config.busy_polls;
        true
    }

    fn program(&mut self, addr: u32, bytes: &[u8]) {
        // Writes past the end of the page wrap to its start
        let page = addr & !(PAGE_SIZE - 1);
        let size = self.data.len();
        for (i, &byte) in bytes.iter().enumerate() {
            let a = page | (addr.wrapping_add(i as u32) & (PAGE_SIZE - 1));
            // Flash programming: can only change 1 -> 0
            self.data[a as usize % size] &= byte;
        }
    }

    fn erase_block(&mut self, opcode: u8, addr: u32, erase_size: usize) {
        if !self.begin_write(opcode) {
            return;
        }
        let start = (addr as usize & !(erase_size - 1)) % self.data.len();
        let end = core::cmp::min(start + erase_size, self.data.len());
        self.data[start..end].fill(0xFF);
    }
}

fn address(bytes: &[u8]) -> u32 {
    (bytes[0] as u32) << 16 | (bytes[1] as u32) << 8 | bytes[2] as u32
}

impl Gpio for DummyChip {
    fn set_direction(&mut self, pin: Pin, direction: Direction) {
        match self.directions.iter_mut().find(|(p, _)| *p == pin) {
            Some(entry) => entry.1 = direction,
            None => self.directions.push((pin, direction)),
        }
    }

    fn write(&mut self, pin: Pin, level: Level) {
        let pins = self.config.pins;
        if pin == pins.cs {
            self.set_cs(level);
        } else if pin == pins.sck {
            self.set_sck(level);
        } else if pin == pins.mosi {
            self.mosi = level;
        } else if pin == pins.wp {
            self.wp = level;
        } else if Some(pin) == pins.hold {
            self.hold = level;
        } else {
            log::warn!("dummy: write to line {} which is not wired to an input", pin);
        }
    }

    fn read(&mut self, pin: Pin) -> Level {
        self.level(pin).unwrap_or(Level::Low)
    }

    fn delay_us(&mut self, us: u32) {
        self.delay_calls += 1;
        self.delay_total_us += us as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpioflash_core::flash;
    use gpioflash_core::protocol;
    use gpioflash_core::stream::{BufferedStream, StreamMode};
    use gpioflash_core::transport::{BitbangSpi, FlashBus};
    use gpioflash_core::Device;
    use std::io::Cursor;

    fn bus(chip: &mut DummyChip) -> BitbangSpi<&mut DummyChip> {
        let pins = chip.config().pins;
        BitbangSpi::new(chip, pins)
    }

    fn read_back(chip: &mut DummyChip, offset: u32, len: u32) -> Vec<u8> {
        let dev = Device::default().with_clock_khz(0).with_range(offset, len);
        let mut dest = BufferedStream::new(Cursor::new(Vec::new()), StreamMode::Write, 64);
        flash::read_to_stream(&dev, &mut bus(chip), &mut dest).unwrap();
        dest.into_inner().unwrap().into_inner()
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 13 + 7) as u8).collect()
    }

    #[test]
    fn test_idle_lines() {
        let mut chip = DummyChip::new_default();
        let pins = chip.config().pins;
        drop(bus(&mut chip));

        assert_eq!(chip.level(pins.cs), Some(Level::High));
        assert_eq!(chip.level(pins.sck), Some(Level::Low));
        assert_eq!(chip.level(pins.wp), Some(Level::Low));
        assert_eq!(chip.level(17), Some(Level::High));
        assert_eq!(chip.direction(pins.miso), Some(Direction::Input));
        assert_eq!(chip.direction(pins.cs), Some(Direction::Output));
        assert!(chip.transactions().is_empty());
    }

    #[test]
    fn test_identify() {
        let mut chip = DummyChip::new_default();
        let mut dev = Device::default();
        let id = flash::identify(&mut dev, &mut bus(&mut chip)).unwrap();

        assert_eq!(id.to_bytes(), [0xEF, 0x40, 0x18]);
        assert_eq!(id.manufacturer_name(), Some("Winbond"));
        assert_eq!(
            chip.transactions(),
            [Transaction {
                opcode: opcodes::RDID,
                address: None,
                data_len: 3,
            }]
        );
    }

    #[test]
    fn test_read() {
        let image = pattern(8192);
        let mut chip = DummyChip::with_data(DummyConfig::default(), &image);

        let out = read_back(&mut chip, 0x1234, 1000);
        assert_eq!(out, &image[0x1234..0x1234 + 1000]);
        assert_eq!(
            chip.transactions(),
            [Transaction {
                opcode: opcodes::READ,
                address: Some(0x1234),
                data_len: 1000,
            }]
        );
    }

    #[test]
    fn test_program_and_read_back() {
        let mut chip = DummyChip::new_default();
        let data = pattern(600);
        let dev = Device::default().with_clock_khz(0).with_range(0x2000, 600);
        let mut src = BufferedStream::new(Cursor::new(data.clone()), StreamMode::Read, 128);

        let written = flash::program_from_stream(&dev, &mut bus(&mut chip), &mut src).unwrap();
        assert_eq!(written, 600);

        let pages: Vec<(Option<u32>, usize)> = chip
            .transactions_with(opcodes::PP)
            .map(|t| (t.address, t.data_len))
            .collect();
        assert_eq!(
            pages,
            [(Some(0x2000), 256), (Some(0x2100), 256), (Some(0x2200), 88)]
        );
        assert_eq!(chip.level(chip.config().pins.wp), Some(Level::High));

        assert_eq!(&chip.data()[0x2000..0x2000 + 600], &data[..]);
        assert_eq!(chip.data()[0x2000 + 600], 0xFF);
        assert_eq!(read_back(&mut chip, 0x2000, 600), data);
    }

    #[test]
    fn test_program_only_clears_bits() {
        let mut chip = DummyChip::new_default();
        {
            let mut bus = bus(&mut chip);
            bus.set_write_protect(false).unwrap();
            protocol::program_page_3b(&mut bus, 0x10, &[0xF0, 0xAA], None).unwrap();
            protocol::program_page_3b(&mut bus, 0x10, &[0x0F, 0xFF], None).unwrap();
        }
        assert_eq!(&chip.data()[0x10..0x12], &[0x00, 0xAA]);
    }

    #[test]
    fn test_preloaded_contents() {
        let mut chip = DummyChip::new_default();
        chip.data_mut()[0x100..0x104].copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(read_back(&mut chip, 0x100, 4), [1, 2, 3, 4]);
        assert!(!chip.transactions().is_empty());

        chip.clear_transactions();
        assert!(chip.transactions().is_empty());
    }

    #[test]
    fn test_write_protect_blocks_program() {
        let mut chip = DummyChip::new_default();
        {
            // The bus starts with WP# asserted
            let mut bus = bus(&mut chip);
            protocol::program_page_3b(&mut bus, 0, &[0x00; 4], None).unwrap();
        }
        assert_eq!(&chip.data()[..4], &[0xFF; 4]);
        assert_eq!(chip.transactions_with(opcodes::PP).count(), 1);
    }

    #[test]
    fn test_erase_range() {
        let mut chip = DummyChip::with_data(DummyConfig::default(), &[0u8; 16384]);
        let dev = Device::default().with_clock_khz(0);
        flash::erase_range(&dev, &mut bus(&mut chip), 10000).unwrap();

        let sectors: Vec<Option<u32>> = chip
            .transactions_with(opcodes::SE_20)
            .map(|t| t.address)
            .collect();
        assert_eq!(sectors, [Some(0), Some(4096), Some(8192)]);
        assert!(chip.data()[..12288].iter().all(|&b| b == 0xFF));
        assert!(chip.data()[12288..16384].iter().all(|&b| b == 0x00));
    }

    #[test]
    fn test_erase_past_top_leaves_sector_zero() {
        let mut chip = DummyChip::new_default();
        chip.data_mut()[..4096].fill(0x00);
        let dev = Device::default().with_clock_khz(0).with_range(0xFFF000, 0x2000);

        assert!(dev.validate().is_err());
        assert!(flash::erase_range(&dev, &mut bus(&mut chip), 0x2000).is_err());

        assert_eq!(chip.transactions_with(opcodes::SE_20).count(), 0);
        assert!(chip.data()[..4096].iter().all(|&b| b == 0x00));
    }

    #[test]
    fn test_chip_erase_then_wait() {
        let config = DummyConfig {
            size: 64 * 1024,
            busy_polls: 5,
            ..DummyConfig::default()
        };
        let mut chip = DummyChip::with_data(config, &[0x12u8; 64 * 1024]);
        let dev = Device::default().with_clock_khz(0);
        {
            let mut bus = bus(&mut chip);
            flash::erase_range(&dev, &mut bus, 0).unwrap();
            assert_eq!(flash::wait_ready(&dev, &mut bus).unwrap(), 6);
        }

        assert!(chip.data().iter().all(|&b| b == 0xFF));
        let sequence: Vec<u8> = chip.transactions().iter().map(|t| t.opcode).collect();
        assert_eq!(sequence[..2], [opcodes::WREN, opcodes::CE_C7]);
        assert_eq!(chip.transactions_with(opcodes::RDSR).count(), 6);
        assert!(!chip.status().is_busy());
    }

    #[test]
    fn test_busy_polls_per_page() {
        let config = DummyConfig {
            busy_polls: 3,
            ..DummyConfig::default()
        };
        let mut chip = DummyChip::new(config);
        let dev = Device::default().with_clock_khz(0).with_range(0, 256);
        let mut src = BufferedStream::new(Cursor::new(vec![0u8; 256]), StreamMode::Read, 256);
        flash::program_from_stream(&dev, &mut bus(&mut chip), &mut src).unwrap();

        assert_eq!(chip.transactions_with(opcodes::RDSR).count(), 4);
        assert!(chip.data()[..256].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_busy_poll_limit_times_out() {
        let config = DummyConfig {
            busy_polls: 50,
            ..DummyConfig::default()
        };
        let mut chip = DummyChip::new(config);
        let dev = Device::default()
            .with_clock_khz(0)
            .with_busy_poll_limit(Some(10));
        assert_eq!(
            flash::erase_range(&dev, &mut bus(&mut chip), 1),
            Err(gpioflash_core::Error::Timeout { polls: 10 })
        );
    }

    #[test]
    fn test_hold_low_freezes_chip() {
        let mut chip = DummyChip::new_default();
        let hold = chip.config().pins.hold.unwrap();
        chip.write(hold, Level::Low);

        // A bus without a HOLD line leaves it low and the chip ignores the clock
        let pins = Pinout {
            hold: None,
            ..chip.config().pins
        };
        let id = BitbangSpi::new(&mut chip, pins).read_id().unwrap();
        assert!(id.is_blank());
        assert!(chip.transactions().is_empty());

        let id = bus(&mut chip).read_id().unwrap();
        assert_eq!(chip.level(hold), Some(Level::High));
        assert_eq!(id.to_bytes(), [0xEF, 0x40, 0x18]);
    }

    #[test]
    fn test_clock_sets_delays() {
        let mut chip = DummyChip::new_default();
        let mut dev = Device::default().with_clock_khz(0);
        flash::identify(&mut dev, &mut bus(&mut chip)).unwrap();
        assert_eq!(chip.delays(), (0, 0));

        let mut chip = DummyChip::new_default();
        let mut dev = Device::default().with_clock_khz(100);
        flash::identify(&mut dev, &mut bus(&mut chip)).unwrap();
        let (calls, total) = chip.delays();
        assert!(calls > 0);
        // 5 us half period at 100 kHz
        assert_eq!(total % 5, 0);
    }
}
