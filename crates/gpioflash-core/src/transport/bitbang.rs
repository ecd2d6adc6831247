//! Bit-banged single-lane SPI
//!
//! The bus is split in two layers, the same way hardware-independent
//! bitbang code usually is:
//!
//! - [`BitbangLines`] - the minimal line operations (select, clock, data
//!   out, data in, and the three delays)
//! - [`single`] - byte shifting written once against that trait
//!
//! [`BitbangSpi`] implements the line operations on top of any [`Gpio`]
//! backend and exposes the result as a [`FlashBus`].
//!
//! ## Waveform
//!
//! Mode 0, MSB first. For every bit the data line is driven (or sampled),
//! the bit delay elapses, then the clock is pulsed high and low with a half
//! period after each edge. Data is therefore stable for at least one bit
//! delay before the rising edge the chip latches on. A byte delay follows
//! each byte and each select change.

use super::{FlashBus, Timing};
use crate::chip::ChipId;
use crate::device::BusInterface;
use crate::error::Result;
use crate::gpio::{Direction, Gpio, Level, Pinout};
use crate::protocol;

/// Trait for low-level bitbang SPI line operations
pub trait BitbangLines {
    /// Set chip select (CS is active low, so `active=true` means CS=0)
    fn set_cs(&mut self, active: bool);

    /// Set clock line value
    fn set_sck(&mut self, high: bool);

    /// Set MOSI line value
    fn set_mosi(&mut self, high: bool);

    /// Get MISO line value
    fn get_miso(&mut self) -> bool;

    /// Wait between data and the rising clock edge
    fn bit_delay(&mut self);

    /// Wait after each clock edge
    fn half_clock_delay(&mut self);

    /// Wait after each byte and each select change
    fn byte_delay(&mut self);
}

/// Bitbang helper functions for single-wire I/O
///
/// These are standalone functions that can be used by any `BitbangLines`
/// implementation.
pub mod single {
    use super::BitbangLines;

    /// One full clock cycle, ending low
    pub fn pulse_clock<M: BitbangLines + ?Sized>(master: &mut M) {
        master.set_sck(true);
        master.half_clock_delay();
        master.set_sck(false);
        master.half_clock_delay();
    }

    /// Write a byte in single-wire mode (MSB first)
    pub fn write_byte<M: BitbangLines + ?Sized>(master: &mut M, byte: u8) {
        for i in (0..8).rev() {
            master.set_mosi((byte >> i) & 1 != 0);
            master.bit_delay();
            pulse_clock(master);
        }
        master.byte_delay();
    }

    /// Read a byte in single-wire mode (MSB first)
    ///
    /// MISO is sampled once per bit, before the rising edge.
    pub fn read_byte<M: BitbangLines + ?Sized>(master: &mut M) -> u8 {
        let mut byte = 0u8;
        for _ in 0..8 {
            byte <<= 1;
            if master.get_miso() {
                byte |= 1;
            }
            master.bit_delay();
            pulse_clock(master);
        }
        master.byte_delay();
        byte
    }
}

/// Single-lane SPI bus bit-banged on GPIO lines
///
/// Construction puts the bus in its idle state: clock and data low, chip
/// deselected, write protect asserted. Program and erase sequences must
/// call [`FlashBus::set_write_protect`]`(false)` first.
pub struct BitbangSpi<G: Gpio> {
    gpio: G,
    pins: Pinout,
    timing: Timing,
}

impl<G: Gpio> BitbangSpi<G> {
    /// Take over the lines in `pins` and idle the bus
    pub fn new(gpio: G, pins: Pinout) -> Self {
        let mut bus = Self {
            gpio,
            pins,
            timing: Timing::UNTHROTTLED,
        };
        bus.init();
        bus
    }

    /// Put every line in its idle state
    pub fn init(&mut self) {
        let pins = self.pins;
        for pin in [pins.sck, pins.mosi, pins.cs, pins.wp] {
            self.gpio.set_direction(pin, Direction::Output);
        }
        self.gpio.set_direction(pins.miso, Direction::Input);

        self.gpio.write(pins.sck, Level::Low);
        self.gpio.write(pins.mosi, Level::Low);
        if let Some(hold) = pins.hold {
            self.gpio.set_direction(hold, Direction::Output);
            self.gpio.write(hold, Level::High);
        }

        self.set_cs(false);
        self.byte_delay();
        self.drive_write_protect(true);

        log::debug!(
            "bitbang_spi: idle (sck={}, mosi={}, miso={}, cs={}, wp={})",
            pins.sck,
            pins.mosi,
            pins.miso,
            pins.cs,
            pins.wp
        );
    }

    /// Current delays
    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// Replace the delays directly
    pub fn set_timing(&mut self, timing: Timing) {
        self.timing = timing;
    }

    /// Lines this bus drives
    pub fn pins(&self) -> &Pinout {
        &self.pins
    }

    /// Access the GPIO backend
    pub fn gpio(&self) -> &G {
        &self.gpio
    }

    /// Give the GPIO backend back
    pub fn into_inner(self) -> G {
        self.gpio
    }

    fn drive_write_protect(&mut self, protect: bool) {
        // WP# is active low
        let level = if protect { Level::Low } else { Level::High };
        self.gpio.write(self.pins.wp, level);
    }

    #[inline]
    fn wait(&mut self, us: u32) {
        if us != 0 {
            self.gpio.delay_us(us);
        }
    }
}

impl<G: Gpio> BitbangLines for BitbangSpi<G> {
    fn set_cs(&mut self, active: bool) {
        // CS is active low
        let level = if active { Level::Low } else { Level::High };
        self.gpio.write(self.pins.cs, level);
    }

    fn set_sck(&mut self, high: bool) {
        self.gpio.write(self.pins.sck, Level::from(high));
    }

    fn set_mosi(&mut self, high: bool) {
        self.gpio.write(self.pins.mosi, Level::from(high));
    }

    fn get_miso(&mut self) -> bool {
        self.gpio.read(self.pins.miso).into()
    }

    fn bit_delay(&mut self) {
        self.wait(self.timing.bit_us);
    }

    fn half_clock_delay(&mut self) {
        self.wait(self.timing.half_clock_us);
    }

    fn byte_delay(&mut self) {
        self.wait(self.timing.byte_us);
    }
}

impl<G: Gpio> FlashBus for BitbangSpi<G> {
    fn interface(&self) -> BusInterface {
        BusInterface::Spi
    }

    fn set_clock_khz(&mut self, khz: u32) -> Result<()> {
        self.timing = Timing::from_khz(khz);
        log::debug!(
            "bitbang_spi: {} kHz -> {} us half period",
            khz,
            self.timing.half_clock_us
        );
        Ok(())
    }

    fn set_write_protect(&mut self, protect: bool) -> Result<()> {
        self.drive_write_protect(protect);
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.set_cs(true);
        self.byte_delay();
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.set_cs(false);
        self.byte_delay();
        Ok(())
    }

    fn write_byte(&mut self, byte: u8) -> Result<()> {
        single::write_byte(self, byte);
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8> {
        Ok(single::read_byte(self))
    }

    fn read_id(&mut self) -> Result<ChipId> {
        protocol::read_jedec_id(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::Pin;
    use std::collections::VecDeque;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        Dir(Pin, Direction),
        Write(Pin, Level),
        Read(Pin),
        Delay(u32),
    }

    /// Records every pin operation and answers reads from a queue
    #[derive(Default)]
    struct TraceGpio {
        events: Vec<Event>,
        input: VecDeque<Level>,
    }

    impl Gpio for TraceGpio {
        fn set_direction(&mut self, pin: Pin, direction: Direction) {
            self.events.push(Event::Dir(pin, direction));
        }

        fn write(&mut self, pin: Pin, level: Level) {
            self.events.push(Event::Write(pin, level));
        }

        fn read(&mut self, pin: Pin) -> Level {
            self.events.push(Event::Read(pin));
            self.input.pop_front().unwrap_or(Level::Low)
        }

        fn delay_us(&mut self, us: u32) {
            self.events.push(Event::Delay(us));
        }
    }

    fn bus() -> BitbangSpi<TraceGpio> {
        let mut bus = BitbangSpi::new(TraceGpio::default(), Pinout::default());
        bus.gpio.events.clear();
        bus
    }

    fn last_level(events: &[Event], pin: Pin) -> Option<Level> {
        events.iter().rev().find_map(|e| match *e {
            Event::Write(p, level) if p == pin => Some(level),
            _ => None,
        })
    }

    #[test]
    fn test_init_idle_levels() {
        let pins = Pinout::default();
        let bus = BitbangSpi::new(TraceGpio::default(), pins);
        let events = &bus.gpio().events;

        assert!(events.contains(&Event::Dir(pins.miso, Direction::Input)));
        assert!(events.contains(&Event::Dir(pins.sck, Direction::Output)));
        assert_eq!(last_level(events, pins.sck), Some(Level::Low));
        assert_eq!(last_level(events, pins.mosi), Some(Level::Low));
        assert_eq!(last_level(events, pins.cs), Some(Level::High));
        assert_eq!(last_level(events, pins.wp), Some(Level::Low));
        assert_eq!(last_level(events, 17), Some(Level::High));
        // Unthrottled until a clock is configured
        assert!(!events.iter().any(|e| matches!(e, Event::Delay(_))));
    }

    #[test]
    fn test_write_byte_waveform() {
        let pins = Pinout::default();
        let mut bus = bus();
        bus.set_clock_khz(100).unwrap();
        bus.write_byte(0xA5).unwrap();

        let mut expected = Vec::new();
        for i in (0..8).rev() {
            let bit = (0xA5u8 >> i) & 1 != 0;
            expected.push(Event::Write(pins.mosi, Level::from(bit)));
            expected.push(Event::Delay(5));
            expected.push(Event::Write(pins.sck, Level::High));
            expected.push(Event::Delay(5));
            expected.push(Event::Write(pins.sck, Level::Low));
            expected.push(Event::Delay(5));
        }
        expected.push(Event::Delay(5));
        assert_eq!(bus.gpio.events, expected);
    }

    #[test]
    fn test_read_byte_msb_first() {
        let pins = Pinout::default();
        let mut bus = bus();
        // 0b1100_1010
        for bit in [1, 1, 0, 0, 1, 0, 1, 0] {
            bus.gpio.input.push_back(Level::from(bit == 1));
        }
        assert_eq!(bus.read_byte().unwrap(), 0xCA);

        // One sample per bit, each before its rising edge
        let events = &bus.gpio.events;
        assert_eq!(events.iter().filter(|e| **e == Event::Read(pins.miso)).count(), 8);
        assert_eq!(events[0], Event::Read(pins.miso));
        assert_eq!(events[1], Event::Write(pins.sck, Level::High));
        assert_eq!(events[2], Event::Write(pins.sck, Level::Low));
        // No delays when unthrottled
        assert!(!events.iter().any(|e| matches!(e, Event::Delay(_))));
    }

    #[test]
    fn test_select_brackets() {
        let pins = Pinout::default();
        let mut bus = bus();
        bus.set_clock_khz(250).unwrap();
        bus.start().unwrap();
        bus.stop().unwrap();
        assert_eq!(
            bus.gpio.events,
            [
                Event::Write(pins.cs, Level::Low),
                Event::Delay(2),
                Event::Write(pins.cs, Level::High),
                Event::Delay(2),
            ]
        );
    }

    #[test]
    fn test_write_protect() {
        let pins = Pinout::default();
        let mut bus = bus();
        bus.set_write_protect(false).unwrap();
        assert_eq!(last_level(&bus.gpio.events, pins.wp), Some(Level::High));
        bus.set_write_protect(true).unwrap();
        assert_eq!(last_level(&bus.gpio.events, pins.wp), Some(Level::Low));
    }

    #[test]
    fn test_read_id_transaction() {
        let pins = Pinout::default();
        let mut bus = bus();
        for byte in [0xEFu8, 0x40, 0x18] {
            for i in (0..8).rev() {
                bus.gpio.input.push_back(Level::from((byte >> i) & 1 != 0));
            }
        }
        let id = bus.read_id().unwrap();
        assert_eq!(id, ChipId::from_bytes([0xEF, 0x40, 0x18]));

        let events = &bus.gpio.events;
        assert_eq!(events.first(), Some(&Event::Write(pins.cs, Level::Low)));
        assert_eq!(events.last(), Some(&Event::Write(pins.cs, Level::High)));
    }

    #[test]
    fn test_timing_accessors() {
        let mut bus = bus();
        assert_eq!(bus.timing(), Timing::UNTHROTTLED);
        bus.set_clock_khz(100).unwrap();
        assert_eq!(bus.timing(), Timing::from_khz(100));

        bus.set_timing(Timing::UNTHROTTLED);
        bus.write_byte(0xFF).unwrap();
        assert_eq!(bus.pins(), &Pinout::default());

        let gpio = bus.into_inner();
        assert!(!gpio.events.iter().any(|e| matches!(e, Event::Delay(_))));
    }
}
