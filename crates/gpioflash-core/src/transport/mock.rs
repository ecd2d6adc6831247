//! Byte-level recording bus for engine tests

use std::collections::VecDeque;

use super::FlashBus;
use crate::chip::ChipId;
use crate::device::BusInterface;
use crate::error::Result;
use crate::protocol;
use crate::spi::opcodes;

/// One select/deselect bracket as seen on the wire
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Transaction {
    pub written: Vec<u8>,
    pub read: Vec<u8>,
}

impl Transaction {
    pub fn opcode(&self) -> Option<u8> {
        self.written.first().copied()
    }

    /// Address following a 3-byte-address opcode
    pub fn address(&self) -> u32 {
        let a = &self.written[1..4];
        (a[0] as u32) << 16 | (a[1] as u32) << 8 | a[2] as u32
    }

    /// Data bytes after opcode and address
    pub fn payload(&self) -> &[u8] {
        &self.written[4..]
    }
}

/// Records every transaction and answers reads like a 25-series chip
///
/// - RDSR reports busy for `busy_polls` reads after each program or erase
/// - READ returns `data_at(address + n)`
/// - anything else returns bytes from `responses`, then 0xFF
#[derive(Default)]
pub(crate) struct MockBus {
    pub transactions: Vec<Transaction>,
    pub responses: VecDeque<u8>,
    pub busy_polls: u32,
    pub clock_khz: Option<u32>,
    pub write_protect: Option<bool>,
    current: Option<Transaction>,
    busy_remaining: u32,
    read_pos: u32,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Byte the mock flash holds at `addr`
    pub fn data_at(addr: u32) -> u8 {
        (addr ^ (addr >> 8) ^ 0x5A) as u8
    }

    pub fn with_opcode(&self, opcode: u8) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|t| t.opcode() == Some(opcode))
            .collect()
    }

    pub fn opcodes(&self) -> Vec<u8> {
        self.transactions.iter().filter_map(|t| t.opcode()).collect()
    }
}

impl FlashBus for MockBus {
    fn interface(&self) -> BusInterface {
        BusInterface::Spi
    }

    fn set_clock_khz(&mut self, khz: u32) -> Result<()> {
        self.clock_khz = Some(khz);
        Ok(())
    }

    fn set_write_protect(&mut self, protect: bool) -> Result<()> {
        self.write_protect = Some(protect);
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        assert!(self.current.is_none(), "select asserted twice");
        self.current = Some(Transaction::default());
        self.read_pos = 0;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let t = self.current.take().expect("deselect without select");
        if matches!(
            t.opcode(),
            Some(opcodes::PP) | Some(opcodes::SE_20) | Some(opcodes::CE_C7)
        ) {
            self.busy_remaining = self.busy_polls;
        }
        self.transactions.push(t);
        Ok(())
    }

    fn write_byte(&mut self, byte: u8) -> Result<()> {
        let t = self.current.as_mut().expect("write outside transaction");
        t.written.push(byte);
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8> {
        let t = self.current.as_mut().expect("read outside transaction");
        let byte = match t.opcode() {
            Some(opcodes::RDSR) => {
                if self.busy_remaining > 0 {
                    self.busy_remaining -= 1;
                    0x03
                } else {
                    0x00
                }
            }
            Some(opcodes::READ) => {
                let byte = Self::data_at(t.address() + self.read_pos);
                self.read_pos += 1;
                byte
            }
            _ => self.responses.pop_front().unwrap_or(0xFF),
        };
        t.read.push(byte);
        Ok(byte)
    }

    fn read_id(&mut self) -> Result<ChipId> {
        protocol::read_jedec_id(self)
    }
}
