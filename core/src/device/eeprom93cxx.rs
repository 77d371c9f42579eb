//! 93Cxx serial EEPROM (93C46 .. 93C86).
//!
//! Some cartridges carry one of these for high scores and settings. The
//! console drives it entirely through Mikey's parallel I/O port:
//! CS on IODAT bit 2, CLK on IODAT bit 1, DI on IODAT bit 0; DO is read back
//! through the AUDIN register.
//!
//! # Instruction set (start bit, 2-bit opcode, address)
//!
//! | Opcode | Address top bits | Instruction                         |
//! |--------|------------------|-------------------------------------|
//! | 10     | aaaa…            | READ  (continuous, auto-increment)  |
//! | 01     | aaaa…            | WRITE (needs EWEN)                  |
//! | 11     | aaaa…            | ERASE word to all ones (needs EWEN) |
//! | 00     | 11…              | EWEN  (write enable)                |
//! | 00     | 00…              | EWDS  (write disable)               |
//! | 00     | 10…              | ERAL  (erase all, needs EWEN)       |
//! | 00     | 01…              | WRAL  (write all, needs EWEN)       |
//!
//! Word width is 16 bits, or 8 when the cartridge header requests 8-bit
//! organization (one extra address bit).

use std::io;

use crate::core::state::{StateReader, StateWriter};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EepromKind {
    None,
    C46,
    C56,
    C66,
    C76,
    C86,
}

impl EepromKind {
    /// Decode the low nibble of the cartridge header's EEPROM descriptor.
    pub fn from_descriptor(value: u8) -> Self {
        match value & 0x0F {
            1 => Self::C46,
            2 => Self::C56,
            3 => Self::C66,
            4 => Self::C76,
            5 => Self::C86,
            _ => Self::None,
        }
    }

    /// (16-bit words, address bits) for 16-bit organization.
    fn geometry(self) -> (usize, u32) {
        match self {
            Self::None => (0, 0),
            Self::C46 => (64, 6),
            Self::C56 => (128, 8),
            Self::C66 => (256, 8),
            Self::C76 => (512, 10),
            Self::C86 => (1024, 10),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Standby,
    /// Waiting for the start bit (DI high with CS asserted).
    Start,
    Opcode,
    Address,
    ReadData,
    WriteData,
    WriteAllData,
}

pub struct Eeprom93cxx {
    kind: EepromKind,
    eight_bit: bool,
    data: Vec<u8>,

    word_count: usize,
    address_bits: u32,
    data_bits: u32,

    write_enabled: bool,
    dirty: bool,

    cs: bool,
    clk: bool,

    phase: Phase,
    shift: u32,
    bit_count: u32,
    opcode: u8,
    address: usize,
    output: u32,
    output_bits: u32,
    do_bit: bool,
}

impl Eeprom93cxx {
    pub fn new(kind: EepromKind, eight_bit: bool) -> Self {
        let (words16, addr_bits16) = kind.geometry();
        let (word_count, address_bits, data_bits) = if eight_bit {
            (words16 * 2, addr_bits16 + 1, 8)
        } else {
            (words16, addr_bits16, 16)
        };

        Self {
            kind,
            eight_bit,
            data: vec![0xFF; words16 * 2],
            word_count,
            address_bits,
            data_bits,
            write_enabled: false,
            dirty: false,
            cs: false,
            clk: false,
            phase: Phase::Standby,
            shift: 0,
            bit_count: 0,
            opcode: 0,
            address: 0,
            output: 0,
            output_bits: 0,
            do_bit: true,
        }
    }

    pub fn none() -> Self {
        Self::new(EepromKind::None, false)
    }

    pub fn is_available(&self) -> bool {
        self.kind != EepromKind::None
    }

    pub fn kind(&self) -> EepromKind {
        self.kind
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Raw contents, for host-side persistence.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn load_data(&mut self, src: &[u8]) {
        let len = src.len().min(self.data.len());
        self.data[..len].copy_from_slice(&src[..len]);
        self.dirty = false;
    }

    pub fn reset(&mut self) {
        self.write_enabled = false;
        self.cs = false;
        self.clk = false;
        self.phase = Phase::Standby;
        self.shift = 0;
        self.bit_count = 0;
        self.opcode = 0;
        self.address = 0;
        self.output = 0;
        self.output_bits = 0;
        self.do_bit = true;
    }

    /// Serial data out, as seen on the AUDIN pin.
    pub fn output_bit(&self) -> bool {
        self.do_bit
    }

    /// Present the current I/O port pin levels to the chip.
    pub fn set_lines(&mut self, cs: bool, clk: bool, di: bool) {
        if !self.is_available() {
            return;
        }

        if !cs {
            // Deselect aborts any partial instruction; DO idles high (ready).
            self.cs = false;
            self.clk = clk;
            self.phase = Phase::Standby;
            self.do_bit = true;
            return;
        }

        if !self.cs {
            self.cs = true;
            self.phase = Phase::Start;
        }

        let rising = clk && !self.clk;
        self.clk = clk;
        if rising {
            self.clock_in(di);
        }
    }

    fn clock_in(&mut self, di: bool) {
        match self.phase {
            Phase::Standby => {}
            Phase::Start => {
                if di {
                    self.phase = Phase::Opcode;
                    self.shift = 0;
                    self.bit_count = 0;
                }
            }
            Phase::Opcode => {
                self.shift = (self.shift << 1) | di as u32;
                self.bit_count += 1;
                if self.bit_count == 2 {
                    self.opcode = self.shift as u8;
                    self.shift = 0;
                    self.bit_count = 0;
                    self.phase = Phase::Address;
                }
            }
            Phase::Address => {
                self.shift = (self.shift << 1) | di as u32;
                self.bit_count += 1;
                if self.bit_count == self.address_bits {
                    self.address = (self.shift as usize) % self.word_count.max(1);
                    let top = (self.shift >> (self.address_bits - 2)) & 0x03;
                    self.shift = 0;
                    self.bit_count = 0;
                    self.begin_instruction(top);
                }
            }
            Phase::ReadData => {
                if self.output_bits == 0 {
                    // Continuous read: move on to the next word.
                    self.address = (self.address + 1) % self.word_count.max(1);
                    self.load_output_word();
                }
                self.output_bits -= 1;
                self.do_bit = (self.output >> self.output_bits) & 1 != 0;
            }
            Phase::WriteData => {
                self.shift = (self.shift << 1) | di as u32;
                self.bit_count += 1;
                if self.bit_count == self.data_bits {
                    if self.write_enabled {
                        self.store_word(self.address, self.shift);
                    } else {
                        log::debug!("EEPROM write while disabled");
                    }
                    self.finish();
                }
            }
            Phase::WriteAllData => {
                self.shift = (self.shift << 1) | di as u32;
                self.bit_count += 1;
                if self.bit_count == self.data_bits {
                    if self.write_enabled {
                        for word in 0..self.word_count {
                            self.store_word(word, self.shift);
                        }
                    }
                    self.finish();
                }
            }
        }
    }

    fn begin_instruction(&mut self, address_top: u32) {
        match self.opcode {
            0b10 => {
                // READ: a dummy zero precedes the data stream.
                self.load_output_word();
                self.do_bit = false;
                self.phase = Phase::ReadData;
            }
            0b01 => self.phase = Phase::WriteData,
            0b11 => {
                if self.write_enabled {
                    self.store_word(self.address, u32::MAX);
                }
                self.finish();
            }
            _ => match address_top {
                0b11 => {
                    self.write_enabled = true;
                    self.finish();
                }
                0b00 => {
                    self.write_enabled = false;
                    self.finish();
                }
                0b10 => {
                    if self.write_enabled {
                        for word in 0..self.word_count {
                            self.store_word(word, u32::MAX);
                        }
                    }
                    self.finish();
                }
                _ => self.phase = Phase::WriteAllData,
            },
        }
    }

    fn finish(&mut self) {
        self.phase = Phase::Start;
        self.shift = 0;
        self.bit_count = 0;
        // Ready/busy status: writes complete instantly here, so report ready.
        self.do_bit = true;
    }

    fn load_output_word(&mut self) {
        self.output = self.word(self.address);
        self.output_bits = self.data_bits;
    }

    fn word(&self, index: usize) -> u32 {
        if self.eight_bit {
            self.data[index] as u32
        } else {
            u16::from_le_bytes([self.data[index * 2], self.data[index * 2 + 1]]) as u32
        }
    }

    fn store_word(&mut self, index: usize, value: u32) {
        if self.eight_bit {
            self.data[index] = value as u8;
        } else {
            let [low, high] = (value as u16).to_le_bytes();
            self.data[index * 2] = low;
            self.data[index * 2 + 1] = high;
        }
        self.dirty = true;
    }

    pub fn save_state(&self, w: &mut StateWriter<'_>) -> io::Result<()> {
        w.bytes(&self.data)?;
        w.bool(self.write_enabled)?;
        w.bool(self.dirty)?;
        w.bool(self.cs)?;
        w.bool(self.clk)?;
        w.u8(self.phase_id())?;
        w.u32(self.shift)?;
        w.u32(self.bit_count)?;
        w.u8(self.opcode)?;
        w.u32(self.address as u32)?;
        w.u32(self.output)?;
        w.u32(self.output_bits)?;
        w.bool(self.do_bit)?;
        Ok(())
    }

    pub fn load_state(&mut self, r: &mut StateReader<'_>) -> io::Result<()> {
        let mut data = std::mem::take(&mut self.data);
        r.bytes(&mut data)?;
        self.data = data;
        self.write_enabled = r.bool()?;
        self.dirty = r.bool()?;
        self.cs = r.bool()?;
        self.clk = r.bool()?;
        self.phase = Self::phase_from_id(r.u8()?);
        self.shift = r.u32()?;
        self.bit_count = r.u32()?;
        self.opcode = r.u8()?;
        self.address = r.u32()? as usize;
        self.output = r.u32()?;
        self.output_bits = r.u32()?;
        self.do_bit = r.bool()?;
        Ok(())
    }

    fn phase_id(&self) -> u8 {
        match self.phase {
            Phase::Standby => 0,
            Phase::Start => 1,
            Phase::Opcode => 2,
            Phase::Address => 3,
            Phase::ReadData => 4,
            Phase::WriteData => 5,
            Phase::WriteAllData => 6,
        }
    }

    fn phase_from_id(id: u8) -> Phase {
        match id {
            1 => Phase::Start,
            2 => Phase::Opcode,
            3 => Phase::Address,
            4 => Phase::ReadData,
            5 => Phase::WriteData,
            6 => Phase::WriteAllData,
            _ => Phase::Standby,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock_bit(e: &mut Eeprom93cxx, bit: bool) {
        e.set_lines(true, false, bit);
        e.set_lines(true, true, bit);
    }

    fn send_bits(e: &mut Eeprom93cxx, value: u32, count: u32) {
        for i in (0..count).rev() {
            clock_bit(e, value & (1 << i) != 0);
        }
    }

    fn start(e: &mut Eeprom93cxx) {
        e.set_lines(false, false, false);
        e.set_lines(true, false, false);
        clock_bit(e, true); // start bit
    }

    fn read_word(e: &mut Eeprom93cxx, address: u32) -> u16 {
        start(e);
        send_bits(e, 0b10, 2);
        send_bits(e, address, 6);
        let mut value = 0u16;
        // First clocked-out bit is the dummy zero already present on DO.
        assert!(!e.output_bit());
        for _ in 0..16 {
            clock_bit(e, false);
            value = (value << 1) | e.output_bit() as u16;
        }
        value
    }

    fn write_word(e: &mut Eeprom93cxx, address: u32, value: u16) {
        start(e);
        send_bits(e, 0b01, 2);
        send_bits(e, address, 6);
        send_bits(e, value as u32, 16);
    }

    fn enable_writes(e: &mut Eeprom93cxx) {
        start(e);
        send_bits(e, 0b00, 2);
        send_bits(e, 0b11 << 4, 6); // EWEN: address top bits 11
    }

    #[test]
    fn fresh_chip_reads_all_ones() {
        let mut e = Eeprom93cxx::new(EepromKind::C46, false);
        assert_eq!(read_word(&mut e, 0), 0xFFFF);
    }

    #[test]
    fn write_requires_ewen() {
        let mut e = Eeprom93cxx::new(EepromKind::C46, false);
        write_word(&mut e, 3, 0x1234);
        assert_eq!(read_word(&mut e, 3), 0xFFFF);
        assert!(!e.is_dirty());

        enable_writes(&mut e);
        write_word(&mut e, 3, 0x1234);
        assert_eq!(read_word(&mut e, 3), 0x1234);
        assert!(e.is_dirty());
    }

    #[test]
    fn erase_sets_word_to_ones() {
        let mut e = Eeprom93cxx::new(EepromKind::C46, false);
        enable_writes(&mut e);
        write_word(&mut e, 7, 0x0000);
        assert_eq!(read_word(&mut e, 7), 0x0000);

        start(&mut e);
        send_bits(&mut e, 0b11, 2);
        send_bits(&mut e, 7, 6);
        assert_eq!(read_word(&mut e, 7), 0xFFFF);
    }

    #[test]
    fn continuous_read_auto_increments() {
        let mut e = Eeprom93cxx::new(EepromKind::C46, false);
        enable_writes(&mut e);
        write_word(&mut e, 0, 0xAAAA);
        write_word(&mut e, 1, 0x5555);

        start(&mut e);
        send_bits(&mut e, 0b10, 2);
        send_bits(&mut e, 0, 6);
        let mut first = 0u16;
        for _ in 0..16 {
            clock_bit(&mut e, false);
            first = (first << 1) | e.output_bit() as u16;
        }
        let mut second = 0u16;
        for _ in 0..16 {
            clock_bit(&mut e, false);
            second = (second << 1) | e.output_bit() as u16;
        }
        assert_eq!(first, 0xAAAA);
        assert_eq!(second, 0x5555);
    }

    #[test]
    fn missing_chip_ignores_traffic() {
        let mut e = Eeprom93cxx::none();
        e.set_lines(true, true, true);
        assert!(!e.is_available());
        assert!(e.output_bit());
    }

    #[test]
    fn eight_bit_descriptor() {
        let e = Eeprom93cxx::new(EepromKind::from_descriptor(0x81), true);
        assert!(e.is_available());
        assert_eq!(e.size(), 128);
    }
}
