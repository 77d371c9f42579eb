//! Cartridge bank shift-register address generator.
//!
//! The cart has no address bus of its own. An 8-bit page register is shifted
//! in serially (data on the console's I/O data bit, clocked by the address
//! strobe), and an in-cart ripple counter supplies the offset inside the
//! page:
//!
//! - a rising strobe edge shifts the current data bit into the page register
//!   and clears the offset counter;
//! - while the strobe is low, every cart read post-increments the offset,
//!   wrapping inside the page;
//! - the byte delivered is `bank[(page << shift) | offset]`, where `shift`
//!   is the page-size bit width from the cartridge header.

use std::io;

use crate::core::state::{StateReader, StateWriter};

const BANK_COUNT: usize = 2;

pub struct Cart {
    banks: [Vec<u8>; BANK_COUNT],
    page_size: [u32; BANK_COUNT],
    address_shift: [u32; BANK_COUNT],
    offset_mask: [u32; BANK_COUNT],

    shifter: u8,
    strobe: bool,
    addr_bit: bool,
    page_offset: u32,
}

impl Cart {
    pub fn new() -> Self {
        Self {
            banks: [Vec::new(), Vec::new()],
            page_size: [0; BANK_COUNT],
            address_shift: [0; BANK_COUNT],
            offset_mask: [0; BANK_COUNT],
            shifter: 0,
            strobe: false,
            addr_bit: false,
            page_offset: 0,
        }
    }

    /// Install bank images and their header-declared page sizes.
    pub fn load_banks(&mut self, bank0: Vec<u8>, page_size0: u32, bank1: Vec<u8>, page_size1: u32) {
        self.banks = [bank0, bank1];
        self.page_size = [page_size0, page_size1];

        for bank in 0..BANK_COUNT {
            let size = self.page_size[bank];
            if size == 0 {
                self.address_shift[bank] = 0;
                self.offset_mask[bank] = 0;
            } else {
                let shift = 32 - (size - 1).leading_zeros();
                self.address_shift[bank] = shift;
                self.offset_mask[bank] = (1 << shift) - 1;
            }
        }

        self.reset();
    }

    pub fn reset(&mut self) {
        self.shifter = 0;
        self.strobe = false;
        self.addr_bit = false;
        self.page_offset = 0;
    }

    pub fn bank_size(&self, bank: usize) -> usize {
        self.banks[bank].len()
    }

    pub fn page_size(&self, bank: usize) -> u32 {
        self.page_size[bank]
    }

    pub fn page(&self) -> u8 {
        self.shifter
    }

    pub fn page_offset(&self) -> u32 {
        self.page_offset
    }

    /// Address strobe, driven by SYSCTL1 bit 0.
    pub fn set_strobe(&mut self, strobe: bool) {
        if strobe && !self.strobe {
            self.shifter = (self.shifter << 1) | (self.addr_bit as u8);
            self.page_offset = 0;
        }
        self.strobe = strobe;
    }

    /// Serial address data, driven by IODAT bit 1.
    pub fn set_addr_bit(&mut self, bit: bool) {
        self.addr_bit = bit;
    }

    pub fn read_bank0(&mut self) -> u8 {
        self.read_bank(0)
    }

    pub fn read_bank1(&mut self) -> u8 {
        self.read_bank(1)
    }

    /// Sample the current cart byte without advancing the offset counter.
    pub fn peek_bank0(&self) -> u8 {
        self.peek_bank(0)
    }

    pub fn peek_bank1(&self) -> u8 {
        self.peek_bank(1)
    }

    /// Writes would require bank RAM carts, which no released cartridge has.
    pub fn write_bank0(&mut self, value: u8) {
        log::debug!("ignored write {value:02X} to cart bank 0");
    }

    pub fn write_bank1(&mut self, value: u8) {
        log::debug!("ignored write {value:02X} to cart bank 1");
    }

    fn read_bank(&mut self, bank: usize) -> u8 {
        let value = self.peek_bank(bank);
        if !self.strobe {
            self.page_offset = (self.page_offset + 1) & self.offset_mask[bank];
        }
        value
    }

    fn peek_bank(&self, bank: usize) -> u8 {
        let data = &self.banks[bank];
        if data.is_empty() {
            return 0xFF;
        }
        let address = ((self.shifter as u32) << self.address_shift[bank])
            | (self.page_offset & self.offset_mask[bank]);
        data.get(address as usize).copied().unwrap_or(0xFF)
    }

    pub fn save_state(&self, w: &mut StateWriter<'_>) -> io::Result<()> {
        w.u8(self.shifter)?;
        w.bool(self.strobe)?;
        w.bool(self.addr_bit)?;
        w.u32(self.page_offset)?;
        Ok(())
    }

    pub fn load_state(&mut self, r: &mut StateReader<'_>) -> io::Result<()> {
        self.shifter = r.u8()?;
        self.strobe = r.bool()?;
        self.addr_bit = r.bool()?;
        self.page_offset = r.u32()?;
        Ok(())
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}
