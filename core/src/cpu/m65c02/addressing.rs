//! Operand fetch, addressing modes and stack primitives.
//!
//! Fetches keep a "bus stream open" flag: consecutive fetches at non-aligned
//! offsets inside an open page earn the page-mode tick discount (when MAPCTL
//! enables it). Any non-fetch access closes the stream.

use super::{M65C02, STACK_ADDR, ZERO_PAGE_ADDR};
use crate::core::{Bus, BusMaster};

/// Zero-page pointer high bytes wrap into a 256-byte mirror at $20FF.
const ZP_POINTER_WRAP: u16 = 0x20FF;

impl M65C02 {
    #[inline]
    fn bus_read<B>(&mut self, bus: &mut B, address: u16) -> u8
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        #[cfg(feature = "disassembler")]
        self.check_memory_breakpoints(address, true);
        bus.read(BusMaster::Cpu, address)
    }

    #[inline]
    fn bus_write<B>(&mut self, bus: &mut B, address: u16, value: u8)
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        #[cfg(feature = "disassembler")]
        self.check_memory_breakpoints(address, false);
        bus.write(BusMaster::Cpu, address, value);
    }

    pub(crate) fn fetch_opcode<B>(&mut self, bus: &mut B) -> u8
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        let addr = self.pc;
        let page_mode = self.stream_open && (addr & 0x0F) != 0;

        let value = self.bus_read(bus, addr);
        self.pc = self.pc.wrapping_add(1);
        self.stream_open = true;

        if page_mode {
            self.page_mode_discounts += self.page_mode_discount;
        }

        value
    }

    pub(crate) fn fetch_operand8<B>(&mut self, bus: &mut B) -> u8
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        let addr = self.pc;
        let page_mode = self.stream_open && (addr & 0x0F) != 0;

        let value = self.bus_read(bus, addr);
        self.pc = self.pc.wrapping_add(1);

        if page_mode {
            self.page_mode_discounts += self.page_mode_discount;
        }

        value
    }

    pub(crate) fn fetch_operand16<B>(&mut self, bus: &mut B) -> u16
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        let addr = self.pc;

        let mut discounts = 0;
        if self.stream_open {
            if (addr & 0x0F) != 0 {
                discounts += 1;
            }
            if (addr.wrapping_add(1) & 0x0F) != 0 {
                discounts += 1;
            }
        }

        let l = self.bus_read(bus, addr);
        let h = self.bus_read(bus, addr.wrapping_add(1));
        self.pc = addr.wrapping_add(2);

        self.page_mode_discounts += discounts * self.page_mode_discount;

        u16::from_le_bytes([l, h])
    }

    /// Data read. Closes the fetch stream.
    pub(crate) fn mem_read<B>(&mut self, bus: &mut B, address: u16) -> u8
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        self.stream_open = false;
        self.bus_read(bus, address)
    }

    /// Data write. Closes the fetch stream.
    pub(crate) fn mem_write<B>(&mut self, bus: &mut B, address: u16, value: u8)
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        self.stream_open = false;
        self.bus_write(bus, address, value);
    }

    // ---- Addressing modes ----

    pub(crate) fn immediate<B>(&mut self, bus: &mut B) -> u8
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        self.fetch_operand8(bus)
    }

    pub(crate) fn zero_page<B>(&mut self, bus: &mut B) -> u16
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        ZERO_PAGE_ADDR | self.fetch_operand8(bus) as u16
    }

    pub(crate) fn zero_page_x<B>(&mut self, bus: &mut B) -> u16
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        let base = self.fetch_operand8(bus);
        ZERO_PAGE_ADDR | base.wrapping_add(self.x) as u16
    }

    pub(crate) fn zero_page_y<B>(&mut self, bus: &mut B) -> u16
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        let base = self.fetch_operand8(bus);
        ZERO_PAGE_ADDR | base.wrapping_add(self.y) as u16
    }

    pub(crate) fn zero_page_indirect<B>(&mut self, bus: &mut B) -> u16
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        let ptr = self.zero_page(bus);
        let l = self.mem_read(bus, ptr);
        let h = self.mem_read(bus, ptr.wrapping_add(1) & 0x00FF);
        u16::from_le_bytes([l, h])
    }

    pub(crate) fn zero_page_indexed_indirect<B>(&mut self, bus: &mut B) -> u16
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        let ptr = (self.zero_page(bus).wrapping_add(self.x as u16)) & ZP_POINTER_WRAP;
        let l = self.mem_read(bus, ptr);
        let h = self.mem_read(bus, ptr.wrapping_add(1) & ZP_POINTER_WRAP);
        u16::from_le_bytes([l, h])
    }

    pub(crate) fn zero_page_indirect_indexed<B>(&mut self, bus: &mut B) -> u16
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        let ptr = self.zero_page(bus);
        let l = self.mem_read(bus, ptr);
        let h = self.mem_read(bus, ptr.wrapping_add(1) & ZP_POINTER_WRAP);
        u16::from_le_bytes([l, h]).wrapping_add(self.y as u16)
    }

    pub(crate) fn relative<B>(&mut self, bus: &mut B) -> i8
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        self.fetch_operand8(bus) as i8
    }

    pub(crate) fn absolute<B>(&mut self, bus: &mut B) -> u16
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        self.fetch_operand16(bus)
    }

    pub(crate) fn absolute_x<B>(&mut self, bus: &mut B) -> u16
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        self.fetch_operand16(bus).wrapping_add(self.x as u16)
    }

    pub(crate) fn absolute_y<B>(&mut self, bus: &mut B) -> u16
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        self.fetch_operand16(bus).wrapping_add(self.y as u16)
    }

    pub(crate) fn absolute_indirect<B>(&mut self, bus: &mut B) -> u16
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        let ptr = self.fetch_operand16(bus);
        let l = self.mem_read(bus, ptr);
        let h = self.mem_read(bus, ptr.wrapping_add(1));
        u16::from_le_bytes([l, h])
    }

    pub(crate) fn absolute_indexed_indirect<B>(&mut self, bus: &mut B) -> u16
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        let ptr = self.fetch_operand16(bus).wrapping_add(self.x as u16);
        let l = self.mem_read(bus, ptr);
        let h = self.mem_read(bus, ptr.wrapping_add(1));
        u16::from_le_bytes([l, h])
    }

    // ---- Stack primitives ----

    pub(crate) fn stack_push8<B>(&mut self, bus: &mut B, value: u8)
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        self.mem_write(bus, STACK_ADDR | self.s as u16, value);
        self.s = self.s.wrapping_sub(1);
    }

    pub(crate) fn stack_push16<B>(&mut self, bus: &mut B, value: u16)
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        self.stack_push8(bus, (value >> 8) as u8);
        self.stack_push8(bus, (value & 0x00FF) as u8);
    }

    pub(crate) fn stack_pop8<B>(&mut self, bus: &mut B) -> u8
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        self.s = self.s.wrapping_add(1);
        self.mem_read(bus, STACK_ADDR | self.s as u16)
    }

    pub(crate) fn stack_pop16<B>(&mut self, bus: &mut B) -> u16
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        let l = self.stack_pop8(bus);
        let h = self.stack_pop8(bus);
        u16::from_le_bytes([l, h])
    }
}
