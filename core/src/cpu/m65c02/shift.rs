use super::{FLAG_CARRY, M65C02};
use crate::core::Bus;

impl M65C02 {
    fn set_carry(&mut self, carry: bool) {
        if carry {
            self.set_flag(FLAG_CARRY);
        } else {
            self.clear_flag(FLAG_CARRY);
        }
    }

    pub(crate) fn asl_accumulator(&mut self) {
        let value = self.a;
        let result = value << 1;
        self.a = result;
        self.set_or_clear_zn_flags(result);
        self.set_carry(value & 0x80 != 0);
    }

    pub(crate) fn asl_memory<B>(&mut self, bus: &mut B, address: u16)
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        let value = self.mem_read(bus, address);
        let result = value << 1;
        self.mem_write(bus, address, result);
        self.set_or_clear_zn_flags(result);
        self.set_carry(value & 0x80 != 0);
    }

    pub(crate) fn lsr_accumulator(&mut self) {
        let value = self.a;
        let result = value >> 1;
        self.a = result;
        self.set_or_clear_zn_flags(result);
        self.set_carry(value & 0x01 != 0);
    }

    pub(crate) fn lsr_memory<B>(&mut self, bus: &mut B, address: u16)
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        let value = self.mem_read(bus, address);
        let result = value >> 1;
        self.mem_write(bus, address, result);
        self.set_or_clear_zn_flags(result);
        self.set_carry(value & 0x01 != 0);
    }

    pub(crate) fn rol_accumulator(&mut self) {
        let value = self.a;
        let mut result = value << 1;
        if self.is_set_flag(FLAG_CARRY) {
            result |= 0x01;
        }
        self.a = result;
        self.set_or_clear_zn_flags(result);
        self.set_carry(value & 0x80 != 0);
    }

    pub(crate) fn rol_memory<B>(&mut self, bus: &mut B, address: u16)
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        let value = self.mem_read(bus, address);
        let mut result = value << 1;
        if self.is_set_flag(FLAG_CARRY) {
            result |= 0x01;
        }
        self.mem_write(bus, address, result);
        self.set_or_clear_zn_flags(result);
        self.set_carry(value & 0x80 != 0);
    }

    pub(crate) fn ror_accumulator(&mut self) {
        let value = self.a;
        let mut result = value >> 1;
        if self.is_set_flag(FLAG_CARRY) {
            result |= 0x80;
        }
        self.a = result;
        self.set_or_clear_zn_flags(result);
        self.set_carry(value & 0x01 != 0);
    }

    pub(crate) fn ror_memory<B>(&mut self, bus: &mut B, address: u16)
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        let value = self.mem_read(bus, address);
        let mut result = value >> 1;
        if self.is_set_flag(FLAG_CARRY) {
            result |= 0x80;
        }
        self.mem_write(bus, address, result);
        self.set_or_clear_zn_flags(result);
        self.set_carry(value & 0x01 != 0);
    }

    /// RMB/SMB do not affect flags.
    pub(crate) fn rmb<B>(&mut self, bus: &mut B, bit: u8, address: u16)
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        let result = self.mem_read(bus, address) & !(1 << bit);
        self.mem_write(bus, address, result);
    }

    pub(crate) fn smb<B>(&mut self, bus: &mut B, bit: u8, address: u16)
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        let result = self.mem_read(bus, address) | (1 << bit);
        self.mem_write(bus, address, result);
    }
}
