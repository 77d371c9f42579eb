use super::{FLAG_CARRY, FLAG_DECIMAL, FLAG_NEGATIVE, FLAG_OVERFLOW, FLAG_ZERO, M65C02};
use crate::core::Bus;

impl M65C02 {
    /// ADC. Sets N, Z, C, V. Decimal mode charges one extra cycle.
    pub(crate) fn adc(&mut self, value: u8) {
        let a = self.a;
        let carry_in: u16 = if self.is_set_flag(FLAG_CARRY) { 1 } else { 0 };

        let result: u16;
        if self.is_set_flag(FLAG_DECIMAL) {
            self.cycles += 1;

            let mut r = (a & 0x0F) as u16 + (value & 0x0F) as u16 + carry_in;
            if r > 0x09 {
                r += 0x06;
            }
            r = (a & 0xF0) as u16
                + (value & 0xF0) as u16
                + (if r > 0x0F { 0x10 } else { 0 })
                + (r & 0x0F);

            if !(a ^ value) & ((r as u8) ^ a) & 0x80 != 0 {
                self.set_flag(FLAG_OVERFLOW);
            } else {
                self.clear_flag(FLAG_OVERFLOW);
            }

            if r > 0x9F {
                r += 0x60;
            }
            result = r;
        } else {
            let r = a as u16 + value as u16 + carry_in;

            if !(a ^ value) & (a ^ (r as u8)) & 0x80 != 0 {
                self.set_flag(FLAG_OVERFLOW);
            } else {
                self.clear_flag(FLAG_OVERFLOW);
            }
            result = r;
        }

        let final_result = (result & 0xFF) as u8;

        self.clear_flag(FLAG_ZERO | FLAG_CARRY | FLAG_NEGATIVE);
        self.set_zn_flags(final_result);
        if result > 0xFF {
            self.set_flag(FLAG_CARRY);
        }

        self.a = final_result;
    }

    /// SBC. Sets N, Z, C, V. Decimal mode charges one extra cycle.
    pub(crate) fn sbc(&mut self, value: u8) {
        let a = self.a;
        let carry_in: u16 = if self.is_set_flag(FLAG_CARRY) { 1 } else { 0 };

        let result: u16;
        if self.is_set_flag(FLAG_DECIMAL) {
            self.cycles += 1;

            let tmp = ((a & 0x0F) as u16)
                .wrapping_sub((value & 0x0F) as u16)
                .wrapping_sub(1 - carry_in);
            let mut r = (a as u16).wrapping_sub(value as u16).wrapping_sub(1 - carry_in);

            if r & 0x8000 != 0 {
                r = r.wrapping_sub(0x60);
            }
            if tmp & 0x8000 != 0 {
                r = r.wrapping_sub(0x06);
            }

            let bin_result = (a as u16) + ((!value) as u16) + carry_in;
            if (a as u16 ^ bin_result) & ((!value) as u16 ^ bin_result) & 0x80 != 0 {
                self.set_flag(FLAG_OVERFLOW);
            } else {
                self.clear_flag(FLAG_OVERFLOW);
            }

            if r <= a as u16 || (r & 0xFF0) == 0xFF0 {
                self.set_flag(FLAG_CARRY);
            } else {
                self.clear_flag(FLAG_CARRY);
            }

            result = r;
        } else {
            let value = !value;
            let r = a as u16 + value as u16 + carry_in;

            if !(a ^ value) & (a ^ (r as u8)) & 0x80 != 0 {
                self.set_flag(FLAG_OVERFLOW);
            } else {
                self.clear_flag(FLAG_OVERFLOW);
            }

            if r > 0xFF {
                self.set_flag(FLAG_CARRY);
            } else {
                self.clear_flag(FLAG_CARRY);
            }

            result = r;
        }

        let final_result = (result & 0xFF) as u8;
        self.set_or_clear_zn_flags(final_result);
        self.a = final_result;
    }

    /// CMP/CPX/CPY. Sets N, Z, C. Does not touch V or any register.
    pub(crate) fn compare(&mut self, register: u8, value: u8) {
        let result = register.wrapping_sub(value);
        self.set_or_clear_zn_flags(result);
        if register >= value {
            self.set_flag(FLAG_CARRY);
        } else {
            self.clear_flag(FLAG_CARRY);
        }
    }

    pub(crate) fn and(&mut self, value: u8) {
        let result = self.a & value;
        self.a = result;
        self.set_or_clear_zn_flags(result);
    }

    pub(crate) fn ora(&mut self, value: u8) {
        let result = self.a | value;
        self.a = result;
        self.set_or_clear_zn_flags(result);
    }

    pub(crate) fn eor(&mut self, value: u8) {
        let result = self.a ^ value;
        self.a = result;
        self.set_or_clear_zn_flags(result);
    }

    /// BIT: Z from A & M, N and V copied straight from the operand.
    pub(crate) fn bit<B>(&mut self, bus: &mut B, address: u16)
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        let value = self.mem_read(bus, address);
        let result = self.a & value;
        self.clear_flag(FLAG_ZERO | FLAG_OVERFLOW | FLAG_NEGATIVE);
        let mut flags = self.p;
        flags |= self.zn_flags_lut[result as usize] & FLAG_ZERO;
        flags |= value & (FLAG_OVERFLOW | FLAG_NEGATIVE);
        self.p = flags;
    }

    /// BIT #imm affects Z only.
    pub(crate) fn bit_immediate(&mut self, value: u8) {
        let result = self.a & value;
        self.clear_flag(FLAG_ZERO);
        self.p |= self.zn_flags_lut[result as usize] & FLAG_ZERO;
    }

    /// TSB: set the A bits in memory; Z from A & old value.
    pub(crate) fn tsb<B>(&mut self, bus: &mut B, address: u16)
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        let value = self.mem_read(bus, address);
        let result = self.a | value;
        self.mem_write(bus, address, result);
        self.clear_flag(FLAG_ZERO);
        self.p |= self.zn_flags_lut[(self.a & value) as usize] & FLAG_ZERO;
    }

    /// TRB: clear the A bits in memory; Z from A & old value.
    pub(crate) fn trb<B>(&mut self, bus: &mut B, address: u16)
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        let value = self.mem_read(bus, address);
        let result = !self.a & value;
        self.mem_write(bus, address, result);
        self.clear_flag(FLAG_ZERO);
        self.p |= self.zn_flags_lut[(self.a & value) as usize] & FLAG_ZERO;
    }

    pub(crate) fn inc_memory<B>(&mut self, bus: &mut B, address: u16)
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        let result = self.mem_read(bus, address).wrapping_add(1);
        self.mem_write(bus, address, result);
        self.set_or_clear_zn_flags(result);
    }

    pub(crate) fn dec_memory<B>(&mut self, bus: &mut B, address: u16)
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        let result = self.mem_read(bus, address).wrapping_sub(1);
        self.mem_write(bus, address, result);
        self.set_or_clear_zn_flags(result);
    }
}
