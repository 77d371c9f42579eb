use super::{FLAG_BREAK, FLAG_DECIMAL, FLAG_INTERRUPT, M65C02, VECTOR_IRQ};
use crate::core::Bus;

impl M65C02 {
    /// BRK pushes PC+1 and P with B set, then vectors through $FFFE.
    pub(crate) fn op_brk<B>(&mut self, bus: &mut B)
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        let pc = self.pc;
        self.stack_push16(bus, pc.wrapping_add(1));
        self.stack_push8(bus, self.p | FLAG_BREAK);
        self.clear_flag(FLAG_DECIMAL);
        self.set_flag(FLAG_INTERRUPT);

        let lo = self.mem_read(bus, VECTOR_IRQ);
        let hi = self.mem_read(bus, VECTOR_IRQ + 1);
        self.pc = u16::from_le_bytes([lo, hi]);

        #[cfg(feature = "disassembler")]
        {
            let dest = self.pc;
            self.push_call_stack(pc.wrapping_sub(1), dest, pc.wrapping_add(1));
        }
    }

    pub(crate) fn op_jsr<B>(&mut self, bus: &mut B)
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        let dest = self.absolute(bus);
        let pc = self.pc;
        self.stack_push16(bus, pc.wrapping_sub(1));
        self.pc = dest;

        #[cfg(feature = "disassembler")]
        self.push_call_stack(pc.wrapping_sub(3), dest, pc);
    }

    pub(crate) fn op_rts<B>(&mut self, bus: &mut B)
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        self.pc = self.stack_pop16(bus).wrapping_add(1);

        #[cfg(feature = "disassembler")]
        self.pop_call_stack();
    }

    pub(crate) fn op_rti<B>(&mut self, bus: &mut B)
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        self.p = self.stack_pop8(bus);
        self.pc = self.stack_pop16(bus);
        self.clear_flag(FLAG_BREAK);

        #[cfg(feature = "disassembler")]
        self.pop_call_stack();
    }
}
