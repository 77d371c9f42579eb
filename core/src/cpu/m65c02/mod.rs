mod addressing;
mod alu;
mod branch;
#[cfg(feature = "disassembler")]
pub mod debug;
mod load_store;
mod serialize;
mod shift;
mod stack;
mod timing;

use crate::core::cycles::CYCLES_TICK_FACTOR;
use crate::core::{Bus, BusMaster};
use crate::cpu::state::{CpuStateTrait, M65C02State};

pub use timing::{OPCODE_SIZES, OPCODE_TICKS};

pub const FLAG_CARRY: u8 = 0x01;
pub const FLAG_ZERO: u8 = 0x02;
pub const FLAG_INTERRUPT: u8 = 0x04;
pub const FLAG_DECIMAL: u8 = 0x08;
pub const FLAG_BREAK: u8 = 0x10;
pub const FLAG_UNUSED: u8 = 0x20;
pub const FLAG_OVERFLOW: u8 = 0x40;
pub const FLAG_NEGATIVE: u8 = 0x80;

pub(crate) const STACK_ADDR: u16 = 0x0100;
pub(crate) const ZERO_PAGE_ADDR: u16 = 0x0000;

const VECTOR_NMI: u16 = 0xFFFA;
const VECTOR_RESET: u16 = 0xFFFC;
const VECTOR_IRQ: u16 = 0xFFFE;

/// Ticks consumed per `step()` while the CPU is asleep.
const HALT_IDLE_TICKS: u32 = 8;

/// 65C02-family interpreter.
///
/// One `step()` call executes one whole instruction against the bus and
/// returns the master-clock ticks it consumed: the fixed base cycle count
/// for the opcode (plus conditional costs such as a taken branch, decimal
/// ADC/SBC or IRQ entry) scaled by the tick factor, minus any page-mode
/// fetch discounts earned on sequential same-page fetches.
pub struct M65C02 {
    // Registers
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub s: u8,
    pub p: u8,
    pub pc: u16,

    // Per-instruction bookkeeping
    pub(crate) cycles: u32,
    pub(crate) onebyte_nop: bool,
    page_mode_discounts: u32,
    page_mode_discount: u32,
    stream_open: bool,

    // Interrupt latch
    irq_asserted: bool,
    irq_pending: bool,
    nmi_pending: bool,
    nmi_previous: bool,

    halted: bool,

    total_ticks: u64,
    last_ticks: u32,

    pub(crate) zn_flags_lut: [u8; 256],

    #[cfg(feature = "disassembler")]
    pub(crate) debug: debug::DebugState,
}

impl Default for M65C02 {
    fn default() -> Self {
        Self::new()
    }
}

impl M65C02 {
    pub fn new() -> Self {
        let mut zn_flags_lut = [0u8; 256];
        for (value, entry) in zn_flags_lut.iter_mut().enumerate() {
            if value == 0 {
                *entry |= FLAG_ZERO;
            }
            if value & 0x80 != 0 {
                *entry |= FLAG_NEGATIVE;
            }
        }

        Self {
            a: 0,
            x: 0,
            y: 0,
            s: 0,
            p: 0,
            pc: 0,
            cycles: 0,
            onebyte_nop: false,
            page_mode_discounts: 0,
            page_mode_discount: 0,
            stream_open: false,
            irq_asserted: false,
            irq_pending: false,
            nmi_pending: false,
            nmi_previous: false,
            halted: false,
            total_ticks: 0,
            last_ticks: 0,
            zn_flags_lut,
            #[cfg(feature = "disassembler")]
            debug: debug::DebugState::new(),
        }
    }

    /// Reset vector fetch. Registers come up in a fixed state so that a
    /// reset followed by a run is deterministic.
    pub fn reset<B>(&mut self, bus: &mut B)
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        let lo = bus.read(BusMaster::Cpu, VECTOR_RESET);
        let hi = bus.read(BusMaster::Cpu, VECTOR_RESET + 1);
        self.pc = u16::from_le_bytes([lo, hi]);

        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.s = 0xFF;
        self.p = FLAG_UNUSED | FLAG_INTERRUPT | FLAG_BREAK;

        self.cycles = 0;
        self.onebyte_nop = false;
        self.page_mode_discounts = 0;
        self.stream_open = false;
        self.irq_asserted = false;
        self.irq_pending = false;
        self.nmi_pending = false;
        self.nmi_previous = false;
        self.halted = false;
        self.total_ticks = 0;
        self.last_ticks = 0;

        #[cfg(feature = "disassembler")]
        {
            self.debug.reset();
            self.debug.next_irq = 1;
            self.disassemble_next_opcode(bus);
        }
    }

    /// Execute one instruction (or one idle halt slot) and return the
    /// master-clock ticks consumed.
    pub fn step<B>(&mut self, bus: &mut B) -> u32
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        #[cfg(feature = "disassembler")]
        {
            self.debug.cpu_breakpoint_hit = false;
            self.debug.memory_breakpoint_hit = false;
        }

        self.cycles = 0;
        self.page_mode_discounts = 0;
        self.onebyte_nop = false;

        let ints = bus.check_interrupts(BusMaster::Cpu);
        self.irq_asserted = ints.irq;
        if ints.nmi && !self.nmi_previous {
            self.nmi_pending = true;
        }
        self.nmi_previous = ints.nmi;

        if self.halted {
            if self.nmi_pending {
                self.halted = false;
                self.nmi_pending = false;
                self.handle_nmi(bus);
            } else if self.irq_asserted {
                self.halted = false;
                self.check_irqs();
                if self.irq_pending && !self.skip_irq() {
                    self.handle_irq(bus);
                }
            } else {
                self.last_ticks = HALT_IDLE_TICKS;
                self.total_ticks += HALT_IDLE_TICKS as u64;
                return HALT_IDLE_TICKS;
            }
        } else if self.nmi_pending {
            self.nmi_pending = false;
            self.handle_nmi(bus);
            #[cfg(feature = "disassembler")]
            self.disassemble_next_opcode(bus);
        } else {
            let opcode = self.fetch_opcode(bus);
            self.check_irqs();
            self.execute(opcode, bus);

            if self.irq_pending && !self.onebyte_nop && !self.skip_irq() {
                self.handle_irq(bus);
            }

            #[cfg(feature = "disassembler")]
            self.disassemble_next_opcode(bus);

            self.cycles += OPCODE_TICKS[opcode as usize] as u32;
        }

        let ticks = (self.cycles * CYCLES_TICK_FACTOR).saturating_sub(self.page_mode_discounts);
        self.last_ticks = ticks;
        self.total_ticks += ticks as u64;
        ticks
    }

    /// Latch the maskable IRQ decision for this instruction boundary.
    /// The decision is taken before the opcode runs and serviced after it,
    /// so an instruction that clears the source is still interrupted once.
    fn check_irqs(&mut self) {
        self.irq_pending = if self.is_set_flag(FLAG_INTERRUPT) {
            false
        } else {
            self.irq_asserted
        };
    }

    fn handle_irq<B>(&mut self, bus: &mut B)
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        let pc = self.pc;
        self.stack_push16(bus, pc);
        self.stack_push8(bus, self.p & !FLAG_BREAK);
        self.set_flag(FLAG_INTERRUPT);
        self.clear_flag(FLAG_DECIMAL);

        let lo = self.mem_read(bus, VECTOR_IRQ);
        let hi = self.mem_read(bus, VECTOR_IRQ + 1);
        self.pc = u16::from_le_bytes([lo, hi]);

        self.cycles += 7;

        #[cfg(feature = "disassembler")]
        {
            self.debug.next_irq = 3;
            let dest = self.pc;
            self.push_call_stack(pc, dest, pc);
        }
    }

    fn handle_nmi<B>(&mut self, bus: &mut B)
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        let pc = self.pc;
        self.stack_push16(bus, pc);
        self.stack_push8(bus, self.p & !FLAG_BREAK);
        self.set_flag(FLAG_INTERRUPT);
        self.clear_flag(FLAG_DECIMAL);

        let lo = self.mem_read(bus, VECTOR_NMI);
        let hi = self.mem_read(bus, VECTOR_NMI + 1);
        self.pc = u16::from_le_bytes([lo, hi]);

        self.cycles += 7;

        #[cfg(feature = "disassembler")]
        {
            self.debug.next_irq = 2;
            let dest = self.pc;
            self.push_call_stack(pc, dest, pc);
        }
    }

    /// Enter or leave the sleep state (driven by Mikey's CPUSLEEP register).
    pub fn halt(&mut self, halted: bool) {
        self.halted = halted;
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn irq_asserted(&self) -> bool {
        self.irq_asserted
    }

    /// MAPCTL bit 7 gates the one-tick discount on sequential same-page
    /// fetches.
    pub fn set_page_mode_enabled(&mut self, enabled: bool) {
        self.page_mode_discount = if enabled { 1 } else { 0 };
    }

    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    pub fn last_ticks(&self) -> u32 {
        self.last_ticks
    }

    fn skip_irq(&self) -> bool {
        #[cfg(feature = "disassembler")]
        {
            self.debug.skip_irq_on_step
        }
        #[cfg(not(feature = "disassembler"))]
        {
            false
        }
    }

    // ---- Flag helpers ----

    #[inline]
    pub(crate) fn set_flag(&mut self, flag: u8) {
        self.p |= flag;
    }

    #[inline]
    pub(crate) fn clear_flag(&mut self, flag: u8) {
        self.p &= !flag;
    }

    #[inline]
    pub(crate) fn is_set_flag(&self, flag: u8) -> bool {
        self.p & flag != 0
    }

    #[inline]
    pub(crate) fn set_zn_flags(&mut self, result: u8) {
        self.p |= self.zn_flags_lut[result as usize];
    }

    #[inline]
    pub(crate) fn set_or_clear_zn_flags(&mut self, result: u8) {
        self.p &= !(FLAG_ZERO | FLAG_NEGATIVE);
        self.p |= self.zn_flags_lut[result as usize];
    }

    fn unofficial_opcode(&mut self, opcode: u8) {
        // All unofficial opcodes behave as one-byte NOPs on this part.
        // They also suppress IRQ servicing on their boundary.
        self.onebyte_nop = true;
        log::debug!("unofficial opcode {opcode:02X} at {:04X}", self.pc.wrapping_sub(1));
    }

    fn execute<B>(&mut self, opcode: u8, bus: &mut B)
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        match opcode {
            // --- Control ---
            0x00 => self.op_brk(bus),
            0xEA => {} // NOP

            // --- ORA ---
            0x01 => {
                let a = self.zero_page_indexed_indirect(bus);
                let v = self.mem_read(bus, a);
                self.ora(v);
            }
            0x05 => {
                let a = self.zero_page(bus);
                let v = self.mem_read(bus, a);
                self.ora(v);
            }
            0x09 => {
                let v = self.immediate(bus);
                self.ora(v);
            }
            0x0D => {
                let a = self.absolute(bus);
                let v = self.mem_read(bus, a);
                self.ora(v);
            }
            0x11 => {
                let a = self.zero_page_indirect_indexed(bus);
                let v = self.mem_read(bus, a);
                self.ora(v);
            }
            0x12 => {
                let a = self.zero_page_indirect(bus);
                let v = self.mem_read(bus, a);
                self.ora(v);
            }
            0x15 => {
                let a = self.zero_page_x(bus);
                let v = self.mem_read(bus, a);
                self.ora(v);
            }
            0x19 => {
                let a = self.absolute_y(bus);
                let v = self.mem_read(bus, a);
                self.ora(v);
            }
            0x1D => {
                let a = self.absolute_x(bus);
                let v = self.mem_read(bus, a);
                self.ora(v);
            }

            // --- AND ---
            0x21 => {
                let a = self.zero_page_indexed_indirect(bus);
                let v = self.mem_read(bus, a);
                self.and(v);
            }
            0x25 => {
                let a = self.zero_page(bus);
                let v = self.mem_read(bus, a);
                self.and(v);
            }
            0x29 => {
                let v = self.immediate(bus);
                self.and(v);
            }
            0x2D => {
                let a = self.absolute(bus);
                let v = self.mem_read(bus, a);
                self.and(v);
            }
            0x31 => {
                let a = self.zero_page_indirect_indexed(bus);
                let v = self.mem_read(bus, a);
                self.and(v);
            }
            0x32 => {
                let a = self.zero_page_indirect(bus);
                let v = self.mem_read(bus, a);
                self.and(v);
            }
            0x35 => {
                let a = self.zero_page_x(bus);
                let v = self.mem_read(bus, a);
                self.and(v);
            }
            0x39 => {
                let a = self.absolute_y(bus);
                let v = self.mem_read(bus, a);
                self.and(v);
            }
            0x3D => {
                let a = self.absolute_x(bus);
                let v = self.mem_read(bus, a);
                self.and(v);
            }

            // --- EOR ---
            0x41 => {
                let a = self.zero_page_indexed_indirect(bus);
                let v = self.mem_read(bus, a);
                self.eor(v);
            }
            0x45 => {
                let a = self.zero_page(bus);
                let v = self.mem_read(bus, a);
                self.eor(v);
            }
            0x49 => {
                let v = self.immediate(bus);
                self.eor(v);
            }
            0x4D => {
                let a = self.absolute(bus);
                let v = self.mem_read(bus, a);
                self.eor(v);
            }
            0x51 => {
                let a = self.zero_page_indirect_indexed(bus);
                let v = self.mem_read(bus, a);
                self.eor(v);
            }
            0x52 => {
                let a = self.zero_page_indirect(bus);
                let v = self.mem_read(bus, a);
                self.eor(v);
            }
            0x55 => {
                let a = self.zero_page_x(bus);
                let v = self.mem_read(bus, a);
                self.eor(v);
            }
            0x59 => {
                let a = self.absolute_y(bus);
                let v = self.mem_read(bus, a);
                self.eor(v);
            }
            0x5D => {
                let a = self.absolute_x(bus);
                let v = self.mem_read(bus, a);
                self.eor(v);
            }

            // --- ADC ---
            0x61 => {
                let a = self.zero_page_indexed_indirect(bus);
                let v = self.mem_read(bus, a);
                self.adc(v);
            }
            0x65 => {
                let a = self.zero_page(bus);
                let v = self.mem_read(bus, a);
                self.adc(v);
            }
            0x69 => {
                let v = self.immediate(bus);
                self.adc(v);
            }
            0x6D => {
                let a = self.absolute(bus);
                let v = self.mem_read(bus, a);
                self.adc(v);
            }
            0x71 => {
                let a = self.zero_page_indirect_indexed(bus);
                let v = self.mem_read(bus, a);
                self.adc(v);
            }
            0x72 => {
                let a = self.zero_page_indirect(bus);
                let v = self.mem_read(bus, a);
                self.adc(v);
            }
            0x75 => {
                let a = self.zero_page_x(bus);
                let v = self.mem_read(bus, a);
                self.adc(v);
            }
            0x79 => {
                let a = self.absolute_y(bus);
                let v = self.mem_read(bus, a);
                self.adc(v);
            }
            0x7D => {
                let a = self.absolute_x(bus);
                let v = self.mem_read(bus, a);
                self.adc(v);
            }

            // --- SBC ---
            0xE1 => {
                let a = self.zero_page_indexed_indirect(bus);
                let v = self.mem_read(bus, a);
                self.sbc(v);
            }
            0xE5 => {
                let a = self.zero_page(bus);
                let v = self.mem_read(bus, a);
                self.sbc(v);
            }
            0xE9 => {
                let v = self.immediate(bus);
                self.sbc(v);
            }
            0xED => {
                let a = self.absolute(bus);
                let v = self.mem_read(bus, a);
                self.sbc(v);
            }
            0xF1 => {
                let a = self.zero_page_indirect_indexed(bus);
                let v = self.mem_read(bus, a);
                self.sbc(v);
            }
            0xF2 => {
                let a = self.zero_page_indirect(bus);
                let v = self.mem_read(bus, a);
                self.sbc(v);
            }
            0xF5 => {
                let a = self.zero_page_x(bus);
                let v = self.mem_read(bus, a);
                self.sbc(v);
            }
            0xF9 => {
                let a = self.absolute_y(bus);
                let v = self.mem_read(bus, a);
                self.sbc(v);
            }
            0xFD => {
                let a = self.absolute_x(bus);
                let v = self.mem_read(bus, a);
                self.sbc(v);
            }

            // --- CMP / CPX / CPY ---
            0xC1 => {
                let a = self.zero_page_indexed_indirect(bus);
                let v = self.mem_read(bus, a);
                self.compare(self.a, v);
            }
            0xC5 => {
                let a = self.zero_page(bus);
                let v = self.mem_read(bus, a);
                self.compare(self.a, v);
            }
            0xC9 => {
                let v = self.immediate(bus);
                self.compare(self.a, v);
            }
            0xCD => {
                let a = self.absolute(bus);
                let v = self.mem_read(bus, a);
                self.compare(self.a, v);
            }
            0xD1 => {
                let a = self.zero_page_indirect_indexed(bus);
                let v = self.mem_read(bus, a);
                self.compare(self.a, v);
            }
            0xD2 => {
                let a = self.zero_page_indirect(bus);
                let v = self.mem_read(bus, a);
                self.compare(self.a, v);
            }
            0xD5 => {
                let a = self.zero_page_x(bus);
                let v = self.mem_read(bus, a);
                self.compare(self.a, v);
            }
            0xD9 => {
                let a = self.absolute_y(bus);
                let v = self.mem_read(bus, a);
                self.compare(self.a, v);
            }
            0xDD => {
                let a = self.absolute_x(bus);
                let v = self.mem_read(bus, a);
                self.compare(self.a, v);
            }
            0xE0 => {
                let v = self.immediate(bus);
                self.compare(self.x, v);
            }
            0xE4 => {
                let a = self.zero_page(bus);
                let v = self.mem_read(bus, a);
                self.compare(self.x, v);
            }
            0xEC => {
                let a = self.absolute(bus);
                let v = self.mem_read(bus, a);
                self.compare(self.x, v);
            }
            0xC0 => {
                let v = self.immediate(bus);
                self.compare(self.y, v);
            }
            0xC4 => {
                let a = self.zero_page(bus);
                let v = self.mem_read(bus, a);
                self.compare(self.y, v);
            }
            0xCC => {
                let a = self.absolute(bus);
                let v = self.mem_read(bus, a);
                self.compare(self.y, v);
            }

            // --- BIT / TSB / TRB ---
            0x24 => {
                let a = self.zero_page(bus);
                self.bit(bus, a);
            }
            0x2C => {
                let a = self.absolute(bus);
                self.bit(bus, a);
            }
            0x34 => {
                let a = self.zero_page_x(bus);
                self.bit(bus, a);
            }
            0x3C => {
                let a = self.absolute_x(bus);
                self.bit(bus, a);
            }
            0x89 => {
                let v = self.immediate(bus);
                self.bit_immediate(v);
            }
            0x04 => {
                let a = self.zero_page(bus);
                self.tsb(bus, a);
            }
            0x0C => {
                let a = self.absolute(bus);
                self.tsb(bus, a);
            }
            0x14 => {
                let a = self.zero_page(bus);
                self.trb(bus, a);
            }
            0x1C => {
                let a = self.absolute(bus);
                self.trb(bus, a);
            }

            // --- Shifts / rotates ---
            0x0A => self.asl_accumulator(),
            0x06 => {
                let a = self.zero_page(bus);
                self.asl_memory(bus, a);
            }
            0x16 => {
                let a = self.zero_page_x(bus);
                self.asl_memory(bus, a);
            }
            0x0E => {
                let a = self.absolute(bus);
                self.asl_memory(bus, a);
            }
            0x1E => {
                let a = self.absolute_x(bus);
                self.asl_memory(bus, a);
            }
            0x4A => self.lsr_accumulator(),
            0x46 => {
                let a = self.zero_page(bus);
                self.lsr_memory(bus, a);
            }
            0x56 => {
                let a = self.zero_page_x(bus);
                self.lsr_memory(bus, a);
            }
            0x4E => {
                let a = self.absolute(bus);
                self.lsr_memory(bus, a);
            }
            0x5E => {
                let a = self.absolute_x(bus);
                self.lsr_memory(bus, a);
            }
            0x2A => self.rol_accumulator(),
            0x26 => {
                let a = self.zero_page(bus);
                self.rol_memory(bus, a);
            }
            0x36 => {
                let a = self.zero_page_x(bus);
                self.rol_memory(bus, a);
            }
            0x2E => {
                let a = self.absolute(bus);
                self.rol_memory(bus, a);
            }
            0x3E => {
                let a = self.absolute_x(bus);
                self.rol_memory(bus, a);
            }
            0x6A => self.ror_accumulator(),
            0x66 => {
                let a = self.zero_page(bus);
                self.ror_memory(bus, a);
            }
            0x76 => {
                let a = self.zero_page_x(bus);
                self.ror_memory(bus, a);
            }
            0x6E => {
                let a = self.absolute(bus);
                self.ror_memory(bus, a);
            }
            0x7E => {
                let a = self.absolute_x(bus);
                self.ror_memory(bus, a);
            }

            // --- INC / DEC ---
            0x1A => {
                self.a = self.a.wrapping_add(1);
                let v = self.a;
                self.set_or_clear_zn_flags(v);
            }
            0x3A => {
                self.a = self.a.wrapping_sub(1);
                let v = self.a;
                self.set_or_clear_zn_flags(v);
            }
            0xE6 => {
                let a = self.zero_page(bus);
                self.inc_memory(bus, a);
            }
            0xF6 => {
                let a = self.zero_page_x(bus);
                self.inc_memory(bus, a);
            }
            0xEE => {
                let a = self.absolute(bus);
                self.inc_memory(bus, a);
            }
            0xFE => {
                let a = self.absolute_x(bus);
                self.inc_memory(bus, a);
            }
            0xC6 => {
                let a = self.zero_page(bus);
                self.dec_memory(bus, a);
            }
            0xD6 => {
                let a = self.zero_page_x(bus);
                self.dec_memory(bus, a);
            }
            0xCE => {
                let a = self.absolute(bus);
                self.dec_memory(bus, a);
            }
            0xDE => {
                let a = self.absolute_x(bus);
                self.dec_memory(bus, a);
            }
            0xE8 => {
                self.x = self.x.wrapping_add(1);
                let v = self.x;
                self.set_or_clear_zn_flags(v);
            }
            0xC8 => {
                self.y = self.y.wrapping_add(1);
                let v = self.y;
                self.set_or_clear_zn_flags(v);
            }
            0xCA => {
                self.x = self.x.wrapping_sub(1);
                let v = self.x;
                self.set_or_clear_zn_flags(v);
            }
            0x88 => {
                self.y = self.y.wrapping_sub(1);
                let v = self.y;
                self.set_or_clear_zn_flags(v);
            }

            // --- Loads ---
            0xA1 => {
                let a = self.zero_page_indexed_indirect(bus);
                let v = self.mem_read(bus, a);
                self.ld_a(v);
            }
            0xA5 => {
                let a = self.zero_page(bus);
                let v = self.mem_read(bus, a);
                self.ld_a(v);
            }
            0xA9 => {
                let v = self.immediate(bus);
                self.ld_a(v);
            }
            0xAD => {
                let a = self.absolute(bus);
                let v = self.mem_read(bus, a);
                self.ld_a(v);
            }
            0xB1 => {
                let a = self.zero_page_indirect_indexed(bus);
                let v = self.mem_read(bus, a);
                self.ld_a(v);
            }
            0xB2 => {
                let a = self.zero_page_indirect(bus);
                let v = self.mem_read(bus, a);
                self.ld_a(v);
            }
            0xB5 => {
                let a = self.zero_page_x(bus);
                let v = self.mem_read(bus, a);
                self.ld_a(v);
            }
            0xB9 => {
                let a = self.absolute_y(bus);
                let v = self.mem_read(bus, a);
                self.ld_a(v);
            }
            0xBD => {
                let a = self.absolute_x(bus);
                let v = self.mem_read(bus, a);
                self.ld_a(v);
            }
            0xA2 => {
                let v = self.immediate(bus);
                self.ld_x(v);
            }
            0xA6 => {
                let a = self.zero_page(bus);
                let v = self.mem_read(bus, a);
                self.ld_x(v);
            }
            0xB6 => {
                let a = self.zero_page_y(bus);
                let v = self.mem_read(bus, a);
                self.ld_x(v);
            }
            0xAE => {
                let a = self.absolute(bus);
                let v = self.mem_read(bus, a);
                self.ld_x(v);
            }
            0xBE => {
                let a = self.absolute_y(bus);
                let v = self.mem_read(bus, a);
                self.ld_x(v);
            }
            0xA0 => {
                let v = self.immediate(bus);
                self.ld_y(v);
            }
            0xA4 => {
                let a = self.zero_page(bus);
                let v = self.mem_read(bus, a);
                self.ld_y(v);
            }
            0xB4 => {
                let a = self.zero_page_x(bus);
                let v = self.mem_read(bus, a);
                self.ld_y(v);
            }
            0xAC => {
                let a = self.absolute(bus);
                let v = self.mem_read(bus, a);
                self.ld_y(v);
            }
            0xBC => {
                let a = self.absolute_x(bus);
                let v = self.mem_read(bus, a);
                self.ld_y(v);
            }

            // --- Stores ---
            0x81 => {
                let a = self.zero_page_indexed_indirect(bus);
                let v = self.a;
                self.mem_write(bus, a, v);
            }
            0x85 => {
                let a = self.zero_page(bus);
                let v = self.a;
                self.mem_write(bus, a, v);
            }
            0x8D => {
                let a = self.absolute(bus);
                let v = self.a;
                self.mem_write(bus, a, v);
            }
            0x91 => {
                let a = self.zero_page_indirect_indexed(bus);
                let v = self.a;
                self.mem_write(bus, a, v);
            }
            0x92 => {
                let a = self.zero_page_indirect(bus);
                let v = self.a;
                self.mem_write(bus, a, v);
            }
            0x95 => {
                let a = self.zero_page_x(bus);
                let v = self.a;
                self.mem_write(bus, a, v);
            }
            0x99 => {
                let a = self.absolute_y(bus);
                let v = self.a;
                self.mem_write(bus, a, v);
            }
            0x9D => {
                let a = self.absolute_x(bus);
                let v = self.a;
                self.mem_write(bus, a, v);
            }
            0x86 => {
                let a = self.zero_page(bus);
                let v = self.x;
                self.mem_write(bus, a, v);
            }
            0x96 => {
                let a = self.zero_page_y(bus);
                let v = self.x;
                self.mem_write(bus, a, v);
            }
            0x8E => {
                let a = self.absolute(bus);
                let v = self.x;
                self.mem_write(bus, a, v);
            }
            0x84 => {
                let a = self.zero_page(bus);
                let v = self.y;
                self.mem_write(bus, a, v);
            }
            0x94 => {
                let a = self.zero_page_x(bus);
                let v = self.y;
                self.mem_write(bus, a, v);
            }
            0x8C => {
                let a = self.absolute(bus);
                let v = self.y;
                self.mem_write(bus, a, v);
            }
            0x64 => {
                let a = self.zero_page(bus);
                self.mem_write(bus, a, 0x00);
            }
            0x74 => {
                let a = self.zero_page_x(bus);
                self.mem_write(bus, a, 0x00);
            }
            0x9C => {
                let a = self.absolute(bus);
                self.mem_write(bus, a, 0x00);
            }
            0x9E => {
                let a = self.absolute_x(bus);
                self.mem_write(bus, a, 0x00);
            }

            // --- RMB / SMB ---
            0x07 => {
                let a = self.zero_page(bus);
                self.rmb(bus, 0, a);
            }
            0x17 => {
                let a = self.zero_page(bus);
                self.rmb(bus, 1, a);
            }
            0x27 => {
                let a = self.zero_page(bus);
                self.rmb(bus, 2, a);
            }
            0x37 => {
                let a = self.zero_page(bus);
                self.rmb(bus, 3, a);
            }
            0x47 => {
                let a = self.zero_page(bus);
                self.rmb(bus, 4, a);
            }
            0x57 => {
                let a = self.zero_page(bus);
                self.rmb(bus, 5, a);
            }
            0x67 => {
                let a = self.zero_page(bus);
                self.rmb(bus, 6, a);
            }
            0x77 => {
                let a = self.zero_page(bus);
                self.rmb(bus, 7, a);
            }
            0x87 => {
                let a = self.zero_page(bus);
                self.smb(bus, 0, a);
            }
            0x97 => {
                let a = self.zero_page(bus);
                self.smb(bus, 1, a);
            }
            0xA7 => {
                let a = self.zero_page(bus);
                self.smb(bus, 2, a);
            }
            0xB7 => {
                let a = self.zero_page(bus);
                self.smb(bus, 3, a);
            }
            0xC7 => {
                let a = self.zero_page(bus);
                self.smb(bus, 4, a);
            }
            0xD7 => {
                let a = self.zero_page(bus);
                self.smb(bus, 5, a);
            }
            0xE7 => {
                let a = self.zero_page(bus);
                self.smb(bus, 6, a);
            }
            0xF7 => {
                let a = self.zero_page(bus);
                self.smb(bus, 7, a);
            }

            // --- Transfers ---
            0xAA => {
                self.x = self.a;
                let v = self.x;
                self.set_or_clear_zn_flags(v);
            }
            0xA8 => {
                self.y = self.a;
                let v = self.y;
                self.set_or_clear_zn_flags(v);
            }
            0x8A => {
                self.a = self.x;
                let v = self.a;
                self.set_or_clear_zn_flags(v);
            }
            0x98 => {
                self.a = self.y;
                let v = self.a;
                self.set_or_clear_zn_flags(v);
            }
            0xBA => {
                self.x = self.s;
                let v = self.x;
                self.set_or_clear_zn_flags(v);
            }
            0x9A => {
                // TXS does not touch flags.
                self.s = self.x;
            }

            // --- Flag operations ---
            0x18 => self.clear_flag(FLAG_CARRY),
            0x38 => self.set_flag(FLAG_CARRY),
            0x58 => self.clear_flag(FLAG_INTERRUPT),
            0x78 => self.set_flag(FLAG_INTERRUPT),
            0xB8 => self.clear_flag(FLAG_OVERFLOW),
            0xD8 => self.clear_flag(FLAG_DECIMAL),
            0xF8 => self.set_flag(FLAG_DECIMAL),

            // --- Branches ---
            0x10 => {
                let cond = !self.is_set_flag(FLAG_NEGATIVE);
                self.branch(bus, cond);
            }
            0x30 => {
                let cond = self.is_set_flag(FLAG_NEGATIVE);
                self.branch(bus, cond);
            }
            0x50 => {
                let cond = !self.is_set_flag(FLAG_OVERFLOW);
                self.branch(bus, cond);
            }
            0x70 => {
                let cond = self.is_set_flag(FLAG_OVERFLOW);
                self.branch(bus, cond);
            }
            0x90 => {
                let cond = !self.is_set_flag(FLAG_CARRY);
                self.branch(bus, cond);
            }
            0xB0 => {
                let cond = self.is_set_flag(FLAG_CARRY);
                self.branch(bus, cond);
            }
            0xD0 => {
                let cond = !self.is_set_flag(FLAG_ZERO);
                self.branch(bus, cond);
            }
            0xF0 => {
                let cond = self.is_set_flag(FLAG_ZERO);
                self.branch(bus, cond);
            }
            0x80 => self.branch(bus, true), // BRA

            // --- BBR / BBS ---
            0x0F => self.branch_on_bit(bus, 0, false),
            0x1F => self.branch_on_bit(bus, 1, false),
            0x2F => self.branch_on_bit(bus, 2, false),
            0x3F => self.branch_on_bit(bus, 3, false),
            0x4F => self.branch_on_bit(bus, 4, false),
            0x5F => self.branch_on_bit(bus, 5, false),
            0x6F => self.branch_on_bit(bus, 6, false),
            0x7F => self.branch_on_bit(bus, 7, false),
            0x8F => self.branch_on_bit(bus, 0, true),
            0x9F => self.branch_on_bit(bus, 1, true),
            0xAF => self.branch_on_bit(bus, 2, true),
            0xBF => self.branch_on_bit(bus, 3, true),
            0xCF => self.branch_on_bit(bus, 4, true),
            0xDF => self.branch_on_bit(bus, 5, true),
            0xEF => self.branch_on_bit(bus, 6, true),
            0xFF => self.branch_on_bit(bus, 7, true),

            // --- Jumps ---
            0x4C => {
                let dest = self.absolute(bus);
                self.pc = dest;
            }
            0x6C => {
                let dest = self.absolute_indirect(bus);
                self.pc = dest;
            }
            0x7C => {
                let dest = self.absolute_indexed_indirect(bus);
                self.pc = dest;
            }
            0x20 => self.op_jsr(bus),
            0x60 => self.op_rts(bus),
            0x40 => self.op_rti(bus),

            // --- Stack ---
            0x48 => {
                let v = self.a;
                self.stack_push8(bus, v);
            }
            0xDA => {
                let v = self.x;
                self.stack_push8(bus, v);
            }
            0x5A => {
                let v = self.y;
                self.stack_push8(bus, v);
            }
            0x08 => {
                let v = self.p | FLAG_BREAK;
                self.stack_push8(bus, v);
            }
            0x68 => {
                let v = self.stack_pop8(bus);
                self.a = v;
                self.set_or_clear_zn_flags(v);
            }
            0xFA => {
                let v = self.stack_pop8(bus);
                self.x = v;
                self.set_or_clear_zn_flags(v);
            }
            0x7A => {
                let v = self.stack_pop8(bus);
                self.y = v;
                self.set_or_clear_zn_flags(v);
            }
            0x28 => {
                self.p = self.stack_pop8(bus);
                self.clear_flag(FLAG_BREAK);
            }

            // Everything else is undefined on this part.
            _ => self.unofficial_opcode(opcode),
        }
    }
}

impl CpuStateTrait for M65C02 {
    type Snapshot = M65C02State;

    fn snapshot(&self) -> M65C02State {
        M65C02State {
            a: self.a,
            x: self.x,
            y: self.y,
            pc: self.pc,
            s: self.s,
            p: self.p,
            halted: self.halted,
            total_ticks: self.total_ticks,
            last_ticks: self.last_ticks,
        }
    }
}
