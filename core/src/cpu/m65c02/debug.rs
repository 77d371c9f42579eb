//! Debugger support: breakpoints, per-address disassembly records and the
//! JSR/BRK/RTS call-stack mirror. Compiled only with the `disassembler`
//! feature; release builds without it pay nothing.

use std::collections::HashMap;

use super::{M65C02, OPCODE_SIZES};
use crate::core::{Bus, BusMaster};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Breakpoint {
    pub enabled: bool,
    pub address1: u16,
    pub address2: u16,
    pub range: bool,
    pub read: bool,
    pub write: bool,
    pub execute: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct CallStackEntry {
    pub src: u16,
    pub dest: u16,
    pub back: u16,
}

/// One decoded instruction, keyed by its start address.
#[derive(Clone, Debug, Default)]
pub struct DisasmRecord {
    pub address: u16,
    pub name: String,
    pub bytes: String,
    pub size: u8,
    pub opcodes: [u8; 7],
    pub jump: bool,
    pub jump_address: u16,
    pub subroutine: bool,
    /// 0 = none, 1 = reset entry, 2 = NMI entry, 3 = IRQ entry.
    pub irq: u8,
    pub has_operand_address: bool,
    pub operand_address: u16,
    pub operand_is_zp: bool,
}

pub struct DebugState {
    pub breakpoints: Vec<Breakpoint>,
    pub breakpoints_enabled: bool,
    pub break_on_irq: bool,
    pub cpu_breakpoint_hit: bool,
    pub memory_breakpoint_hit: bool,
    pub run_to_breakpoint: u16,
    pub run_to_requested: bool,
    pub run_to_breakpoint_hit: bool,
    pub skip_irq_on_step: bool,
    pub next_irq: u8,
    pub call_stack: Vec<CallStackEntry>,
    pub records: HashMap<u16, DisasmRecord>,
}

const CALL_STACK_LIMIT: usize = 256;

impl DebugState {
    pub fn new() -> Self {
        Self {
            breakpoints: Vec::new(),
            breakpoints_enabled: false,
            break_on_irq: false,
            cpu_breakpoint_hit: false,
            memory_breakpoint_hit: false,
            run_to_breakpoint: 0,
            run_to_requested: false,
            run_to_breakpoint_hit: false,
            skip_irq_on_step: false,
            next_irq: 0,
            call_stack: Vec::new(),
            records: HashMap::new(),
        }
    }

    pub fn reset(&mut self) {
        self.cpu_breakpoint_hit = false;
        self.memory_breakpoint_hit = false;
        self.run_to_breakpoint_hit = false;
        self.run_to_requested = false;
        self.next_irq = 0;
        self.call_stack.clear();
    }
}

impl Default for DebugState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Mnemonic table
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Operand {
    Imp,
    Acc,
    Imm,
    Zp,
    ZpX,
    ZpY,
    ZpInd,
    ZpIndX,
    ZpIndY,
    /// BBRn/BBSn: zero page plus relative displacement.
    ZpRel,
    Rel,
    Abs,
    AbsX,
    AbsY,
    AbsInd,
    AbsIndX,
}

fn opcode_name(opcode: u8) -> (&'static str, Operand) {
    use Operand::*;
    match opcode {
        0x00 => ("BRK", Imp),
        0x01 => ("ORA", ZpIndX),
        0x04 => ("TSB", Zp),
        0x05 => ("ORA", Zp),
        0x06 => ("ASL", Zp),
        0x07 => ("RMB0", Zp),
        0x08 => ("PHP", Imp),
        0x09 => ("ORA", Imm),
        0x0A => ("ASL", Acc),
        0x0C => ("TSB", Abs),
        0x0D => ("ORA", Abs),
        0x0E => ("ASL", Abs),
        0x0F => ("BBR0", ZpRel),
        0x10 => ("BPL", Rel),
        0x11 => ("ORA", ZpIndY),
        0x12 => ("ORA", ZpInd),
        0x14 => ("TRB", Zp),
        0x15 => ("ORA", ZpX),
        0x16 => ("ASL", ZpX),
        0x17 => ("RMB1", Zp),
        0x18 => ("CLC", Imp),
        0x19 => ("ORA", AbsY),
        0x1A => ("INC", Acc),
        0x1C => ("TRB", Abs),
        0x1D => ("ORA", AbsX),
        0x1E => ("ASL", AbsX),
        0x1F => ("BBR1", ZpRel),
        0x20 => ("JSR", Abs),
        0x21 => ("AND", ZpIndX),
        0x24 => ("BIT", Zp),
        0x25 => ("AND", Zp),
        0x26 => ("ROL", Zp),
        0x27 => ("RMB2", Zp),
        0x28 => ("PLP", Imp),
        0x29 => ("AND", Imm),
        0x2A => ("ROL", Acc),
        0x2C => ("BIT", Abs),
        0x2D => ("AND", Abs),
        0x2E => ("ROL", Abs),
        0x2F => ("BBR2", ZpRel),
        0x30 => ("BMI", Rel),
        0x31 => ("AND", ZpIndY),
        0x32 => ("AND", ZpInd),
        0x34 => ("BIT", ZpX),
        0x35 => ("AND", ZpX),
        0x36 => ("ROL", ZpX),
        0x37 => ("RMB3", Zp),
        0x38 => ("SEC", Imp),
        0x39 => ("AND", AbsY),
        0x3A => ("DEC", Acc),
        0x3C => ("BIT", AbsX),
        0x3D => ("AND", AbsX),
        0x3E => ("ROL", AbsX),
        0x3F => ("BBR3", ZpRel),
        0x40 => ("RTI", Imp),
        0x41 => ("EOR", ZpIndX),
        0x45 => ("EOR", Zp),
        0x46 => ("LSR", Zp),
        0x47 => ("RMB4", Zp),
        0x48 => ("PHA", Imp),
        0x49 => ("EOR", Imm),
        0x4A => ("LSR", Acc),
        0x4C => ("JMP", Abs),
        0x4D => ("EOR", Abs),
        0x4E => ("LSR", Abs),
        0x4F => ("BBR4", ZpRel),
        0x50 => ("BVC", Rel),
        0x51 => ("EOR", ZpIndY),
        0x52 => ("EOR", ZpInd),
        0x55 => ("EOR", ZpX),
        0x56 => ("LSR", ZpX),
        0x57 => ("RMB5", Zp),
        0x58 => ("CLI", Imp),
        0x59 => ("EOR", AbsY),
        0x5A => ("PHY", Imp),
        0x5D => ("EOR", AbsX),
        0x5E => ("LSR", AbsX),
        0x5F => ("BBR5", ZpRel),
        0x60 => ("RTS", Imp),
        0x61 => ("ADC", ZpIndX),
        0x64 => ("STZ", Zp),
        0x65 => ("ADC", Zp),
        0x66 => ("ROR", Zp),
        0x67 => ("RMB6", Zp),
        0x68 => ("PLA", Imp),
        0x69 => ("ADC", Imm),
        0x6A => ("ROR", Acc),
        0x6C => ("JMP", AbsInd),
        0x6D => ("ADC", Abs),
        0x6E => ("ROR", Abs),
        0x6F => ("BBR6", ZpRel),
        0x70 => ("BVS", Rel),
        0x71 => ("ADC", ZpIndY),
        0x72 => ("ADC", ZpInd),
        0x74 => ("STZ", ZpX),
        0x75 => ("ADC", ZpX),
        0x76 => ("ROR", ZpX),
        0x77 => ("RMB7", Zp),
        0x78 => ("SEI", Imp),
        0x79 => ("ADC", AbsY),
        0x7A => ("PLY", Imp),
        0x7C => ("JMP", AbsIndX),
        0x7D => ("ADC", AbsX),
        0x7E => ("ROR", AbsX),
        0x7F => ("BBR7", ZpRel),
        0x80 => ("BRA", Rel),
        0x81 => ("STA", ZpIndX),
        0x84 => ("STY", Zp),
        0x85 => ("STA", Zp),
        0x86 => ("STX", Zp),
        0x87 => ("SMB0", Zp),
        0x88 => ("DEY", Imp),
        0x89 => ("BIT", Imm),
        0x8A => ("TXA", Imp),
        0x8C => ("STY", Abs),
        0x8D => ("STA", Abs),
        0x8E => ("STX", Abs),
        0x8F => ("BBS0", ZpRel),
        0x90 => ("BCC", Rel),
        0x91 => ("STA", ZpIndY),
        0x92 => ("STA", ZpInd),
        0x94 => ("STY", ZpX),
        0x95 => ("STA", ZpX),
        0x96 => ("STX", ZpY),
        0x97 => ("SMB1", Zp),
        0x98 => ("TYA", Imp),
        0x99 => ("STA", AbsY),
        0x9A => ("TXS", Imp),
        0x9C => ("STZ", Abs),
        0x9D => ("STA", AbsX),
        0x9E => ("STZ", AbsX),
        0x9F => ("BBS1", ZpRel),
        0xA0 => ("LDY", Imm),
        0xA1 => ("LDA", ZpIndX),
        0xA2 => ("LDX", Imm),
        0xA4 => ("LDY", Zp),
        0xA5 => ("LDA", Zp),
        0xA6 => ("LDX", Zp),
        0xA7 => ("SMB2", Zp),
        0xA8 => ("TAY", Imp),
        0xA9 => ("LDA", Imm),
        0xAA => ("TAX", Imp),
        0xAC => ("LDY", Abs),
        0xAD => ("LDA", Abs),
        0xAE => ("LDX", Abs),
        0xAF => ("BBS2", ZpRel),
        0xB0 => ("BCS", Rel),
        0xB1 => ("LDA", ZpIndY),
        0xB2 => ("LDA", ZpInd),
        0xB4 => ("LDY", ZpX),
        0xB5 => ("LDA", ZpX),
        0xB6 => ("LDX", ZpY),
        0xB7 => ("SMB3", Zp),
        0xB8 => ("CLV", Imp),
        0xB9 => ("LDA", AbsY),
        0xBA => ("TSX", Imp),
        0xBC => ("LDY", AbsX),
        0xBD => ("LDA", AbsX),
        0xBE => ("LDX", AbsY),
        0xBF => ("BBS3", ZpRel),
        0xC0 => ("CPY", Imm),
        0xC1 => ("CMP", ZpIndX),
        0xC4 => ("CPY", Zp),
        0xC5 => ("CMP", Zp),
        0xC6 => ("DEC", Zp),
        0xC7 => ("SMB4", Zp),
        0xC8 => ("INY", Imp),
        0xC9 => ("CMP", Imm),
        0xCA => ("DEX", Imp),
        0xCC => ("CPY", Abs),
        0xCD => ("CMP", Abs),
        0xCE => ("DEC", Abs),
        0xCF => ("BBS4", ZpRel),
        0xD0 => ("BNE", Rel),
        0xD1 => ("CMP", ZpIndY),
        0xD2 => ("CMP", ZpInd),
        0xD5 => ("CMP", ZpX),
        0xD6 => ("DEC", ZpX),
        0xD7 => ("SMB5", Zp),
        0xD8 => ("CLD", Imp),
        0xD9 => ("CMP", AbsY),
        0xDA => ("PHX", Imp),
        0xDD => ("CMP", AbsX),
        0xDE => ("DEC", AbsX),
        0xDF => ("BBS5", ZpRel),
        0xE0 => ("CPX", Imm),
        0xE1 => ("SBC", ZpIndX),
        0xE4 => ("CPX", Zp),
        0xE5 => ("SBC", Zp),
        0xE6 => ("INC", Zp),
        0xE7 => ("SMB6", Zp),
        0xE8 => ("INX", Imp),
        0xE9 => ("SBC", Imm),
        0xEA => ("NOP", Imp),
        0xEC => ("CPX", Abs),
        0xED => ("SBC", Abs),
        0xEE => ("INC", Abs),
        0xEF => ("BBS6", ZpRel),
        0xF0 => ("BEQ", Rel),
        0xF1 => ("SBC", ZpIndY),
        0xF2 => ("SBC", ZpInd),
        0xF5 => ("SBC", ZpX),
        0xF6 => ("INC", ZpX),
        0xF7 => ("SMB7", Zp),
        0xF8 => ("SED", Imp),
        0xF9 => ("SBC", AbsY),
        0xFA => ("PLX", Imp),
        0xFD => ("SBC", AbsX),
        0xFE => ("INC", AbsX),
        0xFF => ("BBS7", ZpRel),
        _ => ("???", Imp),
    }
}

// ---------------------------------------------------------------------------
// CPU-side debugger API
// ---------------------------------------------------------------------------

impl M65C02 {
    pub fn enable_breakpoints(&mut self, enable: bool, break_on_irq: bool) {
        self.debug.breakpoints_enabled = enable;
        self.debug.break_on_irq = break_on_irq;
    }

    pub fn breakpoint_hit(&self) -> bool {
        self.debug.cpu_breakpoint_hit || self.debug.memory_breakpoint_hit
    }

    pub fn run_to_breakpoint_hit(&self) -> bool {
        self.debug.run_to_breakpoint_hit
    }

    pub fn reset_breakpoints(&mut self) {
        self.debug.breakpoints.clear();
    }

    /// Add an execute breakpoint at a single address.
    pub fn add_breakpoint(&mut self, address: u16) {
        self.add_breakpoint_ex(address, None, false, false, true);
    }

    /// Add a breakpoint over an address or inclusive range. Duplicate
    /// definitions are ignored; a breakpoint with no trigger is rejected.
    pub fn add_breakpoint_ex(
        &mut self,
        address1: u16,
        address2: Option<u16>,
        read: bool,
        write: bool,
        execute: bool,
    ) {
        if !read && !write && !execute {
            return;
        }

        let brk = Breakpoint {
            enabled: true,
            address1,
            address2: address2.unwrap_or(0),
            range: address2.is_some(),
            read,
            write,
            execute,
        };

        let found = self.debug.breakpoints.iter().any(|item| {
            item.range == brk.range
                && item.address1 == brk.address1
                && (!brk.range || item.address2 == brk.address2)
        });

        if !found {
            self.debug.breakpoints.push(brk);
        }
    }

    pub fn remove_breakpoint(&mut self, address: u16) {
        self.debug
            .breakpoints
            .retain(|item| item.range || item.address1 != address);
    }

    pub fn is_breakpoint(&self, address: u16) -> bool {
        self.debug
            .breakpoints
            .iter()
            .any(|item| !item.range && item.address1 == address)
    }

    /// One-shot breakpoint consumed on hit.
    pub fn add_run_to_breakpoint(&mut self, address: u16) {
        self.debug.run_to_breakpoint = address;
        self.debug.run_to_requested = true;
    }

    /// Single-step support: suppress IRQ servicing for the next step.
    pub fn set_skip_irq_on_step(&mut self, skip: bool) {
        self.debug.skip_irq_on_step = skip;
    }

    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.debug.breakpoints
    }

    pub fn call_stack(&self) -> &[CallStackEntry] {
        &self.debug.call_stack
    }

    pub fn clear_call_stack(&mut self) {
        self.debug.call_stack.clear();
    }

    pub fn disasm_record(&self, address: u16) -> Option<&DisasmRecord> {
        self.debug.records.get(&address)
    }

    pub fn reset_disasm_records(&mut self) {
        self.debug.records.clear();
    }

    pub(crate) fn push_call_stack(&mut self, src: u16, dest: u16, back: u16) {
        if self.debug.call_stack.len() < CALL_STACK_LIMIT {
            self.debug.call_stack.push(CallStackEntry { src, dest, back });
        }
    }

    pub(crate) fn pop_call_stack(&mut self) {
        self.debug.call_stack.pop();
    }

    pub(crate) fn check_memory_breakpoints(&mut self, address: u16, read: bool) {
        if !self.debug.breakpoints_enabled {
            return;
        }

        for brk in &self.debug.breakpoints {
            if !brk.enabled {
                continue;
            }
            if read && !brk.read {
                continue;
            }
            if !read && !brk.write {
                continue;
            }

            let hit = if brk.range {
                address >= brk.address1 && address <= brk.address2
            } else {
                address == brk.address1
            };

            if hit {
                self.debug.memory_breakpoint_hit = true;
                self.debug.run_to_requested = false;
                return;
            }
        }
    }

    fn check_breakpoints(&mut self) {
        let irq_hit = self.irq_asserted() && self.debug.break_on_irq;
        self.debug.cpu_breakpoint_hit = irq_hit && self.debug.next_irq == 3;
        self.debug.run_to_breakpoint_hit = false;

        if self.debug.run_to_requested && self.pc == self.debug.run_to_breakpoint {
            self.debug.run_to_breakpoint_hit = true;
            self.debug.run_to_requested = false;
            return;
        }

        if !self.debug.breakpoints_enabled {
            return;
        }

        for brk in &self.debug.breakpoints {
            if !brk.enabled || !brk.execute {
                continue;
            }

            let hit = if brk.range {
                self.pc >= brk.address1 && self.pc <= brk.address2
            } else {
                self.pc == brk.address1
            };

            if hit {
                self.debug.cpu_breakpoint_hit = true;
                self.debug.run_to_requested = false;
                return;
            }
        }
    }

    /// Decode the instruction the CPU is about to execute into the record
    /// map. Reads go through the `Debug` bus master so no MMIO side effect
    /// fires.
    pub fn disassemble_next_opcode<B>(&mut self, bus: &mut B)
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        self.check_breakpoints();

        let address = self.pc;
        let opcode = bus.read(BusMaster::Debug, address);
        let opcode_size = OPCODE_SIZES[opcode as usize];

        let mut opcodes = [0u8; 7];
        opcodes[0] = opcode;
        for i in 1..opcode_size as usize {
            opcodes[i] = bus.read(BusMaster::Debug, address.wrapping_add(i as u16));
        }

        let changed = match self.debug.records.get(&address) {
            Some(record) => {
                record.size == 0 || record.opcodes[..opcode_size as usize] != opcodes[..opcode_size as usize]
            }
            None => true,
        };

        if !changed {
            if self.debug.next_irq > 0 {
                let next_irq = self.debug.next_irq;
                self.debug.next_irq = 0;
                if let Some(record) = self.debug.records.get_mut(&address) {
                    record.irq = next_irq;
                }
            }
            return;
        }

        self.invalidate_overlapping_records(address, opcode_size);
        self.populate_record(address, opcodes, opcode_size);
    }

    fn invalidate_overlapping_records(&mut self, address: u16, opcode_size: u8) {
        for back in 1..3u16 {
            let Some(prev_start) = address.checked_sub(back) else {
                continue;
            };
            let distance = (address - prev_start) as u8;
            if let Some(prev) = self.debug.records.get_mut(&prev_start)
                && prev.size > distance
            {
                prev.size = 0;
                prev.name.clear();
                prev.bytes.clear();
            }
        }

        for fwd in 1..opcode_size as u16 {
            let fwd_addr = address.wrapping_add(fwd);
            if let Some(record) = self.debug.records.get_mut(&fwd_addr)
                && record.size != 0
            {
                record.size = 0;
                record.name.clear();
                record.bytes.clear();
            }
        }
    }

    fn populate_record(&mut self, address: u16, opcodes: [u8; 7], opcode_size: u8) {
        use std::fmt::Write as _;

        let opcode = opcodes[0];
        let (mnemonic, mode) = opcode_name(opcode);

        let mut record = DisasmRecord {
            address,
            size: opcode_size,
            opcodes,
            ..Default::default()
        };

        if self.debug.next_irq > 0 {
            record.irq = self.debug.next_irq;
            self.debug.next_irq = 0;
        }

        for &byte in &opcodes[..opcode_size as usize] {
            let _ = write!(record.bytes, "{byte:02X} ");
        }

        let op1 = opcodes[1];
        let op2 = opcodes[2];
        let operand16 = u16::from_le_bytes([op1, op2]);

        record.name = match mode {
            Operand::Imp => mnemonic.to_string(),
            Operand::Acc => format!("{mnemonic} A"),
            Operand::Imm => format!("{mnemonic} #${op1:02X}"),
            Operand::Zp => {
                record.has_operand_address = true;
                record.operand_address = op1 as u16;
                record.operand_is_zp = true;
                format!("{mnemonic} ${op1:02X}")
            }
            Operand::ZpX => format!("{mnemonic} ${op1:02X},X"),
            Operand::ZpY => format!("{mnemonic} ${op1:02X},Y"),
            Operand::ZpInd => format!("{mnemonic} (${op1:02X})"),
            Operand::ZpIndX => format!("{mnemonic} (${op1:02X},X)"),
            Operand::ZpIndY => format!("{mnemonic} (${op1:02X}),Y"),
            Operand::ZpRel => {
                let rel = op2 as i8;
                let jump_address = address.wrapping_add(3).wrapping_add_signed(rel as i16);
                record.jump = true;
                record.jump_address = jump_address;
                format!("{mnemonic} ${op1:02X},${jump_address:04X}")
            }
            Operand::Rel => {
                let rel = op1 as i8;
                let jump_address = address.wrapping_add(2).wrapping_add_signed(rel as i16);
                record.jump = true;
                record.jump_address = jump_address;
                format!("{mnemonic} ${jump_address:04X}")
            }
            Operand::Abs => {
                record.has_operand_address = true;
                record.operand_address = operand16;
                format!("{mnemonic} ${operand16:04X}")
            }
            Operand::AbsX => format!("{mnemonic} ${operand16:04X},X"),
            Operand::AbsY => format!("{mnemonic} ${operand16:04X},Y"),
            Operand::AbsInd => format!("{mnemonic} (${operand16:04X})"),
            Operand::AbsIndX => format!("{mnemonic} (${operand16:04X},X)"),
        };

        // JMP $hhll and JSR $hhll are direct jumps.
        if opcode == 0x4C || opcode == 0x20 {
            record.jump = true;
            record.jump_address = operand16;
        }
        if opcode == 0x20 {
            record.subroutine = true;
        }

        self.debug.records.insert(address, record);
    }

    /// Decode forward from the current PC without executing, following
    /// direct jumps a few levels deep. Used by debugger front-ends to fill
    /// the disassembly view around the cursor.
    pub fn disassemble_ahead<B>(&mut self, bus: &mut B, count: usize)
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        let pc = self.pc;
        self.disassemble_ahead_from(bus, pc, count, 0);
    }

    fn disassemble_ahead_from<B>(&mut self, bus: &mut B, start_address: u16, count: usize, depth: u32)
    where
        B: Bus<Address = u16, Data = u8> + ?Sized,
    {
        if depth > 3 {
            return;
        }

        let mut address = start_address;
        let mut disassembled = 0;

        while disassembled < count && address < 0xFFFF {
            let opcode = bus.read(BusMaster::Debug, address);
            let opcode_size = OPCODE_SIZES[opcode as usize];

            if address as u32 + opcode_size as u32 > 0xFFFF {
                break;
            }

            let mut opcodes = [0u8; 7];
            opcodes[0] = opcode;
            for i in 1..opcode_size as usize {
                opcodes[i] = bus.read(BusMaster::Debug, address.wrapping_add(i as u16));
            }

            let changed = match self.debug.records.get(&address) {
                Some(record) => {
                    record.size == 0
                        || record.opcodes[..opcode_size as usize] != opcodes[..opcode_size as usize]
                }
                None => true,
            };

            if changed {
                self.invalidate_overlapping_records(address, opcode_size);
                let saved_irq = self.debug.next_irq;
                self.debug.next_irq = 0;
                self.populate_record(address, opcodes, opcode_size);
                self.debug.next_irq = saved_irq;
            }

            if let Some(record) = self.debug.records.get(&address)
                && record.jump
                && record.jump_address != 0
            {
                let jump_address = record.jump_address;
                self.disassemble_ahead_from(bus, jump_address, count / 2, depth + 1);
            }

            address = address.wrapping_add(opcode_size as u16);
            disassembled += 1;

            // Stop at unconditional control flow (end of block).
            if matches!(opcode, 0x40 | 0x4C | 0x60 | 0x6C | 0x7C | 0x80) {
                break;
            }
        }
    }
}
