//! CPU conformance harness: a tracing bus, JSON vector types and a
//! reference-vector generator shared by the `gen_m65c02_tests` binary and
//! the single-step tests.

use glint_core::core::{Bus, BusMaster, InterruptState};
use glint_core::cpu::M65C02;
use glint_core::cpu::m65c02::{FLAG_BREAK, FLAG_UNUSED, OPCODE_SIZES};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

// --- TracingBus: flat 64KB memory with access recording ---

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusOp {
    Read,
    Write,
}

#[derive(Clone, Debug)]
pub struct BusAccess {
    pub addr: u16,
    pub data: u8,
    pub op: BusOp,
}

pub struct TracingBus {
    pub memory: Box<[u8; 0x10000]>,
    pub accesses: Vec<BusAccess>,
    pub irq: bool,
    pub nmi: bool,
}

impl TracingBus {
    pub fn new() -> Self {
        Self {
            memory: vec![0u8; 0x10000].into_boxed_slice().try_into().unwrap(),
            accesses: Vec::new(),
            irq: false,
            nmi: false,
        }
    }

    pub fn load(&mut self, addr: u16, data: &[u8]) {
        let start = addr as usize;
        self.memory[start..start + data.len()].copy_from_slice(data);
    }

    pub fn clear_accesses(&mut self) {
        self.accesses.clear();
    }
}

impl Default for TracingBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for TracingBus {
    type Address = u16;
    type Data = u8;

    fn read(&mut self, master: BusMaster, addr: u16) -> u8 {
        let data = self.memory[addr as usize];
        if master != BusMaster::Debug {
            self.accesses.push(BusAccess {
                addr,
                data,
                op: BusOp::Read,
            });
        }
        data
    }

    fn write(&mut self, master: BusMaster, addr: u16, data: u8) {
        self.memory[addr as usize] = data;
        if master != BusMaster::Debug {
            self.accesses.push(BusAccess {
                addr,
                data,
                op: BusOp::Write,
            });
        }
    }

    fn check_interrupts(&self, _target: BusMaster) -> InterruptState {
        InterruptState {
            nmi: self.nmi,
            irq: self.irq,
        }
    }
}

// --- JSON test vector types ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct M65C02TestCase {
    pub name: String,
    pub initial: M65C02CpuState,
    #[serde(rename = "final")]
    pub final_state: M65C02CpuState,
    /// Master-clock ticks returned by the instruction.
    pub ticks: u32,
    /// Bus traffic as (address, data, "read"|"write") tuples.
    pub accesses: Vec<(u16, u8, String)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct M65C02CpuState {
    pub pc: u16,
    pub s: u8,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub p: u8,
    pub ram: Vec<(u16, u8)>,
}

/// Documented opcodes of the 65C02 extension set used by the Lynx.
pub const DOCUMENTED_OPCODES: &[u8] = &[
    0x00, 0x01, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0C, 0x0D, 0x0E, 0x0F, 0x10, 0x11,
    0x12, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1A, 0x1C, 0x1D, 0x1E, 0x1F, 0x20, 0x21, 0x24,
    0x25, 0x26, 0x27, 0x28, 0x29, 0x2A, 0x2C, 0x2D, 0x2E, 0x2F, 0x30, 0x31, 0x32, 0x34, 0x35,
    0x36, 0x37, 0x38, 0x39, 0x3A, 0x3C, 0x3D, 0x3E, 0x3F, 0x40, 0x41, 0x45, 0x46, 0x47, 0x48,
    0x49, 0x4A, 0x4C, 0x4D, 0x4E, 0x4F, 0x50, 0x51, 0x52, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5A,
    0x5D, 0x5E, 0x5F, 0x60, 0x61, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69, 0x6A, 0x6C, 0x6D, 0x6E,
    0x6F, 0x70, 0x71, 0x72, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7A, 0x7C, 0x7D, 0x7E, 0x7F,
    0x80, 0x81, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89, 0x8A, 0x8C, 0x8D, 0x8E, 0x8F, 0x90, 0x91,
    0x92, 0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9A, 0x9C, 0x9D, 0x9E, 0x9F, 0xA0, 0xA1, 0xA2,
    0xA4, 0xA5, 0xA6, 0xA7, 0xA8, 0xA9, 0xAA, 0xAC, 0xAD, 0xAE, 0xAF, 0xB0, 0xB1, 0xB2, 0xB4,
    0xB5, 0xB6, 0xB7, 0xB8, 0xB9, 0xBA, 0xBC, 0xBD, 0xBE, 0xBF, 0xC0, 0xC1, 0xC4, 0xC5, 0xC6,
    0xC7, 0xC8, 0xC9, 0xCA, 0xCC, 0xCD, 0xCE, 0xCF, 0xD0, 0xD1, 0xD2, 0xD5, 0xD6, 0xD7, 0xD8,
    0xD9, 0xDA, 0xDD, 0xDE, 0xDF, 0xE0, 0xE1, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8, 0xE9, 0xEA, 0xEC,
    0xED, 0xEE, 0xEF, 0xF0, 0xF1, 0xF2, 0xF5, 0xF6, 0xF7, 0xF8, 0xF9, 0xFA, 0xFD, 0xFE, 0xFF,
];

/// Build one randomized test case for `opcode` and capture the reference
/// behavior of the interpreter.
pub fn generate_case(opcode: u8, index: u32, rng: &mut StdRng) -> M65C02TestCase {
    let mut cpu = M65C02::new();
    let mut bus = TracingBus::new();

    // Keep the program counter away from the vectors and the wrap point.
    let pc: u16 = rng.gen_range(0x0200..0xF000);
    cpu.pc = pc;
    cpu.s = rng.r#gen();
    cpu.a = rng.r#gen();
    cpu.x = rng.r#gen();
    cpu.y = rng.r#gen();
    // Unused stays set; decimal mode is exercised, interrupts stay masked.
    cpu.p = (rng.r#gen::<u8>() | FLAG_UNUSED | 0x04) & !FLAG_BREAK;

    for byte in bus.memory.iter_mut() {
        *byte = rng.r#gen();
    }
    bus.memory[pc as usize] = opcode;

    let mut initial = M65C02CpuState {
        pc: cpu.pc,
        s: cpu.s,
        a: cpu.a,
        x: cpu.x,
        y: cpu.y,
        p: cpu.p,
        ram: Vec::new(),
    };
    let pre_run = bus.memory.clone();

    let ticks = cpu.step(&mut bus);

    // Record the pre-run value of every address the instruction touched
    // (plus its own bytes), so a replay from a zeroed bus is faithful.
    let size = OPCODE_SIZES[opcode as usize] as u16;
    for i in 0..size {
        let addr = pc.wrapping_add(i);
        initial.ram.push((addr, pre_run[addr as usize]));
    }
    for access in &bus.accesses {
        if initial.ram.iter().all(|&(addr, _)| addr != access.addr) {
            initial.ram.push((access.addr, pre_run[access.addr as usize]));
        }
    }

    let accesses = bus
        .accesses
        .iter()
        .map(|a| {
            (
                a.addr,
                a.data,
                match a.op {
                    BusOp::Read => "read".to_string(),
                    BusOp::Write => "write".to_string(),
                },
            )
        })
        .collect();

    let final_ram = bus
        .accesses
        .iter()
        .filter(|a| a.op == BusOp::Write)
        .map(|a| (a.addr, bus.memory[a.addr as usize]))
        .collect();

    let final_state = M65C02CpuState {
        pc: cpu.pc,
        s: cpu.s,
        a: cpu.a,
        x: cpu.x,
        y: cpu.y,
        p: cpu.p,
        ram: final_ram,
    };

    M65C02TestCase {
        name: format!("{opcode:02x} {index}"),
        initial,
        final_state,
        ticks,
        accesses,
    }
}
