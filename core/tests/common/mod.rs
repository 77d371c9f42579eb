use glint_core::core::{Bus, BusMaster, InterruptState};

/// Minimal bus for testing: flat 64KB read/write memory plus directly
/// drivable interrupt lines.
pub struct TestBus {
    pub memory: Box<[u8; 0x10000]>,
    pub irq: bool,
    pub nmi: bool,
}

impl TestBus {
    pub fn new() -> Self {
        Self {
            memory: vec![0u8; 0x10000].into_boxed_slice().try_into().unwrap(),
            irq: false,
            nmi: false,
        }
    }

    pub fn load(&mut self, addr: u16, data: &[u8]) {
        let start = addr as usize;
        self.memory[start..start + data.len()].copy_from_slice(data);
    }
}

impl Bus for TestBus {
    type Address = u16;
    type Data = u8;

    fn read(&mut self, _master: BusMaster, addr: u16) -> u8 {
        self.memory[addr as usize]
    }

    fn write(&mut self, _master: BusMaster, addr: u16, data: u8) {
        self.memory[addr as usize] = data;
    }

    fn check_interrupts(&self, _target: BusMaster) -> InterruptState {
        InterruptState {
            nmi: self.nmi,
            irq: self.irq,
        }
    }
}
