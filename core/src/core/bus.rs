/// Identifies who is accessing the bus.
///
/// Debugger accesses (disassembler look-ahead, memory viewers) must not
/// trigger MMIO side effects: a cartridge read increments the cart's page
/// offset counter, a UART data read pops the receive ring, and so on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusMaster {
    Cpu,
    /// Side-effect-free access: registers are sampled, never consumed.
    Debug,
}

/// Generic bus interface the CPU executes against.
pub trait Bus {
    type Address: Copy + Into<u64>; // u16 for 8-bit systems
    type Data; // u8

    fn read(&mut self, master: BusMaster, addr: Self::Address) -> Self::Data;
    fn write(&mut self, master: BusMaster, addr: Self::Address, data: Self::Data);

    /// Generic interrupt query, sampled by the CPU at instruction boundaries.
    fn check_interrupts(&self, target: BusMaster) -> InterruptState;
}

#[derive(Default, Clone, Copy, Debug)]
pub struct InterruptState {
    pub nmi: bool,
    pub irq: bool,
}
