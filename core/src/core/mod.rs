pub mod bus;
pub mod cycles;
pub mod state;

pub use bus::{Bus, BusMaster, InterruptState};
pub use cycles::CycleBank;
pub use state::{StateReader, StateWriter};
