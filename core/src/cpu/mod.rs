pub mod m65c02;
pub mod state;

pub use m65c02::M65C02;
pub use state::{CpuStateTrait, M65C02State};
