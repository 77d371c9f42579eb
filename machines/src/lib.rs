pub mod lynx;
pub mod media;

pub use lynx::{BiosState, DebugRun, Key, LynxSystem, RuntimeInfo};
pub use media::{Media, MediaError};
