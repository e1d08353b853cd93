pub mod cartridge;
pub mod debugger;
pub mod error;
pub mod gameboy;
pub mod joypad;
pub mod lr35902;
pub mod memory;
pub mod renderer;
pub mod storage;
mod tests;

pub use crate::debugger::{Breakpoint, DebugConfig};
pub use crate::error::DmgError;
pub use crate::gameboy::{Device, DeviceControl, Exit, StepOutcome};
