mod beeper;
pub mod config;
mod display;
pub mod effects;
pub mod error;
mod execute;
pub mod font;
pub mod framebuffer;
pub mod instruction;
mod interpreter;
mod keyboard;
pub mod machine;
pub mod mode;

pub use beeper::*;
pub use config::Config;
pub use display::*;
pub use effects::GraphicsEffect;
pub use error::{Error, LoadError, Result, StepError};
pub use font::FontPolicy;
pub use instruction::Instruction;
pub use interpreter::*;
pub use keyboard::*;
pub use machine::Machine;
pub use mode::{Mode, ModeProfile, KEY_COUNT, PROGRAM_ORIGIN, STACK_DEPTH};
