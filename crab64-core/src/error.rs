use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("ROM is too large ({size} bytes), max size is {max} bytes")]
    RomTooLarge { size: usize, max: usize },
}

/// Conditions a single `step` can report. None of them leave the machine in
/// a partially updated state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    #[error("unknown opcode {opcode:#06X} at {address:#06X}")]
    UnknownOpcode { opcode: u16, address: u16 },

    #[error("stack overflow at {address:#06X}: depth {depth}, {needed} slot(s) needed")]
    StackOverflow {
        address: u16,
        depth: usize,
        needed: usize,
    },

    #[error("stack underflow at {address:#06X}: depth {depth}, {needed} slot(s) needed")]
    StackUnderflow {
        address: u16,
        depth: usize,
        needed: usize,
    },

    #[error("memory access out of bounds: {len} byte(s) at {address:#X}")]
    MemoryOutOfBounds { address: u64, len: u64 },
}
