use std::fmt;

/// Address the program image is loaded at, in every mode.
pub const PROGRAM_ORIGIN: u16 = 0x200;

/// Return-address slots on the call stack.
pub const STACK_DEPTH: usize = 16;

/// Number of hexadecimal keys on the keypad.
pub const KEY_COUNT: usize = 16;

/// Register storage is sized for the widest mode.
pub const MAX_REGISTERS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Legacy8,
    Extended16,
    Extended64,
}

impl Mode {
    pub fn profile(self) -> ModeProfile {
        match self {
            Mode::Legacy8 => ModeProfile {
                bit_width: 8,
                register_count: 16,
                memory_size: 0x1000,
                display_width: 64,
                display_height: 32,
                bcd_digits: 3,
                bytes_per_register: 1,
                auto_increment_index: false,
                extended_opcodes: false,
                large_sprites: false,
                color: false,
            },
            Mode::Extended16 => ModeProfile {
                bit_width: 16,
                register_count: 16,
                memory_size: 0x1000,
                display_width: 64,
                display_height: 32,
                bcd_digits: 5,
                bytes_per_register: 2,
                auto_increment_index: true,
                extended_opcodes: true,
                large_sprites: false,
                color: false,
            },
            Mode::Extended64 => ModeProfile {
                bit_width: 64,
                register_count: 32,
                memory_size: 0x10000,
                display_width: 128,
                display_height: 64,
                bcd_digits: 20,
                bytes_per_register: 8,
                auto_increment_index: true,
                extended_opcodes: true,
                large_sprites: true,
                color: true,
            },
        }
    }

    /// The mode a host "mode" button switches to.
    pub fn next(self) -> Self {
        match self {
            Mode::Legacy8 => Mode::Extended16,
            Mode::Extended16 => Mode::Extended64,
            Mode::Extended64 => Mode::Legacy8,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Legacy8 => write!(f, "8bit"),
            Mode::Extended16 => write!(f, "16bit"),
            Mode::Extended64 => write!(f, "64bit"),
        }
    }
}

/// Everything that differs between the three machine variants, derived once
/// per mode switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeProfile {
    pub bit_width: u32,
    pub register_count: usize,
    pub memory_size: usize,
    pub display_width: usize,
    pub display_height: usize,
    pub bcd_digits: usize,
    /// Bytes each register occupies in bulk store/load.
    pub bytes_per_register: usize,
    /// Whether bulk store/load advance `I` past the transferred bytes.
    pub auto_increment_index: bool,
    pub extended_opcodes: bool,
    /// 32x32 sprite drawing.
    pub large_sprites: bool,
    pub color: bool,
}

impl ModeProfile {
    pub fn mask(&self) -> u64 {
        if self.bit_width >= 64 {
            u64::MAX
        } else {
            (1u64 << self.bit_width) - 1
        }
    }

    /// Largest value a register can hold; doubles as the "not found" and
    /// division-by-zero result.
    pub fn max_value(&self) -> u64 {
        self.mask()
    }

    pub fn flag_register(&self) -> usize {
        self.register_count - 1
    }

    pub fn max_program_size(&self) -> usize {
        self.memory_size - PROGRAM_ORIGIN as usize
    }
}
