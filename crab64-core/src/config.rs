use crate::{effects::GraphicsEffect, font::FontPolicy, mode::Mode};

pub const DEFAULT_INSTRUCTIONS_PER_SECOND: u32 = 700;

/// Settings an embedding application hands to the interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub instructions_per_second: u32,
    /// Mode applied after every reset.
    pub mode: Mode,
    pub font_policy: FontPolicy,
    pub effect: GraphicsEffect,
    pub sound_enabled: bool,
    /// Fixed seed for the random instructions; entropy when unset.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            instructions_per_second: DEFAULT_INSTRUCTIONS_PER_SECOND,
            mode: Mode::Legacy8,
            font_policy: FontPolicy::FallbackToF,
            effect: GraphicsEffect::None,
            sound_enabled: true,
            seed: None,
        }
    }
}
