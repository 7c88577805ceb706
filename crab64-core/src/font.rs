use crate::mode::{Mode, PROGRAM_ORIGIN};

pub const GLYPH_SIZE: u16 = 5;

pub const FONT: [u8; 16 * 5] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// Extended glyphs live right after the hex font, 8 bytes each, and must end
/// below the program origin.
pub const EXTENDED_GLYPH_BASE: u16 = FONT.len() as u16;
pub const EXTENDED_GLYPH_SIZE: u16 = 8;
pub const EXTENDED_GLYPH_COUNT: u16 = (PROGRAM_ORIGIN - EXTENDED_GLYPH_BASE) / EXTENDED_GLYPH_SIZE;

const FALLBACK_GLYPH: u16 = 0xF * GLYPH_SIZE;

/// How `Fx29` resolves characters past the sixteen hex digits in the
/// extended modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontPolicy {
    /// Anything above `F` points at the `F` glyph.
    #[default]
    FallbackToF,
    /// Characters `0x10..` index the extended glyph region while it lasts.
    ExtendedGlyphs,
}

/// Address of the glyph for `character`.
pub fn glyph_address(character: u64, mode: Mode, policy: FontPolicy) -> u16 {
    if mode == Mode::Legacy8 {
        return (character & 0xF) as u16 * GLYPH_SIZE;
    }
    if character <= 0xF {
        return character as u16 * GLYPH_SIZE;
    }
    match policy {
        FontPolicy::ExtendedGlyphs if character - 0x10 < EXTENDED_GLYPH_COUNT as u64 => {
            EXTENDED_GLYPH_BASE + (character as u16 - 0x10) * EXTENDED_GLYPH_SIZE
        }
        _ => FALLBACK_GLYPH,
    }
}
