use std::fmt;

use crate::mode::Mode;

/// A decoded opcode. Register operands are raw 4-bit indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    ClearScreen,
    Return,
    Jump(u16),
    Call(u16),
    SkipIfEqual(u8, u8),
    SkipIfNotEqual(u8, u8),
    SkipIfRegistersEqual(u8, u8),
    SkipIfRegistersNotEqual(u8, u8),
    Load(u8, u8),
    AddImmediate(u8, u8),
    Copy(u8, u8),
    Or(u8, u8),
    And(u8, u8),
    Xor(u8, u8),
    Add(u8, u8),
    Subtract(u8, u8),
    ShiftRight(u8),
    SubtractReverse(u8, u8),
    ShiftLeft(u8),
    Multiply(u8, u8),
    Divide(u8, u8),
    VectorAdd(u8, u8),
    DotProduct(u8, u8),
    RotateRight(u8, u8),
    RotateLeft(u8, u8),
    PopCount(u8),
    SetIndex(u16),
    JumpOffset(u16),
    BlockCopy(u8),
    BlockSearch(u8),
    Random(u8, u8),
    RandomFull(u8),
    RandomBounded(u8),
    Draw(u8, u8, u8),
    DrawSprite16,
    DrawSprite32,
    HorizontalLine,
    VerticalLine,
    CallWithParams(u8),
    ReturnWithValue(u8),
    SkipIfKeyDown(u8),
    SkipIfKeyUp(u8),
    ReadDelay(u8),
    WaitKey(u8),
    SetDelay(u8),
    SetSound(u8),
    AddIndex(u8),
    LoadGlyph(u8),
    StoreBcd(u8),
    StoreRegisters(u8),
    LoadRegisters(u8),
}

impl Instruction {
    /// Decodes `opcode` as seen by a machine running in `mode`. `None` means
    /// the bit pattern has no instruction in that mode.
    pub fn decode(opcode: u16, mode: Mode) -> Option<Self> {
        use Instruction::*;

        let profile = mode.profile();
        let extended = profile.extended_opcodes;

        let nibbles = [
            (opcode >> 12) as u8 & 0xF,
            (opcode >> 8) as u8 & 0xF,
            (opcode >> 4) as u8 & 0xF,
            opcode as u8 & 0xF,
        ];
        let address = opcode & 0x0FFF;
        let immediate_value = opcode as u8;

        let instruction = match nibbles {
            [0x0, 0x0, 0xE, 0x0] => ClearScreen,
            [0x0, 0x0, 0xE, 0xE] => Return,
            [0x1, _, _, _] => Jump(address),
            [0x2, _, _, _] => Call(address),
            [0x3, vx, _, _] => SkipIfEqual(vx, immediate_value),
            [0x4, vx, _, _] => SkipIfNotEqual(vx, immediate_value),
            [0x5, vx, vy, 0x0] => SkipIfRegistersEqual(vx, vy),
            [0x5, vx, vy, 0x1] if extended => Multiply(vx, vy),
            [0x5, vx, vy, 0x2] if extended => Divide(vx, vy),
            [0x5, vx, vy, 0x3] if extended => VectorAdd(vx, vy),
            [0x5, vx, vy, 0x4] if extended => DotProduct(vx, vy),
            [0x6, vx, _, _] => Load(vx, immediate_value),
            [0x7, vx, _, _] => AddImmediate(vx, immediate_value),
            [0x8, vx, vy, 0x0] => Copy(vx, vy),
            [0x8, vx, vy, 0x1] => Or(vx, vy),
            [0x8, vx, vy, 0x2] => And(vx, vy),
            [0x8, vx, vy, 0x3] => Xor(vx, vy),
            [0x8, vx, vy, 0x4] => Add(vx, vy),
            [0x8, vx, vy, 0x5] => Subtract(vx, vy),
            [0x8, vx, _, 0x6] => ShiftRight(vx),
            [0x8, vx, vy, 0x7] => SubtractReverse(vx, vy),
            [0x8, vx, _, 0xE] => ShiftLeft(vx),
            [0x9, vx, vy, 0x0] => SkipIfRegistersNotEqual(vx, vy),
            [0x9, vx, vy, 0x1] if extended => RotateRight(vx, vy),
            [0x9, vx, vy, 0x2] if extended => RotateLeft(vx, vy),
            [0x9, vx, _, 0x3] if extended => PopCount(vx),
            [0xA, _, _, _] => SetIndex(address),
            // the low nibble selects a block operation once extended opcodes exist
            [0xB, _, _, _] if !extended => JumpOffset(address),
            [0xB, _, _, 0x0] => JumpOffset(address),
            [0xB, vx, _, 0x1] => BlockCopy(vx),
            [0xB, vx, _, 0x2] => BlockSearch(vx),
            [0xC, vx, _, _] => Random(vx, immediate_value),
            [0xD, vx, vy, height] => Draw(vx, vy, height),
            [0xE, vx, 0x0, 0x1] if extended => CallWithParams(vx),
            [0xE, vx, 0x0, 0x2] if extended => ReturnWithValue(vx),
            [0xE, vx, 0x0, 0x3] if extended => RandomFull(vx),
            [0xE, vx, 0x0, 0x4] if extended => RandomBounded(vx),
            [0xE, vx, 0x9, 0xE] => SkipIfKeyDown(vx),
            [0xE, vx, 0xA, 0x1] => SkipIfKeyUp(vx),
            [0xF, _, 0x0, 0x1] if extended => DrawSprite16,
            [0xF, _, 0x0, 0x2] if extended => HorizontalLine,
            [0xF, _, 0x0, 0x3] if extended => VerticalLine,
            [0xF, _, 0x0, 0x4] if profile.large_sprites => DrawSprite32,
            [0xF, vx, 0x0, 0x7] => ReadDelay(vx),
            [0xF, vx, 0x0, 0xA] => WaitKey(vx),
            [0xF, vx, 0x1, 0x5] => SetDelay(vx),
            [0xF, vx, 0x1, 0x8] => SetSound(vx),
            [0xF, vx, 0x1, 0xE] => AddIndex(vx),
            [0xF, vx, 0x2, 0x9] => LoadGlyph(vx),
            [0xF, vx, 0x3, 0x3] => StoreBcd(vx),
            [0xF, vx, 0x5, 0x5] => StoreRegisters(vx),
            [0xF, vx, 0x6, 0x5] => LoadRegisters(vx),
            _ => return None,
        };
        Some(instruction)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;

        match *self {
            ClearScreen => write!(f, "CLS"),
            Return => write!(f, "RET"),
            Jump(address) => write!(f, "JP {address:#05X}"),
            Call(address) => write!(f, "CALL {address:#05X}"),
            SkipIfEqual(x, kk) => write!(f, "SE V{x:X}, {kk:#04X}"),
            SkipIfNotEqual(x, kk) => write!(f, "SNE V{x:X}, {kk:#04X}"),
            SkipIfRegistersEqual(x, y) => write!(f, "SE V{x:X}, V{y:X}"),
            SkipIfRegistersNotEqual(x, y) => write!(f, "SNE V{x:X}, V{y:X}"),
            Load(x, kk) => write!(f, "LD V{x:X}, {kk:#04X}"),
            AddImmediate(x, kk) => write!(f, "ADD V{x:X}, {kk:#04X}"),
            Copy(x, y) => write!(f, "LD V{x:X}, V{y:X}"),
            Or(x, y) => write!(f, "OR V{x:X}, V{y:X}"),
            And(x, y) => write!(f, "AND V{x:X}, V{y:X}"),
            Xor(x, y) => write!(f, "XOR V{x:X}, V{y:X}"),
            Add(x, y) => write!(f, "ADD V{x:X}, V{y:X}"),
            Subtract(x, y) => write!(f, "SUB V{x:X}, V{y:X}"),
            ShiftRight(x) => write!(f, "SHR V{x:X}"),
            SubtractReverse(x, y) => write!(f, "SUBN V{x:X}, V{y:X}"),
            ShiftLeft(x) => write!(f, "SHL V{x:X}"),
            Multiply(x, y) => write!(f, "MUL V{x:X}, V{y:X}"),
            Divide(x, y) => write!(f, "DIV V{x:X}, V{y:X}"),
            VectorAdd(x, y) => write!(f, "VADD V{x:X}, V{y:X}"),
            DotProduct(x, y) => write!(f, "DOT V{x:X}, V{y:X}"),
            RotateRight(x, y) => write!(f, "ROR V{x:X}, V{y:X}"),
            RotateLeft(x, y) => write!(f, "ROL V{x:X}, V{y:X}"),
            PopCount(x) => write!(f, "POPCNT V{x:X}"),
            SetIndex(address) => write!(f, "LD I, {address:#05X}"),
            JumpOffset(address) => write!(f, "JP V0, {address:#05X}"),
            BlockCopy(x) => write!(f, "MEMCPY V{x:X}"),
            BlockSearch(x) => write!(f, "MEMSRCH V{x:X}"),
            Random(x, kk) => write!(f, "RND V{x:X}, {kk:#04X}"),
            RandomFull(x) => write!(f, "RNDW V{x:X}"),
            RandomBounded(x) => write!(f, "RNDR V{x:X}"),
            Draw(x, y, n) => write!(f, "DRW V{x:X}, V{y:X}, {n}"),
            DrawSprite16 => write!(f, "DRW16 V2, V3"),
            DrawSprite32 => write!(f, "DRW32 V2, V3"),
            HorizontalLine => write!(f, "HLINE V2, V3, V4, V5"),
            VerticalLine => write!(f, "VLINE V2, V3, V4, V5"),
            CallWithParams(x) => write!(f, "CALLP {x}"),
            ReturnWithValue(x) => write!(f, "RETV V{x:X}"),
            SkipIfKeyDown(x) => write!(f, "SKP V{x:X}"),
            SkipIfKeyUp(x) => write!(f, "SKNP V{x:X}"),
            ReadDelay(x) => write!(f, "LD V{x:X}, DT"),
            WaitKey(x) => write!(f, "LD V{x:X}, K"),
            SetDelay(x) => write!(f, "LD DT, V{x:X}"),
            SetSound(x) => write!(f, "LD ST, V{x:X}"),
            AddIndex(x) => write!(f, "ADD I, V{x:X}"),
            LoadGlyph(x) => write!(f, "LD F, V{x:X}"),
            StoreBcd(x) => write!(f, "LD B, V{x:X}"),
            StoreRegisters(x) => write!(f, "LD [I], V{x:X}"),
            LoadRegisters(x) => write!(f, "LD V{x:X}, [I]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Instruction::*;

    #[test]
    fn test_decode_fields() {
        assert_eq!(Instruction::decode(0xA234, Mode::Legacy8), Some(SetIndex(0x234)));
        assert_eq!(Instruction::decode(0x6C05, Mode::Legacy8), Some(Load(0xC, 0x05)));
        assert_eq!(Instruction::decode(0xD12F, Mode::Legacy8), Some(Draw(1, 2, 0xF)));
        assert_eq!(Instruction::decode(0x8AB4, Mode::Legacy8), Some(Add(0xA, 0xB)));
    }

    #[test]
    fn test_extended_math_needs_extended_mode() {
        assert_eq!(Instruction::decode(0x5121, Mode::Legacy8), None);
        assert_eq!(Instruction::decode(0x5121, Mode::Extended16), Some(Multiply(1, 2)));
        assert_eq!(Instruction::decode(0x9343, Mode::Legacy8), None);
        assert_eq!(Instruction::decode(0x9343, Mode::Extended64), Some(PopCount(3)));
    }

    #[test]
    fn test_jump_offset_low_nibble() {
        assert_eq!(Instruction::decode(0xB123, Mode::Legacy8), Some(JumpOffset(0x123)));
        assert_eq!(Instruction::decode(0xB120, Mode::Extended16), Some(JumpOffset(0x120)));
        assert_eq!(Instruction::decode(0xB401, Mode::Extended16), Some(BlockCopy(4)));
        assert_eq!(Instruction::decode(0xB502, Mode::Extended64), Some(BlockSearch(5)));
        assert_eq!(Instruction::decode(0xB123, Mode::Extended16), None);
    }

    #[test]
    fn test_large_sprite_only_in_64bit() {
        assert_eq!(Instruction::decode(0xF004, Mode::Extended16), None);
        assert_eq!(Instruction::decode(0xF004, Mode::Extended64), Some(DrawSprite32));
        assert_eq!(Instruction::decode(0xF001, Mode::Extended16), Some(DrawSprite16));
        assert_eq!(Instruction::decode(0xF001, Mode::Legacy8), None);
    }

    #[test]
    fn test_unmapped_sub_opcodes() {
        assert_eq!(Instruction::decode(0x0123, Mode::Extended64), None);
        assert_eq!(Instruction::decode(0x5125, Mode::Extended64), None);
        assert_eq!(Instruction::decode(0x8128, Mode::Legacy8), None);
        assert_eq!(Instruction::decode(0xE19F, Mode::Legacy8), None);
        assert_eq!(Instruction::decode(0xF1FF, Mode::Extended64), None);
    }

    #[test]
    fn test_mnemonics() {
        assert_eq!(SetIndex(0x234).to_string(), "LD I, 0x234");
        assert_eq!(Draw(1, 2, 5).to_string(), "DRW V1, V2, 5");
        assert_eq!(Load(0xA, 0x05).to_string(), "LD VA, 0x05");
    }
}
