use rand::Rng;

use crate::{
    error::StepError,
    font::glyph_address,
    instruction::Instruction,
    machine::Machine,
    mode::STACK_DEPTH,
};

/// Stack slots a call-with-parameters frame occupies.
const PARAMETER_FRAME: usize = 4;

/// Bytes block search scans past `I`.
const SEARCH_WINDOW: usize = 256;

/// Registers saved by a call-with-parameters frame besides the flags register.
const PARAMETER_HIGH: usize = 0xD;
const PARAMETER_LOW: usize = 0xE;

impl Machine {
    /// Applies one decoded instruction. The program counter must already point
    /// at the following instruction. On error nothing has been modified.
    pub fn execute(&mut self, instruction: Instruction) -> Result<(), StepError> {
        use Instruction::*;

        let mask = self.profile.mask();
        let width = self.profile.bit_width;

        match instruction {
            ClearScreen => {
                self.framebuffer.clear();
                self.needs_redraw = true;
            }
            Return => {
                if self.stack_pointer == 0 {
                    return Err(self.stack_underflow(1));
                }
                self.stack_pointer -= 1;
                self.jump(self.stack[self.stack_pointer]);
            }
            Jump(address) => self.jump(address as u64),
            Call(address) => {
                if self.stack_pointer >= STACK_DEPTH {
                    return Err(self.stack_overflow(1));
                }
                self.stack[self.stack_pointer] = self.program_counter as u64;
                self.stack_pointer += 1;
                self.jump(address as u64);
            }
            SkipIfEqual(x, kk) => self.skip_if(self.vx(x) == kk as u64),
            SkipIfNotEqual(x, kk) => self.skip_if(self.vx(x) != kk as u64),
            SkipIfRegistersEqual(x, y) => self.skip_if(self.vx(x) == self.vx(y)),
            SkipIfRegistersNotEqual(x, y) => self.skip_if(self.vx(x) != self.vx(y)),
            Load(x, kk) => self.set_vx(x, kk as u64),
            AddImmediate(x, kk) => self.set_vx(x, self.vx(x).wrapping_add(kk as u64)),
            Copy(x, y) => self.set_vx(x, self.vx(y)),
            Or(x, y) => self.set_vx(x, self.vx(x) | self.vx(y)),
            And(x, y) => self.set_vx(x, self.vx(x) & self.vx(y)),
            Xor(x, y) => self.set_vx(x, self.vx(x) ^ self.vx(y)),
            Add(x, y) => {
                let sum = self.vx(x) as u128 + self.vx(y) as u128;
                self.set_vx(x, sum as u64);
                self.set_flag((sum > mask as u128) as u64);
            }
            Subtract(x, y) => {
                let (minuend, subtrahend) = (self.vx(x), self.vx(y));
                self.set_vx(x, minuend.wrapping_sub(subtrahend));
                self.set_flag((minuend >= subtrahend) as u64);
            }
            ShiftRight(x) => {
                let value = self.vx(x);
                self.set_vx(x, value >> 1);
                self.set_flag(value & 1);
            }
            SubtractReverse(x, y) => {
                let (subtrahend, minuend) = (self.vx(x), self.vx(y));
                self.set_vx(x, minuend.wrapping_sub(subtrahend));
                self.set_flag((minuend >= subtrahend) as u64);
            }
            ShiftLeft(x) => {
                let value = self.vx(x);
                self.set_vx(x, value << 1);
                self.set_flag((value >> (width - 1)) & 1);
            }
            Multiply(x, y) => {
                let product = self.vx(x) as u128 * self.vx(y) as u128;
                self.set_vx(x, product as u64);
                self.set_flag((product > mask as u128) as u64);
            }
            Divide(x, y) => {
                let (dividend, divisor) = (self.vx(x), self.vx(y));
                if divisor == 0 {
                    self.set_vx(x, self.profile.max_value());
                    self.set_flag(0);
                } else {
                    self.set_vx(x, dividend / divisor);
                    self.set_flag(dividend % divisor);
                }
            }
            VectorAdd(x, y) => {
                let (next_x, next_y) = (self.next_register(x), self.next_register(y));
                let first = self.vx(x).wrapping_add(self.vx(y));
                let second = self.registers[next_x].wrapping_add(self.registers[next_y]);
                self.set_vx(x, first);
                self.set_register(next_x, second);
            }
            DotProduct(x, y) => {
                let (next_x, next_y) = (self.next_register(x), self.next_register(y));
                let product = (self.vx(x) as u128 * self.vx(y) as u128).wrapping_add(
                    self.registers[next_x] as u128 * self.registers[next_y] as u128,
                );
                self.set_vx(x, product as u64);
                self.set_flag((product >> width) as u64);
            }
            RotateRight(x, y) => {
                let shift = (self.vx(y) % width as u64) as u32;
                self.set_vx(x, rotate_right(self.vx(x), shift, width));
            }
            RotateLeft(x, y) => {
                let shift = (self.vx(y) % width as u64) as u32;
                self.set_vx(x, rotate_right(self.vx(x), (width - shift) % width, width));
            }
            PopCount(x) => self.set_vx(x, self.vx(x).count_ones() as u64),
            SetIndex(address) => self.index_register = address as u64,
            JumpOffset(address) => self.jump(address as u64 + (self.registers[0] & 0xFFFF)),
            BlockCopy(x) => self.block_copy(self.vx(x) & 0xFFFF)?,
            BlockSearch(x) => self.block_search(self.vx(x)),
            Random(x, kk) => {
                let value: u8 = self.rng.gen();
                self.set_vx(x, (value & kk) as u64);
            }
            RandomFull(x) => {
                let value: u64 = self.rng.gen();
                self.set_vx(x, value);
            }
            RandomBounded(x) => {
                let bound = self.registers[self.next_register(x)];
                let value = if bound == 0 { 0 } else { self.rng.gen_range(0..bound) };
                self.set_vx(x, value);
            }
            Draw(x, y, height) => self.draw_sprite(self.vx(x), self.vx(y), height as usize, 1),
            DrawSprite16 => self.draw_sprite(self.registers[2], self.registers[3], 16, 2),
            DrawSprite32 => self.draw_sprite(self.registers[2], self.registers[3], 32, 4),
            HorizontalLine => self.draw_line(true),
            VerticalLine => self.draw_line(false),
            CallWithParams(count) => {
                if self.stack_pointer + PARAMETER_FRAME > STACK_DEPTH {
                    return Err(self.stack_overflow(PARAMETER_FRAME));
                }
                let flag_register = self.profile.flag_register();
                let frame = [
                    self.program_counter as u64,
                    self.registers[PARAMETER_HIGH],
                    self.registers[PARAMETER_LOW],
                    self.registers[flag_register],
                ];
                self.stack[self.stack_pointer..self.stack_pointer + PARAMETER_FRAME]
                    .copy_from_slice(&frame);
                self.stack_pointer += PARAMETER_FRAME;

                let parameters = self.registers[1];
                self.set_register(PARAMETER_HIGH, (parameters >> 8) & 0xFF);
                self.set_register(PARAMETER_LOW, parameters & 0xFF);
                self.set_flag(count as u64);
                self.jump(self.registers[0] & 0xFFFF);
            }
            ReturnWithValue(x) => {
                if self.stack_pointer < PARAMETER_FRAME {
                    return Err(self.stack_underflow(PARAMETER_FRAME));
                }
                let value = self.vx(x);
                self.stack_pointer -= PARAMETER_FRAME;
                let base = self.stack_pointer;
                self.set_register(PARAMETER_HIGH, self.stack[base + 1]);
                self.set_register(PARAMETER_LOW, self.stack[base + 2]);
                self.set_flag(self.stack[base + 3]);
                self.set_register(0, value);
                self.jump(self.stack[base]);
            }
            SkipIfKeyDown(x) => self.skip_if(self.keys[(self.vx(x) & 0xF) as usize]),
            SkipIfKeyUp(x) => self.skip_if(!self.keys[(self.vx(x) & 0xF) as usize]),
            ReadDelay(x) => self.set_vx(x, self.delay_timer as u64),
            WaitKey(x) => match self.keys.iter().position(|&pressed| pressed) {
                Some(key) => self.set_vx(x, key as u64),
                None => self.rewind(),
            },
            SetDelay(x) => self.delay_timer = self.vx(x) as u8,
            SetSound(x) => self.sound_timer = self.vx(x) as u8,
            AddIndex(x) => self.index_register = self.index_register.wrapping_add(self.vx(x)),
            LoadGlyph(x) => {
                self.index_register = glyph_address(self.vx(x), self.mode, self.font_policy) as u64
            }
            StoreBcd(x) => {
                let mut value = self.vx(x);
                for digit in (0..self.profile.bcd_digits).rev() {
                    let address = self.index_register.wrapping_add(digit as u64);
                    self.write_byte(address, (value % 10) as u8);
                    value /= 10;
                }
            }
            StoreRegisters(x) => {
                let last = self.register_slot(x);
                let bytes_per_register = self.profile.bytes_per_register;
                for register_index in 0..=last {
                    let bytes = self.register(register_index).to_be_bytes();
                    let base = register_index * bytes_per_register;
                    for (offset, &byte) in bytes[8 - bytes_per_register..].iter().enumerate() {
                        let address = self.index_register.wrapping_add((base + offset) as u64);
                        self.write_byte(address, byte);
                    }
                }
                self.advance_index(last);
            }
            LoadRegisters(x) => {
                let last = self.register_slot(x);
                let bytes_per_register = self.profile.bytes_per_register;
                for register_index in 0..=last {
                    let base = register_index * bytes_per_register;
                    let value = (0..bytes_per_register).fold(0u64, |value, offset| {
                        let address = self.index_register.wrapping_add((base + offset) as u64);
                        (value << 8) | self.read_byte(address) as u64
                    });
                    self.set_register(register_index, value);
                }
                self.advance_index(last);
            }
        }
        Ok(())
    }

    /// Register operands wrap into the active register file.
    fn register_slot(&self, x: u8) -> usize {
        x as usize % self.profile.register_count
    }

    fn vx(&self, x: u8) -> u64 {
        self.register(x as usize)
    }

    fn set_vx(&mut self, x: u8, value: u64) {
        self.set_register(x as usize, value);
    }

    fn next_register(&self, x: u8) -> usize {
        (x as usize + 1) % self.profile.register_count
    }

    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.jump(self.program_counter as u64 + 2);
        }
    }

    /// Points the program counter back at the instruction being executed.
    fn rewind(&mut self) {
        let len = self.memory.len() as u64;
        self.jump(self.program_counter as u64 + len - 2);
    }

    fn instruction_address(&self) -> u16 {
        let len = self.memory.len();
        ((self.program_counter as usize + len - 2) % len) as u16
    }

    fn stack_overflow(&self, needed: usize) -> StepError {
        StepError::StackOverflow {
            address: self.instruction_address(),
            depth: self.stack_pointer,
            needed,
        }
    }

    fn stack_underflow(&self, needed: usize) -> StepError {
        StepError::StackUnderflow {
            address: self.instruction_address(),
            depth: self.stack_pointer,
            needed,
        }
    }

    fn advance_index(&mut self, last: usize) {
        if self.profile.auto_increment_index {
            let transferred = (last as u64 + 1) * self.profile.bytes_per_register as u64;
            self.index_register = self.index_register.wrapping_add(transferred);
        }
    }

    /// Moves `count` bytes from `I` to `I + count`. Both ranges must lie in
    /// memory; `copy_within` has memmove semantics for any overlap.
    fn block_copy(&mut self, count: u64) -> Result<(), StepError> {
        let source = self.index_register;
        let destination = source.wrapping_add(count);
        let len = self.memory.len() as u64;
        for start in [source, destination] {
            if start.checked_add(count).map_or(true, |end| end > len) {
                return Err(StepError::MemoryOutOfBounds {
                    address: start,
                    len: count,
                });
            }
        }
        let (source, destination, count) = (source as usize, destination as usize, count as usize);
        self.memory.copy_within(source..source + count, destination);
        Ok(())
    }

    /// Scans the window after `I` for `value` in register-width big-endian
    /// units. VF gets the unit offset of the first match or the max value.
    fn block_search(&mut self, value: u64) {
        let unit = self.profile.bytes_per_register;
        let start = self.index_register;
        let len = self.memory.len() as u64;

        let found = (0..SEARCH_WINDOW)
            .step_by(unit)
            .take_while(|&offset| start.saturating_add((offset + unit) as u64) <= len)
            .find(|&offset| {
                let base = start as usize + offset;
                let candidate = self.memory[base..base + unit]
                    .iter()
                    .fold(0u64, |acc, &byte| (acc << 8) | byte as u64);
                candidate == value
            });

        match found {
            Some(offset) => self.set_flag((offset / unit) as u64),
            None => self.set_flag(self.profile.max_value()),
        }
    }

    /// XORs a `rows` tall sprite, `bytes_per_row` bytes wide, from `I` onto the
    /// framebuffer. VF reports whether any lit pixel was switched off.
    fn draw_sprite(&mut self, x: u64, y: u64, rows: usize, bytes_per_row: usize) {
        let origin_x = (x % self.framebuffer.width() as u64) as usize;
        let origin_y = (y % self.framebuffer.height() as u64) as usize;
        let columns = bytes_per_row * 8;

        let mut collision = false;
        for row in 0..rows {
            let line = (0..bytes_per_row).fold(0u64, |line, byte| {
                let address = self
                    .index_register
                    .wrapping_add((row * bytes_per_row + byte) as u64);
                (line << 8) | self.read_byte(address) as u64
            });
            for column in 0..columns {
                if line & (1 << (columns - 1 - column)) != 0 {
                    collision |= self.framebuffer.xor_pixel(origin_x + column, origin_y + row);
                }
            }
        }
        self.set_flag(collision as u64);
        self.needs_redraw = true;
    }

    /// Line from (V2, V3), V4 pixels long, lit where the 16-bit pattern in V5
    /// has a bit set. A zero or overlong length runs to the display edge.
    fn draw_line(&mut self, horizontal: bool) {
        let (width, height) = (self.framebuffer.width(), self.framebuffer.height());
        let x = (self.registers[2] % width as u64) as usize;
        let y = (self.registers[3] % height as u64) as usize;
        let remaining = if horizontal { width - x } else { height - y };
        let length = match self.registers[4] as usize {
            0 => remaining,
            length if length > remaining => remaining,
            length => length,
        };
        let pattern = self.registers[5];

        let mut collision = false;
        for step in 0..length {
            if pattern & (0x8000 >> (step % 16)) == 0 {
                continue;
            }
            collision |= if horizontal {
                self.framebuffer.xor_pixel(x + step, y)
            } else {
                self.framebuffer.xor_pixel(x, y + step)
            };
        }
        self.set_flag(collision as u64);
        self.needs_redraw = true;
    }
}

fn rotate_right(value: u64, shift: u32, width: u32) -> u64 {
    if shift == 0 {
        value
    } else {
        (value >> shift) | (value << (width - shift))
    }
}
