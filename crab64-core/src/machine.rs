use std::fmt;

use rand::{rngs::StdRng, SeedableRng};

use crate::{
    display::{DEFAULT_PALETTE, PALETTE_SIZE},
    effects::{EffectState, GraphicsEffect},
    error::{LoadError, StepError},
    font::{FontPolicy, FONT},
    framebuffer::Framebuffer,
    instruction::Instruction,
    mode::{Mode, ModeProfile, KEY_COUNT, MAX_REGISTERS, PROGRAM_ORIGIN, STACK_DEPTH},
};

/// The whole machine: memory, register file, call stack, timers, keypad and
/// display. Register values are kept masked to the active mode's width.
pub struct Machine {
    pub(crate) mode: Mode,
    pub(crate) profile: ModeProfile,
    pub(crate) font_policy: FontPolicy,
    pub(crate) memory: Vec<u8>,
    pub(crate) registers: [u64; MAX_REGISTERS],
    pub(crate) index_register: u64,
    pub(crate) program_counter: u16,
    pub(crate) stack: [u64; STACK_DEPTH],
    pub(crate) stack_pointer: usize,
    pub(crate) delay_timer: u8,
    pub(crate) sound_timer: u8,
    pub(crate) keys: [bool; KEY_COUNT],
    pub(crate) framebuffer: Framebuffer,
    pub(crate) effects: EffectState,
    pub(crate) color_mode: bool,
    pub(crate) palette: [u16; PALETTE_SIZE],
    pub(crate) needs_redraw: bool,
    pub(crate) rng: StdRng,
}

impl Default for Machine {
    fn default() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl Machine {
    pub fn new() -> Self {
        Self::default()
    }

    /// A machine whose random instructions replay the same sequence.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let profile = Mode::Legacy8.profile();
        let mut machine = Self {
            mode: Mode::Legacy8,
            profile,
            font_policy: FontPolicy::default(),
            memory: vec![0; profile.memory_size],
            registers: [0; MAX_REGISTERS],
            index_register: 0,
            program_counter: PROGRAM_ORIGIN,
            stack: [0; STACK_DEPTH],
            stack_pointer: 0,
            delay_timer: 0,
            sound_timer: 0,
            keys: [false; KEY_COUNT],
            framebuffer: Framebuffer::new(profile.display_width, profile.display_height),
            effects: EffectState::default(),
            color_mode: false,
            palette: DEFAULT_PALETTE,
            needs_redraw: false,
            rng,
        };
        machine.reset();
        machine
    }

    /// Back to power-on state: everything zeroed, font installed, legacy mode.
    /// The font policy is a setting and survives.
    pub fn reset(&mut self) {
        self.mode = Mode::Legacy8;
        self.profile = self.mode.profile();
        self.memory.clear();
        self.memory.resize(self.profile.memory_size, 0);
        self.registers = [0; MAX_REGISTERS];
        self.index_register = 0;
        self.program_counter = PROGRAM_ORIGIN;
        self.stack = [0; STACK_DEPTH];
        self.stack_pointer = 0;
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.keys = [false; KEY_COUNT];
        self.framebuffer
            .resize(self.profile.display_width, self.profile.display_height);
        self.effects = EffectState::default();
        self.color_mode = self.profile.color;
        self.palette = DEFAULT_PALETTE;
        self.needs_redraw = true;
        self.load_font_data(&FONT);
        log::debug!("machine reset");
    }

    /// Copies glyph data to the bottom of memory, truncated to fit.
    pub(crate) fn load_font_data(&mut self, fonts: &[u8]) {
        let len = fonts.len().min(self.memory.len());
        self.memory[..len].copy_from_slice(&fonts[..len]);
    }

    /// Copies `program` to the load origin. Nothing else is touched.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), LoadError> {
        let max = self.profile.max_program_size();
        if program.len() > max {
            return Err(LoadError::RomTooLarge {
                size: program.len(),
                max,
            });
        }
        let origin = PROGRAM_ORIGIN as usize;
        self.memory[origin..origin + program.len()].copy_from_slice(program);
        log::debug!("loaded {} byte program at {:#06X}", program.len(), origin);
        Ok(())
    }

    /// One fetch-decode-execute cycle. The program counter is already past
    /// the instruction when it executes, including when it fails.
    pub fn step(&mut self) -> Result<(), StepError> {
        let address = self.program_counter;
        let opcode = u16::from_be_bytes([
            self.memory[address as usize % self.memory.len()],
            self.memory[(address as usize + 1) % self.memory.len()],
        ]);
        self.jump(address as u64 + 2);

        let Some(instruction) = Instruction::decode(opcode, self.mode) else {
            return Err(StepError::UnknownOpcode { opcode, address });
        };
        log::trace!("{address:#06X}: {opcode:04X} {instruction}");
        self.execute(instruction)
    }

    /// Counts both timers down by one; call at 60 Hz.
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }

    pub fn set_key(&mut self, key: u8, pressed: bool) {
        if let Some(state) = self.keys.get_mut(key as usize) {
            *state = pressed;
        }
    }

    /// Switches variants in place. Registers are re-masked, memory grows or
    /// shrinks to the new size, the display is re-created and cleared at the
    /// new resolution and color mode follows the variant.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.profile = mode.profile();

        let mask = self.profile.mask();
        for (index, register) in self.registers.iter_mut().enumerate() {
            if index < self.profile.register_count {
                *register &= mask;
            } else {
                *register = 0;
            }
        }

        self.memory.resize(self.profile.memory_size, 0);
        self.program_counter = (self.program_counter as usize % self.memory.len()) as u16;

        self.framebuffer
            .resize(self.profile.display_width, self.profile.display_height);
        self.color_mode = self.profile.color;
        self.needs_redraw = true;
        log::debug!(
            "mode set to {} (display {}x{})",
            mode,
            self.profile.display_width,
            self.profile.display_height
        );
    }

    pub fn set_color_mode(&mut self, enabled: bool) {
        self.color_mode = enabled;
        self.needs_redraw = true;
        log::debug!("color mode {}", if enabled { "on" } else { "off" });
    }

    /// Replaces the palette; `reset` restores the default one.
    pub fn set_palette(&mut self, palette: [u16; PALETTE_SIZE]) {
        self.palette = palette;
        self.needs_redraw = true;
        log::debug!("palette replaced");
    }

    pub fn color_mode(&self) -> bool {
        self.color_mode
    }

    pub fn palette(&self) -> &[u16; PALETTE_SIZE] {
        &self.palette
    }

    pub fn set_font_policy(&mut self, policy: FontPolicy) {
        self.font_policy = policy;
    }

    pub fn set_effect(&mut self, effect: GraphicsEffect) {
        self.effects.set_effect(effect);
        log::debug!("graphics effect set to {effect:?}");
    }

    /// Per-frame hook: refreshes the effect buffer from the primary
    /// framebuffer and advances the active effect.
    pub fn process_graphics_effect(&mut self) {
        self.effects.process(self.framebuffer.pixels());
    }

    /// Reads and clears the redraw flag.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.needs_redraw)
    }

    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn profile(&self) -> &ModeProfile {
        &self.profile
    }

    pub fn font_policy(&self) -> FontPolicy {
        self.font_policy
    }

    pub fn register(&self, register_index: usize) -> u64 {
        self.registers[register_index % self.profile.register_count]
    }

    /// Active registers only; the last one is the flags register.
    pub fn registers(&self) -> &[u64] {
        &self.registers[..self.profile.register_count]
    }

    pub fn set_register(&mut self, register_index: usize, value: u64) {
        let register_index = register_index % self.profile.register_count;
        self.registers[register_index] = value & self.profile.mask();
    }

    pub fn flag(&self) -> u64 {
        self.registers[self.profile.flag_register()]
    }

    pub(crate) fn set_flag(&mut self, value: u64) {
        self.set_register(self.profile.flag_register(), value);
    }

    pub fn index_register(&self) -> u64 {
        self.index_register
    }

    pub fn set_index_register(&mut self, value: u64) {
        self.index_register = value;
    }

    pub fn program_counter(&self) -> u16 {
        self.program_counter
    }

    pub fn stack_pointer(&self) -> usize {
        self.stack_pointer
    }

    pub fn stack(&self) -> &[u64] {
        &self.stack[..self.stack_pointer]
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn set_delay_timer(&mut self, value: u8) {
        self.delay_timer = value;
    }

    pub fn set_sound_timer(&mut self, value: u8) {
        self.sound_timer = value;
    }

    pub fn keys(&self) -> &[bool; KEY_COUNT] {
        &self.keys
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn effect(&self) -> GraphicsEffect {
        self.effects.effect
    }

    pub fn effect_buffer(&self) -> &[u8] {
        &self.effects.buffer
    }

    pub fn effect_palette_index(&self) -> usize {
        self.effects.palette_index
    }

    pub fn effect_color(&self) -> u32 {
        self.effects.color()
    }

    /// Sets the program counter, wrapped into memory.
    pub(crate) fn jump(&mut self, target: u64) {
        self.program_counter = (target % self.memory.len() as u64) as u16;
    }

    pub(crate) fn read_byte(&self, address: u64) -> u8 {
        self.memory[(address % self.memory.len() as u64) as usize]
    }

    pub(crate) fn write_byte(&mut self, address: u64, value: u8) {
        let len = self.memory.len() as u64;
        self.memory[(address % len) as usize] = value;
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PC={:#06X} I={:#018X} SP={} Mode={} Res={}x{}",
            self.program_counter,
            self.index_register,
            self.stack_pointer,
            self.mode,
            self.framebuffer.width(),
            self.framebuffer.height()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_state() {
        let machine = Machine::with_seed(7);
        assert_eq!(machine.program_counter(), 0x200);
        assert_eq!(machine.mode(), Mode::Legacy8);
        assert_eq!(machine.memory().len(), 0x1000);
        assert_eq!(&machine.memory()[..FONT.len()], &FONT[..]);
        assert!(machine.memory()[FONT.len()..].iter().all(|&byte| byte == 0));
        assert_eq!(machine.registers().len(), 16);
        assert_eq!(machine.stack_pointer(), 0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut machine = Machine::with_seed(7);
        machine.set_mode(Mode::Extended64);
        machine.set_register(3, 99);
        machine.set_delay_timer(5);
        machine.set_key(4, true);
        machine.set_effect(GraphicsEffect::ColorCycle);
        machine.reset();
        assert_eq!(machine.mode(), Mode::Legacy8);
        assert_eq!(machine.register(3), 0);
        assert_eq!(machine.delay_timer(), 0);
        assert!(!machine.keys()[4]);
        assert_eq!(machine.effect(), GraphicsEffect::None);
        assert_eq!(machine.framebuffer().width(), 64);
    }

    #[test]
    fn test_load_program() {
        let mut machine = Machine::with_seed(7);
        machine.load_program(&[0xA2, 0x34]).unwrap();
        assert_eq!(&machine.memory()[0x200..0x202], &[0xA2, 0x34]);
        assert_eq!(&machine.memory()[..FONT.len()], &FONT[..]);
    }

    #[test]
    fn test_load_program_too_large() {
        let mut machine = Machine::with_seed(7);
        let program = vec![0xAA; 0xE01];
        assert_eq!(
            machine.load_program(&program),
            Err(LoadError::RomTooLarge {
                size: 0xE01,
                max: 0xE00
            })
        );
        assert!(machine.memory()[0x200..].iter().all(|&byte| byte == 0));
        assert!(machine.load_program(&program[..0xE00]).is_ok());
    }

    #[test]
    fn test_large_program_in_64bit_mode() {
        let mut machine = Machine::with_seed(7);
        machine.set_mode(Mode::Extended64);
        assert!(machine.load_program(&vec![1; 0xFE00]).is_ok());
    }

    #[test]
    fn test_register_writes_are_masked() {
        let mut machine = Machine::with_seed(7);
        machine.set_mode(Mode::Extended16);
        machine.set_register(0, 0x10000);
        assert_eq!(machine.register(0), 0);
        machine.set_register(1, 0x1_2345);
        assert_eq!(machine.register(1), 0x2345);
    }

    #[test]
    fn test_mode_switch_rederives_dimensions() {
        let mut machine = Machine::with_seed(7);
        machine.set_mode(Mode::Extended64);
        machine.set_register(20, u64::MAX);
        machine.set_register(1, 0x1234_5678);
        assert_eq!(machine.framebuffer().width(), 128);
        assert_eq!(machine.framebuffer().height(), 64);
        assert_eq!(machine.memory().len(), 0x10000);
        assert_eq!(machine.registers().len(), 32);

        machine.set_mode(Mode::Extended16);
        assert_eq!(machine.framebuffer().width(), 64);
        assert_eq!(machine.memory().len(), 0x1000);
        assert_eq!(machine.register(1), 0x5678);
        machine.set_mode(Mode::Extended64);
        assert_eq!(machine.register(20), 0);
    }

    #[test]
    fn test_mode_switch_clears_display() {
        let mut machine = Machine::with_seed(7);
        machine.set_index_register(0);
        machine.execute(Instruction::Draw(0, 0, 1)).unwrap();
        let lit = |machine: &Machine| {
            machine
                .framebuffer()
                .pixels()
                .iter()
                .filter(|&&pixel| pixel != 0)
                .count()
        };
        assert_eq!(lit(&machine), 4);

        machine.take_redraw();
        machine.set_mode(Mode::Extended16);
        assert_eq!(lit(&machine), 0);
        assert!(machine.needs_redraw());
    }

    #[test]
    fn test_shrinking_memory_wraps_program_counter() {
        let mut machine = Machine::with_seed(7);
        machine.set_mode(Mode::Extended64);
        machine.memory_mut()[0x1200..0x1202].copy_from_slice(&[0x22, 0x00]);
        machine.jump(0x1200);
        machine.step().unwrap();
        assert_eq!(machine.stack(), &[0x1202]);

        machine.set_mode(Mode::Legacy8);
        assert_eq!(machine.program_counter(), 0x200);
        // RET at the wrapped address pops the stale return address
        machine.memory_mut()[0x200..0x202].copy_from_slice(&[0x00, 0xEE]);
        machine.step().unwrap();
        assert_eq!(machine.program_counter(), 0x202);

        machine.set_mode(Mode::Extended64);
        machine.jump(0xFFFF);
        machine.set_mode(Mode::Extended16);
        assert_eq!(machine.program_counter(), 0xFFF);
        // LD V1, 7 split across the end of memory
        machine.memory_mut()[0xFFF] = 0x61;
        machine.memory_mut()[0x000] = 0x07;
        machine.step().unwrap();
        assert_eq!(machine.register(1), 7);
        assert_eq!(machine.program_counter(), 0x001);
    }

    #[test]
    fn test_color_mode_follows_mode() {
        let mut machine = Machine::with_seed(7);
        assert!(!machine.color_mode());
        machine.set_mode(Mode::Extended64);
        assert!(machine.color_mode());
        machine.set_mode(Mode::Extended16);
        assert!(!machine.color_mode());

        machine.set_color_mode(true);
        assert!(machine.color_mode());
        machine.reset();
        assert!(!machine.color_mode());
    }

    #[test]
    fn test_set_palette() {
        let mut machine = Machine::with_seed(7);
        let mut palette = DEFAULT_PALETTE;
        palette[1] = 0xF800;
        machine.take_redraw();
        machine.set_palette(palette);
        assert_eq!(machine.palette()[1], 0xF800);
        assert!(machine.needs_redraw());

        machine.reset();
        assert_eq!(machine.palette(), &DEFAULT_PALETTE);
    }

    #[test]
    fn test_font_data_is_truncated_to_memory() {
        let mut machine = Machine::with_seed(7);
        machine.load_font_data(&vec![0xAB; 0x1100]);
        assert_eq!(machine.memory().len(), 0x1000);
        assert!(machine.memory().iter().all(|&byte| byte == 0xAB));
    }

    #[test]
    fn test_timers_count_down_to_zero() {
        let mut machine = Machine::with_seed(7);
        machine.set_delay_timer(2);
        machine.set_sound_timer(1);
        machine.tick_timers();
        assert_eq!(machine.delay_timer(), 1);
        assert_eq!(machine.sound_timer(), 0);
        machine.tick_timers();
        machine.tick_timers();
        assert_eq!(machine.delay_timer(), 0);
        assert_eq!(machine.sound_timer(), 0);
    }

    #[test]
    fn test_set_key_ignores_out_of_range() {
        let mut machine = Machine::with_seed(7);
        machine.set_key(0xF, true);
        machine.set_key(0x10, true);
        assert!(machine.keys()[0xF]);
        assert_eq!(machine.keys().iter().filter(|&&key| key).count(), 1);
    }

    #[test]
    fn test_process_graphics_effect_leaves_primary_alone() {
        let mut machine = Machine::with_seed(7);
        machine.framebuffer.xor_pixel(1, 1);
        machine.set_effect(GraphicsEffect::ColorCycle);
        for _ in 0..10 {
            machine.process_graphics_effect();
        }
        assert_eq!(machine.effect_buffer(), machine.framebuffer().pixels());
        assert_eq!(machine.effect_palette_index(), 1);
        assert_eq!(machine.framebuffer().pixel(1, 1), 1);
    }

    #[test]
    fn test_status_line() {
        let machine = Machine::with_seed(7);
        assert_eq!(
            machine.to_string(),
            "PC=0x0200 I=0x0000000000000000 SP=0 Mode=8bit Res=64x32"
        );
    }
}
