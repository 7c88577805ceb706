use std::{
    fs,
    path::Path,
    time::{Duration, Instant},
};

use crate::{
    error::Result, Chip64Beeper, Chip64Display, Chip64Keyboard, Config, Frame, GraphicsEffect,
    HostCommand, Machine, KEY_COUNT,
};

struct Timer {
    interval: Duration,
    last_tick: Instant,
}

impl Timer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_tick: Instant::now(),
        }
    }

    fn tick(&mut self) -> bool {
        if self.last_tick.elapsed() >= self.interval {
            self.last_tick += self.interval;
            true
        } else {
            false
        }
    }
}

/// Drives a `Machine` against real time: instructions at the configured rate,
/// timers and presentation at 60 Hz.
pub struct Chip64Interpreter<D: Chip64Display, K: Chip64Keyboard, B: Chip64Beeper> {
    pub config: Config,
    pub display: D,
    pub keyboard: K,
    pub beeper: B,
    machine: Machine,
    beeping: bool,
    palette_index: usize,
}

impl<D: Chip64Display, K: Chip64Keyboard, B: Chip64Beeper> Chip64Interpreter<D, K, B> {
    pub fn new(config: Config, display: D, keyboard: K, beeper: B) -> Self {
        let machine = match config.seed {
            Some(seed) => Machine::with_seed(seed),
            None => Machine::new(),
        };
        Self {
            config,
            display,
            keyboard,
            beeper,
            machine,
            beeping: false,
            palette_index: 0,
        }
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn run<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let program = fs::read(path)?;
        self.run_program(&program)
    }

    /// Runs until the keyboard reports `HostCommand::Quit`.
    pub fn run_program(&mut self, program: &[u8]) -> Result<()> {
        self.boot(program)?;

        let cpu_frame_time_micros = 1_000_000 / self.config.instructions_per_second.max(1) as u64;
        let mut next_cpu_frame = Instant::now() + Duration::from_micros(cpu_frame_time_micros);
        let mut timer = Timer::new(Duration::from_secs_f32(1. / 60.));

        loop {
            for key in 0..KEY_COUNT as u8 {
                self.machine.set_key(key, self.keyboard.is_key_down(key));
            }

            while let Some(command) = self.keyboard.take_command() {
                log::debug!("host command {command:?}");
                match command {
                    HostCommand::Quit => {
                        self.beeper.pause();
                        return Ok(());
                    }
                    HostCommand::Reset => self.boot(program)?,
                    HostCommand::CycleMode => self.machine.set_mode(self.machine.mode().next()),
                    HostCommand::ToggleEffect => {
                        self.machine.set_effect(self.machine.effect().toggled())
                    }
                }
            }

            if let Err(error) = self.machine.step() {
                log::warn!("{error}");
            }

            if timer.tick() {
                self.machine.tick_timers();
                self.machine.process_graphics_effect();
                self.update_beeper();
                self.present()?;
            }

            let time_left = next_cpu_frame.saturating_duration_since(Instant::now());
            next_cpu_frame += Duration::from_micros(cpu_frame_time_micros);

            self.keyboard
                .update_keystates(time_left.as_micros() as u64)?;
        }
    }

    /// Fresh machine with the configured settings and `program` loaded.
    fn boot(&mut self, program: &[u8]) -> Result<()> {
        self.machine.reset();
        self.machine.set_mode(self.config.mode);
        self.machine.set_font_policy(self.config.font_policy);
        self.machine.set_effect(self.config.effect);
        self.machine.load_program(program)?;
        self.palette_index = self.machine.effect_palette_index();
        log::debug!("booted: {}", self.machine);
        Ok(())
    }

    fn update_beeper(&mut self) {
        let sounding = self.config.sound_enabled && self.machine.sound_timer() > 0;
        if sounding != self.beeping {
            if sounding {
                self.beeper.play();
            } else {
                self.beeper.pause();
            }
            self.beeping = sounding;
        }
    }

    fn present(&mut self) -> Result<()> {
        let palette_index = self.machine.effect_palette_index();
        let palette_changed = palette_index != self.palette_index;
        if !self.machine.take_redraw() && !palette_changed {
            return Ok(());
        }
        self.palette_index = palette_index;

        let framebuffer = self.machine.framebuffer();
        let color = (self.machine.effect() != GraphicsEffect::None)
            .then(|| self.machine.effect_color());
        let frame = Frame {
            pixels: self.machine.effect_buffer(),
            width: framebuffer.width(),
            height: framebuffer.height(),
            color,
            palette: self.machine.color_mode().then(|| self.machine.palette()),
        };
        self.display.present(&frame)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, io, thread};

    use super::*;
    use crate::Mode;

    #[derive(Default)]
    struct RecordingDisplay {
        frames: Vec<(Vec<u8>, usize, usize, Option<u32>)>,
        palettes: Vec<Option<u16>>,
    }

    impl Chip64Display for RecordingDisplay {
        fn present(&mut self, frame: &Frame<'_>) -> io::Result<()> {
            self.frames
                .push((frame.pixels.to_vec(), frame.width, frame.height, frame.color));
            self.palettes.push(frame.palette.map(|palette| palette[1]));
            Ok(())
        }
    }

    /// Hands out one of `commands` every `delay` polls, then quits.
    struct ScriptedKeyboard {
        keys: [bool; KEY_COUNT],
        commands: VecDeque<HostCommand>,
        delay: usize,
        polls: usize,
        pending: Option<HostCommand>,
    }

    impl ScriptedKeyboard {
        fn new(delay: usize, commands: &[HostCommand]) -> Self {
            let mut commands: VecDeque<_> = commands.iter().copied().collect();
            commands.push_back(HostCommand::Quit);
            Self {
                keys: [false; KEY_COUNT],
                commands,
                delay,
                polls: 0,
                pending: None,
            }
        }
    }

    impl Chip64Keyboard for ScriptedKeyboard {
        fn update_keystates(&mut self, max_duration_microseconds: u64) -> io::Result<()> {
            thread::sleep(Duration::from_micros(max_duration_microseconds));
            self.polls += 1;
            if self.polls % self.delay == 0 {
                self.pending = self.commands.pop_front();
            }
            Ok(())
        }

        fn is_key_down(&self, key: u8) -> bool {
            self.keys[key as usize]
        }

        fn take_command(&mut self) -> Option<HostCommand> {
            self.pending.take()
        }
    }

    #[derive(Default)]
    struct CountingBeeper {
        plays: usize,
        pauses: usize,
    }

    impl Chip64Beeper for CountingBeeper {
        fn play(&mut self) {
            self.plays += 1;
        }

        fn pause(&mut self) {
            self.pauses += 1;
        }
    }

    fn interpreter(
        config: Config,
        keyboard: ScriptedKeyboard,
    ) -> Chip64Interpreter<RecordingDisplay, ScriptedKeyboard, CountingBeeper> {
        Chip64Interpreter::new(
            Config {
                seed: Some(1),
                instructions_per_second: 2000,
                ..config
            },
            RecordingDisplay::default(),
            keyboard,
            CountingBeeper::default(),
        )
    }

    #[test]
    fn test_presents_drawn_frame() {
        // LD I, 0; DRW V0, V0, 5; JP 0x204
        let program = [0xA0, 0x00, 0xD0, 0x05, 0x12, 0x04];
        let mut interpreter = interpreter(Config::default(), ScriptedKeyboard::new(200, &[]));

        interpreter.run_program(&program).unwrap();

        let (pixels, width, height, color) = interpreter.display.frames.last().unwrap();
        assert_eq!((*width, *height, *color), (64, 32, None));
        assert_eq!(&pixels[..4], &[1, 1, 1, 1]);
        assert_eq!(interpreter.machine().program_counter(), 0x204);
    }

    #[test]
    fn test_64bit_frames_carry_palette() {
        let program = [0x12, 0x00];
        let config = Config {
            mode: Mode::Extended64,
            ..Config::default()
        };
        let mut interpreter = interpreter(config, ScriptedKeyboard::new(100, &[]));

        interpreter.run_program(&program).unwrap();

        let (_, width, height, _) = interpreter.display.frames.last().unwrap();
        assert_eq!((*width, *height), (128, 64));
        assert_eq!(interpreter.display.palettes.last(), Some(&Some(0xFFFF)));
    }

    #[test]
    fn test_legacy_frames_are_monochrome() {
        let program = [0x12, 0x00];
        let mut interpreter = interpreter(Config::default(), ScriptedKeyboard::new(100, &[]));

        interpreter.run_program(&program).unwrap();

        assert!(!interpreter.display.palettes.is_empty());
        assert!(interpreter.display.palettes.iter().all(Option::is_none));
    }

    #[test]
    fn test_step_errors_do_not_stop_the_loop() {
        // unknown opcode, then LD V1, 7; JP 0x204
        let program = [0xFF, 0xFF, 0x61, 0x07, 0x12, 0x04];
        let mut interpreter = interpreter(Config::default(), ScriptedKeyboard::new(50, &[]));

        assert!(interpreter.run_program(&program).is_ok());
        assert_eq!(interpreter.machine().register(1), 7);
    }

    #[test]
    fn test_beeper_follows_sound_timer() {
        // LD V0, 3; LD ST, V0; JP 0x204
        let program = [0x60, 0x03, 0xF0, 0x18, 0x12, 0x04];
        let mut interpreter = interpreter(Config::default(), ScriptedKeyboard::new(300, &[]));

        interpreter.run_program(&program).unwrap();

        assert_eq!(interpreter.beeper.plays, 1);
        assert!(interpreter.beeper.pauses >= 1);
    }

    #[test]
    fn test_muted_beeper_stays_silent() {
        let program = [0x60, 0x03, 0xF0, 0x18, 0x12, 0x04];
        let config = Config {
            sound_enabled: false,
            ..Config::default()
        };
        let mut interpreter = interpreter(config, ScriptedKeyboard::new(100, &[]));

        interpreter.run_program(&program).unwrap();

        assert_eq!(interpreter.beeper.plays, 0);
    }

    #[test]
    fn test_host_commands() {
        let program = [0x12, 0x00];
        let commands = [HostCommand::CycleMode, HostCommand::ToggleEffect];
        let mut interpreter = interpreter(Config::default(), ScriptedKeyboard::new(20, &commands));

        interpreter.run_program(&program).unwrap();

        assert_eq!(interpreter.machine().mode(), Mode::Extended16);
        assert_eq!(interpreter.machine().effect(), GraphicsEffect::ColorCycle);
    }

    #[test]
    fn test_reset_reapplies_config() {
        // ADD V0, 1; JP 0x200
        let program = [0x70, 0x01, 0x12, 0x00];
        let config = Config {
            mode: Mode::Extended64,
            ..Config::default()
        };
        let commands = [HostCommand::CycleMode, HostCommand::Reset];
        let mut interpreter = interpreter(config, ScriptedKeyboard::new(20, &commands));

        interpreter.run_program(&program).unwrap();

        let machine = interpreter.machine();
        assert_eq!(machine.mode(), Mode::Extended64);
        assert_eq!(&machine.memory()[0x200..0x204], &program);
        assert!(machine.register(0) < 20);
    }

    #[test]
    fn test_rom_too_large_is_reported() {
        let program = vec![0; 0x1000];
        let mut interpreter = interpreter(Config::default(), ScriptedKeyboard::new(1, &[]));

        assert!(matches!(
            interpreter.run_program(&program),
            Err(crate::Error::Load(_))
        ));
    }
}
