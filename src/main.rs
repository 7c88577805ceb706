mod beeper;
mod logger;
mod terminal;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use crab64_core::{
    config::DEFAULT_INSTRUCTIONS_PER_SECOND, Chip64Interpreter, Config, FontPolicy,
    GraphicsEffect, Mode,
};
use log::LevelFilter;

use crate::{
    beeper::ToneBeeper,
    terminal::{TerminalDisplay, TerminalKeyboard},
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    #[value(name = "8")]
    Legacy8,
    #[value(name = "16")]
    Extended16,
    #[value(name = "64")]
    Extended64,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Legacy8 => Mode::Legacy8,
            ModeArg::Extended16 => Mode::Extended16,
            ModeArg::Extended64 => Mode::Extended64,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FontArg {
    /// Characters past F draw the F glyph
    Fallback,
    /// Characters past F use the glyph region after the hex font
    Extended,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EffectArg {
    None,
    ColorCycle,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DebugLevel {
    None,
    /// Lifecycle events and recovered errors
    Opcodes,
    /// Every executed instruction
    Verbose,
}

impl From<DebugLevel> for LevelFilter {
    fn from(level: DebugLevel) -> Self {
        match level {
            DebugLevel::None => LevelFilter::Off,
            DebugLevel::Opcodes => LevelFilter::Debug,
            DebugLevel::Verbose => LevelFilter::Trace,
        }
    }
}

/// CHIP-8 interpreter with 16-bit and 64-bit extended modes, drawn in the
/// terminal. Keypad on 1234/qwer/asdf/zxcv, Esc quits, F5 resets, F6 switches
/// mode, F7 toggles the color cycle.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the ROM file to run
    rom: PathBuf,

    #[arg(short, long, value_enum, default_value_t = ModeArg::Legacy8)]
    mode: ModeArg,

    /// Instructions per second
    #[arg(short, long, default_value_t = DEFAULT_INSTRUCTIONS_PER_SECOND)]
    ips: u32,

    /// Glyph lookup for characters past F in the extended modes
    #[arg(long, value_enum, default_value_t = FontArg::Fallback)]
    font: FontArg,

    #[arg(long, value_enum, default_value_t = EffectArg::None)]
    effect: EffectArg,

    /// Never ring the bell
    #[arg(long)]
    mute: bool,

    /// Seed for the random instructions
    #[arg(long)]
    seed: Option<u64>,

    #[arg(short, long, value_enum, default_value_t = DebugLevel::None)]
    debug: DebugLevel,

    #[arg(long, default_value = "crab64.log")]
    log_file: PathBuf,
}

impl Args {
    fn config(&self) -> Config {
        Config {
            instructions_per_second: self.ips,
            mode: self.mode.into(),
            font_policy: match self.font {
                FontArg::Fallback => FontPolicy::FallbackToF,
                FontArg::Extended => FontPolicy::ExtendedGlyphs,
            },
            effect: match self.effect {
                EffectArg::None => GraphicsEffect::None,
                EffectArg::ColorCycle => GraphicsEffect::ColorCycle,
            },
            sound_enabled: !self.mute,
            seed: self.seed,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = LevelFilter::from(args.debug);
    if level != LevelFilter::Off {
        logger::init(&args.log_file, level)
            .with_context(|| format!("could not open log file {}", args.log_file.display()))?;
    }

    let mut interpreter = Chip64Interpreter::new(
        args.config(),
        TerminalDisplay::new()?,
        TerminalKeyboard::new(),
        ToneBeeper::default(),
    );

    interpreter
        .run(&args.rom)
        .with_context(|| format!("could not run {}", args.rom.display()))?;

    Ok(())
}
