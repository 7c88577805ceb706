use std::{
    collections::{HashMap, VecDeque},
    io::{self, stdout, Stdout, Write},
    time::{Duration, Instant},
};

use crab64_core::{
    rgb565_to_rgb, Chip64Display, Chip64Keyboard, Frame, HostCommand, KEY_COUNT, PALETTE_SIZE,
};
use crossterm::{
    cursor,
    event::{poll, read, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::{self, Color, Stylize},
    terminal,
};

/// Left-hand side of a qwerty keyboard, laid out like the hex keypad.
const CONVENTIONAL_KEYMAP: [(char, u8); KEY_COUNT] = [
    ('x', 0x0),
    ('1', 0x1),
    ('2', 0x2),
    ('3', 0x3),
    ('q', 0x4),
    ('w', 0x5),
    ('e', 0x6),
    ('a', 0x7),
    ('s', 0x8),
    ('d', 0x9),
    ('z', 0xA),
    ('c', 0xB),
    ('4', 0xC),
    ('r', 0xD),
    ('f', 0xE),
    ('v', 0xF),
];

/// Most terminals never report releases, so a press counts for this long.
const KEY_HOLD: Duration = Duration::from_millis(120);

/// Puts the terminal in raw mode on an alternate screen until dropped.
pub struct TerminalDisplay {
    stdout: Stdout,
    previous: Vec<u8>,
    width: usize,
    height: usize,
    color: Option<u32>,
    palette: Option<[u16; PALETTE_SIZE]>,
}

impl TerminalDisplay {
    pub fn new() -> io::Result<Self> {
        let mut stdout = stdout();
        terminal::enable_raw_mode()?;
        execute!(
            stdout,
            terminal::EnterAlternateScreen,
            terminal::Clear(terminal::ClearType::All),
            cursor::Hide
        )?;
        Ok(Self {
            stdout,
            previous: Vec::new(),
            width: 0,
            height: 0,
            color: None,
            palette: None,
        })
    }
}

/// The effect color wins over the palette; plain monochrome is yellow.
fn pixel_color(effect: Option<u32>, palette_color: Option<u16>) -> Color {
    match (effect, palette_color) {
        (Some(rgba), _) => Color::Rgb {
            r: (rgba >> 24) as u8,
            g: (rgba >> 16) as u8,
            b: (rgba >> 8) as u8,
        },
        (None, Some(color)) => {
            let (r, g, b) = rgb565_to_rgb(color);
            Color::Rgb { r, g, b }
        }
        (None, None) => Color::Yellow,
    }
}

impl Chip64Display for TerminalDisplay {
    fn present(&mut self, frame: &Frame<'_>) -> io::Result<()> {
        let palette = frame.palette.copied();
        let full_redraw = (frame.width, frame.height) != (self.width, self.height)
            || frame.color != self.color
            || palette != self.palette;
        if full_redraw {
            self.width = frame.width;
            self.height = frame.height;
            self.color = frame.color;
            self.palette = palette;
            self.previous = vec![0; frame.width * frame.height];
            queue!(self.stdout, terminal::Clear(terminal::ClearType::All))?;
        }

        for row in 0..frame.height {
            for col in 0..frame.width {
                let index = row * frame.width + col;
                let pixel = frame.pixel(col, row);
                if !full_redraw && pixel == self.previous[index] {
                    continue;
                }
                self.previous[index] = pixel;
                queue!(self.stdout, cursor::MoveTo(col as u16 * 2, row as u16))?;
                if frame.is_lit(col, row) {
                    let color = pixel_color(frame.color, frame.palette_color(col, row));
                    queue!(self.stdout, style::PrintStyledContent("██".with(color)))?;
                } else {
                    queue!(self.stdout, style::PrintStyledContent("  ".black()))?;
                }
            }
        }
        self.stdout.flush()
    }
}

impl Drop for TerminalDisplay {
    fn drop(&mut self) {
        let _ = execute!(self.stdout, cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// Hex keypad on the conventional layout, plus Esc to quit, F5 to reset, F6 to
/// switch mode and F7 to toggle the color effect.
pub struct TerminalKeyboard {
    keymap: HashMap<char, u8>,
    pressed_at: [Option<Instant>; KEY_COUNT],
    commands: VecDeque<HostCommand>,
}

impl Default for TerminalKeyboard {
    fn default() -> Self {
        Self {
            keymap: HashMap::from(CONVENTIONAL_KEYMAP),
            pressed_at: [None; KEY_COUNT],
            commands: VecDeque::new(),
        }
    }
}

impl TerminalKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle_key(&mut self, event: KeyEvent) {
        let command = match event.code {
            KeyCode::Esc => Some(HostCommand::Quit),
            KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(HostCommand::Quit)
            }
            KeyCode::F(5) => Some(HostCommand::Reset),
            KeyCode::F(6) => Some(HostCommand::CycleMode),
            KeyCode::F(7) => Some(HostCommand::ToggleEffect),
            KeyCode::Char(key) => {
                match self.keymap.get(&key.to_ascii_lowercase()) {
                    Some(&mapped_key) => {
                        self.pressed_at[mapped_key as usize] = match event.kind {
                            KeyEventKind::Release => None,
                            _ => Some(Instant::now()),
                        };
                    }
                    None => log::debug!("unmapped key {key:?}"),
                }
                None
            }
            _ => None,
        };
        if let Some(command) = command {
            if event.kind != KeyEventKind::Release {
                self.commands.push_back(command);
            }
        }
    }
}

impl Chip64Keyboard for TerminalKeyboard {
    fn update_keystates(&mut self, max_duration_microseconds: u64) -> io::Result<()> {
        let deadline = Instant::now() + Duration::from_micros(max_duration_microseconds);
        loop {
            let timeout = deadline.saturating_duration_since(Instant::now());
            if !poll(timeout)? {
                return Ok(());
            }
            if let Event::Key(event) = read()? {
                self.handle_key(event);
            }
        }
    }

    fn is_key_down(&self, key: u8) -> bool {
        self.pressed_at
            .get(key as usize)
            .copied()
            .flatten()
            .is_some_and(|pressed_at| pressed_at.elapsed() < KEY_HOLD)
    }

    fn take_command(&mut self) -> Option<HostCommand> {
        self.commands.pop_front()
    }
}
