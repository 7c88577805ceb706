use std::io;

/// Requests aimed at the host rather than the running program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    Quit,
    Reset,
    CycleMode,
    ToggleEffect,
}

pub trait Chip64Keyboard {
    /// Polls the input source, waiting at most the given time.
    fn update_keystates(&mut self, max_duration_microseconds: u64) -> io::Result<()>;
    fn is_key_down(&self, key: u8) -> bool;
    fn take_command(&mut self) -> Option<HostCommand>;
}
