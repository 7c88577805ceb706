use beep::beep;
use crab64_core::Chip64Beeper;

const TONE_PITCH: u16 = 2093; // C7

/// Square-wave tone on the PC speaker while the sound timer runs.
#[derive(Default)]
pub struct ToneBeeper {
    playing: bool,
}

impl Chip64Beeper for ToneBeeper {
    fn play(&mut self) {
        if self.playing {
            return;
        }
        match beep(TONE_PITCH) {
            Ok(()) => self.playing = true,
            Err(error) => log::warn!("could not start tone: {error}"),
        }
    }

    fn pause(&mut self) {
        if !self.playing {
            return;
        }
        if let Err(error) = beep(0) {
            log::warn!("could not stop tone: {error}");
        }
        self.playing = false;
    }
}
