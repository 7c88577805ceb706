/// Frames (at 60 Hz) between color-cycle steps.
pub const COLOR_CYCLE_FRAMES: u8 = 10;

/// RGBA colors the color-cycle effect steps through.
pub const COLOR_CYCLE_PALETTE: [u32; 8] = [
    0x00FF00FF, // green
    0x00FFFFFF, // cyan
    0x0000FFFF, // blue
    0xFF00FFFF, // magenta
    0xFFFF00FF, // yellow
    0xFF8000FF, // orange
    0xFF0000FF, // red
    0xFFFFFFFF, // white
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraphicsEffect {
    #[default]
    None,
    ColorCycle,
}

impl GraphicsEffect {
    pub fn toggled(self) -> Self {
        match self {
            GraphicsEffect::None => GraphicsEffect::ColorCycle,
            GraphicsEffect::ColorCycle => GraphicsEffect::None,
        }
    }
}

/// Render-side state. Only `Machine::process_graphics_effect` and
/// `Machine::set_effect` touch it.
#[derive(Debug, Clone, Default)]
pub struct EffectState {
    pub effect: GraphicsEffect,
    pub frame_counter: u8,
    pub palette_index: usize,
    pub buffer: Vec<u8>,
}

impl EffectState {
    pub fn set_effect(&mut self, effect: GraphicsEffect) {
        self.effect = effect;
        self.frame_counter = 0;
    }

    /// Copies the primary pixels and advances the active effect by one frame.
    pub fn process(&mut self, pixels: &[u8]) {
        self.buffer.clear();
        self.buffer.extend_from_slice(pixels);

        if self.effect == GraphicsEffect::ColorCycle {
            self.frame_counter += 1;
            if self.frame_counter >= COLOR_CYCLE_FRAMES {
                self.frame_counter = 0;
                self.palette_index = (self.palette_index + 1) % COLOR_CYCLE_PALETTE.len();
                log::trace!(
                    "color cycle: index {} ({:#010X})",
                    self.palette_index,
                    COLOR_CYCLE_PALETTE[self.palette_index]
                );
            }
        }
    }

    /// Color lit pixels should be drawn with.
    pub fn color(&self) -> u32 {
        COLOR_CYCLE_PALETTE[self.palette_index]
    }
}
