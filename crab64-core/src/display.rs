use std::io;

pub const PALETTE_SIZE: usize = 16;

/// RGB565 colors, indexed by pixel value while color mode is on.
pub const DEFAULT_PALETTE: [u16; PALETTE_SIZE] = [
    0x0000, // black
    0xFFFF, // white
    0xF800, // red
    0x07E0, // green
    0x001F, // blue
    0xFFE0, // yellow
    0xF81F, // magenta
    0x07FF, // cyan
    0x7BEF, // light grey
    0x4208, // dark grey
    0xFC00, // orange
    0x8410, // brown
    0x7C1F, // purple
    0x03EF, // teal
    0xFD20, // pink
    0xBDF7, // sky
];

/// Expands an RGB565 color to 8 bits per channel.
pub fn rgb565_to_rgb(color: u16) -> (u8, u8, u8) {
    let r = (color >> 11) & 0x1F;
    let g = (color >> 5) & 0x3F;
    let b = color & 0x1F;
    (
        ((r << 3) | (r >> 2)) as u8,
        ((g << 2) | (g >> 4)) as u8,
        ((b << 3) | (b >> 2)) as u8,
    )
}

/// What a renderer gets handed once per presented frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Row-major, one byte per pixel, non-zero means lit.
    pub pixels: &'a [u8],
    pub width: usize,
    pub height: usize,
    /// RGBA color for lit pixels while a color effect runs.
    pub color: Option<u32>,
    /// Set while color mode is on.
    pub palette: Option<&'a [u16; PALETTE_SIZE]>,
}

impl Frame<'_> {
    pub fn is_lit(&self, x: usize, y: usize) -> bool {
        self.pixel(x, y) != 0
    }

    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.pixels.get(y * self.width + x).copied().unwrap_or(0)
    }

    /// Palette entry for the pixel at (x, y), if color mode is on and the
    /// pixel is lit. Drawing only ever stores 1, so lit pixels use entry 1.
    pub fn palette_color(&self, x: usize, y: usize) -> Option<u16> {
        let pixel = self.pixel(x, y);
        match self.palette {
            Some(palette) if pixel != 0 => Some(palette[pixel as usize % PALETTE_SIZE]),
            _ => None,
        }
    }
}

pub trait Chip64Display {
    fn present(&mut self, frame: &Frame<'_>) -> io::Result<()>;
}
