/// Row-major pixel store, one byte per pixel. Drawing only ever writes 0 or 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Switches to new dimensions. The contents do not survive.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize(width * height, 0);
    }

    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.pixels[self.index(x, y)]
    }

    /// Toggles the pixel at the wrapped coordinate and reports whether it was
    /// lit before the toggle.
    pub fn xor_pixel(&mut self, x: usize, y: usize) -> bool {
        let index = self.index(x, y);
        let collided = self.pixels[index] != 0;
        self.pixels[index] ^= 1;
        collided
    }

    fn index(&self, x: usize, y: usize) -> usize {
        (x % self.width) + (y % self.height) * self.width
    }
}
