//! Graphics Context
//!
//! Double-buffered CPU pixel surface bound to one server window. Drawing goes
//! to the back buffer; `flip` publishes it to the front buffer, which is what
//! the server composites on its next flip of the window.

/// Double-buffered 32-bit ARGB pixel context
pub struct GfxContext {
    width: u32,
    height: u32,
    front: Vec<u32>,
    back: Vec<u32>,
}

impl GfxContext {
    pub fn new(width: u32, height: u32) -> Self {
        let len = (width as usize) * (height as usize);
        Self {
            width,
            height,
            front: vec![0; len],
            back: vec![0; len],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Publish the back buffer
    pub fn flip(&mut self) {
        self.front.copy_from_slice(&self.back);
    }

    /// Write one back-buffer pixel; out-of-bounds writes are ignored
    pub fn put(&mut self, x: u32, y: u32, pixel: u32) {
        if x < self.width && y < self.height {
            self.back[(y * self.width + x) as usize] = pixel;
        }
    }

    /// Fill a back-buffer rectangle, clipped to the context
    pub fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, pixel: u32) {
        let x1 = (x + w).min(self.width);
        let y1 = (y + h).min(self.height);
        for py in y.min(self.height)..y1 {
            for px in x.min(self.width)..x1 {
                self.back[(py * self.width + px) as usize] = pixel;
            }
        }
    }

    pub fn back(&self) -> &[u32] {
        &self.back
    }

    pub fn back_mut(&mut self) -> &mut [u32] {
        &mut self.back
    }

    pub fn front(&self) -> &[u32] {
        &self.front
    }
}
