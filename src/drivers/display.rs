// src/drivers/display.rs
use std::io::Cursor;
use image::{ImageBuffer, ImageFormat, Rgb};
use crate::drivers::error::DeviceError;
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Color(pub u8, pub u8, pub u8);
impl Color {
    pub const BLACK: Color = Color(0, 0, 0);
    pub const WHITE: Color = Color(255, 255, 255);
    pub const RED: Color = Color(255, 0, 0);
    pub const GREEN: Color = Color(0, 255, 0);
    pub const BLUE: Color = Color(0, 0, 255);
    pub const YELLOW: Color = Color(255, 255, 0);
}
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextStyle {
    pub color: Color,
    /// Glyph scale; size 1 is a 6x8 px cell.
    pub size: u8,
}
impl TextStyle {
    pub fn new(color: Color, size: u8) -> Self {
        Self { color, size }
    }
}
/// Drawing primitives of the attached screen.
pub trait Display {
    fn width(&self) -> i32;
    fn height(&self) -> i32;
    fn fill_screen(&mut self, color: Color);
    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color);
    fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color);
    fn draw_text(&mut self, x: i32, y: i32, text: &str, style: TextStyle);
}
#[derive(Clone, Debug, PartialEq)]
pub struct TextSpan {
    pub x: i32,
    pub y: i32,
    pub text: String,
    pub style: TextStyle,
}
/// In-memory screen: an RGB raster for lines and rectangles plus a text layer.
///
/// Text is kept as positioned spans so the host window can render it with a real
/// font. A span is removed when the screen is cleared, when a filled rectangle
/// covers its anchor, or when new text is printed at the same anchor.
#[derive(Clone, Debug)]
pub struct FrameBuffer {
    width: i32,
    height: i32,
    pixels: Vec<Color>,
    texts: Vec<TextSpan>,
    revision: u64,
}
impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1) as i32;
        let height = height.max(1) as i32;
        Self {
            width,
            height,
            pixels: vec![Color::BLACK; (width * height) as usize],
            texts: Vec::new(),
            revision: 0,
        }
    }
    #[cfg(test)]
    pub fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        self.index(x, y).map(|idx| self.pixels[idx])
    }
    pub fn texts(&self) -> &[TextSpan] {
        &self.texts
    }
    #[cfg(test)]
    pub fn contains_text(&self, needle: &str) -> bool {
        self.texts.iter().any(|span| span.text.contains(needle))
    }
    /// Bumped on every drawing call; lets the engine skip unchanged frames.
    pub fn revision(&self) -> u64 {
        self.revision
    }
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|c| [c.0, c.1, c.2])
            .collect()
    }
    /// Encodes the raster layer as PNG.
    pub fn encode_png(&self) -> Result<Vec<u8>, DeviceError> {
        let image =
            ImageBuffer::<Rgb<u8>, _>::from_raw(self.width as u32, self.height as u32, self.to_rgb_bytes())
                .ok_or_else(|| DeviceError::Image("failed to allocate image buffer".into()))?;
        let mut output = Vec::new();
        image.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
        Ok(output)
    }
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        Some((y * self.width + x) as usize)
    }
    fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        if let Some(idx) = self.index(x, y) {
            self.pixels[idx] = color;
        }
    }
}
impl Display for FrameBuffer {
    fn width(&self) -> i32 {
        self.width
    }
    fn height(&self) -> i32 {
        self.height
    }
    fn fill_screen(&mut self, color: Color) {
        self.pixels.fill(color);
        self.texts.clear();
        self.revision += 1;
    }
    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color) {
        // Bresenham, clipped per pixel
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let (mut x, mut y) = (x0, y0);
        let mut err = dx + dy;
        loop {
            self.set_pixel(x, y, color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
        self.revision += 1;
    }
    fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color) {
        for yy in y.max(0)..(y + h).min(self.height) {
            for xx in x.max(0)..(x + w).min(self.width) {
                self.set_pixel(xx, yy, color);
            }
        }
        self.texts
            .retain(|span| !(span.x >= x && span.x < x + w && span.y >= y && span.y < y + h));
        self.revision += 1;
    }
    fn draw_text(&mut self, x: i32, y: i32, text: &str, style: TextStyle) {
        self.texts.retain(|span| !(span.x == x && span.y == y));
        self.texts.push(TextSpan {
            x,
            y,
            text: text.to_string(),
            style,
        });
        self.revision += 1;
    }
}
