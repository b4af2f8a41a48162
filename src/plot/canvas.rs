//! A small RGB raster with the drawing operations the charts need.

use super::font::{ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH, glyph, text_width};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const DARK_GREY: Rgb = Rgb(64, 64, 64);
    pub const LIGHT_GREY: Rgb = Rgb(204, 204, 204);
    pub const ORANGE: Rgb = Rgb(255, 165, 0);
}

/// Row-major RGB8 pixel buffer. Drawing outside the bounds is clipped.
#[derive(Debug, Clone)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Rgb) -> Self {
        let pixels = [background.0, background.1, background.2]
            .iter()
            .copied()
            .cycle()
            .take((width * height * 3) as usize)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn offset(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(((y as usize) * self.width as usize + x as usize) * 3)
    }

    pub fn pixel(&self, x: i64, y: i64) -> Option<Rgb> {
        self.offset(x, y)
            .map(|i| Rgb(self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]))
    }

    pub fn set(&mut self, x: i64, y: i64, color: Rgb) {
        if let Some(i) = self.offset(x, y) {
            self.pixels[i] = color.0;
            self.pixels[i + 1] = color.1;
            self.pixels[i + 2] = color.2;
        }
    }

    pub fn fill_rect(&mut self, x: i64, y: i64, w: i64, h: i64, color: Rgb) {
        for yy in y..y + h {
            for xx in x..x + w {
                self.set(xx, yy, color);
            }
        }
    }

    /// Bresenham line drawn with a square brush `thickness` pixels wide.
    pub fn line(&mut self, from: (i64, i64), to: (i64, i64), thickness: i64, color: Rgb) {
        let (mut x, mut y) = from;
        let dx = (to.0 - x).abs();
        let dy = -(to.1 - y).abs();
        let sx = if x < to.0 { 1 } else { -1 };
        let sy = if y < to.1 { 1 } else { -1 };
        let mut err = dx + dy;
        let half = thickness / 2;

        loop {
            self.fill_rect(x - half, y - half, thickness.max(1), thickness.max(1), color);
            if (x, y) == to {
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
    }

    pub fn dashed_hline(&mut self, y: i64, x0: i64, x1: i64, dash: i64, gap: i64, color: Rgb) {
        let mut x = x0;
        while x <= x1 {
            for xx in x..(x + dash).min(x1 + 1) {
                self.set(xx, y, color);
            }
            x += dash + gap;
        }
    }

    pub fn dashed_vline(&mut self, x: i64, y0: i64, y1: i64, dash: i64, gap: i64, color: Rgb) {
        let mut y = y0;
        while y <= y1 {
            for yy in y..(y + dash).min(y1 + 1) {
                self.set(x, yy, color);
            }
            y += dash + gap;
        }
    }

    pub fn fill_circle(&mut self, cx: i64, cy: i64, radius: i64, color: Rgb) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.set(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Draws `text` with its top-left corner at (`x`, `y`).
    pub fn text(&mut self, x: i64, y: i64, text: &str, scale: u32, color: Rgb) {
        let s = scale as i64;
        for (i, c) in text.chars().enumerate() {
            let origin = x + i as i64 * ADVANCE as i64 * s;
            for (row, bits) in glyph(c).iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if bits & (1 << (GLYPH_WIDTH - 1 - col)) != 0 {
                        self.fill_rect(origin + col as i64 * s, y + row as i64 * s, s, s, color);
                    }
                }
            }
        }
    }

    /// Draws `text` centred on `cx`.
    pub fn text_centered(&mut self, cx: i64, y: i64, text: &str, scale: u32, color: Rgb) {
        let w = text_width(text, scale) as i64;
        self.text(cx - w / 2, y, text, scale, color);
    }

    /// Draws `text` so that it ends at `right`.
    pub fn text_right(&mut self, right: i64, y: i64, text: &str, scale: u32, color: Rgb) {
        let w = text_width(text, scale) as i64;
        self.text(right - w, y, text, scale, color);
    }

    /// Draws `text` reading bottom to top, centred on `cy`, left edge at `x`.
    pub fn text_vertical(&mut self, x: i64, cy: i64, text: &str, scale: u32, color: Rgb) {
        let s = scale as i64;
        let bottom = cy + text_width(text, scale) as i64 / 2;
        for (i, c) in text.chars().enumerate() {
            let origin = bottom - i as i64 * ADVANCE as i64 * s;
            for (row, bits) in glyph(c).iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if bits & (1 << (GLYPH_WIDTH - 1 - col)) != 0 {
                        self.fill_rect(
                            x + row as i64 * s,
                            origin - (col as i64 + 1) * s,
                            s,
                            s,
                            color,
                        );
                    }
                }
            }
        }
    }

    /// Height in pixels of one line of text at `scale`.
    pub fn line_height(scale: u32) -> i64 {
        (GLYPH_HEIGHT * scale) as i64
    }

    pub fn write_png(&self, writer: impl Write) -> Result<()> {
        let mut encoder = png::Encoder::new(writer, self.width, self.height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);

        let mut png_writer = encoder.write_header()?;
        png_writer.write_image_data(&self.pixels)?;
        png_writer.finish()?;
        Ok(())
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        self.write_png(BufWriter::new(file))
            .with_context(|| format!("encoding {}", path.display()))
    }
}
