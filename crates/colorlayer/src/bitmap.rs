use std::io::BufWriter;

use inf::{Color, color};

use crate::{Error, Result};

/// Row-major RGBA bitmap of a rendered tile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileBitmap {
    width: usize,
    height: usize,
    pixels: Vec<Color>,
}

impl TileBitmap {
    pub fn transparent(width: usize, height: usize) -> Self {
        TileBitmap {
            width,
            height,
            pixels: vec![color::TRANSPARENT; width * height],
        }
    }

    pub fn from_colors(width: usize, height: usize, pixels: Vec<Color>) -> Result<Self> {
        if pixels.len() != width * height {
            return Err(Error::InvalidArgument(format!(
                "{} colors for a {width}x{height} bitmap",
                pixels.len()
            )));
        }

        Ok(TileBitmap { width, height, pixels })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Color> {
        if x < self.width && y < self.height {
            Some(self.pixels[y * self.width + x])
        } else {
            None
        }
    }

    /// Pixels outside of the bitmap are ignored
    pub fn set_pixel(&mut self, x: i64, y: i64, color: Color) {
        if (0..self.width as i64).contains(&x) && (0..self.height as i64).contains(&y) {
            self.pixels[y as usize * self.width + x as usize] = color;
        }
    }

    /// Copies the bitmap onto a transparent `size x size` canvas with its top left corner at the origin
    ///
    /// Larger bitmaps are clipped.
    pub fn placed_on_canvas(&self, size: usize) -> TileBitmap {
        if self.width == size && self.height == size {
            return self.clone();
        }

        let mut canvas = TileBitmap::transparent(size, size);
        let copy_width = self.width.min(size);
        for row in 0..self.height.min(size) {
            let src = &self.pixels[row * self.width..row * self.width + copy_width];
            canvas.pixels[row * size..row * size + copy_width].copy_from_slice(src);
        }

        canvas
    }

    pub fn as_rgba_bytes(&self) -> &[u8] {
        color::as_rgba_bytes(&self.pixels)
    }

    pub fn visible_pixel_count(&self) -> usize {
        self.pixels.iter().filter(|color| !color.is_transparent()).count()
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut data: Vec<u8> = Vec::new();

        {
            let w = BufWriter::new(&mut data);
            let mut encoder = png::Encoder::new(w, self.width as u32, self.height as u32);

            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            encoder.set_compression(png::Compression::Fast);

            let mut writer = encoder
                .write_header()
                .map_err(|e| Error::PngEncode(format!("Failed to write Png header: {e}")))?;

            writer
                .write_image_data(self.as_rgba_bytes())
                .map_err(|e| Error::PngEncode(format!("Failed to write Png data: {e}")))?;
            writer
                .finish()
                .map_err(|e| Error::PngEncode(format!("Failed to finish Png writer: {e}")))?;
        }

        Ok(data)
    }
}
