use font8x8::UnicodeFonts;
use inf::{Color, color};

use crate::bitmap::TileBitmap;

const GLYPH_SIZE: usize = 8;
const LINE_HEIGHT: usize = GLYPH_SIZE + 2;
/// Horizontal space kept free around the text
const TEXT_MARGIN: usize = 10;
const ERROR_COLOR: Color = color::DARK_RED;
const DEFAULT_MESSAGE: &str = "error";

/// A transparent tile with a dark red frame and the message centred in it
///
/// The message is wrapped on word boundaries, text that does not fit in the tile is dropped.
/// A blank message is drawn as "error".
pub fn error_tile(size: usize, message: &str) -> TileBitmap {
    let mut bitmap = TileBitmap::transparent(size, size);
    draw_frame(&mut bitmap);

    let columns = size.saturating_sub(TEXT_MARGIN) / GLYPH_SIZE;
    let max_lines = size.saturating_sub(4) / LINE_HEIGHT;
    if columns == 0 || max_lines == 0 {
        return bitmap;
    }

    let message = if message.trim().is_empty() { DEFAULT_MESSAGE } else { message };
    let mut lines = wrap_text(message, columns);
    lines.truncate(max_lines);

    let text_height = lines.len() * LINE_HEIGHT - 2;
    let top = (size - text_height) / 2;
    for (index, line) in lines.iter().enumerate() {
        let line_width = line.chars().count() * GLYPH_SIZE;
        let left = (size - line_width) / 2;
        draw_text(&mut bitmap, line, left, top + index * LINE_HEIGHT);
    }

    bitmap
}

fn draw_frame(bitmap: &mut TileBitmap) {
    let (width, height) = (bitmap.width() as i64, bitmap.height() as i64);
    for x in 0..width {
        bitmap.set_pixel(x, 0, ERROR_COLOR);
        bitmap.set_pixel(x, height - 1, ERROR_COLOR);
    }

    for y in 0..height {
        bitmap.set_pixel(0, y, ERROR_COLOR);
        bitmap.set_pixel(width - 1, y, ERROR_COLOR);
    }
}

fn draw_text(bitmap: &mut TileBitmap, text: &str, left: usize, top: usize) {
    for (index, ch) in text.chars().enumerate() {
        let glyph = font8x8::BASIC_FONTS
            .get(ch)
            .or_else(|| font8x8::BASIC_FONTS.get('?'))
            .unwrap_or([0; GLYPH_SIZE]);

        let x0 = (left + index * GLYPH_SIZE) as i64;
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                // least significant bit is the leftmost pixel
                if bits & (1 << col) != 0 {
                    bitmap.set_pixel(x0 + col as i64, (top + row) as i64, ERROR_COLOR);
                }
            }
        }
    }
}

/// Splits the text in lines of at most `columns` characters, words longer than a line are split
fn wrap_text(text: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        loop {
            let line_len = line.chars().count();
            let needed = if line_len == 0 { word.len() } else { line_len + 1 + word.len() };
            if needed <= columns {
                if line_len > 0 {
                    line.push(' ');
                }
                line.extend(word.iter());
                break;
            }

            if line_len > 0 {
                lines.push(std::mem::take(&mut line));
                continue;
            }

            let rest = word.split_off(columns);
            lines.push(word.iter().collect());
            word = rest;
        }
    }

    if !line.is_empty() {
        lines.push(line);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapping() {
        assert_eq!(wrap_text("no tile: 404", 30), ["no tile: 404"]);
        assert_eq!(wrap_text("error decoding data", 10), ["error", "decoding", "data"]);
        assert_eq!(wrap_text("abcdefghij", 4), ["abcd", "efgh", "ij"]);
        assert_eq!(wrap_text("a  b", 4), ["a b"]);
        assert!(wrap_text("   ", 4).is_empty());
    }

    #[test]
    fn frame_and_text_are_visible() {
        let tile = error_tile(256, "no tile: 404");
        assert_eq!(tile.width(), 256);
        assert_eq!(tile.as_rgba_bytes().len(), 256 * 256 * 4);
        assert_eq!(tile.pixel(0, 0), Some(ERROR_COLOR));
        assert_eq!(tile.pixel(255, 255), Some(ERROR_COLOR));

        let frame_pixels = 4 * 255;
        assert!(tile.visible_pixel_count() > frame_pixels);
        // the text is vertically centred
        assert!((120..136).any(|y| (10..246).any(|x| tile.pixel(x, y) == Some(ERROR_COLOR))));
    }

    #[test]
    fn tiny_tiles() {
        assert_eq!(error_tile(1, "error").visible_pixel_count(), 1);
        assert_eq!(error_tile(12, "error").width(), 12);
        assert_eq!(error_tile(0, "error").as_rgba_bytes().len(), 0);
    }

    #[test]
    fn blank_message() {
        let frame_pixels = 4 * 255;
        assert_eq!(error_tile(256, ""), error_tile(256, DEFAULT_MESSAGE));
        assert_eq!(error_tile(256, " \t\n"), error_tile(256, DEFAULT_MESSAGE));
        assert!(error_tile(256, "").visible_pixel_count() > frame_pixels);
    }

    #[test]
    fn non_ascii_message() {
        let tile = error_tile(64, "fout ✗");
        assert!(tile.visible_pixel_count() > 4 * 63);
    }
}
