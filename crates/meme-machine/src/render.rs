//! Caption rasterization and JPEG encoding.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};

use crate::font::{BlockFont, GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};
use crate::types::{DrawCommand, MemeResult, TextColor};

/// JPEG quality for composed memes.
pub const JPEG_QUALITY: u8 = 90;

/// Draw laid-out caption lines onto an image in place.
///
/// Pixels falling outside the image are skipped, so overflowing commands
/// clip at the edge instead of panicking.
pub fn draw_caption(
    img: &mut RgbImage,
    commands: &[DrawCommand],
    font: &BlockFont,
    color: TextColor,
) {
    let ink = match color {
        TextColor::Black => Rgb([0u8, 0, 0]),
        TextColor::White => Rgb([255u8, 255, 255]),
    };

    for command in commands {
        draw_line(img, command, font, ink);
    }
}

fn draw_line(img: &mut RgbImage, command: &DrawCommand, font: &BlockFont, ink: Rgb<u8>) {
    let scale = font.scale() as i64;
    let top = command.y as i64 - GLYPH_HEIGHT as i64 * scale;
    let mut pen_x = command.x as i64;

    for c in command.text.chars() {
        let glyph = BlockFont::glyph(c);
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (0b10000 >> col) == 0 {
                    continue;
                }
                fill_block(
                    img,
                    pen_x + col as i64 * scale,
                    top + row as i64 * scale,
                    scale,
                    ink,
                );
            }
        }
        pen_x += GLYPH_ADVANCE as i64 * scale;
    }
}

/// Fill a scale-by-scale block, clipping to the image bounds.
fn fill_block(img: &mut RgbImage, x: i64, y: i64, scale: i64, ink: Rgb<u8>) {
    let (w, h) = img.dimensions();
    for dy in 0..scale {
        for dx in 0..scale {
            let px = x + dx;
            let py = y + dy;
            if px < 0 || py < 0 || px >= w as i64 || py >= h as i64 {
                continue;
            }
            img.put_pixel(px as u32, py as u32, ink);
        }
    }
}

/// Encode an image as JPEG at quality [`JPEG_QUALITY`].
pub fn encode_jpeg(img: &RgbImage) -> MemeResult<Vec<u8>> {
    let mut buf = Vec::new();
    let mut cursor = Cursor::new(&mut buf);
    let encoder = JpegEncoder::new_with_quality(&mut cursor, JPEG_QUALITY);
    img.write_with_encoder(encoder)?;
    Ok(buf)
}
