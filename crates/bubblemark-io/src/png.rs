//! PNG image format support
//!
//! Palette and low bit-depth images are expanded to 8 bits per sample on
//! read. Resolution travels through the `pHYs` chunk.

use crate::{IoError, IoResult};
use bubblemark_core::{ImageFormat, Pix, PixelDepth, color};
use png::{BitDepth, ColorType, Decoder, Encoder, PixelDimensions, Transformations, Unit};
use std::io::{BufRead, Seek, Write};

const INCHES_PER_METER: f64 = 39.370_078_740_157_48;

/// Read a PNG image.
///
/// Grayscale becomes 8 bpp; anything with color becomes 32 bpp RGB(A).
pub fn read_png<R: BufRead + Seek>(reader: R) -> IoResult<Pix> {
    let mut decoder = Decoder::new(reader);
    decoder.set_transformations(Transformations::normalize_to_color8());
    let mut reader = decoder
        .read_info()
        .map_err(|e| IoError::DecodeError(format!("PNG decode error: {}", e)))?;

    let (width, height) = (reader.info().width, reader.info().height);
    let dpi = reader.info().pixel_dims.and_then(|dims| match dims.unit {
        Unit::Meter => Some((
            (dims.xppu as f64 / INCHES_PER_METER).round() as i32,
            (dims.yppu as f64 / INCHES_PER_METER).round() as i32,
        )),
        Unit::Unspecified => None,
    });

    let buf_size = reader
        .output_buffer_size()
        .ok_or_else(|| IoError::DecodeError("failed to get output buffer size".to_string()))?;
    let mut buf = vec![0; buf_size];
    let output_info = reader
        .next_frame(&mut buf)
        .map_err(|e| IoError::DecodeError(format!("PNG frame error: {}", e)))?;
    let (color_type, bit_depth) = (output_info.color_type, output_info.bit_depth);
    if bit_depth != BitDepth::Eight {
        return Err(IoError::UnsupportedFormat(format!(
            "unexpected PNG output depth: {:?}",
            bit_depth
        )));
    }

    let samples = match color_type {
        ColorType::Grayscale => 1,
        ColorType::GrayscaleAlpha => 2,
        ColorType::Rgb => 3,
        ColorType::Rgba => 4,
        ColorType::Indexed => {
            return Err(IoError::UnsupportedFormat(
                "indexed PNG was not expanded".to_string(),
            ));
        }
    };
    let depth = if samples <= 2 {
        PixelDepth::Bit8
    } else {
        PixelDepth::Bit32
    };

    let mut pix_mut = Pix::new(width, height, depth)?.to_mut();
    pix_mut.set_informat(ImageFormat::Png);
    if let Some((xr, yr)) = dpi {
        pix_mut.set_resolution(xr, yr);
    }

    let line = output_info.line_size;
    let data = &buf[..output_info.buffer_size()];
    for y in 0..height {
        let row = &data[y as usize * line..];
        for x in 0..width {
            let i = x as usize * samples;
            let val = match samples {
                1 | 2 => row[i] as u32,
                3 => color::compose_rgb(row[i], row[i + 1], row[i + 2]),
                _ => color::compose_rgba(row[i], row[i + 1], row[i + 2], row[i + 3]),
            };
            pix_mut.set_pixel_unchecked(x, y, val);
        }
    }

    Ok(pix_mut.into())
}

/// Write a PNG image.
///
/// 1 bpp images are written as 8-bit grayscale with foreground black.
pub fn write_png<W: Write>(pix: &Pix, writer: W) -> IoResult<()> {
    let (width, height) = (pix.width(), pix.height());
    let (color_type, samples) = match pix.depth() {
        PixelDepth::Bit1 | PixelDepth::Bit8 => (ColorType::Grayscale, 1usize),
        PixelDepth::Bit32 => (ColorType::Rgb, 3usize),
    };

    let mut encoder = Encoder::new(writer, width, height);
    encoder.set_color(color_type);
    encoder.set_depth(BitDepth::Eight);
    if pix.xres() > 0 && pix.yres() > 0 {
        encoder.set_pixel_dims(Some(PixelDimensions {
            xppu: (pix.xres() as f64 * INCHES_PER_METER).round() as u32,
            yppu: (pix.yres() as f64 * INCHES_PER_METER).round() as u32,
            unit: Unit::Meter,
        }));
    }

    let mut writer = encoder
        .write_header()
        .map_err(|e| IoError::EncodeError(format!("PNG header error: {}", e)))?;

    let mut data = Vec::with_capacity(width as usize * height as usize * samples);
    for y in 0..height {
        for x in 0..width {
            let v = pix.get_pixel_unchecked(x, y);
            match pix.depth() {
                PixelDepth::Bit1 => data.push(if v != 0 { 0 } else { 255 }),
                PixelDepth::Bit8 => data.push(v as u8),
                PixelDepth::Bit32 => {
                    let (r, g, b) = color::extract_rgb(v);
                    data.extend_from_slice(&[r, g, b]);
                }
            }
        }
    }

    writer
        .write_image_data(&data)
        .map_err(|e| IoError::EncodeError(format!("PNG write error: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_png_gray_with_resolution() {
        let mut pm = Pix::new_filled(7, 5, PixelDepth::Bit8, 255).unwrap().to_mut();
        pm.set_pixel(3, 2, 40).unwrap();
        pm.set_resolution(300, 300);
        let pix: Pix = pm.into();

        let mut bytes = Vec::new();
        write_png(&pix, &mut bytes).unwrap();
        let back = read_png(Cursor::new(bytes)).unwrap();
        assert_eq!(back.depth(), PixelDepth::Bit8);
        assert_eq!(back.get_pixel(3, 2), Some(40));
        assert_eq!(back.xres(), 300);
    }
}
