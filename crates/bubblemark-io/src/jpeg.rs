//! JPEG image format support
//!
//! Reads with `jpeg-decoder`, writes with `jpeg-encoder`. Phone photographs
//! of sheets usually arrive as JPEG.

use crate::{IoError, IoResult};
use bubblemark_core::{ImageFormat, Pix, PixelDepth, color};
use jpeg_decoder::PixelFormat;
use std::io::Read;

/// Read a JPEG image from a reader.
///
/// # Returns
/// A `Pix` at 8 bpp (grayscale) or 32 bpp (RGB).
pub fn read_jpeg<R: Read>(reader: R) -> IoResult<Pix> {
    let mut decoder = jpeg_decoder::Decoder::new(reader);
    let data = decoder
        .decode()
        .map_err(|e| IoError::DecodeError(format!("JPEG decode error: {}", e)))?;
    let info = decoder
        .info()
        .ok_or_else(|| IoError::DecodeError("JPEG header missing".to_string()))?;
    let (width, height) = (info.width as u32, info.height as u32);

    let (depth, stride) = match info.pixel_format {
        PixelFormat::L8 => (PixelDepth::Bit8, 1usize),
        PixelFormat::L16 => (PixelDepth::Bit8, 2),
        PixelFormat::RGB24 => (PixelDepth::Bit32, 3),
        PixelFormat::CMYK32 => (PixelDepth::Bit32, 4),
    };

    let mut pix_mut = Pix::new(width, height, depth)?.to_mut();
    pix_mut.set_informat(ImageFormat::Jpeg);
    for y in 0..height {
        for x in 0..width {
            let i = (y as usize * width as usize + x as usize) * stride;
            let val = match info.pixel_format {
                PixelFormat::L8 => data[i] as u32,
                // big-endian samples, keep the high byte
                PixelFormat::L16 => data[i] as u32,
                PixelFormat::RGB24 => color::compose_rgb(data[i], data[i + 1], data[i + 2]),
                PixelFormat::CMYK32 => {
                    let k = data[i + 3] as u32;
                    let conv = |c: u8| (255 - ((c as u32 + k).min(255))) as u8;
                    color::compose_rgb(conv(data[i]), conv(data[i + 1]), conv(data[i + 2]))
                }
            };
            pix_mut.set_pixel_unchecked(x, y, val);
        }
    }

    Ok(pix_mut.into())
}

/// Encode an image as baseline JPEG at the given quality (1-100).
pub fn write_jpeg(pix: &Pix, quality: u8) -> IoResult<Vec<u8>> {
    let (width, height) = (pix.width(), pix.height());
    if width > u16::MAX as u32 || height > u16::MAX as u32 {
        return Err(IoError::InvalidData(format!(
            "image too large for JPEG: {}x{}",
            width, height
        )));
    }

    let (color_type, data) = match pix.depth() {
        PixelDepth::Bit1 | PixelDepth::Bit8 => {
            let gray = bubblemark_core::pix::convert::convert_to_gray(pix)?;
            let mut data = Vec::with_capacity((width * height) as usize);
            for y in 0..height {
                for x in 0..width {
                    data.push(gray.get_pixel_unchecked(x, y) as u8);
                }
            }
            (jpeg_encoder::ColorType::Luma, data)
        }
        PixelDepth::Bit32 => {
            let mut data = Vec::with_capacity((width * height * 3) as usize);
            for y in 0..height {
                for x in 0..width {
                    let (r, g, b) = color::extract_rgb(pix.get_pixel_unchecked(x, y));
                    data.extend_from_slice(&[r, g, b]);
                }
            }
            (jpeg_encoder::ColorType::Rgb, data)
        }
    };

    let mut out = Vec::new();
    let mut encoder = jpeg_encoder::Encoder::new(&mut out, quality.clamp(1, 100));
    if pix.xres() > 0 && pix.yres() > 0 {
        encoder.set_density(jpeg_encoder::PixelDensity {
            density: (pix.xres() as u16, pix.yres() as u16),
            unit: jpeg_encoder::PixelDensityUnit::Inches,
        });
    }
    encoder
        .encode(&data, width as u16, height as u16, color_type)
        .map_err(|e| IoError::EncodeError(format!("JPEG encode error: {}", e)))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_jpeg_gray_survives_lossy_round_trip() {
        let mut pm = Pix::new_filled(32, 32, PixelDepth::Bit8, 255).unwrap().to_mut();
        pm.fill_rect(8.0, 8.0, 24.0, 24.0, 0);
        let pix: Pix = pm.into();

        let bytes = write_jpeg(&pix, 95).unwrap();
        let back = read_jpeg(Cursor::new(bytes)).unwrap();
        assert_eq!((back.width(), back.height()), (32, 32));
        assert!(back.get_pixel(16, 16).unwrap() < 40);
        assert!(back.get_pixel(2, 2).unwrap() > 215);
    }
}
