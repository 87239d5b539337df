//! TIFF image format support
//!
//! Scanner output is commonly one multi-page TIFF per stack of sheets, so
//! reading always returns every page in file order.

use crate::{IoError, IoResult};
use bubblemark_core::{ImageFormat, Pix, PixelDepth, color};
use std::io::{Read, Seek, Write};
use tiff::ColorType;
use tiff::decoder::ifd::Value;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{Gray8, RGB8};
use tiff::encoder::{Rational, TiffEncoder};
use tiff::tags::{ResolutionUnit, Tag};

/// Read every page of a TIFF file.
pub fn read_tiff_multipage<R: Read + Seek>(reader: R) -> IoResult<Vec<Pix>> {
    let mut decoder = Decoder::new(reader)
        .map_err(|e| IoError::DecodeError(format!("TIFF decode error: {}", e)))?;

    let mut pages = Vec::new();
    loop {
        pages.push(decode_tiff_image(&mut decoder)?);
        if !decoder.more_images() {
            break;
        }
        decoder
            .next_image()
            .map_err(|e| IoError::DecodeError(format!("TIFF page navigation error: {}", e)))?;
    }
    Ok(pages)
}

/// Decode a TIFF image from the current decoder position
fn decode_tiff_image<R: Read + Seek>(decoder: &mut Decoder<R>) -> IoResult<Pix> {
    let (width, height) = decoder
        .dimensions()
        .map_err(|e| IoError::DecodeError(format!("Failed to get TIFF dimensions: {}", e)))?;
    let color_type = decoder
        .colortype()
        .map_err(|e| IoError::DecodeError(format!("Failed to get TIFF color type: {}", e)))?;
    // PhotometricInterpretation 0 = WhiteIsZero
    let white_is_zero = decoder
        .get_tag_u32(Tag::PhotometricInterpretation)
        .map(|v| v == 0)
        .unwrap_or(false);
    let xres = resolution_tag(decoder, Tag::XResolution);
    let yres = resolution_tag(decoder, Tag::YResolution);

    let image = decoder
        .read_image()
        .map_err(|e| IoError::DecodeError(format!("Failed to read TIFF image data: {}", e)))?;

    let (depth, sample) = match (color_type, &image) {
        (ColorType::Gray(1), DecodingResult::U8(_)) => (PixelDepth::Bit8, Sample::Bilevel),
        (ColorType::Gray(8), DecodingResult::U8(_)) => (PixelDepth::Bit8, Sample::Gray8),
        (ColorType::Gray(16), DecodingResult::U16(_)) => (PixelDepth::Bit8, Sample::Gray16),
        (ColorType::RGB(8), DecodingResult::U8(_)) => (PixelDepth::Bit32, Sample::Rgb(3)),
        (ColorType::RGBA(8), DecodingResult::U8(_)) => (PixelDepth::Bit32, Sample::Rgb(4)),
        _ => {
            return Err(IoError::UnsupportedFormat(format!(
                "unsupported TIFF color type: {:?}",
                color_type
            )));
        }
    };

    let mut pix_mut = Pix::new(width, height, depth)?.to_mut();
    pix_mut.set_informat(ImageFormat::Tiff);
    if let Some(xr) = xres.filter(|v| *v > 0.0) {
        let yr = yres.filter(|v| *v > 0.0).unwrap_or(xr);
        pix_mut.set_resolution(xr.round() as i32, yr.round() as i32);
    }

    let row_bytes = width.div_ceil(8) as usize;
    for y in 0..height {
        for x in 0..width {
            let idx = y as usize * width as usize + x as usize;
            let mut val = match (&sample, &image) {
                (Sample::Bilevel, DecodingResult::U8(buf)) => {
                    let byte = buf[y as usize * row_bytes + (x / 8) as usize];
                    if (byte >> (7 - (x % 8))) & 1 != 0 {
                        255
                    } else {
                        0
                    }
                }
                (Sample::Gray8, DecodingResult::U8(buf)) => buf[idx] as u32,
                (Sample::Gray16, DecodingResult::U16(buf)) => (buf[idx] >> 8) as u32,
                (Sample::Rgb(n), DecodingResult::U8(buf)) => {
                    let i = idx * n;
                    color::compose_rgb(buf[i], buf[i + 1], buf[i + 2])
                }
                _ => 0,
            };
            if white_is_zero && depth == PixelDepth::Bit8 {
                val = 255 - val;
            }
            pix_mut.set_pixel_unchecked(x, y, val);
        }
    }
    Ok(pix_mut.into())
}

/// XResolution and YResolution are RATIONAL; some writers store FLOAT.
fn resolution_tag<R: Read + Seek>(decoder: &mut Decoder<R>, tag: Tag) -> Option<f32> {
    match decoder.find_tag(tag).ok()?? {
        Value::Rational(n, d) if d != 0 => Some(n as f32 / d as f32),
        Value::Float(v) => Some(v),
        Value::Double(v) => Some(v as f32),
        Value::Short(v) => Some(v as f32),
        Value::Unsigned(v) => Some(v as f32),
        _ => None,
    }
}

enum Sample {
    Bilevel,
    Gray8,
    Gray16,
    Rgb(usize),
}

/// Write pages as one multi-page TIFF.
///
/// 1 and 8 bpp pages are stored as 8-bit grayscale, 32 bpp pages as RGB.
pub fn write_tiff_multipage<W: Write + Seek>(pages: &[&Pix], writer: W) -> IoResult<()> {
    if pages.is_empty() {
        return Err(IoError::InvalidData("no pages to write".to_string()));
    }

    let mut encoder = TiffEncoder::new(writer)
        .map_err(|e| IoError::EncodeError(format!("TIFF encoder error: {}", e)))?;

    for pix in pages {
        write_pix_page_to_encoder(&mut encoder, pix)?;
    }
    Ok(())
}

/// Write a Pix page to a TiffEncoder
fn write_pix_page_to_encoder<W: Write + Seek>(
    encoder: &mut TiffEncoder<W>,
    pix: &Pix,
) -> IoResult<()> {
    let (width, height) = (pix.width(), pix.height());
    let dpi = (pix.xres() > 0).then(|| pix.xres() as u32);

    match pix.depth() {
        PixelDepth::Bit1 | PixelDepth::Bit8 => {
            let gray = bubblemark_core::pix::convert::convert_to_gray(pix)?;
            let mut data = vec![0u8; (width * height) as usize];
            for y in 0..height {
                for x in 0..width {
                    data[(y * width + x) as usize] = gray.get_pixel_unchecked(x, y) as u8;
                }
            }
            let mut image = encoder
                .new_image::<Gray8>(width, height)
                .map_err(|e| IoError::EncodeError(format!("TIFF write error: {}", e)))?;
            if let Some(dpi) = dpi {
                image.resolution(ResolutionUnit::Inch, Rational { n: dpi, d: 1 });
            }
            image
                .write_data(&data)
                .map_err(|e| IoError::EncodeError(format!("TIFF write error: {}", e)))?;
        }
        PixelDepth::Bit32 => {
            let mut data = vec![0u8; (width * height * 3) as usize];
            for y in 0..height {
                for x in 0..width {
                    let (r, g, b) = color::extract_rgb(pix.get_pixel_unchecked(x, y));
                    let idx = ((y * width + x) * 3) as usize;
                    data[idx..idx + 3].copy_from_slice(&[r, g, b]);
                }
            }
            let mut image = encoder
                .new_image::<RGB8>(width, height)
                .map_err(|e| IoError::EncodeError(format!("TIFF write error: {}", e)))?;
            if let Some(dpi) = dpi {
                image.resolution(ResolutionUnit::Inch, Rational { n: dpi, d: 1 });
            }
            image
                .write_data(&data)
                .map_err(|e| IoError::EncodeError(format!("TIFF write error: {}", e)))?;
        }
    }
    Ok(())
}
