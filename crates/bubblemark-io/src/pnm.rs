//! PNM (PBM / PGM / PPM) support
//!
//! Both the ASCII (P1-P3) and binary (P4-P6) variants are read. Writing
//! produces binary PGM or PPM.

use crate::{IoError, IoResult};
use bubblemark_core::{ImageFormat, Pix, PixelDepth, color};
use std::io::Write;

struct Header {
    kind: u8,
    width: u32,
    height: u32,
    maxval: u32,
    data_start: usize,
}

/// Read a PNM image from memory.
pub fn read_pnm(data: &[u8]) -> IoResult<Pix> {
    let header = parse_header(data)?;
    let depth = match header.kind {
        b'1' | b'4' => PixelDepth::Bit1,
        b'2' | b'5' => PixelDepth::Bit8,
        _ => PixelDepth::Bit32,
    };
    let (w, h) = (header.width, header.height);
    let mut pm = Pix::new(w, h, depth)?.to_mut();
    pm.set_informat(ImageFormat::Pnm);

    let body = &data[header.data_start..];
    let scale = |v: u32| -> u32 {
        if header.maxval == 255 {
            v
        } else {
            (v * 255 + header.maxval / 2) / header.maxval
        }
    };

    match header.kind {
        b'1' | b'2' | b'3' => {
            let mut values = ascii_values(body, header.kind == b'1');
            for y in 0..h {
                for x in 0..w {
                    let val = match header.kind {
                        b'1' => next_value(&mut values)? & 1,
                        b'2' => scale(next_value(&mut values)?),
                        _ => {
                            let r = scale(next_value(&mut values)?) as u8;
                            let g = scale(next_value(&mut values)?) as u8;
                            let b = scale(next_value(&mut values)?) as u8;
                            color::compose_rgb(r, g, b)
                        }
                    };
                    pm.set_pixel_unchecked(x, y, val);
                }
            }
        }
        b'4' => {
            let row_bytes = w.div_ceil(8) as usize;
            require_len(body, row_bytes * h as usize)?;
            for y in 0..h {
                for x in 0..w {
                    let byte = body[y as usize * row_bytes + (x / 8) as usize];
                    pm.set_pixel_unchecked(x, y, ((byte >> (7 - (x % 8))) & 1) as u32);
                }
            }
        }
        b'5' | b'6' => {
            if header.maxval > 255 {
                return Err(IoError::UnsupportedFormat(
                    "16-bit PNM samples".to_string(),
                ));
            }
            let spp = if header.kind == b'5' { 1 } else { 3 };
            require_len(body, (w * h) as usize * spp)?;
            for y in 0..h {
                for x in 0..w {
                    let i = (y * w + x) as usize * spp;
                    let val = if spp == 1 {
                        scale(body[i] as u32)
                    } else {
                        color::compose_rgb(
                            scale(body[i] as u32) as u8,
                            scale(body[i + 1] as u32) as u8,
                            scale(body[i + 2] as u32) as u8,
                        )
                    };
                    pm.set_pixel_unchecked(x, y, val);
                }
            }
        }
        _ => unreachable!("kind validated by parse_header"),
    }
    Ok(pm.into())
}

/// Write binary PGM (1 / 8 bpp) or PPM (32 bpp).
pub fn write_pnm<W: Write>(pix: &Pix, mut writer: W) -> IoResult<()> {
    let (w, h) = (pix.width(), pix.height());
    match pix.depth() {
        PixelDepth::Bit1 | PixelDepth::Bit8 => {
            let gray = bubblemark_core::pix::convert::convert_to_gray(pix)?;
            write!(writer, "P5\n{} {}\n255\n", w, h)?;
            let mut row = Vec::with_capacity(w as usize);
            for y in 0..h {
                row.clear();
                row.extend((0..w).map(|x| gray.get_pixel_unchecked(x, y) as u8));
                writer.write_all(&row)?;
            }
        }
        PixelDepth::Bit32 => {
            write!(writer, "P6\n{} {}\n255\n", w, h)?;
            for y in 0..h {
                for x in 0..w {
                    let (r, g, b) = color::extract_rgb(pix.get_pixel_unchecked(x, y));
                    writer.write_all(&[r, g, b])?;
                }
            }
        }
    }
    Ok(())
}

fn parse_header(data: &[u8]) -> IoResult<Header> {
    if data.len() < 2 || data[0] != b'P' || !(b'1'..=b'6').contains(&data[1]) {
        return Err(IoError::DecodeError("not a PNM header".to_string()));
    }
    let kind = data[1];
    let needs_maxval = !matches!(kind, b'1' | b'4');
    let mut pos = 2;
    let mut fields = [0u32; 3];
    let count = if needs_maxval { 3 } else { 2 };
    for field in fields.iter_mut().take(count) {
        pos = skip_space_and_comments(data, pos);
        let start = pos;
        while pos < data.len() && data[pos].is_ascii_digit() {
            pos += 1;
        }
        if start == pos {
            return Err(IoError::DecodeError("truncated PNM header".to_string()));
        }
        *field = std::str::from_utf8(&data[start..pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| IoError::DecodeError("bad PNM header number".to_string()))?;
    }
    // exactly one whitespace byte separates the header from binary data
    let data_start = if matches!(kind, b'4' | b'5' | b'6') {
        pos + 1
    } else {
        pos
    };
    let maxval = if needs_maxval { fields[2] } else { 1 };
    if fields[0] == 0 || fields[1] == 0 || maxval == 0 || data_start > data.len() {
        return Err(IoError::DecodeError("invalid PNM header values".to_string()));
    }
    Ok(Header {
        kind,
        width: fields[0],
        height: fields[1],
        maxval,
        data_start,
    })
}

fn skip_space_and_comments(data: &[u8], mut pos: usize) -> usize {
    while pos < data.len() {
        if data[pos].is_ascii_whitespace() {
            pos += 1;
        } else if data[pos] == b'#' {
            while pos < data.len() && data[pos] != b'\n' {
                pos += 1;
            }
        } else {
            break;
        }
    }
    pos
}

/// Iterate over ASCII samples. P1 allows digits without separators.
fn ascii_values(body: &[u8], single_digits: bool) -> impl Iterator<Item = Option<u32>> + '_ {
    let mut pos = 0;
    std::iter::from_fn(move || {
        pos = skip_space_and_comments(body, pos);
        if pos >= body.len() {
            return None;
        }
        let start = pos;
        if single_digits {
            pos += 1;
        } else {
            while pos < body.len() && body[pos].is_ascii_digit() {
                pos += 1;
            }
        }
        let text = std::str::from_utf8(&body[start..pos.max(start + 1)]).ok()?;
        Some(text.parse().ok())
    })
}

fn next_value(values: &mut impl Iterator<Item = Option<u32>>) -> IoResult<u32> {
    values
        .next()
        .flatten()
        .ok_or_else(|| IoError::DecodeError("truncated or invalid PNM sample data".to_string()))
}

fn require_len(body: &[u8], needed: usize) -> IoResult<()> {
    if body.len() < needed {
        return Err(IoError::DecodeError(format!(
            "PNM data truncated: {} < {} bytes",
            body.len(),
            needed
        )));
    }
    Ok(())
}
