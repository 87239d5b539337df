//! The image container
//!
//! Every raster in the workspace is a [`Pix`]: decoded scans, binarized
//! masks, aligned pages and visualization overlays. Rows are packed into
//! 32-bit words, most significant bits first, and padded to a word
//! boundary. Color pixels are `0xRRGGBBAA`.
//!
//! A `Pix` is shared and read-only; cloning it is a reference count bump.
//! Editing goes through [`Pix::to_mut`], which copies, and the resulting
//! [`PixMut`] turns back into a `Pix` with `into()`.

mod access;
pub mod convert;
pub mod graphics;

use crate::error::{Error, Result};
use std::sync::Arc;

/// Pixel depth (bits per pixel)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum PixelDepth {
    /// 1-bit binary image, 1 = foreground (dark)
    Bit1 = 1,
    /// 8-bit grayscale, 0 = black
    Bit8 = 8,
    /// 32-bit RGB or RGBA
    Bit32 = 32,
}

impl PixelDepth {
    pub fn bits(self) -> u32 {
        self as u32
    }

    /// Largest sample value; white for gray, opaque white for color
    pub fn max_value(self) -> u32 {
        match self {
            PixelDepth::Bit32 => u32::MAX,
            _ => (1u32 << self.bits()) - 1,
        }
    }
}

/// Container format of an upload or an encoded page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageFormat {
    #[default]
    Unknown,
    Jpeg,
    Png,
    /// Single or multi-page
    Tiff,
    /// PBM / PGM / PPM
    Pnm,
    Pdf,
}

#[derive(Debug, Clone)]
struct PixData {
    width: u32,
    height: u32,
    depth: PixelDepth,
    /// words per row
    wpl: u32,
    /// dots per inch, 0 when the source did not say
    xres: i32,
    yres: i32,
    informat: ImageFormat,
    data: Vec<u32>,
}

/// Shared, immutable image
///
/// # Examples
///
/// ```
/// use bubblemark_core::{Pix, PixelDepth};
///
/// let pix = Pix::new(640, 480, PixelDepth::Bit8).unwrap();
/// assert_eq!(pix.width(), 640);
/// assert_eq!(pix.height(), 480);
/// ```
#[derive(Debug, Clone)]
pub struct Pix {
    inner: Arc<PixData>,
}

impl Pix {
    /// Zero-filled image: black for gray, background for binary.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDimension`] if either side is 0.
    pub fn new(width: u32, height: u32, depth: PixelDepth) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimension { width, height });
        }
        let bits = u64::from(width) * u64::from(depth.bits());
        let wpl = u32::try_from(bits.div_ceil(32))
            .map_err(|_| Error::InvalidDimension { width, height })?;
        Ok(Pix {
            inner: Arc::new(PixData {
                width,
                height,
                depth,
                wpl,
                xres: 0,
                yres: 0,
                informat: ImageFormat::Unknown,
                data: vec![0u32; wpl as usize * height as usize],
            }),
        })
    }

    /// Image with every pixel set to `value`, e.g. a white page.
    pub fn new_filled(width: u32, height: u32, depth: PixelDepth, value: u32) -> Result<Self> {
        let pix = Self::new(width, height, depth)?;
        let mut pm = pix.to_mut();
        pm.set_all(value);
        Ok(pm.into())
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.inner.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.inner.height
    }

    #[inline]
    pub fn depth(&self) -> PixelDepth {
        self.inner.depth
    }

    /// Words per packed row
    #[inline]
    pub fn wpl(&self) -> u32 {
        self.inner.wpl
    }

    /// Horizontal resolution in DPI, 0 if unknown
    #[inline]
    pub fn xres(&self) -> i32 {
        self.inner.xres
    }

    #[inline]
    pub fn yres(&self) -> i32 {
        self.inner.yres
    }

    /// Format the image was decoded from
    #[inline]
    pub fn informat(&self) -> ImageFormat {
        self.inner.informat
    }

    /// Blank image of the same size, depth and resolution
    pub fn create_template(&self) -> Self {
        let mut inner = (*self.inner).clone();
        inner.data.fill(0);
        Pix {
            inner: Arc::new(inner),
        }
    }

    /// Editable copy
    pub fn to_mut(&self) -> PixMut {
        PixMut {
            inner: (*self.inner).clone(),
        }
    }
}

/// Editable image, see [`Pix::to_mut`]
#[derive(Debug)]
pub struct PixMut {
    inner: PixData,
}

impl PixMut {
    #[inline]
    pub fn width(&self) -> u32 {
        self.inner.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.inner.height
    }

    #[inline]
    pub fn depth(&self) -> PixelDepth {
        self.inner.depth
    }

    pub fn set_resolution(&mut self, xres: i32, yres: i32) {
        self.inner.xres = xres;
        self.inner.yres = yres;
    }

    pub fn set_informat(&mut self, format: ImageFormat) {
        self.inner.informat = format;
    }

    /// Paint the whole image with `value`
    pub fn set_all(&mut self, value: u32) {
        let words = match self.inner.depth {
            PixelDepth::Bit1 if value & 1 == 1 => u32::MAX,
            PixelDepth::Bit1 => 0,
            PixelDepth::Bit8 => (value & 0xff) * 0x0101_0101,
            PixelDepth::Bit32 => value,
        };
        // row padding ends up set too; readers never look at it
        self.inner.data.fill(words);
    }
}

impl From<PixMut> for Pix {
    fn from(pix_mut: PixMut) -> Self {
        Pix {
            inner: Arc::new(pix_mut.inner),
        }
    }
}
