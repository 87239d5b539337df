//! bubblemark-core - Basic data structures for mark recognition
//!
//! This crate provides the fundamental types shared by the rest of the
//! workspace:
//!
//! - [`Pix`] / [`PixMut`] - The image container (immutable / mutable)
//! - [`Box`] - Integer rectangle regions
//! - [`Point`], [`NormalizedPoint`], [`FrameBounds`] - The two coordinate
//!   systems of a bubble sheet and the one conversion between them
//! - [`PageDrawing`] / [`Shape`] - Resolution independent page description
//!   in PostScript points, shared by the PDF writer and the rasterizer

pub mod box_;
pub mod drawing;
pub mod error;
mod font;
pub mod geometry;
pub mod pix;
pub mod render;

pub use box_::Box;
pub use drawing::{Gray, PageDrawing, Shape, mm_to_pt, pt_to_mm};
pub use error::{Error, Result};
pub use geometry::{FrameBounds, NormalizedPoint, Point};
pub use pix::{ImageFormat, Pix, PixMut, PixelDepth};
pub use render::render_drawing;

/// Color channel helpers for 32-bit RGBA pixels.
///
/// # Pixel format
///
/// 32-bit pixels are stored as `0xRRGGBBAA` (red in MSB, alpha in LSB).
pub mod color {
    /// Shift amounts for extracting color channels
    pub const RED_SHIFT: u32 = 24;
    pub const GREEN_SHIFT: u32 = 16;
    pub const BLUE_SHIFT: u32 = 8;
    pub const ALPHA_SHIFT: u32 = 0;

    /// Extract red component from a 32-bit pixel.
    #[inline]
    pub fn red(pixel: u32) -> u8 {
        ((pixel >> RED_SHIFT) & 0xff) as u8
    }

    /// Extract green component from a 32-bit pixel.
    #[inline]
    pub fn green(pixel: u32) -> u8 {
        ((pixel >> GREEN_SHIFT) & 0xff) as u8
    }

    /// Extract blue component from a 32-bit pixel.
    #[inline]
    pub fn blue(pixel: u32) -> u8 {
        ((pixel >> BLUE_SHIFT) & 0xff) as u8
    }

    /// Compose a 32-bit RGB pixel (alpha = 255).
    #[inline]
    pub fn compose_rgb(r: u8, g: u8, b: u8) -> u32 {
        compose_rgba(r, g, b, 255)
    }

    /// Compose a 32-bit RGBA pixel.
    #[inline]
    pub fn compose_rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
        ((r as u32) << RED_SHIFT)
            | ((g as u32) << GREEN_SHIFT)
            | ((b as u32) << BLUE_SHIFT)
            | ((a as u32) << ALPHA_SHIFT)
    }

    /// Extract RGB values from a 32-bit pixel.
    #[inline]
    pub fn extract_rgb(pixel: u32) -> (u8, u8, u8) {
        (red(pixel), green(pixel), blue(pixel))
    }

    /// Luminance of an RGB triple using the ITU-R BT.601 weights.
    #[inline]
    pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
        let l = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        l.round().clamp(0.0, 255.0) as u8
    }
}
