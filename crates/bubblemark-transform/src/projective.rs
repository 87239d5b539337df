//! Projective transformations for images
//!
//! A [`Homography`] is estimated from point correspondences with the direct
//! linear transform on Hartley-normalized points. [`warp_perspective`]
//! resamples a page into the destination plane by inverse mapping each
//! output pixel center and interpolating bilinearly.
//!
//! Coordinates are continuous: pixel `(x, y)` covers `[x, x+1) x [y, y+1)`
//! and its center is `(x + 0.5, y + 0.5)`.

use crate::{TransformError, TransformResult};
use bubblemark_core::{Pix, PixelDepth, Point, color};
use nalgebra::{DMatrix, Matrix3, SymmetricEigen, Vector3};

/// Minimum triangle area, relative to the squared longest edge, below which
/// three corners of a quad count as collinear.
const COLLINEAR_RATIO: f64 = 0.01;

/// Background fill for pixels mapped from outside the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectiveFill {
    /// Fill with white (paper)
    #[default]
    White,
    /// Fill with black
    Black,
}

impl ProjectiveFill {
    fn to_value(self, depth: PixelDepth) -> u32 {
        match (self, depth) {
            (ProjectiveFill::White, PixelDepth::Bit32) => color::compose_rgb(255, 255, 255),
            (ProjectiveFill::White, d) => d.max_value(),
            (ProjectiveFill::Black, PixelDepth::Bit32) => color::compose_rgb(0, 0, 0),
            (ProjectiveFill::Black, _) => 0,
        }
    }
}

/// 3x3 plane-to-plane projective mapping, normalized so `h[2][2] == 1`
/// whenever that entry is non-zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    m: Matrix3<f64>,
}

impl Homography {
    /// The identity mapping
    pub fn identity() -> Self {
        Self {
            m: Matrix3::identity(),
        }
    }

    /// Wrap an explicit matrix
    pub fn from_matrix(m: Matrix3<f64>) -> Self {
        Self { m }
    }

    /// The underlying matrix
    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.m
    }

    /// Estimate the mapping `src[i] -> dst[i]` from four or more pairs.
    pub fn from_points(src: &[Point], dst: &[Point]) -> TransformResult<Self> {
        let n = src.len();
        if n < 4 || dst.len() != n {
            return Err(TransformError::InvalidParameters(format!(
                "need at least 4 matching point pairs, got {} and {}",
                n,
                dst.len()
            )));
        }

        let (t_src, src_n) = normalize_points(src);
        let (t_dst, dst_n) = normalize_points(dst);

        let mut a = DMatrix::zeros(2 * n, 9);
        for i in 0..n {
            let (sx, sy) = src_n[i];
            let (dx, dy) = dst_n[i];

            a[(2 * i, 3)] = -sx;
            a[(2 * i, 4)] = -sy;
            a[(2 * i, 5)] = -1.0;
            a[(2 * i, 6)] = dy * sx;
            a[(2 * i, 7)] = dy * sy;
            a[(2 * i, 8)] = dy;

            a[(2 * i + 1, 0)] = sx;
            a[(2 * i + 1, 1)] = sy;
            a[(2 * i + 1, 2)] = 1.0;
            a[(2 * i + 1, 6)] = -dx * sx;
            a[(2 * i + 1, 7)] = -dx * sy;
            a[(2 * i + 1, 8)] = -dx;
        }

        // null vector of A = eigenvector of the smallest eigenvalue of A^T A
        let eig = SymmetricEigen::new(a.transpose() * &a);
        let min_idx = eig
            .eigenvalues
            .iter()
            .enumerate()
            .min_by(|(_, x), (_, y)| x.abs().total_cmp(&y.abs()))
            .map(|(i, _)| i)
            .unwrap_or(0);
        let v = eig.eigenvectors.column(min_idx);
        let h_norm = Matrix3::new(v[0], v[1], v[2], v[3], v[4], v[5], v[6], v[7], v[8]);

        let t_dst_inv = t_dst
            .try_inverse()
            .ok_or(TransformError::SingularMatrix)?;
        let h = t_dst_inv * h_norm * t_src;

        let scale = h[(2, 2)];
        let m = if scale.abs() < 1e-15 { h } else { h / scale };
        if m.iter().any(|v| !v.is_finite()) || m.determinant().abs() < 1e-12 {
            return Err(TransformError::SingularMatrix);
        }
        Ok(Self { m })
    }

    /// Estimate the mapping between two quads given as
    /// `[top_left, top_right, bottom_left, bottom_right]`.
    ///
    /// Both quads are checked with [`check_quad`] first.
    pub fn from_quad(src: &[Point; 4], dst: &[Point; 4]) -> TransformResult<Self> {
        check_quad(src)?;
        check_quad(dst)?;
        Self::from_points(src, dst)
    }

    /// Map a point. Points on the line at infinity map to NaN.
    pub fn project(&self, p: Point) -> Point {
        let q = self.m * Vector3::new(p.x, p.y, 1.0);
        if q[2].abs() < 1e-15 {
            return Point::new(f64::NAN, f64::NAN);
        }
        Point::new(q[0] / q[2], q[1] / q[2])
    }

    /// The reverse mapping
    pub fn inverse(&self) -> TransformResult<Self> {
        let inv = self
            .m
            .try_inverse()
            .ok_or(TransformError::SingularMatrix)?;
        let scale = inv[(2, 2)];
        Ok(Self {
            m: if scale.abs() < 1e-15 { inv } else { inv / scale },
        })
    }
}

/// Translate the centroid to the origin and scale to mean distance sqrt(2).
fn normalize_points(pts: &[Point]) -> (Matrix3<f64>, Vec<(f64, f64)>) {
    let n = pts.len() as f64;
    let cx = pts.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = pts.iter().map(|p| p.y).sum::<f64>() / n;
    let mean_dist = pts
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    let s = if mean_dist > 1e-15 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = pts
        .iter()
        .map(|p| (s * (p.x - cx), s * (p.y - cy)))
        .collect();
    (t, normalized)
}

fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Reject quads that cannot anchor a perspective correction.
///
/// Corners are `[top_left, top_right, bottom_left, bottom_right]`. The quad
/// must be strictly convex, every corner triple must enclose a triangle of
/// non-trivial area, and no two corners may coincide.
pub fn check_quad(corners: &[Point; 4]) -> TransformResult<()> {
    // walk the boundary: TL -> TR -> BR -> BL
    let ring = [corners[0], corners[1], corners[3], corners[2]];
    if ring.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(TransformError::DegenerateQuad(
            "corner coordinates are not finite".to_string(),
        ));
    }

    let mut longest2 = 0.0f64;
    for i in 0..4 {
        for j in (i + 1)..4 {
            let d = ring[i].distance(&ring[j]);
            if d < 1e-6 {
                return Err(TransformError::DegenerateQuad(
                    "two corners coincide".to_string(),
                ));
            }
            longest2 = longest2.max(d * d);
        }
    }

    let mut sign = 0.0f64;
    for i in 0..4 {
        let c = cross(ring[i], ring[(i + 1) % 4], ring[(i + 2) % 4]);
        if c.abs() / 2.0 < COLLINEAR_RATIO * longest2 {
            return Err(TransformError::DegenerateQuad(format!(
                "corners are nearly collinear (triangle area {:.3})",
                c.abs() / 2.0
            )));
        }
        if sign == 0.0 {
            sign = c.signum();
        } else if c.signum() != sign {
            return Err(TransformError::DegenerateQuad(
                "quadrilateral is not convex".to_string(),
            ));
        }
    }
    Ok(())
}

/// Warp `pix` into a `width x height` image.
///
/// `h` maps source coordinates to output coordinates. Each output pixel
/// center is mapped back through the inverse and sampled bilinearly;
/// samples falling outside the source take the fill value. 8 bpp and
/// 32 bpp images are supported.
pub fn warp_perspective(
    pix: &Pix,
    h: &Homography,
    width: u32,
    height: u32,
    fill: ProjectiveFill,
) -> TransformResult<Pix> {
    if width == 0 || height == 0 {
        return Err(TransformError::InvalidParameters(format!(
            "output size must be positive: {}x{}",
            width, height
        )));
    }
    let depth = pix.depth();
    if depth == PixelDepth::Bit1 {
        return Err(TransformError::UnsupportedDepth(
            "perspective warp needs 8 or 32 bpp".to_string(),
        ));
    }
    let inv = h.inverse()?;
    let fill_value = fill.to_value(depth);

    let mut out = Pix::new(width, height, depth)?.to_mut();
    out.set_resolution(pix.xres(), pix.yres());
    for y in 0..height {
        for x in 0..width {
            let src = inv.project(Point::new(x as f64 + 0.5, y as f64 + 0.5));
            let val = sample_bilinear(pix, src.x - 0.5, src.y - 0.5).unwrap_or(fill_value);
            out.set_pixel_unchecked(x, y, val);
        }
    }
    Ok(out.into())
}

/// Bilinear sample at index-space position `(fx, fy)`.
///
/// Returns `None` when the position lies outside the image by half a pixel
/// or more. Edge pixels are extended across the last half pixel.
fn sample_bilinear(pix: &Pix, fx: f64, fy: f64) -> Option<u32> {
    let (w, h) = (pix.width() as f64, pix.height() as f64);
    if !fx.is_finite() || !fy.is_finite() || fx < -0.5 || fy < -0.5 || fx > w - 0.5 || fy > h - 0.5
    {
        return None;
    }
    let fx = fx.clamp(0.0, w - 1.0);
    let fy = fy.clamp(0.0, h - 1.0);
    let (x0, y0) = (fx.floor() as u32, fy.floor() as u32);
    let x1 = (x0 + 1).min(pix.width() - 1);
    let y1 = (y0 + 1).min(pix.height() - 1);
    let (ax, ay) = (fx - x0 as f64, fy - y0 as f64);

    let p00 = pix.get_pixel_unchecked(x0, y0);
    let p10 = pix.get_pixel_unchecked(x1, y0);
    let p01 = pix.get_pixel_unchecked(x0, y1);
    let p11 = pix.get_pixel_unchecked(x1, y1);
    let mix = |a: u32, b: u32, c: u32, d: u32| -> u32 {
        let top = a as f64 * (1.0 - ax) + b as f64 * ax;
        let bottom = c as f64 * (1.0 - ax) + d as f64 * ax;
        (top * (1.0 - ay) + bottom * ay).round().clamp(0.0, 255.0) as u32
    };

    Some(match pix.depth() {
        PixelDepth::Bit32 => {
            let channel = |shift: u32| {
                mix(
                    (p00 >> shift) & 0xff,
                    (p10 >> shift) & 0xff,
                    (p01 >> shift) & 0xff,
                    (p11 >> shift) & 0xff,
                )
            };
            color::compose_rgb(
                channel(color::RED_SHIFT) as u8,
                channel(color::GREEN_SHIFT) as u8,
                channel(color::BLUE_SHIFT) as u8,
            )
        }
        _ => mix(p00, p10, p01, p11),
    })
}
