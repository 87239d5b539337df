//! Connected component analysis
//!
//! Two-pass labeling over a binary image with a union-find table for
//! label equivalences. Component statistics are accumulated in the second
//! pass so callers get area, bounds and centroid without revisiting pixels.

use crate::error::{RegionError, RegionResult};
use bubblemark_core::{Box, Pix, PixelDepth};

/// Connectivity type for component analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectivityType {
    /// 4-way connectivity (up, down, left, right)
    #[default]
    FourWay,
    /// 8-way connectivity (includes diagonals)
    EightWay,
}

/// A connected component in an image
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectedComponent {
    /// Label, 1-based, in raster order of first pixel
    pub label: u32,
    /// Number of pixels in this component
    pub pixel_count: u32,
    /// Bounding box of this component
    pub bounds: Box,
    /// Mean x of member pixel centers
    pub centroid_x: f64,
    /// Mean y of member pixel centers
    pub centroid_y: f64,
}

impl ConnectedComponent {
    /// Fraction of the bounding box covered by the component.
    ///
    /// About 1.0 for a solid square and pi/4 for a solid disk.
    pub fn fill_ratio(&self) -> f64 {
        let area = self.bounds.area();
        if area == 0 {
            0.0
        } else {
            self.pixel_count as f64 / area as f64
        }
    }

    /// Centroid as `(x, y)`.
    pub fn centroid(&self) -> (f64, f64) {
        (self.centroid_x, self.centroid_y)
    }
}

struct UnionFind {
    parent: Vec<u32>,
}

impl UnionFind {
    fn new() -> Self {
        // label 0 is background
        Self { parent: vec![0] }
    }

    fn make(&mut self) -> u32 {
        let label = self.parent.len() as u32;
        self.parent.push(label);
        label
    }

    fn find(&mut self, mut x: u32) -> u32 {
        while self.parent[x as usize] != x {
            let grand = self.parent[self.parent[x as usize] as usize];
            self.parent[x as usize] = grand;
            x = grand;
        }
        x
    }

    fn union(&mut self, a: u32, b: u32) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi as usize] = lo;
        }
    }
}

fn check_1bpp(pix: &Pix) -> RegionResult<()> {
    if pix.depth() != PixelDepth::Bit1 {
        return Err(RegionError::UnsupportedDepth {
            expected: "1-bpp binary",
            actual: pix.depth().bits(),
        });
    }
    Ok(())
}

/// First pass: provisional labels plus the equivalence table.
fn provisional_labels(pix: &Pix, connectivity: ConnectivityType) -> (Vec<u32>, UnionFind) {
    let (w, h) = (pix.width() as usize, pix.height() as usize);
    let mut labels = vec![0u32; w * h];
    let mut uf = UnionFind::new();

    for y in 0..h {
        for x in 0..w {
            if pix.get_pixel_unchecked(x as u32, y as u32) == 0 {
                continue;
            }
            let mut neighbors = [0u32; 4];
            let mut n = 0;
            let mut push = |label: u32| {
                if label != 0 {
                    neighbors[n] = label;
                    n += 1;
                }
            };
            if x > 0 {
                push(labels[y * w + x - 1]);
            }
            if y > 0 {
                push(labels[(y - 1) * w + x]);
                if connectivity == ConnectivityType::EightWay {
                    if x > 0 {
                        push(labels[(y - 1) * w + x - 1]);
                    }
                    if x + 1 < w {
                        push(labels[(y - 1) * w + x + 1]);
                    }
                }
            }

            let label = if n == 0 {
                uf.make()
            } else {
                let first = neighbors[0];
                for &other in &neighbors[1..n] {
                    uf.union(first, other);
                }
                first
            };
            labels[y * w + x] = label;
        }
    }
    (labels, uf)
}

/// Resolve equivalences to dense labels `1..=count` in raster order.
fn resolve_labels(labels: &mut [u32], uf: &mut UnionFind) -> u32 {
    let mut dense = vec![0u32; uf.parent.len()];
    let mut count = 0;
    for label in labels.iter_mut() {
        if *label == 0 {
            continue;
        }
        let root = uf.find(*label) as usize;
        if dense[root] == 0 {
            count += 1;
            dense[root] = count;
        }
        *label = dense[root];
    }
    count
}

/// Find all connected components in a binary image
///
/// Components are returned in raster order of their first pixel.
pub fn find_connected_components(
    pix: &Pix,
    connectivity: ConnectivityType,
) -> RegionResult<Vec<ConnectedComponent>> {
    check_1bpp(pix)?;
    let (mut labels, mut uf) = provisional_labels(pix, connectivity);
    let count = resolve_labels(&mut labels, &mut uf) as usize;

    struct Acc {
        n: u32,
        sx: f64,
        sy: f64,
        x0: u32,
        y0: u32,
        x1: u32,
        y1: u32,
    }
    let mut acc: Vec<Acc> = (0..count)
        .map(|_| Acc {
            n: 0,
            sx: 0.0,
            sy: 0.0,
            x0: u32::MAX,
            y0: u32::MAX,
            x1: 0,
            y1: 0,
        })
        .collect();

    let w = pix.width() as usize;
    for (i, &label) in labels.iter().enumerate() {
        if label == 0 {
            continue;
        }
        let (x, y) = ((i % w) as u32, (i / w) as u32);
        let a = &mut acc[label as usize - 1];
        a.n += 1;
        a.sx += x as f64 + 0.5;
        a.sy += y as f64 + 0.5;
        a.x0 = a.x0.min(x);
        a.y0 = a.y0.min(y);
        a.x1 = a.x1.max(x);
        a.y1 = a.y1.max(y);
    }

    Ok(acc
        .into_iter()
        .enumerate()
        .map(|(i, a)| ConnectedComponent {
            label: i as u32 + 1,
            pixel_count: a.n,
            bounds: Box::from_corners(a.x0 as i32, a.y0 as i32, a.x1 as i32, a.y1 as i32),
            centroid_x: a.sx / a.n as f64,
            centroid_y: a.sy / a.n as f64,
        })
        .collect())
}

/// Label all connected components in a binary image
///
/// Returns a 32-bit image where each pixel contains the label of its
/// component (0 for background).
pub fn label_connected_components(pix: &Pix, connectivity: ConnectivityType) -> RegionResult<Pix> {
    check_1bpp(pix)?;
    let (mut labels, mut uf) = provisional_labels(pix, connectivity);
    resolve_labels(&mut labels, &mut uf);
    let w = pix.width();
    let mut out = Pix::new(w, pix.height(), PixelDepth::Bit32)?.to_mut();
    for (i, &label) in labels.iter().enumerate() {
        if label != 0 {
            out.set_pixel_unchecked(i as u32 % w, i as u32 / w, label);
        }
    }
    Ok(out.into())
}
