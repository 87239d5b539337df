//! Component selection by size and shape

use crate::conncomp::ConnectedComponent;

/// Predicate over component statistics, built up with chained setters.
///
/// Unset bounds do not constrain. Sides are bounding box sides in pixels;
/// aspect is longer side over shorter side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentFilter {
    min_side: Option<f64>,
    max_side: Option<f64>,
    max_aspect: Option<f64>,
    min_fill: Option<f64>,
    max_fill: Option<f64>,
    min_pixels: Option<u32>,
    reject_border: Option<(u32, u32)>,
}

impl ComponentFilter {
    /// Create a filter that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounding box sides must lie in `[min, max]`
    pub fn side_range(mut self, min: f64, max: f64) -> Self {
        self.min_side = Some(min);
        self.max_side = Some(max);
        self
    }

    /// Longer side over shorter side must not exceed `max`
    pub fn max_aspect(mut self, max: f64) -> Self {
        self.max_aspect = Some(max);
        self
    }

    /// Fill ratio must be at least `min`
    pub fn min_fill(mut self, min: f64) -> Self {
        self.min_fill = Some(min);
        self
    }

    /// Fill ratio must be strictly below `max`
    pub fn max_fill(mut self, max: f64) -> Self {
        self.max_fill = Some(max);
        self
    }

    /// Pixel count must be at least `min`
    pub fn min_pixels(mut self, min: u32) -> Self {
        self.min_pixels = Some(min);
        self
    }

    /// Reject components touching the border of a `width x height` image
    pub fn reject_border(mut self, width: u32, height: u32) -> Self {
        self.reject_border = Some((width, height));
        self
    }

    /// Check a single component
    pub fn accepts(&self, c: &ConnectedComponent) -> bool {
        let (w, h) = (c.bounds.w as f64, c.bounds.h as f64);
        if self.min_side.is_some_and(|min| w < min || h < min) {
            return false;
        }
        if self.max_side.is_some_and(|max| w > max || h > max) {
            return false;
        }
        if self.max_aspect.is_some_and(|max| c.bounds.aspect() > max) {
            return false;
        }
        let fill = c.fill_ratio();
        if self.min_fill.is_some_and(|min| fill < min) {
            return false;
        }
        if self.max_fill.is_some_and(|max| fill >= max) {
            return false;
        }
        if self.min_pixels.is_some_and(|min| c.pixel_count < min) {
            return false;
        }
        if self
            .reject_border
            .is_some_and(|(iw, ih)| c.bounds.touches_border(iw, ih))
        {
            return false;
        }
        true
    }

    /// Keep the accepted components, preserving order
    pub fn apply<'a, I>(&self, components: I) -> Vec<ConnectedComponent>
    where
        I: IntoIterator<Item = &'a ConnectedComponent>,
    {
        components
            .into_iter()
            .filter(|c| self.accepts(c))
            .cloned()
            .collect()
    }
}
