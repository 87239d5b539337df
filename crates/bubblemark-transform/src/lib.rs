//! bubblemark-transform - Geometric transformations
//!
//! - Projective transformations (4-point homography, perspective warp)
//! - Scaling (linear interpolation, sampling)

mod error;
pub mod projective;
pub mod scale;

pub use error::{TransformError, TransformResult};
pub use projective::{Homography, ProjectiveFill, check_quad, warp_perspective};
pub use scale::{ScaleMethod, scale};
