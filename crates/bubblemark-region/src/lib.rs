//! bubblemark-region - Connected component analysis
//!
//! Finds foreground blobs in binary images and measures the statistics the
//! recognizer filters on: area, bounding box, centroid and fill ratio.
//!
//! # Examples
//!
//! ```
//! use bubblemark_region::{find_connected_components, ConnectivityType};
//! use bubblemark_core::{Pix, PixelDepth};
//!
//! let mut pm = Pix::new(100, 100, PixelDepth::Bit1).unwrap().to_mut();
//! pm.set_pixel(10, 10, 1).unwrap();
//! pm.set_pixel(11, 11, 1).unwrap();
//! pm.set_pixel(50, 50, 1).unwrap();
//! let pix = pm.into();
//!
//! let four = find_connected_components(&pix, ConnectivityType::FourWay).unwrap();
//! assert_eq!(four.len(), 3);
//! let eight = find_connected_components(&pix, ConnectivityType::EightWay).unwrap();
//! assert_eq!(eight.len(), 2);
//! ```

pub mod conncomp;
mod error;
pub mod select;

pub use conncomp::{
    ConnectedComponent, ConnectivityType, find_connected_components, label_connected_components,
};
pub use error::{RegionError, RegionResult};
pub use select::ComponentFilter;
