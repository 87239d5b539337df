//! bubblemark-filter - Smoothing and binarization
//!
//! - **Block convolution**: box blur over an integral image
//! - **Thresholding**: fixed, Otsu and adaptive mean binarization
//!
//! Binary outputs mark dark pixels as foreground (value 1), which is what
//! connected component analysis expects for printed markers and pen marks.

pub mod block_conv;
mod error;
pub mod threshold;

pub use block_conv::{IntegralImage, box_blur};
pub use error::{FilterError, FilterResult};
pub use threshold::{
    BinarizeMethod, adaptive_threshold, binarize, compute_otsu_threshold, gray_histogram,
    threshold_otsu, threshold_to_binary,
};
