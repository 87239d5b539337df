//! Page identifier barcodes
//!
//! - [`itf`]: Interleaved 2 of 5 bar strings (encode and decode)
//! - [`signal`]: run-length extraction and narrow/wide quantization
//! - [`scan`]: locating and reading the symbol on a page image

pub mod itf;
pub mod scan;
pub mod signal;

pub use itf::{decode_bar_string, encode_bar_string, symbol_len};
pub use scan::{BarcodeScanOptions, read_page_barcode};
