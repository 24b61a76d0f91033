//! Lookup table and raster I/O

pub mod ascii_grid;
pub mod lookup;
pub mod raster;

pub use lookup::LookupReader;
pub use raster::{RasterFormat, RasterReader, RasterWriter};
