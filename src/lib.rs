//! habsuit: Habitat Suitability Scoring for Depth Rasters
//!
//! Converts a depth raster into suitability scores by piecewise-linear
//! interpolation against a depth lookup table filtered to one fish stage.
//! Cells holding the no-data sentinel pass through unchanged.

pub mod config;
pub mod core;
pub mod io;
pub mod pipeline;
pub mod types;

#[cfg(feature = "python")]
mod python;

// Re-export main types and functions for easier access
pub use config::RunConfig;
pub use crate::core::{
    build_range_table, remap, FaultPolicy, RangeRow, RangeTable, RemapParams, RemapProcessor,
};
pub use pipeline::{calculate_new_raster, RunSummary};
pub use types::{
    CellFault, FaultKind, FaultReport, GeoTransform, Grid, HabError, HabResult, RasterFrame,
    SourceRaster, NO_DATA,
};
