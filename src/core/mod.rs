//! Core habitat scoring modules

pub mod range_table;
pub mod remap;

// Re-export main types
pub use range_table::{
    build_range_table, try_build_range_table, DepthInterval, RangeEntry, RangeRow, RangeTable,
    ScoreRange,
};
pub use remap::{
    remap, score_cell, score_cell_with_entry, CellObserver, CellOutcome, FaultPolicy, LogObserver,
    RemapParams, RemapProcessor, SilentObserver,
};
