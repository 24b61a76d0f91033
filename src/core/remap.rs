use crate::core::range_table::{RangeEntry, RangeTable};
use crate::types::{CellFault, FaultKind, FaultReport, Grid, HabError, HabResult, NO_DATA};
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// How cell faults are turned into an operation result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultPolicy {
    /// Stop at the first fault in row-major order
    FailFast,
    /// Finish the pass, then fail with every fault in row-major order
    CollectAll,
}

/// Cell remapping parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemapParams {
    /// Sentinel copied through unchanged
    pub no_data: f64,
    pub policy: FaultPolicy,
    /// Spread rows over the rayon pool (needs the `parallel` feature)
    pub parallel: bool,
    /// Report every scored cell to the observer
    pub trace_cells: bool,
}

impl Default for RemapParams {
    fn default() -> Self {
        Self {
            no_data: NO_DATA,
            policy: FaultPolicy::FailFast,
            parallel: cfg!(feature = "parallel"),
            trace_cells: false,
        }
    }
}

/// Result of scoring one cell value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellOutcome {
    NoData,
    Scored(f64),
    LookupMiss,
    DegenerateInterval { depth: f64 },
}

impl CellOutcome {
    /// Output value, or the fault kind that prevents one
    pub fn value(self, no_data: f64) -> Result<f64, FaultKind> {
        match self {
            CellOutcome::NoData => Ok(no_data),
            CellOutcome::Scored(score) => Ok(score),
            CellOutcome::LookupMiss => Err(FaultKind::LookupMiss),
            CellOutcome::DegenerateInterval { depth } => Err(FaultKind::DegenerateInterval { depth }),
        }
    }
}

/// Score a single value against the table.
///
/// `value == no_data` is an exact comparison. Otherwise the first interval
/// containing `value` is interpolated linearly.
pub fn score_cell(value: f64, table: &RangeTable, no_data: f64) -> CellOutcome {
    score_cell_with_entry(value, table, no_data).0
}

/// [`score_cell`] plus the entry that matched, if any
pub fn score_cell_with_entry(
    value: f64,
    table: &RangeTable,
    no_data: f64,
) -> (CellOutcome, Option<&RangeEntry>) {
    if value == no_data {
        return (CellOutcome::NoData, None);
    }
    match table.lookup(value) {
        None => (CellOutcome::LookupMiss, None),
        Some(entry) => (score_entry(value, entry), Some(entry)),
    }
}

fn score_entry(value: f64, entry: &RangeEntry) -> CellOutcome {
    if entry.interval.is_degenerate() {
        return CellOutcome::DegenerateInterval {
            depth: entry.interval.min_depth,
        };
    }
    let t = entry.interval.position(value);
    CellOutcome::Scored(entry.scores.interpolate(t))
}

/// Receives per-cell diagnostics during a remap
pub trait CellObserver: Sync {
    fn cell_scored(&self, row: usize, col: usize, value: f64, entry: &RangeEntry, score: f64);
}

/// Discards all diagnostics
pub struct SilentObserver;

impl CellObserver for SilentObserver {
    fn cell_scored(&self, _row: usize, _col: usize, _value: f64, _entry: &RangeEntry, _score: f64) {}
}

/// Writes each scored cell to the `log` facade at debug level
pub struct LogObserver;

impl CellObserver for LogObserver {
    fn cell_scored(&self, row: usize, col: usize, value: f64, entry: &RangeEntry, score: f64) {
        log::debug!(
            "Cell ({}, {}) X: {} Min D: {}-Max D: {} Min S: {}-Max S: {} New Score: {}",
            row,
            col,
            value,
            entry.interval.min_depth,
            entry.interval.max_depth,
            entry.scores.min_score,
            entry.scores.max_score,
            score
        );
    }
}

/// Applies a range table to every cell of a grid
pub struct RemapProcessor {
    params: RemapParams,
}

impl RemapProcessor {
    /// Create a processor with default parameters
    pub fn new() -> Self {
        Self {
            params: RemapParams::default(),
        }
    }

    pub fn with_params(params: RemapParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &RemapParams {
        &self.params
    }

    /// Remap `grid` into a new grid of scores with the same shape
    pub fn remap(&self, grid: &Grid, table: &RangeTable) -> HabResult<Grid> {
        if self.params.trace_cells {
            self.remap_with_observer(grid, table, &LogObserver)
        } else {
            self.remap_with_observer(grid, table, &SilentObserver)
        }
    }

    pub fn remap_with_observer<O: CellObserver>(
        &self,
        grid: &Grid,
        table: &RangeTable,
        observer: &O,
    ) -> HabResult<Grid> {
        let (rows, cols) = grid.dim();
        log::info!(
            "Calculating new scores for {}x{} grid with {} depth ranges",
            rows,
            cols,
            table.len()
        );

        let row_results = if self.params.parallel {
            self.remap_rows_parallel(grid, table, observer)
        } else {
            self.remap_rows_sequential(grid, table, observer)
        };

        let mut data = Vec::with_capacity(rows * cols);
        let mut report = FaultReport::default();
        for result in row_results {
            match result {
                Ok(values) => data.extend(values),
                Err(faults) => {
                    if self.params.policy == FaultPolicy::FailFast {
                        // rows are in order and each row stops at its first fault
                        return Err(faults[0].into());
                    }
                    report.faults.extend(faults);
                }
            }
        }

        if !report.is_empty() {
            log::error!("Remap failed: {}", report);
            return Err(HabError::Faults(report));
        }

        let output = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| HabError::Processing(format!("Failed to shape output grid: {}", e)))?;

        log::debug!("New Array Row Count: {}", output.nrows());
        log::debug!("New Array Column Count: {}", output.ncols());
        Ok(output)
    }

    fn remap_rows_sequential<O: CellObserver>(
        &self,
        grid: &Grid,
        table: &RangeTable,
        observer: &O,
    ) -> Vec<Result<Vec<f64>, Vec<CellFault>>> {
        let mut results = Vec::with_capacity(grid.nrows());
        for (row, values) in grid.outer_iter().enumerate() {
            let result = self.remap_row(row, values, table, observer);
            let failed = result.is_err();
            results.push(result);
            if failed && self.params.policy == FaultPolicy::FailFast {
                break;
            }
        }
        results
    }

    #[cfg(feature = "parallel")]
    fn remap_rows_parallel<O: CellObserver>(
        &self,
        grid: &Grid,
        table: &RangeTable,
        observer: &O,
    ) -> Vec<Result<Vec<f64>, Vec<CellFault>>> {
        use rayon::prelude::*;

        log::debug!(
            "Remapping {} rows on {} threads",
            grid.nrows(),
            rayon::current_num_threads()
        );

        (0..grid.nrows())
            .into_par_iter()
            .map(|row| self.remap_row(row, grid.row(row), table, observer))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn remap_rows_parallel<O: CellObserver>(
        &self,
        grid: &Grid,
        table: &RangeTable,
        observer: &O,
    ) -> Vec<Result<Vec<f64>, Vec<CellFault>>> {
        log::warn!("Built without the parallel feature, remapping sequentially");
        self.remap_rows_sequential(grid, table, observer)
    }

    /// Score one row. Under `FailFast` the row stops at its first fault.
    fn remap_row<O: CellObserver>(
        &self,
        row: usize,
        values: ArrayView1<f64>,
        table: &RangeTable,
        observer: &O,
    ) -> Result<Vec<f64>, Vec<CellFault>> {
        let no_data = self.params.no_data;
        let mut out = Vec::with_capacity(values.len());
        let mut faults = Vec::new();

        for (col, &value) in values.iter().enumerate() {
            let (outcome, entry) = score_cell_with_entry(value, table, no_data);
            if let (CellOutcome::Scored(score), Some(entry)) = (outcome, entry) {
                if self.params.trace_cells {
                    observer.cell_scored(row, col, value, entry, score);
                }
            }

            match outcome.value(no_data) {
                Ok(score) => out.push(score),
                Err(kind) => {
                    faults.push(CellFault { row, col, value, kind });
                    if self.params.policy == FaultPolicy::FailFast {
                        break;
                    }
                }
            }
        }

        if faults.is_empty() {
            Ok(out)
        } else {
            Err(faults)
        }
    }
}

impl Default for RemapProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Remap with default parameters
pub fn remap(grid: &Grid, table: &RangeTable) -> HabResult<Grid> {
    RemapProcessor::new().remap(grid, table)
}
