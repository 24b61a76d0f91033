//! Python module definition

use crate::config::RunConfig;
use crate::core::range_table::{build_range_table, RangeRow};
use crate::core::remap::{FaultPolicy, RemapParams, RemapProcessor};
use crate::pipeline::calculate_new_raster as run_pipeline;
use crate::types::HabError;
use numpy::{PyArray2, PyReadonlyArray2, ToPyArray};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

fn to_py_err(err: HabError) -> PyErr {
    if err.is_cell_fault() {
        PyErr::new::<PyValueError, _>(format!("{}", err))
    } else {
        PyErr::new::<PyRuntimeError, _>(format!("{}", err))
    }
}

/// Score a depth array against `(min_depth, max_depth, min_score, max_score, fish_stage)` rows
#[pyfunction]
#[pyo3(signature = (depth, rows, fish_stage, no_data = -1.0, collect_faults = false))]
fn remap_array<'py>(
    py: Python<'py>,
    depth: PyReadonlyArray2<'py, f64>,
    rows: Vec<(f64, f64, f64, f64, String)>,
    fish_stage: &str,
    no_data: f64,
    collect_faults: bool,
) -> PyResult<&'py PyArray2<f64>> {
    let grid = depth.as_array().to_owned();
    let table = build_range_table(
        rows.into_iter()
            .map(|(min_d, max_d, min_s, max_s, stage)| RangeRow::new(min_d, max_d, min_s, max_s, stage)),
        fish_stage,
    );

    let params = RemapParams {
        no_data,
        policy: if collect_faults {
            FaultPolicy::CollectAll
        } else {
            FaultPolicy::FailFast
        },
        ..RemapParams::default()
    };

    let scores = py
        .allow_threads(|| RemapProcessor::with_params(params).remap(&grid, &table))
        .map_err(to_py_err)?;
    Ok(scores.to_pyarray(py))
}

/// Run the full raster scoring workflow
#[pyfunction]
#[pyo3(signature = (base_raster_path, output_raster_path, depth_lookup_table_path, fish_stage, spatial_reference = None))]
fn calculate_new_raster(
    py: Python,
    base_raster_path: String,
    output_raster_path: String,
    depth_lookup_table_path: String,
    fish_stage: String,
    spatial_reference: Option<String>,
) -> PyResult<PyObject> {
    let mut config = RunConfig::new(
        base_raster_path,
        output_raster_path,
        depth_lookup_table_path,
        fish_stage,
    );
    config.spatial_reference = spatial_reference;

    let summary = py
        .allow_threads(|| run_pipeline(&config))
        .map_err(to_py_err)?;

    let result = PyDict::new(py);
    result.set_item("rows", summary.rows)?;
    result.set_item("cols", summary.cols)?;
    result.set_item("no_data_cells", summary.no_data_cells)?;
    result.set_item("scored_cells", summary.scored_cells)?;
    result.set_item("range_count", summary.range_count)?;
    result.set_item("elapsed_seconds", summary.elapsed.as_secs_f64())?;
    Ok(result.into())
}

#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(remap_array, m)?)?;
    m.add_function(wrap_pyfunction!(calculate_new_raster, m)?)?;
    Ok(())
}
