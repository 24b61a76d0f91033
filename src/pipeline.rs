use crate::config::RunConfig;
use crate::core::remap::RemapProcessor;
use crate::io::{LookupReader, RasterReader, RasterWriter};
use crate::types::HabResult;
use chrono::Local;
use std::time::{Duration, Instant};

/// Outcome of a completed scoring run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub rows: usize,
    pub cols: usize,
    pub no_data_cells: usize,
    pub scored_cells: usize,
    pub range_count: usize,
    pub elapsed: Duration,
}

/// Score the base raster against the lookup table and write the result.
///
/// The output has the base raster's shape and framing. Its spatial reference
/// is `config.spatial_reference`, or the base raster's own descriptor.
pub fn calculate_new_raster(config: &RunConfig) -> HabResult<RunSummary> {
    config.validate()?;
    let started = Instant::now();
    let start_time = Local::now();

    log::info!("Starting: {}", start_time);
    log::info!("Run by: {}", run_user());
    log::info!("Run on: {}", start_time.format("%d/%m/%Y, %H:%M:%S"));
    log::info!("Base Raster Path: {}", config.base_raster_path.display());
    log::info!("Output Raster Path: {}", config.output_raster_path.display());
    log::info!("Depth Lookup Table Path: {}", config.lookup_table_path.display());
    log::info!("Fish Stage: {}", config.fish_stage);
    log::info!(
        "Spatial Reference: {}",
        config.spatial_reference.as_deref().unwrap_or("<from base raster>")
    );

    let no_data = config.remap.no_data;
    let source = RasterReader::read(&config.base_raster_path, no_data)?;

    let table = LookupReader::read_range_table(
        &config.lookup_table_path,
        config.lookup_layer.as_deref(),
        &config.fish_stage,
    )?;

    let processor = RemapProcessor::with_params(config.remap.clone());
    let scores = processor.remap(&source.grid, &table)?;

    let frame = match &config.spatial_reference {
        Some(sr) => source.frame.with_spatial_reference(sr.as_str()),
        None => source.frame.clone(),
    };
    RasterWriter::new(config.overwrite_output).write(
        &config.output_raster_path,
        &scores,
        &frame,
        no_data,
    )?;

    let (rows, cols) = scores.dim();
    let no_data_cells = scores.iter().filter(|&&v| v == no_data).count();
    let summary = RunSummary {
        rows,
        cols,
        no_data_cells,
        scored_cells: rows * cols - no_data_cells,
        range_count: table.len(),
        elapsed: started.elapsed(),
    };

    log::info!(
        "Scored {} cells ({} no-data) in {:.3}s",
        summary.scored_cells,
        summary.no_data_cells,
        summary.elapsed.as_secs_f64()
    );
    log::info!("Finished: {}", Local::now());
    Ok(summary)
}

fn run_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
