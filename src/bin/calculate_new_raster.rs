//! calculate-new-raster: score a depth raster against a fish-stage lookup table

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::{Builder, Target};
use habsuit::{calculate_new_raster, FaultPolicy, RemapParams, RunConfig};
use log::LevelFilter;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "calculate-new-raster")]
#[command(author, version, about = "Habitat suitability scoring of depth rasters", long_about = None)]
struct Cli {
    /// Depth raster (.asc, or any GDAL raster with the gdal feature)
    #[arg(long)]
    base_raster: PathBuf,

    /// Output score raster
    #[arg(long)]
    output_raster: PathBuf,

    /// Depth lookup table (CSV, or any OGR table with the gdal feature)
    #[arg(long)]
    lookup_table: PathBuf,

    /// Table name inside a multi-layer lookup source
    #[arg(long)]
    lookup_layer: Option<String>,

    /// Fish stage to score, matched exactly
    #[arg(long)]
    fish_stage: String,

    /// Spatial reference to define on the output (defaults to the base raster's)
    #[arg(long)]
    spatial_reference: Option<String>,

    /// Fail instead of replacing an existing output
    #[arg(long)]
    no_overwrite: bool,

    /// Score every cell and report all faults before failing
    #[arg(long)]
    collect_faults: bool,

    /// Remap on a single thread
    #[arg(long)]
    sequential: bool,

    /// Worker threads for the remap (default: one per core)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Debug logging with per-cell traces; truncates the log file
    #[arg(short, long)]
    debug: bool,

    /// Log to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log to the default log directory
    #[arg(long, conflicts_with = "log_file")]
    log_to_file: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    if let Some(jobs) = cli.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .context("configuring worker threads")?;
    }

    let config = RunConfig {
        base_raster_path: cli.base_raster,
        output_raster_path: cli.output_raster,
        lookup_table_path: cli.lookup_table,
        lookup_layer: cli.lookup_layer,
        fish_stage: cli.fish_stage,
        spatial_reference: cli.spatial_reference,
        overwrite_output: !cli.no_overwrite,
        remap: RemapParams {
            policy: if cli.collect_faults {
                FaultPolicy::CollectAll
            } else {
                FaultPolicy::FailFast
            },
            parallel: !cli.sequential && RemapParams::default().parallel,
            trace_cells: cli.debug,
            ..RemapParams::default()
        },
    };

    let summary = calculate_new_raster(&config).with_context(|| {
        format!(
            "scoring {} for fish stage {}",
            config.base_raster_path.display(),
            config.fish_stage
        )
    })?;

    println!(
        "{}: {}x{} cells, {} scored, {} no-data ({:.2}s)",
        config.output_raster_path.display(),
        summary.rows,
        summary.cols,
        summary.scored_cells,
        summary.no_data_cells,
        summary.elapsed.as_secs_f64()
    );
    Ok(())
}

fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut builder = Builder::new();
    builder
        .filter_level(level)
        .format(|buf, record| {
            writeln!(buf, "{} - {} - {}", record.target(), record.level(), record.args())
        })
        .parse_default_env();

    let log_path = match (&cli.log_file, cli.log_to_file) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(default_log_path(cli.debug)?),
        (None, false) => None,
    };

    if let Some(path) = log_path {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating log directory {}", parent.display()))?;
        }
        let mut options = OpenOptions::new();
        options.create(true);
        if cli.debug {
            options.write(true).truncate(true);
        } else {
            options.append(true);
        }
        let file = options
            .open(&path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        builder.target(Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}

fn default_log_path(debug: bool) -> Result<PathBuf> {
    let base = dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .context("no local data directory for logs")?;
    let name = if debug {
        "calculate_new_raster_debug.log"
    } else {
        "calculate_new_raster.log"
    };
    Ok(base.join("habsuit").join("logs").join(name))
}
