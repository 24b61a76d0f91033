//! Native ESRI ASCII grid reading/writing (without GDAL dependency)
//!
//! The spatial reference lives in a `.prj` sidecar next to the grid, as
//! written by ArcGIS and GDAL's AAIGrid driver. A header without
//! `NODATA_value` uses the format's default of -9999.

use crate::types::{GeoTransform, Grid, HabError, HabResult, RasterFrame, SourceRaster};
use ndarray::Array2;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// No-data value assumed when the header declares none
pub const DEFAULT_NODATA_VALUE: f64 = -9999.0;

#[derive(Debug, Default)]
struct Header {
    ncols: Option<usize>,
    nrows: Option<usize>,
    xll: Option<(f64, bool)>,
    yll: Option<(f64, bool)>,
    cellsize: Option<f64>,
    dx: Option<f64>,
    dy: Option<f64>,
    nodata: Option<f64>,
}

/// Read an ASCII grid, converting its declared no-data value to `no_data`
pub fn read_ascii_grid<P: AsRef<Path>>(path: P, no_data: f64) -> HabResult<SourceRaster> {
    let path = path.as_ref();
    log::debug!("Reading ASCII grid: {}", path.display());

    let text = fs::read_to_string(path)?;
    let mut raster = parse_ascii_grid(&text, no_data)?;

    let prj = prj_path(path);
    if prj.exists() {
        raster.frame.spatial_reference = fs::read_to_string(&prj)?;
        log::debug!("Spatial reference from {}", prj.display());
    } else {
        log::warn!("No .prj sidecar for {}, spatial reference unknown", path.display());
    }

    Ok(raster)
}

/// Parse ASCII grid text (no sidecar handling)
pub fn parse_ascii_grid(text: &str, no_data: f64) -> HabResult<SourceRaster> {
    let mut header = Header::default();
    let mut tokens = text.split_whitespace().peekable();

    while let Some(&token) = tokens.peek() {
        if token.parse::<f64>().is_ok() {
            break;
        }
        let key = token.to_ascii_lowercase();
        tokens.next();
        let value = tokens
            .next()
            .ok_or_else(|| HabError::InvalidFormat(format!("Missing value for header {}", token)))?;

        match key.as_str() {
            "ncols" => header.ncols = Some(parse_count(&key, value)?),
            "nrows" => header.nrows = Some(parse_count(&key, value)?),
            "xllcorner" => header.xll = Some((parse_number(&key, value)?, false)),
            "xllcenter" => header.xll = Some((parse_number(&key, value)?, true)),
            "yllcorner" => header.yll = Some((parse_number(&key, value)?, false)),
            "yllcenter" => header.yll = Some((parse_number(&key, value)?, true)),
            "cellsize" => header.cellsize = Some(parse_number(&key, value)?),
            "dx" => header.dx = Some(parse_number(&key, value)?),
            "dy" => header.dy = Some(parse_number(&key, value)?),
            "nodata_value" => header.nodata = Some(parse_number(&key, value)?),
            _ => {
                return Err(HabError::InvalidFormat(format!(
                    "Unknown ASCII grid header: {}",
                    token
                )))
            }
        }
    }

    let missing = |name: &str| HabError::InvalidFormat(format!("ASCII grid header lacks {}", name));
    let ncols = header.ncols.ok_or_else(|| missing("ncols"))?;
    let nrows = header.nrows.ok_or_else(|| missing("nrows"))?;
    let (xll, x_center) = header.xll.ok_or_else(|| missing("xllcorner"))?;
    let (yll, y_center) = header.yll.ok_or_else(|| missing("yllcorner"))?;
    let (cell_width, cell_height) = match (header.cellsize, header.dx, header.dy) {
        (Some(size), _, _) => (size, size),
        (None, Some(dx), Some(dy)) => (dx, dy),
        _ => return Err(missing("cellsize")),
    };

    let expected = nrows.checked_mul(ncols).ok_or_else(|| {
        HabError::InvalidFormat(format!("Grid size {} rows x {} cols overflows", nrows, ncols))
    })?;
    let source_no_data = header.nodata.unwrap_or(DEFAULT_NODATA_VALUE);

    let lower_left_x = if x_center { xll - cell_width / 2.0 } else { xll };
    let lower_left_y = if y_center { yll - cell_height / 2.0 } else { yll };

    // sized by the data actually present, never by the header
    let mut data = Vec::new();
    for token in tokens {
        let value: f64 = token
            .parse()
            .map_err(|_| HabError::InvalidFormat(format!("Invalid cell value: {}", token)))?;
        data.push(if value == source_no_data { no_data } else { value });
    }

    if data.len() != expected {
        return Err(HabError::InvalidFormat(format!(
            "Expected {} cells ({} rows x {} cols), found {}",
            expected,
            nrows,
            ncols,
            data.len()
        )));
    }

    let grid = Array2::from_shape_vec((nrows, ncols), data)
        .map_err(|e| HabError::Processing(format!("Failed to reshape grid: {}", e)))?;

    Ok(SourceRaster {
        grid,
        frame: RasterFrame {
            geo_transform: GeoTransform::from_lower_left(
                lower_left_x,
                lower_left_y,
                cell_width,
                cell_height,
                nrows,
            ),
            spatial_reference: String::new(),
        },
        source_no_data: Some(source_no_data),
    })
}

/// Write an ASCII grid and, when the frame has one, its `.prj` sidecar
pub fn write_ascii_grid<P: AsRef<Path>>(
    path: P,
    grid: &Grid,
    frame: &RasterFrame,
    no_data: f64,
) -> HabResult<()> {
    let path = path.as_ref();
    log::debug!("Writing ASCII grid: {}", path.display());

    fs::write(path, format_ascii_grid(grid, &frame.geo_transform, no_data)?)?;

    let prj = prj_path(path);
    if frame.spatial_reference.is_empty() {
        if prj.exists() {
            fs::remove_file(&prj)?;
        }
    } else {
        fs::write(&prj, &frame.spatial_reference)?;
    }
    Ok(())
}

/// Render a grid as ASCII grid text
pub fn format_ascii_grid(grid: &Grid, transform: &GeoTransform, no_data: f64) -> HabResult<String> {
    if !transform.is_north_up() {
        return Err(HabError::UnsupportedFormat(
            "ASCII grids cannot carry a rotated geotransform".to_string(),
        ));
    }
    if transform.pixel_width <= 0.0 || transform.pixel_height >= 0.0 {
        return Err(HabError::UnsupportedFormat(format!(
            "ASCII grids must be north-up with rows running south, got cell size {} x {}",
            transform.pixel_width, transform.pixel_height
        )));
    }

    let (rows, cols) = grid.dim();
    let (lower_left_x, lower_left_y) = transform.lower_left(rows);
    let (cell_width, cell_height) = transform.cell_size();

    let mut out = String::with_capacity(rows * cols * 8 + 128);
    // infallible on String
    let _ = writeln!(out, "ncols {}", cols);
    let _ = writeln!(out, "nrows {}", rows);
    let _ = writeln!(out, "xllcorner {}", lower_left_x);
    let _ = writeln!(out, "yllcorner {}", lower_left_y);
    if cell_width == cell_height {
        let _ = writeln!(out, "cellsize {}", cell_width);
    } else {
        let _ = writeln!(out, "dx {}", cell_width);
        let _ = writeln!(out, "dy {}", cell_height);
    }
    let _ = writeln!(out, "NODATA_value {}", no_data);

    for row in grid.outer_iter() {
        let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        out.push_str(&line.join(" "));
        out.push('\n');
    }
    Ok(out)
}

fn prj_path(path: &Path) -> PathBuf {
    path.with_extension("prj")
}

fn parse_count(key: &str, value: &str) -> HabResult<usize> {
    value
        .parse()
        .map_err(|_| HabError::InvalidFormat(format!("Invalid {}: {}", key, value)))
}

fn parse_number(key: &str, value: &str) -> HabResult<f64> {
    value
        .parse()
        .map_err(|_| HabError::InvalidFormat(format!("Invalid {}: {}", key, value)))
}
