use crate::io::ascii_grid;
use crate::types::{Grid, HabError, HabResult, RasterFrame, SourceRaster};
use std::path::Path;

#[cfg(feature = "gdal")]
impl From<gdal::errors::GdalError> for HabError {
    fn from(err: gdal::errors::GdalError) -> Self {
        HabError::Gdal(err.to_string())
    }
}

/// Raster formats understood by [`RasterReader`] and [`RasterWriter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    /// ESRI ASCII grid, handled natively
    AsciiGrid,
    /// Anything GDAL can open; written as GeoTIFF
    Gdal,
}

impl RasterFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("asc") => RasterFormat::AsciiGrid,
            _ => RasterFormat::Gdal,
        }
    }
}

/// Reads single-band rasters into grids
pub struct RasterReader;

impl RasterReader {
    /// Read band 1 of a raster, replacing its no-data cells with `no_data`
    pub fn read<P: AsRef<Path>>(path: P, no_data: f64) -> HabResult<SourceRaster> {
        let path = path.as_ref();
        log::info!("Reading base raster: {}", path.display());

        let raster = match RasterFormat::from_path(path) {
            RasterFormat::AsciiGrid => ascii_grid::read_ascii_grid(path, no_data)?,
            RasterFormat::Gdal => Self::read_gdal(path, no_data)?,
        };

        log::debug!("Array Row Count: {}", raster.grid.nrows());
        log::debug!("Array Column Count: {}", raster.grid.ncols());
        log::debug!("Geotransform: {:?}", raster.frame.geo_transform);
        log::debug!("Source no-data value: {:?}", raster.source_no_data);
        Ok(raster)
    }

    #[cfg(feature = "gdal")]
    fn read_gdal(path: &Path, no_data: f64) -> HabResult<SourceRaster> {
        use crate::types::GeoTransform;
        use gdal::Dataset;
        use ndarray::Array2;

        let dataset = Dataset::open(path)?;
        if dataset.raster_count() != 1 {
            log::warn!(
                "{} has {} bands, only band 1 is scored",
                path.display(),
                dataset.raster_count()
            );
        }

        let geo_transform = GeoTransform::from_gdal(dataset.geo_transform()?);
        let spatial_reference = dataset.projection();
        let (width, height) = dataset.raster_size();

        let band = dataset.rasterband(1)?;
        let source_no_data = band.no_data_value();
        let buffer = band.read_as::<f64>((0, 0), (width, height), (width, height), None)?;

        let data: Vec<f64> = match source_no_data {
            Some(nd) => buffer
                .data
                .into_iter()
                .map(|v| if v == nd || (nd.is_nan() && v.is_nan()) { no_data } else { v })
                .collect(),
            None => buffer.data,
        };

        let grid = Array2::from_shape_vec((height, width), data)
            .map_err(|e| HabError::Processing(format!("Failed to reshape raster data: {}", e)))?;

        Ok(SourceRaster {
            grid,
            frame: RasterFrame {
                geo_transform,
                spatial_reference,
            },
            source_no_data,
        })
    }

    #[cfg(not(feature = "gdal"))]
    fn read_gdal(path: &Path, _no_data: f64) -> HabResult<SourceRaster> {
        Err(HabError::UnsupportedFormat(format!(
            "{}: only .asc grids are readable without the `gdal` feature",
            path.display()
        )))
    }
}

/// Persists grids with the framing of their source
pub struct RasterWriter {
    overwrite: bool,
}

impl RasterWriter {
    pub fn new(overwrite: bool) -> Self {
        Self { overwrite }
    }

    /// Write `grid` with `frame`, declaring `no_data` as the band's no-data value
    pub fn write<P: AsRef<Path>>(
        &self,
        path: P,
        grid: &Grid,
        frame: &RasterFrame,
        no_data: f64,
    ) -> HabResult<()> {
        let path = path.as_ref();
        log::info!("Exporting new grid to raster: {}", path.display());

        if path.exists() {
            if !self.overwrite {
                return Err(HabError::Config(format!(
                    "Output {} already exists and overwriting is disabled",
                    path.display()
                )));
            }
            log::debug!("Replacing existing output {}", path.display());
        }

        match RasterFormat::from_path(path) {
            RasterFormat::AsciiGrid => ascii_grid::write_ascii_grid(path, grid, frame, no_data)?,
            RasterFormat::Gdal => Self::write_gdal(path, grid, frame, no_data)?,
        }

        log::info!("Defining spatial reference...");
        if frame.spatial_reference.is_empty() {
            log::warn!("No spatial reference to define on {}", path.display());
        } else {
            log::debug!("Spatial Reference: {}", frame.spatial_reference);
        }
        Ok(())
    }

    #[cfg(feature = "gdal")]
    fn write_gdal(path: &Path, grid: &Grid, frame: &RasterFrame, no_data: f64) -> HabResult<()> {
        use gdal::raster::Buffer;
        use gdal::DriverManager;

        let driver = DriverManager::get_driver_by_name("GTiff")?;
        let (height, width) = grid.dim();

        let mut dataset = driver.create_with_band_type::<f64, _>(
            path,
            width as isize,
            height as isize,
            1,
        )?;

        dataset.set_geo_transform(&frame.geo_transform.to_gdal())?;
        if !frame.spatial_reference.is_empty() {
            dataset.set_projection(&frame.spatial_reference)?;
        }

        let mut rasterband = dataset.rasterband(1)?;
        let flat_data: Vec<f64> = grid.iter().cloned().collect();
        let buffer = Buffer::new((width, height), flat_data);
        rasterband.write((0, 0), (width, height), &buffer)?;
        rasterband.set_no_data_value(Some(no_data))?;

        Ok(())
    }

    #[cfg(not(feature = "gdal"))]
    fn write_gdal(path: &Path, _grid: &Grid, _frame: &RasterFrame, _no_data: f64) -> HabResult<()> {
        Err(HabError::UnsupportedFormat(format!(
            "{}: only .asc grids are writable without the `gdal` feature",
            path.display()
        )))
    }
}

impl Default for RasterWriter {
    fn default() -> Self {
        Self::new(true)
    }
}
