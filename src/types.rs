use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel marking a cell with no measurement
pub const NO_DATA: f64 = -1.0;

/// 2D raster of cell values (rows x cols, first row is the northern edge)
pub type Grid = Array2<f64>;

/// Geospatial transformation parameters (GDAL ordering)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Build a north-up transform from a lower-left origin and positive cell sizes
    pub fn from_lower_left(
        lower_left_x: f64,
        lower_left_y: f64,
        cell_width: f64,
        cell_height: f64,
        rows: usize,
    ) -> Self {
        Self {
            top_left_x: lower_left_x,
            pixel_width: cell_width,
            rotation_x: 0.0,
            top_left_y: lower_left_y + cell_height * rows as f64,
            rotation_y: 0.0,
            pixel_height: -cell_height,
        }
    }

    pub fn from_gdal(coefficients: [f64; 6]) -> Self {
        Self {
            top_left_x: coefficients[0],
            pixel_width: coefficients[1],
            rotation_x: coefficients[2],
            top_left_y: coefficients[3],
            rotation_y: coefficients[4],
            pixel_height: coefficients[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.top_left_x,
            self.pixel_width,
            self.rotation_x,
            self.top_left_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }

    /// Lower-left corner of a grid with `rows` rows (x, y)
    pub fn lower_left(&self, rows: usize) -> (f64, f64) {
        (self.top_left_x, self.top_left_y + self.pixel_height * rows as f64)
    }

    /// Absolute cell size (width, height)
    pub fn cell_size(&self) -> (f64, f64) {
        (self.pixel_width.abs(), self.pixel_height.abs())
    }

    pub fn is_north_up(&self) -> bool {
        self.rotation_x == 0.0 && self.rotation_y == 0.0
    }
}

/// Spatial framing of a raster. Treated as opaque by the scoring core and
/// handed back to the writer unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterFrame {
    pub geo_transform: GeoTransform,
    /// Coordinate reference system descriptor (WKT or ESRI string), empty when unknown
    pub spatial_reference: String,
}

impl RasterFrame {
    /// Same framing with a different spatial reference descriptor
    pub fn with_spatial_reference(&self, spatial_reference: impl Into<String>) -> Self {
        Self {
            geo_transform: self.geo_transform,
            spatial_reference: spatial_reference.into(),
        }
    }
}

/// Grid plus the framing it was read with
#[derive(Debug, Clone)]
pub struct SourceRaster {
    pub grid: Grid,
    pub frame: RasterFrame,
    /// No-data value declared by the source before conversion to the sentinel
    pub source_no_data: Option<f64>,
}

/// Why a single cell could not be scored
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FaultKind {
    /// No depth interval contains the value
    LookupMiss,
    /// The first containing interval has zero width
    DegenerateInterval { depth: f64 },
}

/// A cell that could not be scored
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellFault {
    pub row: usize,
    pub col: usize,
    pub value: f64,
    pub kind: FaultKind,
}

impl fmt::Display for CellFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FaultKind::LookupMiss => write!(
                f,
                "cell ({}, {}) value {} matches no depth interval",
                self.row, self.col, self.value
            ),
            FaultKind::DegenerateInterval { depth } => write!(
                f,
                "cell ({}, {}) value {} matched degenerate depth interval [{}, {}]",
                self.row, self.col, self.value, depth, depth
            ),
        }
    }
}

/// Every fault found during a complete remap pass, in row-major order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaultReport {
    pub faults: Vec<CellFault>,
}

impl FaultReport {
    pub fn is_empty(&self) -> bool {
        self.faults.is_empty()
    }

    pub fn len(&self) -> usize {
        self.faults.len()
    }

    pub fn lookup_misses(&self) -> usize {
        self.faults
            .iter()
            .filter(|f| f.kind == FaultKind::LookupMiss)
            .count()
    }

    pub fn degenerate_intervals(&self) -> usize {
        self.len() - self.lookup_misses()
    }
}

impl fmt::Display for FaultReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cells could not be scored ({} lookup misses, {} degenerate intervals)",
            self.len(),
            self.lookup_misses(),
            self.degenerate_intervals()
        )?;
        if let Some(first) = self.faults.first() {
            write!(f, "; first: {}", first)?;
        }
        Ok(())
    }
}

/// Error types for habitat scoring
#[derive(Debug, thiserror::Error)]
pub enum HabError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("GDAL error: {0}")]
    Gdal(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Cell ({row}, {col}) value {value} matches no depth interval")]
    LookupMiss { row: usize, col: usize, value: f64 },

    #[error("Cell ({row}, {col}) value {value} matched degenerate depth interval [{depth}, {depth}]")]
    DegenerateInterval {
        row: usize,
        col: usize,
        value: f64,
        depth: f64,
    },

    #[error("{0}")]
    Faults(FaultReport),
}

impl From<CellFault> for HabError {
    fn from(fault: CellFault) -> Self {
        match fault.kind {
            FaultKind::LookupMiss => HabError::LookupMiss {
                row: fault.row,
                col: fault.col,
                value: fault.value,
            },
            FaultKind::DegenerateInterval { depth } => HabError::DegenerateInterval {
                row: fault.row,
                col: fault.col,
                value: fault.value,
                depth,
            },
        }
    }
}

impl HabError {
    /// True for failures caused by cell values rather than I/O or configuration
    pub fn is_cell_fault(&self) -> bool {
        matches!(
            self,
            HabError::LookupMiss { .. } | HabError::DegenerateInterval { .. } | HabError::Faults(_)
        )
    }
}

/// Result type for habitat scoring operations
pub type HabResult<T> = Result<T, HabError>;
