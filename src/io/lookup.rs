use crate::core::range_table::{try_build_range_table, RangeRow, RangeTable};
use crate::types::{HabError, HabResult};
use std::path::Path;

/// Column names of a depth lookup table
pub const MIN_DEPTH_FIELD: &str = "MinDepth";
pub const MAX_DEPTH_FIELD: &str = "MaxDepth";
pub const MIN_SCORE_FIELD: &str = "Min_Score";
pub const MAX_SCORE_FIELD: &str = "Max_Score";
pub const STAGE_FIELD: &str = "Fish_Stage";

/// Reader for depth/score lookup tables
pub struct LookupReader;

impl LookupReader {
    /// Read the range table for `fish_stage`.
    ///
    /// `.csv` files are parsed directly; anything else goes through OGR when
    /// built with the `gdal` feature. `layer` selects a table inside a
    /// multi-layer source such as a file geodatabase.
    pub fn read_range_table<P: AsRef<Path>>(
        table_path: P,
        layer: Option<&str>,
        fish_stage: &str,
    ) -> HabResult<RangeTable> {
        let path = table_path.as_ref();
        log::info!("Reading depth lookup table: {}", path.display());
        log::debug!("Fish stage filter: {}", fish_stage);

        if is_csv(path) {
            let rows = Self::csv_rows(path)?;
            return try_build_range_table(rows, fish_stage);
        }

        Self::read_ogr_table(path, layer, fish_stage)
    }

    /// Deserialize every row of a CSV lookup table
    pub fn csv_rows<P: AsRef<Path>>(
        path: P,
    ) -> HabResult<impl Iterator<Item = HabResult<RangeRow>>> {
        Ok(deserialize_rows(csv_builder().from_path(path.as_ref())?))
    }

    #[cfg(feature = "gdal")]
    fn read_ogr_table(path: &Path, layer: Option<&str>, fish_stage: &str) -> HabResult<RangeTable> {
        use gdal::vector::LayerAccess;
        use gdal::Dataset;

        let dataset = Dataset::open(path)?;
        let mut table_layer = match layer {
            Some(name) => dataset.layer_by_name(name)?,
            None => dataset.layer(0)?,
        };

        let filter = stage_filter(fish_stage);
        log::debug!("Attribute filter: {}", filter);
        table_layer.set_attribute_filter(&filter)?;

        let mut rows = Vec::new();
        for feature in table_layer.features() {
            let number = |field: &str| -> HabResult<f64> {
                feature.field_as_double_by_name(field)?.ok_or_else(|| {
                    HabError::InvalidFormat(format!(
                        "Lookup row {:?} has no value in field {}",
                        feature.fid(),
                        field
                    ))
                })
            };
            rows.push(Ok(RangeRow {
                min_depth: number(MIN_DEPTH_FIELD)?,
                max_depth: number(MAX_DEPTH_FIELD)?,
                min_score: number(MIN_SCORE_FIELD)?,
                max_score: number(MAX_SCORE_FIELD)?,
                category: feature
                    .field_as_string_by_name(STAGE_FIELD)?
                    .unwrap_or_default(),
            }));
        }
        log::debug!("OGR returned {} rows", rows.len());

        // drivers may compare case-insensitively, so the exact predicate still applies
        try_build_range_table(rows, fish_stage)
    }

    #[cfg(not(feature = "gdal"))]
    fn read_ogr_table(path: &Path, _layer: Option<&str>, _fish_stage: &str) -> HabResult<RangeTable> {
        Err(HabError::UnsupportedFormat(format!(
            "{} is not a CSV table; rebuild with the `gdal` feature to read OGR tables",
            path.display()
        )))
    }
}

fn csv_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.trim(csv::Trim::Headers);
    builder
}

fn deserialize_rows<R: std::io::Read>(
    reader: csv::Reader<R>,
) -> impl Iterator<Item = HabResult<RangeRow>> {
    reader
        .into_deserialize::<RangeRow>()
        .map(|row| row.map_err(HabError::from))
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

/// OGR attribute filter selecting one fish stage
pub fn stage_filter(fish_stage: &str) -> String {
    format!("{} = '{}'", STAGE_FIELD, fish_stage.replace('\'', "''"))
}
