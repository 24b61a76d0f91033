use crate::core::remap::RemapParams;
use crate::types::{HabError, HabResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything one scoring run needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Depth raster to score
    pub base_raster_path: PathBuf,
    /// Destination of the score raster
    pub output_raster_path: PathBuf,
    /// Depth/score lookup table (CSV or OGR table)
    pub lookup_table_path: PathBuf,
    /// Table name inside a multi-layer lookup source
    pub lookup_layer: Option<String>,
    /// Exact-match value of the `Fish_Stage` column
    pub fish_stage: String,
    /// Spatial reference defined on the output; the base raster's when `None`
    pub spatial_reference: Option<String>,
    pub overwrite_output: bool,
    pub remap: RemapParams,
}

impl RunConfig {
    pub fn new(
        base_raster_path: impl Into<PathBuf>,
        output_raster_path: impl Into<PathBuf>,
        lookup_table_path: impl Into<PathBuf>,
        fish_stage: impl Into<String>,
    ) -> Self {
        Self {
            base_raster_path: base_raster_path.into(),
            output_raster_path: output_raster_path.into(),
            lookup_table_path: lookup_table_path.into(),
            lookup_layer: None,
            fish_stage: fish_stage.into(),
            spatial_reference: None,
            overwrite_output: true,
            remap: RemapParams::default(),
        }
    }

    /// Check the configuration before any I/O happens
    pub fn validate(&self) -> HabResult<()> {
        if self.fish_stage.is_empty() {
            return Err(HabError::Config("Fish stage cannot be empty".to_string()));
        }
        for (name, path) in [
            ("base raster", &self.base_raster_path),
            ("output raster", &self.output_raster_path),
            ("lookup table", &self.lookup_table_path),
        ] {
            if path.as_os_str().is_empty() {
                return Err(HabError::Config(format!("No {} path given", name)));
            }
        }
        if self.base_raster_path == self.output_raster_path {
            return Err(HabError::Config(format!(
                "Output raster {} would overwrite the base raster",
                self.output_raster_path.display()
            )));
        }
        if let Some(sr) = &self.spatial_reference {
            if sr.trim().is_empty() {
                return Err(HabError::Config(
                    "Spatial reference override is blank".to_string(),
                ));
            }
        }
        Ok(())
    }
}
