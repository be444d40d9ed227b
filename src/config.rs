use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::Category;
use crate::units::mm_to_ft;

/// Neighbour search margins, added to the formwork thickness.
///
/// Slab and column hosts search by a metric buffer; every other category
/// uses a buffer in feet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchBuffers {
    /// Buffer for slab and column hosts, in millimetres.
    pub slab_column_mm: f64,
    /// Buffer for all other hosts, in feet.
    pub general_ft: f64,
}

impl Default for SearchBuffers {
    fn default() -> Self {
        Self {
            slab_column_mm: 3000.0,
            general_ft: 5.0,
        }
    }
}

impl SearchBuffers {
    /// Buffer in feet for a host of `category`.
    #[must_use]
    pub fn buffer_ft(&self, category: Category) -> f64 {
        match category {
            Category::Slab | Category::Column => mm_to_ft(self.slab_column_mm),
            _ => self.general_ft,
        }
    }
}

/// Contact ratios above which a candidate is trimmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeductionThresholds {
    pub column: f64,
    pub other: f64,
}

impl Default for DeductionThresholds {
    fn default() -> Self {
        Self {
            column: 0.01,
            other: 0.05,
        }
    }
}

impl DeductionThresholds {
    #[must_use]
    pub fn for_category(&self, category: Category) -> f64 {
        match category {
            Category::Column => self.column,
            _ => self.other,
        }
    }
}

/// Smallest face areas that still get formwork, in square metres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinFaceAreas {
    /// Columns, beams and stairs.
    pub fine_m2: f64,
    /// Slabs, walls, foundations and everything else.
    pub coarse_m2: f64,
}

impl Default for MinFaceAreas {
    fn default() -> Self {
        Self {
            fine_m2: 0.01,
            coarse_m2: 0.1,
        }
    }
}

/// Configuration of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Host categories to generate formwork for.
    pub categories: Vec<Category>,
    pub exclude_foundations: bool,
    /// Formwork panel thickness in millimetres.
    pub thickness_mm: f64,
    /// Material assigned to generated pieces.
    pub material_id: Option<i64>,
    pub search: SearchBuffers,
    pub thresholds: DeductionThresholds,
    pub min_face_area: MinFaceAreas,
    /// Restrict contact search to the host's pour zone.
    pub precision_mode: bool,
    /// In precision mode, build one neighbour aggregate per zone and reuse it.
    pub amortize_zone_aggregates: bool,
    /// Evaluate elements on the rayon thread pool.
    pub parallel: bool,
    /// Cell size of the proximity grid, in feet.
    pub grid_cell_ft: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            categories: Category::STRUCTURAL.to_vec(),
            exclude_foundations: false,
            thickness_mm: 18.0,
            material_id: None,
            search: SearchBuffers::default(),
            thresholds: DeductionThresholds::default(),
            min_face_area: MinFaceAreas::default(),
            precision_mode: false,
            amortize_zone_aggregates: false,
            parallel: false,
            grid_cell_ft: 10.0,
        }
    }
}

impl AnalysisConfig {
    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed JSON or invalid values.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.thickness_mm.is_finite() && self.thickness_mm > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "thickness_mm must be positive, got {}",
                self.thickness_mm
            )));
        }
        for (name, t) in [
            ("thresholds.column", self.thresholds.column),
            ("thresholds.other", self.thresholds.other),
        ] {
            if !(0.0..=1.0).contains(&t) {
                return Err(ConfigError::Invalid(format!("{name} must lie in [0, 1], got {t}")));
            }
        }
        for (name, b) in [
            ("search.slab_column_mm", self.search.slab_column_mm),
            ("search.general_ft", self.search.general_ft),
            ("min_face_area.fine_m2", self.min_face_area.fine_m2),
            ("min_face_area.coarse_m2", self.min_face_area.coarse_m2),
        ] {
            if !(b.is_finite() && b >= 0.0) {
                return Err(ConfigError::Invalid(format!("{name} must be non-negative, got {b}")));
            }
        }
        if !(self.grid_cell_ft.is_finite() && self.grid_cell_ft > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "grid_cell_ft must be positive, got {}",
                self.grid_cell_ft
            )));
        }
        Ok(())
    }

    /// Formwork thickness in feet.
    #[must_use]
    pub fn thickness_ft(&self) -> f64 {
        mm_to_ft(self.thickness_mm)
    }

    /// Host categories after applying the foundation exclusion.
    #[must_use]
    pub fn host_categories(&self) -> Vec<Category> {
        self.categories
            .iter()
            .copied()
            .filter(|&c| !(self.exclude_foundations && c == Category::Foundation))
            .collect()
    }
}
