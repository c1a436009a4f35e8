//! Configuration types for the IVAC pipeline.
//!
//! Everything the surrounding application used to keep in ambient session
//! state (imputation choices, selected filters) is passed in explicitly
//! through [`PipelineConfig`] and [`ViewFilter`].

use crate::error::Result as IvacResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Strategy for imputing missing numeric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NumericImputation {
    /// Leave missing values as they are
    #[default]
    None,
    /// Use the mean of non-null values (per group when `group_by` is set)
    Mean,
    /// Use the median of non-null values (per group when `group_by` is set)
    Median,
    /// Use the most frequent value
    Mode,
    /// Propagate the last seen value forward in current row order
    Ffill,
    /// Propagate the next seen value backward in current row order
    Bfill,
    /// Distance-weighted K-Nearest Neighbors over the selected columns
    Knn,
}

impl NumericImputation {
    /// Strategy name as used in configuration files and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Mode => "mode",
            Self::Ffill => "ffill",
            Self::Bfill => "bfill",
            Self::Knn => "knn",
        }
    }
}

/// Strategy for imputing missing categorical values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CategoricalImputation {
    /// Leave missing values as they are
    #[default]
    None,
    /// Use the most frequent value (mode)
    Mode,
}

/// Duplicate-removal mode applied before imputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateRemoval {
    /// Keep every row
    #[default]
    None,
    /// Drop rows identical on every column (first occurrence kept)
    ExactRow,
    /// Drop rows sharing the (uai, session) key (first occurrence kept)
    Key,
}

/// Method used to flag outliers in numeric columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutlierMethod {
    /// Values strictly outside [Q1 - 1.5*IQR, Q3 + 1.5*IQR]
    #[default]
    Iqr,
    /// Values with |z| > 3 (population standard deviation)
    Zscore,
}

/// Row filter applied to exports and previews.
///
/// An empty selection means "no filter" on that dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewFilter {
    /// Sessions to keep (e.g. 2023).
    #[serde(default)]
    pub sessions: Vec<i64>,
    /// Academic regions to keep, compared after upper-casing.
    #[serde(default)]
    pub regions: Vec<String>,
    /// Sectors to keep (PUBLIC / PRIVE), compared after upper-casing.
    #[serde(default)]
    pub sectors: Vec<String>,
}

impl ViewFilter {
    /// True when no dimension is restricted.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty() && self.regions.is_empty() && self.sectors.is_empty()
    }
}

/// Configuration for the IVAC pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use ivac_prep::config::{NumericImputation, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .numeric_imputation(NumericImputation::Median)
///     .group_by("academie")
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Strategy for imputing missing numeric values.
    /// Default: None
    pub numeric_imputation: NumericImputation,

    /// Strategy for imputing missing categorical values.
    /// Default: None
    pub categorical_imputation: CategoricalImputation,

    /// Column whose groups scope mean/median imputation (e.g. "academie").
    /// Default: None (global statistics)
    pub group_by: Option<String>,

    /// Duplicate-removal mode for the sandbox table.
    /// Default: None
    pub duplicate_removal: DuplicateRemoval,

    /// Outlier detection method.
    /// Default: Iqr
    pub outlier_method: OutlierMethod,

    /// Number of neighbors for KNN imputation.
    /// Default: 5
    pub knn_neighbors: usize,

    /// Numeric columns to impute. Empty means every Float64 column.
    pub numeric_columns: Vec<String>,

    /// Categorical columns to impute. Empty means every String column.
    pub categorical_columns: Vec<String>,

    /// Row filter used for the filtered export.
    pub filter: ViewFilter,

    /// Output directory for exports.
    /// Default: "output"
    pub output_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            numeric_imputation: NumericImputation::default(),
            categorical_imputation: CategoricalImputation::default(),
            group_by: None,
            duplicate_removal: DuplicateRemoval::default(),
            outlier_method: OutlierMethod::default(),
            knn_neighbors: 5,
            numeric_columns: Vec::new(),
            categorical_columns: Vec::new(),
            filter: ViewFilter::default(),
            output_dir: PathBuf::from("output"),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Parse a JSON configuration and validate it.
    ///
    /// Missing fields take their default value.
    pub fn from_json(text: &str) -> IvacResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON configuration file.
    pub fn from_file(path: &Path) -> IvacResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.knn_neighbors == 0 {
            return Err(ConfigValidationError::InvalidKnnNeighbors(
                self.knn_neighbors,
            ));
        }

        if let Some(group) = &self.group_by
            && group.trim().is_empty()
        {
            return Err(ConfigValidationError::EmptyGroupBy);
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid KNN neighbors: {0} (must be at least 1)")]
    InvalidKnnNeighbors(usize),

    #[error("Group-by column name must not be empty")]
    EmptyGroupBy,
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    numeric_imputation: Option<NumericImputation>,
    categorical_imputation: Option<CategoricalImputation>,
    group_by: Option<String>,
    duplicate_removal: Option<DuplicateRemoval>,
    outlier_method: Option<OutlierMethod>,
    knn_neighbors: Option<usize>,
    numeric_columns: Vec<String>,
    categorical_columns: Vec<String>,
    filter: Option<ViewFilter>,
    output_dir: Option<PathBuf>,
}

impl PipelineConfigBuilder {
    /// Set the numeric imputation strategy.
    pub fn numeric_imputation(mut self, strategy: NumericImputation) -> Self {
        self.numeric_imputation = Some(strategy);
        self
    }

    /// Set the categorical imputation strategy.
    pub fn categorical_imputation(mut self, strategy: CategoricalImputation) -> Self {
        self.categorical_imputation = Some(strategy);
        self
    }

    /// Compute mean/median within groups of this column.
    ///
    /// Groups whose values are all null stay null; there is no global fallback.
    pub fn group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by = Some(column.into());
        self
    }

    /// Set the duplicate-removal mode.
    pub fn duplicate_removal(mut self, mode: DuplicateRemoval) -> Self {
        self.duplicate_removal = Some(mode);
        self
    }

    /// Set the outlier detection method.
    pub fn outlier_method(mut self, method: OutlierMethod) -> Self {
        self.outlier_method = Some(method);
        self
    }

    /// Set the number of neighbors for KNN imputation.
    pub fn knn_neighbors(mut self, k: usize) -> Self {
        self.knn_neighbors = Some(k);
        self
    }

    /// Restrict numeric imputation to these columns.
    pub fn numeric_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.numeric_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict categorical imputation to these columns.
    pub fn categorical_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categorical_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the row filter used for exports.
    pub fn filter(mut self, filter: ViewFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Set the output directory for exports.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let config = PipelineConfig {
            numeric_imputation: self.numeric_imputation.unwrap_or_default(),
            categorical_imputation: self.categorical_imputation.unwrap_or_default(),
            group_by: self.group_by,
            duplicate_removal: self.duplicate_removal.unwrap_or_default(),
            outlier_method: self.outlier_method.unwrap_or_default(),
            knn_neighbors: self.knn_neighbors.unwrap_or(5),
            numeric_columns: self.numeric_columns,
            categorical_columns: self.categorical_columns,
            filter: self.filter.unwrap_or_default(),
            output_dir: self.output_dir.unwrap_or_else(|| PathBuf::from("output")),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.numeric_imputation, NumericImputation::None);
        assert_eq!(config.categorical_imputation, CategoricalImputation::None);
        assert_eq!(config.duplicate_removal, DuplicateRemoval::None);
        assert_eq!(config.outlier_method, OutlierMethod::Iqr);
        assert_eq!(config.knn_neighbors, 5);
        assert!(config.group_by.is_none());
        assert!(config.filter.is_empty());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = PipelineConfig::builder()
            .numeric_imputation(NumericImputation::Knn)
            .categorical_imputation(CategoricalImputation::Mode)
            .duplicate_removal(DuplicateRemoval::Key)
            .outlier_method(OutlierMethod::Zscore)
            .knn_neighbors(7)
            .group_by("academie")
            .numeric_columns(["valeur_ajoutee", "taux_reussite_g"])
            .build()
            .unwrap();

        assert_eq!(config.numeric_imputation, NumericImputation::Knn);
        assert_eq!(config.duplicate_removal, DuplicateRemoval::Key);
        assert_eq!(config.outlier_method, OutlierMethod::Zscore);
        assert_eq!(config.knn_neighbors, 7);
        assert_eq!(config.group_by.as_deref(), Some("academie"));
        assert_eq!(config.numeric_columns.len(), 2);
    }

    #[test]
    fn test_validation_invalid_knn_neighbors() {
        let result = PipelineConfig::builder().knn_neighbors(0).build();

        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidKnnNeighbors(0)
        ));
    }

    #[test]
    fn test_validation_empty_group_by() {
        let result = PipelineConfig::builder().group_by("  ").build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::EmptyGroupBy
        ));
    }

    #[test]
    fn test_pipeline_config_from_json() {
        let json = r#"{
            "numeric_imputation": "ffill",
            "categorical_imputation": "mode",
            "group_by": "region_academique",
            "duplicate_removal": "exact_row",
            "outlier_method": "zscore",
            "knn_neighbors": 3,
            "numeric_columns": [],
            "categorical_columns": ["secteur"],
            "filter": { "sessions": [2023], "regions": ["BRETAGNE"] },
            "output_dir": "exports"
        }"#;

        let config: PipelineConfig =
            serde_json::from_str(json).expect("Should deserialize from JSON");

        assert_eq!(config.numeric_imputation, NumericImputation::Ffill);
        assert_eq!(config.categorical_imputation, CategoricalImputation::Mode);
        assert_eq!(config.duplicate_removal, DuplicateRemoval::ExactRow);
        assert_eq!(config.outlier_method, OutlierMethod::Zscore);
        assert_eq!(config.filter.sessions, vec![2023]);
        assert!(config.filter.sectors.is_empty());
        assert_eq!(config.output_dir.to_str().unwrap(), "exports");
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = PipelineConfig::from_json(r#"{ "numeric_imputation": "median" }"#).unwrap();

        assert_eq!(config.numeric_imputation, NumericImputation::Median);
        assert_eq!(config.knn_neighbors, 5);
        assert_eq!(config.output_dir, PathBuf::from("output"));
    }

    #[test]
    fn test_from_json_rejects_invalid_values() {
        let err = PipelineConfig::from_json(r#"{ "knn_neighbors": 0 }"#).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
        assert!(err.to_string().contains("KNN"));

        let err = PipelineConfig::from_json("{ not json").unwrap_err();
        assert_eq!(err.error_code(), "JSON_ERROR");
    }

    #[test]
    fn test_from_file_missing_is_io_error() {
        let err = PipelineConfig::from_file(Path::new("/no/such/ivac-config.json")).unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
    }
}
