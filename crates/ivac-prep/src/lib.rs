//! IVAC Data Preparation Library
//!
//! Cleaning, aggregation and quality profiling of the French middle-school
//! value-added dataset (IVAC), built with Rust and Polars.
//!
//! # Overview
//!
//! - **Loading**: Semicolon CSV from a path or URL, with preamble detection
//! - **Cleaning**: Canonical column names, numeric coercion, derived indicators
//! - **Aggregation**: Means by session, by region and by department
//! - **Checks**: Row-level validity and cross-column consistency checks
//! - **Outliers**: IQR or z-score masks and per-column summaries
//! - **Imputation**: Mean, median, mode, fill propagation and KNN on a sandbox copy
//! - **Quality Score**: Composite 0-100 score with typed alerts
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use ivac_prep::{Pipeline, PipelineConfig, SourceLocation};
//! use ivac_prep::config::{DuplicateRemoval, NumericImputation};
//!
//! let config = PipelineConfig::builder()
//!     .duplicate_removal(DuplicateRemoval::Key)
//!     .numeric_imputation(NumericImputation::Median)
//!     .group_by("academie")
//!     .build()?;
//!
//! let output = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run(&SourceLocation::parse("data/fr-en-ivac.csv"))?;
//!
//! println!("Quality score: {}", output.clean_score.overall);
//! for (check, count) in output.checks.summary() {
//!     println!("{check}: {count}");
//! }
//! ```
//!
//! # Building blocks
//!
//! Every stage is also usable on its own:
//!
//! ```rust,ignore
//! use ivac_prep::{aggregate, checks, quality};
//!
//! let tables = aggregate::make_tables(&raw)?;
//! let report = checks::run_checks(&tables.cleaned)?;
//! let score = quality::score(&tables.cleaned)?;
//! ```

pub mod aggregate;
pub mod cache;
pub mod checks;
pub mod cleaner;
pub mod config;
pub mod dedup;
pub mod diff;
pub mod error;
pub mod imputers;
pub mod loader;
pub mod normalize;
pub mod outliers;
pub mod pipeline;
pub mod profile;
pub mod quality;
pub mod reporting;
pub mod utils;

// Re-exports for convenient access
pub use aggregate::{IvacTables, Kpis, build_tables, compute_kpis, make_tables};
pub use cache::{CachedSource, SourceCache, SourceFingerprint};
pub use checks::{CheckGroup, CheckKind, CheckReport, CheckResult, run_checks};
pub use cleaner::{CleanedTable, clean};
pub use config::{
    CategoricalImputation, ConfigValidationError, DuplicateRemoval, NumericImputation,
    OutlierMethod, PipelineConfig, PipelineConfigBuilder, ViewFilter,
};
pub use diff::{ColumnDiff, diff_columns};
pub use error::{IvacError, Result, ResultExt};
pub use imputers::{impute, impute_categorical, impute_numeric};
pub use loader::{SourceLocation, load};
pub use normalize::normalize_column_name;
pub use outliers::{OutlierSummary, detect_outliers, outlier_summary};
pub use pipeline::{
    ClosureProgressReporter, ExportedFiles, Pipeline, PipelineBuilder, PipelineOutput,
    PipelineStage, PipelineSummary, ProgressReporter, ProgressUpdate,
};
pub use profile::{DatasetProfile, info_table, profile_dataset};
pub use quality::{QualityAlert, QualityScore, quality_alerts, score};
pub use reporting::{QualityReport, export_table, filter_view};
