//! Main pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! orchestrating one load, clean, check and score run.

use crate::aggregate::{build_tables, compute_kpis};
use crate::cache::SourceCache;
use crate::checks::run_checks;
use crate::cleaner::{CleanedTable, clean};
use crate::config::{ConfigValidationError, DuplicateRemoval, PipelineConfig};
use crate::dedup::{drop_exact_duplicates, drop_key_duplicates};
use crate::diff::diff_columns;
use crate::error::{Result, ResultExt};
use crate::imputers::{
    default_categorical_columns, default_numeric_columns, impute_categorical, impute_numeric,
};
use crate::loader::SourceLocation;
use crate::outliers::{DEFAULT_OUTLIER_COLUMNS, outlier_summary};
use crate::pipeline::output::PipelineOutput;
use crate::pipeline::progress::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::quality::{QualityScore, quality_alerts};
use crate::reporting::{
    FILTERED_EXPORT_NAME, QUALITY_REPORT_NAME, QualityReport, export_table, filter_view,
};
use crate::utils::{column_names, exact_duplicate_count};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// The IVAC preparation pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use ivac_prep::{Pipeline, PipelineConfig, SourceLocation};
/// use ivac_prep::config::NumericImputation;
///
/// let output = Pipeline::builder()
///     .config(
///         PipelineConfig::builder()
///             .numeric_imputation(NumericImputation::Median)
///             .group_by("academie")
///             .build()?,
///     )
///     .build()?
///     .run(&SourceLocation::parse("data/fr-en-ivac.csv"))?;
///
/// println!("Quality score: {}", output.clean_score.overall);
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    cache: Arc<SourceCache>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

// Pipelines are built on one thread and may run on another
static_assertions::assert_impl_all!(Pipeline: Send);

/// Paths written by [`Pipeline::export`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFiles {
    pub filtered: PathBuf,
    pub report: PathBuf,
}

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The cache backing [`run`](Self::run).
    pub fn cache(&self) -> &SourceCache {
        &self.cache
    }

    /// Load (through the cache), clean and analyze a source.
    pub fn run(&self, location: &SourceLocation) -> Result<PipelineOutput> {
        self.finish(self.run_internal(location))
    }

    /// Clean and analyze an in-memory raw table, bypassing the cache.
    pub fn process(&self, raw: &DataFrame) -> Result<PipelineOutput> {
        self.finish(self.process_internal(raw))
    }

    /// Write the filtered view and the quality report of the cleaned table
    /// into the configured output directory.
    pub fn export(&self, output: &PipelineOutput) -> Result<ExportedFiles> {
        let view = filter_view(&output.cleaned.df, &self.config.filter)?;
        let filtered = self.config.output_dir.join(FILTERED_EXPORT_NAME);
        export_table(&view, &filtered)?;

        let report = self.config.output_dir.join(QUALITY_REPORT_NAME);
        QualityReport::from_table(&output.cleaned.df)
            .context("Building quality report")?
            .write_csv(&report)?;

        Ok(ExportedFiles { filtered, report })
    }

    fn finish(&self, result: Result<PipelineOutput>) -> Result<PipelineOutput> {
        match result {
            Ok(output) => {
                self.report_progress(ProgressUpdate::complete("Pipeline completed successfully"));
                Ok(output)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn stage(&self, stage: PipelineStage, message: &str) {
        info!("{}", message);
        self.report_progress(ProgressUpdate::new(stage, message));
    }

    fn run_internal(&self, location: &SourceLocation) -> Result<PipelineOutput> {
        let start_time = Instant::now();

        self.stage(PipelineStage::Loading, &format!("Loading {}", location));
        let entry = self
            .cache
            .get_or_load(location)
            .context(format!("Loading {}", location))?;

        self.analyze(
            &entry.raw,
            entry.cleaned.clone(),
            Some(entry.loaded_at),
            start_time,
        )
    }

    fn process_internal(&self, raw: &DataFrame) -> Result<PipelineOutput> {
        let start_time = Instant::now();

        self.stage(PipelineStage::Cleaning, "Cleaning raw table...");
        let cleaned = clean(raw)?;

        self.analyze(raw, cleaned, None, start_time)
    }

    fn analyze(
        &self,
        raw: &DataFrame,
        cleaned: CleanedTable,
        loaded_at: Option<DateTime<Utc>>,
        start_time: Instant,
    ) -> Result<PipelineOutput> {
        let mut processing_steps = Vec::new();
        let df = &cleaned.df;
        processing_steps.push(format!(
            "Cleaned {} x {} raw table into {} x {}",
            raw.height(),
            raw.width(),
            df.height(),
            df.width()
        ));

        self.stage(PipelineStage::Aggregation, "Building aggregate views...");
        let tables = build_tables(df)?;
        let diff = diff_columns(&column_names(raw), &column_names(df));
        let kpis = compute_kpis(df)?;
        processing_steps.push(format!("Column diff: {} changes", diff.change_count()));

        self.stage(PipelineStage::Checks, "Running checks...");
        let checks = run_checks(df)?;
        processing_steps.push(format!(
            "Checks: {} issues across {} rows",
            checks.total_issue_count(),
            checks.invalid_rows().len()
        ));

        self.stage(PipelineStage::Outliers, "Detecting outliers...");
        let outliers = outlier_summary(df, &DEFAULT_OUTLIER_COLUMNS, self.config.outlier_method)?;

        self.stage(PipelineStage::Sandbox, "Preparing sandbox copy...");
        let sandbox = self.sandbox(df, &mut processing_steps)?;

        self.stage(PipelineStage::Scoring, "Scoring quality...");
        let clean_score = QualityScore::compute(df)?;
        let sandbox_score = QualityScore::compute(&sandbox)?;
        let alerts = quality_alerts(df)?;
        let raw_duplicates = exact_duplicate_count(raw).context("Counting raw duplicates")?;

        let duration_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Pipeline finished in {} ms, quality score {}",
            duration_ms, clean_score.overall
        );

        Ok(PipelineOutput {
            raw: raw.clone(),
            tables,
            diff,
            checks,
            outliers,
            kpis,
            sandbox,
            clean_score,
            sandbox_score,
            alerts,
            raw_duplicates,
            loaded_at,
            processing_steps,
            duration_ms,
            cleaned,
        })
    }

    /// Deduplicate then impute a copy of the cleaned table.
    fn sandbox(&self, df: &DataFrame, processing_steps: &mut Vec<String>) -> Result<DataFrame> {
        let config = &self.config;

        let deduplicated = match config.duplicate_removal {
            DuplicateRemoval::None => df.clone(),
            DuplicateRemoval::ExactRow => drop_exact_duplicates(df)?,
            DuplicateRemoval::Key => drop_key_duplicates(df)?,
        };
        if deduplicated.height() != df.height() {
            processing_steps.push(format!(
                "Removed {} duplicate rows",
                df.height() - deduplicated.height()
            ));
        }

        let numeric_columns = if config.numeric_columns.is_empty() {
            default_numeric_columns(&deduplicated)
        } else {
            config.numeric_columns.clone()
        };
        let imputed = impute_numeric(
            &deduplicated,
            &numeric_columns,
            config.numeric_imputation,
            config.group_by.as_deref(),
            config.knn_neighbors,
        )?;

        let categorical_columns = if config.categorical_columns.is_empty() {
            default_categorical_columns(&imputed)
        } else {
            config.categorical_columns.clone()
        };
        let imputed = impute_categorical(
            &imputed,
            &categorical_columns,
            config.categorical_imputation,
        )?;

        let nulls = |frame: &DataFrame| -> usize {
            frame.get_columns().iter().map(|c| c.null_count()).sum()
        };
        let filled = nulls(df).saturating_sub(nulls(&imputed));
        processing_steps.push(format!(
            "Sandbox: numeric '{}', {} fewer nulls",
            config.numeric_imputation.as_str(),
            filled
        ));

        Ok(imputed)
    }
}

/// Builder for creating a configured [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    cache: Option<Arc<SourceCache>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Share a source cache with other pipelines.
    ///
    /// Without one, the pipeline gets a private cache.
    pub fn cache(mut self, cache: Arc<SourceCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set a progress reporter for receiving updates during a run.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            config,
            cache: self.cache.unwrap_or_default(),
            progress_reporter: self.progress_reporter,
        })
    }
}
