use crate::aggregate::{IvacTables, Kpis};
use crate::checks::CheckReport;
use crate::cleaner::CleanedTable;
use crate::diff::ColumnDiff;
use crate::outliers::OutlierSummary;
use crate::quality::{QualityAlert, QualityScore};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

/// Everything one pipeline run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// The raw table as loaded.
    pub raw: DataFrame,
    /// The pristine cleaned table.
    pub cleaned: CleanedTable,
    /// Aggregate views of the cleaned table.
    pub tables: IvacTables,
    pub diff: ColumnDiff,
    pub checks: CheckReport,
    pub outliers: Vec<OutlierSummary>,
    pub kpis: Kpis,
    /// Deduplicated and imputed copy of the cleaned table.
    pub sandbox: DataFrame,
    pub clean_score: QualityScore,
    pub sandbox_score: QualityScore,
    pub alerts: Vec<QualityAlert>,
    /// Exact duplicate rows in the raw table.
    pub raw_duplicates: usize,
    /// When the source was read; `None` for in-memory input.
    pub loaded_at: Option<DateTime<Utc>>,
    /// Human-readable log of what the run did.
    pub processing_steps: Vec<String>,
    pub duration_ms: u64,
}

impl PipelineOutput {
    /// Serializable digest of the run, without the tables themselves.
    pub fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            raw_shape: self.raw.shape(),
            clean_shape: self.cleaned.df.shape(),
            sandbox_shape: self.sandbox.shape(),
            raw_duplicates: self.raw_duplicates,
            diff: self.diff.clone(),
            collisions: self.cleaned.collisions.clone(),
            checks: self
                .checks
                .summary()
                .into_iter()
                .map(|(name, count)| (name.to_string(), count))
                .collect(),
            total_issues: self.checks.total_issue_count(),
            skipped_checks: self
                .checks
                .skipped
                .iter()
                .map(|kind| kind.name().to_string())
                .collect(),
            outliers: self.outliers.clone(),
            kpis: self.kpis,
            clean_score: self.clean_score,
            sandbox_score: self.sandbox_score,
            alerts: self.alerts.clone(),
            loaded_at: self.loaded_at,
            processing_steps: self.processing_steps.clone(),
            duration_ms: self.duration_ms,
        }
    }
}

/// JSON-friendly digest of a [`PipelineOutput`].
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub raw_shape: (usize, usize),
    pub clean_shape: (usize, usize),
    pub sandbox_shape: (usize, usize),
    pub raw_duplicates: usize,
    pub diff: ColumnDiff,
    pub collisions: Vec<String>,
    /// Violation count per failing check.
    pub checks: BTreeMap<String, usize>,
    pub total_issues: usize,
    pub skipped_checks: Vec<String>,
    pub outliers: Vec<OutlierSummary>,
    pub kpis: Kpis,
    pub clean_score: QualityScore,
    pub sandbox_score: QualityScore,
    pub alerts: Vec<QualityAlert>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded_at: Option<DateTime<Utc>>,
    pub processing_steps: Vec<String>,
    pub duration_ms: u64,
}
