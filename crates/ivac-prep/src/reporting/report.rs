use super::export::export_table;
use crate::error::Result;
use crate::quality::score;
use crate::utils::{exact_duplicate_count, percentage};
use polars::prelude::*;
use serde::Serialize;
use std::path::Path;

/// File name of the quality report export.
pub const QUALITY_REPORT_NAME: &str = "quality_report.csv";

/// One `Metric,Value` line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub metric: String,
    pub value: String,
}

/// Headline quality figures of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityReport {
    pub rows: Vec<ReportRow>,
}

impl QualityReport {
    /// Rows, Columns, Duplicates, Missing % and Quality Score of a table.
    pub fn from_table(df: &DataFrame) -> Result<Self> {
        let cells = df.height() * df.width();
        let nulls: usize = df.get_columns().iter().map(|c| c.null_count()).sum();
        let missing = if cells == 0 {
            0.0
        } else {
            percentage(nulls, cells)
        };

        let row = |metric: &str, value: String| ReportRow {
            metric: metric.to_string(),
            value,
        };

        Ok(Self {
            rows: vec![
                row("Rows", df.height().to_string()),
                row("Columns", df.width().to_string()),
                row("Duplicates", exact_duplicate_count(df)?.to_string()),
                row("Missing %", format!("{:.1}%", missing)),
                row("Quality Score", format!("{:.1}", score(df)?)),
            ],
        })
    }

    /// Value of one metric.
    pub fn value(&self, metric: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|r| r.metric == metric)
            .map(|r| r.value.as_str())
    }

    /// The report as a two-column `Metric, Value` frame.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let metrics: Vec<&str> = self.rows.iter().map(|r| r.metric.as_str()).collect();
        let values: Vec<&str> = self.rows.iter().map(|r| r.value.as_str()).collect();
        DataFrame::new(vec![
            Series::new("Metric".into(), metrics).into(),
            Series::new("Value".into(), values).into(),
        ])
    }

    /// Write the report as CSV with a `Metric,Value` header.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        export_table(&self.to_frame()?, path)
    }
}
