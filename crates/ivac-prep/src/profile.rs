//! Dataset profiling: per-column completeness and the raw/clean overview.

use crate::checks::{CheckReport, run_checks};
use crate::cleaner::{CleanedTable, clean};
use crate::utils::{exact_duplicate_count, percentage, round_to};
use anyhow::Result;
use polars::prelude::*;
use tracing::info;

/// Completeness of one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub column: String,
    pub non_null: usize,
    pub null_count: usize,
    pub dtype: String,
    /// Null share in percent, rounded to 2 decimals.
    pub null_pct: f64,
}

/// One [`ColumnInfo`] per column, most incomplete first, then by dtype name.
pub fn column_info(df: &DataFrame) -> Vec<ColumnInfo> {
    let rows = df.height();
    let mut infos: Vec<ColumnInfo> = df
        .get_columns()
        .iter()
        .map(|col| {
            let null_count = col.null_count();
            ColumnInfo {
                column: col.name().to_string(),
                non_null: rows - null_count,
                null_count,
                dtype: col.dtype().to_string(),
                null_pct: round_to(percentage(null_count, rows), 2),
            }
        })
        .collect();

    infos.sort_by(|a, b| {
        b.null_pct
            .total_cmp(&a.null_pct)
            .then_with(|| a.dtype.cmp(&b.dtype))
    });
    infos
}

/// [`column_info`] as a frame with columns
/// `column, non_null, null_count, dtype, null_pct`.
pub fn info_table(df: &DataFrame) -> PolarsResult<DataFrame> {
    let infos = column_info(df);

    let names: Vec<String> = infos.iter().map(|i| i.column.clone()).collect();
    let non_null: Vec<u64> = infos.iter().map(|i| i.non_null as u64).collect();
    let nulls: Vec<u64> = infos.iter().map(|i| i.null_count as u64).collect();
    let dtypes: Vec<String> = infos.iter().map(|i| i.dtype.clone()).collect();
    let pct: Vec<f64> = infos.iter().map(|i| i.null_pct).collect();

    DataFrame::new(vec![
        Series::new("column".into(), names).into(),
        Series::new("non_null".into(), non_null).into(),
        Series::new("null_count".into(), nulls).into(),
        Series::new("dtype".into(), dtypes).into(),
        Series::new("null_pct".into(), pct).into(),
    ])
}

/// Overview of a raw export and its cleaned form.
#[derive(Debug, Clone)]
pub struct DatasetProfile {
    pub raw_rows: usize,
    pub raw_columns: usize,
    /// Exact duplicate rows in the raw table, first occurrences excluded.
    pub raw_duplicates: usize,
    pub cleaned: CleanedTable,
    pub info: DataFrame,
    pub checks: CheckReport,
}

/// Clean a raw table and profile the result.
pub fn profile_dataset(raw: &DataFrame) -> Result<DatasetProfile> {
    let raw_duplicates = exact_duplicate_count(raw)?;
    let cleaned = clean(raw)?;
    let info = info_table(&cleaned.df)?;
    let checks = run_checks(&cleaned.df)?;

    info!(
        "Profiled {} rows x {} columns ({} exact duplicates)",
        raw.height(),
        raw.width(),
        raw_duplicates
    );

    Ok(DatasetProfile {
        raw_rows: raw.height(),
        raw_columns: raw.width(),
        raw_duplicates,
        cleaned,
        info,
        checks,
    })
}
