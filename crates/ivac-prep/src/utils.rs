//! Shared utilities for the IVAC pipeline.
//!
//! Column lookups, value extraction and small statistics used by the cleaner,
//! the checks, the imputers and the scorer.

use polars::prelude::*;
use std::collections::HashSet;

// =============================================================================
// Column Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Column names of a frame as owned strings, in frame order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// True when every named column exists in the frame.
pub fn has_columns(df: &DataFrame, columns: &[&str]) -> bool {
    let present: HashSet<String> = column_names(df).into_iter().collect();
    columns.iter().all(|c| present.contains(*c))
}

/// Values of a column as `f64`, or `None` when the column is absent.
///
/// String columns are parsed leniently: anything that does not parse as a
/// finite number becomes null.
pub fn f64_values(df: &DataFrame, column: &str) -> PolarsResult<Option<Vec<Option<f64>>>> {
    let Ok(col) = df.column(column) else {
        return Ok(None);
    };
    let series = col.as_materialized_series();

    if matches!(series.dtype(), DataType::String) {
        let values = series
            .str()?
            .into_iter()
            .map(|v| v.and_then(parse_finite))
            .collect();
        return Ok(Some(values));
    }

    let cast = series.cast(&DataType::Float64)?;
    let values = cast
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect();
    Ok(Some(values))
}

/// Values of a column rendered as strings, or `None` when the column is absent.
pub fn string_values(df: &DataFrame, column: &str) -> PolarsResult<Option<Vec<Option<String>>>> {
    let Ok(col) = df.column(column) else {
        return Ok(None);
    };
    let series = col.as_materialized_series().cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(Some(values))
}

/// Parse trimmed text as a finite `f64`.
pub fn parse_finite(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

// =============================================================================
// Duplicates
// =============================================================================

fn subset_names(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}

/// Number of rows repeating an earlier row, over `subset` or every column.
///
/// Nulls compare equal, so two rows both missing a key component collide.
pub fn repeated_row_count(df: &DataFrame, subset: Option<&[&str]>) -> PolarsResult<usize> {
    if df.height() == 0 || df.width() == 0 {
        return Ok(0);
    }
    let subset = subset.map(subset_names);
    let distinct = df.unique_stable(subset.as_deref(), UniqueKeepStrategy::First, None)?;
    Ok(df.height() - distinct.height())
}

/// Number of exact duplicate rows (every column), first occurrences excluded.
pub fn exact_duplicate_count(df: &DataFrame) -> PolarsResult<usize> {
    repeated_row_count(df, None)
}

/// Mask of rows whose `columns` values are shared with at least one other row.
pub fn duplicated_rows(df: &DataFrame, columns: &[&str]) -> PolarsResult<Vec<bool>> {
    if df.height() == 0 {
        return Ok(Vec::new());
    }
    let mask = df.select(columns.iter().copied())?.is_duplicated()?;
    Ok(mask.into_iter().map(|d| d.unwrap_or(false)).collect())
}

/// Stable ascending sort on an Int64 column, nulls last.
///
/// Returns the frame untouched when the column is absent or already sorted.
pub fn sort_by_integer_column(df: DataFrame, column: &str) -> PolarsResult<DataFrame> {
    let Ok(col) = df.column(column) else {
        return Ok(df);
    };
    let ids: Vec<Option<i64>> = col.as_materialized_series().i64()?.into_iter().collect();

    let is_sorted = ids.windows(2).all(|w| match (w[0], w[1]) {
        (Some(a), Some(b)) => a <= b,
        (None, Some(_)) => false,
        _ => true,
    });
    if is_sorted {
        return Ok(df);
    }

    let mut order: Vec<usize> = (0..ids.len()).collect();
    order.sort_by_key(|&i| (ids[i].is_none(), ids[i]));
    let indices: Vec<IdxSize> = order.into_iter().map(|i| i as IdxSize).collect();
    let idx = IdxCa::from_vec("idx".into(), indices);

    df.take(&idx)
}

// =============================================================================
// Statistics
// =============================================================================

/// The most frequent non-null value of a series, as a series of length 0 or 1.
///
/// Ties resolve to the smallest value.
pub fn most_frequent(series: &Series) -> PolarsResult<Series> {
    let values = series.clone().with_name("value".into());
    let counted = DataFrame::new(vec![values.into()])?
        .lazy()
        .filter(col("value").is_not_null())
        .group_by([col("value")])
        .agg([len().alias("count")])
        .sort_by_exprs(
            [col("count"), col("value")],
            SortMultipleOptions::default().with_order_descending_multi([true, false]),
        )
        .limit(1)
        .collect()?;
    Ok(counted.column("value")?.as_materialized_series().clone())
}

/// Most frequent non-null number; ties resolve to the smallest value.
pub fn numeric_mode(series: &Series) -> PolarsResult<Option<f64>> {
    let mode = most_frequent(&series.cast(&DataType::Float64)?)?;
    Ok(mode.f64()?.get(0))
}

/// Most frequent non-null string; ties resolve to the lexicographically smallest.
pub fn string_mode(series: &Series) -> PolarsResult<Option<String>> {
    let mode = most_frequent(&series.cast(&DataType::String)?)?;
    Ok(mode.str()?.get(0).map(str::to_string))
}

/// Linear-interpolated quantile of an ascending slice.
pub fn quantile_sorted(values: &[f64], quantile: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let pos = quantile.clamp(0.0, 1.0) * (values.len() as f64 - 1.0);
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        return values[lower];
    }
    let weight = pos - lower as f64;
    values[lower] + (values[upper] - values[lower]) * weight
}

/// Round to `decimals` places, ties to even.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/// Percentage of `part` in `total`, 0.0 for an empty total.
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

// =============================================================================
// Tests
// =============================================================================
