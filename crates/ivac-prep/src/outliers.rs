//! Outlier detection for numeric columns.
//!
//! Masks are aligned with the input; nulls are never flagged.

use crate::config::OutlierMethod;
use crate::utils::{f64_values, percentage, quantile_sorted};
use anyhow::Result;
use polars::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

/// Columns summarized when the caller does not choose.
pub const DEFAULT_OUTLIER_COLUMNS: [&str; 3] =
    ["valeur_ajoutee", "nb_candidats_total", "taux_reussite_g"];

/// IQR fence multiplier.
const IQR_FACTOR: f64 = 1.5;

/// Absolute z-score above which a value is flagged.
const Z_THRESHOLD: f64 = 3.0;

/// Flag outliers in a sequence of nullable values.
///
/// With fewer than two distinct non-null values the mask is all `false`.
pub fn detect_outliers(values: &[Option<f64>], method: OutlierMethod) -> Vec<bool> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let distinct: HashSet<u64> = present.iter().map(|v| v.to_bits()).collect();
    if distinct.len() < 2 {
        return vec![false; values.len()];
    }

    match method {
        OutlierMethod::Iqr => {
            let mut sorted = present;
            sorted.sort_by(|a, b| a.total_cmp(b));
            let q1 = quantile_sorted(&sorted, 0.25);
            let q3 = quantile_sorted(&sorted, 0.75);
            let iqr = q3 - q1;
            let (lower, upper) = (q1 - IQR_FACTOR * iqr, q3 + IQR_FACTOR * iqr);

            values
                .iter()
                .map(|v| v.is_some_and(|x| x < lower || x > upper))
                .collect()
        }
        OutlierMethod::Zscore => {
            let n = present.len() as f64;
            let mean = present.iter().sum::<f64>() / n;
            let variance = present.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
            let std = variance.sqrt();
            if std == 0.0 {
                return vec![false; values.len()];
            }

            values
                .iter()
                .map(|v| v.is_some_and(|x| ((x - mean) / std).abs() > Z_THRESHOLD))
                .collect()
        }
    }
}

/// Outlier mask of one column, or `None` when the column is absent.
pub fn column_outliers(
    df: &DataFrame,
    column: &str,
    method: OutlierMethod,
) -> Result<Option<Vec<bool>>> {
    Ok(f64_values(df, column)?.map(|values| detect_outliers(&values, method)))
}

/// Outlier count of one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierSummary {
    pub column: String,
    pub count: usize,
    /// Share of all rows, in percent.
    pub percentage: f64,
}

/// Count outliers per column. Absent columns are skipped.
pub fn outlier_summary(
    df: &DataFrame,
    columns: &[&str],
    method: OutlierMethod,
) -> Result<Vec<OutlierSummary>> {
    let mut summaries = Vec::with_capacity(columns.len());

    for column in columns {
        let Some(mask) = column_outliers(df, column, method)? else {
            debug!("Outlier summary: column '{}' absent", column);
            continue;
        };
        let count = mask.iter().filter(|f| **f).count();
        summaries.push(OutlierSummary {
            column: column.to_string(),
            count,
            percentage: percentage(count, df.height()),
        });
    }

    Ok(summaries)
}
