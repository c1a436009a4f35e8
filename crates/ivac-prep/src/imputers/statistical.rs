//! Statistical imputation methods.
//!
//! Provides mean, median, mode and fill-propagation strategies, globally or
//! within groups of another column.

use crate::cleaner::to_numeric;
use crate::utils::{numeric_mode, string_mode};
use anyhow::Result;
use polars::prelude::*;
use tracing::debug;

/// Statistic used to fill numeric gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    Mean,
    Median,
    Mode,
}

impl Statistic {
    fn compute(&self, series: &Series) -> PolarsResult<Option<f64>> {
        match self {
            Self::Mean => Ok(series.mean()),
            Self::Median => Ok(series.median()),
            Self::Mode => numeric_mode(series),
        }
    }

    /// Window expression computing the statistic within each group.
    fn grouped_expr(&self, column: &str, group_by: &str) -> Option<Expr> {
        let stat = match self {
            Self::Mean => col(column).mean(),
            Self::Median => col(column).median(),
            Self::Mode => return None,
        };
        Some(stat.over([col(group_by)]))
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Mode => "mode",
        }
    }
}

/// The column as Float64, or `None` when it is absent.
fn numeric_column(df: &DataFrame, col_name: &str) -> Result<Option<Series>> {
    match df.column(col_name) {
        Ok(column) => Ok(Some(to_numeric(column.as_materialized_series())?)),
        Err(_) => Ok(None),
    }
}

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Fill nulls of a numeric column with one statistic of its non-null values.
    ///
    /// A column whose statistic cannot be computed (all null) is left unchanged.
    pub fn apply_numeric(
        df: &mut DataFrame,
        col_name: &str,
        statistic: Statistic,
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        let Some(series) = numeric_column(df, col_name)? else {
            return Ok(());
        };
        let Some(fill_value) = statistic.compute(&series)? else {
            debug!("No {} for '{}', leaving it unchanged", statistic.label(), col_name);
            return Ok(());
        };

        let filled = series.f64()?.fill_null_with_values(fill_value)?.into_series();
        df.with_column(filled)?;

        processing_steps.push(format!(
            "Filled '{}' with {}: {:.2}",
            col_name,
            statistic.label(),
            fill_value
        ));
        Ok(())
    }

    /// Fill nulls with a statistic computed within each group of `group_by`.
    ///
    /// Groups whose values are all null stay null, and rows with a null group
    /// key are not touched. Mode has no grouped form and is applied globally.
    pub fn apply_grouped(
        df: &mut DataFrame,
        col_name: &str,
        group_by: &str,
        statistic: Statistic,
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        let Some(series) = numeric_column(df, col_name)? else {
            return Ok(());
        };
        if group_by == col_name || df.column(group_by).is_err() {
            return Ok(());
        }
        let Some(group_stat) = statistic.grouped_expr(col_name, group_by) else {
            debug!("No grouped {} for '{}', filling globally", statistic.label(), col_name);
            return Self::apply_numeric(df, col_name, statistic, processing_steps);
        };

        let groups = df.column(group_by)?.n_unique()?;
        let frame = DataFrame::new(vec![
            series.into(),
            df.column(group_by)?.clone(),
        ])?;
        let filled = frame
            .lazy()
            .select([when(col(group_by).is_null())
                .then(col(col_name))
                .otherwise(col(col_name).fill_null(group_stat))
                .alias(col_name)])
            .collect()?;
        df.with_column(filled.column(col_name)?.clone())?;

        processing_steps.push(format!(
            "Filled '{}' with {} per '{}' ({} groups)",
            col_name,
            statistic.label(),
            group_by,
            groups
        ));
        Ok(())
    }

    /// Propagate the last (or next) non-null value in current row order.
    pub fn apply_fill(
        df: &mut DataFrame,
        col_name: &str,
        forward: bool,
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        let Ok(column) = df.column(col_name) else {
            return Ok(());
        };
        let series = column.as_materialized_series();
        let strategy = if forward {
            FillNullStrategy::Forward(None)
        } else {
            FillNullStrategy::Backward(None)
        };
        let filled = series.fill_null(strategy)?;
        df.with_column(filled)?;

        processing_steps.push(format!(
            "{} fill '{}'",
            if forward { "Forward" } else { "Backward" },
            col_name
        ));
        Ok(())
    }

    /// Fill nulls of a categorical column with its most frequent value.
    pub fn apply_mode_imputation(
        df: &mut DataFrame,
        col_name: &str,
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        let Ok(column) = df.column(col_name) else {
            return Ok(());
        };
        let series = column.as_materialized_series().cast(&DataType::String)?;
        let Some(mode_val) = string_mode(&series)? else {
            debug!("No mode for '{}', leaving it unchanged", col_name);
            return Ok(());
        };

        let filled: StringChunked = series
            .str()?
            .into_iter()
            .map(|v| Some(v.unwrap_or(mode_val.as_str())))
            .collect();
        df.with_column(filled.with_name(col_name.into()).into_series())?;

        processing_steps.push(format!("Filled '{}' with mode: '{}'", col_name, mode_val));
        Ok(())
    }
}
