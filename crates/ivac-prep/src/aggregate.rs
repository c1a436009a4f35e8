//! Aggregate views over the cleaned table.
//!
//! Every view holds arithmetic means over non-null values. Groups are sorted
//! by key, rows with a null key are left out, and a group whose metric is
//! entirely null reports null for it.

use crate::cleaner::clean_frame;
use crate::utils::has_columns;
use anyhow::Result;
use polars::prelude::*;
use serde::Serialize;
use tracing::debug;

/// Metrics tracked over time and by region.
pub const TIMESERIES_METRICS: [&str; 2] = ["taux_reussite_g", "valeur_ajoutee"];

/// Metrics averaged per department.
pub const DEPARTEMENT_METRICS: [&str; 3] =
    ["taux_reussite_g", "valeur_ajoutee", "nb_candidats_total"];

/// The set of tables built from one raw export.
#[derive(Debug, Clone)]
pub struct IvacTables {
    /// Every cleaned row, all sessions. Callers filter by session themselves.
    pub overview: DataFrame,
    /// Means by `session_str`, ascending.
    pub timeseries: DataFrame,
    /// Means by `(region_academique, session_str)`.
    pub by_region: DataFrame,
    /// Means by `(code_departement, departement)`.
    pub by_departement: DataFrame,
    /// The cleaned table.
    pub cleaned: DataFrame,
}

/// Clean a raw table and build every aggregate view.
pub fn make_tables(raw: &DataFrame) -> Result<IvacTables> {
    let cleaned = clean_frame(raw)?;
    build_tables(&cleaned)
}

/// Build the aggregate views from an already cleaned table.
pub fn build_tables(cleaned: &DataFrame) -> Result<IvacTables> {
    let timeseries = grouped_means(cleaned, &["session_str"], &TIMESERIES_METRICS)?;
    let by_region = grouped_means(
        cleaned,
        &["region_academique", "session_str"],
        &TIMESERIES_METRICS,
    )?;
    let by_departement = grouped_means(
        cleaned,
        &["code_departement", "departement"],
        &DEPARTEMENT_METRICS,
    )?;

    debug!(
        "Built aggregates: {} sessions, {} region rows, {} departments",
        timeseries.height(),
        by_region.height(),
        by_departement.height()
    );

    Ok(IvacTables {
        overview: cleaned.clone(),
        timeseries,
        by_region,
        by_departement,
        cleaned: cleaned.clone(),
    })
}

/// Mean of each available metric per distinct key, sorted by key.
///
/// Returns an empty frame when a key column is missing or no metric exists.
pub fn grouped_means(df: &DataFrame, keys: &[&str], metrics: &[&str]) -> Result<DataFrame> {
    let metrics: Vec<&str> = metrics
        .iter()
        .copied()
        .filter(|m| df.column(m).is_ok())
        .collect();
    if metrics.is_empty() || !has_columns(df, keys) {
        debug!("Skipping aggregate on {:?}: missing columns", keys);
        return Ok(DataFrame::empty());
    }

    let has_key = keys
        .iter()
        .map(|k| col(*k).is_not_null())
        .reduce(|acc, e| acc.and(e))
        .unwrap_or_else(|| lit(true));
    let key_exprs: Vec<Expr> = keys
        .iter()
        .map(|k| col(*k).cast(DataType::String))
        .collect();
    let mean_exprs: Vec<Expr> = metrics
        .iter()
        .map(|m| col(*m).cast(DataType::Float64).mean())
        .collect();

    let grouped = df
        .clone()
        .lazy()
        .filter(has_key)
        .group_by(key_exprs)
        .agg(mean_exprs)
        .sort(keys.to_vec(), SortMultipleOptions::default())
        .collect()?;

    Ok(grouped)
}

/// Headline indicators.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Kpis {
    /// Mean of `taux_reussite_g`.
    pub mean_success_rate: Option<f64>,
    /// Mean of `valeur_ajoutee`.
    pub mean_value_added: Option<f64>,
    /// Sum of `nb_candidats_total`.
    pub total_candidates: Option<f64>,
}

/// Compute the headline indicators of a cleaned table.
///
/// Each indicator is `None` when its column is absent or entirely null.
pub fn compute_kpis(df: &DataFrame) -> Result<Kpis> {
    let numeric = |name: &str| -> Result<Option<Series>> {
        match df.column(name) {
            Ok(column) => Ok(Some(
                column.as_materialized_series().cast(&DataType::Float64)?,
            )),
            Err(_) => Ok(None),
        }
    };
    let mean_of = |name: &str| -> Result<Option<f64>> {
        Ok(numeric(name)?.and_then(|series| series.mean()))
    };

    let total_candidates = match numeric("nb_candidats_total")? {
        Some(series) if series.null_count() < series.len() => Some(series.sum::<f64>()?),
        _ => None,
    };

    Ok(Kpis {
        mean_success_rate: mean_of("taux_reussite_g")?,
        mean_value_added: mean_of("valeur_ajoutee")?,
        total_candidates,
    })
}
