//! Engineered columns.
//!
//! Each derivation consults an ordered list of candidate source columns and
//! records which ones it actually used.

use super::converters::to_numeric;
use crate::utils::f64_values;
use anyhow::Result;
use polars::prelude::*;
use serde::Serialize;
use tracing::debug;

/// Value-added sources in priority order: success-rate based, then grade based.
pub const VALUE_ADDED_SOURCES: [&str; 2] = ["va_du_taux_de_reussite_g", "va_de_la_note_g"];

/// Alternate spellings of the general-track success rate.
pub const SUCCESS_RATE_SOURCES: [&str; 1] = ["taux_de_reussite_g"];

/// Operands summed into `nb_candidats_total`.
pub const CANDIDATE_SOURCES: [&str; 2] = ["nb_candidats_g", "nb_candidats_p"];

/// An engineered column and the source columns it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedColumn {
    pub column: String,
    pub sources: Vec<String>,
}

impl DerivedColumn {
    fn new(column: &str, sources: &[&str]) -> Self {
        Self {
            column: column.to_string(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub(crate) fn renamed(column: &str, source: &str) -> Self {
        Self::new(column, &[source])
    }
}

fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

/// Copy `target` from the first candidate that exists, unless `target` is already present.
fn copy_first_available(
    df: &mut DataFrame,
    target: &str,
    candidates: &[&str],
) -> Result<Option<DerivedColumn>> {
    if has_column(df, target) {
        return Ok(None);
    }

    let Some(&source) = candidates.iter().find(|c| has_column(df, c)) else {
        debug!("No source available for '{}'", target);
        return Ok(None);
    };

    let values = to_numeric(df.column(source)?.as_materialized_series())?.with_name(target.into());
    df.with_column(values)?;
    debug!("Derived '{}' from '{}'", target, source);

    Ok(Some(DerivedColumn::new(target, &[source])))
}

pub(super) fn value_added(df: &mut DataFrame) -> Result<Option<DerivedColumn>> {
    copy_first_available(df, "valeur_ajoutee", &VALUE_ADDED_SOURCES)
}

pub(super) fn success_rate(df: &mut DataFrame) -> Result<Option<DerivedColumn>> {
    copy_first_available(df, "taux_reussite_g", &SUCCESS_RATE_SOURCES)
}

/// `nb_candidats_total = g + p` with missing operands counted as 0.
///
/// Skipped when the total already exists or neither operand is present.
pub(super) fn candidate_total(df: &mut DataFrame) -> Result<Option<DerivedColumn>> {
    if has_column(df, "nb_candidats_total") {
        return Ok(None);
    }

    let present: Vec<&str> = CANDIDATE_SOURCES
        .iter()
        .copied()
        .filter(|c| has_column(df, c))
        .collect();
    if present.is_empty() {
        return Ok(None);
    }

    let mut totals = vec![0.0; df.height()];
    for name in &present {
        let values = f64_values(df, name)?.unwrap_or_default();
        for (total, value) in totals.iter_mut().zip(values) {
            *total += value.unwrap_or(0.0);
        }
    }

    df.with_column(Series::new("nb_candidats_total".into(), totals))?;
    Ok(Some(DerivedColumn::new("nb_candidats_total", &present)))
}
