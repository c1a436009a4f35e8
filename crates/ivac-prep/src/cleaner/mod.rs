//! Cleaning and standardization of raw IVAC tables.
//!
//! This module provides functionality for:
//! - Renaming every column to its canonical snake_case form
//! - Coercing the known numeric indicator columns to Float64
//! - Deriving `valeur_ajoutee`, `taux_reussite_g` and `nb_candidats_total`
//! - Upper-casing the geographic and sector columns
//! - Typing `session` and adding `session_str`
//! - Exposing the legacy row sequence as `row_id`
//!
//! The input frame is never modified; every call returns a new table.

mod converters;
mod derive;

pub use derive::{
    CANDIDATE_SOURCES, DerivedColumn, SUCCESS_RATE_SOURCES, VALUE_ADDED_SOURCES,
};

pub(crate) use converters::{to_integer, to_numeric, to_trimmed};

use crate::normalize::normalize_column_name;
use crate::utils::{column_names, sort_by_integer_column};
use anyhow::Result;
use polars::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Performance indicators.
const PERFORMANCE_COLUMNS: [&str; 4] = [
    "taux_reussite_g",
    "taux_reussite_p",
    "va_du_taux_de_reussite_g",
    "va_de_la_note_g",
];

/// Written exam grades.
const GRADE_COLUMNS: [&str; 2] = ["note_a_l_ecrit_g", "note_a_l_ecrit_p"];

/// Candidate counts.
const CANDIDATE_COLUMNS: [&str; 2] = ["nb_candidats_g", "nb_candidats_p"];

/// Access rate from 6th to 9th grade.
const ACCESS_COLUMNS: [&str; 1] = ["taux_d_acces_6eme_3eme"];

/// Attendance shares.
const ATTENDANCE_COLUMNS: [&str; 4] = [
    "part_presents_3eme_ordinaire_total",
    "part_presents_3eme_ordinaire_g",
    "part_presents_3eme_ordinaire_p",
    "part_presents_3eme_segpa_total",
];

/// Honours counts.
const MENTION_COLUMNS: [&str; 4] = [
    "nb_mentions_ab_g",
    "nb_mentions_b_g",
    "nb_mentions_tb_g",
    "nb_mentions_global_g",
];

/// Categorical columns that are trimmed and upper-cased.
pub const CATEGORICAL_COLUMNS: [&str; 5] = [
    "academie",
    "region_academique",
    "departement",
    "commune",
    "secteur",
];

/// Names the cleaner may add on top of the normalized raw names.
pub const ENGINEERED_COLUMNS: [&str; 4] =
    ["valeur_ajoutee", "nb_candidats_total", "session_str", "row_id"];

/// Legacy row-sequence column exposed as `row_id`.
const LEGACY_ROW_COLUMN: &str = "num_ligne";

/// Every column coerced to Float64 when present.
pub fn numeric_columns() -> impl Iterator<Item = &'static str> {
    PERFORMANCE_COLUMNS
        .into_iter()
        .chain(GRADE_COLUMNS)
        .chain(CANDIDATE_COLUMNS)
        .chain(ACCESS_COLUMNS)
        .chain(ATTENDANCE_COLUMNS)
        .chain(MENTION_COLUMNS)
}

/// A cleaned table together with the derivations that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct CleanedTable {
    /// The standardized frame.
    #[serde(skip)]
    pub df: DataFrame,
    /// Engineered columns and the source each one was taken from.
    pub derivations: Vec<DerivedColumn>,
    /// Raw columns that normalized to an already-used name and were left out.
    pub collisions: Vec<String>,
}

impl CleanedTable {
    /// Source column actually used for an engineered column, if it was derived.
    pub fn source_of(&self, column: &str) -> Option<&[String]> {
        self.derivations
            .iter()
            .find(|d| d.column == column)
            .map(|d| d.sources.as_slice())
    }
}

/// Clean a raw IVAC table.
///
/// An empty frame (no rows or no columns) is returned unchanged.
pub fn clean(raw: &DataFrame) -> Result<CleanedTable> {
    if raw.height() == 0 || raw.width() == 0 {
        debug!("Empty raw table, skipping cleaning");
        return Ok(CleanedTable {
            df: raw.clone(),
            derivations: Vec::new(),
            collisions: Vec::new(),
        });
    }

    info!("Cleaning {} rows x {} columns", raw.height(), raw.width());

    let (mut df, collisions) = rename_columns(raw)?;
    let pre_existing: HashSet<String> = column_names(&df).into_iter().collect();

    coerce_numeric(&mut df, &pre_existing)?;

    let mut derivations = Vec::new();
    derivations.extend(derive::value_added(&mut df)?);
    derivations.extend(derive::success_rate(&mut df)?);
    derivations.extend(derive::candidate_total(&mut df)?);

    upper_case_categoricals(&mut df)?;
    type_session(&mut df)?;

    if let Some(derived) = expose_row_id(&mut df)? {
        derivations.push(derived);
    }
    let df = sort_by_integer_column(df, "row_id")?;

    debug!(
        "Cleaning produced {} columns ({} derived)",
        df.width(),
        derivations.len()
    );

    Ok(CleanedTable {
        df,
        derivations,
        collisions,
    })
}

/// Clean a raw table and keep only the frame.
pub fn clean_frame(raw: &DataFrame) -> Result<DataFrame> {
    Ok(clean(raw)?.df)
}

/// Rename every column via the normalizer.
///
/// When two raw names normalize to the same name, the first column is kept
/// and the later ones are reported as collisions.
fn rename_columns(raw: &DataFrame) -> Result<(DataFrame, Vec<String>)> {
    let mut seen = HashSet::new();
    let mut columns: Vec<Column> = Vec::with_capacity(raw.width());
    let mut collisions = Vec::new();

    for column in raw.get_columns() {
        let raw_name = column.name().to_string();
        let name = normalize_column_name(&raw_name);
        if !seen.insert(name.clone()) {
            warn!("Column '{}' normalizes to already used '{}'", raw_name, name);
            collisions.push(raw_name);
            continue;
        }
        let series = column
            .as_materialized_series()
            .clone()
            .with_name(name.as_str().into());
        columns.push(series.into());
    }

    Ok((DataFrame::new(columns)?, collisions))
}

fn coerce_numeric(df: &mut DataFrame, present: &HashSet<String>) -> Result<()> {
    // Engineered numeric names that already exist in the source are typed too
    let targets = numeric_columns().chain(["valeur_ajoutee", "nb_candidats_total"]);

    for name in targets {
        if !present.contains(name) {
            continue;
        }
        let coerced = to_numeric(df.column(name)?.as_materialized_series())?;
        df.with_column(coerced)?;
    }

    Ok(())
}

fn upper_case_categoricals(df: &mut DataFrame) -> Result<()> {
    for name in CATEGORICAL_COLUMNS {
        if let Ok(column) = df.column(name) {
            let upper = converters::to_upper_trimmed(column.as_materialized_series())?;
            df.with_column(upper)?;
        }
    }
    Ok(())
}

fn type_session(df: &mut DataFrame) -> Result<()> {
    let Ok(column) = df.column("session") else {
        return Ok(());
    };

    let session = to_integer(column.as_materialized_series())?;
    let session_str = converters::to_text(&session)?.with_name("session_str".into());
    df.with_column(session)?;
    df.with_column(session_str)?;
    Ok(())
}

fn expose_row_id(df: &mut DataFrame) -> Result<Option<DerivedColumn>> {
    let names: HashSet<String> = column_names(df).into_iter().collect();

    if names.contains("row_id") {
        let typed = to_integer(df.column("row_id")?.as_materialized_series())?;
        df.with_column(typed)?;
        return Ok(None);
    }
    if !names.contains(LEGACY_ROW_COLUMN) {
        return Ok(None);
    }

    df.rename(LEGACY_ROW_COLUMN, "row_id".into())?;
    let typed = to_integer(df.column("row_id")?.as_materialized_series())?;
    df.with_column(typed)?;

    Ok(Some(DerivedColumn::renamed("row_id", LEGACY_ROW_COLUMN)))
}
