//! Imputation module for handling missing values.
//!
//! This module provides various imputation strategies including:
//! - KNN imputation (behind the `knn` feature)
//! - Statistical imputation (mean, median, mode, forward/backward fill)
//!
//! Every entry point returns a new frame; the input is never modified.

#[cfg(feature = "knn")]
mod knn;
mod statistical;

#[cfg(feature = "knn")]
pub use knn::KNNImputer;
pub use statistical::{Statistic, StatisticalImputer};

use crate::cleaner::CATEGORICAL_COLUMNS;
use crate::config::{CategoricalImputation, NumericImputation};
use anyhow::Result;
use polars::prelude::*;
use tracing::{debug, info};

/// Neighbour count used by [`impute`].
pub const DEFAULT_KNN_NEIGHBORS: usize = 5;

/// Every `Float64` column of the frame, in frame order.
pub fn default_numeric_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| matches!(c.dtype(), DataType::Float64))
        .map(|c| c.name().to_string())
        .collect()
}

/// The cleaner's categorical columns present as `String` in the frame.
///
/// Identifiers such as `uai` and `session_str` are never imputed by default.
pub fn default_categorical_columns(df: &DataFrame) -> Vec<String> {
    CATEGORICAL_COLUMNS
        .iter()
        .filter(|name| {
            df.column(name)
                .is_ok_and(|c| matches!(c.dtype(), DataType::String))
        })
        .map(|name| name.to_string())
        .collect()
}

/// Impute numeric columns with the default neighbour count.
pub fn impute(
    df: &DataFrame,
    columns: &[String],
    strategy: NumericImputation,
    group_by: Option<&str>,
) -> Result<DataFrame> {
    impute_numeric(df, columns, strategy, group_by, DEFAULT_KNN_NEIGHBORS)
}

/// Impute the nulls of `columns` with one strategy.
///
/// `group_by` applies to mean and median only and is ignored when the column
/// is absent. Absent target columns are skipped.
pub fn impute_numeric(
    df: &DataFrame,
    columns: &[String],
    strategy: NumericImputation,
    group_by: Option<&str>,
    knn_neighbors: usize,
) -> Result<DataFrame> {
    let targets: Vec<&str> = columns
        .iter()
        .map(String::as_str)
        .filter(|c| df.column(c).is_ok())
        .collect();
    if targets.is_empty() || strategy == NumericImputation::None {
        return Ok(df.clone());
    }

    let mut result = df.clone();
    let mut steps = Vec::new();
    let group_by = group_by.filter(|g| df.column(g).is_ok());

    match strategy {
        NumericImputation::None => {}
        NumericImputation::Mean | NumericImputation::Median => {
            let statistic = if strategy == NumericImputation::Mean {
                Statistic::Mean
            } else {
                Statistic::Median
            };
            for col in &targets {
                match group_by {
                    Some(group) => StatisticalImputer::apply_grouped(
                        &mut result,
                        col,
                        group,
                        statistic,
                        &mut steps,
                    )?,
                    None => {
                        StatisticalImputer::apply_numeric(&mut result, col, statistic, &mut steps)?
                    }
                }
            }
        }
        NumericImputation::Mode => {
            for col in &targets {
                StatisticalImputer::apply_numeric(&mut result, col, Statistic::Mode, &mut steps)?;
            }
        }
        NumericImputation::Ffill | NumericImputation::Bfill => {
            let forward = strategy == NumericImputation::Ffill;
            for col in &targets {
                StatisticalImputer::apply_fill(&mut result, col, forward, &mut steps)?;
            }
        }
        NumericImputation::Knn => {
            result = impute_knn(df, &targets, knn_neighbors)?;
            steps.push(format!("KNN imputation over {} columns", targets.len()));
        }
    }

    for step in &steps {
        debug!("{}", step);
    }
    info!(
        "Numeric imputation '{}' applied to {} columns",
        strategy.as_str(),
        targets.len()
    );
    Ok(result)
}

#[cfg(feature = "knn")]
fn impute_knn(df: &DataFrame, targets: &[&str], k: usize) -> Result<DataFrame> {
    let columns: Vec<String> = targets.iter().map(|c| c.to_string()).collect();
    KNNImputer::new(k).fit_transform(df, &columns)
}

#[cfg(not(feature = "knn"))]
fn impute_knn(df: &DataFrame, _targets: &[&str], _k: usize) -> Result<DataFrame> {
    debug!("KNN imputation unavailable, leaving table unchanged");
    Ok(df.clone())
}

/// Fill categorical nulls with each column's most frequent value.
pub fn impute_categorical(
    df: &DataFrame,
    columns: &[String],
    strategy: CategoricalImputation,
) -> Result<DataFrame> {
    let mut result = df.clone();
    if strategy == CategoricalImputation::None {
        return Ok(result);
    }

    let mut steps = Vec::new();
    for col in columns {
        StatisticalImputer::apply_mode_imputation(&mut result, col, &mut steps)?;
    }
    for step in &steps {
        debug!("{}", step);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::f64_values;

    fn sample() -> DataFrame {
        df![
            "academie" => [Some("LYON"), Some("LYON"), Some("NICE"), Some("NICE"), None],
            "valeur_ajoutee" => [Some(2.0), None, Some(10.0), None, None],
            "taux_reussite_g" => [Some(80.0), Some(90.0), None, Some(70.0), Some(60.0)],
        ]
        .unwrap()
    }

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|c| c.to_string()).collect()
    }

    // ========================================================================
    // impute() tests
    // ========================================================================

    #[test]
    fn test_impute_never_mutates_input() {
        let df = sample();
        let before = df.clone();

        for strategy in [
            NumericImputation::Mean,
            NumericImputation::Median,
            NumericImputation::Mode,
            NumericImputation::Ffill,
            NumericImputation::Bfill,
            NumericImputation::Knn,
        ] {
            let result = impute(&df, &cols(&["valeur_ajoutee"]), strategy, None).unwrap();
            assert_eq!(result.height(), df.height());
        }

        assert!(df.equals_missing(&before));
    }

    #[test]
    fn test_impute_median_global() {
        let result = impute(
            &sample(),
            &cols(&["valeur_ajoutee"]),
            NumericImputation::Median,
            None,
        )
        .unwrap();

        let values = f64_values(&result, "valeur_ajoutee").unwrap().unwrap();
        assert_eq!(
            values,
            vec![Some(2.0), Some(6.0), Some(10.0), Some(6.0), Some(6.0)]
        );
    }

    #[test]
    fn test_impute_grouped_mean_skips_null_groups() {
        let result = impute(
            &sample(),
            &cols(&["valeur_ajoutee"]),
            NumericImputation::Mean,
            Some("academie"),
        )
        .unwrap();

        let values = f64_values(&result, "valeur_ajoutee").unwrap().unwrap();
        assert_eq!(
            values,
            vec![Some(2.0), Some(2.0), Some(10.0), Some(10.0), None]
        );
    }

    #[test]
    fn test_impute_absent_group_column_falls_back_to_global() {
        let result = impute(
            &sample(),
            &cols(&["valeur_ajoutee"]),
            NumericImputation::Mean,
            Some("region"),
        )
        .unwrap();

        assert_eq!(result.column("valeur_ajoutee").unwrap().null_count(), 0);
    }

    #[test]
    fn test_impute_none_and_absent_columns_are_noops() {
        let df = sample();

        let none = impute(&df, &cols(&["valeur_ajoutee"]), NumericImputation::None, None).unwrap();
        assert!(none.equals_missing(&df));

        let absent = impute(&df, &cols(&["missing"]), NumericImputation::Mean, None).unwrap();
        assert!(absent.equals_missing(&df));
    }

    #[test]
    fn test_impute_ffill_only_touches_selected_columns() {
        let result = impute(
            &sample(),
            &cols(&["valeur_ajoutee"]),
            NumericImputation::Ffill,
            None,
        )
        .unwrap();

        let va = f64_values(&result, "valeur_ajoutee").unwrap().unwrap();
        assert_eq!(
            va,
            vec![Some(2.0), Some(2.0), Some(10.0), Some(10.0), Some(10.0)]
        );
        assert_eq!(result.column("taux_reussite_g").unwrap().null_count(), 1);
    }

    #[cfg(feature = "knn")]
    #[test]
    fn test_impute_knn_fills_every_gap() {
        let result = impute(
            &sample(),
            &cols(&["valeur_ajoutee", "taux_reussite_g"]),
            NumericImputation::Knn,
            None,
        )
        .unwrap();

        assert_eq!(result.column("valeur_ajoutee").unwrap().null_count(), 0);
        assert_eq!(result.column("taux_reussite_g").unwrap().null_count(), 0);
    }

    // ========================================================================
    // impute_categorical() tests
    // ========================================================================

    #[test]
    fn test_impute_categorical_mode() {
        let result =
            impute_categorical(&sample(), &cols(&["academie"]), CategoricalImputation::Mode)
                .unwrap();

        let academie = result.column("academie").unwrap();
        assert_eq!(academie.null_count(), 0);
        // LYON and NICE tie; the smallest wins
        assert_eq!(academie.str().unwrap().get(4), Some("LYON"));
    }

    #[test]
    fn test_default_columns_by_dtype() {
        let df = sample();
        assert_eq!(
            default_numeric_columns(&df),
            vec!["valeur_ajoutee", "taux_reussite_g"]
        );
        assert_eq!(default_categorical_columns(&df), vec!["academie"]);
    }

    #[test]
    fn test_default_categorical_skips_identifiers() {
        let df = df![
            "uai" => [Some("0010001A"), None],
            "session_str" => [Some("2023"), None],
            "secteur" => [Some("PUBLIC"), None],
            "academie" => [Some("LYON"), None],
        ]
        .unwrap();

        assert_eq!(
            default_categorical_columns(&df),
            vec!["academie", "secteur"]
        );
    }
}
