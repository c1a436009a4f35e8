use crate::checks::run_checks;
use crate::dedup::DUPLICATE_KEY;
use crate::utils::{has_columns, percentage, repeated_row_count, round_to};
use anyhow::Result;
use polars::prelude::*;
use serde::Serialize;

const COMPLETENESS_WEIGHT: f64 = 0.30;
const UNIQUENESS_WEIGHT: f64 = 0.20;
const VALIDITY_WEIGHT: f64 = 0.30;
const CONSISTENCY_WEIGHT: f64 = 0.20;

/// Composite quality score and its components.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct QualityScore {
    /// Share of non-null cells.
    pub completeness: f64,
    /// Distinct non-null `uai` per row, or 100 without a `uai` column.
    pub uniqueness: f64,
    /// Share of rows not flagged by any check.
    pub validity: f64,
    /// 100 minus the share of repeated `(uai, session)` keys, floored at 0.
    pub consistency: f64,
    /// Weighted sum, rounded to one decimal.
    pub overall: f64,
}

impl QualityScore {
    /// Score a cleaned table. An empty table scores 0 on every component.
    pub fn compute(df: &DataFrame) -> Result<Self> {
        let rows = df.height();
        if rows == 0 {
            return Ok(Self::default());
        }

        let cells = rows * df.width();
        let nulls: usize = df.get_columns().iter().map(|c| c.null_count()).sum();
        let completeness = if cells == 0 {
            100.0
        } else {
            100.0 - percentage(nulls, cells)
        };

        let uniqueness = match df.column("uai") {
            Ok(uai) => {
                let distinct = uai.as_materialized_series().drop_nulls().n_unique()?;
                percentage(distinct, rows)
            }
            Err(_) => 100.0,
        };

        let invalid = run_checks(df)?.invalid_rows().len();
        let validity = 100.0 - percentage(invalid, rows);

        let consistency = if has_columns(df, &DUPLICATE_KEY) {
            let repeated = repeated_row_count(df, Some(&DUPLICATE_KEY[..]))?;
            (100.0 - percentage(repeated, rows)).max(0.0)
        } else {
            100.0
        };

        let overall = round_to(
            completeness * COMPLETENESS_WEIGHT
                + uniqueness * UNIQUENESS_WEIGHT
                + validity * VALIDITY_WEIGHT
                + consistency * CONSISTENCY_WEIGHT,
            1,
        );

        Ok(Self {
            completeness,
            uniqueness,
            validity,
            consistency,
            overall,
        })
    }
}

/// Overall quality score of a cleaned table, in `[0, 100]`.
pub fn score(df: &DataFrame) -> Result<f64> {
    Ok(QualityScore::compute(df)?.overall)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table_scores_zero() {
        assert_eq!(score(&DataFrame::empty()).unwrap(), 0.0);

        let no_rows = df!["uai" => Vec::<String>::new()].unwrap();
        assert_eq!(score(&no_rows).unwrap(), 0.0);
    }

    #[test]
    fn test_perfect_table_scores_hundred() {
        let df = df![
            "uai" => ["0010001A", "0010002B"],
            "session" => [2023i64, 2023],
            "taux_reussite_g" => [90.0, 80.0],
            "valeur_ajoutee" => [1.0, -2.0],
        ]
        .unwrap();

        let result = QualityScore::compute(&df).unwrap();
        assert_eq!(result.completeness, 100.0);
        assert_eq!(result.uniqueness, 100.0);
        assert_eq!(result.validity, 100.0);
        assert_eq!(result.consistency, 100.0);
        assert_eq!(result.overall, 100.0);
    }

    #[test]
    fn test_components_combine_with_weights() {
        // Row 1 repeats row 0's key and has an out-of-range rate
        let df = df![
            "uai" => ["0010001A", "0010001A", "0010002B", "0010003C"],
            "session" => [2023i64, 2023, 2023, 2023],
            "taux_reussite_g" => [Some(90.0), Some(150.0), None, Some(70.0)],
        ]
        .unwrap();

        let result = QualityScore::compute(&df).unwrap();
        // 1 null out of 12 cells
        assert!((result.completeness - (100.0 - 100.0 / 12.0)).abs() < 1e-9);
        assert_eq!(result.uniqueness, 75.0);
        // Rows 0 and 1 share a key (both flagged); row 1 also fails the rate check
        assert_eq!(result.validity, 50.0);
        assert_eq!(result.consistency, 75.0);

        let expected = round_to(
            result.completeness * 0.3 + 75.0 * 0.2 + 50.0 * 0.3 + 75.0 * 0.2,
            1,
        );
        assert_eq!(result.overall, expected);
        assert!((0.0..=100.0).contains(&result.overall));
    }

    #[test]
    fn test_overall_rounds_half_to_even() {
        // One out-of-range rate in eight rows: 30 + 20 + 26.25 + 20 = 96.25
        let uai: Vec<String> = (1..=8).map(|i| format!("{:07}A", i)).collect();
        let mut rates = vec![80.0; 8];
        rates[3] = 150.0;
        let df = df![
            "uai" => uai,
            "session" => [2023i64; 8],
            "taux_reussite_g" => rates,
        ]
        .unwrap();

        let result = QualityScore::compute(&df).unwrap();
        assert_eq!(result.validity, 87.5);
        assert_eq!(result.overall, 96.2);
        assert_eq!(score(&df).unwrap(), 96.2);
    }

    #[test]
    fn test_missing_key_columns_count_as_consistent() {
        let df = df!["valeur_ajoutee" => [1.0, 1.0]].unwrap();
        let result = QualityScore::compute(&df).unwrap();
        assert_eq!(result.uniqueness, 100.0);
        assert_eq!(result.consistency, 100.0);
    }
}
