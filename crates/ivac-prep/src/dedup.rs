//! Duplicate removal. First occurrences are kept and row order is preserved.

use crate::utils::has_columns;
use anyhow::Result;
use polars::prelude::*;
use tracing::debug;

/// Columns identifying one establishment in one session.
pub const DUPLICATE_KEY: [&str; 2] = ["uai", "session"];

/// Drop rows identical to an earlier row on every column.
pub fn drop_exact_duplicates(df: &DataFrame) -> Result<DataFrame> {
    if df.width() == 0 {
        return Ok(df.clone());
    }
    keep_first(df, None)
}

/// Drop rows repeating an earlier `(uai, session)` key.
///
/// No-op when either key column is absent. Null key cells compare equal.
pub fn drop_key_duplicates(df: &DataFrame) -> Result<DataFrame> {
    if !has_columns(df, &DUPLICATE_KEY) {
        debug!("Key deduplication skipped: missing uai or session");
        return Ok(df.clone());
    }
    let subset: Vec<String> = DUPLICATE_KEY.iter().map(|c| c.to_string()).collect();
    keep_first(df, Some(&subset))
}

fn keep_first(df: &DataFrame, subset: Option<&[String]>) -> Result<DataFrame> {
    let deduped = df.unique_stable(subset, UniqueKeepStrategy::First, None)?;
    let dropped = df.height() - deduped.height();
    if dropped > 0 {
        debug!("Dropped {} duplicate rows", dropped);
    }
    Ok(deduped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        df![
            "uai" => ["A", "A", "A", "B"],
            "session" => [2023i64, 2023, 2023, 2023],
            "valeur_ajoutee" => [Some(1.0), Some(1.0), Some(2.0), None],
        ]
        .unwrap()
    }

    #[test]
    fn test_drop_exact_duplicates_keeps_first() {
        let result = drop_exact_duplicates(&sample()).unwrap();

        assert_eq!(result.height(), 3);
        let va: Vec<Option<f64>> = result
            .column("valeur_ajoutee")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(va, vec![Some(1.0), Some(2.0), None]);
    }

    #[test]
    fn test_drop_key_duplicates() {
        let result = drop_key_duplicates(&sample()).unwrap();

        assert_eq!(result.height(), 2);
        let uai: Vec<Option<&str>> = result.column("uai").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(uai, vec![Some("A"), Some("B")]);
    }

    #[test]
    fn test_drop_key_duplicates_null_keys_collide() {
        let df = df![
            "uai" => [Some("A"), None, None, Some("B")],
            "session" => [Some(2023i64), Some(2023), Some(2023), None],
            "valeur_ajoutee" => [1.0, 2.0, 3.0, 4.0],
        ]
        .unwrap();

        let result = drop_key_duplicates(&df).unwrap();

        assert_eq!(result.height(), 3);
        let va: Vec<Option<f64>> = result
            .column("valeur_ajoutee")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(va, vec![Some(1.0), Some(2.0), Some(4.0)]);
    }

    #[test]
    fn test_drop_key_duplicates_without_key_is_noop() {
        let df = df!["uai" => ["A", "A"]].unwrap();
        let result = drop_key_duplicates(&df).unwrap();
        assert!(result.equals_missing(&df));
    }

    #[test]
    fn test_no_duplicates_returns_equal_frame() {
        let df = df!["x" => [1, 2, 3]].unwrap();
        let result = drop_exact_duplicates(&df).unwrap();
        assert!(result.equals_missing(&df));
    }
}
