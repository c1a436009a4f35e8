//! Row-level validity and consistency checks.
//!
//! Each check is an independent predicate over the cleaned table that yields
//! the indices of the offending rows. A check whose columns are missing is
//! skipped, never failed. A row may violate several checks at once, and
//! [`CheckReport::total_issue_count`] counts it once per check, while
//! [`CheckReport::invalid_rows`] counts it once overall.

use crate::utils::{duplicated_rows, f64_values, has_columns, string_values};
use anyhow::Result;
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

static UAI_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{7}[A-Z]$").expect("Invalid regex: UAI"));

static SESSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^20[0-9]{2}$").expect("Invalid regex: session"));

/// Bounds of a success rate, inclusive.
const RATE_RANGE: (f64, f64) = (0.0, 100.0);

/// Largest plausible absolute value added.
const VALUE_ADDED_LIMIT: f64 = 50.0;

/// Tolerance when comparing candidate sums.
const SUM_TOLERANCE: f64 = 1e-9;

/// Family a check belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckGroup {
    /// Range, format and key checks.
    Base,
    /// Business-logic checks.
    Advanced,
    /// Arithmetic and format consistency across columns.
    CrossColumn,
}

/// A named row-level check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    /// `taux_reussite_g` present and outside [0, 100].
    InvalidSuccessRate,
    /// `|valeur_ajoutee| > 50`.
    ExtremeValueAdded,
    /// `uai` present and not 7 digits followed by an uppercase letter.
    InvalidUaiFormat,
    /// `(uai, session)` shared by more than one row.
    DuplicateUaiSession,
    /// `nb_candidats_total` is 0 (or missing) but a success rate is present.
    ZeroCandidatesWithRate,
    /// `nb_candidats_g + nb_candidats_p != nb_candidats_total`, missing as 0.
    TotalCandidatesMismatch,
    /// `session` is not a four-digit year starting with "20".
    InvalidSessionFormat,
}

impl CheckKind {
    /// Every check, in reporting order.
    pub const ALL: [CheckKind; 7] = [
        CheckKind::InvalidSuccessRate,
        CheckKind::ExtremeValueAdded,
        CheckKind::InvalidUaiFormat,
        CheckKind::DuplicateUaiSession,
        CheckKind::ZeroCandidatesWithRate,
        CheckKind::TotalCandidatesMismatch,
        CheckKind::InvalidSessionFormat,
    ];

    /// Stable machine name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::InvalidSuccessRate => "invalid_success_rate_g",
            Self::ExtremeValueAdded => "extreme_value_added",
            Self::InvalidUaiFormat => "invalid_uai_format",
            Self::DuplicateUaiSession => "duplicate_uai_session",
            Self::ZeroCandidatesWithRate => "logic_zero_candidates_but_rate",
            Self::TotalCandidatesMismatch => "total_candidates_mismatch",
            Self::InvalidSessionFormat => "invalid_session_format",
        }
    }

    pub fn group(&self) -> CheckGroup {
        match self {
            Self::InvalidSuccessRate
            | Self::ExtremeValueAdded
            | Self::InvalidUaiFormat
            | Self::DuplicateUaiSession => CheckGroup::Base,
            Self::ZeroCandidatesWithRate => CheckGroup::Advanced,
            Self::TotalCandidatesMismatch | Self::InvalidSessionFormat => CheckGroup::CrossColumn,
        }
    }

    /// Columns the check needs.
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            Self::InvalidSuccessRate => &["taux_reussite_g"],
            Self::ExtremeValueAdded => &["valeur_ajoutee"],
            Self::InvalidUaiFormat => &["uai"],
            Self::DuplicateUaiSession => &["uai", "session"],
            Self::ZeroCandidatesWithRate => &["nb_candidats_total", "taux_reussite_g"],
            Self::TotalCandidatesMismatch => {
                &["nb_candidats_g", "nb_candidats_p", "nb_candidats_total"]
            }
            Self::InvalidSessionFormat => &["session"],
        }
    }

    fn evaluate(&self, df: &DataFrame) -> Result<Vec<bool>> {
        let mask: Vec<bool> = match self {
            Self::InvalidSuccessRate => numeric(df, "taux_reussite_g")?
                .into_iter()
                .map(|v| v.is_some_and(|x| x < RATE_RANGE.0 || x > RATE_RANGE.1))
                .collect(),
            Self::ExtremeValueAdded => numeric(df, "valeur_ajoutee")?
                .into_iter()
                .map(|v| v.is_some_and(|x| x.abs() > VALUE_ADDED_LIMIT))
                .collect(),
            Self::InvalidUaiFormat => text(df, "uai")?
                .into_iter()
                .map(|v| v.is_some_and(|s| !UAI_PATTERN.is_match(&s)))
                .collect(),
            Self::DuplicateUaiSession => duplicated_rows(df, self.required_columns())?,
            Self::ZeroCandidatesWithRate => {
                let totals = numeric(df, "nb_candidats_total")?;
                let rates = numeric(df, "taux_reussite_g")?;
                totals
                    .into_iter()
                    .zip(rates)
                    .map(|(total, rate)| total.unwrap_or(0.0) == 0.0 && rate.is_some())
                    .collect()
            }
            Self::TotalCandidatesMismatch => {
                let g = numeric(df, "nb_candidats_g")?;
                let p = numeric(df, "nb_candidats_p")?;
                let total = numeric(df, "nb_candidats_total")?;
                g.into_iter()
                    .zip(p)
                    .zip(total)
                    .map(|((g, p), t)| {
                        let sum = g.unwrap_or(0.0) + p.unwrap_or(0.0);
                        (sum - t.unwrap_or(0.0)).abs() > SUM_TOLERANCE
                    })
                    .collect()
            }
            Self::InvalidSessionFormat => text(df, "session")?
                .into_iter()
                .map(|v| !v.is_some_and(|s| SESSION_PATTERN.is_match(&s)))
                .collect(),
        };
        Ok(mask)
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn numeric(df: &DataFrame, column: &str) -> Result<Vec<Option<f64>>> {
    Ok(f64_values(df, column)?.unwrap_or_default())
}

fn text(df: &DataFrame, column: &str) -> Result<Vec<Option<String>>> {
    Ok(string_values(df, column)?.unwrap_or_default())
}

/// Offending rows of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub kind: CheckKind,
    /// Row positions in the checked table, ascending.
    pub rows: Vec<usize>,
}

impl CheckResult {
    pub fn count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Outcome of every check over one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    /// Checks that ran, including those with no violations.
    pub results: Vec<CheckResult>,
    /// Checks skipped because a required column is missing.
    pub skipped: Vec<CheckKind>,
    /// Rows in the checked table.
    pub row_count: usize,
}

impl CheckReport {
    /// Result of one check, if it ran.
    pub fn get(&self, kind: CheckKind) -> Option<&CheckResult> {
        self.results.iter().find(|r| r.kind == kind)
    }

    /// Rows flagged by one check (empty if it was skipped).
    pub fn rows(&self, kind: CheckKind) -> &[usize] {
        self.get(kind).map(|r| r.rows.as_slice()).unwrap_or(&[])
    }

    /// Sum of per-check violation counts; a row failing two checks counts twice.
    pub fn total_issue_count(&self) -> usize {
        self.results.iter().map(CheckResult::count).sum()
    }

    /// Distinct rows flagged by at least one check.
    pub fn invalid_rows(&self) -> BTreeSet<usize> {
        self.results
            .iter()
            .flat_map(|r| r.rows.iter().copied())
            .collect()
    }

    /// Violation count per check name, for checks with at least one violation.
    pub fn summary(&self) -> BTreeMap<&'static str, usize> {
        self.results
            .iter()
            .filter(|r| !r.is_empty())
            .map(|r| (r.kind.name(), r.count()))
            .collect()
    }

    /// Results of one group of checks.
    pub fn group(&self, group: CheckGroup) -> impl Iterator<Item = &CheckResult> {
        self.results.iter().filter(move |r| r.kind.group() == group)
    }

    /// Materialize the offending rows of one check from the checked table.
    pub fn subset(&self, df: &DataFrame, kind: CheckKind) -> PolarsResult<DataFrame> {
        let indices: Vec<IdxSize> = self.rows(kind).iter().map(|&i| i as IdxSize).collect();
        df.take(&IdxCa::from_vec("idx".into(), indices))
    }
}

/// Run every check against a cleaned table.
pub fn run_checks(df: &DataFrame) -> Result<CheckReport> {
    let mut report = CheckReport {
        row_count: df.height(),
        ..CheckReport::default()
    };

    for kind in CheckKind::ALL {
        if !has_columns(df, kind.required_columns()) {
            debug!("Skipping check '{}': missing columns", kind);
            report.skipped.push(kind);
            continue;
        }

        let rows: Vec<usize> = kind
            .evaluate(df)?
            .into_iter()
            .enumerate()
            .filter_map(|(i, bad)| bad.then_some(i))
            .collect();
        if !rows.is_empty() {
            debug!("Check '{}' flagged {} rows", kind, rows.len());
        }
        report.results.push(CheckResult { kind, rows });
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> DataFrame {
        df![
            "uai" => [Some("0010001A"), Some("0010002B"), Some("0010001A"), Some("bad"), None],
            "session" => [Some(2023i64), Some(2023), Some(2023), Some(1999), None],
            "taux_reussite_g" => [Some(88.5), Some(150.0), Some(-1.0), None, Some(70.0)],
            "valeur_ajoutee" => [Some(3.2), Some(-60.0), Some(50.0), None, Some(51.0)],
            "nb_candidats_g" => [Some(10.0), Some(5.0), None, Some(1.0), Some(0.0)],
            "nb_candidats_p" => [Some(10.0), None, None, Some(1.0), Some(0.0)],
            "nb_candidats_total" => [Some(20.0), Some(5.0), Some(0.0), Some(3.0), None],
        ]
        .unwrap()
    }

    // ========================================================================
    // Individual checks
    // ========================================================================

    #[test]
    fn test_success_rate_bounds() {
        let report = run_checks(&sample()).unwrap();
        assert_eq!(report.rows(CheckKind::InvalidSuccessRate), &[1, 2]);
    }

    #[test]
    fn test_extreme_value_added_is_strict() {
        let report = run_checks(&sample()).unwrap();
        // 50.0 is on the boundary and passes
        assert_eq!(report.rows(CheckKind::ExtremeValueAdded), &[1, 4]);
    }

    #[test]
    fn test_uai_format_ignores_nulls() {
        let report = run_checks(&sample()).unwrap();
        assert_eq!(report.rows(CheckKind::InvalidUaiFormat), &[3]);
    }

    #[test]
    fn test_duplicate_key_flags_every_occurrence() {
        let report = run_checks(&sample()).unwrap();
        assert_eq!(report.rows(CheckKind::DuplicateUaiSession), &[0, 2]);
    }

    #[test]
    fn test_zero_candidates_with_rate() {
        let report = run_checks(&sample()).unwrap();
        // Row 2 has a zero total, row 4 a missing one
        assert_eq!(report.rows(CheckKind::ZeroCandidatesWithRate), &[2, 4]);
    }

    #[test]
    fn test_total_candidates_mismatch_treats_missing_as_zero() {
        let report = run_checks(&sample()).unwrap();
        assert_eq!(report.rows(CheckKind::TotalCandidatesMismatch), &[3]);
    }

    #[test]
    fn test_session_format_flags_nulls() {
        let report = run_checks(&sample()).unwrap();
        assert_eq!(report.rows(CheckKind::InvalidSessionFormat), &[3, 4]);
    }

    // ========================================================================
    // Report
    // ========================================================================

    #[test]
    fn test_total_is_sum_and_invalid_rows_is_union() {
        let report = run_checks(&sample()).unwrap();

        assert_eq!(report.total_issue_count(), 12);
        assert_eq!(
            report.invalid_rows().into_iter().collect::<Vec<_>>(),
            vec![0, 1, 2, 3, 4]
        );
    }

    #[test]
    fn test_missing_columns_skip_checks() {
        let df = df!["uai" => ["0010001A", "XYZ"]].unwrap();
        let report = run_checks(&df).unwrap();

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.skipped.len(), 6);
        assert_eq!(report.summary(), BTreeMap::from([("invalid_uai_format", 1)]));
    }

    #[test]
    fn test_subset_materializes_rows() {
        let df = sample();
        let report = run_checks(&df).unwrap();
        let subset = report.subset(&df, CheckKind::InvalidSuccessRate).unwrap();

        assert_eq!(subset.height(), 2);
        let rates = subset.column("taux_reussite_g").unwrap().f64().unwrap().clone();
        assert_eq!(rates.get(0), Some(150.0));
    }

    #[test]
    fn test_groups() {
        let report = run_checks(&sample()).unwrap();
        assert_eq!(report.group(CheckGroup::Base).count(), 4);
        assert_eq!(report.group(CheckGroup::Advanced).count(), 1);
        assert_eq!(report.group(CheckGroup::CrossColumn).count(), 2);
    }
}
