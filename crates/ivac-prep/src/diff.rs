//! Column-level diff between a raw and a cleaned table.
//!
//! Purely name based: the raw names are normalized and matched against the
//! cleaned names. When two raw names normalize to the same canonical name the
//! first one wins the lookup, as it does in the cleaner's rename.

use crate::normalize::normalize_column_name;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Classification of every raw and clean column name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnDiff {
    /// Clean columns that no raw column normalizes to.
    pub engineered: Vec<String>,
    /// `(raw, clean)` pairs where the names differ.
    pub renamed: Vec<(String, String)>,
    /// Raw columns whose normalized name is not in the clean table.
    pub dropped: Vec<String>,
    /// Clean columns whose raw name was already canonical.
    pub unchanged: Vec<String>,
}

impl ColumnDiff {
    /// Total number of columns touched by cleaning.
    pub fn change_count(&self) -> usize {
        self.engineered.len() + self.renamed.len() + self.dropped.len()
    }
}

/// Compare raw and clean column names. All lists are sorted.
pub fn diff_columns<R, C>(raw_cols: &[R], clean_cols: &[C]) -> ColumnDiff
where
    R: AsRef<str>,
    C: AsRef<str>,
{
    let mut normalized_to_raw: HashMap<String, &str> = HashMap::with_capacity(raw_cols.len());
    for raw in raw_cols {
        normalized_to_raw
            .entry(normalize_column_name(raw.as_ref()))
            .or_insert(raw.as_ref());
    }
    let clean_set: BTreeSet<&str> = clean_cols.iter().map(|c| c.as_ref()).collect();

    let mut diff = ColumnDiff::default();

    for clean in &clean_set {
        match normalized_to_raw.get(*clean) {
            None => diff.engineered.push(clean.to_string()),
            Some(raw) if raw != clean => diff.renamed.push((raw.to_string(), clean.to_string())),
            Some(_) => diff.unchanged.push(clean.to_string()),
        }
    }

    diff.dropped = raw_cols
        .iter()
        .map(|raw| {
            let name: &str = raw.as_ref();
            name.to_string()
        })
        .filter(|raw| !clean_set.contains(normalize_column_name(raw).as_str()))
        .collect();
    diff.dropped.sort();
    diff.renamed.sort();

    diff
}
