use crate::utils::f64_values;
use anyhow::Result;
use polars::prelude::*;
use std::cmp::Ordering;
use tracing::debug;

/// Nearest-neighbour imputer over a set of numeric columns.
///
/// Distances are nan-euclidean over the selected columns: coordinates missing
/// on either side are skipped and the squared sum is scaled by
/// `total / present`. Donors are weighted by inverse distance; donors at
/// distance zero take all the weight.
pub struct KNNImputer {
    n_neighbors: usize,
}

impl KNNImputer {
    /// Create a new KNN imputer with specified number of neighbors
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors: n_neighbors.max(1),
        }
    }

    /// Impute the nulls of `columns`, returning a new frame.
    ///
    /// Absent columns are ignored. All-null columns are left unchanged and
    /// take no part in the distance scaling.
    pub fn fit_transform(&self, df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
        let mut result_df = df.clone();

        let (names, matrix) = feature_matrix(df, columns)?;
        if names.is_empty() {
            return Ok(result_df);
        }

        debug!(
            "KNN imputing {} columns with k={}",
            names.len(),
            self.n_neighbors
        );

        for (col_idx, name) in names.iter().enumerate() {
            let column = &matrix[col_idx];
            let donors: Vec<usize> = (0..column.len()).filter(|r| column[*r].is_some()).collect();
            if donors.is_empty() || donors.len() == column.len() {
                continue;
            }
            let column_mean =
                donors.iter().filter_map(|r| column[*r]).sum::<f64>() / donors.len() as f64;

            let imputed: Vec<Option<f64>> = (0..column.len())
                .map(|row| {
                    column[row].or_else(|| {
                        Some(
                            self.impute_value(&matrix, row, col_idx, &donors)
                                .unwrap_or(column_mean),
                        )
                    })
                })
                .collect();

            result_df.with_column(Series::new((*name).into(), imputed))?;
        }

        Ok(result_df)
    }

    /// Weighted mean of the nearest donors, or `None` when no donor shares a
    /// present coordinate with the receiver.
    fn impute_value(
        &self,
        matrix: &[Vec<Option<f64>>],
        row: usize,
        col_idx: usize,
        donors: &[usize],
    ) -> Option<f64> {
        let mut distances: Vec<(Option<f64>, usize)> = donors
            .iter()
            .map(|&donor| (nan_euclidean(matrix, row, donor), donor))
            .collect();
        if distances.iter().all(|(d, _)| d.is_none()) {
            return None;
        }

        // Unknown distances sort last
        distances.sort_by(|(a, _), (b, _)| match (a, b) {
            (Some(a), Some(b)) => a.total_cmp(b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        distances.truncate(self.n_neighbors);

        let value_of = |donor: usize| matrix[col_idx][donor].unwrap_or(0.0);
        let exact: Vec<usize> = distances
            .iter()
            .filter(|(d, _)| *d == Some(0.0))
            .map(|(_, donor)| *donor)
            .collect();
        if !exact.is_empty() {
            return Some(exact.iter().map(|d| value_of(*d)).sum::<f64>() / exact.len() as f64);
        }

        let (weighted, total_weight) = distances
            .iter()
            .filter_map(|(d, donor)| d.map(|d| (1.0 / d, *donor)))
            .fold((0.0, 0.0), |(sum, weights), (w, donor)| {
                (sum + w * value_of(donor), weights + w)
            });
        (total_weight > 0.0).then(|| weighted / total_weight)
    }
}

/// Column-major values of the present columns that hold at least one value.
fn feature_matrix<'a>(
    df: &DataFrame,
    columns: &'a [String],
) -> Result<(Vec<&'a str>, Vec<Vec<Option<f64>>>)> {
    let mut names = Vec::with_capacity(columns.len());
    let mut matrix = Vec::with_capacity(columns.len());
    for name in columns {
        let Some(values) = f64_values(df, name)? else {
            continue;
        };
        if values.iter().all(Option::is_none) {
            debug!("KNN skipping all-null column '{}'", name);
            continue;
        }
        names.push(name.as_str());
        matrix.push(values);
    }
    Ok((names, matrix))
}

/// Nan-euclidean distance between two rows of a column-major matrix.
fn nan_euclidean(matrix: &[Vec<Option<f64>>], a: usize, b: usize) -> Option<f64> {
    let mut squared = 0.0;
    let mut present = 0usize;
    for column in matrix {
        if let (Some(x), Some(y)) = (column[a], column[b]) {
            squared += (x - y).powi(2);
            present += 1;
        }
    }
    if present == 0 {
        return None;
    }
    Some((squared * matrix.len() as f64 / present as f64).sqrt())
}
