use crate::utils::{exact_duplicate_count, percentage};
use anyhow::Result;
use polars::prelude::*;
use serde::Serialize;
use std::fmt;

/// Columns whose missing share is watched.
pub const MISSING_ALERT_COLUMNS: [&str; 2] = ["valeur_ajoutee", "taux_reussite_g"];

/// Missing share, in percent, above which an alert is raised.
pub const MISSING_ALERT_THRESHOLD: f64 = 30.0;

/// Exact duplicate share, in percent, above which an alert is raised.
pub const DUPLICATE_ALERT_THRESHOLD: f64 = 5.0;

/// A data quality warning about a cleaned table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QualityAlert {
    /// A watched column is mostly null.
    MissingShare { column: String, percentage: f64 },
    /// Too many rows repeat an earlier row exactly.
    DuplicateRows { percentage: f64 },
}

impl fmt::Display for QualityAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingShare { column, percentage } => {
                write!(f, "'{}' is {:.1}% missing", column, percentage)
            }
            Self::DuplicateRows { percentage } => {
                write!(f, "{:.1}% of rows are exact duplicates", percentage)
            }
        }
    }
}

/// Alerts for a table. An empty table raises none.
pub fn quality_alerts(df: &DataFrame) -> Result<Vec<QualityAlert>> {
    let rows = df.height();
    if rows == 0 {
        return Ok(Vec::new());
    }

    let mut alerts = Vec::new();
    for column in MISSING_ALERT_COLUMNS {
        let Ok(col) = df.column(column) else {
            continue;
        };
        let share = percentage(col.null_count(), rows);
        if share > MISSING_ALERT_THRESHOLD {
            alerts.push(QualityAlert::MissingShare {
                column: column.to_string(),
                percentage: share,
            });
        }
    }

    let duplicates = percentage(exact_duplicate_count(df)?, rows);
    if duplicates > DUPLICATE_ALERT_THRESHOLD {
        alerts.push(QualityAlert::DuplicateRows {
            percentage: duplicates,
        });
    }

    Ok(alerts)
}
