use crate::config::ViewFilter;
use crate::error::{IvacError, Result};
use crate::utils::{f64_values, string_values};
use polars::prelude::*;
use std::collections::HashSet;
use std::fs::{self, File};
use std::path::Path;
use tracing::{debug, info};

/// File name of the filtered table export.
pub const FILTERED_EXPORT_NAME: &str = "ivac_filtered.csv";

/// Keep the rows matching every restricted dimension of `filter`.
///
/// Regions and sectors are compared after trimming and upper-casing. A
/// dimension whose column is absent does not filter.
pub fn filter_view(df: &DataFrame, filter: &ViewFilter) -> Result<DataFrame> {
    if filter.is_empty() {
        return Ok(df.clone());
    }

    let mut keep = vec![true; df.height()];

    if !filter.sessions.is_empty() {
        if let Some(sessions) = f64_values(df, "session")? {
            let wanted: Vec<f64> = filter.sessions.iter().map(|s| *s as f64).collect();
            for (flag, session) in keep.iter_mut().zip(sessions) {
                *flag &= session.is_some_and(|s| wanted.contains(&s));
            }
        } else {
            debug!("Session filter ignored: no session column");
        }
    }

    for (column, selected) in [
        ("region_academique", &filter.regions),
        ("secteur", &filter.sectors),
    ] {
        if selected.is_empty() {
            continue;
        }
        let Some(values) = string_values(df, column)? else {
            debug!("Filter on '{}' ignored: column absent", column);
            continue;
        };
        let wanted: HashSet<String> = selected.iter().map(|s| s.trim().to_uppercase()).collect();
        for (flag, value) in keep.iter_mut().zip(values) {
            *flag &= value.is_some_and(|v| wanted.contains(&v.trim().to_uppercase()));
        }
    }

    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    let view = df.filter(&mask)?;
    debug!("Filtered view: {} of {} rows", view.height(), df.height());
    Ok(view)
}

/// Write a table as comma-separated text with a header row.
///
/// Parent directories are created as needed.
pub fn export_table(df: &DataFrame, path: &Path) -> Result<()> {
    let export_failed = |reason: String| IvacError::ExportFailed {
        path: path.display().to_string(),
        reason,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| export_failed(e.to_string()))?;
    }
    let mut file = File::create(path).map_err(|e| export_failed(e.to_string()))?;

    let mut df = df.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(&mut df)
        .map_err(|e| export_failed(e.to_string()))?;

    info!("Exported {} rows to {}", df.height(), path.display());
    Ok(())
}
