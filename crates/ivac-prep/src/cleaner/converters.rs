//! Type conversion functions for data cleaning.
//!
//! Every converter is total: unparseable cells become null instead of
//! failing the whole column.

use crate::utils::{is_numeric_dtype, parse_finite};
use anyhow::Result;
use polars::prelude::*;

/// Coerce a series to nullable Float64.
///
/// Text is trimmed and parsed; anything that is not a finite number
/// becomes null.
pub(crate) fn to_numeric(series: &Series) -> Result<Series> {
    match series.dtype() {
        DataType::String => {
            let values: Vec<Option<f64>> = series
                .str()?
                .into_iter()
                .map(|v| v.and_then(parse_finite))
                .collect();
            Ok(Series::new(series.name().clone(), values))
        }
        dtype if is_numeric_dtype(dtype) => {
            let cast = series.cast(&DataType::Float64)?;
            let values: Vec<Option<f64>> = cast
                .f64()?
                .into_iter()
                .map(|v| v.filter(|x| x.is_finite()))
                .collect();
            Ok(Series::new(series.name().clone(), values))
        }
        _ => {
            let as_text = series.cast(&DataType::String)?;
            to_numeric(&as_text)
        }
    }
}

/// Coerce a series to nullable Int64.
///
/// Values that are not whole numbers become null.
pub(crate) fn to_integer(series: &Series) -> Result<Series> {
    let numeric = to_numeric(series)?;
    let values: Vec<Option<i64>> = numeric
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.fract() == 0.0).map(|x| x as i64))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

/// Trim and upper-case a text series, keeping nulls as nulls.
pub(crate) fn to_upper_trimmed(series: &Series) -> Result<Series> {
    let text = series.cast(&DataType::String)?;
    let values: Vec<Option<String>> = text
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.trim().to_uppercase()))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

/// Trim a text series, keeping nulls as nulls.
pub(crate) fn to_trimmed(series: &Series) -> Result<Series> {
    let text = series.cast(&DataType::String)?;
    let values: Vec<Option<String>> = text
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.trim().to_string()))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

/// String form of an integer series (null stays null).
pub(crate) fn to_text(series: &Series) -> Result<Series> {
    let values: Vec<Option<String>> = series
        .i64()?
        .into_iter()
        .map(|v| v.map(|x| x.to_string()))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}
