//! Raw IVAC loader.
//!
//! Reads the semicolon-delimited export from disk or HTTP(S), skips the
//! preamble lines some exports carry above the real header, parses every
//! column as text and applies a few gentle identifier coercions.

mod remote;

pub use remote::{FETCH_TIMEOUT_SECS, fetch_text};

use crate::cleaner::{to_integer, to_trimmed};
use crate::error::{IvacError, Result};
use crate::utils::sort_by_integer_column;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Number of leading lines searched for the header.
pub const HEADER_SEARCH_LINES: usize = 200;

/// Field separator of the data.gouv.fr export.
pub const SEPARATOR: u8 = b';';

/// Row-sequence column of the raw export.
const ROW_SEQUENCE_COLUMN: &str = "num_ligne";

/// Where a raw table comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceLocation {
    /// Local file.
    Path(PathBuf),
    /// HTTP(S) URL.
    Url(String),
}

impl SourceLocation {
    /// Parse a path-or-URL string; `http://` and `https://` prefixes mean URL.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Self::Url(trimmed.to_string())
        } else {
            Self::Path(PathBuf::from(trimmed))
        }
    }

    /// True for remote sources.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Url(_))
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{}", url),
        }
    }
}

impl From<&str> for SourceLocation {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

/// Load a raw table from a path or URL.
pub fn load(location: &SourceLocation) -> Result<DataFrame> {
    let text = match location {
        SourceLocation::Path(path) => read_text_local(path)?,
        SourceLocation::Url(url) => fetch_text(url)?,
    };
    parse_text(&text, &location.to_string())
}

/// Parse already-retrieved export text into a raw table.
///
/// `location` is only used in error messages.
pub fn parse_text(text: &str, location: &str) -> Result<DataFrame> {
    let text = strip_bom(text);
    let header_idx = detect_header_index(text);
    if header_idx > 0 {
        debug!("Header found at line {} of {}", header_idx, location);
    }

    let body = skip_lines(text, header_idx);
    if body.trim().is_empty() {
        return Err(IvacError::MalformedSource {
            location: location.to_string(),
            reason: "no header line".to_string(),
        });
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        // Every column is read as text
        .with_infer_schema_length(Some(0))
        .with_parse_options(
            CsvParseOptions::default()
                .with_separator(SEPARATOR)
                .with_quote_char(Some(b'"')),
        )
        .into_reader_with_file_handle(Cursor::new(body.as_bytes().to_vec()))
        .finish()
        .map_err(|e| IvacError::MalformedSource {
            location: location.to_string(),
            reason: e.to_string(),
        })?;

    let df = coerce_and_sort(df)?;
    info!(
        "Loaded {} rows x {} columns from {}",
        df.height(),
        df.width(),
        location
    );
    Ok(df)
}

fn read_text_local(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(IvacError::SourceNotFound {
            path: path.display().to_string(),
        });
    }
    let bytes = std::fs::read(path)?;
    String::from_utf8(bytes).map_err(|e| IvacError::MalformedSource {
        location: path.display().to_string(),
        reason: format!("not valid UTF-8: {e}"),
    })
}

/// Drop a leading UTF-8 byte-order mark.
pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

/// Index of the first line (among the first 200) naming both the row sequence
/// and the session columns, case-insensitively. Defaults to 0.
pub fn detect_header_index(text: &str) -> usize {
    text.lines()
        .take(HEADER_SEARCH_LINES)
        .position(|line| {
            let low = line.to_lowercase();
            low.contains(ROW_SEQUENCE_COLUMN) && low.contains("session")
        })
        .unwrap_or(0)
}

fn skip_lines(text: &str, count: usize) -> &str {
    let mut rest = text;
    for _ in 0..count {
        match rest.find('\n') {
            Some(pos) => rest = &rest[pos + 1..],
            None => return "",
        }
    }
    rest
}

/// Gentle typing after parsing.
///
/// `num_ligne` becomes Int64 and orders the rows, `Session`/`session` become
/// Int64, and `UAI`/`uai` are trimmed.
fn coerce_and_sort(mut df: DataFrame) -> Result<DataFrame> {
    for name in [ROW_SEQUENCE_COLUMN, "Session", "session"] {
        if let Ok(column) = df.column(name) {
            let typed = to_integer(column.as_materialized_series())?;
            df.with_column(typed)?;
        }
    }

    for name in ["UAI", "uai"] {
        if let Ok(column) = df.column(name) {
            let trimmed = to_trimmed(column.as_materialized_series())?;
            df.with_column(trimmed)?;
        }
    }

    Ok(sort_by_integer_column(df, ROW_SEQUENCE_COLUMN)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREAMBLE_EXPORT: &str = "\u{feff}Indicateurs de valeur ajoutée des collèges\n\
        Source : data.gouv.fr\n\
        num_ligne;Session;UAI;Taux de réussite G\n\
        2;2023; 0010002B ;150\n\
        1;2023;0010001A;88.5\n";

    // ========================================================================
    // Header detection
    // ========================================================================

    #[test]
    fn test_detect_header_index_after_preamble() {
        assert_eq!(detect_header_index(PREAMBLE_EXPORT), 2);
    }

    #[test]
    fn test_detect_header_index_case_insensitive() {
        assert_eq!(detect_header_index("x\nNUM_LIGNE;SESSION\n1;2023"), 1);
    }

    #[test]
    fn test_detect_header_index_defaults_to_zero() {
        assert_eq!(detect_header_index("a;b\n1;2"), 0);
        assert_eq!(detect_header_index(""), 0);
    }

    #[test]
    fn test_detect_header_index_ignores_lines_past_limit() {
        let mut text = "filler\n".repeat(HEADER_SEARCH_LINES);
        text.push_str("num_ligne;session\n");
        assert_eq!(detect_header_index(&text), 0);
    }

    #[test]
    fn test_strip_bom() {
        assert_eq!(strip_bom("\u{feff}abc"), "abc");
        assert_eq!(strip_bom("abc"), "abc");
    }

    // ========================================================================
    // Parsing
    // ========================================================================

    #[test]
    fn test_parse_text_coerces_and_sorts() {
        let df = parse_text(PREAMBLE_EXPORT, "memory").unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(df.column("num_ligne").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("Session").unwrap().dtype(), &DataType::Int64);
        assert_eq!(
            df.column("Taux de réussite G").unwrap().dtype(),
            &DataType::String
        );

        let uai = df.column("UAI").unwrap();
        let uai: Vec<Option<&str>> = uai.str().unwrap().into_iter().collect();
        assert_eq!(uai, vec![Some("0010001A"), Some("0010002B")]);
    }

    #[test]
    fn test_parse_text_without_header_line_fails() {
        let err = parse_text("\u{feff}", "empty.csv").unwrap_err();
        assert!(err.is_source_error());
        assert_eq!(err.location(), Some("empty.csv"));
    }

    #[test]
    fn test_load_missing_file() {
        let location = SourceLocation::parse("definitely/not/here.csv");
        let err = load(&location).unwrap_err();
        assert_eq!(err.error_code(), "SOURCE_NOT_FOUND");
        assert_eq!(err.location(), Some("definitely/not/here.csv"));
    }

    #[test]
    fn test_source_location_parse() {
        assert!(SourceLocation::parse("https://example.org/a.csv").is_remote());
        assert!(SourceLocation::parse(" http://example.org/a.csv ").is_remote());
        assert_eq!(
            SourceLocation::parse("data/ivac.csv"),
            SourceLocation::Path(PathBuf::from("data/ivac.csv"))
        );
    }
}
