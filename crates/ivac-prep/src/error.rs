//! Error types for the IVAC preparation pipeline.
//!
//! Only source failures (missing file, unreachable URL, unparseable text) are
//! fatal. Field-level anomalies never surface here: the cleaner turns them into
//! nulls and the checker reports them as violations.
//!
//! Errors are serializable so a caller can forward them as JSON.

use crate::config::ConfigValidationError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the IVAC pipeline.
#[derive(Error, Debug)]
pub enum IvacError {
    /// Local source file does not exist.
    #[error("CSV not found at {path}")]
    SourceNotFound { path: String },

    /// Remote source could not be fetched (timeout, connection, HTTP status).
    #[error("Could not fetch {location}: {reason}")]
    SourceUnavailable { location: String, reason: String },

    /// Source text was retrieved but could not be parsed as a table.
    #[error("Malformed source {location}: {reason}")]
    MalformedSource { location: String, reason: String },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Writing an export failed.
    #[error("Failed to export {path}: {reason}")]
    ExportFailed { path: String, reason: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failure inside a processing stage (cleaning, checks, imputation).
    #[error("Processing error: {0}")]
    Processing(#[from] anyhow::Error),

    /// HTTP request error (only with "remote" feature).
    #[cfg(feature = "remote")]
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<IvacError>,
    },
}

impl IvacError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        IvacError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code for callers that branch on the failure kind.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SourceNotFound { .. } => "SOURCE_NOT_FOUND",
            Self::SourceUnavailable { .. } => "SOURCE_UNAVAILABLE",
            Self::MalformedSource { .. } => "MALFORMED_SOURCE",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::ExportFailed { .. } => "EXPORT_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Processing(_) => "PROCESSING_ERROR",
            #[cfg(feature = "remote")]
            Self::Http(_) => "HTTP_REQUEST_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether this error means no table could be produced from the source.
    ///
    /// Callers surface these prominently; everything else is informational.
    pub fn is_source_error(&self) -> bool {
        match self {
            Self::SourceNotFound { .. }
            | Self::SourceUnavailable { .. }
            | Self::MalformedSource { .. } => true,
            #[cfg(feature = "remote")]
            Self::Http(_) => true,
            Self::WithContext { source, .. } => source.is_source_error(),
            _ => false,
        }
    }

    /// Path or URL carried by a source error, if any.
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::SourceNotFound { path } => Some(path.as_str()),
            Self::SourceUnavailable { location, .. } | Self::MalformedSource { location, .. } => {
                Some(location.as_str())
            }
            Self::WithContext { source, .. } => source.location(),
            _ => None,
        }
    }
}

impl From<ConfigValidationError> for IvacError {
    fn from(err: ConfigValidationError) -> Self {
        IvacError::InvalidConfig(err.to_string())
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for IvacError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("IvacError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, IvacError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| IvacError::Polars(e).with_context(context))
    }
}
