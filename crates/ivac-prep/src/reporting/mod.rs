//! Filtered views and file exports.
//!
//! # Example
//!
//! ```rust,ignore
//! use ivac_prep::reporting::{QualityReport, export_table, filter_view};
//!
//! let view = filter_view(&cleaned, &config.filter)?;
//! export_table(&view, &config.output_dir.join(FILTERED_EXPORT_NAME))?;
//!
//! let report = QualityReport::from_table(&cleaned)?;
//! report.write_csv(&config.output_dir.join(QUALITY_REPORT_NAME))?;
//! ```

mod export;
mod report;

pub use export::{FILTERED_EXPORT_NAME, export_table, filter_view};
pub use report::{QUALITY_REPORT_NAME, QualityReport, ReportRow};
