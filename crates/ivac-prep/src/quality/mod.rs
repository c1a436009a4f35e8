//! Data quality scoring and alerts.
//!
//! The score combines four components, each in `[0, 100]`:
//! completeness, uniqueness of establishments, validity (rows passing every
//! check) and consistency (no repeated `(uai, session)` key).

mod alerts;
mod score;

pub use alerts::{
    DUPLICATE_ALERT_THRESHOLD, MISSING_ALERT_COLUMNS, MISSING_ALERT_THRESHOLD, QualityAlert,
    quality_alerts,
};
pub use score::{QualityScore, score};
