//! Progress reporting for pipeline runs.
//!
//! # Example
//!
//! ```rust,ignore
//! use ivac_prep::Pipeline;
//!
//! let output = Pipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run(&location)?;
//! ```

use serde::{Deserialize, Serialize};

/// Stages of one pipeline run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Reading the source (or hitting the cache)
    Loading,
    /// Renaming, coercing and deriving columns
    Cleaning,
    /// Building the aggregate views and column diff
    Aggregation,
    /// Running the validity and consistency checks
    Checks,
    /// Counting outliers
    Outliers,
    /// Deduplicating and imputing the sandbox copy
    Sandbox,
    /// Scoring the clean and sandbox tables
    Scoring,
    /// Run finished successfully
    Complete,
    /// Run failed with an error
    Failed,
}

impl PipelineStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Loading => "Loading Source",
            Self::Cleaning => "Cleaning Data",
            Self::Aggregation => "Building Views",
            Self::Checks => "Running Checks",
            Self::Outliers => "Detecting Outliers",
            Self::Sandbox => "Preparing Sandbox",
            Self::Scoring => "Scoring Quality",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Returns the cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Loading => 0.0,
            Self::Cleaning => 0.25,
            Self::Aggregation => 0.40,
            Self::Checks => 0.55,
            Self::Outliers => 0.65,
            Self::Sandbox => 0.75,
            Self::Scoring => 0.90,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }
}

/// A progress notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Current pipeline stage
    pub stage: PipelineStage,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Human-readable message describing current activity
    pub message: String,
}

impl ProgressUpdate {
    /// Update announcing the start of a stage.
    pub fn new(stage: PipelineStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            progress: stage.base_progress(),
            message: message.into(),
        }
    }

    /// Creates a completion progress update.
    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(PipelineStage::Complete, message)
    }

    /// Creates a failed progress update.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(PipelineStage::Failed, message)
    }
}

/// Trait for receiving progress updates during a run.
///
/// Implementations must be `Send + Sync` so a pipeline can be moved to a
/// worker thread together with its reporter.
pub trait ProgressReporter: Send + Sync {
    /// Called at the start of every stage and once at the end of the run.
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    /// Creates a new closure-based progress reporter.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_progress_update_new() {
        let update = ProgressUpdate::new(PipelineStage::Checks, "Running checks");
        assert_eq!(update.stage, PipelineStage::Checks);
        assert_eq!(update.progress, 0.55);
        assert_eq!(update.message, "Running checks");
    }

    #[test]
    fn test_progress_update_complete() {
        let update = ProgressUpdate::complete("Done");
        assert_eq!(update.stage, PipelineStage::Complete);
        assert_eq!(update.progress, 1.0);
    }

    #[test]
    fn test_stage_progress_is_monotonic() {
        let stages = [
            PipelineStage::Loading,
            PipelineStage::Cleaning,
            PipelineStage::Aggregation,
            PipelineStage::Checks,
            PipelineStage::Outliers,
            PipelineStage::Sandbox,
            PipelineStage::Scoring,
            PipelineStage::Complete,
        ];
        for pair in stages.windows(2) {
            assert!(pair[0].base_progress() < pair[1].base_progress());
        }
    }

    #[test]
    fn test_closure_progress_reporter() {
        let seen = Mutex::new(Vec::new());
        let reporter = ClosureProgressReporter::new(|update: ProgressUpdate| {
            seen.lock().unwrap().push(update.stage);
        });

        reporter.report(ProgressUpdate::new(PipelineStage::Loading, "Loading"));
        reporter.report(ProgressUpdate::failed("boom"));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![PipelineStage::Loading, PipelineStage::Failed]
        );
    }

    #[test]
    fn test_stage_json_values() {
        let json = serde_json::to_string(&PipelineStage::Sandbox).unwrap();
        assert_eq!(json, "\"sandbox\"");
        assert_eq!(PipelineStage::Scoring.display_name(), "Scoring Quality");
    }
}
