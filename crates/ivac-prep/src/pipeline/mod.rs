//! Pipeline module.
//!
//! This module provides the end-to-end pipeline and related components.

mod builder;
mod output;
pub mod progress;

pub use builder::{ExportedFiles, Pipeline, PipelineBuilder};
pub use output::{PipelineOutput, PipelineSummary};
pub use progress::{ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate};
