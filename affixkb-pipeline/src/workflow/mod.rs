//! Run orchestration
//!
//! Sequential per-build processing: one build at a time, one failed build
//! never stops the run. Artifacts are written once, after every build has
//! been attempted.

pub mod pipeline;

pub use pipeline::{Pipeline, PipelineOutcome};
