//! affixkb-pipeline library interface
//!
//! Compiles community build sources (planner exports and loot filters) into
//! a versioned affix knowledge base. The binary in `main.rs` is a thin CLI
//! over [`workflow::Pipeline`].

pub mod config;
pub mod error;
pub mod extractors;
pub mod fusion;
pub mod graph;
pub mod ingest;
pub mod inheritance;
pub mod output;
pub mod services;
pub mod types;
pub mod validators;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::config::{PipelineConfig, RunOptions};
pub use crate::error::{IngestError, PipelineError, PipelineResult, Rejection};
pub use crate::workflow::{Pipeline, PipelineOutcome};
