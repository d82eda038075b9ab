//! Weight extractors
//!
//! Turn one accepted source into per-(affix, phase) weight observations.
//! Each extractor handles a single source kind and returns nothing for the
//! other, so the orchestrator can run every extractor over every source.
//!
//! # Extractors
//! 1. **planner** - tier translation (absolute weights + min tier)
//! 2. **filter** - strictness survival (category calibration)

pub mod filter;
pub mod planner;

pub use filter::FilterWeightExtractor;
pub use planner::PlannerWeightExtractor;

use crate::services::AffixResolver;
use crate::types::{ExtractedWeight, RawSource};

/// Source → weight observations
pub trait WeightExtractor {
    /// Extractor name for logging
    fn name(&self) -> &'static str;

    /// Threshold and unknown affixes are skipped, not zero-weighted
    fn extract(&self, source: &RawSource, resolver: &AffixResolver) -> Vec<ExtractedWeight>;
}
