//! Shared static-data services and source discovery

pub mod affix_resolver;
pub mod game_constants;
pub mod source_scanner;

pub use affix_resolver::{AffixResolver, LevenshteinScorer, SimilarityScorer};
pub use game_constants::GameConstants;
pub use source_scanner::{discover_builds, BuildSources};
