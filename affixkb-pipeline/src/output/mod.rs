//! Knowledge base output
//!
//! Three artifacts, staged together and renamed into place:
//! - `knowledge-base.json` - per-build phase-stratified affix weights
//! - `knowledge-base.meta.json` - generation metadata and checksum
//! - `pipeline-report.json` - structured run report
//!
//! Output is only written once the whole run has finished.

pub mod report;
pub mod writer;

pub use report::render_summary;
pub use writer::{KnowledgeBaseWriter, WrittenArtifacts};

pub const KNOWLEDGE_BASE_FILE: &str = "knowledge-base.json";
pub const META_FILE: &str = "knowledge-base.meta.json";
pub const REPORT_FILE: &str = "pipeline-report.json";
