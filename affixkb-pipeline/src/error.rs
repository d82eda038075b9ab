//! Error types for affixkb-pipeline
//!
//! Three severities:
//! - `IngestError`: one file could not be read; the file is skipped
//! - `Rejection`: a source was read but failed the quality gate
//! - `PipelineError`: one build could not be processed; the run continues
//!
//! Fatal startup failures (catalog, game constants) surface as
//! `affixkb_common::Error`.

use std::path::PathBuf;
use thiserror::Error;

/// Failure reading a single source file
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Not valid JSON/XML, or structurally wrong
    #[error("Parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Required identity field absent or empty
    #[error("Missing required field '{field}' in {path}")]
    MissingField { path: PathBuf, field: String },

    #[error("Unsupported source format: {0}")]
    UnsupportedFormat(PathBuf),
}

impl IngestError {
    pub fn parse(path: &std::path::Path, message: impl Into<String>) -> Self {
        IngestError::Parse {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn missing(path: &std::path::Path, field: &str) -> Self {
        IngestError::MissingField {
            path: path.to_path_buf(),
            field: field.to_string(),
        }
    }
}

/// Hard rejection by the source validator. `Display` is the report reason.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("Too few unique affix IDs: {count} < {minimum}")]
    TooSparse { count: usize, minimum: usize },

    #[error("Contains {} unknown affix ID(s): {}", .count, format_id_sample(.sample, .count))]
    UnknownAffixes { count: usize, sample: Vec<i64> },

    #[error("No phase differentiation: {0}")]
    NoPhaseDifferentiation(String),

    #[error("Duplicate content (checksum {0} already seen)")]
    Duplicate(String),
}

fn format_id_sample(sample: &[i64], count: &usize) -> String {
    let ids = sample
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    if *count > sample.len() {
        format!("[{}]...", ids)
    } else {
        format!("[{}]", ids)
    }
}

/// Build-level failure
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No sources could be ingested")]
    NoSources,
}

/// Result type for build-level operations
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_reason_mentions_count() {
        let r = Rejection::TooSparse { count: 9, minimum: 15 };
        assert_eq!(r.to_string(), "Too few unique affix IDs: 9 < 15");
    }

    #[test]
    fn test_unknown_affixes_sample_truncation_marker() {
        let r = Rejection::UnknownAffixes {
            count: 7,
            sample: vec![1, 2, 3, 4, 5],
        };
        assert_eq!(
            r.to_string(),
            "Contains 7 unknown affix ID(s): [1, 2, 3, 4, 5]..."
        );

        let r = Rejection::UnknownAffixes {
            count: 1,
            sample: vec![9999],
        };
        assert_eq!(r.to_string(), "Contains 1 unknown affix ID(s): [9999]");
    }
}
