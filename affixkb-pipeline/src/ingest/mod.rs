//! Source ingesters
//!
//! Each ingester reads one file into a normalized `RawSource`. Parsing
//! only: no validation and no weight decisions.
//!
//! Dispatch is by extension: `.json` → planner export, `.xml` → loot
//! filter.

pub mod filter;
pub mod planner;

pub use filter::FilterIngester;
pub use planner::PlannerIngester;

use crate::error::IngestError;
use crate::types::{ContextValue, RawSource};
use serde_json::Value;
use std::path::Path;

/// Reads one source file
pub trait SourceIngester {
    fn ingest(&self, path: &Path) -> Result<RawSource, IngestError>;
}

/// Ingest a file with the ingester matching its extension
pub fn ingest_file(path: &Path) -> Result<RawSource, IngestError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "json" => PlannerIngester.ingest(path),
        "xml" => FilterIngester.ingest(path),
        _ => Err(IngestError::UnsupportedFormat(path.to_path_buf())),
    }
}

pub(crate) fn read_bytes(path: &Path) -> Result<Vec<u8>, IngestError> {
    std::fs::read(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// JSON scalar as a context string (`null`, objects and arrays excluded)
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// JSON value as a build-context entry
pub(crate) fn context_value(value: &Value) -> Option<ContextValue> {
    match value {
        Value::Array(items) => Some(ContextValue::List(
            items.iter().filter_map(scalar_text).collect(),
        )),
        other => scalar_text(other).map(ContextValue::Scalar),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_extension() {
        let err = ingest_file(Path::new("/tmp/build.yaml")).unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_context_value_shapes() {
        assert_eq!(
            context_value(&serde_json::json!("bow")),
            Some(ContextValue::Scalar("bow".into()))
        );
        assert_eq!(
            context_value(&serde_json::json!(true)),
            Some(ContextValue::Scalar("true".into()))
        );
        assert_eq!(
            context_value(&serde_json::json!(["cold", 3])),
            Some(ContextValue::List(vec!["cold".into(), "3".into()]))
        );
        assert_eq!(context_value(&serde_json::json!(null)), None);
    }
}
