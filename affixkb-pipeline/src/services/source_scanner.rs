//! Build source discovery
//!
//! Groups source files by build slug:
//! - planner exports: `<planners_dir>/<slug>.json`
//! - loot filters: `<filters_dir>/<slug>[_<strictness>].xml`, attached
//!   only to slugs that already have a planner export
//!
//! Directories are scanned one level deep; files are taken in name order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Planner files that are tooling output, not build exports
const IGNORED_PLANNER_FILES: &[&str] = &["normalization-report.json", "planner-warnings.json"];

/// Strictness suffixes stripped from filter stems, longest first
const STRICTNESS_SUFFIXES: &[&str] = &[
    "_very_strict",
    "_uber_strict",
    "_giga_strict",
    "_regular",
    "_relaxed",
    "_strict",
    "_normal",
];

/// Slug → source files (planners first, then filters)
pub type BuildSources = BTreeMap<String, Vec<PathBuf>>;

/// Parent build slug of a filter file stem
pub fn filter_slug(stem: &str) -> &str {
    STRICTNESS_SUFFIXES
        .iter()
        .find_map(|suffix| stem.strip_suffix(suffix))
        .filter(|slug| !slug.is_empty())
        .unwrap_or(stem)
}

/// Non-empty regular files with `extension`, sorted by name
fn list_files(dir: &Path, extension: &str) -> Vec<PathBuf> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "Source directory not found");
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Error accessing entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        })
        .filter(|entry| entry.metadata().map(|m| m.len() > 0).unwrap_or(false))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

fn stem_of(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}

/// Discover planner and filter sources grouped by build slug
pub fn discover_builds(planners_dir: &Path, filters_dir: &Path) -> BuildSources {
    let mut builds = BuildSources::new();

    for path in list_files(planners_dir, "json") {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if IGNORED_PLANNER_FILES.contains(&file_name.as_str()) {
            continue;
        }
        if let Some(slug) = stem_of(&path) {
            builds.entry(slug).or_default().push(path);
        }
    }

    for path in list_files(filters_dir, "xml") {
        let Some(stem) = stem_of(&path) else { continue };
        let slug = filter_slug(&stem);
        match builds.get_mut(slug) {
            Some(files) => files.push(path),
            None => debug!(slug, file = %path.display(), "Filter has no planner source, skipping"),
        }
    }

    debug!(builds = builds.len(), "Discovered build sources");
    builds
}
