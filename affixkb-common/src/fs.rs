//! Atomic file writes
//!
//! Content goes to a sibling `<name>.tmp` file first, which is then renamed
//! over the target. Readers never observe a half-written file.
//!
//! Several files can be staged together: every temp file is written before
//! the first rename, so a failed write leaves all targets untouched.

use crate::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Pretty JSON with a trailing newline
fn to_json_pretty_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// A group of files written to temp siblings and renamed into place on
/// `commit`. Temp files not committed are removed on drop.
#[derive(Debug, Default)]
pub struct StagedWrite {
    /// `(temp, target)` in staging order
    staged: Vec<(PathBuf, PathBuf)>,
}

impl StagedWrite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `contents` to the temp sibling of `path`.
    ///
    /// Missing parent directories are created.
    pub fn stage(&mut self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let temp_path = temp_path_for(path);
        if let Err(e) = std::fs::write(&temp_path, contents) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e.into());
        }
        debug!(path = %path.display(), bytes = contents.len(), "Staged file");
        self.staged.push((temp_path, path.to_path_buf()));
        Ok(())
    }

    /// Stage `value` as pretty JSON; returns the staged bytes
    pub fn stage_json<T: Serialize>(&mut self, path: &Path, value: &T) -> Result<Vec<u8>> {
        let bytes = to_json_pretty_bytes(value)?;
        self.stage(path, &bytes)?;
        Ok(bytes)
    }

    /// Rename every staged file over its target, in staging order
    pub fn commit(mut self) -> Result<()> {
        let staged = std::mem::take(&mut self.staged);
        for (i, (temp, target)) in staged.iter().enumerate() {
            if let Err(e) = std::fs::rename(temp, target) {
                // Targets already renamed stay in place
                for (rest, _) in &staged[i..] {
                    let _ = std::fs::remove_file(rest);
                }
                return Err(e.into());
            }
            debug!(path = %target.display(), "Committed file");
        }
        Ok(())
    }
}

impl Drop for StagedWrite {
    fn drop(&mut self) {
        for (temp, target) in &self.staged {
            if std::fs::remove_file(temp).is_ok() {
                warn!(path = %target.display(), "Discarded uncommitted staged file");
            }
        }
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
