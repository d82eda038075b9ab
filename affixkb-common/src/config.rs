//! Configuration file resolution and TOML loading

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "AFFIXKB_CONFIG";

/// Config file name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "affixkb.toml";

/// Config file path resolution in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. `./affixkb.toml` in the working directory
/// 4. `<user config dir>/affixkb/config.toml`
///
/// Returns `None` when no candidate applies; callers fall back to
/// compiled defaults.
///
/// CLI and ENV paths are returned even if the file does not exist, so that
/// a typo surfaces as a load error instead of being silently ignored.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: working directory
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    // Priority 4: per-user config directory
    user_config_file().filter(|p| p.is_file())
}

/// `<config dir>/affixkb/config.toml` for the current platform
pub fn user_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("affixkb").join("config.toml"))
}

/// Parse a TOML file into `T`
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    let parsed = toml::from_str(&content)?;
    debug!(path = %path.display(), "Loaded TOML config");
    Ok(parsed)
}

/// Load `T` from the resolved path, or `T::default()` when no file applies.
///
/// A path that was resolved but cannot be read or parsed is an error.
pub fn load_or_default<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
    match path {
        Some(p) => load_toml(p),
        None => {
            warn!("No config file found, using built-in defaults");
            Ok(T::default())
        }
    }
}
