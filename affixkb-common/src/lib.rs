//! # affixkb Common Library
//!
//! Shared code for the affixkb workspace:
//! - Error type used by every stage (`Error`, `Result`)
//! - Configuration file resolution and TOML loading
//! - Atomic file writes (temp file + rename)
//! - Content checksums and UTC timestamp formatting

pub mod config;
pub mod error;
pub mod fs;
pub mod hash;
pub mod time;

pub use error::{Error, Result};
