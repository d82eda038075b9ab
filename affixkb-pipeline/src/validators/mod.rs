//! Source validation layer
//!
//! # Validators
//! 1. **source_validator** - hard rejection rules + soft quality scoring

pub mod source_validator;

pub use source_validator::SourceValidator;
