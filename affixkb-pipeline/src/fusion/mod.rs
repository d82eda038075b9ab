//! Fusion layer: multi-source weight consensus
//!
//! Extractors produce per-source observations; the consensus engine fuses
//! them into one weight per (affix, phase) for a build.

pub mod consensus_engine;

pub use consensus_engine::{group_by_phase, ConsensusEngine};
