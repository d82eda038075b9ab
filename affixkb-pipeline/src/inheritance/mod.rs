//! Inheritance resolution
//!
//! Every build gets a complete profile regardless of how much scraped data
//! exists for it. Weights are layered from generic to specific:
//!
//! 0. universal baseline
//! 1. damage type profile(s)
//! 2. class profile
//! 3. mastery signature affixes
//! 4. build override (consensus data, when present)
//!
//! followed by one affix-graph propagation pass.

pub mod nodes;
pub mod resolver;

pub use nodes::InheritanceLayer;
pub use resolver::{confidence_label, BuildIdentity, InheritanceResolver};
