//! Affix relationship graph
//!
//! Static SYNERGY and PREREQUISITE edges between affixes, loaded once from
//! the game constants. Propagation runs after inheritance merging:
//!
//! 1. SYNERGY: affixes weighted above the trigger boost their neighbours
//!    by `strength × boost_per_strength` (capped at 100)
//! 2. PREREQUISITE: an affix whose prerequisite condition fails against the
//!    build context is zeroed
//!
//! The graph only adds or zeroes; it never rescales a data-backed weight.

pub mod condition;

pub use condition::{evaluate_condition, Condition};

use crate::types::{AffixEdge, AffixId, BuildContext, EdgeType, WeightMap};
use std::collections::BTreeMap;
use tracing::debug;

/// Directed affix graph with adjacency keyed by source affix
#[derive(Debug, Clone, Default)]
pub struct AffixGraph {
    outgoing: BTreeMap<AffixId, Vec<AffixEdge>>,
    edge_count: usize,
}

impl AffixGraph {
    pub fn new(edges: &[AffixEdge]) -> Self {
        let mut outgoing: BTreeMap<AffixId, Vec<AffixEdge>> = BTreeMap::new();
        for edge in edges {
            outgoing.entry(edge.from_id).or_default().push(edge.clone());
        }
        debug!(nodes = outgoing.len(), edges = edges.len(), "Affix graph loaded");
        Self {
            outgoing,
            edge_count: edges.len(),
        }
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    fn edges_of(&self, affix_id: AffixId, edge_type: EdgeType) -> impl Iterator<Item = &AffixEdge> {
        self.outgoing
            .get(&affix_id)
            .into_iter()
            .flatten()
            .filter(move |e| e.edge_type == edge_type)
    }

    /// One propagation pass. Returns a new map; `weights` is not modified.
    pub fn propagate_weights(
        &self,
        weights: &WeightMap,
        context: &BuildContext,
        synergy_trigger: f64,
        boost_per_strength: f64,
    ) -> WeightMap {
        let mut result = weights.clone();

        // Triggers come from the input map, so boosts never chain
        for (&affix_id, &weight) in weights {
            if weight <= synergy_trigger {
                continue;
            }
            for edge in self.edges_of(affix_id, EdgeType::Synergy) {
                let boost = edge.strength * boost_per_strength;
                let entry = result.entry(edge.to_id).or_insert(0.0);
                *entry = (*entry + boost).min(100.0);
                debug!(from = affix_id, to = edge.to_id, boost, strength = edge.strength, "Synergy boost");
            }
        }

        let affected: Vec<AffixId> = result.keys().copied().collect();
        for affix_id in affected {
            let failing = self
                .edges_of(affix_id, EdgeType::Prerequisite)
                .find(|edge| !evaluate_condition(edge.condition.as_deref(), context));
            if let Some(edge) = failing {
                debug!(affix_id, condition = ?edge.condition, "Prerequisite unmet, zeroing");
                result.insert(affix_id, 0.0);
            }
        }

        result
    }
}
