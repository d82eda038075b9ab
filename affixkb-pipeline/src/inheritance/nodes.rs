//! Inheritance layers
//!
//! Each layer yields a complete affix → weight map on its own. Layers are
//! merged bottom-up with `max(existing, new)`, so a more specific layer can
//! raise a weight but never lower one.

use crate::types::{AffixId, LayerKind, WeightMap};
use tracing::debug;

/// One layer of the inheritance chain, least specific first
#[derive(Debug, Clone, PartialEq)]
pub enum InheritanceLayer {
    /// Floor shared by every build (health, vitality, movement speed)
    UniversalBaseline { weights: WeightMap },
    /// Primary and synergy affixes of one damage type
    DamageType {
        damage_type: String,
        primary_ids: Vec<AffixId>,
        synergy_ids: Vec<AffixId>,
        primary_weight: f64,
        synergy_weight: f64,
    },
    /// Class affinity. Marks class-level resolution; carries no weights.
    Class { base_class: String },
    /// Signature affixes of the mastery
    Mastery {
        mastery: String,
        primary_ids: Vec<AffixId>,
        weight: f64,
    },
    /// Data-backed weights flattened from consensus
    BuildOverride { weights: WeightMap },
}

impl InheritanceLayer {
    /// Layer kind recorded as `data_source_layer` when this is the top layer
    pub fn kind(&self) -> LayerKind {
        match self {
            InheritanceLayer::UniversalBaseline { .. } => LayerKind::Baseline,
            InheritanceLayer::DamageType { .. } => LayerKind::DamageType,
            InheritanceLayer::Class { .. } => LayerKind::Class,
            InheritanceLayer::Mastery { .. } => LayerKind::Mastery,
            InheritanceLayer::BuildOverride { .. } => LayerKind::Specific,
        }
    }

    /// Damage type, class or mastery the layer was built for
    pub fn subject(&self) -> &str {
        match self {
            InheritanceLayer::DamageType { damage_type, .. } => damage_type,
            InheritanceLayer::Class { base_class } => base_class,
            InheritanceLayer::Mastery { mastery, .. } => mastery,
            InheritanceLayer::UniversalBaseline { .. } | InheritanceLayer::BuildOverride { .. } => "",
        }
    }

    pub fn resolve(&self) -> WeightMap {
        match self {
            InheritanceLayer::UniversalBaseline { weights }
            | InheritanceLayer::BuildOverride { weights } => weights.clone(),
            InheritanceLayer::DamageType {
                primary_ids,
                synergy_ids,
                primary_weight,
                synergy_weight,
                ..
            } => {
                let mut result: WeightMap =
                    primary_ids.iter().map(|id| (*id, *primary_weight)).collect();
                for id in synergy_ids {
                    result.entry(*id).or_insert(*synergy_weight);
                }
                result
            }
            InheritanceLayer::Class { .. } => WeightMap::new(),
            InheritanceLayer::Mastery {
                primary_ids,
                weight,
                ..
            } => primary_ids.iter().map(|id| (*id, *weight)).collect(),
        }
    }

    /// Merge this layer over `weights`, keeping the higher value per affix.
    /// Returns a new map.
    pub fn merge_into(&self, weights: &WeightMap) -> WeightMap {
        let mut result = weights.clone();
        for (affix_id, weight) in self.resolve() {
            let entry = result.entry(affix_id).or_insert(0.0);
            *entry = entry.max(weight);
        }
        debug!(
            layer = self.kind().as_str(),
            subject = self.subject(),
            affixes = result.len(),
            "Layer merged"
        );
        result
    }
}
