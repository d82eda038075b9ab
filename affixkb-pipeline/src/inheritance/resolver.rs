//! Inheritance chain walk
//!
//! Produces a complete `BuildKnowledgeProfile` from whatever data exists
//! for a build: baseline → damage type → class → mastery → build override,
//! then one graph propagation pass and threshold removal.

use super::nodes::InheritanceLayer;
use crate::config::{GraphConfig, InheritanceConfig, PipelineConfig};
use crate::graph::AffixGraph;
use crate::services::{AffixResolver, GameConstants};
use crate::types::{
    round_to, AffixId, AffixWeight, BuildContext, BuildKnowledgeProfile, Category,
    ConfidenceLabel, ConsensusByPhase, ConsensusWeight, ContextValue, LayerKind, Phase,
    RawSource, WeightMap,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Keyword fallbacks for baseline keys, tried against catalog names
const BASELINE_KEYWORDS: &[(&str, &[&str])] = &[
    ("added_health", &["added health", "health"]),
    ("added_vitality", &["vitality", "added vitality"]),
    ("movement_speed", &["movement speed", "move speed"]),
];

/// Sources needed alongside a data-backed layer for a `high` label
const HIGH_CONFIDENCE_SOURCES: usize = 3;

/// Confidence attached to every pure-inheritance entry
const INHERITED_ENTRY_CONFIDENCE: f64 = 0.5;

/// Who a build is: the fields inheritance keys on
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildIdentity {
    pub slug: String,
    pub mastery: String,
    pub damage_types: Vec<String>,
    pub archetype: String,
    /// Equipment and playstyle flags from the sources
    pub context: BuildContext,
}

impl BuildIdentity {
    /// Identity from a build's ingested sources. The first source supplies
    /// mastery, damage types and archetype; context flags are merged, first
    /// source wins on conflicts.
    pub fn from_sources<'a>(
        slug: &str,
        sources: impl IntoIterator<Item = &'a RawSource>,
    ) -> Option<Self> {
        let mut sources = sources.into_iter();
        let first = sources.next()?;
        let mut context = first.context.clone();
        for source in sources {
            for (key, value) in &source.context {
                context.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
        Some(Self {
            slug: slug.to_string(),
            mastery: first.mastery.clone(),
            damage_types: first.damage_types.clone(),
            archetype: first.archetype.clone(),
            context,
        })
    }

    /// Primary damage type, empty when unknown
    pub fn primary_damage_type(&self) -> &str {
        self.damage_types.first().map(String::as_str).unwrap_or("")
    }
}

/// Walks the inheritance chain for one build at a time
#[derive(Debug)]
pub struct InheritanceResolver {
    constants: GameConstants,
    graph: AffixGraph,
    weights: InheritanceConfig,
    graph_settings: GraphConfig,
    /// Baseline key → resolved affix; unresolved keys are absent
    baseline_ids: BTreeMap<String, AffixId>,
}

impl InheritanceResolver {
    pub fn new(constants: GameConstants, affixes: &AffixResolver, config: &PipelineConfig) -> Self {
        let graph = AffixGraph::new(&constants.affix_edges);
        let baseline_ids = resolve_baseline_ids(
            affixes,
            config.inheritance.universal_baseline_weights.keys(),
        );
        Self {
            constants,
            graph,
            weights: config.inheritance.clone(),
            graph_settings: config.graph.clone(),
            baseline_ids,
        }
    }

    pub fn graph(&self) -> &AffixGraph {
        &self.graph
    }

    /// Layers 0-3 that apply to this build, in merge order
    fn static_layers(&self, identity: &BuildIdentity) -> Vec<InheritanceLayer> {
        let baseline: WeightMap = self
            .weights
            .universal_baseline_weights
            .iter()
            .filter_map(|(key, weight)| self.baseline_ids.get(key).map(|id| (*id, *weight)))
            .collect();
        let mut layers = vec![InheritanceLayer::UniversalBaseline { weights: baseline }];

        let mut mastery_primaries: Vec<AffixId> = Vec::new();
        for damage_type in &identity.damage_types {
            let Some(profile) = self.constants.damage_type_profiles.get(damage_type) else {
                debug!(build = %identity.slug, damage_type = %damage_type, "No damage type profile");
                continue;
            };
            mastery_primaries.extend(profile.primary_affix_ids.iter().copied());
            layers.push(InheritanceLayer::DamageType {
                damage_type: damage_type.clone(),
                primary_ids: profile.primary_affix_ids.clone(),
                synergy_ids: profile.synergy_affix_ids.clone(),
                primary_weight: self.weights.damage_primary_weight,
                synergy_weight: self.weights.damage_synergy_weight,
            });
        }

        if let Some((base_class, _)) = self.constants.base_class_profile(&identity.mastery) {
            layers.push(InheritanceLayer::Class {
                base_class: base_class.to_string(),
            });
        }

        if !mastery_primaries.is_empty() {
            layers.push(InheritanceLayer::Mastery {
                mastery: identity.mastery.clone(),
                primary_ids: mastery_primaries,
                weight: self.weights.mastery_primary_weight,
            });
        }

        layers
    }

    /// Layer 0-3 weights without override or propagation
    pub fn inherited_weights(&self, identity: &BuildIdentity) -> WeightMap {
        self.static_layers(identity)
            .iter()
            .fold(WeightMap::new(), |acc, layer| layer.merge_into(&acc))
    }

    /// Context the graph's prerequisite conditions are evaluated against
    pub fn build_context(&self, identity: &BuildIdentity) -> BuildContext {
        let mut context = identity.context.clone();
        let mut core = |key: &str, value: ContextValue| {
            context.insert(key.to_string(), value);
        };
        core("mastery", ContextValue::Scalar(identity.mastery.clone()));
        core("archetype", ContextValue::Scalar(identity.archetype.clone()));
        core("damage_types", ContextValue::List(identity.damage_types.clone()));
        if let Some(base_class) = self.constants.mastery_to_class.get(&identity.mastery) {
            core("base_class", ContextValue::Scalar(base_class.clone()));
        }
        context
    }

    /// Resolve the full chain. `consensus` is `None` for builds with no
    /// accepted source.
    pub fn resolve(
        &self,
        identity: &BuildIdentity,
        consensus: Option<&ConsensusByPhase>,
        source_count: usize,
    ) -> BuildKnowledgeProfile {
        let mut layers = self.static_layers(identity);

        if let Some(by_phase) = consensus {
            let flat = flatten_consensus(by_phase);
            if !flat.is_empty() {
                layers.push(InheritanceLayer::BuildOverride { weights: flat });
            }
        }

        let layer = layers
            .iter()
            .map(InheritanceLayer::kind)
            .max()
            .unwrap_or(LayerKind::Baseline);
        let merged = layers
            .iter()
            .fold(WeightMap::new(), |acc, l| l.merge_into(&acc));

        let context = self.build_context(identity);
        let mut weights = self.graph.propagate_weights(
            &merged,
            &context,
            self.graph_settings.synergy_trigger,
            self.graph_settings.synergy_boost_per_strength,
        );
        weights.retain(|id, _| !self.constants.threshold_affix_ids.contains(id));

        let phases = match consensus {
            Some(by_phase) => self.consensus_phases(by_phase),
            None => inherited_phases(&weights),
        };

        let confidence = confidence_label(layer, source_count);
        debug!(
            build = %identity.slug,
            layer = layer.as_str(),
            specificity = layer.specificity(),
            sources = source_count,
            affixes = weights.len(),
            "Inheritance resolved"
        );

        BuildKnowledgeProfile {
            build_slug: identity.slug.clone(),
            mastery: identity.mastery.clone(),
            damage_type: identity.primary_damage_type().to_string(),
            damage_types: identity.damage_types.clone(),
            specificity_score: round_to(layer.specificity(), 4),
            source_count,
            confidence,
            data_source_layer: layer,
            phases,
        }
    }

    fn consensus_phases(&self, by_phase: &ConsensusByPhase) -> BTreeMap<Phase, Vec<AffixWeight>> {
        Phase::ALL
            .iter()
            .map(|phase| {
                let mut entries: Vec<AffixWeight> = by_phase
                    .get(phase)
                    .into_iter()
                    .flatten()
                    .filter(|cw| !self.constants.threshold_affix_ids.contains(&cw.affix_id))
                    .map(affix_weight_from_consensus)
                    .collect();
                sort_entries(&mut entries);
                (*phase, entries)
            })
            .collect()
    }
}

/// Resolve each baseline key to an affix ID: name lookup first, then
/// keyword substring search in ascending ID order
fn resolve_baseline_ids<'a>(
    affixes: &AffixResolver,
    keys: impl Iterator<Item = &'a String>,
) -> BTreeMap<String, AffixId> {
    let mut resolved = BTreeMap::new();
    for key in keys {
        let spaced = key.replace('_', " ");
        let by_name = affixes.resolve_name(&spaced).map(|def| def.affix_id);

        let keywords: Vec<&str> = BASELINE_KEYWORDS
            .iter()
            .find(|(k, _)| *k == key.as_str())
            .map(|(_, words)| words.to_vec())
            .unwrap_or_else(|| vec![spaced.as_str()]);
        let by_keyword = || {
            affixes.definitions().find_map(|def| {
                let name = def.name.to_lowercase();
                keywords
                    .iter()
                    .any(|kw| name.contains(kw))
                    .then_some(def.affix_id)
            })
        };

        match by_name.or_else(by_keyword) {
            Some(affix_id) => {
                debug!(key = %key, affix_id, "Baseline affix resolved");
                resolved.insert(key.clone(), affix_id);
            }
            None => warn!(key = %key, "No catalog affix for baseline key"),
        }
    }
    resolved
}

/// Affix → max weight across all phases
fn flatten_consensus(by_phase: &ConsensusByPhase) -> WeightMap {
    let mut flat = WeightMap::new();
    for cw in by_phase.values().flatten() {
        let entry = flat.entry(cw.affix_id).or_insert(0.0);
        *entry = entry.max(cw.weight);
    }
    flat
}

fn affix_weight_from_consensus(cw: &ConsensusWeight) -> AffixWeight {
    AffixWeight {
        id: cw.affix_id,
        weight: round_to(cw.weight, 2),
        category: cw.category,
        min_tier: cw.min_tier.unwrap_or(1),
        consensus_spread: round_to(cw.consensus_spread, 4),
        confidence: round_to(cw.confidence, 4),
    }
}

/// Same list in every phase, from the merged map
fn inherited_phases(weights: &WeightMap) -> BTreeMap<Phase, Vec<AffixWeight>> {
    let mut entries: Vec<AffixWeight> = weights
        .iter()
        .filter(|(_, w)| **w > 0.0)
        .map(|(id, w)| AffixWeight {
            id: *id,
            weight: round_to(*w, 2),
            category: Category::from_weight(*w),
            min_tier: 1,
            consensus_spread: 0.0,
            confidence: INHERITED_ENTRY_CONFIDENCE,
        })
        .collect();
    sort_entries(&mut entries);
    Phase::ALL.iter().map(|p| (*p, entries.clone())).collect()
}

/// Weight descending, then ID ascending
fn sort_entries(entries: &mut [AffixWeight]) {
    entries.sort_by(|a, b| b.weight.total_cmp(&a.weight).then(a.id.cmp(&b.id)));
}

pub fn confidence_label(layer: LayerKind, source_count: usize) -> ConfidenceLabel {
    if source_count == 0 {
        ConfidenceLabel::Low
    } else if layer == LayerKind::Specific && source_count >= HIGH_CONFIDENCE_SOURCES {
        ConfidenceLabel::High
    } else if source_count >= 2 {
        ConfidenceLabel::Medium
    } else {
        ConfidenceLabel::Low
    }
}

/// IDs present in any phase of a profile
pub fn profile_affix_ids(profile: &BuildKnowledgeProfile) -> BTreeSet<AffixId> {
    profile
        .phases
        .values()
        .flatten()
        .map(|aw| aw.id)
        .collect()
}
