//! Planner tier translation
//!
//! For every affix: take the highest tier seen in each phase, classify the
//! phase-presence pattern, then translate tier → weight as
//! `min(100, band midpoint × pattern multiplier)`.
//!
//! | Pattern        | Phases present          | Multiplier |
//! |----------------|-------------------------|------------|
//! | `all_phases`   | starter+endgame+aspir.  | 1.0        |
//! | `bis_only`     | aspirational            | 1.0        |
//! | `starter_only` | starter                 | 0.8        |
//! | `middle_only`  | anything else           | 0.85       |

use super::WeightExtractor;
use crate::config::{PhaseMultipliers, TierWeightRanges};
use crate::services::AffixResolver;
use crate::types::{
    round_to, AffixId, Category, DerivationMethod, ExtractedWeight, Phase, RawSource,
    SourcePayload,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Phase-presence pattern of one affix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhasePattern {
    AllPhases,
    BisOnly,
    StarterOnly,
    MiddleOnly,
}

impl PhasePattern {
    pub fn classify(phases: &BTreeMap<Phase, u8>) -> Self {
        let has = |p: Phase| phases.contains_key(&p);
        if Phase::ALL.iter().all(|p| has(*p)) {
            PhasePattern::AllPhases
        } else if phases.len() == 1 && has(Phase::Aspirational) {
            PhasePattern::BisOnly
        } else if phases.len() == 1 && has(Phase::Starter) {
            PhasePattern::StarterOnly
        } else {
            PhasePattern::MiddleOnly
        }
    }

    pub fn multiplier(&self, multipliers: &PhaseMultipliers) -> f64 {
        match self {
            PhasePattern::AllPhases => multipliers.all_phases,
            PhasePattern::BisOnly => multipliers.bis_only,
            PhasePattern::StarterOnly => multipliers.starter_only,
            PhasePattern::MiddleOnly => multipliers.middle_only,
        }
    }
}

/// Derives absolute weights from planner tiers
#[derive(Debug, Clone, Default)]
pub struct PlannerWeightExtractor {
    tier_weights: TierWeightRanges,
    multipliers: PhaseMultipliers,
}

impl PlannerWeightExtractor {
    pub fn new(tier_weights: TierWeightRanges, multipliers: PhaseMultipliers) -> Self {
        Self {
            tier_weights,
            multipliers,
        }
    }

    fn weight_for(&self, tier: u8, pattern: PhasePattern) -> f64 {
        let midpoint = self.tier_weights.range_for(tier).midpoint();
        round_to((midpoint * pattern.multiplier(&self.multipliers)).min(100.0), 2)
    }
}

impl WeightExtractor for PlannerWeightExtractor {
    fn name(&self) -> &'static str {
        "planner"
    }

    fn extract(&self, source: &RawSource, resolver: &AffixResolver) -> Vec<ExtractedWeight> {
        let SourcePayload::Planner { phases, .. } = &source.payload else {
            return Vec::new();
        };

        // affix → phase → max tier
        let mut tiers: BTreeMap<AffixId, BTreeMap<Phase, u8>> = BTreeMap::new();
        for (phase, entries) in phases {
            for entry in entries {
                if resolver.is_threshold(entry.affix_id) {
                    continue;
                }
                if resolver.resolve_id(entry.affix_id).is_none() {
                    debug!(affix_id = entry.affix_id, source_id = %source.source_id, "Skipping unknown affix");
                    continue;
                }
                let best = tiers
                    .entry(entry.affix_id)
                    .or_default()
                    .entry(*phase)
                    .or_insert(entry.tier);
                *best = (*best).max(entry.tier);
            }
        }

        let mut results = Vec::new();
        for (affix_id, phase_tiers) in &tiers {
            let pattern = PhasePattern::classify(phase_tiers);
            for (phase, tier) in phase_tiers {
                results.push(ExtractedWeight {
                    affix_id: *affix_id,
                    phase: *phase,
                    weight: self.weight_for(*tier, pattern),
                    min_tier: Some(*tier),
                    category: Category::from_tier(*tier),
                    derivation: DerivationMethod::TierTranslation,
                    source_id: source.source_id.clone(),
                });
            }
        }

        debug!(
            source_id = %source.source_id,
            affixes = tiers.len(),
            weights = results.len(),
            "Planner weights extracted"
        );
        results
    }
}
