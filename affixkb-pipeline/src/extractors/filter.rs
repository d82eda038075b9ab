//! Filter strictness survival
//!
//! An affix's signal comes from the most restrictive strictness level it
//! still appears in. Filters calibrate categories; the absolute weight
//! signal is coarse and relies on the source's quality score to keep its
//! influence in check.

use super::WeightExtractor;
use crate::services::AffixResolver;
use crate::types::{
    AffixId, Category, DerivationMethod, ExtractedWeight, FilterStructureSignals, Phase,
    RawSource, SourcePayload, Strictness, StrictnessMap,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Category and weight signal for a strictness level
pub fn strictness_signal(strictness: Strictness) -> (Category, f64) {
    match strictness {
        Strictness::UberStrict => (Category::Essential, 95.0),
        Strictness::VeryStrict => (Category::Strong, 75.0),
        Strictness::Strict => (Category::Useful, 50.0),
        Strictness::Relaxed => (Category::Filler, 25.0),
        Strictness::ShowAll => (Category::Filler, 10.0),
    }
}

/// Filter data is phase-less; read the endgame copy, else starter
fn reference_levels(source: &RawSource) -> Option<&StrictnessMap> {
    let SourcePayload::Filter { phases } = &source.payload else {
        return None;
    };
    phases
        .get(&Phase::Endgame)
        .filter(|levels| levels.values().any(|ids| !ids.is_empty()))
        .or_else(|| phases.get(&Phase::Starter))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FilterWeightExtractor;

impl FilterWeightExtractor {
    /// Rule-structure summary for the run report; not used for weights
    pub fn rule_structure_signals(&self, source: &RawSource) -> Option<FilterStructureSignals> {
        let levels = reference_levels(source)?;
        let count = |s: Strictness| levels.get(&s).map_or(0, |ids| ids.len());

        Some(FilterStructureSignals {
            source_id: source.source_id.clone(),
            essential_count: count(Strictness::UberStrict),
            strong_count: count(Strictness::VeryStrict),
            useful_count: count(Strictness::Strict),
            filler_count: count(Strictness::Relaxed) + count(Strictness::ShowAll),
            strictness_levels: Strictness::ORDERED
                .iter()
                .copied()
                .filter(|s| count(*s) > 0)
                .collect(),
        })
    }
}

impl WeightExtractor for FilterWeightExtractor {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn extract(&self, source: &RawSource, resolver: &AffixResolver) -> Vec<ExtractedWeight> {
        let Some(levels) = reference_levels(source) else {
            return Vec::new();
        };

        let mut best: BTreeMap<AffixId, Strictness> = BTreeMap::new();
        for strictness in Strictness::ORDERED {
            let Some(ids) = levels.get(&strictness) else { continue };
            for &affix_id in ids {
                if resolver.is_threshold(affix_id) {
                    continue;
                }
                if resolver.resolve_id(affix_id).is_none() {
                    debug!(affix_id, source_id = %source.source_id, "Skipping unknown affix");
                    continue;
                }
                best.entry(affix_id).or_insert(strictness);
            }
        }

        let results: Vec<ExtractedWeight> = best
            .iter()
            .flat_map(|(affix_id, strictness)| {
                let (category, weight) = strictness_signal(*strictness);
                Phase::ALL.iter().map(move |phase| ExtractedWeight {
                    affix_id: *affix_id,
                    phase: *phase,
                    weight,
                    min_tier: None,
                    category,
                    derivation: DerivationMethod::StrictnessSurvival,
                    source_id: source.source_id.clone(),
                })
            })
            .collect();

        debug!(source_id = %source.source_id, weights = results.len(), "Filter weights extracted");
        results
    }
}
