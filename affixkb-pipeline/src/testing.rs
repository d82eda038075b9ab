//! Fixture builders shared by unit tests

use crate::services::{AffixResolver, GameConstants};
use crate::types::{
    AffixId, BuildContext, Phase, RawSource, SourcePayload, Strictness, StrictnessMap, TierEntry,
};
use std::collections::{BTreeMap, BTreeSet};

/// Catalog with IDs `1..=count`, all plain names without damage keywords
pub fn catalog_json(count: u32) -> String {
    let entries: Vec<serde_json::Value> = (1..=count)
        .map(|id| {
            serde_json::json!({
                "affixId": id,
                "affixName": format!("Generic Affix {}", id),
                "affixDisplayName": format!("Generic {}", id),
            })
        })
        .collect();
    serde_json::json!({ "singleAffixes": entries }).to_string()
}

pub fn resolver(count: u32, constants: &GameConstants) -> AffixResolver {
    AffixResolver::from_catalog_json(&catalog_json(count), Some(constants), 0.85)
        .expect("test catalog")
}

/// Planner source with the given (affix, tier) entries per phase
pub fn planner_source(id: &str, phases: &[(Phase, Vec<(AffixId, u8)>)]) -> RawSource {
    let mut map: BTreeMap<Phase, Vec<TierEntry>> =
        Phase::ALL.iter().map(|p| (*p, Vec::new())).collect();
    for (phase, entries) in phases {
        map.insert(
            *phase,
            entries
                .iter()
                .map(|(affix_id, tier)| TierEntry {
                    affix_id: *affix_id,
                    tier: *tier,
                })
                .collect(),
        );
    }
    raw_source(
        id,
        SourcePayload::Planner {
            phases: map,
            out_of_range_ids: BTreeSet::new(),
        },
    )
}

/// Filter source with the given strictness levels, replicated to all phases
pub fn filter_source(id: &str, levels: &[(Strictness, Vec<AffixId>)]) -> RawSource {
    let map: StrictnessMap = levels
        .iter()
        .map(|(s, ids)| (*s, ids.iter().copied().collect::<BTreeSet<_>>()))
        .collect();
    let phases = Phase::ALL.iter().map(|p| (*p, map.clone())).collect();
    raw_source(id, SourcePayload::Filter { phases })
}

fn raw_source(id: &str, payload: SourcePayload) -> RawSource {
    RawSource {
        source_id: id.to_string(),
        build_slug: "test_build".to_string(),
        mastery: "shaman".to_string(),
        damage_types: vec!["cold".to_string()],
        archetype: "unknown".to_string(),
        payload,
        checksum: format!("checksum-{}", id),
        covered_masteries: vec!["shaman".to_string()],
        metadata: serde_json::Map::new(),
        context: BuildContext::new(),
    }
}
