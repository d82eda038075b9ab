//! Test Helper Utilities
//!
//! Builds a throwaway data directory laid out like the real one:
//!
//! ```text
//! <root>/mappings/affixes.json
//! <root>/mappings/game-constants.json
//! <root>/sources/planners/normalized/*.json
//! <root>/sources/filters/*.xml
//! <root>/weights/            (output)
//! ```

#![allow(dead_code)]

use affixkb_pipeline::PipelineConfig;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Affixes in the test catalog: 1-3 baseline names, 4-40 generic
pub const CATALOG_SIZE: u32 = 40;

/// Primary affixes of the `cold` damage profile
pub const COLD_PRIMARIES: [u32; 2] = [10, 11];

/// Synergy affix of the `cold` damage profile
pub const COLD_SYNERGY: u32 = 12;

/// Threshold (resistance) affixes
pub const THRESHOLD_IDS: [u32; 2] = [39, 40];

pub struct TestData {
    dir: TempDir,
}

impl TestData {
    /// Data directory with catalog and game constants in place
    pub fn new() -> Self {
        let data = Self {
            dir: TempDir::new().expect("temp dir"),
        };
        data.write("mappings/affixes.json", &catalog_json().to_string());
        data.write("mappings/game-constants.json", &constants_json().to_string());
        data
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root().join("weights")
    }

    /// Default config pointed at this directory
    pub fn config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.paths.data_dir = self.root().to_path_buf();
        config
    }

    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture dir");
        }
        std::fs::write(&path, contents).expect("write fixture");
        path
    }

    pub fn write_planner(&self, file_stem: &str, planner: &Value) -> PathBuf {
        self.write(
            &format!("sources/planners/normalized/{}.json", file_stem),
            &serde_json::to_string_pretty(planner).expect("serialize planner"),
        )
    }

    pub fn write_filter(&self, file_stem: &str, xml: &str) -> PathBuf {
        self.write(&format!("sources/filters/{}.xml", file_stem), xml)
    }

    pub fn read_json(&self, relative: &str) -> Value {
        let text = std::fs::read_to_string(self.root().join(relative)).expect("read output");
        serde_json::from_str(&text).expect("parse output")
    }
}

pub fn catalog_json() -> Value {
    let mut entries = vec![
        json!({"affixId": 1, "affixName": "Added Health", "affixDisplayName": "Health"}),
        json!({"affixId": 2, "affixName": "Added Vitality", "affixDisplayName": "Vitality"}),
        json!({"affixId": 3, "affixName": "Movement Speed", "affixDisplayName": "Move Speed"}),
    ];
    for id in 4..=CATALOG_SIZE {
        entries.push(json!({
            "affixId": id,
            "affixName": format!("Generic Affix {}", id),
            "affixDisplayName": format!("Generic {}", id),
        }));
    }
    json!({ "singleAffixes": entries })
}

pub fn constants_json() -> Value {
    json!({
        "class_hierarchy": {
            "shaman": {"baseClass": "shaman", "masteries": ["druid", "beastmaster", "shaman"], "label": "Shaman"}
        },
        "mastery_to_class": {"shaman": "shaman", "druid": "shaman", "beastmaster": "shaman"},
        "damage_type_profiles": {
            "cold": {"primaryAffixIds": COLD_PRIMARIES, "synergyAffixIds": [COLD_SYNERGY]}
        },
        "threshold_affix_ids": THRESHOLD_IDS,
        "affix_edges": [
            {"from": 30, "to": 31, "type": "SYNERGY", "strength": 1.0}
        ]
    })
}

/// Planner export with `(affix_id, tier)` entries per phase name
pub fn planner_json(slug: &str, mastery: &str, phases: &[(&str, Vec<(u32, u8)>)]) -> Value {
    let mut phase_map = serde_json::Map::new();
    for phase in ["starter", "endgame", "aspirational"] {
        phase_map.insert(phase.to_string(), json!({"affixes": []}));
    }
    for (phase, entries) in phases {
        let affixes: Vec<Value> = entries
            .iter()
            .map(|(id, tier)| json!({"affix_id": id, "tier": tier}))
            .collect();
        phase_map.insert(phase.to_string(), json!({ "affixes": affixes }));
    }
    json!({
        "build_slug": slug,
        "mastery": mastery,
        "damage_types": ["cold"],
        "archetype": "melee",
        "phases": phase_map,
    })
}

/// A planner that passes validation: generic IDs 13-27 at tier 3 in the
/// starter phase plus affix 30 at tier 7 in every phase
pub fn valid_planner(slug: &str) -> Value {
    let mut starter: Vec<(u32, u8)> = (13..=27).map(|id| (id, 3)).collect();
    starter.push((30, 7));
    planner_json(
        slug,
        "shaman",
        &[
            ("starter", starter),
            ("endgame", vec![(30, 7), (20, 5)]),
            ("aspirational", vec![(30, 7)]),
        ],
    )
}

/// Loot filter XML with one rule block per `(strictness, ids)`
pub fn filter_xml(mastery: &str, blocks: &[(&str, Vec<u32>)]) -> String {
    let mut body = String::new();
    for (strictness, ids) in blocks {
        body.push_str(&format!("  <RuleBlock strictness=\"{}\">\n", strictness));
        for id in ids {
            body.push_str(&format!(
                "    <Rule><Condition type=\"AffixId\" value=\"{}\"/></Rule>\n",
                id
            ));
        }
        body.push_str("  </RuleBlock>\n");
    }
    format!(
        "<?xml version=\"1.0\"?>\n<LootFilter version=\"2\" mastery=\"{}\" damage_type=\"cold\">\n{}</LootFilter>\n",
        mastery, body
    )
}
