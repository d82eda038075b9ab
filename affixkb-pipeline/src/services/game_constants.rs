//! Static game knowledge loaded from `game-constants.json`
//!
//! Class hierarchy, mastery → class map, damage-type affix profiles,
//! threshold affixes, manual damage-type overrides and the affix
//! relationship edges. Every section is optional.
//!
//! Loaded once before any build is processed and shared by reference.

use crate::types::{AffixEdge, AffixId, EdgeType};
use affixkb_common::{Error, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{info, warn};

/// One base class and its masteries
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClassProfile {
    pub base_class: String,
    pub masteries: Vec<String>,
    pub exclusive_affinities: Vec<String>,
    pub irrelevant_affinities: Vec<String>,
    pub label: String,
}

/// Affixes that define a damage type
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DamageTypeProfile {
    pub primary_affix_ids: Vec<AffixId>,
    pub synergy_affix_ids: Vec<AffixId>,
}

/// Manual damage-type classification for one affix
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffixOverride {
    pub affix_id: AffixId,
    #[serde(default)]
    pub affix_name: String,
    pub is_damage_locked: bool,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConstants {
    class_hierarchy: BTreeMap<String, ClassProfile>,
    mastery_to_class: BTreeMap<String, String>,
    damage_type_profiles: BTreeMap<String, DamageTypeProfile>,
    threshold_affix_ids: Vec<AffixId>,
    affix_overrides: Vec<serde_json::Value>,
    affix_edges: Vec<serde_json::Value>,
}

/// Parsed game constants
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameConstants {
    pub class_hierarchy: BTreeMap<String, ClassProfile>,
    pub mastery_to_class: BTreeMap<String, String>,
    pub damage_type_profiles: BTreeMap<String, DamageTypeProfile>,
    pub threshold_affix_ids: BTreeSet<AffixId>,
    /// Keyed by affix ID
    pub affix_overrides: BTreeMap<AffixId, AffixOverride>,
    /// File order
    pub affix_edges: Vec<AffixEdge>,
}

impl GameConstants {
    /// Load from a JSON file. A missing or unreadable file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::NotFound(format!(
                "Game constants file not found: {}",
                path.display()
            )));
        }
        let text = std::fs::read_to_string(path)?;
        let constants = Self::from_json_str(&text)?;
        info!(
            path = %path.display(),
            classes = constants.class_hierarchy.len(),
            damage_profiles = constants.damage_type_profiles.len(),
            thresholds = constants.threshold_affix_ids.len(),
            edges = constants.affix_edges.len(),
            "Loaded game constants"
        );
        Ok(constants)
    }

    /// Parse from a JSON string. Malformed overrides and edges are skipped.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let raw: RawConstants = serde_json::from_str(text)
            .map_err(|e| Error::Parse(format!("Invalid game constants: {}", e)))?;

        let mut affix_overrides = BTreeMap::new();
        for value in raw.affix_overrides {
            match serde_json::from_value::<AffixOverride>(value.clone()) {
                Ok(o) => {
                    affix_overrides.insert(o.affix_id, o);
                }
                Err(e) => warn!(entry = %value, error = %e, "Skipping malformed affix override"),
            }
        }

        let affix_edges = raw
            .affix_edges
            .iter()
            .filter_map(|value| match parse_edge(value) {
                Ok(edge) => Some(edge),
                Err(reason) => {
                    warn!(entry = %value, reason = %reason, "Skipping malformed edge");
                    None
                }
            })
            .collect();

        Ok(Self {
            class_hierarchy: raw.class_hierarchy,
            mastery_to_class: raw.mastery_to_class,
            damage_type_profiles: raw.damage_type_profiles,
            threshold_affix_ids: raw.threshold_affix_ids.into_iter().collect(),
            affix_overrides,
            affix_edges,
        })
    }

    /// Base class for a mastery, if it is mapped and has a profile
    pub fn base_class_profile(&self, mastery: &str) -> Option<(&str, &ClassProfile)> {
        let base = self.mastery_to_class.get(mastery)?;
        self.class_hierarchy
            .get(base)
            .map(|profile| (base.as_str(), profile))
    }
}

fn parse_edge(value: &serde_json::Value) -> std::result::Result<AffixEdge, String> {
    let id_field = |key: &str| -> std::result::Result<AffixId, String> {
        let v = value.get(key).ok_or_else(|| format!("missing '{}'", key))?;
        v.as_u64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
            .and_then(|n| AffixId::try_from(n).ok())
            .ok_or_else(|| format!("'{}' is not an affix ID", key))
    };

    let from_id = id_field("from")?;
    let to_id = id_field("to")?;

    let edge_type = match value.get("type").and_then(|t| t.as_str()) {
        Some("SYNERGY") => EdgeType::Synergy,
        Some("PREREQUISITE") => EdgeType::Prerequisite,
        Some(other) => return Err(format!("unknown edge type '{}'", other)),
        None => return Err("missing 'type'".to_string()),
    };

    let strength = value
        .get("strength")
        .and_then(|s| s.as_f64())
        .ok_or_else(|| "missing or non-numeric 'strength'".to_string())?;

    let condition = value
        .get("condition")
        .and_then(|c| c.as_str())
        .map(str::to_string);

    Ok(AffixEdge {
        from_id,
        to_id,
        edge_type,
        strength,
        condition,
    })
}
