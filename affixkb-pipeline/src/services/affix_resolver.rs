//! Affix catalog index and name resolution
//!
//! Loads the game's affix catalog (`singleAffixes` + `multiAffixes`) and
//! builds:
//! - ID → `AffixDefinition` index
//! - case-insensitive name variant → ID index (internal, display and
//!   loot-filter override names)
//! - damage-type classification (keyword scan, then manual overrides)
//! - threshold affix set
//!
//! # Fuzzy matching
//! Name lookups fall back to a `SimilarityScorer` (0-100). Variants are
//! scanned in sorted order and only a strictly better score replaces the
//! current best, so ties resolve to the lexicographically first variant.

use crate::services::game_constants::GameConstants;
use crate::types::{AffixDefinition, AffixId};
use affixkb_common::{Error, Result};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info, warn};

/// Damage type → name keywords, checked in this order
const DAMAGE_KEYWORDS: &[(&str, &[&str])] = &[
    ("fire", &["fire", "ignite", "burn", "combustion"]),
    ("cold", &["cold", "freeze", "chill", "frost"]),
    ("lightning", &["lightning", "shock", "electrify", "thunder"]),
    ("void", &["void", "corruption"]),
    ("necrotic", &["necrotic", "decay"]),
    ("poison", &["poison", "venom", "toxic"]),
    ("physical", &["physical", "bleed", "armor shred"]),
];

/// String similarity on a 0-100 scale
pub trait SimilarityScorer: Send + Sync {
    fn score(&self, query: &str, candidate: &str) -> f64;
}

/// Normalized Levenshtein similarity × 100
#[derive(Debug, Clone, Copy, Default)]
pub struct LevenshteinScorer;

impl SimilarityScorer for LevenshteinScorer {
    fn score(&self, query: &str, candidate: &str) -> f64 {
        strsim::normalized_levenshtein(query, candidate) * 100.0
    }
}

/// Keyword classification of an internal affix name
pub fn classify_damage_type(name: &str) -> Option<&'static str> {
    let lower = name.to_lowercase();
    DAMAGE_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| lower.contains(kw)))
        .map(|(damage_type, _)| *damage_type)
}

/// Catalog index shared read-only by every stage
pub struct AffixResolver {
    index: BTreeMap<AffixId, AffixDefinition>,
    name_index: BTreeMap<String, AffixId>,
    threshold_ids: BTreeSet<AffixId>,
    fuzzy_threshold: f64,
    scorer: Box<dyn SimilarityScorer>,
}

impl std::fmt::Debug for AffixResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AffixResolver")
            .field("affixes", &self.index.len())
            .field("name_variants", &self.name_index.len())
            .field("threshold_ids", &self.threshold_ids.len())
            .field("fuzzy_threshold", &self.fuzzy_threshold)
            .finish()
    }
}

impl AffixResolver {
    /// Load the catalog file.
    ///
    /// `constants` supplies threshold IDs and damage-type overrides; when it
    /// is `None` the resolver degrades to an empty threshold set.
    pub fn load(
        affixes_file: &Path,
        constants: Option<&GameConstants>,
        fuzzy_threshold: f64,
    ) -> Result<Self> {
        let text = std::fs::read_to_string(affixes_file).map_err(|e| {
            Error::Config(format!(
                "Cannot read affix catalog {}: {}",
                affixes_file.display(),
                e
            ))
        })?;
        let resolver = Self::from_catalog_json(&text, constants, fuzzy_threshold)?;
        info!(
            path = %affixes_file.display(),
            affixes = resolver.index.len(),
            name_variants = resolver.name_index.len(),
            threshold_ids = resolver.threshold_ids.len(),
            "Affix resolver loaded"
        );
        Ok(resolver)
    }

    /// Build from catalog JSON text
    pub fn from_catalog_json(
        text: &str,
        constants: Option<&GameConstants>,
        fuzzy_threshold: f64,
    ) -> Result<Self> {
        let raw: Value = serde_json::from_str(text)
            .map_err(|e| Error::Parse(format!("Invalid affix catalog: {}", e)))?;

        let entries: Vec<&Value> = ["singleAffixes", "multiAffixes"]
            .iter()
            .filter_map(|key| raw.get(*key).and_then(Value::as_array))
            .flatten()
            .collect();

        let mut index = BTreeMap::new();
        let mut name_index = BTreeMap::new();

        for entry in entries {
            let parsed = match parse_catalog_entry(entry) {
                Ok(parsed) => parsed,
                Err(reason) => {
                    debug!(reason = %reason, "Skipping malformed affix entry");
                    continue;
                }
            };
            let (definition, variants) = parsed;
            for variant in variants {
                if !variant.is_empty() {
                    name_index.insert(variant.to_lowercase(), definition.affix_id);
                }
            }
            index.insert(definition.affix_id, definition);
        }

        if index.is_empty() {
            return Err(Error::Config(
                "Affix catalog contains no usable affixes".to_string(),
            ));
        }

        let mut threshold_ids = BTreeSet::new();
        match constants {
            Some(constants) => {
                threshold_ids = constants.threshold_affix_ids.clone();
                for (affix_id, o) in &constants.affix_overrides {
                    if o.is_damage_locked {
                        continue;
                    }
                    if let Some(def) = index.get_mut(affix_id) {
                        debug!(affix_id, reason = %o.reason, "Override: affix is not damage-locked");
                        def.damage_type = None;
                    }
                }
            }
            None => warn!("Game constants unavailable, no threshold affixes or overrides applied"),
        }

        Ok(Self {
            index,
            name_index,
            threshold_ids,
            fuzzy_threshold,
            scorer: Box::new(LevenshteinScorer),
        })
    }

    /// Replace the similarity scorer
    pub fn with_scorer(mut self, scorer: Box<dyn SimilarityScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn resolve_id(&self, affix_id: AffixId) -> Option<&AffixDefinition> {
        self.index.get(&affix_id)
    }

    /// Exact case-insensitive match, then fuzzy match above the threshold
    pub fn resolve_name(&self, name: &str) -> Option<&AffixDefinition> {
        if name.trim().is_empty() {
            return None;
        }
        let query = name.to_lowercase();

        if let Some(id) = self.name_index.get(&query) {
            return self.index.get(id);
        }

        let mut best: Option<(&str, AffixId, f64)> = None;
        for (variant, id) in &self.name_index {
            let score = self.scorer.score(&query, variant);
            if best.map_or(true, |(_, _, s)| score > s) {
                best = Some((variant.as_str(), *id, score));
            }
        }

        match best {
            Some((variant, id, score)) if score >= self.fuzzy_threshold * 100.0 => {
                debug!(query = %name, matched = %variant, score, affix_id = id, "Fuzzy match");
                self.index.get(&id)
            }
            _ => {
                debug!(query = %name, threshold = self.fuzzy_threshold, "Unresolved affix name");
                None
            }
        }
    }

    pub fn is_threshold(&self, affix_id: AffixId) -> bool {
        self.threshold_ids.contains(&affix_id)
    }

    pub fn is_known(&self, affix_id: AffixId) -> bool {
        self.index.contains_key(&affix_id)
    }

    pub fn known_ids(&self) -> BTreeSet<AffixId> {
        self.index.keys().copied().collect()
    }

    /// All definitions in ascending ID order
    pub fn definitions(&self) -> impl Iterator<Item = &AffixDefinition> {
        self.index.values()
    }

    pub fn definition_count(&self) -> usize {
        self.index.len()
    }
}

type ParsedEntry = (AffixDefinition, [String; 3]);

fn parse_catalog_entry(entry: &Value) -> std::result::Result<ParsedEntry, String> {
    let affix_id = entry
        .get("affixId")
        .and_then(value_as_u32)
        .ok_or_else(|| format!("missing or invalid affixId in {}", entry))?;

    let text = |key: &str| -> String {
        match entry.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    };
    let name = text("affixName");
    let display_name = text("affixDisplayName");
    let loot_name = text("affixLootFilterOverrideName");

    let valid_slots = match entry.get("canRollOn") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| value_as_u32(v).ok_or_else(|| format!("affix {}: bad canRollOn", affix_id)))
            .collect::<std::result::Result<Vec<_>, _>>()?,
        Some(_) => return Err(format!("affix {}: canRollOn is not a list", affix_id)),
    };

    let class_specificity = match entry.get("classSpecificity") {
        None | Some(Value::Null) => 0,
        Some(v) => v
            .as_i64()
            .ok_or_else(|| format!("affix {}: bad classSpecificity", affix_id))?,
    };

    let definition = AffixDefinition {
        affix_id,
        damage_type: classify_damage_type(&name).map(str::to_string),
        name: name.clone(),
        display_name: display_name.clone(),
        valid_slots,
        is_class_gated: class_specificity != 0,
    };
    Ok((definition, [name, display_name, loot_name]))
}

fn value_as_u32(v: &Value) -> Option<u32> {
    v.as_u64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
        .and_then(|n| u32::try_from(n).ok())
}
