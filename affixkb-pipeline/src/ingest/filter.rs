//! Loot filter XML ingester
//!
//! ```xml
//! <LootFilter version="3" build_slug="frost_druid" mastery="druid" damage_type="cold">
//!   <RuleBlock strictness="very_strict">
//!     <Rule>
//!       <Condition type="AffixId" value="42"/>
//!     </Rule>
//!   </RuleBlock>
//! </LootFilter>
//! ```
//!
//! Community filters have no single schema, so several attribute spellings
//! are accepted. Filters carry no phase information: the collected
//! strictness → IDs map is replicated to every phase.

use super::{file_name, file_stem, read_bytes, SourceIngester};
use crate::error::IngestError;
use crate::types::{
    AffixId, BuildContext, Phase, RawSource, SourcePayload, Strictness, StrictnessMap,
};
use affixkb_common::hash::sha256_hex;
use roxmltree::{Document, Node};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

/// Condition attributes that may hold an affix ID, in lookup order
const AFFIX_ID_ATTRS: &[(&str, &str)] = &[
    ("value", "Value"),
    ("id", "Id"),
    ("affixid", "Affixid"),
    ("affix_id", "Affix_id"),
];

/// Reads loot filter XML
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterIngester;

impl SourceIngester for FilterIngester {
    fn ingest(&self, path: &Path) -> Result<RawSource, IngestError> {
        let bytes = read_bytes(path)?;
        let text = std::str::from_utf8(&bytes)
            .map_err(|e| IngestError::parse(path, format!("not UTF-8: {}", e)))?;
        let doc = Document::parse(text)
            .map_err(|e| IngestError::parse(path, format!("invalid XML: {}", e)))?;
        let root = doc.root_element();

        let build_slug = first_attr(root, &["build_slug", "buildSlug", "build"])
            .unwrap_or_else(|| file_stem(path));
        let mastery = first_attr(root, &["mastery", "class"])
            .ok_or_else(|| IngestError::missing(path, "mastery"))?;
        let damage_types: Vec<String> = first_attr(root, &["damage_type", "damageType"])
            .into_iter()
            .collect();

        let covered_masteries = match first_attr(root, &["covered_masteries", "masteries"]) {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect(),
            None => vec![mastery.clone()],
        };

        let levels = collect_strictness_levels(root);
        let phases = Phase::ALL.iter().map(|p| (*p, levels.clone())).collect();

        let mut metadata = serde_json::Map::new();
        metadata.insert("source_file".to_string(), Value::String(file_name(path)));
        metadata.insert(
            "filter_version".to_string(),
            Value::String(first_attr(root, &["version"]).unwrap_or_default()),
        );

        debug!(
            file = %file_name(path),
            ids = levels.values().map(BTreeSet::len).sum::<usize>(),
            "Ingested filter"
        );

        Ok(RawSource {
            source_id: format!("filter:{}", file_stem(path)),
            build_slug,
            mastery,
            damage_types,
            archetype: "unknown".to_string(),
            payload: SourcePayload::Filter { phases },
            checksum: sha256_hex(&bytes),
            covered_masteries,
            metadata,
            context: BuildContext::new(),
        })
    }
}

/// First non-empty attribute among `names`
fn first_attr(node: Node<'_, '_>, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| node.attribute(*name))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

fn collect_strictness_levels(root: Node<'_, '_>) -> StrictnessMap {
    let mut levels: StrictnessMap = Strictness::ORDERED
        .iter()
        .map(|s| (*s, BTreeSet::new()))
        .collect();

    for block in root.descendants().filter(|n| n.has_tag_name("RuleBlock")) {
        let label = first_attr(block, &["strictness", "level"]).unwrap_or_else(|| "relaxed".to_string());
        let strictness = Strictness::canonicalize(&label);

        let ids = block
            .descendants()
            .filter(|n| n.has_tag_name("Condition"))
            .filter(|n| is_affix_condition(*n))
            .filter_map(condition_affix_id);
        levels.entry(strictness).or_default().extend(ids);
    }

    // Bare numeric element text: strictness unknown, so it only counts as the floor
    for node in root.descendants().filter(Node::is_element) {
        if let Some(id) = node.text().and_then(parse_digits) {
            levels.entry(Strictness::Relaxed).or_default().insert(id);
        }
    }

    levels
}

fn is_affix_condition(node: Node<'_, '_>) -> bool {
    let cond_type = node.attribute("type").unwrap_or_default().to_lowercase();
    cond_type.contains("affix") || cond_type.contains("id")
}

/// ID from the first present ID attribute; an unparseable value yields none
fn condition_affix_id(node: Node<'_, '_>) -> Option<AffixId> {
    AFFIX_ID_ATTRS
        .iter()
        .find_map(|(lower, capitalized)| {
            node.attribute(*lower)
                .filter(|v| !v.is_empty())
                .or_else(|| node.attribute(*capitalized).filter(|v| !v.is_empty()))
        })
        .and_then(|raw| raw.trim().parse().ok())
}

fn parse_digits(text: &str) -> Option<AffixId> {
    let trimmed = text.trim();
    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        trimmed.parse().ok()
    } else {
        None
    }
}
